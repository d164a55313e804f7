use crate::env::ProgramId;
use crate::tag::TagId;

/// How many stacks of a tag an effect grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagFormula {
    Fixed(u16),
    /// `per_stack * stacks`.
    LinearInStacks { per_stack: u16 },
    /// `base + per_stack * (stacks - 1)`.
    LinearWithBase { base: u16, per_stack: u16 },
    /// First output value of a graph program.
    Graph(ProgramId),
}

impl TagFormula {
    /// Stack count for the static formulas; `None` for graph formulas.
    pub fn evaluate(&self, stacks: u16) -> Option<u16> {
        match *self {
            Self::Fixed(count) => Some(count),
            Self::LinearInStacks { per_stack } => Some(per_stack.saturating_mul(stacks)),
            Self::LinearWithBase { base, per_stack } => {
                Some(base.saturating_add(per_stack.saturating_mul(stacks.saturating_sub(1))))
            }
            Self::Graph(_) => None,
        }
    }
}

/// One tag contribution of a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GrantedTag {
    pub tag: TagId,
    pub formula: TagFormula,
}

impl GrantedTag {
    pub fn fixed(tag: TagId, count: u16) -> Self {
        Self {
            tag,
            formula: TagFormula::Fixed(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formulas_scale_with_stacks() {
        assert_eq!(TagFormula::Fixed(2).evaluate(5), Some(2));
        assert_eq!(TagFormula::LinearInStacks { per_stack: 2 }.evaluate(3), Some(6));
        assert_eq!(
            TagFormula::LinearWithBase {
                base: 1,
                per_stack: 2
            }
            .evaluate(3),
            Some(5)
        );
        assert_eq!(TagFormula::Graph(ProgramId(1)).evaluate(3), None);
    }
}
