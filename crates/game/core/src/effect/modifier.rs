use std::fmt;

/// Index of a numeric attribute on an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeId(pub u16);

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attr:{}", self.0)
    }
}

/// How a modifier combines with the current attribute value.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ModifierOp {
    /// `current + value`.
    #[default]
    Add,
    /// `current * value / 100`; the value is a percentage.
    Multiply,
    /// `value`.
    Override,
}

impl ModifierOp {
    /// New attribute value after applying `value` to `current`.
    pub fn combine(self, current: i64, value: i64) -> i64 {
        match self {
            Self::Add => current.saturating_add(value),
            Self::Multiply => current.saturating_mul(value) / 100,
            Self::Override => value,
        }
    }
}

/// One attribute change carried by a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeModifier {
    pub attribute: AttributeId,
    pub op: ModifierOp,
    pub value: i32,
}

impl AttributeModifier {
    pub fn add(attribute: AttributeId, value: i32) -> Self {
        Self {
            attribute,
            op: ModifierOp::Add,
            value,
        }
    }

    pub fn multiply(attribute: AttributeId, percent: i32) -> Self {
        Self {
            attribute,
            op: ModifierOp::Multiply,
            value: percent,
        }
    }

    pub fn set(attribute: AttributeId, value: i32) -> Self {
        Self {
            attribute,
            op: ModifierOp::Override,
            value,
        }
    }
}

/// Accumulated adjustment to a proposal's magnitudes.
///
/// Response listeners fold their Modify decisions into one of these during the
/// Trigger state; Calculate applies it to every modifier value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueAdjust {
    pub add: i64,
    pub scale_percent: i64,
    pub override_value: Option<i64>,
}

impl Default for ValueAdjust {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ValueAdjust {
    pub const IDENTITY: Self = Self {
        add: 0,
        scale_percent: 100,
        override_value: None,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Override wins; otherwise scale first, then add.
    pub fn apply(&self, value: i64) -> i64 {
        match self.override_value {
            Some(value) => value,
            None => (value.saturating_mul(self.scale_percent) / 100).saturating_add(self.add),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_combine() {
        assert_eq!(ModifierOp::Add.combine(100, -10), 90);
        assert_eq!(ModifierOp::Multiply.combine(80, 150), 120);
        assert_eq!(ModifierOp::Override.combine(80, 5), 5);
    }

    #[test]
    fn adjust_scales_then_adds() {
        let adjust = ValueAdjust {
            add: 3,
            scale_percent: 50,
            override_value: None,
        };
        assert_eq!(adjust.apply(-10), -2);
        assert_eq!(ValueAdjust::IDENTITY.apply(-10), -10);
        let forced = ValueAdjust {
            override_value: Some(0),
            ..adjust
        };
        assert_eq!(forced.apply(-10), 0);
    }
}
