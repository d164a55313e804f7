use std::fmt;

use super::TagRuleError;

/// Identifier of a gameplay tag. Valid ids are `1..=255`; 0 is reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u16", into = "u16")
)]
pub struct TagId(u8);

impl TagId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = u8::MAX;

    /// Returns `None` for the reserved id 0.
    pub const fn new(raw: u8) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Validates a raw id coming from content (which may be wider than `u8`).
    pub fn from_raw(raw: u16, field: &'static str) -> Result<Self, TagRuleError> {
        u8::try_from(raw)
            .ok()
            .and_then(Self::new)
            .ok_or(TagRuleError::InvalidTagId { raw, field })
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u16> for TagId {
    type Error = TagRuleError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::from_raw(raw, "tag")
    }
}

impl From<TagId> for u16 {
    fn from(tag: TagId) -> u16 {
        tag.0 as u16
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_reserved_and_wide_ids() {
        assert!(TagId::new(0).is_none());
        assert_eq!(TagId::new(255).map(TagId::get), Some(255));
        assert_eq!(
            TagId::from_raw(256, "attached"),
            Err(TagRuleError::InvalidTagId {
                raw: 256,
                field: "attached"
            })
        );
        assert!(TagId::try_from(0u16).is_err());
    }
}
