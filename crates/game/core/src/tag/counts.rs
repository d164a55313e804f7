use arrayvec::ArrayVec;

use super::{TagError, TagId};
use crate::config::EngineConfig;

/// One stacked tag and its count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagCount {
    pub tag: TagId,
    pub count: u16,
}

/// Sparse tag → stack count map, kept sorted by tag id.
///
/// Capacity is fixed; running out is a [`TagError`], never a silent drop,
/// because the presence set would otherwise disagree with the counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagCountMap {
    entries: ArrayVec<TagCount, { EngineConfig::MAX_TAG_COUNTS }>,
}

impl TagCountMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, tag: TagId) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&tag, |entry| entry.tag)
    }

    /// Stack count of a tag (0 if absent).
    pub fn get(&self, tag: TagId) -> u16 {
        self.position(tag)
            .map(|index| self.entries[index].count)
            .unwrap_or(0)
    }

    /// Adds one stack and returns the new count.
    pub fn increment(&mut self, tag: TagId) -> Result<u16, TagError> {
        match self.position(tag) {
            Ok(index) => {
                let entry = &mut self.entries[index];
                entry.count = entry
                    .count
                    .checked_add(1)
                    .ok_or(TagError::StackOverflow { tag })?;
                Ok(entry.count)
            }
            Err(index) => {
                self.entries
                    .try_insert(index, TagCount { tag, count: 1 })
                    .map_err(|_| TagError::CountCapacityExceeded {
                        tag,
                        capacity: EngineConfig::MAX_TAG_COUNTS,
                    })?;
                Ok(1)
            }
        }
    }

    /// Removes one stack and returns the remaining count; the entry is dropped at zero.
    pub fn decrement(&mut self, tag: TagId) -> u16 {
        let Ok(index) = self.position(tag) else {
            return 0;
        };
        let entry = &mut self.entries[index];
        entry.count = entry.count.saturating_sub(1);
        let remaining = entry.count;
        if remaining == 0 {
            self.entries.remove(index);
        }
        remaining
    }

    /// Drops the entry for a tag entirely.
    pub fn clear(&mut self, tag: TagId) {
        if let Ok(index) = self.position(tag) {
            self.entries.remove(index);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagCount> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(raw: u8) -> TagId {
        TagId::new(raw).unwrap()
    }

    #[test]
    fn increments_and_drops_at_zero() {
        let mut map = TagCountMap::new();
        assert_eq!(map.increment(tag(4)).unwrap(), 1);
        assert_eq!(map.increment(tag(4)).unwrap(), 2);
        assert_eq!(map.decrement(tag(4)), 1);
        assert_eq!(map.decrement(tag(4)), 0);
        assert!(map.is_empty());
        assert_eq!(map.decrement(tag(4)), 0);
    }

    #[test]
    fn stack_overflow_is_an_error() {
        let mut map = TagCountMap::new();
        for _ in 0..u16::MAX {
            map.increment(tag(9)).unwrap();
        }
        assert_eq!(
            map.increment(tag(9)),
            Err(TagError::StackOverflow { tag: tag(9) })
        );
        assert_eq!(map.get(tag(9)), u16::MAX);
    }

    #[test]
    fn capacity_exhaustion_is_an_error() {
        let mut map = TagCountMap::new();
        for raw in 1..=EngineConfig::MAX_TAG_COUNTS as u8 {
            map.increment(tag(raw)).unwrap();
        }
        let overflow = tag(EngineConfig::MAX_TAG_COUNTS as u8 + 1);
        assert_eq!(
            map.increment(overflow),
            Err(TagError::CountCapacityExceeded {
                tag: overflow,
                capacity: EngineConfig::MAX_TAG_COUNTS,
            })
        );
    }

    #[test]
    fn entries_stay_sorted() {
        let mut map = TagCountMap::new();
        for raw in [30, 2, 17] {
            map.increment(tag(raw)).unwrap();
        }
        let order: Vec<u8> = map.iter().map(|e| e.tag.get()).collect();
        assert_eq!(order, vec![2, 17, 30]);
    }
}
