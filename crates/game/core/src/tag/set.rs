use super::TagId;

const WORDS: usize = 4;

/// Fixed 256-bit tag set. Bit `n` is tag id `n`; bit 0 is never set.
///
/// All operations are O(1) word-wise bit arithmetic; iteration yields tags in
/// ascending id order, which keeps rule cascades deterministic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagSet {
    words: [u64; WORDS],
}

impl TagSet {
    pub const CAPACITY: usize = WORDS * 64;
    pub const EMPTY: Self = Self { words: [0; WORDS] };

    pub const fn new() -> Self {
        Self::EMPTY
    }

    #[inline]
    fn locate(tag: TagId) -> (usize, u64) {
        let index = tag.index();
        (index / 64, 1u64 << (index % 64))
    }

    /// Inserts a tag, returning true if it was not already present.
    pub fn insert(&mut self, tag: TagId) -> bool {
        let (word, bit) = Self::locate(tag);
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }

    /// Removes a tag, returning true if it was present.
    pub fn remove(&mut self, tag: TagId) -> bool {
        let (word, bit) = Self::locate(tag);
        let present = self.words[word] & bit != 0;
        self.words[word] &= !bit;
        present
    }

    #[inline]
    pub fn contains(&self, tag: TagId) -> bool {
        let (word, bit) = Self::locate(tag);
        self.words[word] & bit != 0
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn union(&self, other: &Self) -> Self {
        self.zip(other, |a, b| a | b)
    }

    pub fn intersection(&self, other: &Self) -> Self {
        self.zip(other, |a, b| a & b)
    }

    /// Tags in `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.zip(other, |a, b| a & !b)
    }

    /// True if any tag is in both sets.
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// True if every tag of `other` is in `self`.
    pub fn contains_all(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == *b)
    }

    pub fn iter(&self) -> TagSetIter {
        TagSetIter {
            words: self.words,
            word: 0,
        }
    }

    fn zip(&self, other: &Self, op: impl Fn(u64, u64) -> u64) -> Self {
        let mut words = [0u64; WORDS];
        for (i, slot) in words.iter_mut().enumerate() {
            *slot = op(self.words[i], other.words[i]);
        }
        Self { words }
    }
}

impl FromIterator<TagId> for TagSet {
    fn from_iter<I: IntoIterator<Item = TagId>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = TagId;
    type IntoIter = TagSetIter;

    fn into_iter(self) -> TagSetIter {
        self.iter()
    }
}

/// Ascending iterator over the tags of a [`TagSet`].
#[derive(Clone, Debug)]
pub struct TagSetIter {
    words: [u64; WORDS],
    word: usize,
}

impl Iterator for TagSetIter {
    type Item = TagId;

    fn next(&mut self) -> Option<TagId> {
        while self.word < WORDS {
            let bits = self.words[self.word];
            if bits == 0 {
                self.word += 1;
                continue;
            }
            let offset = bits.trailing_zeros() as usize;
            self.words[self.word] &= bits - 1;
            let raw = self.word * 64 + offset;
            // Bit 0 is unreachable through `insert`, so every raw index is a valid id.
            return TagId::new(raw as u8);
        }
        None
    }
}
