use std::ops::Range;

/// A half-open interval of slots, `begin..end`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct UsedRange {
    pub begin: u32,
    pub end: u32,
}

impl UsedRange {
    pub const fn overlaps(&self, begin: u32, end: u32) -> bool {
        self.begin < end && begin < self.end
    }
}

impl From<UsedRange> for Range<u32> {
    fn from(range: UsedRange) -> Self {
        range.begin..range.end
    }
}

/// Slots already claimed in one register space of one resource kind.
///
/// Ranges are kept sorted by their start. A new range is merged with an
/// existing one only when the two share an exact boundary; overlapping ranges
/// are stored side by side.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct UsedRanges {
    ranges: Vec<UsedRange>,
}

impl UsedRanges {
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &UsedRange> {
        self.ranges.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns `true` if any claimed slot lies in `begin..end`.
    pub fn overlaps(&self, begin: u32, end: u32) -> bool {
        self.ranges.iter().any(|range| range.overlaps(begin, end))
    }

    /// Mark `begin..end` as used.
    pub fn add(&mut self, begin: u32, end: u32) {
        if begin >= end {
            return;
        }

        let touching = self
            .ranges
            .iter_mut()
            .find(|range| range.begin == end || range.end == begin);
        match touching {
            Some(range) if range.begin == end => range.begin = begin,
            Some(range) => range.end = end,
            None => self.ranges.push(UsedRange { begin, end }),
        }
        self.ranges.sort_by_key(|range| (range.begin, range.end));
    }

    /// Claim the first gap of `count` free slots and return its start.
    ///
    /// Returns `None` if every gap that large would end past `u32::MAX`.
    pub fn allocate(&mut self, count: u32) -> Option<u32> {
        let mut begin = 0u32;
        for range in self.ranges.iter() {
            match begin.checked_add(count) {
                Some(end) if range.begin >= end => break,
                _ => begin = begin.max(range.end),
            }
        }
        let end = begin.checked_add(count)?;
        self.add(begin, end);
        Some(begin)
    }
}
