use std::fmt::{Display, Formatter};
use std::ops::Range;

use derive_getters::Dissolve;
use eyre::{ensure, Report, Result};

use crate::num::PrimInt;

/// Interval is a half-open, 0-based genomic range [start, end).
/// Empty (start == end) and inverted (start > end) intervals are rejected at construction.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Dissolve)]
pub struct Interval<Idx: PrimInt> {
    start: Idx,
    end: Idx,
}

impl<Idx: PrimInt> Interval<Idx> {
    pub fn new(start: Idx, end: Idx) -> Result<Self> {
        ensure!(
            start < end,
            "Invalid interval [{start}, {end}): start must be less than end"
        );
        Ok(Self { start, end })
    }

    #[inline(always)]
    pub fn start(&self) -> Idx {
        self.start
    }

    #[inline(always)]
    pub fn end(&self) -> Idx {
        self.end
    }

    /// Number of positions covered by the interval. Always positive.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> Idx {
        self.end - self.start
    }

    pub fn contains(&self, pos: Idx) -> bool {
        self.start <= pos && pos < self.end
    }
}

impl<Idx: PrimInt> Display for Interval<Idx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl<Idx: PrimInt> TryFrom<(Idx, Idx)> for Interval<Idx> {
    type Error = Report;

    fn try_from((start, end): (Idx, Idx)) -> Result<Self> {
        Self::new(start, end)
    }
}

impl<Idx: PrimInt> TryFrom<Range<Idx>> for Interval<Idx> {
    type Error = Report;

    fn try_from(range: Range<Idx>) -> Result<Self> {
        Self::new(range.start, range.end)
    }
}

impl<Idx: PrimInt> From<Interval<Idx>> for Range<Idx> {
    fn from(interval: Interval<Idx>) -> Self {
        interval.start..interval.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct() {
        assert_eq!(
            Interval::new(0u64, 10).unwrap(),
            Interval { start: 0, end: 10 }
        );
        assert!(Interval::new(1u64, 0).is_err());
        assert!(Interval::new(5u64, 5).is_err());
        assert!(Interval::try_from(3u32..4).is_ok());
    }

    #[test]
    fn test_len_and_contains() {
        let interval = Interval::new(10u64, 20).unwrap();
        assert_eq!(interval.len(), 10);
        assert!(!interval.contains(9));
        assert!(interval.contains(10));
        assert!(interval.contains(19));
        assert!(!interval.contains(20));
    }

    #[test]
    fn test_range_conversion() {
        let interval = Interval::new(1u32, 5).unwrap();
        let range: Range<u32> = interval.into();
        assert_eq!(range, 1..5);
        assert_eq!(interval.to_string(), "[1, 5)");
    }
}
