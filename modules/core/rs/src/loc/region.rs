use std::fmt::{Display, Formatter};

use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::Result;

use crate::num::PrimInt;

use super::contig::Contig;
use super::interval::Interval;

/// A contiguous stretch of a contig, e.g. one target interval of a coverage run.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Constructor, Dissolve, Getters)]
pub struct Region<Ctg: Contig, Idx: PrimInt> {
    contig: Ctg,
    interval: Interval<Idx>,
}

impl<Ctg: Contig, Idx: PrimInt> Region<Ctg, Idx> {
    pub fn from_bounds(contig: Ctg, start: Idx, end: Idx) -> Result<Self> {
        Ok(Self {
            contig,
            interval: Interval::new(start, end)?,
        })
    }

    /// Number of positions in the region.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> Idx {
        self.interval.len()
    }

    pub fn contains(&self, contig: &Ctg, pos: Idx) -> bool {
        &self.contig == contig && self.interval.contains(pos)
    }
}

/// Human-readable `contig:start-stop` in 1-based, fully closed coordinates.
impl<Ctg: Contig, Idx: PrimInt> Display for Region<Ctg, Idx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}",
            self.contig,
            self.interval.start() + Idx::one(),
            self.interval.end()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_one_based() {
        let region = Region::from_bounds("chr1".to_string(), 100u64, 110).unwrap();
        assert_eq!(region.to_string(), "chr1:101-110");
        assert_eq!(region.len(), 10);

        let single = Region::from_bounds("chrM".to_string(), 0u32, 1).unwrap();
        assert_eq!(single.to_string(), "chrM:1-1");
    }

    #[test]
    fn test_contains() {
        let region = Region::from_bounds("chr2".to_string(), 5u64, 8).unwrap();
        assert!(region.contains(&"chr2".to_string(), 5));
        assert!(region.contains(&"chr2".to_string(), 7));
        assert!(!region.contains(&"chr2".to_string(), 8));
        assert!(!region.contains(&"chr1".to_string(), 6));
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(Region::from_bounds("chr1".to_string(), 10u64, 10).is_err());
    }
}
