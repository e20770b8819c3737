use std::rc::Rc;
use std::sync::Arc;

use ahash::AHashMap;
use impl_tools::autoimpl;

/// Read evidence at a single locus as seen by the tally core. Hosts that own a real pileup
/// implement this directly; only depths are ever requested.
#[autoimpl(for <T: trait + ?Sized> &T, Box<T>, Rc<T>, Arc<T>)]
pub trait Pileup {
    /// Total depth of coverage across all read groups.
    fn depth(&self) -> u64;

    /// Depth of coverage contributed by a single read group. Unknown read groups have zero depth.
    fn depth_of_read_group(&self, read_group: &str) -> u64;

    fn has_reads(&self) -> bool {
        self.depth() > 0
    }
}

/// Minimal pileup: per-read-group depths at one locus.
#[derive(Clone, Debug, Default)]
pub struct ReadGroupDepths {
    depths: AHashMap<String, u64>,
    total: u64,
}

impl ReadGroupDepths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `depth` reads of the given read group. Repeated calls accumulate.
    pub fn add(&mut self, read_group: impl Into<String>, depth: u64) -> &mut Self {
        *self.depths.entry(read_group.into()).or_default() += depth;
        self.total += depth;
        self
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ReadGroupDepths {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        let mut pileup = Self::new();
        for (read_group, depth) in iter {
            pileup.add(read_group, depth);
        }
        pileup
    }
}

impl Pileup for ReadGroupDepths {
    fn depth(&self) -> u64 {
        self.total
    }

    fn depth_of_read_group(&self, read_group: &str) -> u64 {
        self.depths.get(read_group).copied().unwrap_or(0)
    }
}
