use std::sync::Mutex;

use ahash::{AHashMap, AHashSet};
use derive_getters::Dissolve;
use eyre::{eyre, Result};
use sitewise_core_rs::loc::{Contig, Region};
use sitewise_core_rs::num::PrimInt;

use crate::reduce::Merge;

/// Running sum of per-locus contributions for one partition.
#[derive(Clone, Debug, Default, PartialEq, Dissolve)]
pub struct Accumulator<T> {
    total: T,
    loci: u64,
}

impl<T: Merge + Default> Accumulator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, contribution: T) -> &mut Self {
        self.total.merge(contribution);
        self.loci += 1;
        self
    }

    /// Count a visited locus, adding its contribution if it has one.
    pub fn absorb(&mut self, contribution: Option<T>) -> &mut Self {
        match contribution {
            Some(contribution) => self.add(contribution),
            None => {
                self.loci += 1;
                self
            }
        }
    }

    /// Number of visited loci, including those without a contribution.
    pub fn loci(&self) -> u64 {
        self.loci
    }

    pub fn total(&self) -> &T {
        &self.total
    }

    pub fn finish(self) -> T {
        self.total
    }
}

impl<T: Merge> Merge for Accumulator<T> {
    fn merge(&mut self, other: Self) {
        self.total.merge(other.total);
        self.loci += other.loci;
    }
}

/// Streaming bookkeeping for intervals reported one locus at a time.
///
/// An interval is opened when the host first reports it, receives contributions while open and is
/// closed exactly once, when the host is done with it. Anything else is a host error.
#[derive(Debug)]
pub struct IntervalLedger<Ctg: Contig, Idx: PrimInt, T> {
    open: AHashMap<Region<Ctg, Idx>, Accumulator<T>>,
    closed: AHashSet<Region<Ctg, Idx>>,
}

impl<Ctg: Contig, Idx: PrimInt, T> Default for IntervalLedger<Ctg, Idx, T> {
    fn default() -> Self {
        Self {
            open: AHashMap::new(),
            closed: AHashSet::new(),
        }
    }
}

impl<Ctg: Contig, Idx: PrimInt, T: Merge + Default> IntervalLedger<Ctg, Idx, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, region: Region<Ctg, Idx>) -> Result<()> {
        if self.closed.contains(&region) {
            return Err(eyre!("Interval {region} was already finalized"));
        }
        if self.open.contains_key(&region) {
            return Err(eyre!("Interval {region} is already open"));
        }
        self.open.insert(region, Accumulator::new());
        Ok(())
    }

    pub fn add(&mut self, region: &Region<Ctg, Idx>, contribution: Option<T>) -> Result<()> {
        match self.open.get_mut(region) {
            Some(accumulator) => {
                accumulator.absorb(contribution);
                Ok(())
            }
            None if self.closed.contains(region) => {
                Err(eyre!("Interval {region} was already finalized"))
            }
            None => Err(eyre!("Interval {region} was never opened")),
        }
    }

    /// Finish the interval and hand over its accumulated total.
    pub fn close(
        &mut self,
        region: &Region<Ctg, Idx>,
    ) -> Result<(Region<Ctg, Idx>, Accumulator<T>)> {
        match self.open.remove_entry(region) {
            Some((region, accumulator)) => {
                self.closed.insert(region.clone());
                Ok((region, accumulator))
            }
            None if self.closed.contains(region) => {
                Err(eyre!("Interval {region} was already finalized"))
            }
            None => Err(eyre!("Interval {region} was never opened")),
        }
    }

    /// Number of open intervals.
    pub fn pending(&self) -> usize {
        self.open.len()
    }
}

/// Shared total that serializes concurrent merges from several workers.
#[derive(Debug, Default)]
pub struct RunningTotal<T> {
    total: Mutex<T>,
}

impl<T: Merge + Default> RunningTotal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&self, part: T) -> Result<()> {
        let mut total = self
            .total
            .lock()
            .map_err(|_| eyre!("Running total is poisoned"))?;
        total.merge(part);
        Ok(())
    }

    pub fn into_inner(self) -> Result<T> {
        self.total
            .into_inner()
            .map_err(|_| eyre!("Running total is poisoned"))
    }
}
