use std::marker::PhantomData;
use std::sync::Arc;

use eyre::Result;
use serde::{Deserialize, Serialize};
use sitewise_core_rs::loc::Contig;
use sitewise_core_rs::num::PrimInt;
use sitewise_core_rs::pileup::Pileup;
use sitewise_core_rs::strat::{ReadGroupDecl, Stratification, Units};

use crate::classify::{LocusClassifier, LocusContext};
use crate::counts::CountVector;
use crate::variant::VariantKind;

/// Named bucket of the coverage tally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoverageKey {
    /// Reference base is G or C
    Gc,
    Snp,
    Indel,
    /// Depth of coverage for the stratification unit with this index
    Unit(usize),
}

pub type CoverageCounts = CountVector<CoverageKey>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub stratification: Stratification,
}

impl CoverageConfig {
    pub fn with_stratification(mut self, stratification: Stratification) -> Self {
        self.stratification = stratification;
        self
    }

    /// Resolve the report columns for the declared read groups.
    pub fn units(&self, read_groups: impl IntoIterator<Item = ReadGroupDecl>) -> Result<Units> {
        Units::resolve(self.stratification, read_groups)
    }
}

pub fn is_gc(base: u8) -> bool {
    matches!(base, b'G' | b'g' | b'C' | b'c')
}

/// GC content, truth variant type and per-unit depth at every locus.
pub struct GcCoverage<Ctg, Idx, P> {
    units: Arc<Units>,
    _phantom: PhantomData<fn() -> (Ctg, Idx, P)>,
}

impl<Ctg, Idx, P> Clone for GcCoverage<Ctg, Idx, P> {
    fn clone(&self) -> Self {
        Self {
            units: Arc::clone(&self.units),
            _phantom: PhantomData,
        }
    }
}

impl<Ctg, Idx, P> GcCoverage<Ctg, Idx, P> {
    pub fn new(units: Arc<Units>) -> Self {
        Self {
            units,
            _phantom: PhantomData,
        }
    }

    pub fn units(&self) -> &Arc<Units> {
        &self.units
    }
}

impl<Ctg: Contig, Idx: PrimInt, P: Pileup> LocusClassifier<Ctg, Idx, P>
    for GcCoverage<Ctg, Idx, P>
{
    type Contribution = CoverageCounts;
    type Staged = ();

    fn classify(&mut self, locus: &LocusContext<Ctg, Idx, P>) -> Result<Option<CoverageCounts>> {
        let mut counts = CoverageCounts::with_capacity(self.units.len() + 3);
        counts.add(CoverageKey::Gc, is_gc(*locus.reference()) as u64);

        // A record is counted at its start only, the loci it spans further see no record
        let truth = locus
            .truth()
            .as_ref()
            .filter(|truth| truth.start() == locus.position());
        match truth {
            None => {
                counts.add(CoverageKey::Snp, 0).add(CoverageKey::Indel, 0);
            }
            Some(truth) => match truth.kind() {
                VariantKind::Snp => {
                    counts.add(CoverageKey::Snp, 1);
                }
                VariantKind::Indel => {
                    counts.add(CoverageKey::Indel, 1);
                }
                // MNPs, symbolic and mixed records are not counted
                _ => {}
            },
        }

        for unit in 0..self.units.len() {
            let depth = match locus.pileup() {
                Some(pileup) => self.units.depth(unit, pileup),
                None => 0,
            };
            counts.add(CoverageKey::Unit(unit), depth);
        }
        Ok(Some(counts))
    }
}
