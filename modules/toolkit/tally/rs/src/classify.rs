use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use dyn_clone::DynClone;
use eyre::Result;
use sitewise_core_rs::loc::Contig;
use sitewise_core_rs::num::PrimInt;
use sitewise_core_rs::pileup::Pileup;

use crate::confusion::GenotyperArgs;
use crate::reduce::Merge;
use crate::variant::TruthVariant;

/// Everything the host knows about one visited locus.
#[derive(Clone, Debug, Constructor, Dissolve, Getters)]
pub struct LocusContext<Ctg: Contig, Idx: PrimInt, P> {
    contig: Ctg,
    /// 0-based position
    position: Idx,
    /// Reference base, upper or lower case
    reference: u8,
    truth: Option<TruthVariant<Ctg, Idx>>,
    /// `None` when no reads cover the locus
    pileup: Option<P>,
}

impl<Ctg: Contig, Idx: PrimInt, P: Pileup> LocusContext<Ctg, Idx, P> {
    pub fn depth(&self) -> u64 {
        self.pileup.as_ref().map_or(0, |p| p.depth())
    }

    pub fn has_reads(&self) -> bool {
        self.pileup.as_ref().is_some_and(|p| p.has_reads())
    }
}

/// Turns one locus into a (possibly empty) contribution to a mergeable tally.
///
/// Classifiers are cloned once per worker thread. `Ok(None)` means the locus does not contribute.
///
/// Besides the contribution, a classifier may stage records for an ordered side output. Staged
/// records are taken once per partition and handed back to [`LocusClassifier::emit`] partition by
/// partition, in input order.
pub trait LocusClassifier<Ctg: Contig, Idx: PrimInt, P>: Clone + Send {
    type Contribution: Merge + Default + Send;
    type Staged: Send;

    fn classify(
        &mut self,
        locus: &LocusContext<Ctg, Idx, P>,
    ) -> Result<Option<Self::Contribution>>;

    /// Records staged since the last call.
    fn take_staged(&mut self) -> Vec<Self::Staged> {
        Vec::new()
    }

    /// Write out the records staged for one partition.
    fn emit(&self, staged: Vec<Self::Staged>) -> Result<()> {
        debug_assert!(staged.is_empty(), "Staged records without an output");
        Ok(())
    }
}

/// Likelihood model requested from the calling engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Model {
    Snp,
    Indel,
}

/// Verdict of the calling engine at a locus.
#[derive(Clone, Copy, Debug, PartialEq, Constructor)]
pub struct Call {
    /// The call is non-reference
    pub variant: bool,
    /// Phred-scaled confidence of the call
    pub confidence: f64,
    /// The engine's own confidence verdict
    pub confident: bool,
}

impl Call {
    pub fn is_called_alt(&self, threshold: f64) -> bool {
        self.variant && self.confidence >= threshold
    }

    pub fn is_called_ref(&self, threshold: f64) -> bool {
        !self.variant && self.confidence >= threshold
    }
}

/// Boundary to an external genotype calling engine.
///
/// The engine is configured once, before the first locus, with the resolved calling arguments.
pub trait Genotyper<Ctg: Contig, Idx: PrimInt, P>: DynClone + Send + Sync {
    fn configure(&mut self, args: &GenotyperArgs) -> Result<()>;

    fn genotype(&mut self, model: Model, locus: &LocusContext<Ctg, Idx, P>) -> Result<Call>;
}

dyn_clone::clone_trait_object!(
    <Ctg, Idx, P> Genotyper<Ctg, Idx, P> where Ctg: Contig, Idx: PrimInt
);

#[cfg(test)]
mod tests {
    use super::*;
    use sitewise_core_rs::pileup::ReadGroupDepths;

    #[test]
    fn test_call_thresholds() {
        let call = Call::new(true, 30.0, true);
        assert!(call.is_called_alt(30.0));
        assert!(!call.is_called_alt(30.5));
        assert!(!call.is_called_ref(0.0));

        let call = Call::new(false, 10.0, false);
        assert!(call.is_called_ref(10.0));
        assert!(!call.is_called_alt(0.0));
    }

    #[test]
    fn test_locus_depth() {
        let pileup: ReadGroupDepths = [("rg1", 3), ("rg2", 1)].into_iter().collect();
        let covered = LocusContext::new("chr1".to_string(), 5u32, b'A', None, Some(pileup));
        assert_eq!(covered.depth(), 4);
        assert!(covered.has_reads());

        let empty: LocusContext<String, u32, ReadGroupDepths> =
            LocusContext::new("chr1".to_string(), 5, b'A', None, None);
        assert_eq!(empty.depth(), 0);
        assert!(!empty.has_reads());
    }
}
