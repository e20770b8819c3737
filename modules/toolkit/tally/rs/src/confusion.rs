use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use derive_getters::Getters;
use eyre::{ensure, eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use sitewise_core_rs::loc::Contig;
use sitewise_core_rs::num::PrimInt;
use sitewise_core_rs::pileup::Pileup;
use sitewise_io_rs::WriteRecord;

use crate::classify::{Call, Genotyper, LocusClassifier, LocusContext, Model};
use crate::finalize::ValidationSummary;
use crate::reduce::Merge;
use crate::variant::{CallDirection, TruthVariant, ValidationStatus, VariantKind};

/// Shared output for confidently classified truth records. Records arrive in partition input order.
pub type AnnotatedSink<Ctg, Idx> =
    Arc<Mutex<dyn WriteRecord<Record = TruthVariant<Ctg, Idx>> + Send>>;

/// One of the counters of the validation truth table.
///
/// Grid buckets are named `<truth>Called<call>`, e.g. `RefCalledAlt` is a reference site that was
/// called as a variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    AltCalledAlt,
    AltCalledRef,
    AltNotCalled,
    RefCalledAlt,
    RefCalledRef,
    RefNotCalled,
    NoStatusCalledAlt,
    NoStatusCalledRef,
    NoStatusNotCalled,
    NotConfident,
    Uncovered,
}

impl Bucket {
    pub const ALL: [Bucket; 11] = [
        Bucket::AltCalledAlt,
        Bucket::AltCalledRef,
        Bucket::AltNotCalled,
        Bucket::RefCalledAlt,
        Bucket::RefCalledRef,
        Bucket::RefNotCalled,
        Bucket::NoStatusCalledAlt,
        Bucket::NoStatusCalledRef,
        Bucket::NoStatusNotCalled,
        Bucket::NotConfident,
        Bucket::Uncovered,
    ];

    pub fn called_alt(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::Alt => Bucket::AltCalledAlt,
            ValidationStatus::Ref => Bucket::RefCalledAlt,
            ValidationStatus::NoStatus => Bucket::NoStatusCalledAlt,
        }
    }

    pub fn called_ref(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::Alt => Bucket::AltCalledRef,
            ValidationStatus::Ref => Bucket::RefCalledRef,
            ValidationStatus::NoStatus => Bucket::NoStatusCalledRef,
        }
    }

    pub fn not_called(status: ValidationStatus) -> Self {
        match status {
            ValidationStatus::Alt => Bucket::AltNotCalled,
            ValidationStatus::Ref => Bucket::RefNotCalled,
            ValidationStatus::NoStatus => Bucket::NoStatusNotCalled,
        }
    }

    /// Whether the bucket is one of the nine truth × call cells.
    pub fn is_grid(&self) -> bool {
        !matches!(self, Bucket::NotConfident | Bucket::Uncovered)
    }
}

/// Totals of the validation truth table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConfusionCounts {
    counts: [u64; 11],
}

impl ConfusionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, bucket: Bucket) -> &mut Self {
        self.counts[bucket as usize] += 1;
        self
    }

    pub fn get(&self, bucket: Bucket) -> u64 {
        self.counts[bucket as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, u64)> + '_ {
        Bucket::ALL.into_iter().map(|bucket| (bucket, self.get(bucket)))
    }

    /// Sum over the nine truth × call cells.
    pub fn grid_total(&self) -> u64 {
        self.iter()
            .filter(|(bucket, _)| bucket.is_grid())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn summarize(&self) -> ValidationSummary {
        ValidationSummary::new(*self)
    }
}

impl Merge for ConfusionCounts {
    fn merge(&mut self, other: Self) {
        for (this, other) in self.counts.iter_mut().zip(other.counts) {
            *this += other;
        }
    }
}

impl FromIterator<Bucket> for ConfusionCounts {
    fn from_iter<T: IntoIterator<Item = Bucket>>(iter: T) -> Self {
        let mut counts = Self::new();
        for bucket in iter {
            counts.increment(bucket);
        }
        counts
    }
}

/// Which dataset is treated as ground truth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TruthSource {
    /// The `GV` status of the truth records is the truth; calls made from the reads are tested.
    #[default]
    Vcf,
    /// Calls made from the reads are the truth; the truth records are tested.
    Bam,
}

impl Display for TruthSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TruthSource::Vcf => write!(f, "VCF"),
            TruthSource::Bam => write!(f, "BAM"),
        }
    }
}

/// Built-in defaults of the calling engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenotyperDefaults {
    pub min_base_quality: u8,
    pub call_confidence: f64,
    pub emit_confidence: f64,
    pub max_deletion_fraction: f64,
}

impl Default for GenotyperDefaults {
    fn default() -> Self {
        Self {
            min_base_quality: 17,
            call_confidence: 30.0,
            emit_confidence: 30.0,
            max_deletion_fraction: 0.05,
        }
    }
}

/// Effective arguments handed to the calling engine.
#[derive(Clone, Copy, Debug, PartialEq, Getters)]
pub struct GenotyperArgs {
    min_base_quality: u8,
    call_confidence: f64,
    emit_confidence: f64,
    max_deletion_fraction: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub truth: TruthSource,
    /// Sites covered by fewer reads are reported as uncovered
    pub min_depth: Option<u32>,
    pub call_confidence: Option<f64>,
    pub emit_confidence: Option<f64>,
    pub min_base_quality: Option<u8>,
    pub max_deletion_fraction: Option<f64>,
    /// Log discordant and non-confident sites
    pub print_interesting_sites: bool,
}

impl ValidationConfig {
    pub fn with_truth(mut self, truth: TruthSource) -> Self {
        self.truth = truth;
        self
    }

    pub fn with_min_depth(mut self, min_depth: u32) -> Self {
        self.min_depth = Some(min_depth);
        self
    }

    pub fn with_call_confidence(mut self, confidence: f64) -> Self {
        self.call_confidence = Some(confidence);
        self
    }

    pub fn with_emit_confidence(mut self, confidence: f64) -> Self {
        self.emit_confidence = Some(confidence);
        self
    }

    pub fn with_min_base_quality(mut self, quality: u8) -> Self {
        self.min_base_quality = Some(quality);
        self
    }

    pub fn with_max_deletion_fraction(mut self, fraction: f64) -> Self {
        self.max_deletion_fraction = Some(fraction);
        self
    }

    pub fn with_print_interesting_sites(mut self, print: bool) -> Self {
        self.print_interesting_sites = print;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("call confidence", self.call_confidence),
            ("emit confidence", self.emit_confidence),
        ] {
            if let Some(value) = value {
                ensure!(
                    value.is_finite() && value >= 0.0,
                    "The {name} must be a non-negative number, got {value}"
                );
            }
        }
        if let Some(fraction) = self.max_deletion_fraction {
            ensure!(
                (0.0..=1.0).contains(&fraction),
                "The maximum deletion fraction must be within [0, 1], got {fraction}"
            );
        }
        Ok(())
    }

    /// Arguments for the calling engine. Explicit options win over the engine defaults, except
    /// for the deletion fraction which is unrestricted unless set.
    pub fn genotyper_args(&self, defaults: &GenotyperDefaults) -> GenotyperArgs {
        GenotyperArgs {
            min_base_quality: self.min_base_quality.unwrap_or(defaults.min_base_quality),
            call_confidence: self.call_confidence.unwrap_or(defaults.call_confidence),
            emit_confidence: self.emit_confidence.unwrap_or(defaults.emit_confidence),
            max_deletion_fraction: self.max_deletion_fraction.unwrap_or(1.0),
        }
    }
}

/// Compares calls made from the reads against truth records.
pub struct TruthValidator<Ctg: Contig, Idx: PrimInt, P> {
    config: ValidationConfig,
    args: GenotyperArgs,
    genotyper: Box<dyn Genotyper<Ctg, Idx, P>>,
    sink: Option<AnnotatedSink<Ctg, Idx>>,
    staged: Vec<TruthVariant<Ctg, Idx>>,
}

impl<Ctg: Contig, Idx: PrimInt, P> Clone for TruthValidator<Ctg, Idx, P> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            args: self.args,
            genotyper: dyn_clone::clone_box(&*self.genotyper),
            sink: self.sink.clone(),
            staged: Vec::new(),
        }
    }
}

impl<Ctg: Contig, Idx: PrimInt, P> TruthValidator<Ctg, Idx, P> {
    pub fn new(
        config: ValidationConfig,
        defaults: &GenotyperDefaults,
        mut genotyper: Box<dyn Genotyper<Ctg, Idx, P>>,
    ) -> Result<Self> {
        config.validate()?;
        let args = config.genotyper_args(defaults);
        genotyper
            .configure(&args)
            .wrap_err_with(|| format!("Failed to configure the calling engine with {args:?}"))?;
        log::debug!(
            "Validating against the {} truth with {:?} (min depth: {:?})",
            config.truth,
            args,
            config.min_depth
        );
        Ok(Self {
            config,
            args,
            genotyper,
            sink: None,
            staged: Vec::new(),
        })
    }

    pub fn with_sink(mut self, sink: AnnotatedSink<Ctg, Idx>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn args(&self) -> &GenotyperArgs {
        &self.args
    }

    fn interesting(&self, locus: &LocusContext<Ctg, Idx, P>, what: &str) {
        if self.config.print_interesting_sites {
            log::info!(
                "{what} at {}:{}",
                locus.contig(),
                *locus.position() + Idx::one()
            );
        }
    }

    /// Write out the annotated records staged so far. The driver does this per partition; hosts
    /// calling `classify` directly flush on their own.
    pub fn flush(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        self.write_staged(staged)
    }

    fn write_staged(&self, staged: Vec<TruthVariant<Ctg, Idx>>) -> Result<()> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        if staged.is_empty() {
            return Ok(());
        }
        let mut sink = sink
            .lock()
            .map_err(|_| eyre!("Annotated variant sink is poisoned"))?;
        sink.write_records(&staged)
    }

    fn forward(&mut self, truth: &TruthVariant<Ctg, Idx>, call: &Call) {
        if self.sink.is_none() {
            return;
        }
        let direction = if call.is_called_alt(self.args.call_confidence) {
            CallDirection::Alt
        } else {
            CallDirection::Ref
        };
        self.staged.push(truth.annotated(direction));
    }
}

impl<Ctg: Contig, Idx: PrimInt, P: Pileup> TruthValidator<Ctg, Idx, P> {
    fn is_uncovered(&self, locus: &LocusContext<Ctg, Idx, P>) -> bool {
        match self.config.min_depth {
            _ if !locus.has_reads() => true,
            Some(min_depth) if min_depth > 0 => locus.depth() < min_depth as u64,
            _ => false,
        }
    }
}

impl<Ctg: Contig, Idx: PrimInt, P: Pileup> LocusClassifier<Ctg, Idx, P>
    for TruthValidator<Ctg, Idx, P>
{
    type Contribution = ConfusionCounts;
    type Staged = TruthVariant<Ctg, Idx>;

    fn classify(&mut self, locus: &LocusContext<Ctg, Idx, P>) -> Result<Option<ConfusionCounts>> {
        let Some(truth) = locus.truth() else {
            return Ok(None);
        };
        // Loci past the first base of an indel belong to an event that was already counted
        if truth.start() != locus.position() {
            return Ok(None);
        }

        let status = truth.status();
        let mut counts = ConfusionCounts::new();

        if self.is_uncovered(locus) {
            counts
                .increment(Bucket::Uncovered)
                .increment(Bucket::not_called(status));
            return Ok(Some(counts));
        }

        let kind = truth.kind();
        let model = match kind {
            VariantKind::Snp => Model::Snp,
            VariantKind::Indel => Model::Indel,
            // Monomorphic sites are tested against the reads with the SNP model
            _ if self.config.truth == TruthSource::Bam => Model::Snp,
            _ => {
                log::info!("Not a SNP or indel, skipping {truth}");
                return Ok(None);
            }
        };
        let call = self.genotyper.genotype(model, locus)?;

        let confident = match self.config.truth {
            TruthSource::Bam if call.confident => {
                let bucket = match (call.variant, kind != VariantKind::NoVariation) {
                    (true, true) => Bucket::AltCalledAlt,
                    (true, false) => Bucket::AltCalledRef,
                    (false, true) => Bucket::RefCalledAlt,
                    (false, false) => Bucket::RefCalledRef,
                };
                match bucket {
                    Bucket::AltCalledRef => self.interesting(locus, "Truth=ALT Call=REF"),
                    Bucket::RefCalledAlt => self.interesting(locus, "Truth=REF Call=ALT"),
                    _ => {}
                }
                counts.increment(bucket);
                true
            }
            TruthSource::Bam => {
                counts.increment(Bucket::NotConfident);
                self.interesting(locus, "Truth is not confident");
                false
            }
            TruthSource::Vcf => {
                let threshold = self.args.call_confidence;
                if call.is_called_alt(threshold) {
                    if status == ValidationStatus::Ref {
                        self.interesting(locus, "Truth=REF Call=ALT");
                    }
                    counts.increment(Bucket::called_alt(status));
                    true
                } else if call.is_called_ref(threshold) {
                    if status == ValidationStatus::Alt {
                        self.interesting(locus, "Truth=ALT Call=REF");
                    }
                    counts.increment(Bucket::called_ref(status));
                    true
                } else {
                    counts
                        .increment(Bucket::NotConfident)
                        .increment(Bucket::not_called(status));
                    self.interesting(locus, "Truth is not confident");
                    false
                }
            }
        };

        if confident {
            self.forward(truth, &call);
        }
        Ok(Some(counts))
    }

    fn take_staged(&mut self) -> Vec<TruthVariant<Ctg, Idx>> {
        std::mem::take(&mut self.staged)
    }

    fn emit(&self, staged: Vec<TruthVariant<Ctg, Idx>>) -> Result<()> {
        self.write_staged(staged)
    }
}
