pub use accumulate::{Accumulator, IntervalLedger, RunningTotal};
pub use classify::{Call, Genotyper, LocusClassifier, LocusContext, Model};
pub use confusion::{
    AnnotatedSink, Bucket, ConfusionCounts, GenotyperArgs, GenotyperDefaults, TruthSource,
    TruthValidator, ValidationConfig,
};
pub use counts::CountVector;
pub use coverage::{CoverageConfig, CoverageCounts, CoverageKey, GcCoverage};
pub use driver::{Driver, Partition};
pub use finalize::{CoverageRow, CoverageTable, ValidationSummary};
pub use reduce::Merge;
pub use variant::{CallDirection, TruthVariant, ValidationStatus, VariantKind};

mod accumulate;
mod classify;
mod confusion;
mod counts;
mod coverage;
mod driver;
mod finalize;
pub mod reduce;
mod report;
pub mod variant;
