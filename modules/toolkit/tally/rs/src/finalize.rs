use derive_getters::{Dissolve, Getters};
use eyre::{eyre, Result};
use sitewise_core_rs::loc::{Contig, Region};
use sitewise_core_rs::num::PrimInt;
use sitewise_core_rs::strat::Units;

use crate::confusion::{Bucket, ConfusionCounts};
use crate::coverage::{CoverageCounts, CoverageKey};

/// Finalized values of one interval.
#[derive(Clone, Debug, PartialEq, Dissolve, Getters)]
pub struct CoverageRow<Ctg: Contig, Idx: PrimInt> {
    region: Region<Ctg, Idx>,
    size: u64,
    /// Fraction of G/C reference bases
    gc: Option<f64>,
    /// Present only when a SNP key was recorded in the interval
    snps: Option<u64>,
    indels: Option<u64>,
    /// Average depth per stratification unit, in unit order
    units: Vec<Option<f64>>,
}

impl<Ctg: Contig, Idx: PrimInt> CoverageRow<Ctg, Idx> {
    pub fn finalize(
        region: Region<Ctg, Idx>,
        units: usize,
        counts: &CoverageCounts,
    ) -> Result<Self> {
        let size = region
            .len()
            .to_u64()
            .ok_or_else(|| eyre!("Length of {region} doesn't fit into u64"))?;
        let average = |key: CoverageKey| counts.get(&key).map(|sum| sum as f64 / size as f64);

        Ok(Self {
            gc: average(CoverageKey::Gc),
            snps: counts.get(&CoverageKey::Snp),
            indels: counts.get(&CoverageKey::Indel),
            units: (0..units).map(|unit| average(CoverageKey::Unit(unit))).collect(),
            region,
            size,
        })
    }
}

/// Finalized coverage report, one row per interval.
#[derive(Clone, Debug, PartialEq, Dissolve, Getters)]
pub struct CoverageTable<Ctg: Contig, Idx: PrimInt> {
    /// Stratification unit per column, in column order
    columns: Vec<String>,
    rows: Vec<CoverageRow<Ctg, Idx>>,
}

impl<Ctg: Contig, Idx: PrimInt> CoverageTable<Ctg, Idx> {
    pub fn finalize(
        units: &Units,
        intervals: impl IntoIterator<Item = (Region<Ctg, Idx>, CoverageCounts)>,
    ) -> Result<Self> {
        let rows = intervals
            .into_iter()
            .map(|(region, counts)| CoverageRow::finalize(region, units.len(), &counts))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            columns: units.ids().to_vec(),
            rows,
        })
    }
}

/// Derived statistics of the validation truth table, all in percent.
#[derive(Clone, Copy, Debug, PartialEq, Dissolve, Getters)]
pub struct ValidationSummary {
    counts: ConfusionCounts,
    /// Undefined (NaN) without ALT calls
    ppv: f64,
    /// Undefined (NaN) without REF calls
    npv: f64,
    /// Undefined (NaN) without called ALT sites
    sensitivity: f64,
    /// 100 without called REF sites
    specificity: f64,
}

impl ValidationSummary {
    pub fn new(counts: ConfusionCounts) -> Self {
        let [alt_alt, ref_alt, alt_ref, ref_ref] = [
            Bucket::AltCalledAlt,
            Bucket::RefCalledAlt,
            Bucket::AltCalledRef,
            Bucket::RefCalledRef,
        ]
        .map(|bucket| counts.get(bucket) as f64);

        let specificity = if ref_ref + ref_alt > 0.0 {
            100.0 * ref_ref / (ref_ref + ref_alt)
        } else {
            100.0
        };
        Self {
            counts,
            ppv: 100.0 * alt_alt / (alt_alt + ref_alt),
            npv: 100.0 * ref_ref / (ref_ref + alt_ref),
            sensitivity: 100.0 * alt_alt / (alt_alt + alt_ref),
            specificity,
        }
    }
}
