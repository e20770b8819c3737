use std::fmt::{Display, Formatter};
use std::io::Write;

use eyre::{Result, WrapErr};
use itertools::Itertools;
use sitewise_core_rs::loc::Contig;
use sitewise_core_rs::num::PrimInt;

use crate::confusion::Bucket;
use crate::finalize::{CoverageRow, CoverageTable, ValidationSummary};

const FIXED_COLUMNS: [&str; 5] = ["Interval", "GCContent", "IntervalSize", "SNPs", "Indels"];
const RULE: &str = "------------------------------------------------------------------";

fn cell<T: Display>(value: &Option<T>) -> String {
    value.as_ref().map(|x| x.to_string()).unwrap_or_default()
}

impl<Ctg: Contig, Idx: PrimInt> CoverageRow<Ctg, Idx> {
    /// Cells of the row in column order. Absent values are empty.
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.region().to_string(),
            cell(self.gc()),
            self.size().to_string(),
            cell(self.snps()),
            cell(self.indels()),
        ];
        cells.extend(self.units().iter().map(cell));
        cells
    }
}

impl<Ctg: Contig, Idx: PrimInt> CoverageTable<Ctg, Idx> {
    pub fn header(&self) -> Vec<String> {
        FIXED_COLUMNS
            .iter()
            .map(|x| x.to_string())
            .chain(self.columns().iter().cloned())
            .collect()
    }

    /// Tab-separated rendering with a header line.
    pub fn write_tsv(&self, mut writer: impl Write) -> Result<()> {
        writeln!(writer, "{}", self.header().join("\t")).wrap_err("Failed to write the header")?;
        for row in self.rows() {
            writeln!(writer, "{}", row.cells().join("\t"))
                .wrap_err_with(|| format!("Failed to write the row for {}", row.region()))?;
        }
        writer.flush().wrap_err("Failed to flush the coverage report")?;
        Ok(())
    }
}

impl ValidationSummary {
    /// Log the truth table at the info level.
    pub fn log(&self) {
        log::info!("Resulting Truth Table Output\n\n{self}");
    }
}

impl Display for ValidationSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let counts = self.counts();
        let grid = [
            (
                "called alt",
                [Bucket::AltCalledAlt, Bucket::RefCalledAlt, Bucket::NoStatusCalledAlt],
            ),
            (
                "called ref",
                [Bucket::AltCalledRef, Bucket::RefCalledRef, Bucket::NoStatusCalledRef],
            ),
            (
                "not called",
                [Bucket::AltNotCalled, Bucket::RefNotCalled, Bucket::NoStatusNotCalled],
            ),
        ];

        writeln!(f, "{RULE}")?;
        writeln!(f, "\t\t|\tALT\t|\tREF\t|\tNo Status")?;
        writeln!(f, "{RULE}")?;
        for (name, buckets) in grid {
            let cells = buckets.iter().map(|b| counts.get(*b)).join("\t|\t");
            writeln!(f, "{name}\t|\t{cells}")?;
        }
        writeln!(f, "{RULE}")?;
        writeln!(f, "positive predictive value: {:.6}%", self.ppv())?;
        writeln!(f, "negative predictive value: {:.6}%", self.npv())?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "sensitivity: {:.6}%", self.sensitivity())?;
        writeln!(f, "specificity: {:.6}%", self.specificity())?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "not confident: {}", counts.get(Bucket::NotConfident))?;
        writeln!(f, "not covered: {}", counts.get(Bucket::Uncovered))?;
        writeln!(f, "{RULE}")
    }
}
