use std::fmt::{Display, Formatter};

use ahash::AHashMap;
use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::{ensure, eyre, Result};
use serde::{Deserialize, Serialize};

use crate::pileup::Pileup;

/// What a report column (and a per-locus depth key) stands for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stratification {
    /// One unit per sample, pooling all read groups of that sample.
    #[default]
    Sample,
    /// One unit per read group, even when several read groups share a sample.
    ReadGroup,
}

impl Display for Stratification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stratification::Sample => write!(f, "sample"),
            Stratification::ReadGroup => write!(f, "read group"),
        }
    }
}

/// A read group as declared in the alignment header.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Constructor, Dissolve, Getters)]
pub struct ReadGroupDecl {
    id: String,
    sample: Option<String>,
}

/// The ordered, de-duplicated set of stratification units for a run.
///
/// Resolved once before the first locus and never mutated afterwards; share it as `Arc<Units>`.
/// Unit order is the order of first observation in the read-group declarations and defines the
/// report column order.
#[derive(Clone, Debug, Default)]
pub struct Units {
    mode: Stratification,
    ids: Vec<String>,
    // Read groups pooled into each unit, indexed like `ids`
    members: Vec<Vec<String>>,
    index: AHashMap<String, usize>,
}

impl Units {
    pub fn resolve(
        mode: Stratification,
        read_groups: impl IntoIterator<Item = ReadGroupDecl>,
    ) -> Result<Self> {
        let mut units = Units {
            mode,
            ..Default::default()
        };
        let mut seen = AHashMap::new();

        for (ind, rg) in read_groups.into_iter().enumerate() {
            let (id, sample) = rg.dissolve();
            ensure!(!id.is_empty(), "Read group #{ind} has an empty ID");
            if let Some(previous) = seen.insert(id.clone(), ind) {
                return Err(eyre!(
                    "Read group '{id}' is declared twice (#{previous} and #{ind})"
                ));
            }

            let key = match mode {
                Stratification::ReadGroup => id.clone(),
                Stratification::Sample => sample.ok_or_else(|| {
                    eyre!("Read group '{id}' has no sample (SM) tag, can't stratify by sample")
                })?,
            };

            let unit = match units.index.get(&key) {
                Some(unit) => *unit,
                None => {
                    let unit = units.ids.len();
                    units.index.insert(key.clone(), unit);
                    units.ids.push(key);
                    units.members.push(Vec::new());
                    unit
                }
            };
            units.members[unit].push(id);
        }

        if units.ids.is_empty() {
            log::warn!("No read groups declared, per-{mode} coverage columns will be empty");
        }
        Ok(units)
    }

    pub fn mode(&self) -> Stratification {
        self.mode
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Read groups that feed the given unit.
    pub fn read_groups(&self, unit: usize) -> &[String] {
        &self.members[unit]
    }

    /// Depth of coverage of a single unit at the pileup's locus.
    /// 0 when the unit has no reads there.
    pub fn depth(&self, unit: usize, pileup: &impl Pileup) -> u64 {
        self.members[unit]
            .iter()
            .map(|rg| pileup.depth_of_read_group(rg))
            .sum()
    }

    /// Depths of all units in unit order.
    pub fn depths<'a, P: Pileup>(&'a self, pileup: &'a P) -> impl Iterator<Item = u64> + 'a {
        (0..self.len()).map(move |unit| self.depth(unit, pileup))
    }
}
