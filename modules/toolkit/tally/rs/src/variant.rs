use std::fmt::{Display, Formatter};

use derive_getters::Getters;
use eyre::{ensure, Result};
use indexmap::IndexMap;
use sitewise_core_rs::loc::Contig;
use sitewise_core_rs::num::PrimInt;

/// INFO attribute holding the validation status of a truth record.
pub const VALIDATION_STATUS: &str = "GV";
/// INFO attribute recording the observed call direction of a forwarded truth record.
pub const CALL_STATUS: &str = "callStatus";

/// Variant class inferred from the REF/ALT alleles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariantKind {
    NoVariation,
    Snp,
    Mnp,
    Indel,
    Symbolic,
    Mixed,
}

/// Ground truth for a truth record, taken from its `GV` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidationStatus {
    /// `GV=T`: the site is a real variant.
    Alt,
    /// `GV=F`: the site is reference.
    Ref,
    /// Anything else, including no `GV` attribute at all.
    NoStatus,
}

/// Direction of a confident call, as written to the `callStatus` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallDirection {
    Alt,
    Ref,
}

impl Display for CallDirection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CallDirection::Alt => write!(f, "ALT"),
            CallDirection::Ref => write!(f, "REF"),
        }
    }
}

/// A record of the truth callset overlapping a locus.
#[derive(Clone, Debug, PartialEq, Getters)]
pub struct TruthVariant<Ctg: Contig, Idx: PrimInt> {
    contig: Ctg,
    /// 0-based position of the first REF base.
    start: Idx,
    reference: String,
    alternatives: Vec<String>,
    attributes: IndexMap<String, String>,
}

impl<Ctg: Contig, Idx: PrimInt> TruthVariant<Ctg, Idx> {
    pub fn new(
        contig: Ctg,
        start: Idx,
        reference: impl Into<String>,
        alternatives: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        let reference = reference.into();
        ensure!(
            !reference.is_empty(),
            "Truth record at {contig}:{start} has an empty REF allele"
        );
        let alternatives = alternatives.into_iter().map(Into::into).collect();
        Ok(Self {
            contig,
            start,
            reference,
            alternatives,
            attributes: IndexMap::new(),
        })
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn kind(&self) -> VariantKind {
        // Missing ALT and the VCF "no call" allele both mean a monomorphic site
        let alts = self.alternatives.iter().filter(|alt| alt.as_str() != ".");

        let mut kind = None;
        for alt in alts {
            let this = if alt.starts_with('<') || alt.contains('[') || alt.contains(']') {
                VariantKind::Symbolic
            } else if alt.len() != self.reference.len() {
                VariantKind::Indel
            } else if alt.len() == 1 {
                VariantKind::Snp
            } else {
                VariantKind::Mnp
            };
            kind = match kind {
                None => Some(this),
                Some(previous) if previous == this => Some(this),
                Some(_) => Some(VariantKind::Mixed),
            };
        }
        kind.unwrap_or(VariantKind::NoVariation)
    }

    pub fn is_snp(&self) -> bool {
        self.kind() == VariantKind::Snp
    }

    pub fn is_indel(&self) -> bool {
        self.kind() == VariantKind::Indel
    }

    pub fn is_variant(&self) -> bool {
        self.kind() != VariantKind::NoVariation
    }

    pub fn status(&self) -> ValidationStatus {
        match self.attribute(VALIDATION_STATUS) {
            Some("T") => ValidationStatus::Alt,
            Some("F") => ValidationStatus::Ref,
            _ => ValidationStatus::NoStatus,
        }
    }

    pub fn call_status(&self) -> Option<&str> {
        self.attribute(CALL_STATUS)
    }

    /// Copy of the record carrying the observed call direction. An existing `callStatus` is kept.
    pub fn annotated(&self, direction: CallDirection) -> Self {
        let mut record = self.clone();
        if !record.attributes.contains_key(CALL_STATUS) {
            record
                .attributes
                .insert(CALL_STATUS.to_string(), direction.to_string());
        }
        record
    }
}

impl<Ctg: Contig, Idx: PrimInt> Display for TruthVariant<Ctg, Idx> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} {}>{}",
            self.contig,
            self.start + Idx::one(),
            self.reference,
            self.alternatives.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn variant(reference: &str, alts: &[&str]) -> TruthVariant<String, u64> {
        TruthVariant::new("chr1".to_string(), 99, reference, alts.iter().copied()).unwrap()
    }

    #[rstest]
    #[case("A", &[], VariantKind::NoVariation)]
    #[case("A", &["."], VariantKind::NoVariation)]
    #[case("A", &["G"], VariantKind::Snp)]
    #[case("A", &["G", "T"], VariantKind::Snp)]
    #[case("AC", &["GT"], VariantKind::Mnp)]
    #[case("A", &["AT"], VariantKind::Indel)]
    #[case("ATT", &["A"], VariantKind::Indel)]
    #[case("A", &["<DEL>"], VariantKind::Symbolic)]
    #[case("A", &["G", "AT"], VariantKind::Mixed)]
    fn test_kind(#[case] reference: &str, #[case] alts: &[&str], #[case] expected: VariantKind) {
        assert_eq!(variant(reference, alts).kind(), expected);
    }

    #[rstest]
    #[case(Some("T"), ValidationStatus::Alt)]
    #[case(Some("F"), ValidationStatus::Ref)]
    #[case(Some("maybe"), ValidationStatus::NoStatus)]
    #[case(None, ValidationStatus::NoStatus)]
    fn test_status(#[case] gv: Option<&str>, #[case] expected: ValidationStatus) {
        let mut record = variant("A", &["G"]);
        if let Some(gv) = gv {
            record = record.with_attribute(VALIDATION_STATUS, gv);
        }
        assert_eq!(record.status(), expected);
    }

    #[test]
    fn test_annotated_keeps_existing_call_status() {
        let record = variant("A", &["G"]);
        let annotated = record.annotated(CallDirection::Ref);
        assert_eq!(annotated.call_status(), Some("REF"));
        assert_eq!(record.call_status(), None);

        let again = annotated.annotated(CallDirection::Alt);
        assert_eq!(again.call_status(), Some("REF"));
    }

    #[test]
    fn test_display() {
        assert_eq!(variant("A", &["G", "T"]).to_string(), "chr1:100 A>G,T");
    }

    #[test]
    fn test_empty_reference_is_rejected() {
        assert!(TruthVariant::<String, u64>::new("chr1".to_string(), 0, "", ["A"]).is_err());
    }
}
