use std::sync::Arc;

use sitewise_core_rs::loc::Region;
use sitewise_core_rs::pileup::ReadGroupDepths;
use sitewise_core_rs::strat::{ReadGroupDecl, Stratification, Units};
use sitewise_tally_rs::{
    CoverageConfig, CoverageCounts, CoverageTable, Driver, GcCoverage, IntervalLedger,
    LocusClassifier, LocusContext, Partition, TruthVariant,
};

type Locus = LocusContext<String, u64, ReadGroupDepths>;

fn units(mode: Stratification) -> Arc<Units> {
    let decls = [
        ReadGroupDecl::new("lane1".into(), Some("NA12878".into())),
        ReadGroupDecl::new("lane2".into(), Some("NA12878".into())),
        ReadGroupDecl::new("lane3".into(), Some("NA12891".into())),
    ];
    Arc::new(
        CoverageConfig::default()
            .with_stratification(mode)
            .units(decls)
            .unwrap(),
    )
}

/// Loci of `sequence` starting at `start`; `snps` and `indels` hold offsets with truth records.
fn loci(
    start: u64,
    sequence: &[u8],
    snps: &[usize],
    indels: &[usize],
    depths: &[(&str, u64)],
) -> Vec<Locus> {
    sequence
        .iter()
        .enumerate()
        .map(|(offset, base)| {
            let position = start + offset as u64;
            let truth = if snps.contains(&offset) {
                Some(TruthVariant::new("chr1".to_string(), position, "A", ["C"]).unwrap())
            } else if indels.contains(&offset) {
                Some(TruthVariant::new("chr1".to_string(), position, "A", ["AC"]).unwrap())
            } else {
                None
            };
            let pileup = (!depths.is_empty()).then(|| depths.iter().copied().collect());
            LocusContext::new("chr1".to_string(), position, *base, truth, pileup)
        })
        .collect()
}

#[test]
fn test_single_sample_interval() {
    let decls = [ReadGroupDecl::new("rg1".into(), Some("S1".into()))];
    let units = Arc::new(Units::resolve(Stratification::Sample, decls).unwrap());

    let region = Region::from_bounds("chr1".to_string(), 1000u64, 1010).unwrap();
    let partition = Partition::new(
        region,
        loci(1000, b"GCGCAAAAAT", &[5], &[], &[("rg1", 2)]),
    );

    let mut driver = Driver::new(GcCoverage::new(units.clone()));
    let results = driver.run_by_interval(vec![partition]).unwrap();
    let table = CoverageTable::finalize(&units, results).unwrap();

    let row = &table.rows()[0];
    assert_eq!(row.region().to_string(), "chr1:1001-1010");
    assert_eq!(*row.gc(), Some(0.4));
    assert_eq!(*row.size(), 10);
    assert_eq!(*row.snps(), Some(1));
    assert_eq!(row.units(), &[Some(2.0)]);
    // One SNP record and nine loci without truth: the Indel key was emitted as zero
    assert_eq!(*row.indels(), Some(0));
}

#[test]
fn test_column_suppression() {
    let units = units(Stratification::Sample);
    let region = Region::from_bounds("chr1".to_string(), 0u64, 4).unwrap();
    // Every locus carries a SNP record, so the indel key is never produced
    let partition = Partition::new(region, loci(0, b"ACGT", &[0, 1, 2, 3], &[], &[]));

    let mut driver = Driver::new(GcCoverage::new(units.clone()));
    let intervals = driver.run_by_interval(vec![partition]).unwrap();
    let table = CoverageTable::finalize(&units, intervals).unwrap();
    let row = &table.rows()[0];
    assert_eq!(*row.snps(), Some(4));
    assert_eq!(*row.indels(), None);

    let mut tsv = Vec::new();
    table.write_tsv(&mut tsv).unwrap();
    let tsv = String::from_utf8(tsv).unwrap();
    assert_eq!(
        tsv.lines().collect::<Vec<_>>(),
        [
            "Interval\tGCContent\tIntervalSize\tSNPs\tIndels\tNA12878\tNA12891",
            "chr1:1-4\t0.5\t4\t4\t\t0\t0",
        ]
    );
}

#[test]
fn test_stratification_modes() {
    let depths = [("lane1", 1), ("lane2", 3), ("lane3", 5)];
    for (mode, expected) in [
        (Stratification::Sample, vec![Some(4.0), Some(5.0)]),
        (Stratification::ReadGroup, vec![Some(1.0), Some(3.0), Some(5.0)]),
    ] {
        let units = units(mode);
        let region = Region::from_bounds("chr1".to_string(), 0u64, 2).unwrap();
        let partition = Partition::new(region, loci(0, b"AC", &[], &[1], &depths));

        let mut driver = Driver::new(GcCoverage::new(units.clone()));
        let results = driver.run_by_interval(vec![partition]).unwrap();
        let table = CoverageTable::finalize(&units, results).unwrap();
        assert_eq!(table.rows()[0].units(), &expected);
        assert_eq!(*table.rows()[0].indels(), Some(1));
    }
}

#[test]
fn test_gc_bound() {
    let units = units(Stratification::Sample);
    let sequences: [&[u8]; 4] = [b"GGGGG", b"AAAAT", b"acgtn", b"CgCgN"];
    let partitions = sequences
        .iter()
        .enumerate()
        .map(|(ind, sequence)| {
            let start = ind as u64 * 5;
            let region = Region::from_bounds("chr1".to_string(), start, start + 5).unwrap();
            Partition::new(region, loci(start, sequence, &[], &[], &[]))
        })
        .collect();

    let mut driver = Driver::new(GcCoverage::new(units.clone()))
        .with_threads(2)
        .unwrap();
    let intervals = driver.run_by_interval(partitions).unwrap();
    let table = CoverageTable::finalize(&units, intervals).unwrap();
    let gc = table.rows().iter().map(|row| row.gc().unwrap()).collect::<Vec<_>>();
    assert_eq!(gc, [1.0, 0.0, 0.4, 0.8]);
    assert!(gc.iter().all(|x| (0.0..=1.0).contains(x)));
}

#[test]
fn test_streaming_intervals() {
    let units = units(Stratification::ReadGroup);
    let mut classifier = GcCoverage::new(units.clone());
    let mut ledger = IntervalLedger::<String, u64, CoverageCounts>::new();

    let first = Region::from_bounds("chr1".to_string(), 0u64, 3).unwrap();
    let second = Region::from_bounds("chr1".to_string(), 3u64, 6).unwrap();
    ledger.open(first.clone()).unwrap();
    ledger.open(second.clone()).unwrap();

    for locus in loci(0, b"GGGAAA", &[], &[], &[("lane3", 3)]) {
        let region = if first.contains(locus.contig(), *locus.position()) {
            &first
        } else {
            &second
        };
        ledger.add(region, classifier.classify(&locus).unwrap()).unwrap();
    }

    let mut finished = Vec::new();
    for region in [&second, &first] {
        let (region, accumulator) = ledger.close(region).unwrap();
        assert_eq!(accumulator.loci(), 3);
        finished.push((region, accumulator.finish()));
    }
    assert_eq!(ledger.pending(), 0);

    let table = CoverageTable::finalize(&units, finished).unwrap();
    assert_eq!(table.rows()[0].region(), &second);
    assert_eq!(*table.rows()[0].gc(), Some(0.0));
    assert_eq!(*table.rows()[1].gc(), Some(1.0));
    assert_eq!(table.rows()[1].units(), &[Some(0.0), Some(0.0), Some(3.0)]);
}
