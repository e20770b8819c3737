use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use derive_getters::{Dissolve, Getters};
use derive_more::Constructor;
use eyre::{ensure, eyre, Result, WrapErr};
use itertools::Itertools;
use rayon::ThreadPool;
use sitewise_core_rs::loc::{Contig, Region};
use sitewise_core_rs::num::PrimInt;
use sitewise_core_rs::parallelism;
use thread_local::ThreadLocal;

use crate::accumulate::Accumulator;
use crate::classify::{LocusClassifier, LocusContext};
use crate::reduce;

/// A region of the genome together with the loci the host visits inside it.
#[derive(Clone, Debug, Constructor, Dissolve, Getters)]
pub struct Partition<Ctg: Contig, Idx: PrimInt, I> {
    region: Region<Ctg, Idx>,
    loci: I,
}

struct Worker<C, T, S> {
    classifier: C,
    // (Partition id, result, staged records)
    finished: Vec<(usize, Accumulator<T>, Vec<S>)>,
}

impl<C, T, S> Worker<C, T, S> {
    fn new(classifier: C) -> Self {
        Self {
            classifier,
            finished: Vec::new(),
        }
    }

    fn reset(&mut self, classifier: C) {
        self.classifier = classifier;
        self.finished.clear();
    }

    fn process<Ctg, Idx, P, I>(
        &mut self,
        ind: usize,
        partition: Partition<Ctg, Idx, I>,
    ) -> Result<()>
    where
        Ctg: Contig,
        Idx: PrimInt,
        C: LocusClassifier<Ctg, Idx, P, Contribution = T, Staged = S>,
        T: Default + reduce::Merge,
        I: IntoIterator<Item = LocusContext<Ctg, Idx, P>>,
    {
        let (region, loci) = partition.dissolve();
        // Leftovers of an aborted run
        self.classifier.take_staged();

        let mut accumulator = Accumulator::new();
        for locus in loci {
            ensure!(
                region.contains(locus.contig(), *locus.position()),
                "Locus {}:{} lies outside of its partition {region}",
                locus.contig(),
                *locus.position() + Idx::one()
            );
            accumulator.absorb(self.classifier.classify(&locus)?);
        }
        let staged = self.classifier.take_staged();
        self.finished.push((ind, accumulator, staged));
        Ok(())
    }
}

/// Runs a locus classifier over independent partitions and merges the results.
///
/// Every worker thread owns its own clone of the classifier. Partitions are processed in any order
/// on any worker; results don't depend on either. Staged records are emitted through the driver's
/// classifier once all partitions are done, in partition input order.
pub struct Driver<Ctg, Idx, P, C>
where
    Ctg: Contig,
    Idx: PrimInt,
    C: LocusClassifier<Ctg, Idx, P>,
{
    thread_pool: Option<ThreadPool>,
    classifier: C,
    workers: ThreadLocal<RefCell<Worker<C, C::Contribution, C::Staged>>>,
    _phantom: PhantomData<fn() -> (Ctg, Idx, P)>,
}

impl<Ctg, Idx, P, C> Driver<Ctg, Idx, P, C>
where
    Ctg: Contig,
    Idx: PrimInt,
    C: LocusClassifier<Ctg, Idx, P> + Sync,
{
    /// Driver running on the global rayon pool.
    pub fn new(classifier: C) -> Self {
        Self {
            thread_pool: None,
            classifier,
            workers: ThreadLocal::new(),
            _phantom: PhantomData,
        }
    }

    pub fn with_pool(mut self, pool: ThreadPool) -> Self {
        self.thread_pool = Some(pool);
        self
    }

    /// Use a dedicated pool with the requested number of threads, see [`parallelism::available`].
    pub fn with_threads(self, requested: isize) -> Result<Self> {
        Ok(self.with_pool(parallelism::pool(requested)?))
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// One merged contribution per partition, in input order.
    pub fn run_by_interval<I>(
        &mut self,
        partitions: Vec<Partition<Ctg, Idx, I>>,
    ) -> Result<Vec<(Region<Ctg, Idx>, C::Contribution)>>
    where
        I: IntoIterator<Item = LocusContext<Ctg, Idx, P>> + Send,
    {
        let results = self.install(|driver| driver._run(partitions))?;
        Ok(results
            .into_iter()
            .map(|(region, accumulator)| (region, accumulator.finish()))
            .collect())
    }

    /// Single contribution merged over all partitions.
    pub fn run_global<I>(
        &mut self,
        partitions: Vec<Partition<Ctg, Idx, I>>,
    ) -> Result<C::Contribution>
    where
        I: IntoIterator<Item = LocusContext<Ctg, Idx, P>> + Send,
    {
        let total = self.install(|driver| {
            let results = driver._run(partitions)?;
            let parts = results.into_iter().map(|(_, acc)| acc).collect();
            Ok::<_, eyre::Report>(reduce::tree(parts))
        })?;
        log::debug!("Merged the tally over {} loci", total.loci());
        Ok(total.finish())
    }

    fn install<R: Send>(&mut self, job: impl FnOnce(&mut Self) -> R + Send) -> R {
        match self.thread_pool.take() {
            Some(pool) => {
                let result = pool.install(|| job(self));
                self.thread_pool = Some(pool);
                result
            }
            None => job(self),
        }
    }

    fn _run<I>(
        &mut self,
        partitions: Vec<Partition<Ctg, Idx, I>>,
    ) -> Result<Vec<(Region<Ctg, Idx>, Accumulator<C::Contribution>)>>
    where
        I: IntoIterator<Item = LocusContext<Ctg, Idx, P>> + Send,
    {
        // Soft-reset all workers
        for worker in self.workers.iter_mut() {
            worker.get_mut().reset(self.classifier.clone());
        }

        let regions = partitions
            .iter()
            .map(|p| p.region().clone())
            .collect::<Vec<_>>();
        warn_on_overlaps(&regions);

        let has_failed = AtomicBool::new(false);
        let (workers, classifier) = (&self.workers, &self.classifier);
        rayon::scope(|s| {
            for (ind, partition) in partitions.into_iter().enumerate() {
                // Stop scheduling new partitions if any of the threads has failed
                if has_failed.load(Ordering::Relaxed) {
                    return;
                }

                let has_failed = &has_failed;
                s.spawn(move |_| {
                    if has_failed.load(Ordering::Relaxed) {
                        return;
                    }

                    let mut worker = workers
                        .get_or(|| RefCell::new(Worker::new(classifier.clone())))
                        .borrow_mut();
                    if let Err(err) = worker.process(ind, partition) {
                        has_failed.store(true, Ordering::Relaxed);
                        log::error!("Tally failed: {:?}", err);
                    }
                });
            }
        });

        if has_failed.into_inner() {
            return Err(eyre!("Tally internal error. See log for details."));
        }

        // Each partition is processed by exactly one worker
        let mut collected = (0..regions.len()).map(|_| None).collect::<Vec<_>>();
        for worker in self.workers.iter_mut() {
            for (ind, accumulator, staged) in worker.get_mut().finished.drain(..) {
                collected[ind] = Some((accumulator, staged));
            }
        }

        let mut results = Vec::with_capacity(regions.len());
        for (region, partition) in regions.into_iter().zip(collected) {
            let Some((accumulator, staged)) = partition else {
                return Err(eyre!("Partition {region} was never processed"));
            };
            self.classifier
                .emit(staged)
                .wrap_err_with(|| format!("Failed to emit records staged in {region}"))?;
            results.push((region, accumulator));
        }
        log::debug!(
            "Processed {} partitions, {} loci in total",
            results.len(),
            results.iter().map(|(_, acc)| acc.loci()).sum::<u64>()
        );
        Ok(results)
    }
}

fn warn_on_overlaps<Ctg: Contig, Idx: PrimInt>(regions: &[Region<Ctg, Idx>]) {
    for (prev, next) in regions.iter().sorted().tuple_windows() {
        if prev.contig() == next.contig() && prev.interval().end() > next.interval().start() {
            log::warn!("Partitions {prev} and {next} overlap, shared loci are counted twice");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::CountVector;
    use std::sync::{Arc, Mutex};
    use sitewise_core_rs::pileup::ReadGroupDepths;

    type Locus = LocusContext<String, u32, ReadGroupDepths>;

    /// Counts reference bases.
    #[derive(Clone)]
    struct Bases;

    impl LocusClassifier<String, u32, ReadGroupDepths> for Bases {
        type Contribution = CountVector<u8>;
        type Staged = ();

        fn classify(&mut self, locus: &Locus) -> Result<Option<CountVector<u8>>> {
            match locus.reference() {
                b'N' => Ok(None),
                base => Ok(Some([(*base, 1)].into_iter().collect())),
            }
        }
    }

    /// Stages the position of every adenine and collects them in a shared output.
    #[derive(Clone, Default)]
    struct Adenines {
        staged: Vec<u32>,
        output: Arc<Mutex<Vec<u32>>>,
    }

    impl LocusClassifier<String, u32, ReadGroupDepths> for Adenines {
        type Contribution = u64;
        type Staged = u32;

        fn classify(&mut self, locus: &Locus) -> Result<Option<u64>> {
            if *locus.reference() != b'A' {
                return Ok(None);
            }
            self.staged.push(*locus.position());
            Ok(Some(1))
        }

        fn take_staged(&mut self) -> Vec<u32> {
            std::mem::take(&mut self.staged)
        }

        fn emit(&self, staged: Vec<u32>) -> Result<()> {
            self.output.lock().unwrap().extend(staged);
            Ok(())
        }
    }

    fn partition(start: u32, sequence: &[u8]) -> Partition<String, u32, Vec<Locus>> {
        let end = start + sequence.len() as u32;
        let region = Region::from_bounds("chr1".to_string(), start, end).unwrap();
        let loci = sequence
            .iter()
            .enumerate()
            .map(|(offset, base)| {
                LocusContext::new("chr1".to_string(), start + offset as u32, *base, None, None)
            })
            .collect();
        Partition::new(region, loci)
    }

    fn partitions() -> Vec<Partition<String, u32, Vec<Locus>>> {
        vec![
            partition(0, b"ACGT"),
            partition(4, b"GGNN"),
            partition(8, b"TTTA"),
            partition(12, b"C"),
        ]
    }

    #[test]
    fn test_run_by_interval_keeps_input_order() {
        for threads in [1, 4] {
            let mut driver = Driver::new(Bases).with_threads(threads).unwrap();
            let results = driver.run_by_interval(partitions()).unwrap();

            let regions = results.iter().map(|(r, _)| r.to_string()).collect::<Vec<_>>();
            assert_eq!(regions, ["chr1:1-4", "chr1:5-8", "chr1:9-12", "chr1:13-13"]);
            assert_eq!(results[1].1, CountVector::from_iter([(b'G', 2)]));
            assert_eq!(results[2].1, CountVector::from_iter([(b'T', 3), (b'A', 1)]));
        }
    }

    #[test]
    fn test_run_global() {
        let mut driver = Driver::new(Bases);
        let total = driver.run_global(partitions()).unwrap();
        let expected: CountVector<u8> = [(b'A', 2), (b'C', 2), (b'G', 3), (b'T', 4)]
            .into_iter()
            .collect();
        assert_eq!(total, expected);

        // Drivers are reusable
        assert_eq!(driver.run_global(partitions()).unwrap(), expected);
        assert!(driver.run_global(Vec::<Partition<_, _, Vec<Locus>>>::new()).unwrap().is_empty());
    }

    #[test]
    fn test_staged_records_follow_input_order() {
        let partitions = || {
            (0..32u32)
                .map(|ind| partition(ind * 6, b"ACAGTA"))
                .collect::<Vec<_>>()
        };
        let expected = (0..32u32)
            .flat_map(|ind| [ind * 6, ind * 6 + 2, ind * 6 + 5])
            .collect::<Vec<_>>();

        for threads in [1, 4] {
            let classifier = Adenines::default();
            let output = classifier.output.clone();
            let mut driver = Driver::new(classifier).with_threads(threads).unwrap();

            assert_eq!(driver.run_global(partitions()).unwrap(), 96);
            assert_eq!(*output.lock().unwrap(), expected);

            output.lock().unwrap().clear();
            driver.run_by_interval(partitions()).unwrap();
            assert_eq!(*output.lock().unwrap(), expected);
        }
    }

    #[test]
    fn test_locus_outside_partition() {
        let mut broken = partition(0, b"AC");
        broken.loci.push(LocusContext::new("chr1".to_string(), 7, b'A', None, None));

        let mut driver = Driver::new(Bases).with_threads(2).unwrap();
        assert!(driver.run_global(vec![partition(10, b"AC"), broken]).is_err());
    }
}
