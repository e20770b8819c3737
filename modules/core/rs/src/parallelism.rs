use std::cmp::Ordering;
use std::thread::available_parallelism;

use eyre::{Result, WrapErr};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Map a requested thread count onto `[1, max]`. Zero means a single thread; negative values
/// count back from the number of available cores (-1 is "all of them").
fn normalize(requested: isize, max: isize) -> usize {
    match requested.cmp(&0) {
        Ordering::Less => (max + requested + 1).max(1) as usize,
        Ordering::Equal => 1,
        Ordering::Greater => requested.min(max) as usize,
    }
}

pub fn available(requested: isize) -> Result<usize> {
    let max = available_parallelism()
        .wrap_err("Failed to query the available parallelism")?
        .get() as isize;
    Ok(normalize(requested, max))
}

/// Build a dedicated rayon pool for a tally run.
pub fn pool(requested: isize) -> Result<ThreadPool> {
    let threads = available(requested)?;
    log::debug!("Building a thread pool with {threads} worker(s)");
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|ind| format!("sitewise-{ind}"))
        .build()
        .wrap_err("Failed to build the thread pool")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 4, 1)]
    #[case(1, 4, 1)]
    #[case(3, 4, 3)]
    #[case(4, 4, 4)]
    #[case(1231, 4, 4)]
    #[case(-1, 4, 4)]
    #[case(-3, 4, 2)]
    #[case(-4, 4, 1)]
    #[case(-5, 4, 1)]
    fn test_normalize(#[case] requested: isize, #[case] max: isize, #[case] expected: usize) {
        assert_eq!(normalize(requested, max), expected);
    }

    #[test]
    fn test_pool() {
        let pool = pool(1).unwrap();
        assert_eq!(pool.current_num_threads(), 1);
    }
}
