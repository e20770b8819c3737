use rayon::prelude::*;

/// Associative and commutative combination of two partial tallies.
///
/// Every implementation must satisfy `a.merged(b) == b.merged(a)` and
/// `a.merged(b).merged(c) == a.merged(b.merged(c))`, so that partial results can be combined in any
/// order and in any tree shape. `Default` is the neutral element.
pub trait Merge: Sized {
    fn merge(&mut self, other: Self);

    fn merged(mut self, other: Self) -> Self {
        self.merge(other);
        self
    }
}

impl Merge for u64 {
    fn merge(&mut self, other: Self) {
        *self += other;
    }
}

impl<T: Merge> Merge for Option<T> {
    fn merge(&mut self, other: Self) {
        if let Some(other) = other {
            match self {
                Some(this) => this.merge(other),
                None => *self = Some(other),
            }
        }
    }
}

/// Left fold over the partial results.
pub fn fold<T: Merge + Default>(parts: impl IntoIterator<Item = T>) -> T {
    parts.into_iter().fold(T::default(), |acc, x| acc.merged(x))
}

/// Balanced pairwise merge, performed sequentially: neighbours are merged level by level until a
/// single value is left.
pub fn pairwise<T: Merge + Default>(parts: impl IntoIterator<Item = T>) -> T {
    let mut level: Vec<T> = parts.into_iter().collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut iter = level.into_iter();
        while let Some(left) = iter.next() {
            match iter.next() {
                Some(right) => next.push(left.merged(right)),
                None => next.push(left),
            }
        }
        level = next;
    }
    level.pop().unwrap_or_default()
}

/// Parallel tree reduction on the current rayon pool.
pub fn tree<T: Merge + Default + Send>(parts: Vec<T>) -> T {
    parts.into_par_iter().reduce(T::default, |a, b| a.merged(b))
}
