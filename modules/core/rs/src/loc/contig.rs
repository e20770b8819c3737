use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Name of an assembly contig (chromosome, scaffold, etc). Usually a string, but any cheap,
/// printable and hashable key will do.
pub trait Contig:
    Hash + Eq + Ord + Clone + Default + Debug + Display + Send + Sync
{
}

impl<T: Hash + Eq + Ord + Clone + Default + Debug + Display + Send + Sync> Contig for T {}
