use std::fmt::{Debug, Display};
use std::hash::Hash;

/// T values are primitive integers usable as genomic coordinates
pub trait PrimInt: ::num::PrimInt + Debug + Display + Default + Hash + Send + Sync {}
impl<T: ::num::PrimInt + Debug + Display + Default + Hash + Send + Sync> PrimInt for T {}

