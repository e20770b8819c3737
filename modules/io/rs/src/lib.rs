pub mod header;
pub mod tags;
mod traits;

pub use traits::{VecWriter, WriteRecord};
