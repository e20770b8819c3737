pub use contig::Contig;
pub use interval::Interval;
pub use region::Region;

mod contig;
mod interval;
mod region;
