//! Value types spoken by the backing-store fetch contract.

mod series;
mod source;

pub use series::{Series, SeriesPoint};
pub use source::{Archive, DataSource};
