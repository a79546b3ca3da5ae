pub mod boundary;
pub mod filter;
pub mod query;

pub use boundary::BoundaryResolver;
pub use filter::filter_records;
pub use query::{HouseQuery, RecordFetcher, RecordQuery};
