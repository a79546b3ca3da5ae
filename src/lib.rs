pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod houses;
pub mod images;
pub mod render;
pub mod spatial;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::HousesConfig;

pub use adapters::LocalStorage;
pub use self::core::{etl::EtlEngine, pipeline::HousesPipeline};
pub use domain::model::{BoundaryCollection, Projection, PropertyRecord, ResultSet, YearRange};
pub use houses::Houses;
pub use images::{DelayPolicy, ImageFetcher, TokioThrottle};
pub use spatial::{BoundaryResolver, HouseQuery, RecordFetcher};
pub use utils::error::{HousesError, Result};
