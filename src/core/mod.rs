pub mod etl;
pub mod output;
pub mod pipeline;

pub use crate::domain::model::{Record, ResultSet};
pub use crate::domain::ports::{Extracted, Pipeline, Storage, Transformed};
pub use crate::utils::error::Result;
