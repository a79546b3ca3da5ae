use crate::domain::model::{BoundaryCollection, Record, ResultSet};
use crate::utils::error::Result;
use async_trait::async_trait;
use geojson::FeatureCollection;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Path a caller would use to find `path` after it is written.
    fn locate(&self, path: &str) -> String;
}

/// 城市社區邊界來源
#[async_trait]
pub trait GeometrySource: Send + Sync {
    async fn fetch_areas(&self) -> Result<FeatureCollection>;
}

/// 房產資料來源：輸入查詢字串，輸出資料列
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn query(&self, soql: &str) -> Result<Vec<Record>>;
}

/// Waits between image requests.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Output of the extract phase: the resolved areas and the raw rows inside their box.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub boundaries: BoundaryCollection,
    pub records: Vec<Record>,
}

/// Output of the transform phase.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub boundaries: BoundaryCollection,
    pub results: ResultSet,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Extracted>;
    async fn transform(&self, data: Extracted) -> Result<Transformed>;
    async fn load(&self, result: Transformed) -> Result<String>;
}
