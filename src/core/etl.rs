use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting house lookup...");
        let started = Instant::now();

        // Extract
        tracing::info!("Extracting boundaries and records...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!(
            "Extracted {} raw records for {} areas",
            raw_data.records.len(),
            raw_data.boundaries.areas.len()
        );

        // Transform
        tracing::info!("Filtering records to community boundaries...");
        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!("Kept {} records", transformed.results.len());

        // Load
        tracing::info!("Writing outputs...");
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Output saved to: {} ({:?})", output_path, started.elapsed());

        Ok(output_path)
    }
}
