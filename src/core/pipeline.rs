use crate::adapters::{build_client, HttpGeometrySource, LocalStorage, SocrataRecordSource};
use crate::config::HousesConfig;
use crate::core::output;
use crate::domain::ports::{
    Extracted, GeometrySource, Pipeline, RecordSource, Storage, Throttle, Transformed,
};
use crate::houses::{self, Houses};
use crate::images::{ImageFetcher, TokioThrottle};
use crate::render;
use crate::spatial::{BoundaryResolver, RecordFetcher};
use crate::utils::error::Result;
use std::path::Path;

pub const ARCHIVE_FILE: &str = "houses_output.zip";

pub struct HousesPipeline<G: GeometrySource, R: RecordSource, S: Storage, T: Throttle> {
    houses: Houses<G, R>,
    storage: S,
    images: Option<ImageFetcher<S, T>>,
    config: HousesConfig,
}

impl HousesPipeline<HttpGeometrySource, SocrataRecordSource, LocalStorage, TokioThrottle> {
    /// Wire the HTTP sources and local storage described by `config`.
    pub fn from_config(config: HousesConfig) -> Result<Self> {
        let client = build_client(config.source_timeout())?;

        let resolver = BoundaryResolver::new(HttpGeometrySource::new(
            client.clone(),
            config.source.boundaries_endpoint.clone(),
        ))
        .with_name_field(config.source.area_name_field.clone());
        let fetcher = RecordFetcher::new(
            SocrataRecordSource::new(client, config.source.records_endpoint.clone())
                .with_app_token(config.source.app_token.clone()),
        )
        .with_reference_year(config.query.reference_year);

        let houses = Houses::new(
            config.query.areas.clone(),
            config.query.year_range,
            resolver,
            fetcher,
        );

        let images = if config.images.enabled {
            let image_dir = Path::new(&config.output.output_path).join(&config.images.output_dir);
            let fetcher = ImageFetcher::new(
                build_client(config.image_timeout())?,
                LocalStorage::new(image_dir.display().to_string()),
                TokioThrottle,
            )
            .with_policy(config.delay_policy())
            .with_endpoint(config.image_endpoint());
            Some(fetcher)
        } else {
            None
        };

        let storage = LocalStorage::new(config.output.output_path.clone());
        Ok(Self::new(houses, storage, images, config))
    }
}

impl<G: GeometrySource, R: RecordSource, S: Storage, T: Throttle> HousesPipeline<G, R, S, T> {
    pub fn new(
        houses: Houses<G, R>,
        storage: S,
        images: Option<ImageFetcher<S, T>>,
        config: HousesConfig,
    ) -> Self {
        Self {
            houses,
            storage,
            images,
            config,
        }
    }

    fn manifest(&self, result: &Transformed, files: &[String]) -> Result<Vec<u8>> {
        let with_images = result
            .results
            .records
            .iter()
            .filter(|r| r.img_path.is_some())
            .count();
        let manifest = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "areas": result.boundaries.names(),
            "year_range": self.config.query.year_range,
            "projection": self.config.query.projection,
            "results_limit": self.config.query.results_limit,
            "result_count": result.results.len(),
            "images_saved": with_images,
            "files": files,
        });
        Ok(serde_json::to_vec_pretty(&manifest)?)
    }
}

#[async_trait::async_trait]
impl<G, R, S, T> Pipeline for HousesPipeline<G, R, S, T>
where
    G: GeometrySource,
    R: RecordSource,
    S: Storage,
    T: Throttle,
{
    async fn extract(&self) -> Result<Extracted> {
        let request = self.config.house_query();
        tracing::debug!("House query: {:?}", request);
        self.houses.extract(&request).await
    }

    async fn transform(&self, data: Extracted) -> Result<Transformed> {
        let mut transformed = self.houses.filter(data)?;

        if let Some(fetcher) = &self.images {
            houses::attach_images(fetcher, &mut transformed.results).await?;
        }

        Ok(transformed)
    }

    async fn load(&self, result: Transformed) -> Result<String> {
        let mut files: Vec<(String, Vec<u8>)> = Vec::new();

        if self.config.wants_format("csv") {
            files.push(("results.csv".to_string(), output::results_csv(&result.results)?));
        }
        if self.config.wants_format("geojson") {
            files.push((
                "results.geojson".to_string(),
                output::results_geojson(&result.results)?,
            ));
            files.push((
                "areas.geojson".to_string(),
                output::areas_geojson(&result.boundaries)?,
            ));
        }
        if self.config.output.map {
            let img = render::render_map(
                &result.boundaries,
                &result.results,
                self.config.output.map_size,
            )?;
            files.push(("map.png".to_string(), render::encode_png(&img)?));
        }

        if self.config.output.archive {
            let names: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();
            files.push(("manifest.json".to_string(), self.manifest(&result, &names)?));

            tracing::debug!("Creating ZIP file with {} files", files.len());
            let zip_data = output::bundle_zip(&files)?;
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(ARCHIVE_FILE, &zip_data).await?;
            return Ok(self.storage.locate(ARCHIVE_FILE));
        }

        for (name, data) in &files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(name, data).await?;
        }
        Ok(self.storage.locate(""))
    }
}
