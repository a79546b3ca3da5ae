//! Entry point for library users: a set of community areas and a year range.

use crate::domain::model::{BoundaryCollection, Projection, ResultSet, YearRange};
use crate::domain::ports::{Extracted, GeometrySource, RecordSource, Storage, Throttle, Transformed};
use crate::images::ImageFetcher;
use crate::spatial::{filter_records, BoundaryResolver, HouseQuery, RecordFetcher};
use crate::utils::error::{HousesError, Result};

/// Houses built in a period inside a set of community areas.
///
/// ```no_run
/// # async fn run() -> chicago_houses::Result<()> {
/// use chicago_houses::adapters::{build_client, HttpGeometrySource, SocrataRecordSource};
/// use chicago_houses::adapters::http::{ASSESSOR_RECORDS_ENDPOINT, CITY_BOUNDARIES_ENDPOINT};
/// use chicago_houses::{BoundaryResolver, Houses, Projection, RecordFetcher, YearRange};
///
/// let client = build_client(std::time::Duration::from_secs(120))?;
/// let mut houses = Houses::new(
///     vec!["Hyde Park".to_string()],
///     Some(YearRange::new(1890, 1920)?),
///     BoundaryResolver::new(HttpGeometrySource::new(client.clone(), CITY_BOUNDARIES_ENDPOINT)),
///     RecordFetcher::new(SocrataRecordSource::new(client, ASSESSOR_RECORDS_ENDPOINT)),
/// );
/// let results = houses.get_houses(Some(1000), Projection::ByAddress).await?;
/// println!("{} houses", results.len());
/// # Ok(())
/// # }
/// ```
pub struct Houses<G: GeometrySource, R: RecordSource> {
    community_areas: Vec<String>,
    year_range: Option<YearRange>,
    resolver: BoundaryResolver<G>,
    fetcher: RecordFetcher<R>,
    boundaries: Option<BoundaryCollection>,
    house_list: Option<ResultSet>,
}

impl<G: GeometrySource, R: RecordSource> Houses<G, R> {
    pub fn new(
        community_areas: Vec<String>,
        year_range: Option<YearRange>,
        resolver: BoundaryResolver<G>,
        fetcher: RecordFetcher<R>,
    ) -> Self {
        Self {
            community_areas,
            year_range,
            resolver,
            fetcher,
            boundaries: None,
            house_list: None,
        }
    }

    pub fn community_areas(&self) -> &[String] {
        &self.community_areas
    }

    pub fn year_range(&self) -> Option<YearRange> {
        self.year_range
    }

    pub fn boundaries(&self) -> Option<&BoundaryCollection> {
        self.boundaries.as_ref()
    }

    pub fn house_list(&self) -> Option<&ResultSet> {
        self.house_list.as_ref()
    }

    pub fn query(&self, limit: Option<usize>, projection: Projection) -> HouseQuery {
        HouseQuery {
            year_range: self.year_range,
            limit,
            projection,
        }
    }

    /// Resolve the areas and fetch every row inside their bounding box.
    pub async fn extract(&self, request: &HouseQuery) -> Result<Extracted> {
        let boundaries = self.resolver.resolve(&self.community_areas).await?;
        let records = self.fetcher.fetch(&boundaries.outer, request).await?;
        Ok(Extracted {
            boundaries,
            records,
        })
    }

    /// Keep the rows inside the areas themselves.
    pub fn filter(&self, data: Extracted) -> Result<Transformed> {
        let results = filter_records(data.records, &data.boundaries.outer)?;
        Ok(Transformed {
            boundaries: data.boundaries,
            results,
        })
    }

    /// Run the whole lookup and keep the result for [`Houses::get_images`].
    pub async fn get_houses(&mut self, limit: Option<usize>, projection: Projection) -> Result<&ResultSet> {
        let request = self.query(limit, projection);
        let extracted = self.extract(&request).await?;
        let transformed = self.filter(extracted)?;

        self.boundaries = Some(transformed.boundaries);
        Ok(self.house_list.insert(transformed.results))
    }

    /// Download photos for the current result set and add their paths.
    pub async fn get_images<S: Storage, T: Throttle>(
        &mut self,
        fetcher: &ImageFetcher<S, T>,
    ) -> Result<&ResultSet> {
        let house_list = self.house_list.as_mut().ok_or_else(|| HousesError::ProcessingError {
            message: "get_houses must run before get_images".to_string(),
        })?;

        attach_images(fetcher, house_list).await?;
        Ok(house_list)
    }
}

/// Fetch a photo for every record and store the saved paths on the records.
pub async fn attach_images<S: Storage, T: Throttle>(
    fetcher: &ImageFetcher<S, T>,
    results: &mut ResultSet,
) -> Result<()> {
    let paths = fetcher.fetch_all(&results.pins()).await;
    results.attach_image_paths(paths)
}
