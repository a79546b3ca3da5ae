use async_trait::async_trait;
use geojson::FeatureCollection;
use reqwest::Client;
use std::time::Duration;

use crate::domain::model::Record;
use crate::domain::ports::{GeometrySource, RecordSource};
use crate::utils::error::{HousesError, Result};

pub const CITY_BOUNDARIES_ENDPOINT: &str =
    "https://data.cityofchicago.org/api/geospatial/cauq-8yn6?method=export&format=GeoJSON";
pub const ASSESSOR_RECORDS_ENDPOINT: &str =
    "https://datacatalog.cookcountyil.gov/resource/bcnq-qi2z.json";

const USER_AGENT: &str = concat!("chicago-houses/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// City open-data boundary export.
pub struct HttpGeometrySource {
    client: Client,
    endpoint: String,
}

impl HttpGeometrySource {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl GeometrySource for HttpGeometrySource {
    async fn fetch_areas(&self) -> Result<FeatureCollection> {
        tracing::debug!("Making boundary request to: {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!("Boundary response status: {}", response.status());
        Ok(response.json::<FeatureCollection>().await?)
    }
}

/// Socrata resource queried with a `$query` parameter.
pub struct SocrataRecordSource {
    client: Client,
    endpoint: String,
    app_token: Option<String>,
}

impl SocrataRecordSource {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            app_token: None,
        }
    }

    pub fn with_app_token(mut self, app_token: Option<String>) -> Self {
        self.app_token = app_token.filter(|t| !t.is_empty());
        self
    }
}

#[async_trait]
impl RecordSource for SocrataRecordSource {
    async fn query(&self, soql: &str) -> Result<Vec<Record>> {
        tracing::debug!("Making records request to: {}", self.endpoint);
        let mut request = self.client.get(&self.endpoint).query(&[("$query", soql)]);
        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token);
        }

        let response = request.send().await?.error_for_status()?;
        tracing::debug!("Records response status: {}", response.status());

        let json_data: serde_json::Value = response.json().await?;
        match json_data {
            serde_json::Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::Object(obj) => Some(Record::from(obj)),
                    _ => None,
                })
                .collect()),
            other => Err(HousesError::ProcessingError {
                message: format!("expected a JSON array of rows, got: {}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_socrata_source_sends_query_and_token() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/resource/rows.json")
                .query_param("$query", "SELECT pin LIMIT 1")
                .header("X-App-Token", "secret");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([{"pin": "20114000000001"}, "junk"]));
        });

        let client = build_client(Duration::from_secs(5)).unwrap();
        let source = SocrataRecordSource::new(client, server.url("/resource/rows.json"))
            .with_app_token(Some("secret".to_string()));
        let rows = source.query("SELECT pin LIMIT 1").await.unwrap();

        api_mock.assert();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("pin"), Some("20114000000001"));
    }

    #[tokio::test]
    async fn test_socrata_source_propagates_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/resource/rows.json");
            then.status(500);
        });

        let client = build_client(Duration::from_secs(5)).unwrap();
        let source = SocrataRecordSource::new(client, server.url("/resource/rows.json"));
        let err = source.query("SELECT pin").await.unwrap_err();

        assert!(matches!(err, HousesError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_geometry_source_parses_collection() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/boundaries");
            then.status(200).json_body(serde_json::json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": {"community": "KENWOOD"},
                    "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
                }]
            }));
        });

        let client = build_client(Duration::from_secs(5)).unwrap();
        let source = HttpGeometrySource::new(client, server.url("/boundaries"));
        let collection = source.fetch_areas().await.unwrap();

        api_mock.assert();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(
            collection.features[0]
                .property("community")
                .and_then(|v| v.as_str()),
            Some("KENWOOD")
        );
    }
}
