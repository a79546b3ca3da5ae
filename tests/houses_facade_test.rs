use async_trait::async_trait;
use chicago_houses::adapters::{build_client, HttpGeometrySource, SocrataRecordSource};
use chicago_houses::domain::ports::Throttle;
use chicago_houses::images::ImageEndpoint;
use chicago_houses::{
    BoundaryResolver, DelayPolicy, Houses, HousesError, ImageFetcher, LocalStorage, Projection,
    RecordFetcher, YearRange,
};
use geo::Contains;
use httpmock::prelude::*;
use std::time::Duration;
use tempfile::TempDir;

struct NoWait;

#[async_trait]
impl Throttle for NoWait {
    async fn pause(&self, _delay: Duration) {}
}

fn kenwood() -> serde_json::Value {
    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"community": "KENWOOD"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [-87.61, 41.80], [-87.58, 41.80], [-87.61, 41.83], [-87.61, 41.80]
                ]]
            }
        }]
    })
}

fn houses(server: &MockServer) -> Houses<HttpGeometrySource, SocrataRecordSource> {
    let client = build_client(Duration::from_secs(5)).unwrap();
    Houses::new(
        vec!["kenwood".to_string()],
        Some(YearRange::new(1880, 1930).unwrap()),
        BoundaryResolver::new(HttpGeometrySource::new(client.clone(), server.url("/areas"))),
        RecordFetcher::new(SocrataRecordSource::new(client, server.url("/rows.json"))),
    )
}

/// 三角形區域：外框右上角的點必須被排除
#[tokio::test]
async fn test_triangle_area_excludes_box_corner() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/areas");
        then.status(200).json_body(kenwood());
    });
    let rows_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/rows.json")
            .query_param_exists("$query");
        then.status(200).json_body(serde_json::json!([
            {"pin": "20111000000001", "addr": "4800 S ELLIS AVE", "centroid_x": "-87.605", "centroid_y": "41.805", "year_built": "1892"},
            {"pin": "20111000000002", "addr": "4900 S WOODLAWN AVE", "centroid_x": "-87.585", "centroid_y": "41.825", "year_built": "1901"},
            {"pin": "20111000000003", "addr": "4700 S GREENWOOD AVE", "centroid_x": "-87.60", "centroid_y": "41.81", "year_built": "1925"}
        ]));
    });

    let mut houses = houses(&server);
    let pins = houses
        .get_houses(Some(1000), Projection::ByAddress)
        .await
        .unwrap()
        .pins();
    rows_mock.assert();

    assert_eq!(pins, vec!["20111000000001", "20111000000003"]);

    let boundaries = houses.boundaries().unwrap();
    let bbox = boundaries.bbox().unwrap();
    for record in &houses.house_list().unwrap().records {
        assert!(bbox.contains(&record.location));
        assert!(boundaries.outer.contains(&record.location));
    }
}

#[tokio::test]
async fn test_get_images_appends_paths() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/areas");
        then.status(200).json_body(kenwood());
    });
    server.mock(|when, then| {
        when.method(GET).path("/rows.json");
        then.status(200).json_body(serde_json::json!([
            {"pin": "20111000000001", "addr": "4800 S ELLIS AVE", "centroid_x": "-87.605", "centroid_y": "41.805", "year_built": "1892"},
            {"pin": "20111000000003", "addr": "4700 S GREENWOOD AVE", "centroid_x": "-87.60", "centroid_y": "41.81", "year_built": "1925"}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/img/201-11/000/20111000000001_AA.JPG");
        then.status(200).body(b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00".to_vec());
    });
    server.mock(|when, then| {
        when.method(GET).path("/img/201-11/000/20111000000003_AA.JPG");
        then.status(403);
    });

    let fetcher = ImageFetcher::new(
        build_client(Duration::from_secs(5)).unwrap(),
        LocalStorage::new(temp_dir.path().to_str().unwrap()),
        NoWait,
    )
    .with_policy(DelayPolicy::none())
    .with_endpoint(ImageEndpoint {
        base_url: server.url("/img"),
        ..ImageEndpoint::default()
    });

    let mut houses = houses(&server);
    houses.get_houses(None, Projection::ByAddress).await.unwrap();
    let results = houses.get_images(&fetcher).await.unwrap();

    assert!(results.records[0]
        .img_path
        .as_deref()
        .unwrap()
        .ends_with("20111000000001.jpg"));
    assert_eq!(results.records[1].img_path, None);
}

#[tokio::test]
async fn test_get_images_before_get_houses_is_error() {
    let server = MockServer::start();
    let temp_dir = TempDir::new().unwrap();
    let fetcher = ImageFetcher::new(
        build_client(Duration::from_secs(5)).unwrap(),
        LocalStorage::new(temp_dir.path().to_str().unwrap()),
        NoWait,
    );

    let mut houses = houses(&server);
    let err = houses.get_images(&fetcher).await.unwrap_err();
    assert!(matches!(err, HousesError::ProcessingError { .. }));
}
