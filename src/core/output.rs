use crate::domain::model::{BoundaryCollection, ResultSet};
use crate::utils::error::Result;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    pin: &'a str,
    addr: Option<&'a str>,
    year_built: Option<i32>,
    longitude: f64,
    latitude: f64,
    img_path: Option<&'a str>,
}

pub fn results_csv(results: &ResultSet) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in &results.records {
        writer.serialize(CsvRow {
            pin: &record.pin,
            addr: record.addr.as_deref(),
            year_built: record.year_built,
            longitude: record.longitude(),
            latitude: record.latitude(),
            img_path: record.img_path.as_deref(),
        })?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error().into())
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn results_geojson(results: &ResultSet) -> Result<Vec<u8>> {
    let features = results
        .records
        .iter()
        .map(|record| {
            let mut properties = JsonObject::new();
            properties.insert("pin".to_string(), json!(record.pin));
            properties.insert("addr".to_string(), json!(record.addr));
            properties.insert("year_built".to_string(), json!(record.year_built));
            properties.insert("img_path".to_string(), json!(record.img_path));
            for (key, value) in &record.attributes {
                properties.entry(key.clone()).or_insert_with(|| value.clone());
            }
            feature(Value::from(&record.location), properties)
        })
        .collect();

    // 舊式 named CRS 放在 foreign members
    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "crs".to_string(),
        json!({"type": "name", "properties": {"name": results.crs}}),
    );

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    };
    Ok(serde_json::to_vec_pretty(&collection)?)
}

pub fn areas_geojson(boundaries: &BoundaryCollection) -> Result<Vec<u8>> {
    let features = boundaries
        .areas
        .iter()
        .map(|area| {
            let mut properties = JsonObject::new();
            properties.insert("community".to_string(), json!(area.name));
            feature(Value::from(&area.geometry), properties)
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    Ok(serde_json::to_vec_pretty(&collection)?)
}

pub fn bundle_zip(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }
    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AreaBoundary, PropertyRecord};
    use geo::{polygon, Point};
    use std::collections::BTreeMap;

    fn results() -> ResultSet {
        let mut attributes = BTreeMap::new();
        attributes.insert("class".to_string(), serde_json::json!("202"));
        ResultSet::new(vec![PropertyRecord {
            pin: "20114000000001".to_string(),
            addr: Some("5400 S KIMBARK AVE".to_string()),
            location: Point::new(-87.59, 41.79),
            year_built: Some(1905),
            attributes,
            img_path: Some("out/img/20114000000001.jpg".to_string()),
        }])
    }

    #[test]
    fn test_results_csv() {
        let csv = String::from_utf8(results_csv(&results()).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("pin,addr,year_built,longitude,latitude,img_path")
        );
        assert_eq!(
            lines.next(),
            Some("20114000000001,5400 S KIMBARK AVE,1905,-87.59,41.79,out/img/20114000000001.jpg")
        );
    }

    #[test]
    fn test_results_geojson() {
        let bytes = results_geojson(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["crs"]["properties"]["name"], "EPSG:4326");
        let feature = &value["features"][0];
        assert_eq!(feature["geometry"]["coordinates"][0], -87.59);
        assert_eq!(feature["properties"]["pin"], "20114000000001");
        assert_eq!(feature["properties"]["class"], "202");
    }

    #[test]
    fn test_areas_geojson_reads_back() {
        let geometry = geo::MultiPolygon::new(vec![polygon![
            (x: -87.61, y: 41.81),
            (x: -87.59, y: 41.81),
            (x: -87.59, y: 41.83),
            (x: -87.61, y: 41.83),
        ]]);
        let boundaries = BoundaryCollection {
            areas: vec![AreaBoundary {
                name: "KENWOOD".to_string(),
                geometry: geometry.clone(),
            }],
            outer: geometry,
        };

        let bytes = areas_geojson(&boundaries).unwrap();
        let collection: FeatureCollection = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(
            feature.property("community").and_then(|v| v.as_str()),
            Some("KENWOOD")
        );
        let geometry = feature.geometry.as_ref().unwrap();
        assert!(matches!(geometry.value, Value::MultiPolygon(ref polygons) if polygons.len() == 1));
    }

    #[test]
    fn test_bundle_zip() {
        let files = vec![
            ("results.csv".to_string(), b"pin\n".to_vec()),
            ("manifest.json".to_string(), b"{}".to_vec()),
        ];
        let bytes = bundle_zip(&files).unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
    }
}
