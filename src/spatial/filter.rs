use geo::{Contains, MultiPolygon, Point};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::domain::model::{PropertyRecord, Record, ResultSet};
use crate::spatial::query::{ADDR, CENTROID_X, CENTROID_Y, PIN, YEAR_BUILT};
use crate::utils::error::{HousesError, Result};

/// Keep the rows whose centroid lies strictly inside `outer`.
///
/// The coordinate columns are consumed into the point geometry and do not
/// appear in the record attributes.
pub fn filter_records(records: Vec<Record>, outer: &MultiPolygon<f64>) -> Result<ResultSet> {
    let total = records.len();
    let mut unlocated = 0usize;

    let kept: Vec<PropertyRecord> = records
        .into_iter()
        .filter_map(|record| {
            let property = to_property(record);
            if property.is_none() {
                unlocated += 1;
            }
            property
        })
        .filter(|property| outer.contains(&property.location))
        .collect();

    if unlocated > 0 {
        debug!("{} rows had no usable pin or coordinates", unlocated);
    }
    info!(
        "Spatial filter kept {} of {} rows inside the community boundaries",
        kept.len(),
        total
    );

    if kept.is_empty() {
        return Err(HousesError::EmptyFilteredResult);
    }
    Ok(ResultSet::new(kept))
}

fn to_property(mut record: Record) -> Option<PropertyRecord> {
    let x = record.get_f64(CENTROID_X)?;
    let y = record.get_f64(CENTROID_Y)?;
    let year_built = record.get_i64(YEAR_BUILT).map(|y| y as i32);

    let pin = match record.data.remove(PIN)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let addr = record
        .data
        .remove(ADDR)
        .and_then(|v| v.as_str().map(str::to_string));

    for column in [CENTROID_X, CENTROID_Y, YEAR_BUILT] {
        record.data.remove(column);
    }

    Some(PropertyRecord {
        pin,
        addr,
        location: Point::new(x, y),
        year_built,
        attributes: record.data.into_iter().collect::<BTreeMap<_, _>>(),
        img_path: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BoundingBox, WGS84};
    use geo::polygon;

    /// L 形區域：外框包含 (-87.61, 41.89)，多邊形本身不包含
    fn l_shape() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: -87.70, y: 41.80),
            (x: -87.60, y: 41.80),
            (x: -87.60, y: 41.85),
            (x: -87.65, y: 41.85),
            (x: -87.65, y: 41.90),
            (x: -87.70, y: 41.90),
        ]])
    }

    fn row(pin: &str, x: &str, y: &str) -> Record {
        let mut record = Record::default();
        record.data.insert("pin".to_string(), serde_json::json!(pin));
        record.data.insert("addr".to_string(), serde_json::json!(format!("{} ADDR", pin)));
        record.data.insert("centroid_x".to_string(), serde_json::json!(x));
        record.data.insert("centroid_y".to_string(), serde_json::json!(y));
        record.data.insert("year_built".to_string(), serde_json::json!("1911"));
        record.data.insert("class".to_string(), serde_json::json!("202"));
        record
    }

    #[test]
    fn test_filter_drops_points_inside_box_but_outside_polygon() {
        let outer = l_shape();
        let records = vec![
            row("20000000000001", "-87.68", "41.82"),
            row("20000000000002", "-87.61", "41.89"),
            row("20000000000003", "-87.50", "41.82"),
        ];
        let bbox = BoundingBox::of(&outer).unwrap();
        assert!(bbox.contains(&Point::new(-87.61, 41.89)));

        let results = filter_records(records, &outer).unwrap();

        assert_eq!(results.crs, WGS84);
        assert_eq!(results.pins(), vec!["20000000000001".to_string()]);
        for record in &results.records {
            assert!(outer.contains(&record.location));
            assert!(bbox.contains(&record.location));
        }
    }

    #[test]
    fn test_filter_drops_coordinate_columns() {
        let results = filter_records(vec![row("20000000000001", "-87.68", "41.82")], &l_shape()).unwrap();
        let record = &results.records[0];

        assert_eq!(record.addr.as_deref(), Some("20000000000001 ADDR"));
        assert_eq!(record.year_built, Some(1911));
        assert_eq!(record.longitude(), -87.68);
        assert_eq!(record.latitude(), 41.82);
        assert!(!record.attributes.contains_key("centroid_x"));
        assert!(!record.attributes.contains_key("centroid_y"));
        assert!(!record.attributes.contains_key("pin"));
        assert_eq!(record.attributes.get("class"), Some(&serde_json::json!("202")));
    }

    #[test]
    fn test_filter_all_outside_is_error() {
        let records = vec![
            row("20000000000002", "-87.61", "41.89"),
            row("20000000000003", "-87.50", "41.82"),
        ];
        let err = filter_records(records, &l_shape()).unwrap_err();
        assert!(matches!(err, HousesError::EmptyFilteredResult));
    }

    #[test]
    fn test_filter_skips_unparseable_coordinates() {
        let records = vec![
            row("20000000000001", "-87.68", "41.82"),
            row("20000000000004", "", "41.82"),
        ];
        let results = filter_records(records, &l_shape()).unwrap();
        assert_eq!(results.len(), 1);
    }
}
