//! Community area lookup against the city boundary export.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use geojson::{FeatureCollection, PolygonType, Position, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::domain::model::{AreaBoundary, BoundaryCollection};
use crate::domain::ports::GeometrySource;
use crate::utils::error::Result;

pub const DEFAULT_AREA_NAME_FIELD: &str = "community";

pub struct BoundaryResolver<G: GeometrySource> {
    source: G,
    name_field: String,
}

impl<G: GeometrySource> BoundaryResolver<G> {
    pub fn new(source: G) -> Self {
        Self {
            source,
            name_field: DEFAULT_AREA_NAME_FIELD.to_string(),
        }
    }

    pub fn with_name_field(mut self, name_field: impl Into<String>) -> Self {
        self.name_field = name_field.into();
        self
    }

    /// Fetch the city-wide collection and keep the requested areas.
    ///
    /// Names match case-insensitively. No match is not an error here; the
    /// returned collection is empty and its outer boundary has no extent.
    pub async fn resolve(&self, names: &[String]) -> Result<BoundaryCollection> {
        info!("Fetching community area boundaries...");
        let collection = self.source.fetch_areas().await?;
        debug!("Boundary source returned {} features", collection.features.len());

        let boundaries = select_areas(&collection, names, &self.name_field);
        if boundaries.is_empty() {
            warn!("None of the requested areas matched: {:?}", names);
        } else {
            info!("Matched {} community areas: {:?}", boundaries.areas.len(), boundaries.names());
        }
        Ok(boundaries)
    }
}

/// Select features named in `names` and union their polygons.
pub fn select_areas(
    collection: &FeatureCollection,
    names: &[String],
    name_field: &str,
) -> BoundaryCollection {
    let wanted: HashSet<String> = names.iter().map(|n| n.trim().to_uppercase()).collect();

    let mut areas = Vec::new();
    for feature in &collection.features {
        let name = match feature.property(name_field).and_then(|v| v.as_str()) {
            Some(name) => name.trim().to_uppercase(),
            None => continue,
        };
        if !wanted.contains(&name) {
            continue;
        }

        match feature
            .geometry
            .as_ref()
            .and_then(|g| area_geometry(&name, &g.value))
        {
            Some(geometry) => areas.push(AreaBoundary { name, geometry }),
            None => warn!("Area {} has no polygon geometry, skipping", name),
        }
    }

    let outer = union_all(&areas);
    BoundaryCollection { areas, outer }
}

/// 收集所有多邊形（含 GeometryCollection 內層），壞掉的多邊形單獨略過
fn area_geometry(name: &str, value: &Value) -> Option<MultiPolygon<f64>> {
    let mut polygons = Vec::new();
    for rings in only_polys(value) {
        match polygon(rings) {
            Some(p) => polygons.push(p),
            None => warn!("Area {} has a malformed polygon, dropping that part", name),
        }
    }
    (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
}

fn only_polys(value: &Value) -> Vec<&PolygonType> {
    match value {
        Value::Polygon(p) => vec![p],
        Value::MultiPolygon(mp) => mp.iter().collect(),
        Value::GeometryCollection(gc) => gc.iter().flat_map(|g| only_polys(&g.value)).collect(),
        _ => Vec::new(),
    }
}

fn polygon(rings: &PolygonType) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    let interiors = interiors
        .iter()
        .map(|ring| line_string(ring))
        .collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(line_string(exterior)?, interiors))
}

// 環至少 4 點且首尾相同
fn line_string(ring: &[Position]) -> Option<LineString<f64>> {
    if ring.len() < 4 {
        return None;
    }
    let coords = ring
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    let line = LineString::new(coords);
    line.is_closed().then_some(line)
}

fn union_all(areas: &[AreaBoundary]) -> MultiPolygon<f64> {
    match areas.split_first() {
        Some((first, rest)) => rest
            .iter()
            .fold(first.geometry.clone(), |acc, area| acc.union(&area.geometry)),
        None => MultiPolygon::new(vec![]),
    }
}
