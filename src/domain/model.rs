use crate::utils::error::{HousesError, Result};
use geo::{BoundingRect, Contains, MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 所有結果點的座標參考系統
pub const WGS84: &str = "EPSG:4326";

/// 一筆未處理的 API 資料列
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Socrata returns numeric columns as strings, so accept both.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        let value = match self.data.get(key)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_f64(key).map(|v| v.round() as i64)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(obj: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }
}

/// Inclusive range of build years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[i32; 2]", into = "[i32; 2]")]
pub struct YearRange {
    min: i32,
    max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Result<Self> {
        if min > max {
            return Err(HousesError::InvalidConfigValueError {
                field: "year_range".to_string(),
                value: format!("{}-{}", min, max),
                reason: "start year must not be after end year".to_string(),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }
}

impl TryFrom<[i32; 2]> for YearRange {
    type Error = HousesError;

    fn try_from(value: [i32; 2]) -> Result<Self> {
        Self::new(value[0], value[1])
    }
}

impl From<YearRange> for [i32; 2] {
    fn from(range: YearRange) -> Self {
        [range.min, range.max]
    }
}

/// Row shape requested from the records API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// One row per address, duplicate characteristic rows collapsed.
    #[default]
    ByAddress,
    /// Every assessor row as published.
    Raw,
}

/// Axis-aligned rectangle, always ordered so `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn of(geometry: &MultiPolygon<f64>) -> Option<Self> {
        geometry.bounding_rect().map(|rect| Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }

    pub fn contains(&self, point: &Point<f64>) -> bool {
        point.x() >= self.min_x
            && point.x() <= self.max_x
            && point.y() >= self.min_y
            && point.y() <= self.max_y
    }
}

/// A single community area polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaBoundary {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Matched areas plus the union of all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCollection {
    pub areas: Vec<AreaBoundary>,
    pub outer: MultiPolygon<f64>,
}

impl BoundaryCollection {
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::of(&self.outer)
    }

    pub fn contains(&self, point: &Point<f64>) -> bool {
        self.outer.contains(point)
    }

    pub fn names(&self) -> Vec<&str> {
        self.areas.iter().map(|a| a.name.as_str()).collect()
    }
}

/// 通過空間篩選後的房產資料
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub pin: String,
    pub addr: Option<String>,
    #[serde(skip)]
    pub location: Point<f64>,
    pub year_built: Option<i32>,
    pub attributes: BTreeMap<String, serde_json::Value>,
    pub img_path: Option<String>,
}

impl PropertyRecord {
    pub fn longitude(&self) -> f64 {
        self.location.x()
    }

    pub fn latitude(&self) -> f64 {
        self.location.y()
    }
}

/// Records contained by the outer boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub crs: &'static str,
    pub records: Vec<PropertyRecord>,
}

impl ResultSet {
    pub fn new(records: Vec<PropertyRecord>) -> Self {
        Self {
            crs: WGS84,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pins(&self) -> Vec<String> {
        self.records.iter().map(|r| r.pin.clone()).collect()
    }

    /// Adds the image path column, one entry per record in order.
    pub fn attach_image_paths(&mut self, paths: Vec<Option<String>>) -> Result<()> {
        if paths.len() != self.records.len() {
            return Err(HousesError::ProcessingError {
                message: format!(
                    "expected {} image paths, got {}",
                    self.records.len(),
                    paths.len()
                ),
            });
        }
        for (record, path) in self.records.iter_mut().zip(paths) {
            record.img_path = path;
        }
        Ok(())
    }
}
