//! SoQL construction for the assessor records endpoint and the fetcher that issues it.

use geo::MultiPolygon;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::domain::model::{BoundingBox, Projection, Record, YearRange};
use crate::domain::ports::RecordSource;
use crate::utils::error::{HousesError, Result};

/// 資料集的年份基準（age 欄位以此年計算）
pub const DEFAULT_REFERENCE_YEAR: i32 = 2022;

pub const PIN: &str = "pin";
pub const ADDR: &str = "addr";
pub const CENTROID_X: &str = "centroid_x";
pub const CENTROID_Y: &str = "centroid_y";
pub const AGE: &str = "age";
pub const YEAR_BUILT: &str = "year_built";

/// What the caller asks for, independent of where the areas are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HouseQuery {
    pub year_range: Option<YearRange>,
    pub limit: Option<usize>,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub bbox: BoundingBox,
    pub year_range: Option<YearRange>,
    pub limit: Option<usize>,
    pub projection: Projection,
    pub reference_year: i32,
}

impl RecordQuery {
    /// Box edges come from the ordered bounding box, so the predicate holds for
    /// either coordinate sign. Coordinates are compared as numbers; the columns
    /// are published as text, where `"-87.7" > "-87.6"`.
    fn box_predicates(&self, x: &str, y: &str) -> Vec<String> {
        vec![
            format!("{} > {}", x, self.bbox.min_x),
            format!("{} < {}", x, self.bbox.max_x),
            format!("{} > {}", y, self.bbox.min_y),
            format!("{} < {}", y, self.bbox.max_y),
        ]
    }

    pub fn to_soql(&self) -> String {
        let mut clauses = Vec::new();

        match self.projection {
            Projection::ByAddress => {
                clauses.push(format!(
                    "SELECT MIN({pin}) AS {pin}, {addr}, MIN({x}::number) AS {x}, \
                     MIN({y}::number) AS {y}, MIN({year} - {age}) AS {built}",
                    pin = PIN,
                    addr = ADDR,
                    x = CENTROID_X,
                    y = CENTROID_Y,
                    year = self.reference_year,
                    age = AGE,
                    built = YEAR_BUILT,
                ));
                clauses.push(format!("GROUP BY {}", ADDR));

                let mut having = self.box_predicates(CENTROID_X, CENTROID_Y);
                if let Some(range) = self.year_range {
                    having.push(format!(
                        "{} BETWEEN {} AND {}",
                        YEAR_BUILT,
                        range.min(),
                        range.max()
                    ));
                }
                clauses.push(format!("HAVING {}", having.join(" AND ")));
            }
            Projection::Raw => {
                clauses.push(format!(
                    "SELECT {}, {}, {}, {}, {}",
                    PIN, ADDR, CENTROID_X, CENTROID_Y, AGE
                ));

                let mut predicates = self.box_predicates(
                    &format!("{}::number", CENTROID_X),
                    &format!("{}::number", CENTROID_Y),
                );
                if let Some(range) = self.year_range {
                    // 年份換算成屋齡：較晚的建造年對應較小的屋齡
                    predicates.push(format!(
                        "{} BETWEEN {} AND {}",
                        AGE,
                        self.reference_year - range.max(),
                        self.reference_year - range.min()
                    ));
                }
                clauses.push(format!("WHERE {}", predicates.join(" AND ")));
            }
        }

        if let Some(limit) = self.limit {
            clauses.push(format!("LIMIT {}", limit));
        }

        clauses.join(" ")
    }
}

pub struct RecordFetcher<R: RecordSource> {
    source: R,
    reference_year: i32,
}

impl<R: RecordSource> RecordFetcher<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            reference_year: DEFAULT_REFERENCE_YEAR,
        }
    }

    pub fn with_reference_year(mut self, reference_year: i32) -> Self {
        self.reference_year = reference_year;
        self
    }

    pub fn build_query(&self, bbox: BoundingBox, request: &HouseQuery) -> RecordQuery {
        RecordQuery {
            bbox,
            year_range: request.year_range,
            limit: request.limit,
            projection: request.projection,
            reference_year: self.reference_year,
        }
    }

    /// Fetch every row inside the bounding box of `outer`.
    ///
    /// The box is a superset of the polygon; callers still need the spatial filter.
    pub async fn fetch(&self, outer: &MultiPolygon<f64>, request: &HouseQuery) -> Result<Vec<Record>> {
        let bbox = match BoundingBox::of(outer) {
            Some(bbox) => bbox,
            None => {
                warn!("Outer boundary is empty, skipping records request");
                return Err(HousesError::EmptyApiResponse);
            }
        };

        let soql = self.build_query(bbox, request).to_soql();
        debug!("Records query: {}", soql);

        let rows = self.source.query(&soql).await?;
        if rows.is_empty() {
            return Err(HousesError::EmptyApiResponse);
        }
        info!("Records API returned {} rows", rows.len());

        let rows = match request.projection {
            Projection::ByAddress => collapse_by_address(rows),
            Projection::Raw => derive_year_built(rows, self.reference_year),
        };
        Ok(rows)
    }
}

/// One row per address: minimum PIN, coordinates and build year.
///
/// Rows without an address group together, as SQL `GROUP BY` does with nulls.
pub fn collapse_by_address(rows: Vec<Record>) -> Vec<Record> {
    let mut order: Vec<Record> = Vec::new();
    let mut index: HashMap<Option<String>, usize> = HashMap::new();

    for row in rows {
        let key = row.get_str(ADDR).map(str::to_string);
        match index.get(&key) {
            Some(&i) => merge_min(&mut order[i], &row),
            None => {
                index.insert(key, order.len());
                order.push(row);
            }
        }
    }

    order
}

fn merge_min(target: &mut Record, other: &Record) {
    let smaller_pin = match (target.get_str(PIN), other.get_str(PIN)) {
        (Some(a), Some(b)) if b < a => Some(b.to_string()),
        _ => None,
    };
    if let Some(pin) = smaller_pin {
        target.data.insert(PIN.to_string(), serde_json::json!(pin));
    }

    for key in [CENTROID_X, CENTROID_Y, YEAR_BUILT] {
        let smaller = match (target.get_f64(key), other.get_f64(key)) {
            (Some(a), Some(b)) => b < a,
            (None, Some(_)) => true,
            _ => false,
        };
        if smaller {
            if let Some(value) = other.data.get(key) {
                target.data.insert(key.to_string(), value.clone());
            }
        }
    }
}

fn derive_year_built(rows: Vec<Record>, reference_year: i32) -> Vec<Record> {
    rows.into_iter()
        .map(|mut row| {
            if let Some(age) = row.get_i64(AGE) {
                row.data.insert(
                    YEAR_BUILT.to_string(),
                    serde_json::json!(reference_year as i64 - age),
                );
            }
            row
        })
        .collect()
}
