use geo::{MultiPolygon, Point};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::domain::model::{BoundaryCollection, BoundingBox, ResultSet};
use crate::utils::error::{HousesError, Result};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const AREA_FILL: Rgba<u8> = Rgba([220, 20, 20, 128]);
const POINT_FILL: Rgba<u8> = Rgba([20, 40, 220, 191]);

/// Maps lon/lat onto pixels with a cos(latitude) correction so areas keep their shape.
struct Projector {
    bbox: BoundingBox,
    x_scale: f64,
    y_scale: f64,
    width: u32,
    height: u32,
}

impl Projector {
    fn new(bbox: BoundingBox, size: u32) -> Self {
        let mid_lat = ((bbox.min_y + bbox.max_y) / 2.0).to_radians();
        let span_x = (bbox.max_x - bbox.min_x) * mid_lat.cos().abs().max(1e-6);
        let span_y = bbox.max_y - bbox.min_y;
        let longest = span_x.max(span_y).max(f64::EPSILON);

        let width = ((span_x / longest) * size as f64).ceil().max(1.0) as u32;
        let height = ((span_y / longest) * size as f64).ceil().max(1.0) as u32;

        Self {
            bbox,
            x_scale: width as f64 / (bbox.max_x - bbox.min_x).max(f64::EPSILON),
            y_scale: height as f64 / span_y.max(f64::EPSILON),
            width,
            height,
        }
    }

    fn to_geo(&self, px: u32, py: u32) -> Point<f64> {
        Point::new(
            self.bbox.min_x + (px as f64 + 0.5) / self.x_scale,
            self.bbox.max_y - (py as f64 + 0.5) / self.y_scale,
        )
    }

    /// Pixel columns whose centres lie strictly between two longitudes.
    fn columns_between(&self, west: f64, east: f64) -> Option<(u32, u32)> {
        let first = (((west - self.bbox.min_x) * self.x_scale - 0.5).floor() + 1.0).max(0.0);
        let last = (((east - self.bbox.min_x) * self.x_scale - 0.5).ceil() - 1.0)
            .min(self.width as f64 - 1.0);
        (first <= last).then(|| (first as u32, last as u32))
    }

    fn to_pixel(&self, point: &Point<f64>) -> (i64, i64) {
        (
            ((point.x() - self.bbox.min_x) * self.x_scale).floor() as i64,
            ((self.bbox.max_y - point.y()) * self.y_scale).floor() as i64,
        )
    }
}

/// Sorted longitudes where the parallel at `lat` crosses any ring edge.
fn crossings(geometry: &MultiPolygon<f64>, lat: f64) -> Vec<f64> {
    let mut xs: Vec<f64> = geometry
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .flat_map(|ring| ring.lines())
        .filter(|line| (line.start.y <= lat) != (line.end.y <= lat))
        .map(|line| {
            line.start.x
                + (lat - line.start.y) * (line.end.x - line.start.x) / (line.end.y - line.start.y)
        })
        .collect();
    xs.sort_by(|a, b| a.total_cmp(b));
    xs
}

fn blend(base: &mut Rgba<u8>, over: Rgba<u8>) {
    let alpha = over[3] as f32 / 255.0;
    for c in 0..3 {
        base[c] = (over[c] as f32 * alpha + base[c] as f32 * (1.0 - alpha)).round() as u8;
    }
}

/// Draw the areas in translucent red and every result point in blue.
pub fn render_map(boundaries: &BoundaryCollection, results: &ResultSet, size: u32) -> Result<RgbaImage> {
    let bbox = boundaries.bbox().ok_or_else(|| HousesError::ProcessingError {
        message: "cannot draw a map without any community area".to_string(),
    })?;
    let projector = Projector::new(bbox, size.max(1));
    let mut img = RgbaImage::from_pixel(projector.width, projector.height, BACKGROUND);

    let area_boxes: Vec<_> = boundaries
        .areas
        .iter()
        .filter_map(|area| BoundingBox::of(&area.geometry).map(|b| (b, area)))
        .collect();

    // 逐列掃描：交點兩兩配對（奇偶規則），洞的邊界自然抵銷
    for py in 0..projector.height {
        let lat = projector.to_geo(0, py).y();
        for (area_box, area) in &area_boxes {
            if lat < area_box.min_y || lat > area_box.max_y {
                continue;
            }
            for pair in crossings(&area.geometry, lat).chunks_exact(2) {
                if let Some((first, last)) = projector.columns_between(pair[0], pair[1]) {
                    for px in first..=last {
                        blend(img.get_pixel_mut(px, py), AREA_FILL);
                    }
                }
            }
        }
    }

    let radius = (size / 200).max(2) as i64;
    for record in &results.records {
        let (cx, cy) = projector.to_pixel(&record.location);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let (x, y) = (cx + dx, cy + dy);
                if x >= 0 && y >= 0 && (x as u32) < projector.width && (y as u32) < projector.height {
                    blend(img.get_pixel_mut(x as u32, y as u32), POINT_FILL);
                }
            }
        }
    }

    Ok(img)
}

pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
