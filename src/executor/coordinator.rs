// Normalized (0–1000) → device pixel mapping.
use thiserror::Error;

use crate::action::types::{Coordinate, NormPoint};

pub const NORMALIZED_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("No {0} coordinates")]
    Missing(&'static str),
    #[error("Invalid {field} format: {raw}")]
    Malformed { field: &'static str, raw: String },
}

/// `pixel = round(normalized / 1000 * dimension)`, against the geometry of
/// the screenshot taken for the current step. Points outside the grid are
/// clamped onto the screen edge.
pub fn normalized_to_pixel(point: NormPoint, screen_width: u32, screen_height: u32) -> (i32, i32) {
    (to_pixel(point.x, screen_width), to_pixel(point.y, screen_height))
}

fn to_pixel(normalized: f64, dimension: u32) -> i32 {
    let dimension = f64::from(dimension);
    (normalized / NORMALIZED_SCALE * dimension)
        .round()
        .clamp(0.0, dimension) as i32
}

pub fn resolve(
    field: &'static str,
    coordinate: &Coordinate,
    screen_width: u32,
    screen_height: u32,
) -> Result<(i32, i32), CoordinateError> {
    match coordinate {
        Coordinate::Point(p) => Ok(normalized_to_pixel(*p, screen_width, screen_height)),
        Coordinate::Missing => Err(CoordinateError::Missing(field)),
        Coordinate::Malformed { raw } => Err(CoordinateError::Malformed {
            field,
            raw: raw.clone(),
        }),
    }
}
