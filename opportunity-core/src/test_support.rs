//! Test-only region builders shared by unit, behaviour, and property tests.

use geo::{LineString, MultiPolygon, Polygon};

use crate::{Region, RegionId};

/// Build an empty region from a ZIP literal.
///
/// # Panics
/// Panics when `zip` is not a valid ZIP code.
#[must_use]
pub fn region(zip: &str) -> Region {
    match RegionId::parse(zip) {
        Ok(id) => Region::new(id),
        Err(err) => panic!("invalid fixture ZIP '{zip}': {err}"),
    }
}

/// Unit square with its lower-left corner at `(x, y)`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "fixture corners are offsets from the origin"
)]
pub fn square(x: f64, y: f64) -> MultiPolygon<f64> {
    let ring = LineString::from(vec![
        (x, y),
        (x + 1.0, y),
        (x + 1.0, y + 1.0),
        (x, y + 1.0),
        (x, y),
    ]);
    MultiPolygon::new(vec![Polygon::new(ring, Vec::new())])
}
