//! Spherical geometry seam.
//!
//! All space-filling-curve mathematics is delegated to the `s2` crate
//! and distance calculations to the `geo` crate; this module is the
//! only place either is touched for geometry. Points follow the `geo`
//! convention: `x` is longitude, `y` is latitude, both in degrees.

use geo::{Distance, Haversine, Point};
use s2::cellid::CellID;
use s2::latlng::LatLng;
use s2::rect::Rect;
use s2::region::RegionCoverer;
use s2::s1;

use crate::error::{GeoTableError, Result};
use crate::range::GeohashRange;

/// Coverer limits: leaf-level cells allowed, at most 8 cells per
/// covering.
const COVERER_MIN_LEVEL: u8 = 0;
const COVERER_MAX_LEVEL: u8 = 30;
const COVERER_LEVEL_MOD: u8 = 1;
const COVERER_MAX_CELLS: usize = 8;

fn latlng(point: &Point) -> LatLng {
    LatLng::new(s1::Deg(point.y()).into(), s1::Deg(point.x()).into())
}

/// Project a point to its leaf S2 cell id, reinterpreted as a signed
/// 64-bit geohash value.
///
/// Deterministic and pure: the same point always yields the same
/// geohash.
///
/// # Examples
///
/// ```rust
/// use geo::Point;
/// use geotable::geometry::generate_geohash;
///
/// let point = Point::new(2.0, 52.1); // lng, lat
/// assert_eq!(generate_geohash(&point), 5177531549489041509);
/// ```
pub fn generate_geohash(point: &Point) -> i64 {
    CellID::from(latlng(point)).0 as i64
}

/// The full span of geohash values under a cell.
pub fn cell_geohash_range(cell: CellID) -> GeohashRange {
    GeohashRange::new(cell.range_min().0 as i64, cell.range_max().0 as i64)
}

/// Great-circle distance between two points in meters.
pub fn earth_distance_meters(a: &Point, b: &Point) -> f64 {
    Haversine.distance(*a, *b)
}

/// Compute a minimal over-approximate set of cells covering `rect`.
pub fn covering_cells(rect: &LatLngRect) -> Vec<CellID> {
    let coverer = RegionCoverer {
        min_level: COVERER_MIN_LEVEL,
        max_level: COVERER_MAX_LEVEL,
        level_mod: COVERER_LEVEL_MOD,
        max_cells: COVERER_MAX_CELLS,
    };
    coverer.covering(&rect.to_s2()).0
}

/// An axis-aligned latitude/longitude rectangle.
///
/// When `min.x() > max.x()` the rectangle wraps the antimeridian: it
/// spans from the min longitude eastward across 180° to the max
/// longitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngRect {
    min: Point,
    max: Point,
}

impl LatLngRect {
    /// Build a rectangle from its south-west and north-east corners.
    ///
    /// Fails fast when either corner has non-finite or out-of-range
    /// coordinates, or when `min` latitude exceeds `max` latitude.
    pub fn from_corners(min: &Point, max: &Point) -> Result<Self> {
        validate_point(min)?;
        validate_point(max)?;
        if min.y() > max.y() {
            return Err(GeoTableError::InvalidInput(format!(
                "min latitude ({}) must be <= max latitude ({})",
                min.y(),
                max.y()
            )));
        }
        Ok(Self {
            min: *min,
            max: *max,
        })
    }

    /// Build the bounding rectangle of a radius query.
    ///
    /// Degrees-per-meter is measured locally by probing one-degree
    /// offsets from the center toward the equator and the
    /// antimeridian, then the center is expanded by the scaled radius
    /// on both axes.
    pub fn from_radius(center: &Point, radius_meters: f64) -> Result<Self> {
        validate_point(center)?;
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            return Err(GeoTableError::InvalidInput(format!(
                "radius must be a non-negative number of meters, got {}",
                radius_meters
            )));
        }

        let lat_reference_unit = if center.y() > 0.0 { -1.0 } else { 1.0 };
        let lat_reference = Point::new(center.x(), center.y() + lat_reference_unit);
        let lng_reference_unit = if center.x() > 0.0 { -1.0 } else { 1.0 };
        let lng_reference = Point::new(center.x() + lng_reference_unit, center.y());

        let lat_for_radius = radius_meters / earth_distance_meters(center, &lat_reference);
        let lng_for_radius = radius_meters / earth_distance_meters(center, &lng_reference);

        Ok(Self {
            min: Point::new(center.x() - lng_for_radius, center.y() - lat_for_radius),
            max: Point::new(center.x() + lng_for_radius, center.y() + lat_for_radius),
        })
    }

    /// Exact containment test, antimeridian-aware.
    pub fn contains(&self, point: &Point) -> bool {
        if point.y() < self.min.y() || point.y() > self.max.y() {
            return false;
        }

        if self.min.x() <= self.max.x() {
            self.min.x() <= point.x() && point.x() <= self.max.x()
        } else {
            // Wraps 180°: inside iff east of min or west of max.
            point.x() >= self.min.x() || point.x() <= self.max.x()
        }
    }

    /// South-west corner.
    pub fn min(&self) -> Point {
        self.min
    }

    /// North-east corner.
    pub fn max(&self) -> Point {
        self.max
    }

    /// Convert to an S2 rectangle for covering. An inverted longitude
    /// interval encodes the antimeridian wrap.
    fn to_s2(&self) -> Rect {
        Rect {
            lat: s2::r1::interval::Interval {
                lo: self.min.y().to_radians(),
                hi: self.max.y().to_radians(),
            },
            lng: s2::s1::interval::Interval {
                lo: self.min.x().to_radians(),
                hi: self.max.x().to_radians(),
            },
        }
    }
}

/// Reject non-finite or out-of-range coordinates before any query or
/// write is issued.
pub fn validate_point(point: &Point) -> Result<()> {
    if !point.y().is_finite() || !(-90.0..=90.0).contains(&point.y()) {
        return Err(GeoTableError::InvalidInput(format!(
            "latitude must be within [-90, 90], got {}",
            point.y()
        )));
    }
    if !point.x().is_finite() || !(-180.0..=180.0).contains(&point.x()) {
        return Err(GeoTableError::InvalidInput(format!(
            "longitude must be within [-180, 180], got {}",
            point.x()
        )));
    }
    Ok(())
}
