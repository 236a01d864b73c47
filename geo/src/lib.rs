//! Geometry primitives for the lap-timer core.
//!
//! Provides a 2-D (lat/lon) treatment of points and oriented segments used to
//! detect circuit-boundary crossings. Distances use the spherical law of
//! cosines; segment intersection is planar and exact enough for boundaries
//! spanning a single circuit's bounding box.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Mean earth radius in kilometers, used by the spherical law of cosines.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Unit used when reporting a distance between two [`GeoPoint`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    Kilometers,
    Miles,
    NauticalMiles,
}

impl DistanceUnit {
    fn radius_km(self) -> f64 {
        match self {
            DistanceUnit::Kilometers => EARTH_RADIUS_KM,
            DistanceUnit::Miles => 3958.8,
            DistanceUnit::NauticalMiles => 3440.1,
        }
    }
}

/// A geographic coordinate. Immutable after construction; cloning is a value
/// copy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        GeoPoint { lat, lon, alt }
    }

    /// Great-circle distance to `other` via the spherical law of cosines.
    pub fn distance(&self, other: &GeoPoint, unit: DistanceUnit) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * dlon.cos();
        // clamp against float drift pushing the argument outside [-1, 1]
        let cos_angle = cos_angle.clamp(-1.0, 1.0);
        unit.radius_km() * cos_angle.acos()
    }
}

/// Axis-aligned inclusive bounding box over two [`GeoPoint`]s' lat/lon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lon >= self.min_lon && p.lon <= self.max_lon
    }
}

/// Which side of an oriented segment a crossing must come from to count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntersectFilter {
    Any,
    TowardApex,
    AwayFromApex,
}

/// An oriented line `(start, end)`. Per the "isosceles-triangle" convention
/// used by circuit boundaries, crossing from the B side to the C side (the
/// side `den > 0` gates) is the valid direction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: GeoPoint,
    pub end: GeoPoint,
}

impl Segment {
    pub fn new(start: GeoPoint, end: GeoPoint) -> Self {
        Segment { start, end }
    }

    pub fn contains_box(&self, p: &GeoPoint) -> bool {
        self.bounding_box().contains(p)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            min_lat: self.start.lat.min(self.end.lat),
            max_lat: self.start.lat.max(self.end.lat),
            min_lon: self.start.lon.min(self.end.lon),
            max_lon: self.start.lon.max(self.end.lon),
        }
    }

    pub fn midpoint(&self) -> GeoPoint {
        GeoPoint::new(
            (self.start.lat + self.end.lat) / 2.0,
            (self.start.lon + self.end.lon) / 2.0,
            (self.start.alt + self.end.alt) / 2.0,
        )
    }

    pub fn length_meters(&self) -> f64 {
        1000.0 * self.start.distance(&self.end, DistanceUnit::Kilometers)
    }

    /// `1 − |d(start,p) − d(end,p)| / (d(start,p)+d(end,p))`, clamped to
    /// `[0,1]`; `0` when both distances are zero. Used to interpolate a
    /// crossing timestamp between two fixes.
    pub fn center_factor(&self, p: &GeoPoint) -> f64 {
        let d_start = self.start.distance(p, DistanceUnit::Kilometers);
        let d_end = self.end.distance(p, DistanceUnit::Kilometers);
        let sum = d_start + d_end;
        if sum == 0.0 {
            return 0.0;
        }
        (1.0 - (d_start - d_end).abs() / sum).clamp(0.0, 1.0)
    }

    /// Planar parametric projection of `p` onto this segment, clamped to
    /// `[0,1]`.
    pub fn projection_factor(&self, p: &GeoPoint) -> f64 {
        let dx = self.end.lat - self.start.lat;
        let dy = self.end.lon - self.start.lon;
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return 0.0;
        }
        let t = ((p.lat - self.start.lat) * dx + (p.lon - self.start.lon) * dy) / len_sq;
        t.clamp(0.0, 1.0)
    }

    /// Tests this segment (`L = (start, end)`) against another (`Q =
    /// (query.start, query.end)`) for a crossing, gated by `filter`.
    ///
    /// `den`'s sign distinguishes which side of `L` the crossing approaches
    /// from; `TowardApex` keeps `den > 0`, `AwayFromApex` keeps `den < 0`.
    pub fn intersect(&self, query: &Segment, filter: IntersectFilter) -> Option<GeoPoint> {
        let (s, e) = (self.start, self.end);
        let (q0, q1) = (query.start, query.end);

        let den = (e.lat - s.lat) * (q1.lon - q0.lon) - (e.lon - s.lon) * (q1.lat - q0.lat);

        let t1 = ((q0.lat - s.lat) * (q1.lon - q0.lon) + (s.lon - q0.lon) * (q1.lat - q0.lat)) / den;
        if !t1.is_finite() {
            trace!("segment intersect: degenerate/parallel, den={den}");
            return None;
        }
        match filter {
            IntersectFilter::TowardApex if den < 0.0 => return None,
            IntersectFilter::AwayFromApex if den > 0.0 => return None,
            _ => {}
        }

        let t2 = ((q0.lat - s.lat) * (e.lon - s.lon) - (q0.lon - s.lon) * (e.lat - s.lat)) / den;
        if !t2.is_finite() {
            return None;
        }

        if (0.0..=1.0).contains(&t1) && (0.0..=1.0).contains(&t2) {
            Some(GeoPoint::new(
                s.lat + t1 * (e.lat - s.lat),
                s.lon + t1 * (e.lon - s.lon),
                s.alt + t1 * (e.alt - s.alt),
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests;
