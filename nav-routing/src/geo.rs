//! Coordinates and great-circle distances

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// A WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the ±90 / ±180 degree ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn distance_m(&self, other: &Coord) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }

    /// R-tree key, which is always `[lon, lat]`
    pub(crate) fn to_xy(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let p1 = Point::new(lon1, lat1);
    let p2 = Point::new(lon2, lat2);
    Haversine::distance(p1, p2)
}

/// Sum of segment lengths along a polyline, in meters
pub fn polyline_length(points: &[Coord]) -> f64 {
    points.windows(2).map(|w| w[0].distance_m(&w[1])).sum()
}
