//! Geographic primitives for viewports and camera placement

use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// A rectangular viewport given by its south-west and north-east corners.
///
/// When `south_west.longitude > north_east.longitude` the rectangle crosses the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    #[must_use]
    pub const fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.south_west.longitude > self.north_east.longitude
    }

    pub fn contains(&self, point: LatLng) -> bool {
        let in_latitude = point.latitude >= self.south_west.latitude
            && point.latitude <= self.north_east.latitude;
        if !in_latitude {
            return false;
        }
        if self.crosses_antimeridian() {
            point.longitude >= self.south_west.longitude
                || point.longitude <= self.north_east.longitude
        } else {
            point.longitude >= self.south_west.longitude
                && point.longitude <= self.north_east.longitude
        }
    }

    /// Geometric center, honoring antimeridian crossing.
    pub fn center(&self) -> LatLng {
        let latitude = (self.south_west.latitude + self.north_east.latitude) / 2.0;
        let mut longitude = if self.crosses_antimeridian() {
            (self.south_west.longitude + self.north_east.longitude + 360.0) / 2.0
        } else {
            (self.south_west.longitude + self.north_east.longitude) / 2.0
        };
        if longitude > 180.0 {
            longitude -= 360.0;
        }
        LatLng::new(latitude, longitude)
    }
}

/// Last known camera placement on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPosition {
    pub target: LatLng,
    pub zoom: f32,
}

impl CameraPosition {
    #[must_use]
    pub const fn new(target: LatLng, zoom: f32) -> Self {
        Self { target, zoom }
    }
}
