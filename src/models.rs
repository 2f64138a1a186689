//! Core domain models for the rupture database

use std::collections::BTreeMap;

use crate::geometry::{haversine_km, Point};

/// One rectangular plane of a fault section
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
    /// Depth of the top edge in km
    pub top_depth: f64,
    /// Depth of the bottom edge in km
    pub bottom_depth: f64,
}

impl Plane {
    /// Along-strike length of the top edge in km.
    pub fn length_km(&self) -> f64 {
        haversine_km(self.top_left, self.top_right)
    }

    /// Down-dip width in km.
    pub fn width_km(&self) -> f64 {
        let horizontal = haversine_km(self.top_left, self.bottom_left);
        let vertical = self.bottom_depth - self.top_depth;
        horizontal.hypot(vertical)
    }

    pub fn area_km2(&self) -> f64 {
        self.length_km() * self.width_km()
    }

    /// Closed ring of corners, top edge first.
    pub fn ring(&self) -> [Point; 5] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
            self.top_left,
        ]
    }
}

/// A parent fault, restricted to the sections taking part in a rupture
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub name: String,
    pub rake: f64,
    pub planes: Vec<Plane>,
}

impl Fault {
    pub fn area_km2(&self) -> f64 {
        self.planes.iter().map(Plane::area_km2).sum()
    }

    pub fn length_km(&self) -> f64 {
        self.planes.iter().map(Plane::length_km).sum()
    }

    /// Width of the first plane, or zero for a fault without planes.
    pub fn width_km(&self) -> f64 {
        self.planes.first().map(Plane::width_km).unwrap_or(0.0)
    }

    /// True when the fault has no geometry to draw.
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }
}

/// A modelled rupture scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Rupture {
    pub rupture_id: i64,
    pub magnitude: f64,
    /// Rupture area in m²
    pub area: f64,
    /// Rupture length in m
    pub length: f64,
    /// Mean annual rate
    pub rate: f64,
    /// Participating faults keyed by parent fault name
    pub faults: BTreeMap<String, Fault>,
}

impl Rupture {
    pub fn fault_names(&self) -> Vec<&str> {
        self.faults.keys().map(String::as_str).collect()
    }
}

/// Parent fault metadata
#[derive(Debug, Clone, PartialEq)]
pub struct FaultInfo {
    pub parent_id: i64,
    pub name: String,
    pub rake: f64,
}

/// Inclusive range; a missing end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Bounds {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }
}

/// Numeric filters applied alongside a fault expression
#[derive(Debug, Clone, PartialEq)]
pub struct RuptureFilter {
    pub magnitude_bounds: Bounds,
    /// Annual rate bounds (not exponents)
    pub rate_bounds: Bounds,
    /// Maximum number of parent faults in a rupture
    pub fault_count_limit: Option<u32>,
    /// Maximum number of ruptures returned
    pub limit: u32,
}

impl Default for RuptureFilter {
    fn default() -> Self {
        Self {
            magnitude_bounds: Bounds::default(),
            rate_bounds: Bounds::default(),
            fault_count_limit: None,
            limit: 100,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::geometry::EARTH_RADIUS_KM;

    /// A vertical north-striking fault with a single plane of the given size.
    pub fn rectangular_fault(name: &str, length_km: f64, width_km: f64) -> Fault {
        let lat = -43.0;
        let lon = 172.0;
        let dlat = (length_km / EARTH_RADIUS_KM).to_degrees();
        let top_left = Point { lat, lon };
        let top_right = Point {
            lat: lat + dlat,
            lon,
        };
        Fault {
            name: name.to_string(),
            rake: 0.0,
            planes: vec![Plane {
                top_left,
                top_right,
                bottom_right: top_right,
                bottom_left: top_left,
                top_depth: 0.0,
                bottom_depth: width_km,
            }],
        }
    }
}
