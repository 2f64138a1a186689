//! Great-circle measurement and GeoJSON output for fault geometry

use serde_json::{json, Map, Value};

use crate::models::Fault;

/// Mean Earth radius in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    /// GeoJSON position (`[lon, lat]`).
    pub fn position(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// Great-circle distance between two points in km.
pub fn haversine_km(a: Point, b: Point) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// GeoJSON feature for a fault: one polygon per plane, id set to the fault name.
pub fn fault_feature(fault: &Fault, properties: Map<String, Value>) -> Value {
    let polygons: Vec<Vec<Vec<[f64; 2]>>> = fault
        .planes
        .iter()
        .map(|plane| vec![plane.ring().iter().map(Point::position).collect()])
        .collect();

    json!({
        "type": "Feature",
        "id": fault.name,
        "properties": properties,
        "geometry": {
            "type": "MultiPolygon",
            "coordinates": polygons,
        },
    })
}

pub fn feature_collection(features: Vec<Value>) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}
