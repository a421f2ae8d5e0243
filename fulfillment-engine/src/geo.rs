//! Great-circle distance
//!
//! Haversine distance between WGS84 coordinates, used by the dispatch
//! radius filter and the in-memory store's nearest query.

use shared::types::GeoPoint;

/// Mean Earth radius in meters
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine great-circle distance in meters
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}
