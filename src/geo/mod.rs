use crate::models::order::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Average speed assumed when estimating travel time without a routing
/// service, in km/h.
pub const FALLBACK_SPEED_KMH: f64 = 40.0;

pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_M * central_angle
}

/// Straight-line travel time estimate at [`FALLBACK_SPEED_KMH`].
pub fn eta_seconds(distance_m: f64) -> f64 {
    (distance_m / 1000.0) / FALLBACK_SPEED_KMH * 3600.0
}
