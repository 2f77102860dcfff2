use serde::Deserialize;
use tracing::warn;

use crate::geo::{eta_seconds, haversine_m};
use crate::models::order::GeoPoint;
use crate::providers::{ProviderError, http_client};

pub const DEFAULT_ROUTER_URL: &str = "https://router.project-osrm.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Osrm,
    StraightLine,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub points: Vec<GeoPoint>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub source: RouteSource,
}

/// Driving routes from an OSRM-style service, with a straight-line fallback
/// when the service is unreachable.
pub struct RouteProvider {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct OsrmResponse {
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

// GeoJSON geometry: coordinates are (lon, lat) pairs.
#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

impl RouteProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_ROUTER_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            base_url: base_url.into(),
        }
    }

    /// Never fails: any service problem degrades to [`straight_line`].
    pub async fn route(&self, start: &GeoPoint, end: &GeoPoint) -> Route {
        match self.try_route(start, end).await {
            Ok(route) => route,
            Err(err) => {
                warn!(error = %err, "routing failed, falling back to straight line");
                straight_line(start, end)
            }
        }
    }

    async fn try_route(&self, start: &GeoPoint, end: &GeoPoint) -> Result<Route, ProviderError> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, start.lng, start.lat, end.lng, end.lat
        );

        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ProviderError::UnexpectedStatus(resp.status()));
        }

        let body: OsrmResponse = resp.json().await?;
        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Malformed("no routes in response".to_string()))?;

        let points = route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| GeoPoint { lat, lng })
            .collect();

        Ok(Route {
            points,
            distance_m: route.distance,
            duration_s: route.duration,
            source: RouteSource::Osrm,
        })
    }
}

impl Default for RouteProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Two-point route with Haversine distance and a fixed-speed ETA.
pub fn straight_line(start: &GeoPoint, end: &GeoPoint) -> Route {
    let distance_m = haversine_m(start, end);

    Route {
        points: vec![*start, *end],
        distance_m,
        duration_s: eta_seconds(distance_m),
        source: RouteSource::StraightLine,
    }
}

#[cfg(test)]
mod tests {
    use super::{RouteSource, straight_line};
    use crate::models::order::GeoPoint;

    #[test]
    fn straight_line_between_identical_points_is_zero() {
        let p = GeoPoint {
            lat: 55.7558,
            lng: 37.6173,
        };
        let route = straight_line(&p, &p);

        assert_eq!(route.source, RouteSource::StraightLine);
        assert_eq!(route.points.len(), 2);
        assert!(route.distance_m < 1e-9);
        assert!(route.duration_s < 1e-9);
    }

    #[test]
    fn straight_line_short_hop_has_consistent_eta() {
        let a = GeoPoint {
            lat: 55.7558,
            lng: 37.6173,
        };
        let b = GeoPoint {
            lat: 55.7602,
            lng: 37.6185,
        };
        let route = straight_line(&a, &b);

        assert!(route.distance_m > 300.0 && route.distance_m < 700.0);
        let expected = route.distance_m / 1000.0 / 40.0 * 3600.0;
        assert!((route.duration_s - expected).abs() < 1e-9);
    }
}
