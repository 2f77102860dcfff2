use serde::Deserialize;
use tracing::warn;

use crate::models::order::GeoPoint;
use crate::providers::{ProviderError, http_client};

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Reverse/forward geocoding against a Nominatim-style service.
///
/// The public instance has no API key and may rate-limit; every failure
/// degrades to a deterministic fallback instead of surfacing an error.
pub struct Geocoder {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ReversePlace {
    display_name: String,
}

// Nominatim encodes coordinates as strings.
#[derive(Deserialize)]
struct SearchPlace {
    lat: String,
    lon: String,
}

impl Geocoder {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_GEOCODER_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            base_url: base_url.into(),
        }
    }

    /// Human-readable address for a coordinate. On any failure the raw
    /// coordinates are formatted instead, so the caller always gets a string.
    pub async fn reverse(&self, point: &GeoPoint) -> String {
        match self.try_reverse(point).await {
            Ok(address) => address,
            Err(err) => {
                warn!(error = %err, "reverse geocoding failed, using raw coordinates");
                format!("{:.4}, {:.4}", point.lat, point.lng)
            }
        }
    }

    async fn try_reverse(&self, point: &GeoPoint) -> Result<String, ProviderError> {
        let url = format!("{}/reverse", self.base_url);
        let lat = point.lat.to_string();
        let lng = point.lng.to_string();
        let resp = self
            .http
            .get(url)
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lng.as_str()),
                ("accept-language", "ru"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::UnexpectedStatus(resp.status()));
        }

        let place: ReversePlace = resp.json().await?;
        Ok(short_address(&place.display_name))
    }

    /// Resolves a free-text query to a coordinate. `None` on failure or when
    /// the service finds nothing.
    pub async fn forward(&self, query: &str) -> Option<GeoPoint> {
        match self.try_forward(query).await {
            Ok(point) => point,
            Err(err) => {
                warn!(error = %err, query, "forward geocoding failed");
                None
            }
        }
    }

    async fn try_forward(&self, query: &str) -> Result<Option<GeoPoint>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let resp = self
            .http
            .get(url)
            .query(&[
                ("format", "json"),
                ("q", query),
                ("accept-language", "ru"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::UnexpectedStatus(resp.status()));
        }

        let places: Vec<SearchPlace> = resp.json().await?;
        let Some(place) = places.first() else {
            return Ok(None);
        };

        let lat = place
            .lat
            .parse::<f64>()
            .map_err(|err| ProviderError::Malformed(format!("lat: {err}")))?;
        let lng = place
            .lon
            .parse::<f64>()
            .map_err(|err| ProviderError::Malformed(format!("lon: {err}")))?;

        Ok(Some(GeoPoint { lat, lng }))
    }
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the first two comma-separated components of a display name.
fn short_address(display_name: &str) -> String {
    display_name
        .split(',')
        .map(str::trim)
        .take(2)
        .collect::<Vec<_>>()
        .join(", ")
}
