use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::providers::{ProviderError, http_client};

/// Payload for the external bid-suggestion service. The shape is fixed by the
/// service; every field is sent on each call.
#[derive(Debug, Clone, Serialize)]
pub struct OptimalPriceRequest {
    pub driver_id: String,
    pub driver_rating: f64,
    pub platform: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: u16,
    pub order_id: Uuid,
    pub order_created_at: DateTime<Utc>,
    pub requested_at: DateTime<Utc>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub base_price: i64,
    pub bid_price: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimalPriceResponse {
    pub optimal_bid: f64,
    pub probability: f64,
    pub expected_income: f64,
}

/// Client for `POST /optimal_price`. The suggestion is informational only;
/// failures are logged and yield `None`.
pub struct PricingSuggestor {
    http: reqwest::Client,
    base_url: String,
}

impl PricingSuggestor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            base_url: base_url.into(),
        }
    }

    pub async fn suggest(&self, request: &OptimalPriceRequest) -> Option<OptimalPriceResponse> {
        match self.try_suggest(request).await {
            Ok(suggestion) => {
                info!(
                    order_id = %request.order_id,
                    optimal_bid = suggestion.optimal_bid,
                    probability = suggestion.probability,
                    expected_income = suggestion.expected_income,
                    "price suggestion received"
                );
                Some(suggestion)
            }
            Err(err) => {
                warn!(error = %err, order_id = %request.order_id, "price suggestion failed");
                None
            }
        }
    }

    async fn try_suggest(
        &self,
        request: &OptimalPriceRequest,
    ) -> Result<OptimalPriceResponse, ProviderError> {
        let url = format!("{}/optimal_price", self.base_url);
        let resp = self.http.post(url).json(request).send().await?;

        if !resp.status().is_success() {
            return Err(ProviderError::UnexpectedStatus(resp.status()));
        }

        Ok(resp.json().await?)
    }
}
