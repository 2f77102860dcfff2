use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Waiting,
    Accepted,
    Rejected,
}

/// A driver's counter-proposal of price against an order. Several drivers may
/// hold open offers on the same order; nothing enforces uniqueness of the
/// (order, driver) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub order_id: Uuid,
    pub passenger_id: String,
    pub driver_id: Option<String>,
    pub price: i64,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct OfferPatch {
    pub status: Option<OfferStatus>,
    pub driver_id: Option<String>,
    pub price: Option<i64>,
}

impl Offer {
    pub fn apply(&mut self, patch: &OfferPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(driver_id) = &patch.driver_id {
            self.driver_id = Some(driver_id.clone());
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}
