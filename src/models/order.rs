use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Lifecycle of a trip order. The happy path is monotonic:
/// `Searching -> DriverAssigned -> InProgress -> Completed`.
/// `Cancelled` is reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Searching,
    DriverAssigned,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Whether `next` is a legal successor. The store itself never rejects a
    /// write; callers that care about monotonicity check here first.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Searching, DriverAssigned)
            | (DriverAssigned, InProgress)
            | (InProgress, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripOrder {
    pub id: Uuid,
    pub passenger_id: String,
    pub pickup: GeoPoint,
    pub pickup_address: String,
    pub destination: GeoPoint,
    pub destination_address: String,
    /// Route length in meters.
    pub distance_m: f64,
    /// Estimated travel time in seconds.
    pub duration_s: f64,
    /// Price in whole currency units.
    pub price: i64,
    pub status: OrderStatus,
    pub driver_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial update applied via read-modify-write in the sync client.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub driver_id: Option<String>,
    pub price: Option<i64>,
}

impl TripOrder {
    pub fn apply(&mut self, patch: &OrderPatch) {
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
