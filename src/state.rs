use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::offer::Offer;
use crate::models::order::TripOrder;
use crate::observability::metrics::Metrics;

/// Pushed to websocket subscribers on every store mutation. Polling remains
/// the default way clients reconcile; this is the push-based alternative.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    OrderUpserted { order: TripOrder },
    OrderRemoved { id: Uuid },
    OfferUpserted { offer: Offer },
    OfferRemoved { id: Uuid },
}

pub struct AppState {
    pub orders: DashMap<Uuid, TripOrder>,
    pub offers: DashMap<Uuid, Offer>,
    pub events_tx: broadcast::Sender<StoreEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            orders: DashMap::new(),
            offers: DashMap::new(),
            events_tx,
            metrics: Metrics::new(),
        }
    }

    pub fn publish(&self, event: StoreEvent) {
        let _ = self.events_tx.send(event);
    }
}
