use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::offer::Offer;
use crate::state::{AppState, StoreEvent};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/offers", post(create_offer).get(list_offers))
        .route(
            "/offers/:id",
            get(get_offer).put(put_offer).delete(delete_offer),
        )
}

#[derive(Deserialize)]
pub struct ListOffersQuery {
    pub order_id: Option<Uuid>,
}

async fn list_offers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOffersQuery>,
) -> Json<Vec<Offer>> {
    let offers = state
        .offers
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|offer| query.order_id.is_none_or(|id| offer.order_id == id))
        .collect();

    Json(offers)
}

async fn create_offer(
    State(state): State<Arc<AppState>>,
    Json(offer): Json<Offer>,
) -> Json<Offer> {
    state.offers.insert(offer.id, offer.clone());
    state.metrics.record_write("offer", "create");
    state.publish(StoreEvent::OfferUpserted {
        offer: offer.clone(),
    });

    Json(offer)
}

async fn get_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Offer>, AppError> {
    let offer = state
        .offers
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("offer {} not found", id)))?;

    Ok(Json(offer.value().clone()))
}

async fn put_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(offer): Json<Offer>,
) -> Result<Json<Offer>, AppError> {
    if offer.id != id {
        return Err(AppError::BadRequest(format!(
            "body id {} does not match path id {}",
            offer.id, id
        )));
    }

    state.offers.insert(id, offer.clone());
    state.metrics.record_write("offer", "update");
    state.publish(StoreEvent::OfferUpserted {
        offer: offer.clone(),
    });

    Ok(Json(offer))
}

/// Withdrawal is a hard delete; offers have no tombstone status.
async fn delete_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Offer>, AppError> {
    let (_, offer) = state
        .offers
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("offer {} not found", id)))?;

    state.metrics.record_write("offer", "delete");
    state.publish(StoreEvent::OfferRemoved { id });

    Ok(Json(offer))
}
