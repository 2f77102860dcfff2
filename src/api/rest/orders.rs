use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{OrderStatus, TripOrder};
use crate::state::{AppState, StoreEvent};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route(
            "/orders/:id",
            get(get_order).put(put_order).delete(delete_order),
        )
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Json<Vec<TripOrder>> {
    let orders = state
        .orders
        .iter()
        .map(|entry| entry.value().clone())
        .filter(|order| query.status.is_none_or(|status| order.status == status))
        .collect();

    Json(orders)
}

/// The store is a passive record keeper: the client supplies the id and the
/// full record, and a repeated create simply overwrites.
async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(order): Json<TripOrder>,
) -> Json<TripOrder> {
    state.orders.insert(order.id, order.clone());
    state.metrics.record_write("order", "create");
    refresh_open_orders(&state);
    state.publish(StoreEvent::OrderUpserted {
        order: order.clone(),
    });

    Json(order)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TripOrder>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order.value().clone()))
}

/// Whole-record replace. No version check: the last writer observed by the
/// next poll wins.
async fn put_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(order): Json<TripOrder>,
) -> Result<Json<TripOrder>, AppError> {
    if order.id != id {
        return Err(AppError::BadRequest(format!(
            "body id {} does not match path id {}",
            order.id, id
        )));
    }

    state.orders.insert(id, order.clone());
    state.metrics.record_write("order", "update");
    refresh_open_orders(&state);
    state.publish(StoreEvent::OrderUpserted {
        order: order.clone(),
    });

    Ok(Json(order))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TripOrder>, AppError> {
    let (_, order) = state
        .orders
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    state.metrics.record_write("order", "delete");
    refresh_open_orders(&state);
    state.publish(StoreEvent::OrderRemoved { id });

    Ok(Json(order))
}

fn refresh_open_orders(state: &AppState) {
    let open = state
        .orders
        .iter()
        .filter(|entry| entry.value().status == OrderStatus::Searching)
        .count();
    state.metrics.open_orders.set(open as i64);
}
