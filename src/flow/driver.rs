use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::flow::Machine;
use crate::models::offer::{Offer, OfferStatus};
use crate::models::order::{OrderPatch, OrderStatus, TripOrder};
use crate::pricing::{PriceError, peak_price, validate_bid};
use crate::providers::pricing::{OptimalPriceRequest, OptimalPriceResponse, PricingSuggestor};
use crate::sync::{SyncClient, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    OrderList,
    OrderDetails,
    WaitingResponse,
    NavigatingToPassenger,
    WaitingForPassenger,
    TripInProgress,
    TripCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    ShowOrders,
    SelectOrder,
    BackToIdle,
    BackToList,
    SubmitPrice,
    BackToOrder,
    OfferAccepted,
    AcceptOrder,
    ArriveAtPickup,
    CancelOrder,
    PassengerEntered,
    CompleteTrip,
}

/// Driver screen progression. A driver either accepts an order at its asking
/// price or submits a counter-price and waits for the passenger's response.
pub fn driver_table(state: DriverState, event: &DriverEvent) -> Option<DriverState> {
    use DriverEvent as E;
    use DriverState as S;

    match (state, event) {
        (S::Idle, E::ShowOrders) => Some(S::OrderList),
        (S::OrderList, E::SelectOrder) => Some(S::OrderDetails),
        (S::OrderList, E::BackToIdle) => Some(S::Idle),
        (S::OrderDetails, E::SubmitPrice) => Some(S::WaitingResponse),
        (S::OrderDetails, E::AcceptOrder) => Some(S::NavigatingToPassenger),
        (S::OrderDetails, E::BackToList) => Some(S::OrderList),
        (S::WaitingResponse, E::BackToOrder) => Some(S::OrderDetails),
        (S::WaitingResponse, E::OfferAccepted) => Some(S::NavigatingToPassenger),
        (S::NavigatingToPassenger, E::ArriveAtPickup) => Some(S::WaitingForPassenger),
        (S::NavigatingToPassenger, E::CancelOrder) => Some(S::OrderList),
        (S::WaitingForPassenger, E::PassengerEntered) => Some(S::TripInProgress),
        (S::WaitingForPassenger, E::CancelOrder) => Some(S::OrderList),
        (S::TripInProgress, E::CompleteTrip) => Some(S::TripCompleted),
        (S::TripCompleted, E::BackToIdle) => Some(S::Idle),
        _ => None,
    }
}

/// Static facts about the driver, sent along with pricing-suggestion calls.
#[derive(Debug, Clone)]
pub struct DriverProfile {
    pub driver_id: String,
    pub rating: f64,
    pub platform: String,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: u16,
}

/// Transient view-state for the active driver session.
#[derive(Debug, Clone, Default)]
pub struct DriverContext {
    pub current_order: Option<TripOrder>,
    pub orders: Vec<TripOrder>,
    pub open_offer: Option<Uuid>,
    pub earnings: i64,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no order selected")]
    NoOrderSelected,

    #[error("order is {0:?}, expected searching")]
    OrderNotOpen(OrderStatus),

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Driver machine plus its context and side effects. Like the booking side,
/// remote writes happen first and the transition commits only on success.
pub struct DriverSession {
    machine: Machine<DriverState, DriverEvent>,
    context: DriverContext,
    client: SyncClient,
    profile: DriverProfile,
}

impl DriverSession {
    pub fn new(client: SyncClient, profile: DriverProfile) -> Self {
        Self {
            machine: Machine::new(DriverState::Idle, driver_table),
            context: DriverContext::default(),
            client,
            profile,
        }
    }

    pub fn state(&self) -> DriverState {
        self.machine.state()
    }

    pub fn context(&self) -> &DriverContext {
        &self.context
    }

    pub fn profile(&self) -> &DriverProfile {
        &self.profile
    }

    /// Replaces the known-orders list from the latest poll snapshot.
    pub fn refresh_orders(&mut self, orders: Vec<TripOrder>) {
        self.context.orders = orders;
    }

    pub fn show_orders(&mut self) -> bool {
        self.machine.send(&DriverEvent::ShowOrders)
    }

    pub fn select_order(&mut self, order: TripOrder) -> bool {
        if self.machine.send(&DriverEvent::SelectOrder) {
            self.context.current_order = Some(order);
            true
        } else {
            false
        }
    }

    pub fn back_to_list(&mut self) -> bool {
        self.machine.send(&DriverEvent::BackToList)
    }

    pub fn back_to_idle(&mut self) -> bool {
        if self.machine.send(&DriverEvent::BackToIdle) {
            self.context.current_order = None;
            true
        } else {
            false
        }
    }

    /// Peak counter-price for the selected order, derived from its original
    /// base price.
    pub fn peak_bid(&self) -> Option<i64> {
        self.context
            .current_order
            .as_ref()
            .map(|order| peak_price(order.price))
    }

    /// Asks the external suggestion service what to bid. Informational only.
    pub async fn suggest_bid(
        &self,
        suggestor: &PricingSuggestor,
        bid_price: i64,
    ) -> Option<OptimalPriceResponse> {
        let order = self.context.current_order.as_ref()?;

        let request = OptimalPriceRequest {
            driver_id: self.profile.driver_id.clone(),
            driver_rating: self.profile.rating,
            platform: self.profile.platform.clone(),
            vehicle_make: self.profile.vehicle_make.clone(),
            vehicle_model: self.profile.vehicle_model.clone(),
            vehicle_year: self.profile.vehicle_year,
            order_id: order.id,
            order_created_at: order.created_at,
            requested_at: Utc::now(),
            distance_m: order.distance_m,
            duration_s: order.duration_s,
            base_price: order.price,
            bid_price,
        };

        suggestor.suggest(&request).await
    }

    /// Submits a counter-price on the selected order and moves to waiting for
    /// the passenger's response.
    pub async fn submit_offer(&mut self, price: i64) -> Result<Offer, DriverError> {
        let order = self
            .context
            .current_order
            .as_ref()
            .ok_or(DriverError::NoOrderSelected)?;
        let price = validate_bid(price)?;

        let offer = Offer {
            id: Uuid::new_v4(),
            order_id: order.id,
            passenger_id: order.passenger_id.clone(),
            driver_id: Some(self.profile.driver_id.clone()),
            price,
            status: OfferStatus::Waiting,
            created_at: Utc::now(),
        };

        self.client.create_offer(&offer).await?;
        self.context.open_offer = Some(offer.id);
        self.machine.send(&DriverEvent::SubmitPrice);

        Ok(offer)
    }

    /// Withdraws the open offer and returns to the order details.
    pub async fn withdraw_offer(&mut self) -> Result<(), DriverError> {
        if let Some(id) = self.context.open_offer {
            self.client.withdraw_offer(id).await?;
            self.context.open_offer = None;
        }
        self.machine.send(&DriverEvent::BackToOrder);
        Ok(())
    }

    /// The passenger took the offer; start driving to the pickup.
    pub fn offer_accepted(&mut self) -> bool {
        if self.machine.send(&DriverEvent::OfferAccepted) {
            self.context.open_offer = None;
            true
        } else {
            false
        }
    }

    /// Takes the order at its asking price: assigns this driver remotely,
    /// then starts navigating to the pickup.
    pub async fn accept_order(&mut self) -> Result<TripOrder, DriverError> {
        let order = self
            .context
            .current_order
            .as_ref()
            .ok_or(DriverError::NoOrderSelected)?;
        if !order.status.can_transition_to(OrderStatus::DriverAssigned) {
            return Err(DriverError::OrderNotOpen(order.status));
        }

        let updated = self
            .client
            .update_order(
                order.id,
                &OrderPatch {
                    status: Some(OrderStatus::DriverAssigned),
                    driver_id: Some(self.profile.driver_id.clone()),
                    ..OrderPatch::default()
                },
            )
            .await?;

        self.context.current_order = Some(updated.clone());
        self.machine.send(&DriverEvent::AcceptOrder);
        Ok(updated)
    }

    pub fn arrive_at_pickup(&mut self) -> bool {
        self.machine.send(&DriverEvent::ArriveAtPickup)
    }

    /// The passenger is in the car; the trip is running.
    pub async fn start_trip(&mut self) -> Result<(), DriverError> {
        let order = self
            .context
            .current_order
            .as_ref()
            .ok_or(DriverError::NoOrderSelected)?;

        let updated = self
            .client
            .update_order(
                order.id,
                &OrderPatch {
                    status: Some(OrderStatus::InProgress),
                    ..OrderPatch::default()
                },
            )
            .await?;

        self.context.current_order = Some(updated);
        self.machine.send(&DriverEvent::PassengerEntered);
        Ok(())
    }

    /// Finishes the trip: completes the order remotely and books the fare
    /// into the earnings counter.
    pub async fn complete_trip(&mut self) -> Result<(), DriverError> {
        let order = self
            .context
            .current_order
            .as_ref()
            .ok_or(DriverError::NoOrderSelected)?;

        let updated = self
            .client
            .update_order(
                order.id,
                &OrderPatch {
                    status: Some(OrderStatus::Completed),
                    ..OrderPatch::default()
                },
            )
            .await?;

        if self.machine.send(&DriverEvent::CompleteTrip) {
            self.context.earnings += updated.price;
            self.context.current_order = None;
        }
        Ok(())
    }

    /// Steps away from the current trip back to the order list.
    pub fn cancel(&mut self) -> bool {
        if self.machine.send(&DriverEvent::CancelOrder) {
            self.context.current_order = None;
            true
        } else {
            false
        }
    }
}
