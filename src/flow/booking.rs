use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::flow::Machine;
use crate::models::offer::{Offer, OfferPatch, OfferStatus};
use crate::models::order::{GeoPoint, OrderPatch, OrderStatus, TripOrder};
use crate::pricing::{PriceError, apply_quick_bid, validate_bid};
use crate::providers::route::{Route, straight_line};
use crate::sync::{SyncClient, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    Idle,
    DestinationSet,
    Ordering,
    Confirming,
    SearchingDriver,
    DriverAssigned,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingEvent {
    SetDestination,
    ClearDestination,
    StartOrder,
    ConfirmOrder,
    CancelOrder,
    DriverFound,
    DriverAssigned,
    DriverArrived,
    RideCompleted,
    Reset,
}

/// Passenger screen progression. `ConfirmOrder` has two shortcuts straight to
/// `SearchingDriver` so a passenger can confirm without opening the extended
/// order panel.
pub fn booking_table(state: BookingState, event: &BookingEvent) -> Option<BookingState> {
    use BookingEvent as E;
    use BookingState as S;

    match (state, event) {
        (S::Idle, E::SetDestination) => Some(S::DestinationSet),
        (S::Idle, E::ConfirmOrder) => Some(S::SearchingDriver),
        (S::DestinationSet, E::StartOrder) => Some(S::Ordering),
        (S::DestinationSet, E::ConfirmOrder) => Some(S::SearchingDriver),
        (S::DestinationSet, E::ClearDestination) => Some(S::Idle),
        (S::Ordering, E::ConfirmOrder) => Some(S::Confirming),
        (S::Ordering, E::CancelOrder) => Some(S::DestinationSet),
        (S::Confirming, E::DriverFound) => Some(S::SearchingDriver),
        (S::Confirming, E::CancelOrder) => Some(S::Ordering),
        (S::SearchingDriver, E::DriverAssigned) => Some(S::DriverAssigned),
        (S::SearchingDriver, E::CancelOrder) => Some(S::Idle),
        (S::DriverAssigned, E::DriverArrived) => Some(S::InProgress),
        (S::DriverAssigned, E::CancelOrder) => Some(S::Idle),
        (S::InProgress, E::RideCompleted) => Some(S::Completed),
        (S::Completed, E::Reset) => Some(S::Idle),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripType {
    Ride,
    Intercity,
    Courier,
}

/// Transient view-state for the active passenger screen session.
#[derive(Debug, Clone)]
pub struct BookingContext {
    pub pickup: Option<GeoPoint>,
    pub pickup_address: String,
    pub destination: Option<GeoPoint>,
    pub destination_address: String,
    pub price: i64,
    pub trip_type: TripType,
    pub route: Option<Route>,
}

impl Default for BookingContext {
    fn default() -> Self {
        Self {
            pickup: None,
            pickup_address: String::new(),
            destination: None,
            destination_address: String::new(),
            price: 0,
            trip_type: TripType::Ride,
            route: None,
        }
    }
}

impl BookingContext {
    pub fn price_label(&self) -> String {
        if self.price > 0 {
            format!("{} ₽", self.price)
        } else {
            String::new()
        }
    }
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("no pickup location")]
    NoPickup,

    #[error("no destination set")]
    NoDestination,

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Booking machine plus its context and side effects.
///
/// Side-effecting operations talk to the store first and commit the local
/// transition only once the write succeeded; a failed call leaves both the
/// machine and the context untouched.
pub struct BookingSession {
    machine: Machine<BookingState, BookingEvent>,
    context: BookingContext,
    client: SyncClient,
    passenger_id: String,
    active_order: Option<Uuid>,
}

impl BookingSession {
    pub fn new(client: SyncClient, passenger_id: impl Into<String>) -> Self {
        Self {
            machine: Machine::new(BookingState::Idle, booking_table),
            context: BookingContext::default(),
            client,
            passenger_id: passenger_id.into(),
            active_order: None,
        }
    }

    pub fn state(&self) -> BookingState {
        self.machine.state()
    }

    pub fn context(&self) -> &BookingContext {
        &self.context
    }

    pub fn active_order(&self) -> Option<Uuid> {
        self.active_order
    }

    pub fn set_pickup(&mut self, point: GeoPoint, address: impl Into<String>) {
        self.context.pickup = Some(point);
        self.context.pickup_address = address.into();
    }

    pub fn set_destination(&mut self, point: GeoPoint, address: impl Into<String>) {
        self.context.destination = Some(point);
        self.context.destination_address = address.into();
        self.machine.send(&BookingEvent::SetDestination);
    }

    pub fn clear_destination(&mut self) {
        if self.machine.send(&BookingEvent::ClearDestination) {
            self.context.destination = None;
            self.context.destination_address.clear();
            self.context.route = None;
        }
    }

    pub fn start_order(&mut self) -> bool {
        self.machine.send(&BookingEvent::StartOrder)
    }

    pub fn set_trip_type(&mut self, trip_type: TripType) {
        self.context.trip_type = trip_type;
    }

    pub fn set_route(&mut self, route: Route) {
        self.context.route = Some(route);
    }

    /// Price is validated against the floor before it lands in the context.
    pub fn set_price(&mut self, price: i64) -> Result<(), PriceError> {
        self.context.price = validate_bid(price)?;
        Ok(())
    }

    /// Adds one of the fixed quick-bid increments to the displayed price.
    /// The floor is enforced later, when the order is confirmed.
    pub fn bump_price(&mut self, increment: i64) {
        self.context.price = apply_quick_bid(self.context.price, increment);
    }

    /// Creates the order in the store, then advances the machine. The trip's
    /// distance and duration come from the computed route, or from a
    /// straight-line estimate when no route was calculated.
    pub async fn confirm_order(&mut self) -> Result<TripOrder, BookingError> {
        let pickup = self.context.pickup.ok_or(BookingError::NoPickup)?;
        let destination = self.context.destination.ok_or(BookingError::NoDestination)?;
        let price = validate_bid(self.context.price)?;

        let route = self
            .context
            .route
            .clone()
            .unwrap_or_else(|| straight_line(&pickup, &destination));

        let order = TripOrder {
            id: Uuid::new_v4(),
            passenger_id: self.passenger_id.clone(),
            pickup,
            pickup_address: self.context.pickup_address.clone(),
            destination,
            destination_address: self.context.destination_address.clone(),
            distance_m: route.distance_m,
            duration_s: route.duration_s,
            price,
            status: OrderStatus::Searching,
            driver_id: None,
            created_at: Utc::now(),
        };

        self.client.create_order(&order).await?;
        self.active_order = Some(order.id);
        self.machine.send(&BookingEvent::ConfirmOrder);

        Ok(order)
    }

    /// Cancelling while a driver is being searched also cancels the remote
    /// order; everywhere else it is a purely local step back.
    pub async fn cancel(&mut self) -> Result<(), SyncError> {
        if self.machine.state() == BookingState::SearchingDriver {
            if let Some(id) = self.active_order {
                self.client.cancel_order(id).await?;
                self.active_order = None;
            }
        }
        self.machine.send(&BookingEvent::CancelOrder);
        Ok(())
    }

    /// Takes a driver's counter-offer: marks it accepted, assigns the driver
    /// to the order at the offered price, and moves to `DriverAssigned`.
    pub async fn accept_offer(&mut self, offer: &Offer) -> Result<(), BookingError> {
        self.client
            .update_offer(
                offer.id,
                &OfferPatch {
                    status: Some(OfferStatus::Accepted),
                    ..OfferPatch::default()
                },
            )
            .await?;

        if let Some(order_id) = self.active_order {
            self.client
                .update_order(
                    order_id,
                    &OrderPatch {
                        status: Some(OrderStatus::DriverAssigned),
                        driver_id: offer.driver_id.clone(),
                        price: Some(offer.price),
                    },
                )
                .await?;
        }

        self.machine.send(&BookingEvent::DriverAssigned);
        Ok(())
    }

    pub async fn reject_offer(&mut self, offer_id: Uuid) -> Result<(), SyncError> {
        self.client
            .update_offer(
                offer_id,
                &OfferPatch {
                    status: Some(OfferStatus::Rejected),
                    ..OfferPatch::default()
                },
            )
            .await?;
        Ok(())
    }

    pub fn driver_found(&mut self) -> bool {
        self.machine.send(&BookingEvent::DriverFound)
    }

    pub fn driver_assigned(&mut self) -> bool {
        self.machine.send(&BookingEvent::DriverAssigned)
    }

    pub fn driver_arrived(&mut self) -> bool {
        self.machine.send(&BookingEvent::DriverArrived)
    }

    pub fn ride_completed(&mut self) -> bool {
        self.machine.send(&BookingEvent::RideCompleted)
    }

    pub fn reset(&mut self) {
        if self.machine.send(&BookingEvent::Reset) {
            self.context = BookingContext::default();
            self.active_order = None;
        }
    }
}
