use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ride_hub::api::rest::router;
use ride_hub::flow::booking::{BookingSession, BookingState};
use ride_hub::flow::driver::{DriverProfile, DriverSession, DriverState};
use ride_hub::models::offer::{Offer, OfferStatus};
use ride_hub::models::order::{GeoPoint, OrderPatch, OrderStatus, TripOrder};
use ride_hub::state::AppState;
use ride_hub::sync::{SyncClient, spawn_offer_poller, spawn_order_poller};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

const POLL: Duration = Duration::from_millis(50);
const WAIT: Duration = Duration::from_secs(2);

async fn spawn_store() -> (String, JoinHandle<()>) {
    let state = Arc::new(AppState::new(1024));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), handle)
}

fn pickup() -> GeoPoint {
    GeoPoint {
        lat: 55.7558,
        lng: 37.6173,
    }
}

fn dropoff() -> GeoPoint {
    GeoPoint {
        lat: 55.7602,
        lng: 37.6185,
    }
}

fn order_fixture(status: OrderStatus) -> TripOrder {
    TripOrder {
        id: Uuid::new_v4(),
        passenger_id: "p-1".to_string(),
        pickup: pickup(),
        pickup_address: "Red Square".to_string(),
        destination: dropoff(),
        destination_address: "Bolshoi Theatre".to_string(),
        distance_m: 550.0,
        duration_s: 49.5,
        price: 180,
        status,
        driver_id: None,
        created_at: Utc::now(),
    }
}

fn profile() -> DriverProfile {
    DriverProfile {
        driver_id: "driver-1".to_string(),
        rating: 4.8,
        platform: "android".to_string(),
        vehicle_make: "Lada".to_string(),
        vehicle_model: "Vesta".to_string(),
        vehicle_year: 2021,
    }
}

#[tokio::test]
async fn create_then_list_roundtrip() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let order = order_fixture(OrderStatus::Searching);
    client.create_order(&order).await.unwrap();

    let listed = client.list_orders().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, order.id);

    let fetched = client.fetch_order(order.id).await.unwrap();
    assert_eq!(fetched.price, 180);
    assert_eq!(fetched.status, OrderStatus::Searching);
}

#[tokio::test]
async fn update_is_read_modify_write() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let order = order_fixture(OrderStatus::Searching);
    client.create_order(&order).await.unwrap();

    let updated = client
        .update_order(
            order.id,
            &OrderPatch {
                status: Some(OrderStatus::DriverAssigned),
                driver_id: Some("driver-1".to_string()),
                ..OrderPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, OrderStatus::DriverAssigned);
    assert_eq!(updated.driver_id.as_deref(), Some("driver-1"));

    let fetched = client.fetch_order(order.id).await.unwrap();
    assert_eq!(fetched.status, OrderStatus::DriverAssigned);
    // Untouched fields survive the round trip.
    assert_eq!(fetched.price, 180);
    assert_eq!(fetched.pickup_address, "Red Square");
}

#[tokio::test]
async fn cancellation_keeps_the_record() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let order = order_fixture(OrderStatus::Searching);
    client.create_order(&order).await.unwrap();
    client.cancel_order(order.id).await.unwrap();

    let fetched = client.fetch_order(order.id).await.unwrap();
    assert_eq!(fetched.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn poller_sees_new_order_within_one_interval() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let (mut feed, _poller) =
        spawn_order_poller(client.clone(), Some(OrderStatus::Searching), POLL);

    let order = order_fixture(OrderStatus::Searching);
    client.create_order(&order).await.unwrap();

    timeout(WAIT, async {
        while feed.snapshot().is_empty() {
            assert!(feed.changed().await);
        }
    })
    .await
    .expect("order never showed up in the feed");

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, order.id);
}

#[tokio::test]
async fn poller_retains_only_searching_orders() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let open = order_fixture(OrderStatus::Searching);
    let done = order_fixture(OrderStatus::Completed);
    client.create_order(&open).await.unwrap();
    client.create_order(&done).await.unwrap();

    let (mut feed, _poller) =
        spawn_order_poller(client.clone(), Some(OrderStatus::Searching), POLL);

    timeout(WAIT, async {
        while feed.snapshot().is_empty() {
            assert!(feed.changed().await);
        }
    })
    .await
    .expect("feed never filled");

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, open.id);
}

#[tokio::test]
async fn poller_keeps_stale_snapshot_when_store_goes_away() {
    let (base, server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let order = order_fixture(OrderStatus::Searching);
    client.create_order(&order).await.unwrap();

    let (mut feed, _poller) =
        spawn_order_poller(client.clone(), Some(OrderStatus::Searching), POLL);

    timeout(WAIT, async {
        while feed.snapshot().is_empty() {
            assert!(feed.changed().await);
        }
    })
    .await
    .expect("feed never filled");

    server.abort();
    tokio::time::sleep(POLL * 4).await;

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, order.id);
}

#[tokio::test]
async fn poller_stops_when_feed_is_dropped_while_store_is_down() {
    // Port 1 refuses connections, so every poll fails.
    let client = SyncClient::new("http://127.0.0.1:1");
    let (feed, poller) = spawn_order_poller(client, None, POLL);
    drop(feed);

    timeout(WAIT, poller)
        .await
        .expect("poller kept running after the feed was dropped")
        .unwrap();
}

#[tokio::test]
async fn offer_poller_sees_offers() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let offer = Offer {
        id: Uuid::new_v4(),
        order_id: Uuid::new_v4(),
        passenger_id: "p-1".to_string(),
        driver_id: Some("driver-1".to_string()),
        price: 220,
        status: OfferStatus::Waiting,
        created_at: Utc::now(),
    };
    client.create_offer(&offer).await.unwrap();

    let (mut feed, _poller) = spawn_offer_poller(client.clone(), POLL);

    timeout(WAIT, async {
        while feed.snapshot().is_empty() {
            assert!(feed.changed().await);
        }
    })
    .await
    .expect("offer never showed up in the feed");

    assert_eq!(feed.snapshot()[0].id, offer.id);
}

#[tokio::test]
async fn full_negotiation_round_trip() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    // Passenger books a trip via the destination-set shortcut.
    let mut passenger = BookingSession::new(client.clone(), "p-1");
    passenger.set_pickup(pickup(), "Red Square");
    passenger.set_destination(dropoff(), "Bolshoi Theatre");
    passenger.set_price(180).unwrap();
    let order = passenger.confirm_order().await.unwrap();
    assert_eq!(passenger.state(), BookingState::SearchingDriver);

    // Driver finds the order through a fresh listing.
    let mut driver = DriverSession::new(client.clone(), profile());
    driver.refresh_orders(client.list_orders().await.unwrap());
    assert_eq!(driver.context().orders.len(), 1);

    driver.show_orders();
    let seen = driver.context().orders[0].clone();
    assert!(driver.select_order(seen));

    // Counter-price first, then think better of it.
    let offer = driver.submit_offer(220).await.unwrap();
    assert_eq!(driver.state(), DriverState::WaitingResponse);
    assert_eq!(client.list_offers().await.unwrap().len(), 1);

    driver.withdraw_offer().await.unwrap();
    assert_eq!(driver.state(), DriverState::OrderDetails);
    assert!(client.list_offers().await.unwrap().is_empty());
    assert_ne!(offer.price, order.price);

    // Take the order at its asking price instead.
    let accepted = driver.accept_order().await.unwrap();
    assert_eq!(driver.state(), DriverState::NavigatingToPassenger);
    assert_eq!(accepted.status, OrderStatus::DriverAssigned);
    assert_eq!(accepted.driver_id.as_deref(), Some("driver-1"));

    assert!(passenger.driver_assigned());
    assert!(driver.arrive_at_pickup());

    driver.start_trip().await.unwrap();
    assert_eq!(driver.state(), DriverState::TripInProgress);
    assert_eq!(
        client.fetch_order(order.id).await.unwrap().status,
        OrderStatus::InProgress
    );
    assert!(passenger.driver_arrived());

    driver.complete_trip().await.unwrap();
    assert_eq!(driver.state(), DriverState::TripCompleted);
    assert_eq!(driver.context().earnings, 180);
    assert!(driver.context().current_order.is_none());
    assert_eq!(
        client.fetch_order(order.id).await.unwrap().status,
        OrderStatus::Completed
    );

    assert!(driver.back_to_idle());
    assert!(passenger.ride_completed());
    passenger.reset();
    assert_eq!(passenger.state(), BookingState::Idle);
}

#[tokio::test]
async fn counter_offer_accepted_at_the_offered_price() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let mut passenger = BookingSession::new(client.clone(), "p-1");
    passenger.set_pickup(pickup(), "Red Square");
    passenger.set_destination(dropoff(), "Bolshoi Theatre");
    passenger.set_price(180).unwrap();
    let order = passenger.confirm_order().await.unwrap();

    let mut driver = DriverSession::new(client.clone(), profile());
    driver.refresh_orders(client.list_orders().await.unwrap());
    driver.show_orders();
    let seen = driver.context().orders[0].clone();
    driver.select_order(seen);
    let offer = driver.submit_offer(230).await.unwrap();

    // Passenger picks the counter-offer off the next poll.
    let offers = client.list_offers().await.unwrap();
    assert_eq!(offers.len(), 1);
    passenger.accept_offer(&offers[0]).await.unwrap();
    assert_eq!(passenger.state(), BookingState::DriverAssigned);

    let assigned = client.fetch_order(order.id).await.unwrap();
    assert_eq!(assigned.status, OrderStatus::DriverAssigned);
    assert_eq!(assigned.driver_id.as_deref(), Some("driver-1"));
    assert_eq!(assigned.price, 230);

    // Driver observes the acceptance and heads out.
    let accepted = client.fetch_offer(offer.id).await.unwrap();
    assert_eq!(accepted.status, OfferStatus::Accepted);
    assert!(driver.offer_accepted());
    assert_eq!(driver.state(), DriverState::NavigatingToPassenger);

    // Driver's stale view of the order is refreshed before the trip runs.
    driver.arrive_at_pickup();
    driver.start_trip().await.unwrap();
    driver.complete_trip().await.unwrap();
    assert_eq!(driver.context().earnings, 230);
}

#[tokio::test]
async fn passenger_cancel_while_searching_cancels_remote_order() {
    let (base, _server) = spawn_store().await;
    let client = SyncClient::new(&base);

    let mut passenger = BookingSession::new(client.clone(), "p-1");
    passenger.set_pickup(pickup(), "Red Square");
    passenger.set_destination(dropoff(), "Bolshoi Theatre");
    passenger.set_price(180).unwrap();
    let order = passenger.confirm_order().await.unwrap();

    passenger.cancel().await.unwrap();
    assert_eq!(passenger.state(), BookingState::Idle);

    let fetched = client.fetch_order(order.id).await.unwrap();
    assert_eq!(fetched.status, OrderStatus::Cancelled);
}
