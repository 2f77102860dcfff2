use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;
use uuid::Uuid;

use crate::models::offer::{Offer, OfferPatch};
use crate::models::order::{OrderPatch, OrderStatus, TripOrder};

/// How often the pollers re-fetch the remote collections.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store replied {0}")]
    UnexpectedStatus(StatusCode),
}

/// Client for the order/offer store.
///
/// Mutations are read-modify-write against the remote record; there is no
/// concurrency token, so the last writer observed by the next poll wins.
/// Orders are cancelled by writing `cancelled` status, offers are withdrawn
/// by deleting the record.
#[derive(Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    base_url: String,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "http client builder failed, using defaults");
                reqwest::Client::new()
            });

        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn orders_url(&self) -> String {
        format!("{}/orders", self.base_url)
    }

    fn offers_url(&self) -> String {
        format!("{}/offers", self.base_url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        if !resp.status().is_success() {
            return Err(SyncError::UnexpectedStatus(resp.status()));
        }
        Ok(resp)
    }

    pub async fn list_orders(&self) -> Result<Vec<TripOrder>, SyncError> {
        let resp = Self::check(self.http.get(self.orders_url()).send().await?).await?;
        Ok(resp.json().await?)
    }

    pub async fn fetch_order(&self, id: Uuid) -> Result<TripOrder, SyncError> {
        let url = format!("{}/{id}", self.orders_url());
        let resp = Self::check(self.http.get(url).send().await?).await?;
        Ok(resp.json().await?)
    }

    pub async fn create_order(&self, order: &TripOrder) -> Result<(), SyncError> {
        let resp = self.http.post(self.orders_url()).json(order).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn update_order(&self, id: Uuid, patch: &OrderPatch) -> Result<TripOrder, SyncError> {
        let mut order = self.fetch_order(id).await?;
        order.apply(patch);

        let url = format!("{}/{id}", self.orders_url());
        let resp = self.http.put(url).json(&order).send().await?;
        Self::check(resp).await?;
        Ok(order)
    }

    pub async fn cancel_order(&self, id: Uuid) -> Result<TripOrder, SyncError> {
        self.update_order(
            id,
            &OrderPatch {
                status: Some(OrderStatus::Cancelled),
                ..OrderPatch::default()
            },
        )
        .await
    }

    pub async fn list_offers(&self) -> Result<Vec<Offer>, SyncError> {
        let resp = Self::check(self.http.get(self.offers_url()).send().await?).await?;
        Ok(resp.json().await?)
    }

    pub async fn fetch_offer(&self, id: Uuid) -> Result<Offer, SyncError> {
        let url = format!("{}/{id}", self.offers_url());
        let resp = Self::check(self.http.get(url).send().await?).await?;
        Ok(resp.json().await?)
    }

    pub async fn create_offer(&self, offer: &Offer) -> Result<(), SyncError> {
        let resp = self.http.post(self.offers_url()).json(offer).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn update_offer(&self, id: Uuid, patch: &OfferPatch) -> Result<Offer, SyncError> {
        let mut offer = self.fetch_offer(id).await?;
        offer.apply(patch);

        let url = format!("{}/{id}", self.offers_url());
        let resp = self.http.put(url).json(&offer).send().await?;
        Self::check(resp).await?;
        Ok(offer)
    }

    pub async fn withdraw_offer(&self, id: Uuid) -> Result<(), SyncError> {
        let url = format!("{}/{id}", self.offers_url());
        let resp = self.http.delete(url).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Latest order snapshot published by the poller.
pub struct OrderFeed {
    rx: watch::Receiver<Vec<TripOrder>>,
}

impl OrderFeed {
    pub fn snapshot(&self) -> Vec<TripOrder> {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot; returns `false` once the poller is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Latest offer snapshot published by the poller.
pub struct OfferFeed {
    rx: watch::Receiver<Vec<Offer>>,
}

impl OfferFeed {
    pub fn snapshot(&self) -> Vec<Offer> {
        self.rx.borrow().clone()
    }

    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Polls the order collection on a fixed interval and publishes snapshots.
///
/// A single task awaits each fetch before the next tick, so snapshots can
/// never arrive out of order. A failed poll keeps the previous snapshot and
/// logs a warning. The task stops once the returned feed is dropped.
pub fn spawn_order_poller(
    client: SyncClient,
    retain: Option<OrderStatus>,
    interval: Duration,
) -> (OrderFeed, JoinHandle<()>) {
    let (tx, rx) = watch::channel(Vec::new());

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match client.list_orders().await {
                Ok(mut orders) => {
                    if let Some(status) = retain {
                        orders.retain(|order| order.status == status);
                    }
                    if tx.send(orders).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    if tx.is_closed() {
                        break;
                    }
                    warn!(error = %err, "order poll failed, keeping last snapshot");
                }
            }
        }
    });

    (OrderFeed { rx }, handle)
}

/// Offer-side mirror of [`spawn_order_poller`].
pub fn spawn_offer_poller(
    client: SyncClient,
    interval: Duration,
) -> (OfferFeed, JoinHandle<()>) {
    let (tx, rx) = watch::channel(Vec::new());

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match client.list_offers().await {
                Ok(offers) => {
                    if tx.send(offers).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    if tx.is_closed() {
                        break;
                    }
                    warn!(error = %err, "offer poll failed, keeping last snapshot");
                }
            }
        }
    });

    (OfferFeed { rx }, handle)
}
