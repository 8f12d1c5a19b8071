//! Notification dispatch for committed offer events.
//!
//! The service publishes onto a queue after the event store accepted a
//! transition; a worker drains the queue and hands each notification to a
//! dispatcher. Delivery is best effort: failures are logged and counted and
//! never reach the offer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::AggregateId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

use crate::aggregate::{Aggregate, DomainEvent};

use super::{Offer, OfferEvent, Product};

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Customer,
    Admin,
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::Customer => write!(f, "customer"),
            Audience::Admin => write!(f, "admin"),
        }
    }
}

/// Errors a dispatcher can report.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Delivery to {audience} failed: {reason}")]
    Delivery { audience: Audience, reason: String },
}

/// A committed event together with the offer and product it concerns.
#[derive(Debug, Clone)]
pub struct OfferNotification {
    pub offer_id: AggregateId,
    pub event: OfferEvent,

    /// Offer state after the event was applied.
    pub offer: Offer,

    pub product: Product,
}

impl OfferNotification {
    /// Builds a notification for an event committed on `offer`.
    ///
    /// Returns None if the offer was never created.
    pub fn from_committed(offer: &Offer, event: OfferEvent) -> Option<Self> {
        Some(Self {
            offer_id: offer.id()?,
            product: offer.product()?.clone(),
            offer: offer.clone(),
            event,
        })
    }

    /// Recipients of this notification, in delivery order.
    pub fn audiences(&self) -> &'static [Audience] {
        match self.event {
            OfferEvent::OfferAutoAccepted(_) => &[Audience::Customer, Audience::Admin],
            OfferEvent::OfferQueued(_) => &[Audience::Admin, Audience::Customer],
            OfferEvent::OfferAcceptedManually(_) | OfferEvent::OfferRejected(_) => {
                &[Audience::Customer]
            }
            OfferEvent::CouponRedeemed(_) => &[Audience::Admin],
        }
    }
}

/// Delivers notifications to one audience at a time.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        audience: Audience,
        notification: &OfferNotification,
    ) -> Result<(), NotificationError>;
}

/// Creates a connected queue and worker.
pub fn notification_channel() -> (NotificationQueue, NotificationWorker) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (NotificationQueue { sender }, NotificationWorker { receiver })
}

/// Sending half, held by the service.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<OfferNotification>,
}

impl NotificationQueue {
    /// Enqueues a notification. Never fails; if the worker is gone the
    /// notification is dropped and logged.
    pub fn publish(&self, notification: OfferNotification) {
        if let Err(mpsc::error::SendError(dropped)) = self.sender.send(notification) {
            tracing::warn!(
                offer_id = %dropped.offer_id,
                event_type = dropped.event.event_type(),
                "notification queue closed, dropping notification"
            );
            metrics::counter!("notifications_dispatched_total", "result" => "dropped")
                .increment(1);
        }
    }
}

/// Receiving half; drives a dispatcher.
#[derive(Debug)]
pub struct NotificationWorker {
    receiver: mpsc::UnboundedReceiver<OfferNotification>,
}

impl NotificationWorker {
    /// Processes notifications until every queue handle is dropped.
    ///
    /// Returns the number of notifications processed.
    pub async fn run<D: NotificationDispatcher>(mut self, dispatcher: D) -> usize {
        let mut processed = 0;
        while let Some(notification) = self.receiver.recv().await {
            deliver(&dispatcher, &notification).await;
            processed += 1;
        }
        tracing::debug!(processed, "notification worker stopped");
        processed
    }

    /// Processes whatever is queued right now, without waiting for more.
    pub async fn drain<D: NotificationDispatcher>(&mut self, dispatcher: &D) -> usize {
        let mut processed = 0;
        while let Ok(notification) = self.receiver.try_recv() {
            deliver(dispatcher, &notification).await;
            processed += 1;
        }
        processed
    }
}

async fn deliver<D: NotificationDispatcher>(dispatcher: &D, notification: &OfferNotification) {
    for &audience in notification.audiences() {
        match dispatcher.dispatch(audience, notification).await {
            Ok(()) => {
                metrics::counter!("notifications_dispatched_total", "result" => "sent")
                    .increment(1);
            }
            Err(error) => {
                tracing::warn!(
                    offer_id = %notification.offer_id,
                    event_type = notification.event.event_type(),
                    %audience,
                    %error,
                    "notification dispatch failed"
                );
                metrics::counter!("notifications_dispatched_total", "result" => "failed")
                    .increment(1);
            }
        }
    }
}

/// Dispatcher that writes one log line per delivery instead of sending mail.
#[derive(Debug, Clone)]
pub struct LoggingDispatcher {
    admin_email: String,
}

impl LoggingDispatcher {
    pub fn new(admin_email: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn dispatch(
        &self,
        audience: Audience,
        notification: &OfferNotification,
    ) -> Result<(), NotificationError> {
        let offer = &notification.offer;
        let recipient = match audience {
            Audience::Admin => self.admin_email.as_str(),
            Audience::Customer => offer.customer().map(|c| c.email()).unwrap_or_default(),
        };

        tracing::info!(
            offer_id = %notification.offer_id,
            event_type = notification.event.event_type(),
            %audience,
            recipient,
            product = %notification.product.title,
            status = %offer.status(),
            discount = ?offer.discount_percentage().map(|d| d.round_dp(2)),
            coupon_code = offer.coupon_code().map(|c| c.as_str()),
            "notification sent"
        );
        Ok(())
    }
}

/// Dispatcher that records deliveries in memory. Can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDispatcher {
    delivered: Arc<Mutex<Vec<(Audience, OfferNotification)>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following dispatch fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the successful deliveries so far.
    pub async fn delivered(&self) -> Vec<(Audience, OfferNotification)> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationDispatcher for InMemoryDispatcher {
    async fn dispatch(
        &self,
        audience: Audience,
        notification: &OfferNotification,
    ) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Delivery {
                audience,
                reason: "dispatcher set to fail".to_string(),
            });
        }
        self.delivered
            .lock()
            .await
            .push((audience, notification.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::AdminId;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::offer::{CouponCode, CreateOffer, Customer, Money};

    fn queued_offer() -> (Offer, OfferEvent) {
        let product = Product::new("p-100", "Roadster", Money::from_cents(10000), None);
        let request = CreateOffer::new(
            "p-100",
            Money::from_cents(7000),
            Customer::guest("guest@example.com", None),
            "600000000",
        );
        let mut offer = Offer::default();
        let mut events = offer.create(&request, &product, dec!(20), None).unwrap();
        let event = events.remove(0);
        offer.apply(event.clone());
        (offer, event)
    }

    #[test]
    fn audiences_follow_event() {
        let (mut offer, event) = queued_offer();
        let notification = OfferNotification::from_committed(&offer, event).unwrap();
        assert_eq!(
            notification.audiences(),
            &[Audience::Admin, Audience::Customer]
        );

        let event = OfferEvent::offer_rejected(AdminId::new(), None);
        offer.apply(event.clone());
        let notification = OfferNotification::from_committed(&offer, event).unwrap();
        assert_eq!(notification.audiences(), &[Audience::Customer]);

        let event = OfferEvent::coupon_redeemed(CouponCode::new("C"));
        let notification = OfferNotification::from_committed(&offer, event).unwrap();
        assert_eq!(notification.audiences(), &[Audience::Admin]);
    }

    #[test]
    fn uncreated_offer_has_no_notification() {
        let event = OfferEvent::offer_rejected(AdminId::new(), None);
        assert!(OfferNotification::from_committed(&Offer::default(), event).is_none());
    }

    #[tokio::test]
    async fn worker_delivers_to_each_audience() {
        let (queue, mut worker) = notification_channel();
        let dispatcher = InMemoryDispatcher::new();
        let (offer, event) = queued_offer();

        queue.publish(OfferNotification::from_committed(&offer, event).unwrap());

        assert_eq!(worker.drain(&dispatcher).await, 1);
        let delivered = dispatcher.delivered().await;
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].0, Audience::Admin);
        assert_eq!(delivered[1].0, Audience::Customer);
    }

    #[tokio::test]
    async fn failed_dispatch_is_swallowed() {
        let (queue, mut worker) = notification_channel();
        let dispatcher = InMemoryDispatcher::new();
        dispatcher.set_failing(true);
        let (offer, event) = queued_offer();

        queue.publish(OfferNotification::from_committed(&offer, event.clone()).unwrap());
        assert_eq!(worker.drain(&dispatcher).await, 1);
        assert!(dispatcher.delivered().await.is_empty());

        dispatcher.set_failing(false);
        queue.publish(OfferNotification::from_committed(&offer, event).unwrap());
        worker.drain(&dispatcher).await;
        assert_eq!(dispatcher.delivered().await.len(), 2);
    }

    #[tokio::test]
    async fn run_stops_when_queue_dropped() {
        let (queue, worker) = notification_channel();
        let (offer, event) = queued_offer();
        queue.publish(OfferNotification::from_committed(&offer, event).unwrap());
        drop(queue);

        let processed = worker.run(LoggingDispatcher::new("admin@example.com")).await;
        assert_eq!(processed, 1);
    }

    #[test]
    fn publish_after_worker_dropped_does_not_panic() {
        let (queue, worker) = notification_channel();
        drop(worker);
        let (offer, event) = queued_offer();
        queue.publish(OfferNotification::from_committed(&offer, event).unwrap());
    }
}
