//! Domain layer for the offer negotiation engine.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for event-sourced entities
//! - CommandHandler, which commits each transition as a versioned append
//! - The offer module: margin evaluation, coupon code generation, the
//!   coupon registry, the offer state machine and notification dispatch

pub mod aggregate;
pub mod command;
pub mod error;
pub mod offer;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use offer::{
    AcceptOffer, Audience, CouponCode, CouponContext, CouponRegistry, CouponView, CreateOffer,
    Customer, InMemoryCouponRegistry, InMemoryDispatcher, InMemoryProductCatalog,
    LoggingDispatcher, MarginVerdict, Money, NotificationDispatcher, NotificationError,
    NotificationQueue, NotificationWorker, Offer, OfferAction, OfferError, OfferEvent,
    OfferNotification, OfferService, OfferStats, OfferStatus, Product, ProductCatalog,
    RejectOffer, Review, StatusStats, notification_channel,
};
