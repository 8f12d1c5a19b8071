//! Offer aggregate, coupon lifecycle and related types.

mod aggregate;
mod catalog;
mod commands;
pub mod coupon;
mod events;
pub mod margin;
mod notification;
mod registry;
mod service;
mod state;
mod stats;
mod value_objects;

pub use aggregate::{CouponView, Offer};
pub use catalog::{InMemoryProductCatalog, Product, ProductCatalog};
pub use commands::*;
pub use coupon::{CouponCode, CouponContext};
pub use events::{
    CouponRedeemedData, OfferAcceptedData, OfferEvent, OfferRejectedData, OfferSubmittedData,
    Review,
};
pub use margin::MarginVerdict;
pub use notification::{
    Audience, InMemoryDispatcher, LoggingDispatcher, NotificationDispatcher, NotificationError,
    NotificationQueue, NotificationWorker, OfferNotification, notification_channel,
};
pub use registry::{CouponRegistry, InMemoryCouponRegistry};
pub use service::{DEFAULT_COMMAND_ATTEMPTS, OfferService};
pub use state::{OfferAction, OfferStatus};
pub use stats::{OfferStats, StatusStats};
pub use value_objects::{Customer, Money};

use thiserror::Error;

/// Errors that can occur during offer operations.
#[derive(Debug, Error)]
pub enum OfferError {
    /// Prices out of range for an offer.
    #[error(
        "Invalid price: offered {offered_price} against {product_price} (must be positive and not above the product price)"
    )]
    InvalidPrice {
        product_price: Money,
        offered_price: Money,
    },

    /// A required contact field is empty.
    #[error("Missing contact info: {field} is required")]
    MissingContactInfo { field: &'static str },

    /// Comments too long.
    #[error("Invalid comments: {length} characters (at most {max})", max = MAX_COMMENT_LEN)]
    InvalidComments { length: usize },

    /// Product not in the catalog.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Offer is not in the expected state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    IllegalTransition {
        current_state: OfferStatus,
        action: &'static str,
    },

    #[error("Coupon not found: {code}")]
    CouponNotFound { code: String },

    #[error("Coupon already used: {code}")]
    CouponAlreadyUsed { code: String },

    /// Coupon exists but its offer is not accepted.
    #[error("Coupon {code} is not redeemable: offer is {status}")]
    CouponInvalidState { code: String, status: OfferStatus },

    /// Code already held by another offer.
    #[error("Coupon code collision: {code}")]
    CouponCollision { code: String },

    /// A coupon is issued exactly when the offer is within the margin.
    #[error("Coupon code does not match verdict (within margin: {within_margin})")]
    CouponCodeMismatch { within_margin: bool },

    /// Offer is already created.
    #[error("Offer already created")]
    AlreadyCreated,
}
