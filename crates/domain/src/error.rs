//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::offer::OfferError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A business rule rejected the operation.
    #[error("Offer error: {0}")]
    Offer(#[from] OfferError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns the business rule error, if this is one.
    pub fn as_offer_error(&self) -> Option<&OfferError> {
        match self {
            DomainError::Offer(e) => Some(e),
            _ => None,
        }
    }
}
