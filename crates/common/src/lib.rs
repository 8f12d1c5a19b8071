//! Shared types for the offer negotiation engine.

mod types;

pub use types::{AdminId, AggregateId, CustomerId, ProductId};
