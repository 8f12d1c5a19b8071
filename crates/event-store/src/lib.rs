//! Event storage for the offer negotiation engine.
//!
//! Every offer transition is committed as an append guarded by the version
//! the caller last read, which makes the append a compare-and-set on the
//! offer's stream.

pub mod error;
pub mod event;
pub mod memory;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, Version};
pub use memory::InMemoryEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
