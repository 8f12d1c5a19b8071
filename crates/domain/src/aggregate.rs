//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name used by the event store.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates in an event-sourced system.
///
/// Aggregates:
/// - Are rebuilt by replaying events
/// - Decide on new events from commands without mutating themselves
/// - Apply events to update state (pure, deterministic, infallible)
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors command methods can return.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identifier, or None before its first event.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the current version (0 for a new aggregate).
    fn version(&self) -> Version;

    /// Sets the aggregate version after loading or committing.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must not fail: events represent facts that have already happened.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Opened,
        Counted { by: i32 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened => "TestOpened",
                TestEvent::Counted { .. } => "TestCounted",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        id: Option<AggregateId>,
        total: i32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("test error")]
    struct TestError;

    impl Aggregate for Counter {
        type Event = TestEvent;
        type Error = TestError;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TestEvent::Opened => self.id = Some(AggregateId::new()),
                TestEvent::Counted { by } => self.total += by,
            }
        }
    }

    #[test]
    fn apply_events_folds_in_order() {
        let mut counter = Counter::default();
        counter.apply_events([
            TestEvent::Opened,
            TestEvent::Counted { by: 2 },
            TestEvent::Counted { by: 40 },
        ]);

        assert!(counter.id().is_some());
        assert_eq!(counter.total, 42);
    }

    #[test]
    fn event_type_names() {
        assert_eq!(TestEvent::Opened.event_type(), "TestOpened");
        assert_eq!(TestEvent::Counted { by: 1 }.event_type(), "TestCounted");
    }
}
