use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

#[derive(Default)]
struct Log {
    /// Per-aggregate streams; the stream length is the aggregate's version.
    streams: HashMap<AggregateId, Vec<EventEnvelope>>,
    /// Commit order across all streams, as (aggregate, index in stream).
    commits: Vec<(AggregateId, usize)>,
}

impl Log {
    fn version_of(&self, aggregate_id: AggregateId) -> Version {
        self.streams
            .get(&aggregate_id)
            .map(|stream| Version::new(stream.len() as i64))
            .unwrap_or_default()
    }

    fn in_commit_order(&self) -> impl Iterator<Item = &EventEnvelope> {
        self.commits
            .iter()
            .filter_map(|(id, index)| self.streams.get(id).and_then(|s| s.get(*index)))
    }
}

/// In-memory event store.
///
/// The version check and the write happen under one write lock, so an
/// append is a compare-and-set on the aggregate's stream.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<Log>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.commits.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id;
        let first_new_version = events[0].version;

        let mut log = self.log.write().await;
        let current_version = log.version_of(aggregate_id);

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            metrics::counter!("event_store_conflicts_total").increment(1);
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        if first_new_version != current_version.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let stream = log.streams.entry(aggregate_id).or_default();
        let start = stream.len();
        let count = events.len();
        stream.extend(events);
        let new_version = Version::new(stream.len() as i64);
        log.commits
            .extend((start..start + count).map(|index| (aggregate_id, index)));

        tracing::trace!(%aggregate_id, %new_version, "events appended");
        Ok(new_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        Ok(log.streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        Ok(log
            .in_commit_order()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events: Vec<EventEnvelope> = self.log.read().await.in_commit_order().cloned().collect();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let log = self.log.read().await;
        Ok(log
            .streams
            .get(&aggregate_id)
            .map(|stream| Version::new(stream.len() as i64)))
    }
}
