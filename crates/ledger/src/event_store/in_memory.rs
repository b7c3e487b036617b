use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use elevatorid_core::{AggregateId, ExpectedVersion, TenantId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// One part's history plus the aggregate type it was opened with.
///
/// Sequence numbers are positions in `events` (1-based), so streams are
/// gapless and ordered by construction — `load_stream` never has to repair
/// or re-validate them.
#[derive(Debug)]
struct Stream {
    aggregate_type: String,
    events: Vec<StoredEvent>,
}

impl Stream {
    fn version(&self) -> u64 {
        self.events.len() as u64
    }
}

/// In-memory append-only event store.
///
/// Streams are keyed tenant-first, so tenant isolation is structural: a
/// lookup can only ever see its own tenant's map. Intended for tests/dev;
/// not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    tenants: RwLock<HashMap<TenantId, HashMap<AggregateId, Stream>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The batch must target exactly one stream with one aggregate type.
fn check_batch_coherence(events: &[UncommittedEvent]) -> Result<(), EventStoreError> {
    let first = &events[0];
    for (idx, e) in events.iter().enumerate().skip(1) {
        if e.tenant_id != first.tenant_id {
            return Err(EventStoreError::TenantIsolation(format!(
                "batch contains multiple tenant_ids (index {idx})"
            )));
        }
        if e.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "batch contains multiple aggregate_ids (index {idx})"
            )));
        }
        if e.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::AggregateTypeMismatch(format!(
                "batch contains multiple aggregate_types (index {idx})"
            )));
        }
    }
    Ok(())
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }
        check_batch_coherence(&events)?;

        let tenant_id = events[0].tenant_id;
        let aggregate_id = events[0].aggregate_id;
        let aggregate_type = events[0].aggregate_type.clone();

        let mut tenants = self
            .tenants
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let stream = tenants
            .entry(tenant_id)
            .or_default()
            .entry(aggregate_id)
            .or_insert_with(|| Stream {
                aggregate_type: aggregate_type.clone(),
                events: Vec::new(),
            });

        let current = stream.version();
        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // A stream keeps the aggregate type it was opened with.
        if stream.aggregate_type != aggregate_type {
            return Err(EventStoreError::AggregateTypeMismatch(format!(
                "stream aggregate_type is '{}', attempted append with '{}'",
                stream.aggregate_type, aggregate_type
            )));
        }

        // Materialize the whole batch before touching the stream, so the
        // append is all-or-nothing.
        let committed: Vec<StoredEvent> = events
            .into_iter()
            .zip(current + 1..)
            .map(|(e, sequence_number)| StoredEvent {
                event_id: e.event_id,
                tenant_id: e.tenant_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            })
            .collect();
        stream.events.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(
        &self,
        tenant_id: TenantId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let tenants = self.tenants.read().unwrap_or_else(PoisonError::into_inner);

        Ok(tenants
            .get(&tenant_id)
            .and_then(|streams| streams.get(&aggregate_id))
            .map(|stream| stream.events.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn uncommitted(
        tenant_id: TenantId,
        aggregate_id: AggregateId,
        aggregate_type: &str,
    ) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "parts.part.registered".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({}),
        }
    }

    #[test]
    fn append_assigns_gapless_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        let first = store
            .append(
                vec![
                    uncommitted(tenant_id, aggregate_id, "part"),
                    uncommitted(tenant_id, aggregate_id, "part"),
                ],
                ExpectedVersion::Exact(0),
            )
            .unwrap();
        let second = store
            .append(
                vec![uncommitted(tenant_id, aggregate_id, "part")],
                ExpectedVersion::Exact(2),
            )
            .unwrap();

        let seqs: Vec<u64> = first
            .iter()
            .chain(&second)
            .map(|e| e.sequence_number)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);

        let loaded = store.load_stream(tenant_id, aggregate_id).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.windows(2).all(|w| w[1].sequence_number == w[0].sequence_number + 1));
    }

    #[test]
    fn stale_expected_version_is_a_concurrency_error() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        store
            .append(
                vec![uncommitted(tenant_id, aggregate_id, "part")],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let err = store
            .append(
                vec![uncommitted(tenant_id, aggregate_id, "part")],
                ExpectedVersion::Exact(0),
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
    }

    #[test]
    fn same_aggregate_id_under_two_tenants_is_two_streams() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        store
            .append(
                vec![uncommitted(tenant_a, aggregate_id, "part")],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        assert!(store.load_stream(tenant_b, aggregate_id).unwrap().is_empty());
        // The other tenant's stream still opens at version 0.
        store
            .append(
                vec![uncommitted(tenant_b, aggregate_id, "part")],
                ExpectedVersion::Exact(0),
            )
            .unwrap();
    }

    #[test]
    fn stream_keeps_its_aggregate_type() {
        let store = InMemoryEventStore::new();
        let tenant_id = TenantId::new();
        let aggregate_id = AggregateId::new();

        store
            .append(
                vec![uncommitted(tenant_id, aggregate_id, "part")],
                ExpectedVersion::Any,
            )
            .unwrap();

        let err = store
            .append(
                vec![uncommitted(tenant_id, aggregate_id, "elevator")],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn mixed_tenant_batch_is_refused() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let err = store
            .append(
                vec![
                    uncommitted(TenantId::new(), aggregate_id, "part"),
                    uncommitted(TenantId::new(), aggregate_id, "part"),
                ],
                ExpectedVersion::Exact(0),
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::TenantIsolation(_)));
    }
}
