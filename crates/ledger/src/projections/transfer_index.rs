use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use elevatorid_core::{AggregateId, CompanyId, TenantId};
use elevatorid_events::EventEnvelope;
use elevatorid_parts::{
    ApprovalMethod, PartEvent, PartId, TransferDirection, TransferId, TransferStatus,
};

use crate::read_model::TenantStore;

/// Queryable transfer read model: one row per transfer, across its lifecycle.
///
/// This is the flat shape the REST layer lists and the approve/reject
/// operations use to resolve a transfer id to its part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub transfer_id: TransferId,
    pub part_id: PartId,
    pub initiator_company_id: CompanyId,
    pub direction: TransferDirection,
    pub status: TransferStatus,
    /// `None` when the seller is an out-of-registry company.
    pub seller_company_id: Option<CompanyId>,
    /// `None` when the buyer is an out-of-registry company.
    pub buyer_company_id: Option<CompanyId>,
    pub other_company_name: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reject_reason: Option<String>,
    pub approved_by: Option<ApprovalMethod>,
    pub approved_at: Option<DateTime<Utc>>,
    pub transfer_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Tenant+aggregate cursor to support at-least-once delivery (idempotent projection).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum TransferIndexError {
    #[error("failed to deserialize part event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Transfer index projection.
///
/// Consumes published envelopes (JSON payloads) and maintains a
/// tenant-isolated transfer read model. Non-transfer part events advance the
/// stream cursor without touching the index. Read models are disposable and
/// rebuildable from the event stream.
#[derive(Debug)]
pub struct TransferIndexProjection<S>
where
    S: TenantStore<TransferId, TransferRecord>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> TransferIndexProjection<S>
where
    S: TenantStore<TransferId, TransferRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Query one transfer by id.
    pub fn get(&self, tenant_id: TenantId, transfer_id: &TransferId) -> Option<TransferRecord> {
        self.store.get(tenant_id, transfer_id)
    }

    /// List all transfers for a tenant.
    pub fn list(&self, tenant_id: TenantId) -> Vec<TransferRecord> {
        self.store.list(tenant_id)
    }

    /// Transfer history of one part, sorted by creation time ascending.
    pub fn history_for_part(&self, tenant_id: TenantId, part_id: PartId) -> Vec<TransferRecord> {
        let mut records: Vec<_> = self
            .store
            .list(tenant_id)
            .into_iter()
            .filter(|r| r.part_id == part_id)
            .collect();
        records.sort_by_key(|r| (r.created_at, *r.transfer_id.as_uuid()));
        records
    }

    /// Apply a published envelope into the projection.
    ///
    /// - Enforces tenant isolation
    /// - Enforces monotonic sequence per (tenant, aggregate) stream
    /// - Idempotent for at-least-once delivery (replays <= cursor are ignored)
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), TransferIndexError> {
        let tenant_id = envelope.tenant_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        {
            let mut cursors = self.cursors.write().unwrap_or_else(PoisonError::into_inner);
            let key = CursorKey {
                tenant_id,
                aggregate_id,
            };
            let last = *cursors.get(&key).unwrap_or(&0);

            if seq == 0 {
                return Err(TransferIndexError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                // Duplicate or replay; safe to ignore.
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                return Err(TransferIndexError::NonMonotonicSequence { last, found: seq });
            }

            let event: PartEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| TransferIndexError::Deserialize(e.to_string()))?;

            if event_tenant(&event) != tenant_id {
                return Err(TransferIndexError::TenantIsolation(
                    "event tenant_id does not match envelope tenant_id".to_string(),
                ));
            }

            match event {
                PartEvent::TransferCreated(e) => {
                    self.store.upsert(
                        tenant_id,
                        e.transfer_id,
                        TransferRecord {
                            transfer_id: e.transfer_id,
                            part_id: e.part_id,
                            initiator_company_id: e.initiator_company_id,
                            direction: e.direction,
                            status: TransferStatus::Pending,
                            seller_company_id: e.seller.company_id(),
                            buyer_company_id: e.buyer.company_id(),
                            other_company_name: e
                                .seller
                                .external_name()
                                .or(e.buyer.external_name())
                                .map(str::to_string),
                            reason: e.reason,
                            notes: e.notes,
                            reject_reason: None,
                            approved_by: None,
                            approved_at: None,
                            transfer_date: e.transfer_date,
                            created_at: e.occurred_at,
                        },
                    );
                }
                PartEvent::TransferApproved(e) => {
                    if let Some(mut record) = self.store.get(tenant_id, &e.transfer_id) {
                        record.status = TransferStatus::Approved;
                        record.approved_by = Some(e.approval);
                        record.approved_at = Some(e.occurred_at);
                        self.store.upsert(tenant_id, e.transfer_id, record);
                    }
                }
                PartEvent::TransferRejected(e) => {
                    if let Some(mut record) = self.store.get(tenant_id, &e.transfer_id) {
                        record.status = TransferStatus::Rejected;
                        record.reject_reason = Some(e.reject_reason);
                        self.store.upsert(tenant_id, e.transfer_id, record);
                    }
                }
                // Registration/installation events advance the cursor only.
                _ => {}
            }

            // Advance cursor after successful apply.
            cursors.insert(key, seq);
        }

        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), TransferIndexError> {
        self.cursors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();

        // Clear read model per tenant before rebuilding.
        {
            let mut tenants = envs.iter().map(|e| e.tenant_id()).collect::<Vec<_>>();
            tenants.sort_by_key(|t| *t.as_uuid().as_bytes());
            tenants.dedup();
            for t in tenants {
                self.store.clear_tenant(t);
            }
        }

        // Deterministic replay order: tenant, aggregate, sequence.
        envs.sort_by_key(|e| {
            (
                *e.tenant_id().as_uuid().as_bytes(),
                *e.aggregate_id().as_uuid().as_bytes(),
                e.sequence_number(),
            )
        });

        for env in &envs {
            self.apply_envelope(env)?;
        }

        Ok(())
    }
}

impl<S> elevatorid_events::Projection for TransferIndexProjection<S>
where
    S: TenantStore<TransferId, TransferRecord>,
{
    type Error = TransferIndexError;

    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        self.apply_envelope(envelope)
    }
}

fn event_tenant(event: &PartEvent) -> TenantId {
    match event {
        PartEvent::PartRegistered(e) => e.tenant_id,
        PartEvent::TransferCreated(e) => e.tenant_id,
        PartEvent::TransferApproved(e) => e.tenant_id,
        PartEvent::TransferRejected(e) => e.tenant_id,
        PartEvent::PartInstalled(e) => e.tenant_id,
        PartEvent::PartRemoved(e) => e.tenant_id,
        PartEvent::PartReturnedToStock(e) => e.tenant_id,
    }
}
