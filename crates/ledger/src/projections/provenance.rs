use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use elevatorid_core::{AggregateId, CompanyId, ElevatorId, TenantId};
use elevatorid_events::EventEnvelope;
use elevatorid_parts::{Owner, PartAttributes, PartEvent, PartId, TransferId};

use crate::read_model::TenantStore;

/// One installation record in a part's life. A record is "open" while the
/// part sits on the elevator and is closed by a removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub elevator_id: ElevatorId,
    pub installer_company_id: CompanyId,
    pub installed_at: DateTime<Utc>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removal_reason: Option<String>,
}

impl InstallationRecord {
    pub fn is_active(&self) -> bool {
        self.removed_at.is_none()
    }
}

/// One entry in a part's chain of custody, in stream order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustodyEvent {
    Registered {
        company_id: CompanyId,
    },
    TransferCreated {
        transfer_id: TransferId,
    },
    TransferApproved {
        transfer_id: TransferId,
        new_owner: Owner,
    },
    TransferRejected {
        transfer_id: TransferId,
    },
    Installed {
        elevator_id: ElevatorId,
        installer_company_id: CompanyId,
    },
    Removed {
        elevator_id: ElevatorId,
        reason: Option<String>,
    },
    ReturnedToStock {
        elevator_id: ElevatorId,
        company_id: CompanyId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyEntry {
    pub sequence_number: u64,
    pub occurred_at: DateTime<Utc>,
    pub event: CustodyEvent,
}

/// Full provenance read model for one part: identity, current owner,
/// installation history and the chain of custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartProvenance {
    pub part_id: PartId,
    pub part_uid: String,
    pub attributes: PartAttributes,
    pub registrant_company_id: CompanyId,
    pub registered_at: DateTime<Utc>,
    pub current_owner: Owner,
    pub installations: Vec<InstallationRecord>,
    pub custody: Vec<CustodyEntry>,
}

impl PartProvenance {
    /// The installation currently open, if any.
    pub fn active_installation(&self) -> Option<&InstallationRecord> {
        self.installations.iter().rev().find(|r| r.is_active())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    tenant_id: TenantId,
    aggregate_id: AggregateId,
}

#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("failed to deserialize part event: {0}")]
    Deserialize(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("event for unregistered part {0}")]
    UnknownPart(PartId),
}

/// Provenance projection.
///
/// Folds each part's stream into a [`PartProvenance`] record. Every event
/// becomes a custody entry, so the answer to "who owned this part when the
/// incident happened" is a single read.
#[derive(Debug)]
pub struct ProvenanceProjection<S>
where
    S: TenantStore<PartId, PartProvenance>,
{
    store: S,
    cursors: RwLock<HashMap<CursorKey, u64>>,
}

impl<S> ProvenanceProjection<S>
where
    S: TenantStore<PartId, PartProvenance>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, tenant_id: TenantId, part_id: &PartId) -> Option<PartProvenance> {
        self.store.get(tenant_id, part_id)
    }

    pub fn list(&self, tenant_id: TenantId) -> Vec<PartProvenance> {
        self.store.list(tenant_id)
    }

    /// Current owner of a part, if the part is known.
    pub fn current_owner(&self, tenant_id: TenantId, part_id: &PartId) -> Option<Owner> {
        self.store.get(tenant_id, part_id).map(|p| p.current_owner)
    }

    /// Apply a published envelope into the projection (idempotent).
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProvenanceError> {
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
                return Err(ProvenanceError::NonMonotonicSequence { last, found: seq });
            }

            if seq <= last {
                return Ok(());
            }

            if seq != last + 1 && last != 0 {
                return Err(ProvenanceError::NonMonotonicSequence { last, found: seq });
            }

            let event: PartEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProvenanceError::Deserialize(e.to_string()))?;

            if event_tenant(&event) != tenant_id {
                return Err(ProvenanceError::TenantIsolation(
                    "event tenant_id does not match envelope tenant_id".to_string(),
                ));
            }

            self.fold(tenant_id, seq, event)?;

            cursors.insert(key, seq);
        }

        Ok(())
    }

    fn fold(&self, tenant_id: TenantId, seq: u64, event: PartEvent) -> Result<(), ProvenanceError> {
        match event {
            PartEvent::PartRegistered(e) => {
                self.store.upsert(
                    tenant_id,
                    e.part_id,
                    PartProvenance {
                        part_id: e.part_id,
                        part_uid: e.part_uid,
                        attributes: e.attributes,
                        registrant_company_id: e.registrant_company_id,
                        registered_at: e.occurred_at,
                        current_owner: Owner::Company {
                            company_id: e.registrant_company_id,
                        },
                        installations: vec![],
                        custody: vec![CustodyEntry {
                            sequence_number: seq,
                            occurred_at: e.occurred_at,
                            event: CustodyEvent::Registered {
                                company_id: e.registrant_company_id,
                            },
                        }],
                    },
                );
                Ok(())
            }
            PartEvent::TransferCreated(e) => self.update(tenant_id, e.part_id, |p| {
                p.custody.push(CustodyEntry {
                    sequence_number: seq,
                    occurred_at: e.occurred_at,
                    event: CustodyEvent::TransferCreated {
                        transfer_id: e.transfer_id,
                    },
                });
            }),
            PartEvent::TransferApproved(e) => self.update(tenant_id, e.part_id, |p| {
                p.current_owner = e.new_owner.clone();
                p.custody.push(CustodyEntry {
                    sequence_number: seq,
                    occurred_at: e.occurred_at,
                    event: CustodyEvent::TransferApproved {
                        transfer_id: e.transfer_id,
                        new_owner: e.new_owner.clone(),
                    },
                });
            }),
            PartEvent::TransferRejected(e) => self.update(tenant_id, e.part_id, |p| {
                p.custody.push(CustodyEntry {
                    sequence_number: seq,
                    occurred_at: e.occurred_at,
                    event: CustodyEvent::TransferRejected {
                        transfer_id: e.transfer_id,
                    },
                });
            }),
            PartEvent::PartInstalled(e) => self.update(tenant_id, e.part_id, |p| {
                p.current_owner = Owner::Elevator {
                    elevator_id: e.elevator_id,
                };
                p.installations.push(InstallationRecord {
                    elevator_id: e.elevator_id,
                    installer_company_id: e.installer_company_id,
                    installed_at: e.occurred_at,
                    removed_at: None,
                    removal_reason: None,
                });
                p.custody.push(CustodyEntry {
                    sequence_number: seq,
                    occurred_at: e.occurred_at,
                    event: CustodyEvent::Installed {
                        elevator_id: e.elevator_id,
                        installer_company_id: e.installer_company_id,
                    },
                });
            }),
            PartEvent::PartRemoved(e) => self.update(tenant_id, e.part_id, |p| {
                if let Some(open) = p
                    .installations
                    .iter_mut()
                    .rev()
                    .find(|r| r.is_active() && r.elevator_id == e.elevator_id)
                {
                    open.removed_at = Some(e.occurred_at);
                    open.removal_reason = e.reason.clone();
                }
                p.custody.push(CustodyEntry {
                    sequence_number: seq,
                    occurred_at: e.occurred_at,
                    event: CustodyEvent::Removed {
                        elevator_id: e.elevator_id,
                        reason: e.reason.clone(),
                    },
                });
            }),
            PartEvent::PartReturnedToStock(e) => self.update(tenant_id, e.part_id, |p| {
                p.current_owner = Owner::Company {
                    company_id: e.company_id,
                };
                p.custody.push(CustodyEntry {
                    sequence_number: seq,
                    occurred_at: e.occurred_at,
                    event: CustodyEvent::ReturnedToStock {
                        elevator_id: e.elevator_id,
                        company_id: e.company_id,
                    },
                });
            }),
        }
    }

    fn update(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
        f: impl FnOnce(&mut PartProvenance),
    ) -> Result<(), ProvenanceError> {
        let mut record = self
            .store
            .get(tenant_id, &part_id)
            .ok_or(ProvenanceError::UnknownPart(part_id))?;
        f(&mut record);
        self.store.upsert(tenant_id, part_id, record);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProvenanceError> {
        self.cursors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let mut envs: Vec<_> = envelopes.into_iter().collect();

        {
            let mut tenants = envs.iter().map(|e| e.tenant_id()).collect::<Vec<_>>();
            tenants.sort_by_key(|t| *t.as_uuid().as_bytes());
            tenants.dedup();
            for t in tenants {
                self.store.clear_tenant(t);
            }
        }

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

impl<S> elevatorid_events::Projection for ProvenanceProjection<S>
where
    S: TenantStore<PartId, PartProvenance>,
{
    type Error = ProvenanceError;

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
