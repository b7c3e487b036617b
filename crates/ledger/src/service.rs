//! Part ledger facade: the application service every outer surface calls.
//!
//! Wires the command dispatcher, the read-model projections and the platform
//! ports together behind one API. Each command runs under a per-stream lock
//! so that two racing writers on the same part serialize: the loser re-reads
//! state the winner already changed and fails with the precise domain error
//! (a settled transfer reports `TransferNotPending`, not a raw concurrency
//! conflict).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

use elevatorid_core::{AggregateId, CompanyId, DomainError, ElevatorId, TenantId};
use elevatorid_events::{EventBus, EventEnvelope, Projection};
use elevatorid_parts::{
    ApprovalMethod, ApproveTransfer, Counterparty, CreateTransfer, InstallPart, Owner, Part,
    PartAttributes, PartCommand, PartId, RegisterPart, RejectTransfer, RemovePart, ReturnToStock,
    TransferDirection, TransferId, TransferStatus,
};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::directory::{CompanyDirectory, ElevatorRegistry};
use crate::event_store::{EventStore, EventStoreError, StoredEvent};
use crate::projections::{
    CustodyEntry, InstallationRecord, PartProvenance, ProvenanceProjection,
    TransferIndexProjection, TransferRecord,
};
use crate::read_model::InMemoryTenantStore;

/// Aggregate type tag recorded on every stored part event.
pub const PART_AGGREGATE_TYPE: &str = "part";

type TransferStore = Arc<InMemoryTenantStore<TransferId, TransferRecord>>;
type ProvenanceStore = Arc<InMemoryTenantStore<PartId, PartProvenance>>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("event deserialization failed: {0}")]
    Deserialize(String),

    #[error("event store failure: {0}")]
    Store(EventStoreError),

    #[error("event publication failed: {0}")]
    Publish(String),

    #[error("read model failure: {0}")]
    Projection(String),
}

impl From<DispatchError> for LedgerError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Domain(e) => LedgerError::Domain(e),
            DispatchError::Concurrency(msg) => LedgerError::Concurrency(msg),
            DispatchError::TenantIsolation(msg) => LedgerError::TenantIsolation(msg),
            DispatchError::Deserialize(msg) => LedgerError::Deserialize(msg),
            DispatchError::Store(e) => LedgerError::Store(e),
            DispatchError::Publish(msg) => LedgerError::Publish(msg),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Input for part registration.
#[derive(Debug, Clone)]
pub struct RegisterPartInput {
    pub part_uid: String,
    pub attributes: PartAttributes,
    pub registrant_company_id: CompanyId,
}

/// Input for transfer creation.
#[derive(Debug, Clone)]
pub struct CreateTransferInput {
    pub initiator_company_id: CompanyId,
    pub counterparty: Counterparty,
    pub direction: TransferDirection,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub transfer_date: Option<DateTime<Utc>>,
}

/// The part ownership and provenance ledger.
///
/// Generic over the event store, the event bus and the platform ports so
/// the in-memory implementations carry the test suite and persistent
/// backends slot in unchanged.
pub struct PartLedger<S, B, D, E> {
    dispatcher: CommandDispatcher<S, B>,
    transfers: TransferIndexProjection<TransferStore>,
    provenance: ProvenanceProjection<ProvenanceStore>,
    directory: D,
    elevators: E,
    /// Registry-wide part_uid uniqueness, maintained under the same lock as
    /// the registration append.
    uid_index: RwLock<HashMap<(TenantId, String), PartId>>,
    /// Per-stream command serialization.
    stream_locks: Mutex<HashMap<(TenantId, AggregateId), Arc<Mutex<()>>>>,
}

impl<S, B, D, E> PartLedger<S, B, D, E>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    D: CompanyDirectory,
    E: ElevatorRegistry,
{
    pub fn new(store: S, bus: B, directory: D, elevators: E) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            transfers: TransferIndexProjection::new(Arc::new(InMemoryTenantStore::new())),
            provenance: ProvenanceProjection::new(Arc::new(InMemoryTenantStore::new())),
            directory,
            elevators,
            uid_index: RwLock::new(HashMap::new()),
            stream_locks: Mutex::new(HashMap::new()),
        }
    }

    // ---- commands ----

    /// Register a new part under the registrant company's custody.
    ///
    /// `part_uid` is unique across the whole registry (per tenant); a
    /// duplicate fails with [`DomainError::DuplicatePartUid`].
    pub fn register_part(
        &self,
        tenant_id: TenantId,
        input: RegisterPartInput,
    ) -> LedgerResult<PartId> {
        self.require_company(tenant_id, input.registrant_company_id)?;

        let part_uid = input.part_uid.trim().to_string();

        // The uid index lock spans check and append so two racing
        // registrations of the same uid cannot both commit.
        let mut index = self
            .uid_index
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if index.contains_key(&(tenant_id, part_uid.clone())) {
            return Err(DomainError::duplicate_part_uid(part_uid).into());
        }

        let part_id = PartId::new(AggregateId::new());
        let command = PartCommand::RegisterPart(RegisterPart {
            tenant_id,
            part_id,
            part_uid: part_uid.clone(),
            attributes: input.attributes,
            registrant_company_id: input.registrant_company_id,
            occurred_at: Utc::now(),
        });

        let committed = self.dispatch(tenant_id, part_id, command)?;
        index.insert((tenant_id, part_uid.clone()), part_id);
        drop(index);

        self.project(&committed);
        info!(
            tenant_id = %tenant_id,
            part_id = %part_id,
            part_uid = %part_uid,
            "part registered"
        );
        Ok(part_id)
    }

    /// Open a transfer on a part. At most one transfer may be pending.
    pub fn create_transfer(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
        input: CreateTransferInput,
    ) -> LedgerResult<TransferRecord> {
        self.require_company(tenant_id, input.initiator_company_id)?;
        if let Some(company_id) = input.counterparty.company_id() {
            self.require_company(tenant_id, company_id)?;
        }

        let transfer_id = TransferId::new();
        let command = PartCommand::CreateTransfer(CreateTransfer {
            tenant_id,
            part_id,
            transfer_id,
            initiator_company_id: input.initiator_company_id,
            counterparty: input.counterparty,
            direction: input.direction,
            reason: input.reason,
            notes: input.notes,
            transfer_date: input.transfer_date,
            occurred_at: Utc::now(),
        });

        let lock = self.stream_lock(tenant_id, part_id.0);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let committed = self.dispatch(tenant_id, part_id, command)?;
        // Projecting under the stream lock keeps read models in stream order
        // even under contention.
        self.project(&committed);
        drop(_guard);

        info!(
            tenant_id = %tenant_id,
            part_id = %part_id,
            transfer_id = %transfer_id,
            "transfer created"
        );
        self.transfers
            .get(tenant_id, &transfer_id)
            .ok_or_else(|| LedgerError::Projection("transfer not visible after commit".into()))
    }

    /// Approve a pending transfer. Status flip and owner change are one
    /// atomic event append.
    ///
    /// The approval method is validated against the company directory: an
    /// in-app approval must come from a user of the approving counterparty,
    /// and a phone confirmation must match that company's registered CEO
    /// contact. When the counterparty is out-of-registry, only a phone
    /// confirmation is accepted.
    pub fn approve_transfer(
        &self,
        tenant_id: TenantId,
        transfer_id: TransferId,
        approval: ApprovalMethod,
    ) -> LedgerResult<TransferRecord> {
        let record = self
            .transfers
            .get(tenant_id, &transfer_id)
            .ok_or(DomainError::TransferNotFound)?;
        let part_id = record.part_id;

        let lock = self.stream_lock(tenant_id, part_id.0);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Re-read under the lock: the index may lag a racing settle.
        let part = self
            .dispatcher
            .load(tenant_id, part_id.0, |_, id| Part::empty(PartId::new(id)))?;
        match part.transfer_status(transfer_id) {
            Some(TransferStatus::Pending) => {}
            Some(_) => return Err(DomainError::TransferNotPending.into()),
            None => return Err(DomainError::TransferNotFound.into()),
        }

        let approving_company = part
            .pending_transfer()
            .and_then(|p| p.approving_company());
        self.authorize_approval(tenant_id, approving_company, &approval)?;

        let command = PartCommand::ApproveTransfer(ApproveTransfer {
            tenant_id,
            part_id,
            transfer_id,
            approval,
            occurred_at: Utc::now(),
        });
        let committed = self.dispatch(tenant_id, part_id, command)?;
        self.project(&committed);
        drop(_guard);

        info!(
            tenant_id = %tenant_id,
            part_id = %part_id,
            transfer_id = %transfer_id,
            "transfer approved"
        );
        self.transfers
            .get(tenant_id, &transfer_id)
            .ok_or_else(|| LedgerError::Projection("transfer not visible after commit".into()))
    }

    /// Reject a pending transfer with a reason. The part's owner is untouched
    /// and a new transfer may be opened afterwards.
    pub fn reject_transfer(
        &self,
        tenant_id: TenantId,
        transfer_id: TransferId,
        reject_reason: impl Into<String>,
    ) -> LedgerResult<TransferRecord> {
        let record = self
            .transfers
            .get(tenant_id, &transfer_id)
            .ok_or(DomainError::TransferNotFound)?;
        let part_id = record.part_id;

        let command = PartCommand::RejectTransfer(RejectTransfer {
            tenant_id,
            part_id,
            transfer_id,
            reject_reason: reject_reason.into(),
            occurred_at: Utc::now(),
        });

        let lock = self.stream_lock(tenant_id, part_id.0);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let committed = self.dispatch(tenant_id, part_id, command)?;
        self.project(&committed);
        drop(_guard);

        info!(
            tenant_id = %tenant_id,
            part_id = %part_id,
            transfer_id = %transfer_id,
            "transfer rejected"
        );
        self.transfers
            .get(tenant_id, &transfer_id)
            .ok_or_else(|| LedgerError::Projection("transfer not visible after commit".into()))
    }

    /// Install a part on an elevator. Ownership passes to the elevator and
    /// the part stops being transferable. Returns the opened installation
    /// record.
    pub fn install_part(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
        elevator_id: ElevatorId,
        installer_company_id: CompanyId,
    ) -> LedgerResult<InstallationRecord> {
        self.require_company(tenant_id, installer_company_id)?;
        if !self.elevators.exists(tenant_id, elevator_id) {
            return Err(DomainError::validation(format!(
                "elevator {elevator_id} is not registered"
            ))
            .into());
        }

        let command = PartCommand::InstallPart(InstallPart {
            tenant_id,
            part_id,
            elevator_id,
            installer_company_id,
            occurred_at: Utc::now(),
        });

        let lock = self.stream_lock(tenant_id, part_id.0);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let committed = self.dispatch(tenant_id, part_id, command)?;
        self.project(&committed);
        let record = self
            .get_part(tenant_id, part_id)?
            .installations
            .into_iter()
            .rev()
            .find(|r| r.is_active() && r.elevator_id == elevator_id)
            .ok_or_else(|| {
                LedgerError::Projection("installation not visible after commit".into())
            })?;
        drop(_guard);

        info!(
            tenant_id = %tenant_id,
            part_id = %part_id,
            elevator_id = %elevator_id,
            "part installed"
        );
        Ok(record)
    }

    /// Close the active installation record and return it. The elevator
    /// keeps custody until an explicit [`PartLedger::return_to_stock`].
    pub fn remove_part(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
        elevator_id: ElevatorId,
        reason: Option<String>,
    ) -> LedgerResult<InstallationRecord> {
        let command = PartCommand::RemovePart(RemovePart {
            tenant_id,
            part_id,
            elevator_id,
            reason,
            occurred_at: Utc::now(),
        });

        let lock = self.stream_lock(tenant_id, part_id.0);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let committed = self.dispatch(tenant_id, part_id, command)?;
        self.project(&committed);
        let record = self
            .get_part(tenant_id, part_id)?
            .installations
            .into_iter()
            .rev()
            .find(|r| r.elevator_id == elevator_id && r.removed_at.is_some())
            .ok_or_else(|| {
                LedgerError::Projection("closed installation not visible after commit".into())
            })?;
        drop(_guard);

        info!(
            tenant_id = %tenant_id,
            part_id = %part_id,
            elevator_id = %elevator_id,
            "part removed"
        );
        Ok(record)
    }

    /// Hand a removed part back to a company's stock, making it
    /// transferable again.
    pub fn return_to_stock(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
        elevator_id: ElevatorId,
        company_id: CompanyId,
    ) -> LedgerResult<()> {
        self.require_company(tenant_id, company_id)?;

        let command = PartCommand::ReturnToStock(ReturnToStock {
            tenant_id,
            part_id,
            elevator_id,
            company_id,
            occurred_at: Utc::now(),
        });

        let lock = self.stream_lock(tenant_id, part_id.0);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let committed = self.dispatch(tenant_id, part_id, command)?;
        self.project(&committed);
        drop(_guard);

        info!(
            tenant_id = %tenant_id,
            part_id = %part_id,
            company_id = %company_id,
            "part returned to stock"
        );
        Ok(())
    }

    // ---- queries ----

    pub fn get_part(&self, tenant_id: TenantId, part_id: PartId) -> LedgerResult<PartProvenance> {
        self.provenance
            .get(tenant_id, &part_id)
            .ok_or(DomainError::PartNotFound.into())
    }

    pub fn find_part_by_uid(&self, tenant_id: TenantId, part_uid: &str) -> Option<PartId> {
        let index = self
            .uid_index
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        index.get(&(tenant_id, part_uid.trim().to_string())).copied()
    }

    /// Current exclusive owner of a part.
    pub fn current_owner(&self, tenant_id: TenantId, part_id: PartId) -> LedgerResult<Owner> {
        Ok(self.get_part(tenant_id, part_id)?.current_owner)
    }

    pub fn get_transfer(
        &self,
        tenant_id: TenantId,
        transfer_id: TransferId,
    ) -> LedgerResult<TransferRecord> {
        self.transfers
            .get(tenant_id, &transfer_id)
            .ok_or(DomainError::TransferNotFound.into())
    }

    /// All transfers of a part, oldest first, across every status.
    pub fn transfer_history(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
    ) -> LedgerResult<Vec<TransferRecord>> {
        // Validates existence so an unknown part is an error, not [].
        self.get_part(tenant_id, part_id)?;
        Ok(self.transfers.history_for_part(tenant_id, part_id))
    }

    /// All installation records of a part, oldest first.
    pub fn installation_history(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
    ) -> LedgerResult<Vec<InstallationRecord>> {
        Ok(self.get_part(tenant_id, part_id)?.installations)
    }

    /// Full chain of custody, in stream order.
    pub fn chain_of_custody(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
    ) -> LedgerResult<Vec<CustodyEntry>> {
        Ok(self.get_part(tenant_id, part_id)?.custody)
    }

    // ---- internals ----

    fn dispatch(
        &self,
        tenant_id: TenantId,
        part_id: PartId,
        command: PartCommand,
    ) -> LedgerResult<Vec<StoredEvent>> {
        self.dispatcher
            .dispatch::<Part>(tenant_id, part_id.0, PART_AGGREGATE_TYPE, command, |_, id| {
                Part::empty(PartId::new(id))
            })
            .map_err(LedgerError::from)
    }

    /// Apply committed events to the read models. Projection failures are
    /// logged, not surfaced: the write is durable and read models can be
    /// rebuilt from the store.
    fn project(&self, committed: &[StoredEvent]) {
        for stored in committed {
            let envelope = stored.to_envelope();
            if let Err(e) = self.transfers.apply(&envelope) {
                warn!(event_id = %stored.event_id, error = %e, "transfer index apply failed");
            }
            if let Err(e) = self.provenance.apply(&envelope) {
                warn!(event_id = %stored.event_id, error = %e, "provenance apply failed");
            }
        }
    }

    fn stream_lock(&self, tenant_id: TenantId, aggregate_id: AggregateId) -> Arc<Mutex<()>> {
        let mut locks = self
            .stream_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks
            .entry((tenant_id, aggregate_id))
            .or_default()
            .clone()
    }

    fn require_company(&self, tenant_id: TenantId, company_id: CompanyId) -> LedgerResult<()> {
        if self.directory.company(tenant_id, company_id).is_none() {
            return Err(DomainError::validation(format!(
                "company {company_id} is not in the directory"
            ))
            .into());
        }
        Ok(())
    }

    fn authorize_approval(
        &self,
        tenant_id: TenantId,
        approving_company: Option<CompanyId>,
        approval: &ApprovalMethod,
    ) -> LedgerResult<()> {
        match (approving_company, approval) {
            (Some(company_id), ApprovalMethod::InAppUser { user_id }) => {
                if self.directory.is_company_user(tenant_id, company_id, *user_id) {
                    Ok(())
                } else {
                    Err(DomainError::Unauthorized.into())
                }
            }
            (Some(company_id), ApprovalMethod::PhoneConfirmation { phone }) => {
                let registered = self
                    .directory
                    .company(tenant_id, company_id)
                    .and_then(|c| c.ceo_phone);
                match registered {
                    Some(registered) if registered.trim() == phone.trim() => Ok(()),
                    _ => Err(DomainError::Unauthorized.into()),
                }
            }
            // Out-of-registry counterparty: no system user can act for it.
            (None, ApprovalMethod::InAppUser { .. }) => Err(DomainError::Unauthorized.into()),
            (None, ApprovalMethod::PhoneConfirmation { phone }) => {
                if phone.trim().is_empty() {
                    Err(DomainError::validation("phone confirmation requires a phone number")
                        .into())
                } else {
                    Ok(())
                }
            }
        }
    }
}
