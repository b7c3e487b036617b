use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use elevatorid_core::{
    Aggregate, AggregateId, AggregateRoot, CategoryId, CompanyId, DomainError, ElevatorId,
    TenantId, ValueObject,
};
use elevatorid_events::Event;

use crate::installation::ActiveInstallation;
use crate::owner::Owner;
use crate::transfer::{
    ApprovalMethod, Counterparty, PendingTransfer, TransferDirection, TransferId, TransferStatus,
};

/// Part identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(pub AggregateId);

impl PartId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Technical attributes of a part. Category and country fields reference the
/// external attribute schema; they are carried, not interpreted, here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartAttributes {
    pub title: String,
    pub category_id: CategoryId,
    pub barcode: Option<String>,
    pub manufacturer_country: Option<String>,
    pub origin_country: Option<String>,
}

impl ValueObject for PartAttributes {}

/// Aggregate root: Part.
///
/// The single source of truth for a part's identity and custody. All
/// ownership-affecting operations — registration, the transfer state
/// machine, installation and removal, return to stock — are commands on this
/// aggregate, so the exclusivity invariant has exactly one writer path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    id: PartId,
    tenant_id: Option<TenantId>,
    part_uid: String,
    attributes: Option<PartAttributes>,
    registrant_company_id: Option<CompanyId>,
    owner: Option<Owner>,
    pending_transfer: Option<PendingTransfer>,
    /// Terminal statuses of past transfers, so a replayed approve/reject on
    /// a settled transfer fails with `TransferNotPending` instead of
    /// `TransferNotFound`.
    settled_transfers: HashMap<TransferId, TransferStatus>,
    active_installation: Option<ActiveInstallation>,
    version: u64,
    created: bool,
}

impl Part {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: PartId) -> Self {
        Self {
            id,
            tenant_id: None,
            part_uid: String::new(),
            attributes: None,
            registrant_company_id: None,
            owner: None,
            pending_transfer: None,
            settled_transfers: HashMap::new(),
            active_installation: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn part_uid(&self) -> &str {
        &self.part_uid
    }

    pub fn attributes(&self) -> Option<&PartAttributes> {
        self.attributes.as_ref()
    }

    pub fn registrant_company_id(&self) -> Option<CompanyId> {
        self.registrant_company_id
    }

    /// Current exclusive owner (`None` only before registration).
    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    pub fn pending_transfer(&self) -> Option<&PendingTransfer> {
        self.pending_transfer.as_ref()
    }

    pub fn transfer_status(&self, transfer_id: TransferId) -> Option<TransferStatus> {
        if let Some(pending) = &self.pending_transfer {
            if pending.transfer_id == transfer_id {
                return Some(TransferStatus::Pending);
            }
        }
        self.settled_transfers.get(&transfer_id).copied()
    }

    pub fn active_installation(&self) -> Option<&ActiveInstallation> {
        self.active_installation.as_ref()
    }

    /// Invariant helper: whether the part is in tradeable custody.
    ///
    /// Installed parts and removed-but-not-returned parts are fixed assets,
    /// not stock, and cannot be transferred.
    pub fn is_transferable(&self) -> bool {
        matches!(
            self.owner,
            Some(Owner::Company { .. }) | Some(Owner::External { .. })
        )
    }
}

impl AggregateRoot for Part {
    type Id = PartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterPart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPart {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    /// Human-facing unique code. Global uniqueness is enforced by the
    /// service layer; the aggregate only validates shape.
    pub part_uid: String,
    pub attributes: PartAttributes,
    pub registrant_company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CreateTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransfer {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub transfer_id: TransferId,
    pub initiator_company_id: CompanyId,
    pub counterparty: Counterparty,
    pub direction: TransferDirection,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub transfer_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveTransfer {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub transfer_id: TransferId,
    pub approval: ApprovalMethod,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectTransfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectTransfer {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub transfer_id: TransferId,
    pub reject_reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: InstallPart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPart {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub elevator_id: ElevatorId,
    pub installer_company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemovePart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovePart {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub elevator_id: ElevatorId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnToStock.
///
/// The explicit follow-up after a removal: the named company takes custody
/// of the removed part. Nothing reverts silently on removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnToStock {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub elevator_id: ElevatorId,
    pub company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartCommand {
    RegisterPart(RegisterPart),
    CreateTransfer(CreateTransfer),
    ApproveTransfer(ApproveTransfer),
    RejectTransfer(RejectTransfer),
    InstallPart(InstallPart),
    RemovePart(RemovePart),
    ReturnToStock(ReturnToStock),
}

/// Event: PartRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRegistered {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub part_uid: String,
    pub attributes: PartAttributes,
    pub registrant_company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCreated {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub transfer_id: TransferId,
    pub initiator_company_id: CompanyId,
    pub direction: TransferDirection,
    pub seller: Counterparty,
    pub buyer: Counterparty,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub transfer_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferApproved.
///
/// Carries the new owner so that the status transition and the custody
/// mutation are one event — applied atomically, persisted atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferApproved {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub transfer_id: TransferId,
    pub new_owner: Owner,
    pub approval: ApprovalMethod,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransferRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRejected {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub transfer_id: TransferId,
    pub reject_reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartInstalled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInstalled {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub elevator_id: ElevatorId,
    pub installer_company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRemoved {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub elevator_id: ElevatorId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartReturnedToStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartReturnedToStock {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub elevator_id: ElevatorId,
    pub company_id: CompanyId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartEvent {
    PartRegistered(PartRegistered),
    TransferCreated(TransferCreated),
    TransferApproved(TransferApproved),
    TransferRejected(TransferRejected),
    PartInstalled(PartInstalled),
    PartRemoved(PartRemoved),
    PartReturnedToStock(PartReturnedToStock),
}

impl Event for PartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartEvent::PartRegistered(_) => "parts.part.registered",
            PartEvent::TransferCreated(_) => "parts.transfer.created",
            PartEvent::TransferApproved(_) => "parts.transfer.approved",
            PartEvent::TransferRejected(_) => "parts.transfer.rejected",
            PartEvent::PartInstalled(_) => "parts.part.installed",
            PartEvent::PartRemoved(_) => "parts.part.removed",
            PartEvent::PartReturnedToStock(_) => "parts.part.returned_to_stock",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartEvent::PartRegistered(e) => e.occurred_at,
            PartEvent::TransferCreated(e) => e.occurred_at,
            PartEvent::TransferApproved(e) => e.occurred_at,
            PartEvent::TransferRejected(e) => e.occurred_at,
            PartEvent::PartInstalled(e) => e.occurred_at,
            PartEvent::PartRemoved(e) => e.occurred_at,
            PartEvent::PartReturnedToStock(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Part {
    type Command = PartCommand;
    type Event = PartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartEvent::PartRegistered(e) => {
                self.id = e.part_id;
                self.tenant_id = Some(e.tenant_id);
                self.part_uid = e.part_uid.clone();
                self.attributes = Some(e.attributes.clone());
                self.registrant_company_id = Some(e.registrant_company_id);
                // Registrant becomes the initial owner.
                self.owner = Some(Owner::Company {
                    company_id: e.registrant_company_id,
                });
                self.created = true;
            }
            PartEvent::TransferCreated(e) => {
                self.pending_transfer = Some(PendingTransfer {
                    transfer_id: e.transfer_id,
                    initiator_company_id: e.initiator_company_id,
                    direction: e.direction,
                    seller: e.seller.clone(),
                    buyer: e.buyer.clone(),
                    reason: e.reason.clone(),
                    notes: e.notes.clone(),
                    transfer_date: e.transfer_date,
                    created_at: e.occurred_at,
                });
            }
            PartEvent::TransferApproved(e) => {
                // Owner pointer and transfer status change together.
                self.owner = Some(e.new_owner.clone());
                self.pending_transfer = None;
                self.settled_transfers
                    .insert(e.transfer_id, TransferStatus::Approved);
            }
            PartEvent::TransferRejected(e) => {
                self.pending_transfer = None;
                self.settled_transfers
                    .insert(e.transfer_id, TransferStatus::Rejected);
            }
            PartEvent::PartInstalled(e) => {
                self.owner = Some(Owner::Elevator {
                    elevator_id: e.elevator_id,
                });
                self.active_installation = Some(ActiveInstallation {
                    elevator_id: e.elevator_id,
                    installer_company_id: e.installer_company_id,
                    installed_at: e.occurred_at,
                });
            }
            PartEvent::PartRemoved(_) => {
                // Custody stays attributed to the elevator until an explicit
                // return to stock; the part is just no longer installed.
                self.active_installation = None;
            }
            PartEvent::PartReturnedToStock(e) => {
                self.owner = Some(Owner::Company {
                    company_id: e.company_id,
                });
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartCommand::RegisterPart(cmd) => self.handle_register(cmd),
            PartCommand::CreateTransfer(cmd) => self.handle_create_transfer(cmd),
            PartCommand::ApproveTransfer(cmd) => self.handle_approve_transfer(cmd),
            PartCommand::RejectTransfer(cmd) => self.handle_reject_transfer(cmd),
            PartCommand::InstallPart(cmd) => self.handle_install(cmd),
            PartCommand::RemovePart(cmd) => self.handle_remove(cmd),
            PartCommand::ReturnToStock(cmd) => self.handle_return_to_stock(cmd),
        }
    }
}

impl Part {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::validation("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_part_id(&self, part_id: PartId) -> Result<(), DomainError> {
        if self.id != part_id {
            return Err(DomainError::validation("part_id mismatch"));
        }
        Ok(())
    }

    /// Find the pending transfer a command refers to.
    ///
    /// Settled transfers fail with `TransferNotPending`, unknown ids with
    /// `TransferNotFound`.
    fn require_pending(&self, transfer_id: TransferId) -> Result<&PendingTransfer, DomainError> {
        if let Some(pending) = &self.pending_transfer {
            if pending.transfer_id == transfer_id {
                return Ok(pending);
            }
        }
        if self.settled_transfers.contains_key(&transfer_id) {
            return Err(DomainError::TransferNotPending);
        }
        Err(DomainError::TransferNotFound)
    }

    fn handle_register(&self, cmd: &RegisterPart) -> Result<Vec<PartEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("part already registered"));
        }
        if cmd.part_uid.trim().is_empty() {
            return Err(DomainError::validation("part_uid cannot be empty"));
        }
        if cmd.attributes.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        Ok(vec![PartEvent::PartRegistered(PartRegistered {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            part_uid: cmd.part_uid.clone(),
            attributes: cmd.attributes.clone(),
            registrant_company_id: cmd.registrant_company_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_create_transfer(&self, cmd: &CreateTransfer) -> Result<Vec<PartEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::PartNotFound);
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_part_id(cmd.part_id)?;

        match &cmd.counterparty {
            Counterparty::Registered { company_id } => {
                if *company_id == cmd.initiator_company_id {
                    return Err(DomainError::validation(
                        "counterparty must differ from the initiating company",
                    ));
                }
            }
            Counterparty::External { name } => {
                if name.trim().is_empty() {
                    return Err(DomainError::validation(
                        "external counterparty name cannot be empty",
                    ));
                }
            }
        }

        let owner = self.owner.as_ref().ok_or(DomainError::PartNotFound)?;
        if !self.is_transferable() {
            return Err(DomainError::PartNotTransferable);
        }
        if self.pending_transfer.is_some() {
            return Err(DomainError::TransferAlreadyPending);
        }
        if self.settled_transfers.contains_key(&cmd.transfer_id) {
            return Err(DomainError::conflict("transfer_id already used"));
        }

        // Resolve seller and buyer from the initiator, direction and the
        // current custody; the seller side must hold the part.
        let (seller, buyer) = match cmd.direction {
            TransferDirection::Outgoing => {
                if owner.company_id() != Some(cmd.initiator_company_id) {
                    return Err(DomainError::NotPartOwner);
                }
                (
                    Counterparty::Registered {
                        company_id: cmd.initiator_company_id,
                    },
                    cmd.counterparty.clone(),
                )
            }
            TransferDirection::Incoming => {
                match (owner, &cmd.counterparty) {
                    (Owner::Company { company_id }, Counterparty::Registered { company_id: c })
                        if company_id == c => {}
                    (Owner::External { name }, Counterparty::External { name: n })
                        if name == n => {}
                    _ => return Err(DomainError::NotPartOwner),
                }
                (
                    cmd.counterparty.clone(),
                    Counterparty::Registered {
                        company_id: cmd.initiator_company_id,
                    },
                )
            }
        };

        Ok(vec![PartEvent::TransferCreated(TransferCreated {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            transfer_id: cmd.transfer_id,
            initiator_company_id: cmd.initiator_company_id,
            direction: cmd.direction,
            seller,
            buyer,
            reason: cmd.reason.clone(),
            notes: cmd.notes.clone(),
            transfer_date: cmd.transfer_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve_transfer(
        &self,
        cmd: &ApproveTransfer,
    ) -> Result<Vec<PartEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::PartNotFound);
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_part_id(cmd.part_id)?;

        let pending = self.require_pending(cmd.transfer_id)?;

        if let ApprovalMethod::PhoneConfirmation { phone } = &cmd.approval {
            if phone.trim().is_empty() {
                return Err(DomainError::validation(
                    "confirmation phone cannot be empty",
                ));
            }
        }

        Ok(vec![PartEvent::TransferApproved(TransferApproved {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            transfer_id: cmd.transfer_id,
            new_owner: pending.owner_on_approval(),
            approval: cmd.approval.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject_transfer(&self, cmd: &RejectTransfer) -> Result<Vec<PartEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::PartNotFound);
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_part_id(cmd.part_id)?;

        self.require_pending(cmd.transfer_id)?;

        if cmd.reject_reason.trim().is_empty() {
            return Err(DomainError::validation("reject_reason cannot be empty"));
        }

        Ok(vec![PartEvent::TransferRejected(TransferRejected {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            transfer_id: cmd.transfer_id,
            reject_reason: cmd.reject_reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_install(&self, cmd: &InstallPart) -> Result<Vec<PartEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::PartNotFound);
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_part_id(cmd.part_id)?;

        if self.pending_transfer.is_some() {
            return Err(DomainError::conflict(
                "part has a pending transfer; settle it before installing",
            ));
        }

        match self.owner.as_ref().ok_or(DomainError::PartNotFound)? {
            Owner::Elevator { elevator_id } => {
                if *elevator_id == cmd.elevator_id && self.active_installation.is_some() {
                    return Err(DomainError::PartAlreadyInstalled);
                }
                // Installed elsewhere, or removed and awaiting return to stock.
                return Err(DomainError::NotPartOwner);
            }
            Owner::External { .. } => return Err(DomainError::NotPartOwner),
            Owner::Company { company_id } => {
                // A company can only install parts it owns.
                if *company_id != cmd.installer_company_id {
                    return Err(DomainError::NotPartOwner);
                }
            }
        }

        Ok(vec![PartEvent::PartInstalled(PartInstalled {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            elevator_id: cmd.elevator_id,
            installer_company_id: cmd.installer_company_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemovePart) -> Result<Vec<PartEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::PartNotFound);
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_part_id(cmd.part_id)?;

        match &self.active_installation {
            Some(active) if active.elevator_id == cmd.elevator_id => {}
            _ => {
                return Err(DomainError::conflict(
                    "part has no active installation in this elevator",
                ));
            }
        }

        Ok(vec![PartEvent::PartRemoved(PartRemoved {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            elevator_id: cmd.elevator_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return_to_stock(&self, cmd: &ReturnToStock) -> Result<Vec<PartEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::PartNotFound);
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_part_id(cmd.part_id)?;

        if self.active_installation.is_some() {
            return Err(DomainError::conflict(
                "part is still installed; remove it before returning to stock",
            ));
        }
        match &self.owner {
            Some(Owner::Elevator { elevator_id }) if *elevator_id == cmd.elevator_id => {}
            _ => {
                return Err(DomainError::conflict(
                    "part is not awaiting return to stock from this elevator",
                ));
            }
        }

        Ok(vec![PartEvent::PartReturnedToStock(PartReturnedToStock {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            elevator_id: cmd.elevator_id,
            company_id: cmd.company_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
