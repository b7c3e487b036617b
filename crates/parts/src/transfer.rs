//! Value types of the transfer workflow.

use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use elevatorid_core::{CompanyId, DomainError, UserId, ValueObject};

use crate::owner::Owner;

/// Identifier of an ownership transfer (entity within the part's stream).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

impl TransferId {
    /// Create a new identifier (UUIDv7, time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for TransferId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TransferId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("TransferId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Direction of a transfer relative to the initiating company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// The initiator is buying the part.
    Incoming,
    /// The initiator is selling the part.
    Outgoing,
}

/// Transfer status lifecycle. `Pending` is initial; `Approved` and
/// `Rejected` are terminal — no transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Approved | TransferStatus::Rejected)
    }
}

/// One side of a transfer: a company from the directory, or an
/// out-of-registry company known only by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Counterparty {
    Registered { company_id: CompanyId },
    External { name: String },
}

impl Counterparty {
    pub fn company_id(&self) -> Option<CompanyId> {
        match self {
            Counterparty::Registered { company_id } => Some(*company_id),
            Counterparty::External { .. } => None,
        }
    }

    pub fn external_name(&self) -> Option<&str> {
        match self {
            Counterparty::Registered { .. } => None,
            Counterparty::External { name } => Some(name),
        }
    }

    /// The owner a part has while this party holds custody.
    pub fn to_owner(&self) -> Owner {
        match self {
            Counterparty::Registered { company_id } => Owner::Company {
                company_id: *company_id,
            },
            Counterparty::External { name } => Owner::External { name: name.clone() },
        }
    }
}

impl ValueObject for Counterparty {}

/// How a pending transfer was confirmed by the counterparty.
///
/// `PhoneConfirmation` is the out-of-band channel: a phone number matched
/// against the counterpart company's registered CEO contact, used when that
/// company has no system user to approve in-app. Validated against the
/// Company Directory at approval time, not at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ApprovalMethod {
    InAppUser { user_id: UserId },
    PhoneConfirmation { phone: String },
}

impl ValueObject for ApprovalMethod {}

/// The single outstanding transfer of a part (at most one at any time).
///
/// `seller` and `buyer` are resolved at creation time from the initiator,
/// the direction and the declared counterparty; at most one of the two is
/// out-of-registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub transfer_id: TransferId,
    pub initiator_company_id: CompanyId,
    pub direction: TransferDirection,
    pub seller: Counterparty,
    pub buyer: Counterparty,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub transfer_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PendingTransfer {
    /// The owner the part will have once this transfer is approved.
    pub fn owner_on_approval(&self) -> Owner {
        self.buyer.to_owner()
    }

    /// The registered company whose approval is required, if any.
    ///
    /// `None` means the counterparty is out-of-registry and approval is
    /// recorded via phone confirmation only.
    pub fn approving_company(&self) -> Option<CompanyId> {
        match self.direction {
            TransferDirection::Outgoing => self.buyer.company_id(),
            TransferDirection::Incoming => self.seller.company_id(),
        }
    }
}
