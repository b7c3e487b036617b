//! Current custody of a part.

use serde::{Deserialize, Serialize};

use elevatorid_core::{CompanyId, ElevatorId};

/// Exclusive owner of a part. Exactly one holder at any time — the enum is
/// the structural form of the exclusivity invariant the source schema kept
/// as a pair of nullable columns plus a discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Owner {
    /// Tradeable stock held by a registered company.
    Company { company_id: CompanyId },
    /// Consumed into a fixed asset: installed in (or removed from and still
    /// attributed to) an elevator; no longer tradeable.
    Elevator { elevator_id: ElevatorId },
    /// Custody left the registry through an approved transfer to an
    /// out-of-registry company; only an incoming transfer from that holder
    /// brings the part back.
    External { name: String },
}

impl Owner {
    pub fn company_id(&self) -> Option<CompanyId> {
        match self {
            Owner::Company { company_id } => Some(*company_id),
            _ => None,
        }
    }

    pub fn elevator_id(&self) -> Option<ElevatorId> {
        match self {
            Owner::Elevator { elevator_id } => Some(*elevator_id),
            _ => None,
        }
    }

    pub fn is_company(&self) -> bool {
        matches!(self, Owner::Company { .. })
    }
}
