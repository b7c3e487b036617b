//! Value types of the installation ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use elevatorid_core::{CompanyId, ElevatorId, ValueObject};

/// The currently active installation of a part, if any.
///
/// Installation is distinct from ownership: installing fixes the part into
/// one specific elevator, and at most one installation is active per part at
/// a time. Historical (removed) installations live in the provenance read
/// model, not in aggregate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveInstallation {
    pub elevator_id: ElevatorId,
    pub installer_company_id: CompanyId,
    pub installed_at: DateTime<Utc>,
}

impl ValueObject for ActiveInstallation {}
