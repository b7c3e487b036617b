//! Ports to the surrounding platform: the company directory and the
//! elevator registry.
//!
//! The ledger validates counterparties and installation targets against
//! these, but does not own them. In-memory implementations back the tests;
//! a deployment wires real lookups behind the same traits.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use elevatorid_core::{CompanyId, ElevatorId, TenantId, UserId};

/// Directory record for a registered company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRecord {
    pub company_id: CompanyId,
    pub name: String,
    /// Registered CEO contact, matched against phone confirmations.
    pub ceo_phone: Option<String>,
    pub trade_registry_id: Option<String>,
}

/// Lookup port into the company directory.
pub trait CompanyDirectory: Send + Sync {
    fn company(&self, tenant_id: TenantId, company_id: CompanyId) -> Option<CompanyRecord>;

    /// Whether `user_id` belongs to `company_id` within the tenant.
    fn is_company_user(&self, tenant_id: TenantId, company_id: CompanyId, user_id: UserId)
    -> bool;
}

/// Existence-check port into the elevator registry.
pub trait ElevatorRegistry: Send + Sync {
    fn exists(&self, tenant_id: TenantId, elevator_id: ElevatorId) -> bool;
}

impl<T> CompanyDirectory for Arc<T>
where
    T: CompanyDirectory + ?Sized,
{
    fn company(&self, tenant_id: TenantId, company_id: CompanyId) -> Option<CompanyRecord> {
        (**self).company(tenant_id, company_id)
    }

    fn is_company_user(
        &self,
        tenant_id: TenantId,
        company_id: CompanyId,
        user_id: UserId,
    ) -> bool {
        (**self).is_company_user(tenant_id, company_id, user_id)
    }
}

impl<T> ElevatorRegistry for Arc<T>
where
    T: ElevatorRegistry + ?Sized,
{
    fn exists(&self, tenant_id: TenantId, elevator_id: ElevatorId) -> bool {
        (**self).exists(tenant_id, elevator_id)
    }
}

/// In-memory company directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCompanyDirectory {
    companies: RwLock<HashMap<(TenantId, CompanyId), CompanyRecord>>,
    users: RwLock<HashSet<(TenantId, CompanyId, UserId)>>,
}

impl InMemoryCompanyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_company(&self, tenant_id: TenantId, record: CompanyRecord) {
        if let Ok(mut companies) = self.companies.write() {
            companies.insert((tenant_id, record.company_id), record);
        }
    }

    pub fn add_user(&self, tenant_id: TenantId, company_id: CompanyId, user_id: UserId) {
        if let Ok(mut users) = self.users.write() {
            users.insert((tenant_id, company_id, user_id));
        }
    }
}

impl CompanyDirectory for InMemoryCompanyDirectory {
    fn company(&self, tenant_id: TenantId, company_id: CompanyId) -> Option<CompanyRecord> {
        let companies = self.companies.read().ok()?;
        companies.get(&(tenant_id, company_id)).cloned()
    }

    fn is_company_user(
        &self,
        tenant_id: TenantId,
        company_id: CompanyId,
        user_id: UserId,
    ) -> bool {
        self.users
            .read()
            .map(|users| users.contains(&(tenant_id, company_id, user_id)))
            .unwrap_or(false)
    }
}

/// In-memory elevator registry for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryElevatorRegistry {
    elevators: RwLock<HashSet<(TenantId, ElevatorId)>>,
}

impl InMemoryElevatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_elevator(&self, tenant_id: TenantId, elevator_id: ElevatorId) {
        if let Ok(mut elevators) = self.elevators.write() {
            elevators.insert((tenant_id, elevator_id));
        }
    }
}

impl ElevatorRegistry for InMemoryElevatorRegistry {
    fn exists(&self, tenant_id: TenantId, elevator_id: ElevatorId) -> bool {
        self.elevators
            .read()
            .map(|e| e.contains(&(tenant_id, elevator_id)))
            .unwrap_or(false)
    }
}
