//! Event-sourced part ledger: event store, command pipeline, projections
//! and the service facade.
//!
//! The write side is an append-only event store with optimistic concurrency;
//! the read side is a set of disposable projections rebuilt from the same
//! streams. [`service::PartLedger`] ties both together behind the operations
//! the outer surfaces call.

pub mod command_dispatcher;
pub mod directory;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod service;

#[cfg(test)]
mod integration_tests;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use directory::{
    CompanyDirectory, CompanyRecord, ElevatorRegistry, InMemoryCompanyDirectory,
    InMemoryElevatorRegistry,
};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use projections::{
    CustodyEntry, CustodyEvent, InstallationRecord, PartProvenance, ProvenanceProjection,
    TransferIndexProjection, TransferRecord,
};
pub use read_model::{InMemoryTenantStore, TenantStore};
pub use service::{
    CreateTransferInput, LedgerError, LedgerResult, PartLedger, RegisterPartInput,
    PART_AGGREGATE_TYPE,
};
