//! Read-model projections over the part event streams.
//!
//! Projections are disposable: each can be rebuilt from scratch by replaying
//! the event store. They consume the same published envelopes the
//! notification sink sees, enforce tenant isolation, and are idempotent
//! under at-least-once delivery.

pub mod provenance;
pub mod transfer_index;

pub use provenance::{
    CustodyEntry, CustodyEvent, InstallationRecord, PartProvenance, ProvenanceError,
    ProvenanceProjection,
};
pub use transfer_index::{TransferIndexError, TransferIndexProjection, TransferRecord};
