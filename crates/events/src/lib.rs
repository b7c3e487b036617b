//! `elevatorid-events` — event contracts and transport.
//!
//! Domain-agnostic pieces of the event-sourced ledger: the [`Event`] trait,
//! the tenant-scoped [`EventEnvelope`], the pub/sub [`EventBus`] contract
//! with its in-memory implementation, and the [`Projection`] read-model
//! trait.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod projection;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use projection::Projection;
