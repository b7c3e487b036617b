use serde_json::Value as JsonValue;

use crate::EventEnvelope;

/// A projection folds published envelopes into a queryable read model.
///
/// Projections are the read side of the ledger: current owner, the transfer
/// index and the chain of custody are all folds over the part streams. Read
/// models are disposable: they can be deleted and rebuilt from the event
/// store at any time, because events are the source of truth.
///
/// Implementations must be **idempotent**: the bus delivers at-least-once,
/// so applying the same envelope twice must change nothing (typically via
/// per-stream sequence-number cursors). Envelopes carry their payload as
/// JSON; each projection deserializes the event types it folds.
pub trait Projection: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Apply one published envelope to the read model.
    ///
    /// Must be idempotent, and must scope all updates to the envelope's
    /// tenant (no cross-tenant leaks).
    fn apply(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), Self::Error>;
}
