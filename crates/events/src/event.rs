use chrono::{DateTime, Utc};

/// A fact recorded in a part's history.
///
/// Everything the ledger knows about a part is a sequence of these: who
/// registered it, every transfer opened and settled, every installation and
/// removal. Events are immutable once appended, and their `event_type` is a
/// stable dotted name (`"parts.transfer.approved"`) that survives renames of
/// the Rust types carrying them.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "parts.transfer.approved").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type. Bump only on an incompatible
    /// payload change; readers use it to pick a decoder.
    fn version(&self) -> u32 {
        1
    }

    /// When the fact occurred (business time, not append time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
