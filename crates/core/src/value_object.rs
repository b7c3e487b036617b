//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values alone;
/// identity does not matter. `PartAttributes` or a counterparty reference are
/// value objects, a `PartTransfer` (which has an id) is an entity.
///
/// To "modify" a value object, build a new one with the new values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
