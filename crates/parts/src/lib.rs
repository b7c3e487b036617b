//! `elevatorid-parts` — the Part aggregate.
//!
//! Pure decision logic for the part ownership & transfer ledger: the
//! registration, transfer and installation state machines, expressed as
//! commands handled by the [`Part`] aggregate and events applied to it.
//! No IO; persistence and read models live in `elevatorid-ledger`.

pub mod installation;
pub mod owner;
pub mod part;
pub mod transfer;

pub use installation::ActiveInstallation;
pub use owner::Owner;
pub use part::{
    ApproveTransfer, CreateTransfer, InstallPart, Part, PartAttributes, PartCommand, PartEvent,
    PartId, PartInstalled, PartRegistered, PartRemoved, PartReturnedToStock, RegisterPart,
    RejectTransfer, RemovePart, ReturnToStock, TransferApproved, TransferCreated,
    TransferRejected,
};
pub use transfer::{
    ApprovalMethod, Counterparty, PendingTransfer, TransferDirection, TransferId, TransferStatus,
};
