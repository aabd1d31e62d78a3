//! Inventory domain module.
//!
//! Business rules for stocked consumables and the adjustment approval process,
//! implemented as deterministic domain logic (no IO, no storage).

pub mod acknowledgement;
pub mod adjustment;
pub mod history;
pub mod item;

pub use acknowledgement::RejectionAcknowledgements;
pub use adjustment::{
    AdjustmentApproved, AdjustmentCommand, AdjustmentEvent, AdjustmentRejected,
    AdjustmentRequest, AdjustmentRequested, AdjustmentStatus, ApproveAdjustment,
    RejectAdjustment, SubmitAdjustment,
};
pub use history::InventoryHistoryEntry;
pub use item::InventoryItem;
