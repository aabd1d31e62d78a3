//! Infrastructure layer: storage, services and configuration.
//!
//! The domain crates decide; this crate loads state, runs those decisions inside
//! store transactions, commits, and publishes what happened.

pub mod admin;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod store;
pub mod workflow;

pub use admin::{NewUser, UserAdministration};
pub use config::{ConfigError, SnapshotPolicy, WorkflowConfig};
pub use error::ServiceError;
pub use snapshot::{Snapshot, load_snapshot};
pub use store::{
    InMemoryInventoryStore, InMemoryUserStore, InventoryState, InventoryStore, StoreError,
    UserStore,
};
pub use workflow::InventoryAdjustmentWorkflow;
