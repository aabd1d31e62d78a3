//! Narrow storage interfaces the services read and mutate through.
//!
//! Every mutation goes through `transact`: the closure sees the whole state under
//! the store's write lock and its changes are committed only if it returns `Ok`.
//! That is what serialises two sessions racing on the same item or user.

mod in_memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use laundrydesk_auth::{Directory, User};
use laundrydesk_core::{AdjustmentRequestId, DomainError, DomainResult, InventoryItemId};
use laundrydesk_inventory::{AdjustmentRequest, InventoryItem, RejectionAcknowledgements};

pub use in_memory::{InMemoryInventoryStore, InMemoryUserStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Items, adjustment requests and rejection acknowledgements, mutated as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryState {
    items: Vec<InventoryItem>,
    requests: Vec<AdjustmentRequest>,
    #[serde(default)]
    acknowledgements: RejectionAcknowledgements,
}

impl InventoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn item(&self, id: &InventoryItemId) -> Option<&InventoryItem> {
        self.items.iter().find(|item| item.id_typed() == *id)
    }

    pub fn item_mut(&mut self, id: &InventoryItemId) -> Option<&mut InventoryItem> {
        self.items.iter_mut().find(|item| item.id_typed() == *id)
    }

    pub fn insert_item(&mut self, item: InventoryItem) -> DomainResult<()> {
        if self.item(&item.id_typed()).is_some() {
            return Err(DomainError::conflict(format!(
                "inventory item {} already exists",
                item.id_typed()
            )));
        }
        self.items.push(item);
        Ok(())
    }

    /// Requests in creation order.
    pub fn requests(&self) -> &[AdjustmentRequest] {
        &self.requests
    }

    pub fn request(&self, id: &AdjustmentRequestId) -> Option<&AdjustmentRequest> {
        self.requests.iter().find(|r| r.id_typed() == *id)
    }

    pub fn requests_for_item(
        &self,
        item_id: InventoryItemId,
    ) -> impl Iterator<Item = &AdjustmentRequest> {
        self.requests
            .iter()
            .filter(move |r| r.inventory_item_id() == item_id)
    }

    pub fn pending_for(&self, item_id: &InventoryItemId) -> Option<&AdjustmentRequest> {
        self.requests_for_item(*item_id).find(|r| r.is_pending())
    }

    /// Add a new request, or replace the stored copy of an existing one.
    ///
    /// Refuses a request that was never submitted, a request for an unknown item
    /// and a second pending request on the same item.
    pub fn put_request(&mut self, request: AdjustmentRequest) -> DomainResult<()> {
        if !request.is_created() {
            return Err(DomainError::invalid_state(format!(
                "adjustment request {} was never submitted",
                request.id_typed()
            )));
        }
        let item_id = request.inventory_item_id();
        if self.item(&item_id).is_none() {
            return Err(DomainError::not_found(format!("inventory item {item_id}")));
        }
        if request.is_pending() {
            if let Some(other) = self.pending_for(&item_id) {
                if other.id_typed() != request.id_typed() {
                    return Err(DomainError::conflict(format!(
                        "inventory item {item_id} already has pending request {}",
                        other.id_typed()
                    )));
                }
            }
        }

        match self.requests.iter_mut().find(|r| r.id_typed() == request.id_typed()) {
            Some(slot) => *slot = request,
            None => self.requests.push(request),
        }
        Ok(())
    }

    pub fn acknowledgements(&self) -> &RejectionAcknowledgements {
        &self.acknowledgements
    }

    pub fn acknowledgements_mut(&mut self) -> &mut RejectionAcknowledgements {
        &mut self.acknowledgements
    }
}

/// Storage for inventory items and their adjustment requests.
pub trait InventoryStore: Send + Sync {
    /// Run `read` against a consistent view of the state.
    fn read<R>(&self, read: impl FnOnce(&InventoryState) -> R) -> Result<R, StoreError>;

    /// Run `work` as one atomic step. Nothing `work` changed is kept if it fails.
    fn transact<R, E>(
        &self,
        work: impl FnOnce(&mut InventoryState) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>;
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore,
{
    fn read<R>(&self, read: impl FnOnce(&InventoryState) -> R) -> Result<R, StoreError> {
        (**self).read(read)
    }

    fn transact<R, E>(
        &self,
        work: impl FnOnce(&mut InventoryState) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        (**self).transact(work)
    }
}

/// Storage for the user directory.
pub trait UserStore: Send + Sync {
    /// Immutable snapshot for policy decisions.
    fn snapshot(&self) -> Result<Directory, StoreError>;

    /// Run `work` as one atomic step over the user list. Nothing `work` changed is
    /// kept if it fails.
    fn transact<R, E>(&self, work: impl FnOnce(&mut Vec<User>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>;
}

impl<S> UserStore for Arc<S>
where
    S: UserStore,
{
    fn snapshot(&self) -> Result<Directory, StoreError> {
        (**self).snapshot()
    }

    fn transact<R, E>(&self, work: impl FnOnce(&mut Vec<User>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        (**self).transact(work)
    }
}
