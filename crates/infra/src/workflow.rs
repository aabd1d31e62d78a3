//! Inventory adjustment approval workflow.
//!
//! Each mutation follows the same shape:
//! 1) resolve the acting user against a fresh directory snapshot and authorize
//! 2) inside one store transaction: load, run the request aggregate, fold the
//!    outcome into the item, write back
//! 3) after commit, publish the produced events (best-effort)

use chrono::Utc;

use laundrydesk_auth::{AuthorizationPolicy, Directory, Operation, User};
use laundrydesk_core::{
    AdjustmentRequestId, Aggregate, DomainError, InventoryItemId, UserId, require_text,
};
use laundrydesk_events::{Event, EventBus, Subscription};
use laundrydesk_inventory::{
    AdjustmentCommand, AdjustmentEvent, AdjustmentRequest, AdjustmentStatus, ApproveAdjustment,
    InventoryItem, RejectAdjustment, SubmitAdjustment,
};

use crate::config::{SnapshotPolicy, WorkflowConfig};
use crate::error::ServiceError;
use crate::store::{InventoryState, InventoryStore, UserStore};

pub struct InventoryAdjustmentWorkflow<I, U, B> {
    inventory: I,
    users: U,
    bus: B,
    config: WorkflowConfig,
}

impl<I, U, B> InventoryAdjustmentWorkflow<I, U, B>
where
    I: InventoryStore,
    U: UserStore,
    B: EventBus<AdjustmentEvent>,
{
    pub fn new(inventory: I, users: U, bus: B, config: WorkflowConfig) -> Self {
        Self {
            inventory,
            users,
            bus,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Subscribe to adjustment events published after each committed change.
    pub fn subscribe(&self) -> Subscription<AdjustmentEvent> {
        self.bus.subscribe()
    }

    /// Propose a new quantity for an item. The item itself is not touched.
    #[tracing::instrument(skip_all, fields(item_id = %item_id, acting = %acting.id))]
    pub fn request_adjustment(
        &self,
        item_id: InventoryItemId,
        requested_quantity: i64,
        reason: &str,
        acting: &User,
    ) -> Result<AdjustmentRequest, ServiceError> {
        let requester = self.authorize(acting, Operation::RequestAdjustments)?;
        let reason = require_text("reason", reason)?;
        let occurred_at = Utc::now();

        let (request, events) =
            self.inventory
                .transact(|state: &mut InventoryState| -> Result<_, ServiceError> {
                    let item = state
                        .item(&item_id)
                        .ok_or_else(|| DomainError::not_found(format!("inventory item {item_id}")))?;
                    if let Some(pending) = state.pending_for(&item_id) {
                        return Err(DomainError::conflict(format!(
                            "{} already has pending adjustment request {}",
                            item.name(),
                            pending.id_typed()
                        ))
                        .into());
                    }

                    let request_id = AdjustmentRequestId::new();
                    let mut request = AdjustmentRequest::empty(request_id);
                    let events = request.execute(&AdjustmentCommand::Submit(SubmitAdjustment {
                        request_id,
                        item_id,
                        item_name: item.name().to_string(),
                        requested_by: requester.id,
                        current_quantity: item.quantity(),
                        requested_quantity,
                        reason,
                        occurred_at,
                    }))?;

                    state.put_request(request.clone())?;
                    Ok((request, events))
                })?;

        tracing::info!(
            request_id = %request.id_typed(),
            current_quantity = request.current_quantity(),
            requested_quantity = request.requested_quantity(),
            "inventory adjustment requested"
        );
        self.publish(events);
        Ok(request)
    }

    /// Apply a pending request: the item takes the requested quantity.
    #[tracing::instrument(skip_all, fields(request_id = %request_id, acting = %acting.id))]
    pub fn approve_adjustment(
        &self,
        request_id: AdjustmentRequestId,
        acting: &User,
    ) -> Result<AdjustmentRequest, ServiceError> {
        let reviewer = self.authorize(acting, Operation::ReviewAdjustments)?;
        let snapshot_policy = self.config.snapshot_policy;
        let occurred_at = Utc::now();

        let (request, events) =
            self.inventory
                .transact(|state: &mut InventoryState| -> Result<_, ServiceError> {
                    let mut request = Self::load_request(state, request_id)?;
                    let events = request.execute(&AdjustmentCommand::Approve(ApproveAdjustment {
                        request_id,
                        responded_by: reviewer.id,
                        occurred_at,
                    }))?;

                    let item_id = request.inventory_item_id();
                    let item = state
                        .item_mut(&item_id)
                        .ok_or_else(|| DomainError::not_found(format!("inventory item {item_id}")))?;
                    if snapshot_policy == SnapshotPolicy::Strict
                        && item.quantity() != request.current_quantity()
                    {
                        return Err(DomainError::conflict(format!(
                            "{} changed from {} to {} since the request was raised",
                            item.name(),
                            request.current_quantity(),
                            item.quantity()
                        ))
                        .into());
                    }
                    if item.quantity() != request.current_quantity() {
                        tracing::warn!(
                            snapshot = request.current_quantity(),
                            actual = item.quantity(),
                            "approving over a stale quantity snapshot"
                        );
                    }

                    item.record_resolution(&request)?;
                    state.put_request(request.clone())?;
                    Ok((request, events))
                })?;

        tracing::info!(
            item_id = %request.inventory_item_id(),
            new_quantity = request.requested_quantity(),
            "inventory adjustment approved"
        );
        self.publish(events);
        Ok(request)
    }

    /// Close a pending request without touching the item's quantity.
    #[tracing::instrument(skip_all, fields(request_id = %request_id, acting = %acting.id))]
    pub fn reject_adjustment(
        &self,
        request_id: AdjustmentRequestId,
        rejection_reason: &str,
        acting: &User,
    ) -> Result<AdjustmentRequest, ServiceError> {
        let reviewer = self.authorize(acting, Operation::ReviewAdjustments)?;
        let rejection_reason = require_text("rejection reason", rejection_reason)?;
        let occurred_at = Utc::now();

        let (request, events) =
            self.inventory
                .transact(|state: &mut InventoryState| -> Result<_, ServiceError> {
                    let mut request = Self::load_request(state, request_id)?;
                    let events = request.execute(&AdjustmentCommand::Reject(RejectAdjustment {
                        request_id,
                        responded_by: reviewer.id,
                        rejection_reason,
                        occurred_at,
                    }))?;

                    let item_id = request.inventory_item_id();
                    state
                        .item_mut(&item_id)
                        .ok_or_else(|| DomainError::not_found(format!("inventory item {item_id}")))?
                        .record_resolution(&request)?;
                    state.put_request(request.clone())?;
                    Ok((request, events))
                })?;

        tracing::info!(
            item_id = %request.inventory_item_id(),
            requested_by = %request.requested_by(),
            "inventory adjustment rejected"
        );
        self.publish(events);
        Ok(request)
    }

    /// Hide one of the acting user's rejected requests from their notices.
    ///
    /// Returns `false` when nothing changed: already acknowledged, not rejected, or
    /// not raised by `acting`.
    #[tracing::instrument(skip_all, fields(request_id = %request_id, acting = %acting.id))]
    pub fn acknowledge_rejection(
        &self,
        request_id: AdjustmentRequestId,
        acting: &User,
    ) -> Result<bool, ServiceError> {
        let user_id = acting.id;
        self.inventory
            .transact(|state: &mut InventoryState| -> Result<_, ServiceError> {
                let request = Self::load_request(state, request_id)?;
                if request.requested_by() != user_id || request.status() != AdjustmentStatus::Rejected
                {
                    return Ok(false);
                }
                Ok(state.acknowledgements_mut().acknowledge(user_id, request_id))
            })
    }

    /// Acknowledge every rejection of the acting user's requests on one item.
    /// Returns how many were newly acknowledged.
    #[tracing::instrument(skip_all, fields(item_id = %item_id, acting = %acting.id))]
    pub fn acknowledge_all_rejections_for_item(
        &self,
        item_id: InventoryItemId,
        acting: &User,
    ) -> Result<usize, ServiceError> {
        let user_id = acting.id;
        let acknowledged = self
            .inventory
            .transact(|state: &mut InventoryState| -> Result<_, ServiceError> {
                if state.item(&item_id).is_none() {
                    return Err(DomainError::not_found(format!("inventory item {item_id}")).into());
                }
                let rejected: Vec<AdjustmentRequestId> = state
                    .requests_for_item(item_id)
                    .filter(|r| r.requested_by() == user_id && r.status() == AdjustmentStatus::Rejected)
                    .map(|r| r.id_typed())
                    .collect();

                let acks = state.acknowledgements_mut();
                let mut count = 0;
                for request_id in rejected {
                    if acks.acknowledge(user_id, request_id) {
                        count += 1;
                    }
                }
                Ok(count)
            })?;

        tracing::debug!(acknowledged, "rejections acknowledged");
        Ok(acknowledged)
    }

    pub fn get_pending_request_for_item(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Option<AdjustmentRequest>, ServiceError> {
        Ok(self.inventory.read(|state| state.pending_for(&item_id).cloned())?)
    }

    /// Rejected requests raised by `user_id` that they have not acknowledged yet.
    pub fn get_unacknowledged_rejections_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AdjustmentRequest>, ServiceError> {
        Ok(self.inventory.read(|state| {
            state
                .acknowledgements()
                .unacknowledged_for(user_id, state.requests())
                .cloned()
                .collect()
        })?)
    }

    /// Every request ever raised for the item, oldest first.
    pub fn requests_for_item(
        &self,
        item_id: InventoryItemId,
    ) -> Result<Vec<AdjustmentRequest>, ServiceError> {
        Ok(self
            .inventory
            .read(|state| state.requests_for_item(item_id).cloned().collect())?)
    }

    pub fn item(&self, item_id: InventoryItemId) -> Result<Option<InventoryItem>, ServiceError> {
        Ok(self.inventory.read(|state| state.item(&item_id).cloned())?)
    }

    /// Items at or below their low-stock threshold.
    pub fn low_stock_items(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        Ok(self.inventory.read(|state| {
            state
                .items()
                .iter()
                .filter(|item| item.is_low_stock())
                .cloned()
                .collect()
        })?)
    }

    /// Re-read the acting user from the directory and check `operation` against
    /// their stored role, not the one the caller's session carries.
    fn authorize(&self, acting: &User, operation: Operation<'_>) -> Result<User, ServiceError> {
        let directory = self.users.snapshot()?;
        let current = current_user(&directory, acting)?;
        AuthorizationPolicy::new(&directory).authorize(current, operation)?;
        Ok(current.clone())
    }

    fn load_request(
        state: &InventoryState,
        request_id: AdjustmentRequestId,
    ) -> Result<AdjustmentRequest, ServiceError> {
        state
            .request(&request_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("adjustment request {request_id}")).into())
    }

    fn publish(&self, events: Vec<AdjustmentEvent>) {
        for event in events {
            let event_type = event.event_type();
            if let Err(error) = self.bus.publish(event) {
                tracing::warn!(event_type, error = ?error, "failed to publish adjustment event");
            }
        }
    }
}

pub(crate) fn current_user<'d>(directory: &'d Directory, acting: &User) -> Result<&'d User, ServiceError> {
    directory.get(&acting.id).ok_or_else(|| {
        DomainError::forbidden(format!("user {} is not in the directory", acting.id)).into()
    })
}
