//! Inventory adjustment request: pending → approved | rejected.
//!
//! The request is the only way an item's authoritative quantity changes. It
//! snapshots the quantity it was raised against and resolves exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use laundrydesk_core::{
    AdjustmentRequestId, Aggregate, AggregateRoot, DomainError, InventoryItemId, UserId,
    require_text,
};
use laundrydesk_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl AdjustmentStatus {
    pub fn is_resolved(self) -> bool {
        !matches!(self, AdjustmentStatus::Pending)
    }
}

impl core::fmt::Display for AdjustmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AdjustmentStatus::Pending => f.write_str("pending"),
            AdjustmentStatus::Approved => f.write_str("approved"),
            AdjustmentStatus::Rejected => f.write_str("rejected"),
        }
    }
}

/// Aggregate root: a proposed change to one item's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    id: AdjustmentRequestId,
    inventory_item_id: InventoryItemId,
    /// Denormalised for display.
    inventory_item_name: String,
    requested_by: UserId,
    current_quantity: i64,
    requested_quantity: i64,
    reason: String,
    status: AdjustmentStatus,
    requested_at: DateTime<Utc>,
    responded_by: Option<UserId>,
    responded_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    /// Events applied. Absent in imported records; see [`AdjustmentRequest::restored`].
    #[serde(default)]
    version: u64,
}

impl AdjustmentRequest {
    /// Create an empty, not-yet-submitted aggregate instance.
    pub fn empty(id: AdjustmentRequestId) -> Self {
        Self {
            id,
            inventory_item_id: InventoryItemId::from_uuid(uuid::Uuid::nil()),
            inventory_item_name: String::new(),
            requested_by: UserId::from_uuid(uuid::Uuid::nil()),
            current_quantity: 0,
            requested_quantity: 0,
            reason: String::new(),
            status: AdjustmentStatus::Pending,
            requested_at: DateTime::<Utc>::default(),
            responded_by: None,
            responded_at: None,
            rejection_reason: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> AdjustmentRequestId {
        self.id
    }

    pub fn inventory_item_id(&self) -> InventoryItemId {
        self.inventory_item_id
    }

    pub fn inventory_item_name(&self) -> &str {
        &self.inventory_item_name
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    /// Item quantity at the moment the request was raised.
    pub fn current_quantity(&self) -> i64 {
        self.current_quantity
    }

    pub fn requested_quantity(&self) -> i64 {
        self.requested_quantity
    }

    /// Change an approver is authorising, relative to the snapshot.
    pub fn delta(&self) -> i64 {
        self.requested_quantity - self.current_quantity
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn status(&self) -> AdjustmentStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == AdjustmentStatus::Pending
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn responded_by(&self) -> Option<UserId> {
        self.responded_by
    }

    pub fn responded_at(&self) -> Option<DateTime<Utc>> {
        self.responded_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Whether the request exists (submitted, or loaded from a store).
    pub fn is_created(&self) -> bool {
        self.version > 0
    }

    /// Accept a request read from outside the aggregate (seed or import data).
    ///
    /// Checks that the record is one the commands could have produced and sets
    /// the version to at least the number of events its status implies, so a
    /// loaded pending request can still be approved or rejected.
    pub fn restored(mut self) -> Result<Self, DomainError> {
        require_text("reason", &self.reason)?;
        require_text("inventory item name", &self.inventory_item_name)?;

        let response = (self.responded_by, self.responded_at);
        let events = match (self.status, response, self.rejection_reason.as_deref()) {
            (AdjustmentStatus::Pending, (None, None), None) => 1,
            (AdjustmentStatus::Pending, _, _) => {
                return Err(DomainError::invalid_state(format!(
                    "pending adjustment request {} carries a response",
                    self.id
                )));
            }
            (AdjustmentStatus::Approved, (Some(_), Some(_)), None) => 2,
            (AdjustmentStatus::Rejected, (Some(_), Some(_)), Some(reason)) => {
                require_text("rejection reason", reason)?;
                2
            }
            (status, _, _) => {
                return Err(DomainError::invalid_state(format!(
                    "{status} adjustment request {} has an incomplete response",
                    self.id
                )));
            }
        };

        if let Some(responded_at) = self.responded_at {
            if responded_at < self.requested_at {
                return Err(DomainError::invariant(format!(
                    "adjustment request {} was answered before it was raised",
                    self.id
                )));
            }
        }

        self.version = self.version.max(events);
        Ok(self)
    }
}

impl AggregateRoot for AdjustmentRequest {
    type Id = AdjustmentRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitAdjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAdjustment {
    pub request_id: AdjustmentRequestId,
    pub item_id: InventoryItemId,
    pub item_name: String,
    pub requested_by: UserId,
    pub current_quantity: i64,
    pub requested_quantity: i64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveAdjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveAdjustment {
    pub request_id: AdjustmentRequestId,
    pub responded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectAdjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectAdjustment {
    pub request_id: AdjustmentRequestId,
    pub responded_by: UserId,
    pub rejection_reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentCommand {
    Submit(SubmitAdjustment),
    Approve(ApproveAdjustment),
    Reject(RejectAdjustment),
}

/// Event: AdjustmentRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequested {
    pub request_id: AdjustmentRequestId,
    pub item_id: InventoryItemId,
    pub item_name: String,
    pub requested_by: UserId,
    pub current_quantity: i64,
    pub requested_quantity: i64,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AdjustmentApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentApproved {
    pub request_id: AdjustmentRequestId,
    pub item_id: InventoryItemId,
    pub responded_by: UserId,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AdjustmentRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRejected {
    pub request_id: AdjustmentRequestId,
    pub item_id: InventoryItemId,
    pub requested_by: UserId,
    pub responded_by: UserId,
    pub rejection_reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdjustmentEvent {
    Requested(AdjustmentRequested),
    Approved(AdjustmentApproved),
    Rejected(AdjustmentRejected),
}

impl AdjustmentEvent {
    pub fn request_id(&self) -> AdjustmentRequestId {
        match self {
            AdjustmentEvent::Requested(e) => e.request_id,
            AdjustmentEvent::Approved(e) => e.request_id,
            AdjustmentEvent::Rejected(e) => e.request_id,
        }
    }
}

impl Event for AdjustmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AdjustmentEvent::Requested(_) => "inventory.adjustment.requested",
            AdjustmentEvent::Approved(_) => "inventory.adjustment.approved",
            AdjustmentEvent::Rejected(_) => "inventory.adjustment.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AdjustmentEvent::Requested(e) => e.occurred_at,
            AdjustmentEvent::Approved(e) => e.occurred_at,
            AdjustmentEvent::Rejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for AdjustmentRequest {
    type Command = AdjustmentCommand;
    type Event = AdjustmentEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AdjustmentEvent::Requested(e) => {
                self.id = e.request_id;
                self.inventory_item_id = e.item_id;
                self.inventory_item_name = e.item_name.clone();
                self.requested_by = e.requested_by;
                self.current_quantity = e.current_quantity;
                self.requested_quantity = e.requested_quantity;
                self.reason = e.reason.clone();
                self.status = AdjustmentStatus::Pending;
                self.requested_at = e.occurred_at;
            }
            AdjustmentEvent::Approved(e) => {
                self.status = AdjustmentStatus::Approved;
                self.responded_by = Some(e.responded_by);
                self.responded_at = Some(e.occurred_at);
            }
            AdjustmentEvent::Rejected(e) => {
                self.status = AdjustmentStatus::Rejected;
                self.responded_by = Some(e.responded_by);
                self.responded_at = Some(e.occurred_at);
                self.rejection_reason = Some(e.rejection_reason.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AdjustmentCommand::Submit(cmd) => self.handle_submit(cmd),
            AdjustmentCommand::Approve(cmd) => self.handle_approve(cmd),
            AdjustmentCommand::Reject(cmd) => self.handle_reject(cmd),
        }
    }
}

impl AdjustmentRequest {
    fn ensure_request_id(&self, request_id: AdjustmentRequestId) -> Result<(), DomainError> {
        if self.id != request_id {
            return Err(DomainError::invariant("request_id mismatch"));
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), DomainError> {
        if !self.is_created() {
            return Err(DomainError::not_found(format!("adjustment request {}", self.id)));
        }
        if self.status.is_resolved() {
            return Err(DomainError::invalid_state(format!(
                "adjustment request {} is already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitAdjustment) -> Result<Vec<AdjustmentEvent>, DomainError> {
        if self.is_created() {
            return Err(DomainError::conflict("adjustment request already exists"));
        }
        self.ensure_request_id(cmd.request_id)?;
        let reason = require_text("reason", &cmd.reason)?;

        Ok(vec![AdjustmentEvent::Requested(AdjustmentRequested {
            request_id: cmd.request_id,
            item_id: cmd.item_id,
            item_name: cmd.item_name.clone(),
            requested_by: cmd.requested_by,
            current_quantity: cmd.current_quantity,
            requested_quantity: cmd.requested_quantity,
            reason,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveAdjustment) -> Result<Vec<AdjustmentEvent>, DomainError> {
        self.ensure_request_id(cmd.request_id)?;
        self.ensure_pending()?;

        Ok(vec![AdjustmentEvent::Approved(AdjustmentApproved {
            request_id: cmd.request_id,
            item_id: self.inventory_item_id,
            responded_by: cmd.responded_by,
            previous_quantity: self.current_quantity,
            new_quantity: self.requested_quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectAdjustment) -> Result<Vec<AdjustmentEvent>, DomainError> {
        self.ensure_request_id(cmd.request_id)?;
        let rejection_reason = require_text("rejection reason", &cmd.rejection_reason)?;
        self.ensure_pending()?;

        Ok(vec![AdjustmentEvent::Rejected(AdjustmentRejected {
            request_id: cmd.request_id,
            item_id: self.inventory_item_id,
            requested_by: self.requested_by,
            responded_by: cmd.responded_by,
            rejection_reason,
            occurred_at: cmd.occurred_at,
        })])
    }
}
