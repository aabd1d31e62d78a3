use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use laundrydesk_core::{AdjustmentRequestId, UserId};

use crate::{AdjustmentRequest, AdjustmentStatus};

/// Immutable audit record of one resolved adjustment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryHistoryEntry {
    pub request_id: AdjustmentRequestId,
    pub previous_quantity: i64,
    /// The proposed quantity; for a rejected request this was never applied.
    pub new_quantity: i64,
    pub requested_by: UserId,
    pub responded_by: UserId,
    pub requested_at: DateTime<Utc>,
    pub responded_at: DateTime<Utc>,
    pub reason: String,
    pub status: AdjustmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl InventoryHistoryEntry {
    /// Derive the audit record. `None` while the request is still pending.
    pub fn from_request(request: &AdjustmentRequest) -> Option<Self> {
        if !request.status().is_resolved() {
            return None;
        }

        Some(Self {
            request_id: request.id_typed(),
            previous_quantity: request.current_quantity(),
            new_quantity: request.requested_quantity(),
            requested_by: request.requested_by(),
            responded_by: request.responded_by()?,
            requested_at: request.requested_at(),
            responded_at: request.responded_at()?,
            reason: request.reason().to_string(),
            status: request.status(),
            rejection_reason: request.rejection_reason().map(str::to_string),
        })
    }
}
