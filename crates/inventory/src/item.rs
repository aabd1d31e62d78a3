use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use laundrydesk_core::{DomainError, DomainResult, Entity, InventoryItemId, require_text};

use crate::{AdjustmentRequest, AdjustmentStatus, InventoryHistoryEntry};

/// A stocked consumable (detergent, softener, hangers, ...).
///
/// `quantity` only ever moves through an approved adjustment request; every
/// resolved request, approved or rejected, is appended to `history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    id: InventoryItemId,
    name: String,
    unit: String,
    quantity: i64,
    low_stock_threshold: i64,
    #[serde(default)]
    history: Vec<InventoryHistoryEntry>,
}

impl InventoryItem {
    pub fn new(
        id: InventoryItemId,
        name: &str,
        unit: &str,
        quantity: i64,
        low_stock_threshold: i64,
    ) -> DomainResult<Self> {
        let name = require_text("name", name)?;
        let unit = require_text("unit", unit)?;
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if low_stock_threshold < 0 {
            return Err(DomainError::validation("low stock threshold cannot be negative"));
        }

        Ok(Self {
            id,
            name,
            unit,
            quantity,
            low_stock_threshold,
            history: Vec::new(),
        })
    }

    /// Accept an item read from seed or import data.
    ///
    /// Applies the same field rules as [`InventoryItem::new`] and checks that the
    /// history is one `record_resolution` could have built: resolved entries only,
    /// each request once, and `quantity` equal to the last approved target.
    pub fn restored(self) -> DomainResult<Self> {
        let mut item = Self::new(
            self.id,
            &self.name,
            &self.unit,
            self.quantity,
            self.low_stock_threshold,
        )?;

        let mut seen = HashSet::with_capacity(self.history.len());
        for entry in &self.history {
            if !entry.status.is_resolved() {
                return Err(DomainError::invalid_state(format!(
                    "history of {} records pending request {}",
                    item.name, entry.request_id
                )));
            }
            if entry.status == AdjustmentStatus::Approved && entry.new_quantity < 0 {
                return Err(DomainError::invariant(format!(
                    "history of {} approves negative stock",
                    item.name
                )));
            }
            if !seen.insert(entry.request_id) {
                return Err(DomainError::conflict(format!(
                    "history of {} records request {} twice",
                    item.name, entry.request_id
                )));
            }
        }

        let last_approved = self
            .history
            .iter()
            .rev()
            .find(|h| h.status == AdjustmentStatus::Approved);
        if let Some(entry) = last_approved {
            if entry.new_quantity != item.quantity {
                return Err(DomainError::invariant(format!(
                    "{} holds {} but its last approved adjustment set {}",
                    item.name, item.quantity, entry.new_quantity
                )));
            }
        }

        item.history = self.history;
        Ok(item)
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn low_stock_threshold(&self) -> i64 {
        self.low_stock_threshold
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    /// Audit trail in append (storage) order.
    pub fn history(&self) -> &[InventoryHistoryEntry] {
        &self.history
    }

    /// Audit trail with the most recent resolution first, for display.
    pub fn history_newest_first(&self) -> impl Iterator<Item = &InventoryHistoryEntry> {
        self.history.iter().rev()
    }

    /// Fold a resolved request into the item.
    ///
    /// Approved requests set `quantity` to the requested value; rejected ones leave
    /// it alone. Either way exactly one history entry is appended. Nothing is
    /// changed when an error is returned.
    pub fn record_resolution(&mut self, request: &AdjustmentRequest) -> DomainResult<&InventoryHistoryEntry> {
        if request.inventory_item_id() != self.id {
            return Err(DomainError::invariant("adjustment request targets another item"));
        }
        if self.history.iter().any(|h| h.request_id == request.id_typed()) {
            return Err(DomainError::conflict(format!(
                "adjustment request {} already recorded",
                request.id_typed()
            )));
        }
        let entry = InventoryHistoryEntry::from_request(request).ok_or_else(|| {
            DomainError::invalid_state(format!(
                "adjustment request {} is still pending",
                request.id_typed()
            ))
        })?;

        if request.status() == AdjustmentStatus::Approved {
            if request.requested_quantity() < 0 {
                return Err(DomainError::invariant("stock cannot go negative"));
            }
            self.quantity = request.requested_quantity();
        }

        self.history.push(entry);
        Ok(&self.history[self.history.len() - 1])
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use laundrydesk_core::{AdjustmentRequestId, Aggregate, UserId};
    use proptest::prelude::*;

    use crate::{AdjustmentCommand, ApproveAdjustment, RejectAdjustment, SubmitAdjustment};

    fn detergent(quantity: i64) -> InventoryItem {
        InventoryItem::new(InventoryItemId::new(), "Bột giặt", "kg", quantity, 5).unwrap()
    }

    fn pending_for(item: &InventoryItem, requested: i64) -> AdjustmentRequest {
        let request_id = AdjustmentRequestId::new();
        let mut request = AdjustmentRequest::empty(request_id);
        request
            .execute(&AdjustmentCommand::Submit(SubmitAdjustment {
                request_id,
                item_id: item.id_typed(),
                item_name: item.name().to_string(),
                requested_by: UserId::new(),
                current_quantity: item.quantity(),
                requested_quantity: requested,
                reason: "Nhập thêm".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        request
    }

    fn approve(request: &mut AdjustmentRequest) {
        request
            .execute(&AdjustmentCommand::Approve(ApproveAdjustment {
                request_id: request.id_typed(),
                responded_by: UserId::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
    }

    #[test]
    fn new_item_validates_fields() {
        assert!(InventoryItem::new(InventoryItemId::new(), " ", "kg", 1, 0).is_err());
        assert!(InventoryItem::new(InventoryItemId::new(), "Móc áo", "", 1, 0).is_err());
        assert!(InventoryItem::new(InventoryItemId::new(), "Móc áo", "cái", -1, 0).is_err());
    }

    #[test]
    fn low_stock_at_threshold() {
        assert!(detergent(5).is_low_stock());
        assert!(!detergent(6).is_low_stock());
    }

    #[test]
    fn approved_resolution_sets_quantity() {
        let mut item = detergent(10);
        let mut request = pending_for(&item, 15);
        approve(&mut request);

        let entry = item.record_resolution(&request).unwrap().clone();
        assert_eq!(item.quantity(), 15);
        assert_eq!(entry.previous_quantity, 10);
        assert_eq!(entry.new_quantity, 15);
        assert_eq!(entry.status, AdjustmentStatus::Approved);
        assert_eq!(item.history().len(), 1);
    }

    #[test]
    fn rejected_resolution_keeps_quantity() {
        let mut item = detergent(10);
        let mut request = pending_for(&item, 15);
        request
            .execute(&AdjustmentCommand::Reject(RejectAdjustment {
                request_id: request.id_typed(),
                responded_by: UserId::new(),
                rejection_reason: "Số liệu sai".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let entry = item.record_resolution(&request).unwrap();
        assert_eq!(entry.rejection_reason.as_deref(), Some("Số liệu sai"));
        assert_eq!(item.quantity(), 10);
    }

    #[test]
    fn pending_or_foreign_requests_are_refused() {
        let mut item = detergent(10);
        let pending = pending_for(&item, 12);
        assert!(matches!(
            item.record_resolution(&pending),
            Err(DomainError::InvalidState(_))
        ));

        let other = detergent(3);
        let mut foreign = pending_for(&other, 4);
        approve(&mut foreign);
        assert!(item.record_resolution(&foreign).is_err());
        assert!(item.history().is_empty());
    }

    #[test]
    fn same_request_is_recorded_once() {
        let mut item = detergent(10);
        let mut request = pending_for(&item, 11);
        approve(&mut request);
        item.record_resolution(&request).unwrap();
        assert!(matches!(
            item.record_resolution(&request),
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(item.history().len(), 1);
    }

    #[test]
    fn negative_approval_leaves_item_untouched() {
        let mut item = detergent(2);
        let mut request = pending_for(&item, -3);
        approve(&mut request);
        assert!(item.record_resolution(&request).is_err());
        assert_eq!(item.quantity(), 2);
        assert!(item.history().is_empty());
    }

    #[test]
    fn restored_item_applies_field_rules() {
        let mut value = serde_json::to_value(detergent(4)).unwrap();
        value["quantity"] = serde_json::json!(-1);
        let negative: InventoryItem = serde_json::from_value(value).unwrap();
        assert!(matches!(negative.restored(), Err(DomainError::Validation(_))));

        let mut value = serde_json::to_value(detergent(4)).unwrap();
        value["unit"] = serde_json::json!(" ");
        let unitless: InventoryItem = serde_json::from_value(value).unwrap();
        assert!(matches!(unitless.restored(), Err(DomainError::Validation(_))));

        let mut value = serde_json::to_value(detergent(4)).unwrap();
        value["lowStockThreshold"] = serde_json::json!(-2);
        let threshold: InventoryItem = serde_json::from_value(value).unwrap();
        assert!(threshold.restored().is_err());
    }

    #[test]
    fn restored_item_checks_history_against_quantity() {
        let mut item = detergent(10);
        let mut request = pending_for(&item, 15);
        approve(&mut request);
        item.record_resolution(&request).unwrap();
        assert_eq!(item.clone().restored().unwrap(), item);

        let mut value = serde_json::to_value(&item).unwrap();
        value["quantity"] = serde_json::json!(12);
        let drifted: InventoryItem = serde_json::from_value(value).unwrap();
        assert!(matches!(drifted.restored(), Err(DomainError::InvariantViolation(_))));

        let mut value = serde_json::to_value(&item).unwrap();
        let entry = value["history"][0].clone();
        value["history"].as_array_mut().unwrap().push(entry);
        let doubled: InventoryItem = serde_json::from_value(value).unwrap();
        assert!(matches!(doubled.restored(), Err(DomainError::Conflict(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: quantity always equals the last approved request's target,
        /// and history grows by exactly one entry per resolution.
        #[test]
        fn quantity_tracks_last_approval(
            start in 0i64..1_000,
            steps in prop::collection::vec((0i64..1_000, any::<bool>()), 1..20)
        ) {
            let mut item = detergent(start);
            let mut expected = start;

            for (i, (target, accept)) in steps.iter().enumerate() {
                let mut request = pending_for(&item, *target);
                if *accept {
                    approve(&mut request);
                    expected = *target;
                } else {
                    request.execute(&AdjustmentCommand::Reject(RejectAdjustment {
                        request_id: request.id_typed(),
                        responded_by: UserId::new(),
                        rejection_reason: "no".to_string(),
                        occurred_at: Utc::now(),
                    })).unwrap();
                }
                item.record_resolution(&request).unwrap();
                prop_assert_eq!(item.quantity(), expected);
                prop_assert_eq!(item.history().len(), i + 1);
            }

            let newest = item.history_newest_first().next().unwrap();
            prop_assert_eq!(newest, item.history().last().unwrap());
        }
    }
}
