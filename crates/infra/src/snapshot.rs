//! Seed/import data loading.
//!
//! Imported directories may break hierarchy invariants (a second chairman, a
//! staff member reporting to an owner, ...). Those are logged and loaded as-is;
//! the policy stays safe on malformed trees. Inventory data the workflow could
//! never have produced is refused.

use std::collections::HashSet;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use laundrydesk_auth::{Directory, DirectoryViolation, User};
use laundrydesk_core::{DomainError, DomainResult};
use laundrydesk_inventory::{AdjustmentRequest, InventoryHistoryEntry, InventoryItem};

use crate::store::{InMemoryInventoryStore, InMemoryUserStore, InventoryState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    #[serde(default)]
    pub adjustment_requests: Vec<AdjustmentRequest>,
}

impl Snapshot {
    pub fn directory(&self) -> Directory {
        Directory::from_users(self.users.iter().cloned())
    }

    /// Build the inventory state, refusing duplicates, orphans and double pendings.
    ///
    /// Every item and request goes through its field rules, and each resolved
    /// request must match its item's history entry one for one.
    pub fn inventory_state(&self) -> anyhow::Result<InventoryState> {
        let mut state = InventoryState::new();
        for item in &self.inventory {
            let item = item
                .clone()
                .restored()
                .with_context(|| format!("importing inventory item {:?}", item.name()))?;
            state
                .insert_item(item)
                .context("importing inventory item")?;
        }

        let mut seen = HashSet::with_capacity(self.adjustment_requests.len());
        for request in &self.adjustment_requests {
            let context = || format!("importing adjustment request {}", request.id_typed());
            let request = request.clone().restored().with_context(context)?;
            if !seen.insert(request.id_typed()) {
                bail!("adjustment request {} is listed twice", request.id_typed());
            }
            if let Some(item) = state.item(&request.inventory_item_id()) {
                check_history(item, &request).with_context(context)?;
            }
            state.put_request(request).with_context(context)?;
        }

        for item in state.items() {
            if let Some(entry) = item.history().iter().find(|h| !seen.contains(&h.request_id)) {
                bail!(
                    "history of {:?} records unknown adjustment request {}",
                    item.name(),
                    entry.request_id
                );
            }
        }
        Ok(state)
    }

    pub fn into_stores(self) -> anyhow::Result<(InMemoryUserStore, InMemoryInventoryStore)> {
        let state = self.inventory_state()?;
        Ok((
            InMemoryUserStore::with_users(self.users),
            InMemoryInventoryStore::with_state(state),
        ))
    }
}

/// Parse a snapshot, logging every directory violation it carries.
pub fn load_snapshot(json: &str) -> anyhow::Result<Snapshot> {
    let snapshot: Snapshot = serde_json::from_str(json).context("parsing snapshot json")?;

    let violations = snapshot.directory().validate();
    for violation in &violations {
        log_violation(violation);
    }
    if snapshot.users.is_empty() {
        bail!("snapshot has no users");
    }

    // Surface inventory problems at load time rather than on first seeding.
    snapshot.inventory_state()?;

    tracing::info!(
        users = snapshot.users.len(),
        items = snapshot.inventory.len(),
        requests = snapshot.adjustment_requests.len(),
        violations = violations.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// A request's history entry must exist exactly when it is resolved.
fn check_history(item: &InventoryItem, request: &AdjustmentRequest) -> DomainResult<()> {
    let recorded = item
        .history()
        .iter()
        .find(|h| h.request_id == request.id_typed());
    match (InventoryHistoryEntry::from_request(request), recorded) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(DomainError::invalid_state(format!(
            "request {} is pending but {} already records it",
            request.id_typed(),
            item.name()
        ))),
        (Some(_), None) => Err(DomainError::invariant(format!(
            "resolved request {} is missing from the history of {}",
            request.id_typed(),
            item.name()
        ))),
        (Some(expected), Some(entry)) if expected != *entry => Err(DomainError::invariant(format!(
            "history of {} disagrees with request {}",
            item.name(),
            request.id_typed()
        ))),
        (Some(_), Some(_)) => Ok(()),
    }
}

fn log_violation(violation: &DirectoryViolation) {
    tracing::warn!(violation = %violation, "imported directory breaks a hierarchy rule");
}

#[cfg(test)]
mod tests {
    use super::*;
    use laundrydesk_auth::Role;
    use laundrydesk_core::UserId;
    use crate::store::UserStore;

    fn user_json(id: UserId, role: &str, managed_by: Option<UserId>) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "role": role,
            "managedBy": managed_by,
            "name": role,
            "username": format!("{role}-{id}"),
        })
    }

    #[test]
    fn loads_users_and_items() {
        let chairman = UserId::new();
        let owner = UserId::new();
        let json = serde_json::json!({
            "users": [
                user_json(chairman, "chairman", None),
                user_json(owner, "owner", Some(chairman)),
            ],
            "inventory": [{
                "id": laundrydesk_core::InventoryItemId::new(),
                "name": "Nước xả",
                "unit": "l",
                "quantity": 4,
                "lowStockThreshold": 5,
            }],
        })
        .to_string();

        let snapshot = load_snapshot(&json).unwrap();
        assert_eq!(snapshot.users.len(), 2);
        assert!(snapshot.inventory[0].is_low_stock());

        let (users, _) = snapshot.into_stores().unwrap();
        let dir = users.snapshot().unwrap();
        assert_eq!(dir.get(&owner).unwrap().role, Role::Owner);
    }

    #[test]
    fn hierarchy_violations_do_not_block_loading() {
        let owner = UserId::new();
        let json = serde_json::json!({
            "users": [
                user_json(owner, "owner", None),
                user_json(UserId::new(), "staff", Some(owner)),
            ],
        })
        .to_string();

        let snapshot = load_snapshot(&json).unwrap();
        assert!(!snapshot.directory().validate().is_empty());
    }

    #[test]
    fn malformed_json_carries_context() {
        let err = load_snapshot("{ not json").unwrap_err();
        assert!(format!("{err:#}").contains("parsing snapshot json"));
    }

    #[test]
    fn empty_directory_is_refused() {
        assert!(load_snapshot("{}").is_err());
    }
}
