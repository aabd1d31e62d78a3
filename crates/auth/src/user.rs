//! User entity: any actor of the console, staff member or customer.

use serde::{Deserialize, Serialize};

use laundrydesk_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

/// A user of the console.
///
/// # Invariants
/// - `managed_by`, when set, points at a user exactly one level more senior
///   (Owner⇐Chairman, Manager⇐Owner, Staff⇐Manager).
/// - A Chairman has no manager; a Customer has no manager and no reports.
/// - Following `managed_by` links never cycles.
///
/// The last two are directory-wide properties, checked by
/// [`Directory::validate`](crate::Directory::validate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub role: Role,
    #[serde(default)]
    pub managed_by: Option<UserId>,
    pub name: String,
    pub username: String,
}

impl User {
    pub fn new(id: UserId, role: Role, name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id,
            role,
            managed_by: None,
            name: name.into(),
            username: username.into(),
        }
    }

    pub fn with_manager(mut self, manager: UserId) -> Self {
        self.managed_by = Some(manager);
        self
    }

    pub fn is_managed_by(&self, manager: &UserId) -> bool {
        self.managed_by.as_ref() == Some(manager)
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Check that a user holding `role` may report to `manager`.
pub fn validate_reporting_line(role: Role, manager: Option<&User>) -> DomainResult<()> {
    match (role.expected_manager(), manager) {
        (None, None) => Ok(()),
        (None, Some(m)) => Err(DomainError::invariant(format!(
            "{role} cannot report to anyone (got {})",
            m.role
        ))),
        (Some(expected), Some(m)) if m.role == expected => Ok(()),
        (Some(expected), Some(m)) => Err(DomainError::invariant(format!(
            "{role} must report to {expected}, not {}",
            m.role
        ))),
        (Some(expected), None) => Err(DomainError::invariant(format!(
            "{role} must report to {expected}"
        ))),
    }
}
