//! Typed authorization at mutation commit points, plus decision explanations.
//!
//! The boolean predicates on [`AuthorizationPolicy`] gate UI affordances; services
//! call [`AuthorizationPolicy::authorize`] again right before committing a change
//! and get a typed [`AuthzError`] to translate into a user-facing message.

use serde::Serialize;
use thiserror::Error;

use laundrydesk_core::{DomainError, UserId};

use crate::{AuthorizationPolicy, Role, User};

/// An operation subject to the role-scoped policy.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'u> {
    /// Give a role to a new or existing user.
    AssignRole(Role),
    EditUser(&'u User),
    DeleteUser(&'u User),
    /// Create a subordinate directly under the given host.
    AddSubordinate(&'u User),
    ReassignManager {
        target: &'u User,
        new_manager: &'u User,
    },
    /// Raise an inventory adjustment request.
    RequestAdjustments,
    /// Approve or reject inventory adjustments.
    ReviewAdjustments,
}

impl Operation<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::AssignRole(_) => "assign_role",
            Operation::EditUser(_) => "edit_user",
            Operation::DeleteUser(_) => "delete_user",
            Operation::AddSubordinate(_) => "add_subordinate",
            Operation::ReassignManager { .. } => "reassign_manager",
            Operation::RequestAdjustments => "request_adjustments",
            Operation::ReviewAdjustments => "review_adjustments",
        }
    }
}

/// Why a policy check denied an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// The operation may not target the acting user.
    SelfAction,
    /// Deleting the last remaining chairman.
    LastChairman,
    /// The role is outside the acting user's grant.
    RoleNotAssignable,
    /// The acting user's role does not carry this capability at all.
    InsufficientRole,
    /// The acting user is not above the target in the management chain.
    OutsideChain,
    /// Managers act only on their direct staff reports.
    NotDirectReport,
    /// The host's role cannot have subordinates.
    HostCannotManage,
    /// The resulting reporting line would break the hierarchy.
    InvalidReportingLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Denial {
    pub(crate) kind: DenialKind,
    pub(crate) message: String,
}

/// Outcome of a single policy decision: the grant reason or the denial.
pub(crate) type Decision = Result<&'static str, Denial>;

pub(crate) fn deny(kind: DenialKind, message: impl Into<String>) -> Decision {
    Err(Denial {
        kind,
        message: message.into(),
    })
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {operation}: {message}")]
    Forbidden {
        operation: &'static str,
        kind: DenialKind,
        message: String,
    },
}

impl AuthzError {
    pub fn kind(&self) -> DenialKind {
        match self {
            AuthzError::Forbidden { kind, .. } => *kind,
        }
    }
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden {
                operation, message, ..
            } => DomainError::forbidden(format!("{operation}: {message}")),
        }
    }
}

/// Auditable account of one authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationExplanation {
    pub operation: &'static str,
    pub acting_user: UserId,
    pub acting_role: Role,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub denial_kind: Option<DenialKind>,
}

impl AuthorizationPolicy<'_> {
    /// Check `operation` and turn a denial into a typed error.
    pub fn authorize(&self, acting: &User, operation: Operation<'_>) -> Result<(), AuthzError> {
        self.decide(acting, &operation)
            .map(|_| ())
            .map_err(|denial| AuthzError::Forbidden {
                operation: operation.name(),
                kind: denial.kind,
                message: denial.message,
            })
    }

    /// Explain why `operation` would be allowed or denied for `acting`.
    pub fn explain(&self, acting: &User, operation: Operation<'_>) -> AuthorizationExplanation {
        let (granted, reason, denial_kind) = match self.decide(acting, &operation) {
            Ok(reason) => (true, reason.to_string(), None),
            Err(denial) => (false, denial.message, Some(denial.kind)),
        };

        AuthorizationExplanation {
            operation: operation.name(),
            acting_user: acting.id,
            acting_role: acting.role,
            granted,
            reason,
            denial_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Directory;

    fn user(role: Role) -> User {
        User::new(UserId::new(), role, "Test", "test")
    }

    #[test]
    fn authorize_maps_denial_to_typed_error() {
        let chairman = user(Role::Chairman);
        let dir = Directory::from_users([chairman.clone()]);
        let policy = AuthorizationPolicy::new(&dir);

        let err = policy
            .authorize(&chairman, Operation::DeleteUser(&chairman))
            .unwrap_err();
        assert_eq!(err.kind(), DenialKind::SelfAction);

        let domain: DomainError = err.into();
        assert!(matches!(domain, DomainError::Forbidden(ref msg) if msg.starts_with("delete_user")));
    }

    #[test]
    fn authorize_passes_granted_operations() {
        let owner = user(Role::Owner);
        let dir = Directory::from_users([owner.clone()]);
        let policy = AuthorizationPolicy::new(&dir);

        assert!(policy.authorize(&owner, Operation::ReviewAdjustments).is_ok());
        assert!(policy.authorize(&owner, Operation::AssignRole(Role::Staff)).is_ok());
    }

    #[test]
    fn explain_reports_denial_kind_and_reason() {
        let manager = user(Role::Manager);
        let dir = Directory::from_users([manager.clone()]);
        let policy = AuthorizationPolicy::new(&dir);

        let denied = policy.explain(&manager, Operation::AssignRole(Role::Owner));
        assert!(!denied.granted);
        assert_eq!(denied.denial_kind, Some(DenialKind::RoleNotAssignable));
        assert_eq!(denied.reason, "a manager cannot assign the owner role");
        assert_eq!(denied.operation, "assign_role");

        let granted = policy.explain(&manager, Operation::EditUser(&manager));
        assert!(granted.granted);
        assert_eq!(granted.denial_kind, None);
    }

    #[test]
    fn explanation_serializes_for_audit_logs() {
        let staff = user(Role::Staff);
        let dir = Directory::from_users([staff.clone()]);
        let policy = AuthorizationPolicy::new(&dir);

        let json = serde_json::to_value(policy.explain(&staff, Operation::ReviewAdjustments)).unwrap();
        assert_eq!(json["denial_kind"], "insufficient_role");
        assert_eq!(json["acting_role"], "staff");
        assert_eq!(json["granted"], false);
    }
}
