use core::str::FromStr;

use serde::{Deserialize, Serialize};

use laundrydesk_core::DomainError;

/// Role held by a user.
///
/// Chairman > Owner > Manager > Staff form the management tree; Customer sits
/// outside it and never manages or is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Chairman,
    Owner,
    Manager,
    Staff,
    Customer,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Chairman,
        Role::Owner,
        Role::Manager,
        Role::Staff,
        Role::Customer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Chairman => "chairman",
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }

    /// Position in the management tree (0 is most senior). `None` for Customer.
    pub fn rank(self) -> Option<u8> {
        match self {
            Role::Chairman => Some(0),
            Role::Owner => Some(1),
            Role::Manager => Some(2),
            Role::Staff => Some(3),
            Role::Customer => None,
        }
    }

    pub fn in_hierarchy(self) -> bool {
        self.rank().is_some()
    }

    /// Whether users holding this role may have direct reports.
    pub fn can_have_subordinates(self) -> bool {
        matches!(self, Role::Chairman | Role::Owner | Role::Manager)
    }

    /// The role a direct manager of this role must hold.
    ///
    /// Chairman is a root and Customer is unmanaged, so both return `None`.
    pub fn expected_manager(self) -> Option<Role> {
        match self {
            Role::Owner => Some(Role::Chairman),
            Role::Manager => Some(Role::Owner),
            Role::Staff => Some(Role::Manager),
            Role::Chairman | Role::Customer => None,
        }
    }

    /// Roles a holder of this role may hand out (on creation or role change).
    ///
    /// Nobody may mint a Chairman through this path.
    pub fn assignable_roles(self) -> &'static [Role] {
        match self {
            Role::Chairman => &[Role::Owner, Role::Manager, Role::Staff],
            Role::Owner => &[Role::Manager, Role::Staff],
            Role::Manager => &[Role::Staff],
            Role::Staff | Role::Customer => &[],
        }
    }

    /// Strict seniority within the tree. Customer is never senior nor junior.
    pub fn is_senior_to(self, other: Role) -> bool {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}
