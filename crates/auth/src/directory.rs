//! Immutable snapshot of the user directory.
//!
//! Every policy decision is made against a `Directory` built from one read of the
//! user store, so a decision never observes a half-applied concurrent mutation.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use laundrydesk_core::UserId;

use crate::{Role, User};

/// Result of walking `managed_by` links upward from a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    /// The sought ancestor was found.
    Reached,
    /// A node matching the stop predicate was met first.
    Blocked,
    /// The chain ended (root or dangling reference) without finding the ancestor.
    Exhausted,
    /// The chain loops back on itself.
    Cycle,
}

/// Structural problem found in a directory snapshot.
///
/// Seed or imported data can break invariants that the sanctioned mutation paths
/// maintain; these are reported, never repaired silently.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectoryViolation {
    #[error("directory has no chairman")]
    NoChairman,

    #[error("user {user} is managed by unknown user {manager}")]
    DanglingManager { user: UserId, manager: UserId },

    #[error("user {user} ({role}) has no manager")]
    MissingManager { user: UserId, role: Role },

    #[error("user {user} ({role}) cannot report to a {manager_role}")]
    InvalidReportingLine {
        user: UserId,
        role: Role,
        manager_role: Role,
    },

    #[error("management chain above user {user} forms a cycle")]
    Cycle { user: UserId },
}

/// Read-only user directory keyed by id, preserving insertion order.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: Vec<User>,
    index: HashMap<UserId, usize>,
}

impl Directory {
    /// Build a snapshot. A repeated id replaces the earlier entry in place.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let mut dir = Self::default();
        for user in users {
            match dir.index.get(&user.id) {
                Some(&pos) => dir.users[pos] = user,
                None => {
                    dir.index.insert(user.id, dir.users.len());
                    dir.users.push(user);
                }
            }
        }
        dir
    }

    pub fn get(&self, id: &UserId) -> Option<&User> {
        self.index.get(id).map(|&pos| &self.users[pos])
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.index.contains_key(id)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn chairman_count(&self) -> usize {
        self.users.iter().filter(|u| u.role == Role::Chairman).count()
    }

    pub fn direct_reports<'a>(&'a self, manager: &'a UserId) -> impl Iterator<Item = &'a User> + 'a {
        self.users.iter().filter(move |u| u.is_managed_by(manager))
    }

    /// Walk `managed_by` links upward from `target` looking for `ancestor`.
    ///
    /// `stop_at` is consulted for every ancestor that is not the one sought; the
    /// walk ends with [`WalkOutcome::Blocked`] as soon as it returns true. The walk
    /// visits each node at most once and takes at most `len() + 1` steps, so a
    /// malformed directory with a cycle terminates with [`WalkOutcome::Cycle`].
    pub fn walk_up_to(
        &self,
        ancestor: &UserId,
        target: &User,
        stop_at: impl Fn(&User) -> bool,
    ) -> WalkOutcome {
        self.walk(target, Some(ancestor), stop_at)
    }

    fn walk(
        &self,
        target: &User,
        ancestor: Option<&UserId>,
        stop_at: impl Fn(&User) -> bool,
    ) -> WalkOutcome {
        let mut visited: HashSet<UserId> = HashSet::with_capacity(self.len() + 1);
        visited.insert(target.id);

        let mut next = target.managed_by;
        for _ in 0..=self.len() {
            let Some(id) = next else {
                return WalkOutcome::Exhausted;
            };
            if ancestor == Some(&id) {
                return WalkOutcome::Reached;
            }
            if !visited.insert(id) {
                return WalkOutcome::Cycle;
            }
            let Some(user) = self.get(&id) else {
                return WalkOutcome::Exhausted;
            };
            if stop_at(user) {
                return WalkOutcome::Blocked;
            }
            next = user.managed_by;
        }

        WalkOutcome::Cycle
    }

    /// Whether `ancestor` sits anywhere above `target` in the management chain.
    pub fn is_ancestor(&self, ancestor: &UserId, target: &User) -> bool {
        self.walk_up_to(ancestor, target, |_| false) == WalkOutcome::Reached
    }

    /// Report every structural invariant the snapshot breaks.
    pub fn validate(&self) -> Vec<DirectoryViolation> {
        let mut violations = Vec::new();

        if self.chairman_count() == 0 && !self.is_empty() {
            violations.push(DirectoryViolation::NoChairman);
        }

        for user in &self.users {
            match (user.managed_by, user.role.expected_manager()) {
                (None, Some(_)) => violations.push(DirectoryViolation::MissingManager {
                    user: user.id,
                    role: user.role,
                }),
                (None, None) => {}
                (Some(manager_id), expected) => match self.get(&manager_id) {
                    None => violations.push(DirectoryViolation::DanglingManager {
                        user: user.id,
                        manager: manager_id,
                    }),
                    Some(manager) if Some(manager.role) != expected => {
                        violations.push(DirectoryViolation::InvalidReportingLine {
                            user: user.id,
                            role: user.role,
                            manager_role: manager.role,
                        })
                    }
                    Some(_) => {}
                },
            }

            if self.walk(user, None, |_| false) == WalkOutcome::Cycle {
                violations.push(DirectoryViolation::Cycle { user: user.id });
            }
        }

        violations
    }
}

impl FromIterator<User> for Directory {
    fn from_iter<T: IntoIterator<Item = User>>(iter: T) -> Self {
        Self::from_users(iter)
    }
}
