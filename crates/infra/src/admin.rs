//! User directory administration.
//!
//! The console hides actions the policy denies; this service checks the policy
//! again inside the store transaction, against the directory as it is at commit
//! time.

use serde::{Deserialize, Serialize};

use laundrydesk_auth::{AuthorizationPolicy, Directory, Operation, Role, User, validate_reporting_line};
use laundrydesk_core::{DomainError, UserId, require_text};

use crate::error::ServiceError;
use crate::store::UserStore;
use crate::workflow::current_user;

/// Input for [`UserAdministration::create_user`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub managed_by: Option<UserId>,
}

pub struct UserAdministration<U> {
    users: U,
}

impl<U> UserAdministration<U>
where
    U: UserStore,
{
    pub fn new(users: U) -> Self {
        Self { users }
    }

    pub fn directory(&self) -> Result<Directory, ServiceError> {
        Ok(self.users.snapshot()?)
    }

    /// Register a hierarchy member under a host, or a customer with no manager.
    #[tracing::instrument(skip_all, fields(acting = %acting.id, role = %new_user.role))]
    pub fn create_user(&self, acting: &User, new_user: NewUser) -> Result<User, ServiceError> {
        let name = require_text("name", &new_user.name)?;
        let username = require_text("username", &new_user.username)?;

        let user = self.users.transact(|users| -> Result<User, ServiceError> {
            let directory = Directory::from_users(users.iter().cloned());
            let acting = current_user(&directory, acting)?;
            let policy = AuthorizationPolicy::new(&directory);

            if directory
                .users()
                .iter()
                .any(|u| u.username.eq_ignore_ascii_case(&username))
            {
                return Err(DomainError::conflict(format!("username {username} is taken")).into());
            }

            let managed_by = match new_user.role {
                Role::Customer => {
                    // Front-desk intake: anyone who may hire staff may register customers.
                    if !policy.can_manage_role(acting, Role::Staff) {
                        return Err(DomainError::forbidden(format!(
                            "a {} cannot register customers",
                            acting.role
                        ))
                        .into());
                    }
                    if let Some(id) = new_user.managed_by {
                        return Err(DomainError::validation(format!(
                            "customers cannot be managed (got {id})"
                        ))
                        .into());
                    }
                    None
                }
                role => {
                    policy.authorize(acting, Operation::AssignRole(role))?;
                    let host_id = new_user.managed_by.ok_or_else(|| {
                        DomainError::validation(format!("a new {role} needs a manager"))
                    })?;
                    let host = directory
                        .get(&host_id)
                        .ok_or_else(|| DomainError::not_found(format!("user {host_id}")))?;
                    policy.authorize(acting, Operation::AddSubordinate(host))?;
                    validate_reporting_line(role, Some(host))?;
                    Some(host_id)
                }
            };

            let user = User {
                id: UserId::new(),
                role: new_user.role,
                managed_by,
                name,
                username,
            };
            users.push(user.clone());
            Ok(user)
        })?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Change a user's role, keeping their reporting line and their reports valid.
    #[tracing::instrument(skip_all, fields(acting = %acting.id, target = %target_id, role = %role))]
    pub fn change_role(&self, acting: &User, target_id: UserId, role: Role) -> Result<User, ServiceError> {
        let user = self.users.transact(|users| -> Result<User, ServiceError> {
            let directory = Directory::from_users(users.iter().cloned());
            let acting = current_user(&directory, acting)?;
            let target = lookup(&directory, &target_id)?;
            let policy = AuthorizationPolicy::new(&directory);

            policy.authorize(acting, Operation::EditUser(target))?;
            policy.authorize(acting, Operation::AssignRole(role))?;

            // Each manager role admits one report role, so this also keeps the
            // target's own reports valid.
            let manager = target.managed_by.and_then(|id| directory.get(&id));
            validate_reporting_line(role, manager)?;

            let mut updated = target.clone();
            updated.role = role;
            replace(users, updated.clone());
            Ok(updated)
        })?;

        tracing::info!(user_id = %user.id, "role changed");
        Ok(user)
    }

    /// Move a user under a different manager. Chairman only.
    #[tracing::instrument(skip_all, fields(acting = %acting.id, target = %target_id, manager = %new_manager_id))]
    pub fn reassign_manager(
        &self,
        acting: &User,
        target_id: UserId,
        new_manager_id: UserId,
    ) -> Result<User, ServiceError> {
        let user = self.users.transact(|users| -> Result<User, ServiceError> {
            let directory = Directory::from_users(users.iter().cloned());
            let acting = current_user(&directory, acting)?;
            let target = lookup(&directory, &target_id)?;
            let new_manager = lookup(&directory, &new_manager_id)?;

            AuthorizationPolicy::new(&directory).authorize(
                acting,
                Operation::ReassignManager {
                    target,
                    new_manager,
                },
            )?;

            let updated = target.clone().with_manager(new_manager.id);
            replace(users, updated.clone());
            Ok(updated)
        })?;

        tracing::info!(user_id = %user.id, "manager reassigned");
        Ok(user)
    }

    /// Remove a user who no longer manages anyone.
    #[tracing::instrument(skip_all, fields(acting = %acting.id, target = %target_id))]
    pub fn delete_user(&self, acting: &User, target_id: UserId) -> Result<User, ServiceError> {
        let removed = self.users.transact(|users| -> Result<User, ServiceError> {
            let directory = Directory::from_users(users.iter().cloned());
            let acting = current_user(&directory, acting)?;
            let target = lookup(&directory, &target_id)?;

            AuthorizationPolicy::new(&directory).authorize(acting, Operation::DeleteUser(target))?;

            let reports = directory.direct_reports(&target.id).count();
            if reports > 0 {
                return Err(DomainError::conflict(format!(
                    "{} still manages {reports} user(s); reassign them first",
                    target.name
                ))
                .into());
            }

            let removed = target.clone();
            users.retain(|u| u.id != removed.id);
            Ok(removed)
        })?;

        tracing::info!(user_id = %removed.id, "user deleted");
        Ok(removed)
    }
}

fn lookup<'d>(directory: &'d Directory, id: &UserId) -> Result<&'d User, ServiceError> {
    directory
        .get(id)
        .ok_or_else(|| DomainError::not_found(format!("user {id}")).into())
}

fn replace(users: &mut [User], updated: User) {
    for slot in users.iter_mut().filter(|u| u.id == updated.id) {
        *slot = updated.clone();
    }
}
