use std::sync::RwLock;

use laundrydesk_auth::{Directory, User};

use super::{InventoryState, InventoryStore, StoreError, UserStore};

/// In-memory inventory store for tests/dev and single-process deployments.
///
/// `transact` works on a copy of the state and swaps it in on success, so a
/// closure that fails halfway leaves the stored state untouched.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    inner: RwLock<InventoryState>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: InventoryState) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn read<R>(&self, read: impl FnOnce(&InventoryState) -> R) -> Result<R, StoreError> {
        let state = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(read(&state))
    }

    fn transact<R, E>(
        &self,
        work: impl FnOnce(&mut InventoryState) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut state = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let mut draft = state.clone();
        let out = work(&mut draft)?;
        *state = draft;
        Ok(out)
    }
}

/// In-memory user directory store.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            inner: RwLock::new(users.into_iter().collect()),
        }
    }
}

impl UserStore for InMemoryUserStore {
    fn snapshot(&self) -> Result<Directory, StoreError> {
        let users = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(Directory::from_users(users.iter().cloned()))
    }

    fn transact<R, E>(&self, work: impl FnOnce(&mut Vec<User>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut users = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let mut draft = users.clone();
        let out = work(&mut draft)?;
        *users = draft;
        Ok(out)
    }
}
