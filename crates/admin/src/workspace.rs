//! In-memory state shared by all requests.
//!
//! The workspace holds the global blob and every store blob loaded so
//! far. Store blobs are fetched from the backend the first time a store
//! is touched and kept afterwards; at most one copy of a store exists.
//! The workspace never writes to the backend itself: the autosave task
//! takes snapshots and records the resulting versions.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::{debug, instrument};

use souq_core::{GlobalData, StoreData, StoreId};

use crate::backend::{Backend, BackendError};

#[derive(Debug, Default)]
struct State {
    global: GlobalData,
    stores: HashMap<StoreId, StoreData>,
}

/// A point-in-time copy of what needs saving.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub global: GlobalData,
    pub stores: Vec<(StoreId, StoreData)>,
}

#[derive(Debug)]
pub struct Workspace {
    backend: Backend,
    state: RwLock<State>,
}

impl Workspace {
    /// Load the global blob and start with no stores loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot provide the global blob.
    #[instrument(skip_all, fields(backend = backend.name()))]
    pub async fn load(backend: Backend) -> Result<Self, BackendError> {
        let global = backend.get_global_data().await?;
        debug!(users = global.users.len(), "global data loaded");
        Ok(Self {
            backend,
            state: RwLock::new(State {
                global,
                stores: HashMap::new(),
            }),
        })
    }

    #[must_use]
    pub const fn backend(&self) -> &Backend {
        &self.backend
    }

    pub async fn read_global<R>(&self, f: impl FnOnce(&GlobalData) -> R) -> R {
        f(&self.state.read().await.global)
    }

    /// Mutate the global blob. The closure works on a copy that replaces
    /// the blob only when it returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the closure's error; the blob is left untouched.
    pub async fn update_global<R, E>(
        &self,
        f: impl FnOnce(&mut GlobalData) -> Result<R, E>,
    ) -> Result<R, E> {
        let mut state = self.state.write().await;
        let mut global = state.global.clone();
        let result = f(&mut global)?;
        state.global = global;
        Ok(result)
    }

    /// Make sure `store` is loaded, fetching it on first use. A store the
    /// backend has never seen starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn ensure_store(&self, store: &StoreId) -> Result<(), BackendError> {
        if self.state.read().await.stores.contains_key(store) {
            return Ok(());
        }
        let loaded = self.backend.get_store_data(store).await?;
        let mut state = self.state.write().await;
        // Another request may have loaded it while we were fetching.
        state.stores.entry(store.clone()).or_insert_with(|| {
            debug!(%store, found = loaded.is_some(), "store data loaded");
            loaded.unwrap_or_default()
        });
        Ok(())
    }

    /// Register a freshly created store without asking the backend.
    pub async fn insert_store(&self, store: StoreId, data: StoreData) {
        self.state.write().await.stores.entry(store).or_insert(data);
    }

    /// Read a store, loading it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store has to be loaded and the read fails.
    pub async fn read_store<R>(
        &self,
        store: &StoreId,
        f: impl FnOnce(&StoreData) -> R,
    ) -> Result<R, BackendError> {
        self.ensure_store(store).await?;
        let state = self.state.read().await;
        Ok(match state.stores.get(store) {
            Some(data) => f(data),
            None => f(&StoreData::default()),
        })
    }

    /// Read a store without keeping it loaded: the loaded copy is used
    /// when there is one, otherwise the backend's copy is read and dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend read fails.
    pub async fn peek_store<R>(
        &self,
        store: &StoreId,
        f: impl FnOnce(&StoreData) -> R,
    ) -> Result<R, BackendError> {
        if let Some(data) = self.state.read().await.stores.get(store) {
            return Ok(f(data));
        }
        let fetched = self.backend.get_store_data(store).await?.unwrap_or_default();
        Ok(f(&fetched))
    }

    /// Read the global blob and a store under one lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the store has to be loaded and the read fails.
    pub async fn read_both<R>(
        &self,
        store: &StoreId,
        f: impl FnOnce(&GlobalData, &StoreData) -> R,
    ) -> Result<R, BackendError> {
        self.ensure_store(store).await?;
        let state = self.state.read().await;
        let empty = StoreData::default();
        Ok(f(&state.global, state.stores.get(store).unwrap_or(&empty)))
    }

    /// Mutate a store, loading it if needed.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a backend error converted into `E`.
    pub async fn update_store<R, E: From<BackendError>>(
        &self,
        store: &StoreId,
        f: impl FnOnce(&mut StoreData) -> Result<R, E>,
    ) -> Result<R, E> {
        self.update_both(store, |_, data| f(data)).await
    }

    /// Mutate the global blob and a store under one lock. The closure
    /// works on copies that replace both documents only when it returns
    /// `Ok`, so a rejected request never leaves a half-applied change.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a backend error converted into `E`.
    pub async fn update_both<R, E: From<BackendError>>(
        &self,
        store: &StoreId,
        f: impl FnOnce(&mut GlobalData, &mut StoreData) -> Result<R, E>,
    ) -> Result<R, E> {
        self.ensure_store(store).await?;
        let mut state = self.state.write().await;
        let State { global, stores } = &mut *state;
        let data = stores.entry(store.clone()).or_default();
        let mut next_global = global.clone();
        let mut next_data = data.clone();
        let result = f(&mut next_global, &mut next_data)?;
        *global = next_global;
        *data = next_data;
        Ok(result)
    }

    /// Copy the global blob and the given stores for saving.
    pub async fn snapshot(&self, stores: &HashSet<StoreId>) -> Snapshot {
        let state = self.state.read().await;
        Snapshot {
            global: state.global.clone(),
            stores: stores
                .iter()
                .filter_map(|id| state.stores.get(id).map(|data| (id.clone(), data.clone())))
                .collect(),
        }
    }

    /// Record the version the backend assigned to a saved store.
    pub async fn mark_saved(&self, store: &StoreId, version: u64) {
        if let Some(data) = self.state.write().await.stores.get_mut(store) {
            data.version = version;
        }
    }

    /// Ids of the stores currently loaded.
    pub async fn loaded_stores(&self) -> Vec<StoreId> {
        self.state.read().await.stores.keys().cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::AppError;
    use souq_core::{LoyaltyData, Phone};

    #[tokio::test]
    async fn test_store_loads_once_from_backend() {
        let memory = MemoryBackend::new();
        let store = StoreId::new("store_1");
        let mut saved = StoreData::default();
        saved.settings.display_name = "Nour".to_string();
        memory.save_store_data(&store, &saved).unwrap();

        let workspace = Workspace::load(Backend::Memory(memory.clone())).await.unwrap();
        let name = workspace
            .read_store(&store, |d| d.settings.display_name.clone())
            .await
            .unwrap();
        assert_eq!(name, "Nour");
        assert_eq!(workspace.read_store(&store, |d| d.version).await.unwrap(), 1);

        // Changes behind the workspace's back are not picked up again.
        let mut other = memory.get_store_data(&store).unwrap().unwrap();
        other.settings.display_name = "Changed".to_string();
        memory.save_store_data(&store, &other).unwrap();
        let name = workspace
            .read_store(&store, |d| d.settings.display_name.clone())
            .await
            .unwrap();
        assert_eq!(name, "Nour");
        assert_eq!(workspace.loaded_stores().await, vec![store]);
    }

    #[tokio::test]
    async fn test_snapshot_includes_only_requested_loaded_stores() {
        let workspace = Workspace::load(Backend::Memory(MemoryBackend::new()))
            .await
            .unwrap();
        let a = StoreId::new("store_a");
        let b = StoreId::new("store_b");
        workspace.insert_store(a.clone(), StoreData::default()).await;
        workspace.insert_store(b.clone(), StoreData::default()).await;

        let dirty: HashSet<StoreId> = [a.clone(), StoreId::new("store_missing")].into_iter().collect();
        let snapshot = workspace.snapshot(&dirty).await;
        assert_eq!(snapshot.stores.len(), 1);
        assert_eq!(snapshot.stores[0].0, a);

        workspace.mark_saved(&a, 7).await;
        assert_eq!(workspace.read_store(&a, |d| d.version).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_documents_untouched() {
        let workspace = Workspace::load(Backend::Memory(MemoryBackend::new()))
            .await
            .unwrap();
        let store = StoreId::new("store_1");
        workspace.insert_store(store.clone(), StoreData::default()).await;

        let phone = Phone::parse("01012345678").unwrap();

        let result: Result<(), AppError> = workspace
            .update_both(&store, |global, data| {
                global.loyalty_data.award(&store, &phone, 5);
                data.settings.display_name = "Half done".to_string();
                Err(AppError::BadRequest("rejected".to_string()))
            })
            .await;
        assert!(result.is_err());
        let name = workspace
            .read_store(&store, |d| d.settings.display_name.clone())
            .await
            .unwrap();
        assert_eq!(name, "");
        let points = workspace
            .read_global(|g| g.loyalty_data.points(&store, &phone))
            .await;
        assert_eq!(points, 0);

        let result: Result<(), &str> = workspace
            .update_global(|global| {
                global.loyalty_data.award(&store, &phone, 5);
                Err("rejected")
            })
            .await;
        assert!(result.is_err());
        let unchanged = workspace
            .read_global(|g| g.loyalty_data == LoyaltyData::default())
            .await;
        assert!(unchanged);
    }

    #[tokio::test]
    async fn test_peek_does_not_keep_store_loaded() {
        let memory = MemoryBackend::new();
        let store = StoreId::new("store_1");
        let mut saved = StoreData::default();
        saved.settings.display_name = "Nour".to_string();
        memory.save_store_data(&store, &saved).unwrap();

        let workspace = Workspace::load(Backend::Memory(memory)).await.unwrap();
        let name = workspace
            .peek_store(&store, |d| d.settings.display_name.clone())
            .await
            .unwrap();
        assert_eq!(name, "Nour");
        assert!(workspace.loaded_stores().await.is_empty());
    }
}
