//! Application state shared across handlers.

use std::sync::Arc;

use souq_core::{GlobalData, StoreData, StoreId};
use tokio::task::JoinHandle;

use crate::autosave::{self, AutosaveHandle};
use crate::backend::Backend;
use crate::config::SouqConfig;
use crate::error::AppError;
use crate::workspace::Workspace;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SouqConfig,
    workspace: Arc<Workspace>,
    autosave: AutosaveHandle,
}

impl AppState {
    /// Load the workspace from `backend` and start the autosave task.
    ///
    /// Returns the state and the autosave task's join handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the global blob cannot be loaded.
    pub async fn new(config: SouqConfig, backend: Backend) -> Result<(Self, JoinHandle<()>), AppError> {
        let workspace = Arc::new(Workspace::load(backend).await?);
        let (autosave, task) = autosave::spawn(Arc::clone(&workspace), config.autosave);
        Ok((
            Self {
                inner: Arc::new(AppStateInner {
                    config,
                    workspace,
                    autosave,
                }),
            },
            task,
        ))
    }

    #[must_use]
    pub fn config(&self) -> &SouqConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.inner.workspace
    }

    #[must_use]
    pub fn autosave(&self) -> &AutosaveHandle {
        &self.inner.autosave
    }

    pub async fn read_global<R>(&self, f: impl FnOnce(&GlobalData) -> R) -> R {
        self.workspace().read_global(f).await
    }

    /// Mutate the global blob and schedule a save.
    ///
    /// # Errors
    ///
    /// Returns the closure's error; nothing is scheduled in that case.
    pub async fn update_global<R, E>(
        &self,
        f: impl FnOnce(&mut GlobalData) -> Result<R, E>,
    ) -> Result<R, E> {
        let result = self.workspace().update_global(f).await?;
        self.autosave().notify(None);
        Ok(result)
    }

    /// Read a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be loaded.
    pub async fn read_store<R>(
        &self,
        store: &StoreId,
        f: impl FnOnce(&StoreData) -> R,
    ) -> Result<R, AppError> {
        Ok(self.workspace().read_store(store, f).await?)
    }

    /// Mutate a store and schedule a save.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or an error if the store cannot be loaded.
    pub async fn update_store<R>(
        &self,
        store: &StoreId,
        f: impl FnOnce(&mut StoreData) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let result = self.workspace().update_store(store, f).await?;
        self.autosave().notify(Some(store.clone()));
        Ok(result)
    }

    /// Mutate the global blob and a store together and schedule a save.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or an error if the store cannot be loaded.
    pub async fn update_both<R>(
        &self,
        store: &StoreId,
        f: impl FnOnce(&mut GlobalData, &mut StoreData) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let result = self.workspace().update_both(store, f).await?;
        self.autosave().notify(Some(store.clone()));
        Ok(result)
    }
}
