//! In-process backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use souq_core::{GlobalData, StoreData, StoreId};

use super::BackendError;

#[derive(Debug, Default)]
struct Documents {
    global: GlobalData,
    stores: HashMap<StoreId, StoreData>,
}

/// Keeps documents in memory. Clones share the same maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    documents: Arc<Mutex<Documents>>,
    writes_disabled: Arc<AtomicBool>,
    write_delay_ms: Arc<AtomicU64>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing documents.
    #[must_use]
    pub fn with_data(global: GlobalData, stores: HashMap<StoreId, StoreData>) -> Self {
        Self {
            documents: Arc::new(Mutex::new(Documents { global, stores })),
            writes_disabled: Arc::default(),
            write_delay_ms: Arc::default(),
        }
    }

    /// Make every save fail with `BackendError::WritesDisabled`.
    pub fn set_writes_disabled(&self, disabled: bool) {
        self.writes_disabled.store(disabled, Ordering::SeqCst);
    }

    #[must_use]
    pub fn writes_disabled(&self) -> bool {
        self.writes_disabled.load(Ordering::SeqCst)
    }

    /// Make every save wait `delay` before it lands, like a slow network.
    pub fn set_write_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub(super) async fn delay_write(&self) {
        let millis = self.write_delay_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn documents(&self) -> MutexGuard<'_, Documents> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.writes_disabled() {
            return Err(BackendError::WritesDisabled);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other adapters.
    pub fn get_global_data(&self) -> Result<GlobalData, BackendError> {
        Ok(self.documents().global.clone())
    }

    /// # Errors
    ///
    /// Returns `BackendError::WritesDisabled` when writes are switched off.
    pub fn save_global_data(&self, data: &GlobalData) -> Result<(), BackendError> {
        self.check_writable()?;
        self.documents().global = data.clone();
        Ok(())
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other adapters.
    pub fn get_store_data(&self, store: &StoreId) -> Result<Option<StoreData>, BackendError> {
        Ok(self.documents().stores.get(store).cloned())
    }

    /// # Errors
    ///
    /// Returns `BackendError::WritesDisabled` when writes are switched off,
    /// or `BackendError::Conflict` if `data.version` is stale.
    pub fn save_store_data(&self, store: &StoreId, data: &StoreData) -> Result<u64, BackendError> {
        self.check_writable()?;
        let mut documents = self.documents();
        let found = documents.stores.get(store).map_or(0, |s| s.version);
        if found != data.version {
            return Err(BackendError::Conflict {
                store: store.clone(),
                expected: data.version,
                found,
            });
        }
        let mut saved = data.clone();
        saved.version = found + 1;
        documents.stores.insert(store.clone(), saved);
        Ok(found + 1)
    }
}
