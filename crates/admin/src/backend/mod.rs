//! Persistence adapters.
//!
//! Everything is stored as two kinds of JSON document: one global blob
//! (users and loyalty balances) and one blob per store. Three adapters
//! implement the same four operations:
//!
//! - [`MemoryBackend`] - in-process maps for tests and local demos
//! - [`ScriptBackend`] - a serverless script endpoint speaking
//!   `{ storeId, action, payload }`
//! - [`PostgresBackend`] - JSONB rows in the `souq` schema
//!
//! Store writes are version-checked: a save carries the version the
//! caller loaded, and the memory and Postgres adapters reject it if the
//! stored document has moved on since.

mod memory;
mod postgres;
mod script;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::instrument;

use souq_core::{GlobalData, StoreData, StoreId};

use crate::config::BackendConfig;

pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
pub use script::ScriptBackend;

/// Errors that can occur while loading or saving documents.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The stored document changed since it was loaded.
    #[error("store {store} was modified elsewhere (expected version {expected}, found {found})")]
    Conflict {
        store: StoreId,
        expected: u64,
        found: u64,
    },

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport failure talking to the script endpoint.
    #[error("script endpoint unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// The script endpoint answered `success: false`.
    #[error("script endpoint rejected {action}: {message}")]
    Script {
        action: &'static str,
        message: String,
    },

    /// A document could not be encoded or decoded.
    #[error("malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writes disabled on the memory backend.
    #[error("writes are disabled")]
    WritesDisabled,
}

/// The configured persistence adapter.
#[derive(Debug, Clone)]
pub enum Backend {
    Memory(MemoryBackend),
    Script(ScriptBackend),
    Postgres(PostgresBackend),
}

impl Backend {
    /// Build the adapter described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Database` if the Postgres pool cannot connect,
    /// or `BackendError::Http` if the HTTP client cannot be built.
    pub async fn connect(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(match config {
            BackendConfig::Memory => Self::Memory(MemoryBackend::new()),
            BackendConfig::Script { url, api_key } => {
                Self::Script(ScriptBackend::new(url.clone(), api_key.clone())?)
            }
            BackendConfig::Postgres { database_url } => {
                Self::Postgres(PostgresBackend::new(create_pool(database_url).await?))
            }
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Script(_) => "script",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Load the global blob. A fresh deployment yields an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter cannot read or decode the document.
    #[instrument(skip(self), fields(backend = self.name()))]
    pub async fn get_global_data(&self) -> Result<GlobalData, BackendError> {
        match self {
            Self::Memory(b) => b.get_global_data(),
            Self::Script(b) => b.get_global_data().await,
            Self::Postgres(b) => b.get_global_data().await,
        }
    }

    /// Replace the global blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter cannot write the document.
    #[instrument(skip(self, data), fields(backend = self.name(), users = data.users.len()))]
    pub async fn save_global_data(&self, data: &GlobalData) -> Result<(), BackendError> {
        match self {
            Self::Memory(b) => {
                b.delay_write().await;
                b.save_global_data(data)
            }
            Self::Script(b) => b.save_global_data(data).await,
            Self::Postgres(b) => b.save_global_data(data).await,
        }
    }

    /// Load one store's blob, or `None` if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter cannot read or decode the document.
    #[instrument(skip(self), fields(backend = self.name()))]
    pub async fn get_store_data(&self, store: &StoreId) -> Result<Option<StoreData>, BackendError> {
        match self {
            Self::Memory(b) => b.get_store_data(store),
            Self::Script(b) => b.get_store_data(store).await,
            Self::Postgres(b) => b.get_store_data(store).await,
        }
    }

    /// Save one store's blob and return its new version.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if `data.version` is stale, or an
    /// adapter error if the write fails.
    #[instrument(skip(self, data), fields(backend = self.name(), version = data.version))]
    pub async fn save_store_data(&self, store: &StoreId, data: &StoreData) -> Result<u64, BackendError> {
        match self {
            Self::Memory(b) => {
                b.delay_write().await;
                b.save_store_data(store, data)
            }
            Self::Script(b) => b.save_store_data(store, data).await,
            Self::Postgres(b) => b.save_store_data(store, data).await,
        }
    }

    /// Whether the adapter can currently be reached.
    pub async fn ping(&self) -> bool {
        match self {
            Self::Memory(b) => !b.writes_disabled(),
            Self::Script(_) => true,
            Self::Postgres(b) => b.ping().await,
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
