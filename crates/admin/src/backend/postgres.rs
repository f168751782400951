//! `PostgreSQL` backend.
//!
//! Documents live in two tables created by `migrations/0001_init.sql`:
//!
//! - `souq.global_data` - a single row holding the global blob
//! - `souq.store_data` - one row per store with its blob and version

use sqlx::PgPool;
use sqlx::types::Json;

use souq_core::{GlobalData, StoreData, StoreId};

use super::BackendError;

#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

fn to_db_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn from_db_version(version: i64) -> u64 {
    u64::try_from(version).unwrap_or_default()
}

impl PostgresBackend {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(super) async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    pub(super) async fn get_global_data(&self) -> Result<GlobalData, BackendError> {
        let row: Option<(Json<GlobalData>,)> =
            sqlx::query_as("SELECT data FROM souq.global_data WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(data),)| data).unwrap_or_default())
    }

    pub(super) async fn save_global_data(&self, data: &GlobalData) -> Result<(), BackendError> {
        sqlx::query(
            r"
            INSERT INTO souq.global_data (id, data)
            VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET data = $1, updated_at = NOW()
            ",
        )
        .bind(Json(data))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub(super) async fn get_store_data(&self, store: &StoreId) -> Result<Option<StoreData>, BackendError> {
        let row: Option<(Json<StoreData>, i64)> =
            sqlx::query_as("SELECT data, version FROM souq.store_data WHERE store_id = $1")
                .bind(store)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(mut data), version)| {
            data.version = from_db_version(version);
            data
        }))
    }

    pub(super) async fn save_store_data(&self, store: &StoreId, data: &StoreData) -> Result<u64, BackendError> {
        let next = data.version + 1;
        let mut saved = data.clone();
        saved.version = next;

        let written: Option<(i64,)> = if data.version == 0 {
            sqlx::query_as(
                r"
                INSERT INTO souq.store_data (store_id, data, version)
                VALUES ($1, $2, 1)
                ON CONFLICT (store_id) DO NOTHING
                RETURNING version
                ",
            )
            .bind(store)
            .bind(Json(&saved))
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r"
                UPDATE souq.store_data
                SET data = $2, version = version + 1, updated_at = NOW()
                WHERE store_id = $1 AND version = $3
                RETURNING version
                ",
            )
            .bind(store)
            .bind(Json(&saved))
            .bind(to_db_version(data.version))
            .fetch_optional(&self.pool)
            .await?
        };

        if let Some((version,)) = written {
            return Ok(from_db_version(version));
        }

        let found: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM souq.store_data WHERE store_id = $1")
                .bind(store)
                .fetch_optional(&self.pool)
                .await?;
        Err(BackendError::Conflict {
            store: store.clone(),
            expected: data.version,
            found: found.map_or(0, |(v,)| from_db_version(v)),
        })
    }
}
