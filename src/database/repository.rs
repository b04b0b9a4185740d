use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::{MigrationRunner, StoreError};
use crate::registry::SlotStore;
use crate::types::{SlotBinding, SlotId};

/// SQLite-backed store of `name -> channel id` pairs.
pub struct SlotRepository {
    pool: SqlitePool,
}

impl SlotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database file and apply migrations.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let repository = Self::connect_with(options).await?;
        info!("Opened slot database at {}", path);
        Ok(repository)
    }

    /// Private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        // One connection: the scheduler is the only writer, and an in-memory
        // database lives and dies with its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        MigrationRunner::new(pool.clone()).run_migrations().await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SlotStore for SlotRepository {
    async fn load_all(&self) -> Result<Vec<SlotBinding>, StoreError> {
        let rows = sqlx::query("SELECT name, id FROM channels ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let mut bindings = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.get("name");
            let id: Option<i64> = row.get("id");
            match id.and_then(|id| u64::try_from(id).ok()) {
                Some(id) => bindings.push(SlotBinding::new(&name, SlotId(id))),
                None => warn!("Skipping channel row {} with unusable id {:?}", name, id),
            }
        }

        debug!("Loaded {} slot bindings", bindings.len());
        Ok(bindings)
    }

    async fn upsert(&self, binding: &SlotBinding) -> Result<(), StoreError> {
        let id = i64::try_from(binding.id.0).map_err(|_| StoreError::IdOutOfRange(binding.id.0))?;

        sqlx::query(
            r#"
            INSERT INTO channels (name, id)
            VALUES (?, ?)
            ON CONFLICT (name) DO UPDATE SET
                id = excluded.id
            "#,
        )
        .bind(&binding.name)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
