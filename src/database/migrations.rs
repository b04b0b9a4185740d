use sqlx::{Executor, Row, SqlitePool};
use tracing::{error, info};

use super::StoreError;

pub struct MigrationRunner {
    pool: SqlitePool,
}

impl MigrationRunner {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Starting database migrations");

        self.create_migrations_table().await?;

        let migrations = vec![("001_channels", include_str!("../../sql/channels_schema.sql"))];

        for (name, sql) in migrations {
            if !self.is_migration_applied(name).await? {
                info!("Applying migration: {}", name);
                self.apply_migration(name, sql).await?;
            } else {
                info!("Migration {} already applied, skipping", name);
            }
        }

        Ok(())
    }

    async fn create_migrations_table(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS migrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_migration_applied(&self, name: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM migrations WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn apply_migration(&self, name: &str, sql: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Err(e) = (&mut *tx).execute(sql).await {
            error!("Migration {} failed: {}", name, e);
            return Err(e.into());
        }

        sqlx::query("INSERT INTO migrations (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Successfully applied migration: {}", name);
        Ok(())
    }

    pub async fn get_applied_migrations(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM migrations ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.get("name")).collect())
    }
}
