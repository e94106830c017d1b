//! Postgres persistence for relay cursors and failed relays

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::cursor::{CursorStore, FailedRelay};

/// Create a database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .wrap_err("Failed to connect to database")
}

/// Run pending migrations (uses the migration files in migrations/)
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .wrap_err("Failed to run database migrations")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PgCursorStore {
    pool: PgPool,
}

impl PgCursorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CursorStore for PgCursorStore {
    async fn load(&self, direction: &str) -> Result<Option<u64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT position
            FROM relay_cursors
            WHERE direction = $1
            "#,
        )
        .bind(direction)
        .fetch_optional(&self.pool)
        .await
        .wrap_err("Failed to load relay cursor")?;

        Ok(row.map(|r| r.0.max(0) as u64))
    }

    async fn save(&self, direction: &str, position: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO relay_cursors (direction, position, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (direction)
            DO UPDATE SET position = EXCLUDED.position, updated_at = NOW()
            "#,
        )
        .bind(direction)
        .bind(i64::try_from(position).wrap_err("Cursor position exceeds BIGINT")?)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to save relay cursor")?;
        Ok(())
    }

    async fn record_failure(&self, failure: &FailedRelay) -> Result<()> {
        // NUMERIC columns are bound as text and cast
        sqlx::query(
            r#"
            INSERT INTO relay_failures (direction, position, src_from, dest_to, amount, nonce, error, failed_at)
            VALUES ($1, $2, $3, $4, $5::NUMERIC, $6::NUMERIC, $7, $8)
            "#,
        )
        .bind(&failure.direction)
        .bind(i64::try_from(failure.position).wrap_err("Failure position exceeds BIGINT")?)
        .bind(failure.from.to_string())
        .bind(failure.to.to_string())
        .bind(failure.amount.to_string())
        .bind(failure.nonce.to_string())
        .bind(&failure.error)
        .bind(failure.failed_at)
        .execute(&self.pool)
        .await
        .wrap_err("Failed to record relay failure")?;
        Ok(())
    }
}
