//! SQLite store
//!
//! Every write is a single-row upsert committed immediately, so there is
//! nothing to flush.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, error};

use super::{ActiveLayoutStore, ActiveLayouts, StoreError};
use crate::layout::Layout;

const SCHEMA: &str = include_str!("../../schema.sql");

/// Relational store backed by a SQLite database file
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if necessary) the database and apply the schema
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        // One connection keeps writes strictly ordered
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        apply_schema(&pool).await?;
        debug!(path = %path.display(), "SQLite schema applied");

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for (i, statement) in schema_statements(SCHEMA).enumerate() {
        if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
            error!("Schema error in statement #{}:\n{}", i + 1, statement);
            return Err(e);
        }
    }

    tx.commit().await
}

/// Split the schema into statements, skipping comment-only fragments
fn schema_statements(schema: &str) -> impl Iterator<Item = &str> {
    schema.split(';').map(str::trim).filter(|statement| {
        statement
            .lines()
            .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("--"))
    })
}

#[async_trait]
impl ActiveLayoutStore for SqliteStore {
    async fn get_active_layouts(&self, window: &str) -> Result<ActiveLayouts, StoreError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT device, code, variant FROM active_layouts WHERE app = ?1",
        )
        .bind(window)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(device, code, variant)| (device, Layout { code, variant }))
            .collect())
    }

    async fn set_active_layout(
        &self,
        window: &str,
        device: &str,
        layout: &Layout,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO active_layouts (app, device, code, variant) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (app, device) DO UPDATE SET code = excluded.code, variant = excluded.variant",
        )
        .bind(window)
        .bind(device)
        .bind(layout.code.as_str())
        .bind(layout.variant.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
