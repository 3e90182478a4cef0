//! Database initialization
//!
//! Opens (creating if needed) the SQLite store and creates the inventory
//! schema. Safe to run against an existing database.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize database connection and create tables if needed
///
/// Foreign keys, WAL and the busy timeout are set on the connect options so
/// every pooled connection carries them, not just the first one.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a transaction that holds the write lock from its first statement
///
/// A deferred transaction that reads before it writes cannot upgrade once
/// another writer has committed and fails without waiting. `BEGIN IMMEDIATE`
/// queues behind the current writer for up to the busy timeout instead.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Create every inventory table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_organizations_table(pool).await?;
    create_persons_table(pool).await?;
    create_products_table(pool).await?;
    create_import_operations_table(pool).await?;
    Ok(())
}

/// Organizations, keyed for import matching on the canonical full name
///
/// `*_search` columns hold the case-folded text that list filters match.
///
/// `full_name_key` is NULL when no full name was given; SQLite allows any
/// number of NULLs under a UNIQUE constraint.
async fn create_organizations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            full_name TEXT,
            full_name_key TEXT UNIQUE,
            name_search TEXT NOT NULL,
            full_name_search TEXT,
            annual_turnover REAL NOT NULL CHECK (annual_turnover > 0),
            employees_count INTEGER NOT NULL CHECK (employees_count > 0),
            rating INTEGER NOT NULL CHECK (rating > 0),
            official_zip_code TEXT NOT NULL,
            official_town_x INTEGER NOT NULL,
            official_town_y INTEGER NOT NULL,
            official_town_name TEXT NOT NULL,
            postal_zip_code TEXT NOT NULL,
            postal_town_x INTEGER NOT NULL,
            postal_town_y INTEGER NOT NULL,
            postal_town_name TEXT NOT NULL,
            official_town_search TEXT NOT NULL,
            postal_town_search TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_persons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS persons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL UNIQUE,
            name_search TEXT NOT NULL,
            eye_color TEXT,
            hair_color TEXT,
            nationality TEXT NOT NULL,
            height REAL NOT NULL CHECK (height > 0),
            location_x INTEGER,
            location_y INTEGER,
            location_name TEXT,
            location_name_search TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Products reference their manufacturer (required) and owner (optional);
/// neither can be deleted while a product points at it.
async fn create_products_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            coordinates_x REAL NOT NULL CHECK (coordinates_x <= 450),
            coordinates_y REAL NOT NULL CHECK (coordinates_y > -422),
            creation_date TIMESTAMP NOT NULL,
            unit_of_measure TEXT NOT NULL,
            manufacturer_id INTEGER NOT NULL REFERENCES organizations(id) ON DELETE RESTRICT,
            price INTEGER NOT NULL CHECK (price > 0),
            manufacture_cost INTEGER CHECK (manufacture_cost IS NULL OR manufacture_cost >= 0),
            rating INTEGER NOT NULL CHECK (rating > 0),
            part_number TEXT NOT NULL,
            part_number_key TEXT NOT NULL,
            name_search TEXT NOT NULL,
            part_number_search TEXT NOT NULL,
            owner_id INTEGER REFERENCES persons(id) ON DELETE RESTRICT,
            UNIQUE (manufacturer_id, part_number_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_owner ON products(owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_import_operations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_operations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL CHECK (status IN ('SUCCESS', 'FAILED')),
            created_count INTEGER,
            started_at TIMESTAMP NOT NULL,
            finished_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_init_creates_schema() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("nested").join("inv.db"))
            .await
            .unwrap();

        assert_eq!(
            table_names(&pool).await,
            vec!["import_operations", "organizations", "persons", "products"]
        );
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inv.db");

        let pool = init_database(&path).await.unwrap();
        pool.close().await;

        let pool = init_database(&path).await.unwrap();
        assert_eq!(table_names(&pool).await.len(), 4);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced_on_every_connection() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("inv.db")).await.unwrap();

        for _ in 0..3 {
            let mut conn = pool.acquire().await.unwrap();
            let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
            assert_eq!(enabled, 1);
        }
    }
}
