//! Database access for krishi-ai
//!
//! Scan history lives in a single SQLite file under the root folder.

pub mod scans;

pub use scans::{DiseaseCount, ScanRecord, ScanRecorder, ScanStats, SqliteScanRecorder, StoredScan};

use krishi_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the database file and tables on first use.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create scan tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_history (
            scan_id TEXT PRIMARY KEY,
            disease_id TEXT NOT NULL,
            disease_name TEXT NOT NULL,
            crop TEXT NOT NULL,
            confidence REAL NOT NULL,
            source TEXT NOT NULL,
            image_filename TEXT,
            image_size_kb REAL,
            scanned_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scan_history_scanned_at ON scan_history(scanned_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS disease_stats (
            disease_id TEXT PRIMARY KEY,
            disease_name TEXT NOT NULL,
            crop TEXT NOT NULL,
            scan_count INTEGER NOT NULL DEFAULT 0,
            last_scanned TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (scan_history, disease_stats)");

    Ok(())
}
