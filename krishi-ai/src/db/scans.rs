//! Scan history persistence
//!
//! Every completed prediction is appended to `scan_history`, and the matching
//! `disease_stats` counter (keyed by canonical id) is bumped in the same
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use krishi_common::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// One scan to persist
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    pub disease_id: String,
    pub disease_name: String,
    pub crop: String,
    pub confidence: f64,
    /// Provider identifier or `fallback`
    pub source: String,
    pub image_filename: Option<String>,
    pub image_size_kb: Option<f64>,
}

/// Scan as read back from history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredScan {
    pub scan_id: String,
    pub disease_id: String,
    pub disease_name: String,
    pub crop: String,
    pub confidence: f64,
    pub source: String,
    pub image_filename: Option<String>,
    pub image_size_kb: Option<f64>,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseCount {
    pub disease_id: String,
    pub disease_name: String,
    pub crop: String,
    pub scan_count: i64,
    pub last_scanned: DateTime<Utc>,
}

/// Aggregate counters for the stats endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStats {
    pub total_scans: i64,
    /// Most scanned first
    pub diseases: Vec<DiseaseCount>,
}

/// Scan history store
#[async_trait]
pub trait ScanRecorder: Send + Sync {
    async fn record(&self, scan: ScanRecord) -> Result<()>;

    /// Newest first
    async fn recent_scans(&self, limit: u32) -> Result<Vec<StoredScan>>;

    async fn disease_stats(&self) -> Result<ScanStats>;
}

/// SQLite-backed [`ScanRecorder`]
#[derive(Clone)]
pub struct SqliteScanRecorder {
    pool: SqlitePool,
}

impl SqliteScanRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanRecorder for SqliteScanRecorder {
    async fn record(&self, scan: ScanRecord) -> Result<()> {
        let scan_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO scan_history (
                scan_id, disease_id, disease_name, crop, confidence,
                source, image_filename, image_size_kb, scanned_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&scan_id)
        .bind(&scan.disease_id)
        .bind(&scan.disease_name)
        .bind(&scan.crop)
        .bind(scan.confidence)
        .bind(&scan.source)
        .bind(&scan.image_filename)
        .bind(scan.image_size_kb)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO disease_stats (disease_id, disease_name, crop, scan_count, last_scanned)
            VALUES (?, ?, ?, 1, ?)
            ON CONFLICT(disease_id) DO UPDATE SET
                scan_count = scan_count + 1,
                disease_name = excluded.disease_name,
                crop = excluded.crop,
                last_scanned = excluded.last_scanned
            "#,
        )
        .bind(&scan.disease_id)
        .bind(&scan.disease_name)
        .bind(&scan.crop)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(scan_id = %scan_id, disease_id = %scan.disease_id, "Scan recorded");
        Ok(())
    }

    async fn recent_scans(&self, limit: u32) -> Result<Vec<StoredScan>> {
        let rows = sqlx::query(
            r#"
            SELECT scan_id, disease_id, disease_name, crop, confidence,
                   source, image_filename, image_size_kb, scanned_at
            FROM scan_history
            ORDER BY scanned_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let scanned_at: String = row.get("scanned_at");
                Ok(StoredScan {
                    scan_id: row.get("scan_id"),
                    disease_id: row.get("disease_id"),
                    disease_name: row.get("disease_name"),
                    crop: row.get("crop"),
                    confidence: row.get("confidence"),
                    source: row.get("source"),
                    image_filename: row.get("image_filename"),
                    image_size_kb: row.get("image_size_kb"),
                    scanned_at: parse_timestamp(&scanned_at)?,
                })
            })
            .collect()
    }

    async fn disease_stats(&self) -> Result<ScanStats> {
        let total_scans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scan_history")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            r#"
            SELECT disease_id, disease_name, crop, scan_count, last_scanned
            FROM disease_stats
            ORDER BY scan_count DESC, disease_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let diseases = rows
            .into_iter()
            .map(|row| {
                let last_scanned: String = row.get("last_scanned");
                Ok(DiseaseCount {
                    disease_id: row.get("disease_id"),
                    disease_name: row.get("disease_name"),
                    crop: row.get("crop"),
                    scan_count: row.get("scan_count"),
                    last_scanned: parse_timestamp(&last_scanned)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ScanStats {
            total_scans,
            diseases,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| krishi_common::Error::Internal(format!("Failed to parse timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database_pool;
    use tempfile::TempDir;

    async fn recorder() -> (SqliteScanRecorder, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = init_database_pool(&dir.path().join("krishi.db")).await.unwrap();
        (SqliteScanRecorder::new(pool), dir)
    }

    fn scan(disease_id: &str, name: &str, crop: &str) -> ScanRecord {
        ScanRecord {
            disease_id: disease_id.to_string(),
            disease_name: name.to_string(),
            crop: crop.to_string(),
            confidence: 0.9,
            source: "local".to_string(),
            image_filename: Some("leaf.jpg".to_string()),
            image_size_kb: Some(12.5),
        }
    }

    #[tokio::test]
    async fn test_recent_scans_newest_first() {
        let (recorder, _dir) = recorder().await;
        recorder.record(scan("apple_scab", "Apple Scab", "Apple")).await.unwrap();
        recorder.record(scan("grape_black_rot", "Black Rot", "Grape")).await.unwrap();
        recorder.record(scan("rice_brown_spot", "Brown Spot", "Rice")).await.unwrap();

        let recent = recorder.recent_scans(2).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|s| s.disease_id.as_str()).collect();
        assert_eq!(ids, vec!["rice_brown_spot", "grape_black_rot"]);
        assert_eq!(recent[0].image_filename.as_deref(), Some("leaf.jpg"));
    }

    #[tokio::test]
    async fn test_stats_keyed_by_disease_id() {
        let (recorder, _dir) = recorder().await;
        // Same display name, different diseases
        recorder.record(scan("apple_black_rot", "Black Rot", "Apple")).await.unwrap();
        recorder.record(scan("grape_black_rot", "Black Rot", "Grape")).await.unwrap();
        recorder.record(scan("grape_black_rot", "Black Rot", "Grape")).await.unwrap();

        let stats = recorder.disease_stats().await.unwrap();
        assert_eq!(stats.total_scans, 3);
        assert_eq!(stats.diseases.len(), 2);
        assert_eq!(stats.diseases[0].disease_id, "grape_black_rot");
        assert_eq!(stats.diseases[0].scan_count, 2);
        assert_eq!(stats.diseases[1].disease_id, "apple_black_rot");
        assert_eq!(stats.diseases[1].scan_count, 1);
    }

    #[tokio::test]
    async fn test_empty_history() {
        let (recorder, _dir) = recorder().await;
        assert!(recorder.recent_scans(20).await.unwrap().is_empty());
        let stats = recorder.disease_stats().await.unwrap();
        assert_eq!(stats.total_scans, 0);
        assert!(stats.diseases.is_empty());
    }
}
