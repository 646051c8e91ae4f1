//! Date-keyed persistent store.
//!
//! Every derived table has a DATE primary key and FLOAT value columns, and
//! all writes go through one upsert path: insert, or replace the non-key
//! columns when the key already exists. Applying the same batch twice leaves
//! the store unchanged; applying a newer record for a key supersedes the
//! older one. Batches are best-effort: a failing record is reported with its
//! key and the rest still apply.

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

use crate::error::Result;
use crate::models::DerivedRecord;

/// Shape of one derived table: a date key plus named FLOAT columns. Column
/// names are compile-time constants, never user input.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub name: &'static str,
    pub key_column: &'static str,
    pub value_columns: &'static [&'static str],
}

/// Survey sentiment, one row per reporting date.
pub const SENTIMENT_TABLE: TableSpec = TableSpec {
    name: "aaii_sentiment_data",
    key_column: "reported_date",
    value_columns: &[
        "bullish",
        "neutral",
        "bearish",
        "bull_bear_spread",
        "s_p500_weekly_close",
    ],
};

/// Unemployment rate series, one row per observation date.
pub const UNEMPLOYMENT_TABLE: TableSpec = TableSpec {
    name: "unemployment_data",
    key_column: "date",
    value_columns: &["value"],
};

/// Volatility index closes, one row per date.
pub const VIX_TABLE: TableSpec = TableSpec {
    name: "vix_data",
    key_column: "date",
    value_columns: &["value"],
};

/// Result of applying one batch of records.
#[derive(Debug, Default)]
pub struct UpsertReport {
    pub written: usize,
    pub failures: Vec<(NaiveDate, String)>,
}

/// SQLite-backed store. One instance is acquired per run and closed on
/// every exit path.
#[derive(Debug)]
pub struct MarketStore {
    pool: SqlitePool,
}

impl MarketStore {
    pub async fn connect(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(sqlx::Error::Io)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;
        info!("database ready at {:?}", database_path);
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("database connection pool closed");
    }

    /// Create the table if absent. Safe to call every run; an existing
    /// table is left untouched.
    pub async fn ensure_table(&self, spec: &TableSpec) -> Result<()> {
        let mut columns = vec![format!("{} DATE PRIMARY KEY", spec.key_column)];
        columns.extend(
            spec.value_columns
                .iter()
                .map(|column| format!("{} FLOAT", column)),
        );
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            spec.name,
            columns.join(", ")
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Apply a batch of records: insert, or replace all non-key columns on
    /// conflict. After return the table holds the latest value for every
    /// key in `records`, with at most one row per key.
    pub async fn upsert(&self, spec: &TableSpec, records: &[DerivedRecord]) -> Result<UpsertReport> {
        self.ensure_table(spec).await?;
        let sql = upsert_sql(spec);

        let mut report = UpsertReport::default();
        for record in records {
            if record.values.len() != spec.value_columns.len() {
                report.failures.push((
                    record.date,
                    format!(
                        "expected {} values, got {}",
                        spec.value_columns.len(),
                        record.values.len()
                    ),
                ));
                continue;
            }

            let mut query = sqlx::query(&sql).bind(record.date);
            for value in &record.values {
                query = query.bind(*value);
            }
            match query.execute(&self.pool).await {
                Ok(_) => report.written += 1,
                Err(e) => {
                    error!("{}: failed to write row for {}: {}", spec.name, record.date, e);
                    report.failures.push((record.date, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// Append a market summary. This table has no natural key; every run
    /// adds a new row.
    pub async fn append_overview(&self, summary: &str) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_overview (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                market_summary TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT INTO market_overview (market_summary) VALUES (?1)")
            .bind(summary)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Row count for a known table name. Errors when the table does not
    /// exist yet.
    pub async fn row_count(&self, table: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn upsert_sql(spec: &TableSpec) -> String {
    let mut columns = vec![spec.key_column];
    columns.extend_from_slice(spec.value_columns);
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let updates: Vec<String> = spec
        .value_columns
        .iter()
        .map(|column| format!("{} = excluded.{}", column, column))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) DO UPDATE SET {}",
        spec.name,
        columns.join(", "),
        placeholders.join(", "),
        spec.key_column,
        updates.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn temp_store(dir: &tempfile::TempDir) -> MarketStore {
        MarketStore::connect(&dir.path().join("test.db")).await.unwrap()
    }

    fn record(day: u32, value: f64) -> DerivedRecord {
        DerivedRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            vec![Some(value)],
        )
    }

    async fn vix_value(store: &MarketStore, day: u32) -> Option<f64> {
        sqlx::query_scalar("SELECT value FROM vix_data WHERE date = ?1")
            .bind(NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ensure_table_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = temp_store(&dir).await;
        store.ensure_table(&VIX_TABLE).await.unwrap();
        store.ensure_table(&VIX_TABLE).await.unwrap();
        assert_eq!(store.row_count("vix_data").await.unwrap(), 0);
        store.close().await;
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = temp_store(&dir).await;

        let batch = vec![record(5, 3.9)];
        store.upsert(&VIX_TABLE, &batch).await.unwrap();
        store.upsert(&VIX_TABLE, &batch).await.unwrap();

        assert_eq!(store.row_count("vix_data").await.unwrap(), 1);
        assert_eq!(vix_value(&store, 5).await, Some(3.9));
        store.close().await;
    }

    #[tokio::test]
    async fn conflicting_key_keeps_the_latest_values() {
        let dir = tempdir().unwrap();
        let store = temp_store(&dir).await;

        store.upsert(&VIX_TABLE, &[record(5, 3.9)]).await.unwrap();
        store.upsert(&VIX_TABLE, &[record(5, 4.1)]).await.unwrap();

        assert_eq!(store.row_count("vix_data").await.unwrap(), 1);
        assert_eq!(vix_value(&store, 5).await, Some(4.1));
        store.close().await;
    }

    #[tokio::test]
    async fn multi_column_upsert_replaces_all_non_key_fields() {
        let dir = tempdir().unwrap();
        let store = temp_store(&dir).await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();

        let first = DerivedRecord::new(
            date,
            vec![Some(0.345), Some(0.31), Some(0.345), Some(0.0), Some(4697.24)],
        );
        let second = DerivedRecord::new(
            date,
            vec![Some(0.40), Some(0.30), Some(0.30), Some(0.10), None],
        );
        store.upsert(&SENTIMENT_TABLE, &[first]).await.unwrap();
        store.upsert(&SENTIMENT_TABLE, &[second]).await.unwrap();

        assert_eq!(store.row_count("aaii_sentiment_data").await.unwrap(), 1);
        let (bullish, weekly_close): (f64, Option<f64>) = sqlx::query_as(
            "SELECT bullish, s_p500_weekly_close FROM aaii_sentiment_data WHERE reported_date = ?1",
        )
        .bind(date)
        .fetch_one(&store.pool)
        .await
        .unwrap();
        assert!((bullish - 0.40).abs() < 1e-9);
        assert_eq!(weekly_close, None);
        store.close().await;
    }

    #[tokio::test]
    async fn malformed_record_fails_without_aborting_the_batch() {
        let dir = tempdir().unwrap();
        let store = temp_store(&dir).await;

        let bad = DerivedRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            vec![Some(1.0), Some(2.0)],
        );
        let good = record(6, 13.2);
        let report = store.upsert(&VIX_TABLE, &[bad, good]).await.unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(store.row_count("vix_data").await.unwrap(), 1);
        assert_eq!(vix_value(&store, 6).await, Some(13.2));
        store.close().await;
    }

    #[tokio::test]
    async fn overview_appends_rather_than_upserts() {
        let dir = tempdir().unwrap();
        let store = temp_store(&dir).await;

        store.append_overview("Markets drifted lower.").await.unwrap();
        store.append_overview("Markets drifted lower.").await.unwrap();
        assert_eq!(store.row_count("market_overview").await.unwrap(), 2);
        store.close().await;
    }
}
