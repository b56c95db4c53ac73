//! Read-only SQLite implementation of the GPU dataset
//!
//! The database exposes four views:
//! - `gpu_technical_sheet` (matched on `full_model_name`)
//! - `gpu_value_analysis` (ranked by `price_per_vram_gb`)
//! - `gold_gpu_price_performance` (ranked by `performance_per_euro_score`)
//! - `current_gpu_prices` (matched on `model_suffix` / `chip_id`)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use tracing::{debug, info};

use super::{GpuDataProvider, Record, ValueMetric, MAX_BEST_VALUE_LIMIT};
use crate::{AnalystError, Result};

/// GPU dataset stored in a SQLite file
#[derive(Debug, Clone)]
pub struct SqliteGpuStore {
    path: PathBuf,
}

impl SqliteGpuStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Accepts `sqlite:///path`, `sqlite://path` or a bare path
    pub fn from_database_url(url: &str) -> Self {
        let path = url
            .strip_prefix("sqlite:///")
            .or_else(|| url.strip_prefix("sqlite://"))
            .unwrap_or(url);
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn query(&self, sql: String, params: Vec<SqlValue>) -> Result<Vec<Record>> {
        info!(target: "gpu_db", sql = %sql, "Executing query");
        info!(target: "gpu_db", params = ?params, "Query parameters");

        let path = self.path.clone();
        let records = tokio::task::spawn_blocking(move || query_blocking(&path, &sql, &params))
            .await
            .map_err(|e| AnalystError::DataProviderError(format!("Query task failed: {e}")))??;

        debug!(target: "gpu_db", rows = records.len(), "Query finished");
        Ok(records)
    }
}

#[async_trait]
impl GpuDataProvider for SqliteGpuStore {
    async fn technical_specs(&self, model_name: &str) -> Result<Vec<Record>> {
        let sql = "SELECT * FROM gpu_technical_sheet WHERE full_model_name LIKE ?1".to_string();
        self.query(sql, vec![SqlValue::Text(format!("%{model_name}%"))])
            .await
    }

    async fn best_value(&self, metric: ValueMetric, limit: u32) -> Result<Vec<Record>> {
        let (table, direction) = match metric {
            ValueMetric::PerformancePerEuroScore => ("gold_gpu_price_performance", "DESC"),
            ValueMetric::PricePerVramGb => ("gpu_value_analysis", "ASC"),
        };
        let sql = format!(
            "SELECT * FROM {table} ORDER BY {} {direction} LIMIT ?1",
            metric.as_str()
        );
        let limit = limit.clamp(1, MAX_BEST_VALUE_LIMIT);
        self.query(sql, vec![SqlValue::Integer(i64::from(limit))])
            .await
    }

    async fn market_prices(&self, model_keyword: Option<&str>) -> Result<Vec<Record>> {
        let mut sql = "SELECT * FROM current_gpu_prices".to_string();
        let mut params = Vec::new();
        if let Some(keyword) = model_keyword.map(str::trim).filter(|k| !k.is_empty()) {
            sql.push_str(" WHERE model_suffix LIKE ?1 OR chip_id LIKE ?1");
            params.push(SqlValue::Text(format!("%{keyword}%")));
        }
        self.query(sql, params).await
    }
}

fn query_blocking(path: &Path, sql: &str, params: &[SqlValue]) -> Result<Vec<Record>> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| {
        AnalystError::DataProviderError(format!("Failed to open {}: {e}", path.display()))
    })?;

    let mut stmt = conn.prepare(sql).map_err(storage_error)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(storage_error)?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(storage_error)? {
        let mut record = Record::new();
        for (idx, name) in columns.iter().enumerate() {
            let value = row.get_ref(idx).map_err(storage_error)?;
            record.insert(name.clone(), to_json(value));
        }
        records.push(record);
    }
    Ok(records)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        // NaN and infinities have no JSON form
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("{} bytes", b.len())),
    }
}

fn storage_error(e: rusqlite::Error) -> AnalystError {
    AnalystError::DataProviderError(e.to_string())
}
