//! GPU dataset access
//!
//! `GpuDataProvider` is the boundary the tools dispatch into. "No results" is
//! an empty vector; an `Err` means the store itself is unusable.

mod sqlite;

pub use sqlite::SqliteGpuStore;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flat column → value row
pub type Record = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_BEST_VALUE_LIMIT: u32 = 5;
pub const MAX_BEST_VALUE_LIMIT: u32 = 100;

/// Ranking used by `best_value`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueMetric {
    /// Cheapest VRAM first
    #[default]
    PricePerVramGb,
    /// Highest performance per euro first
    PerformancePerEuroScore,
}

impl ValueMetric {
    pub const ALL: [ValueMetric; 2] = [
        ValueMetric::PricePerVramGb,
        ValueMetric::PerformancePerEuroScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueMetric::PricePerVramGb => "price_per_vram_gb",
            ValueMetric::PerformancePerEuroScore => "performance_per_euro_score",
        }
    }
}

impl fmt::Display for ValueMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait GpuDataProvider: Send + Sync {
    /// Technical sheet rows whose model name contains `model_name`
    async fn technical_specs(&self, model_name: &str) -> Result<Vec<Record>>;

    /// Top `limit` GPUs ranked by `metric`
    async fn best_value(&self, metric: ValueMetric, limit: u32) -> Result<Vec<Record>>;

    /// Current shop prices, optionally narrowed by a model keyword
    async fn market_prices(&self, model_keyword: Option<&str>) -> Result<Vec<Record>>;
}
