use crate::data::{GpuDataProvider, Record, ValueMetric, DEFAULT_BEST_VALUE_LIMIT};
use crate::tools::{Tool, ToolError, ToolResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

fn parse_args<T: DeserializeOwned>(arguments: Value) -> ToolResult<T> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn records_to_value(result: crate::Result<Vec<Record>>) -> ToolResult<Value> {
    result
        .map(|rows| Value::Array(rows.into_iter().map(Value::Object).collect()))
        .map_err(|e| match e {
            crate::AnalystError::DataProviderError(message) => ToolError::ExecutionFailed(message),
            other => ToolError::ExecutionFailed(other.to_string()),
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// get_gpu_technical_specs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TechnicalSpecsArgs {
    model_name: String,
}

pub struct TechnicalSpecsTool {
    provider: Arc<dyn GpuDataProvider>,
}

impl TechnicalSpecsTool {
    pub fn new(provider: Arc<dyn GpuDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for TechnicalSpecsTool {
    fn name(&self) -> String {
        "get_gpu_technical_specs".to_string()
    }

    fn description(&self) -> String {
        "Technical specifications of a GPU model (VRAM, cores, TDP).".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "model_name": {
                    "type": "string",
                    "description": "Model name or fragment, e.g. 'RTX 4090'"
                }
            },
            "required": ["model_name"]
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let args: TechnicalSpecsArgs = parse_args(arguments)?;
        records_to_value(self.provider.technical_specs(&args.model_name).await)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// find_best_value_gpus
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct BestValueArgs {
    #[serde(default)]
    metric: Option<ValueMetric>,
    #[serde(default)]
    limit: Option<u32>,
}

pub struct BestValueTool {
    provider: Arc<dyn GpuDataProvider>,
}

impl BestValueTool {
    pub fn new(provider: Arc<dyn GpuDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for BestValueTool {
    fn name(&self) -> String {
        "find_best_value_gpus".to_string()
    }

    fn description(&self) -> String {
        "Best value for money, either by price per GB of VRAM or by performance per euro."
            .to_string()
    }

    fn parameters(&self) -> Value {
        let metrics: Vec<&str> = ValueMetric::ALL.iter().map(|m| m.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "metric": {
                    "type": "string",
                    "enum": metrics,
                    "description": "Ranking metric; defaults to price_per_vram_gb"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "default": DEFAULT_BEST_VALUE_LIMIT,
                    "description": "Number of GPUs to return"
                }
            }
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let args: BestValueArgs = parse_args(arguments)?;
        let metric = args.metric.unwrap_or_default();
        let limit = args.limit.unwrap_or(DEFAULT_BEST_VALUE_LIMIT);
        records_to_value(self.provider.best_value(metric, limit).await)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// check_market_prices
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct MarketPricesArgs {
    #[serde(default)]
    model_keyword: Option<String>,
}

pub struct MarketPricesTool {
    provider: Arc<dyn GpuDataProvider>,
}

impl MarketPricesTool {
    pub fn new(provider: Arc<dyn GpuDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for MarketPricesTool {
    fn name(&self) -> String {
        "check_market_prices".to_string()
    }

    fn description(&self) -> String {
        "Current prices and availability in shops.".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "model_keyword": {
                    "type": "string",
                    "description": "Optional model or chip keyword; omit to list everything"
                }
            }
        })
    }

    async fn call(&self, arguments: Value) -> ToolResult<Value> {
        let args: MarketPricesArgs = parse_args(arguments)?;
        records_to_value(
            self.provider
                .market_prices(args.model_keyword.as_deref())
                .await,
        )
    }
}
