use std::fs;
use std::path::Path;

use gpu_analyst_core::llm::{LlmClientConfig, OrchestratorOptions};
use gpu_analyst_core::prompt::ANALYST_SYSTEM_PROMPT;
use gpu_analyst_core::SqliteGpuStore;

use crate::ServerError;

/// Which OpenAI-compatible backend the analyst talks to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LlmProvider {
    #[default]
    OpenAi,
    Ollama,
}

impl LlmProvider {
    /// Parse `LLM_PROVIDER`; unknown values fall back to OpenAI
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" | "" => LlmProvider::OpenAi,
            "ollama" => LlmProvider::Ollama,
            other => {
                tracing::warn!(target: "api", provider = %other, "Unrecognized LLM_PROVIDER; using openai");
                LlmProvider::OpenAi
            }
        }
    }
}

/// Full configuration of the HTTP service
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Model id advertised on `/v1/models`
    pub model_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout_ms: u64,
    pub temperature: Option<f32>,
    pub system_prompt: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    /// `sqlite:///path` URL or a bare path
    pub url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = get("LLM_PROVIDER")
            .map(|p| LlmProvider::parse(&p))
            .unwrap_or_default();

        let (base_url, api_key, model) = match provider {
            LlmProvider::Ollama => (
                get("OLLAMA_BASE_URL").unwrap_or_else(|| "http://localhost:11435/v1".to_string()),
                Some(get("OLLAMA_API_KEY").unwrap_or_else(|| "ollama".to_string())),
                get("OLLAMA_MODEL").unwrap_or_else(|| "llama3.1".to_string()),
            ),
            LlmProvider::OpenAi => (
                get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                get("OPENAI_API_KEY"),
                get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            ),
        };

        Self {
            server: ServerConfig {
                host: get("GPU_ANALYST_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get("GPU_ANALYST_PORT")
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(8000),
                model_id: get("GPU_ANALYST_MODEL_ID")
                    .unwrap_or_else(|| "gpu-analyst-v1".to_string()),
            },
            llm: LlmConfig {
                provider,
                base_url,
                api_key,
                model,
                request_timeout_ms: get("LLM_TIMEOUT_MS")
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60_000),
                temperature: get("LLM_TEMPERATURE").and_then(|v| v.parse::<f32>().ok()),
                system_prompt: get("GPU_ANALYST_SYSTEM_PROMPT")
                    .unwrap_or_else(|| ANALYST_SYSTEM_PROMPT.to_string()),
            },
            database: DatabaseConfig {
                url: get("DATABASE_URL").unwrap_or_else(|| "sqlite:///gpu_database.db".to_string()),
            },
        }
    }

    /// Load configuration: `.env`, then environment, then an optional TOML file
    /// (path via GPU_ANALYST_CONFIG or ./gpu_analyst.toml) overlaid on top.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::info!(target: "api", path = %path.display(), "Loaded .env");
        }
        let base = Self::from_env();
        let path =
            std::env::var("GPU_ANALYST_CONFIG").unwrap_or_else(|_| "gpu_analyst.toml".into());
        base.overlay_file(Path::new(&path))
    }

    /// Overlay a TOML file. A missing file is fine; a broken one keeps the current values.
    pub fn overlay_file(self, path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(target: "api", path = %path.display(), "No TOML config found; using defaults/env");
            return self;
        }
        let text = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "api", error = %e, "Failed to read TOML; using defaults");
                return self;
            }
        };
        match self.clone().overlay_str(&text) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(target: "api", error = %e, "Failed to parse TOML; using defaults");
                self
            }
        }
    }

    pub fn overlay_str(self, text: &str) -> Result<Self, ServerError> {
        let parsed = toml::from_str::<AppToml>(text)
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(parsed.overlay(self))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn llm_client_config(&self) -> LlmClientConfig {
        LlmClientConfig {
            base_url: self.llm.base_url.clone(),
            api_key: self.llm.api_key.clone(),
            request_timeout_ms: self.llm.request_timeout_ms,
        }
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            model: self.llm.model.clone(),
            system_prompt: self.llm.system_prompt.clone(),
            temperature: self.llm.temperature,
        }
    }

    pub fn gpu_store(&self) -> SqliteGpuStore {
        SqliteGpuStore::from_database_url(&self.database.url)
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct AppToml {
    pub server: Option<ServerToml>,
    pub llm: Option<LlmToml>,
    pub database: Option<DatabaseToml>,
}

impl AppToml {
    fn overlay(self, mut base: AppConfig) -> AppConfig {
        if let Some(s) = self.server {
            s.apply(&mut base.server);
        }
        if let Some(l) = self.llm {
            l.apply(&mut base.llm);
        }
        if let Some(d) = self.database {
            d.apply(&mut base.database);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ServerToml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model_id: Option<String>,
}
impl ServerToml {
    fn apply(self, s: &mut ServerConfig) {
        if let Some(x) = self.host {
            s.host = x;
        }
        if let Some(x) = self.port {
            s.port = x;
        }
        if let Some(x) = self.model_id {
            s.model_id = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct LlmToml {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}
impl LlmToml {
    fn apply(self, l: &mut LlmConfig) {
        if let Some(x) = self.base_url {
            l.base_url = x;
        }
        if let Some(x) = self.api_key {
            l.api_key = Some(x);
        }
        if let Some(x) = self.model {
            l.model = x;
        }
        if let Some(x) = self.request_timeout_ms {
            l.request_timeout_ms = x;
        }
        if let Some(x) = self.temperature {
            l.temperature = Some(x);
        }
        if let Some(x) = self.system_prompt {
            l.system_prompt = x;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct DatabaseToml {
    pub url: Option<String>,
}
impl DatabaseToml {
    fn apply(self, d: &mut DatabaseConfig) {
        if let Some(x) = self.url {
            d.url = x;
        }
    }
}
