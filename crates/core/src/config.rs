use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub models: ModelsConfig,
    pub search: SearchConfig,
    pub sessions: SessionConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub enable_tracing: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelsConfig {
    pub api_base: String,
    pub vision_model: String,
    pub image_model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub api_key: Option<Secret<String>>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    pub engine: String,
    pub language: String,
    pub result_count: usize,
    pub timeout_secs: u64,
}

/// Bounds on the in-memory session store.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub max_sessions: usize,
    pub idle_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub json_logs: bool,
    pub log_filter: String,
    pub metrics_enabled: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("RIPPLE_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__SEARCH__ENABLED=false to search.enabled
            .add_source(Environment::with_prefix("APP").separator("__").try_parsing(true))
            .build()?;

        let cfg: Self = s.try_deserialize()?;
        Ok(cfg.with_env_credentials())
    }

    /// Load from a single file, without environment overrides.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(path))
            .build()?
            .try_deserialize()
    }

    /// Fill missing credentials from the provider-conventional variables.
    pub fn with_env_credentials(mut self) -> Self {
        if self.models.api_key.is_none() {
            self.models.api_key = non_empty_env("GOOGLE_API_KEY")
                .or_else(|| non_empty_env("GEMINI_API_KEY"))
                .map(Secret::new);
        }
        if self.search.api_key.is_none() {
            self.search.api_key = non_empty_env("SERP_API_KEY").map(Secret::new);
        }
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
            max_upload_bytes: 20 * 1024 * 1024, // 20MB
            enable_tracing: true,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".into(),
            vision_model: "gemini-2.0-flash".into(),
            image_model: "gemini-2.5-flash-image".into(),
            temperature: 0.5,
            request_timeout_secs: 90,
            api_key: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://serpapi.com/search".into(),
            engine: "google".into(),
            language: "zh-cn".into(),
            result_count: 5,
            timeout_secs: 10,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 256,
            idle_ttl_secs: 30 * 60,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_filter: "info,ripple=debug".into(),
            metrics_enabled: true,
        }
    }
}
