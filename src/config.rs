//! Configuration module for Sentinel Gateway.
//!
//! Loads configuration from YAML files and environment variables.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use reqwest::Url;
use serde::Deserialize;

use crate::domain::ModuleCategory;
use crate::error::{GatewayError, GatewayResult};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// How module status is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Modules are containers managed by a local container engine.
    Local,
    /// Modules are externally hosted services probed over HTTP.
    Remote,
}

/// What to do when an eligible module cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Skip the module and decide on the remaining checks.
    #[default]
    Open,
    /// Treat the unreachable module as a declining check.
    Closed,
}

/// One known classification module.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDefinition {
    /// Container/service name, e.g. `sentinel-presidio`.
    pub name: String,
    pub display_name: String,
    pub category: ModuleCategory,
    /// Classify endpoint used when the resolver reports no address.
    /// Its path is the module's API path.
    pub fallback_url: String,
    /// Base URL of the hosted service (remote mode only).
    #[serde(default)]
    pub remote_url: Option<String>,
}

impl ModuleDefinition {
    /// Path component of the fallback URL, e.g. `/analyze`.
    pub fn api_path(&self) -> String {
        Url::parse(&self.fallback_url)
            .map(|u| u.path().to_string())
            .unwrap_or_default()
    }
}

/// Docker Engine endpoint used when neither `docker_url` nor `DOCKER_HOST` is set.
pub const DEFAULT_DOCKER_URL: &str = "http://localhost:2375";

/// Classification module configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModulesConfig {
    pub mode: RunMode,
    /// Health probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Classification call timeout in milliseconds.
    #[serde(default = "default_classify_timeout_ms")]
    pub classify_timeout_ms: u64,
    /// Docker Engine API endpoint (local mode only). Falls back to
    /// `DOCKER_HOST`, then [`DEFAULT_DOCKER_URL`].
    #[serde(default)]
    pub docker_url: Option<String>,
    /// If non-empty, only these catalog entries are known to the gateway.
    #[serde(default)]
    pub enabled_modules: Vec<String>,
    #[serde(default = "default_catalog")]
    pub catalog: Vec<ModuleDefinition>,
    /// Remote base URLs keyed by module name or by category (`pii`,
    /// `toxicity`, `jurisdictional_risk`). Takes precedence over the
    /// catalog's `remote_url`, e.g. `SENTINEL__MODULES__REMOTE_URLS__PII`.
    #[serde(default)]
    pub remote_urls: HashMap<String, String>,
}

/// Evaluation policy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub failure_mode: FailureMode,
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_classify_timeout_ms() -> u64 {
    5000
}

fn default_catalog() -> Vec<ModuleDefinition> {
    vec![
        ModuleDefinition {
            name: "sentinel-presidio".to_string(),
            display_name: "Presidio PII Scanner".to_string(),
            category: ModuleCategory::Pii,
            fallback_url: "http://sentinel-presidio:8000/analyze".to_string(),
            remote_url: None,
        },
        ModuleDefinition {
            name: "sentinel-toxicity".to_string(),
            display_name: "Toxicity Classifier".to_string(),
            category: ModuleCategory::Toxicity,
            fallback_url: "http://sentinel-toxicity:8000/predict".to_string(),
            remote_url: None,
        },
        ModuleDefinition {
            name: "sentinel-eu-ai".to_string(),
            display_name: "EU AI Act Analyzer".to_string(),
            category: ModuleCategory::JurisdictionalRisk,
            fallback_url: "http://sentinel-eu-ai:8000/analyze_risk".to_string(),
            remote_url: None,
        },
    ]
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Local,
            probe_timeout_ms: default_probe_timeout_ms(),
            classify_timeout_ms: default_classify_timeout_ms(),
            docker_url: None,
            enabled_modules: Vec::new(),
            catalog: default_catalog(),
            remote_urls: HashMap::new(),
        }
    }
}

impl ModulesConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    /// Docker Engine API base URL for local mode.
    pub fn docker_endpoint(&self) -> String {
        resolve_docker_url(
            self.docker_url.as_deref(),
            std::env::var("DOCKER_HOST").ok().as_deref(),
        )
    }

    /// Catalog entries the gateway should know about, honouring
    /// `enabled_modules` and with `remote_urls` overrides applied.
    pub fn known_modules(&self) -> Vec<ModuleDefinition> {
        self.catalog
            .iter()
            .filter(|m| self.enabled_modules.is_empty() || self.enabled_modules.contains(&m.name))
            .map(|m| {
                let mut module = m.clone();
                if let Some(url) = self.remote_url_override(&module) {
                    module.remote_url = Some(url.to_string());
                }
                module
            })
            .collect()
    }

    fn remote_url_override(&self, module: &ModuleDefinition) -> Option<&str> {
        self.remote_urls
            .get(&module.name)
            .or_else(|| self.remote_urls.get(module.category.config_key()))
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.probe_timeout_ms == 0 || self.classify_timeout_ms == 0 {
            return Err(GatewayError::Config(
                "module timeouts must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for module in &self.catalog {
            if module.name.trim().is_empty() {
                return Err(GatewayError::Config("module name must not be empty".to_string()));
            }
            if !seen.insert(module.name.as_str()) {
                return Err(GatewayError::Config(format!(
                    "duplicate module name: {}",
                    module.name
                )));
            }

            let fallback = Url::parse(&module.fallback_url).map_err(|e| {
                GatewayError::Config(format!(
                    "invalid fallback_url for {}: {}",
                    module.name, e
                ))
            })?;
            if !matches!(fallback.scheme(), "http" | "https") {
                return Err(GatewayError::Config(format!(
                    "fallback_url for {} must be http(s)",
                    module.name
                )));
            }
            if fallback.path().is_empty() || fallback.path() == "/" {
                return Err(GatewayError::Config(format!(
                    "fallback_url for {} must include the API path",
                    module.name
                )));
            }
        }

        for (key, url) in &self.remote_urls {
            let known = self
                .catalog
                .iter()
                .any(|m| m.name == *key || m.category.config_key() == key.as_str());
            if !known {
                tracing::warn!(key = %key, "remote_urls entry matches no catalog module");
            }
            if url.is_empty() {
                continue;
            }
            let parsed = Url::parse(url).map_err(|e| {
                GatewayError::Config(format!("invalid remote URL for {}: {}", key, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(GatewayError::Config(format!(
                    "remote URL for {} must be http(s)",
                    key
                )));
            }
        }

        for name in &self.enabled_modules {
            if !seen.contains(name.as_str()) {
                tracing::warn!(module = %name, "enabled_modules names a module missing from the catalog");
            }
        }

        Ok(())
    }
}

/// Pick the Docker Engine endpoint: explicit config, then `DOCKER_HOST`
/// (`tcp://` is rewritten to `http://`), then [`DEFAULT_DOCKER_URL`].
///
/// Unix sockets are not reachable over the HTTP transport; expose the
/// engine on TCP or through a socket proxy instead.
pub fn resolve_docker_url(configured: Option<&str>, docker_host: Option<&str>) -> String {
    if let Some(url) = configured.filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    match docker_host.filter(|h| !h.is_empty()) {
        Some(host) if host.starts_with("tcp://") => host.replacen("tcp://", "http://", 1),
        Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
            host.to_string()
        }
        Some(host) => {
            tracing::warn!(
                docker_host = %host,
                fallback = DEFAULT_DOCKER_URL,
                "DOCKER_HOST is not a TCP endpoint, using default"
            );
            DEFAULT_DOCKER_URL.to_string()
        }
        None => DEFAULT_DOCKER_URL.to_string(),
    }
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (SENTINEL__*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Self::environment())
    }

    /// The `SENTINEL__*` environment source.
    fn environment() -> Environment {
        Environment::with_prefix("SENTINEL")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("modules.enabled_modules")
            .try_parsing(true)
    }

    fn load_with(environment: Environment) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default config
            .add_source(File::with_name("config/default").required(false))
            // Layer on local overrides
            .add_source(File::with_name("config/local").required(false))
            // Layer on environment variables with SENTINEL_ prefix
            .add_source(environment)
            .build()?;

        config.try_deserialize()
    }
}
