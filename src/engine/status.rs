//! Status Resolver - determines which modules are up and where they live.
//!
//! Two strategies exist. Local mode asks a container supervisor about each
//! module by name; remote mode probes each module's `/health` endpoint.
//! Resolution never fails: probe problems degrade to `offline`/`unknown`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::config::{ModuleDefinition, ModulesConfig, RunMode};
use crate::domain::{ModuleState, ModuleStatus};
use crate::engine::supervisor::{ContainerSupervisor, DockerEngineSupervisor, SupervisorError};
use crate::engine::transport::HttpTransport;
use crate::error::{GatewayError, GatewayResult};

/// Trait for module status providers.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// The static list of modules this gateway knows about, in fixed order.
    fn known_modules(&self) -> &[ModuleDefinition];

    /// Compute a fresh status for every known module, in `known_modules` order.
    async fn resolve(&self) -> Vec<ModuleStatus>;

    async fn start_module(&self, name: &str) -> GatewayResult<()>;

    async fn stop_module(&self, name: &str) -> GatewayResult<()>;

    fn definition(&self, name: &str) -> Option<&ModuleDefinition> {
        self.known_modules().iter().find(|m| m.name == name)
    }
}

/// Build the provider selected by `modules.mode`.
pub fn build_status_provider(
    config: &ModulesConfig,
    transport: Arc<dyn HttpTransport>,
) -> GatewayResult<Arc<dyn StatusProvider>> {
    config.validate()?;
    let modules = config.known_modules();

    let provider: Arc<dyn StatusProvider> = match config.mode {
        RunMode::Local => {
            let supervisor =
                DockerEngineSupervisor::new(&config.docker_endpoint(), transport, config.probe_timeout());
            Arc::new(LocalStatusProvider::new(modules, Arc::new(supervisor)))
        }
        RunMode::Remote => Arc::new(RemoteStatusProvider::new(
            modules,
            transport,
            config.probe_timeout(),
        )),
    };

    Ok(provider)
}

// ==================== Local mode ====================

/// Resolves status through a container supervisor.
pub struct LocalStatusProvider {
    modules: Vec<ModuleDefinition>,
    supervisor: Arc<dyn ContainerSupervisor>,
}

impl LocalStatusProvider {
    pub fn new(modules: Vec<ModuleDefinition>, supervisor: Arc<dyn ContainerSupervisor>) -> Self {
        Self { modules, supervisor }
    }

    fn status(module: &ModuleDefinition, state: ModuleState) -> ModuleStatus {
        ModuleStatus {
            name: module.name.clone(),
            display_name: module.display_name.clone(),
            status: state,
            url: None,
            start_stop_supported: true,
        }
    }

    async fn resolve_one(&self, module: &ModuleDefinition) -> ModuleStatus {
        let state = match self.supervisor.inspect(&module.name).await {
            Ok(Some(container)) if container.is_running() => ModuleState::Running,
            Ok(Some(_)) => ModuleState::Stopped,
            Ok(None) => ModuleState::NotCreated,
            Err(e) => {
                tracing::warn!(module = %module.name, error = %e, "Container lookup failed");
                ModuleState::Unknown
            }
        };
        Self::status(module, state)
    }

    fn known(&self, name: &str) -> GatewayResult<()> {
        self.definition(name)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(format!("Module {} not found", name)))
    }
}

fn lifecycle_error(name: &str, e: SupervisorError) -> GatewayError {
    match e {
        SupervisorError::NotFound(_) => {
            GatewayError::NotFound(format!("Container for module {} not found", name))
        }
        other => GatewayError::Unavailable(format!("module {}: {}", name, other)),
    }
}

#[async_trait]
impl StatusProvider for LocalStatusProvider {
    fn known_modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }

    async fn resolve(&self) -> Vec<ModuleStatus> {
        if !self.supervisor.ping().await {
            // Toggling is still offered; it may fail later.
            return self
                .modules
                .iter()
                .map(|m| Self::status(m, ModuleState::Unknown))
                .collect();
        }

        join_all(self.modules.iter().map(|m| self.resolve_one(m))).await
    }

    async fn start_module(&self, name: &str) -> GatewayResult<()> {
        self.known(name)?;
        self.supervisor
            .start(name)
            .await
            .map_err(|e| lifecycle_error(name, e))?;
        tracing::info!(module = %name, "Module started");
        Ok(())
    }

    async fn stop_module(&self, name: &str) -> GatewayResult<()> {
        self.known(name)?;
        self.supervisor
            .stop(name)
            .await
            .map_err(|e| lifecycle_error(name, e))?;
        tracing::info!(module = %name, "Module stopped");
        Ok(())
    }
}

// ==================== Remote mode ====================

/// Resolves status by probing each module's health endpoint.
pub struct RemoteStatusProvider {
    modules: Vec<ModuleDefinition>,
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl RemoteStatusProvider {
    pub fn new(
        modules: Vec<ModuleDefinition>,
        transport: Arc<dyn HttpTransport>,
        timeout: Duration,
    ) -> Self {
        Self {
            modules,
            transport,
            timeout,
        }
    }

    async fn resolve_one(&self, module: &ModuleDefinition) -> ModuleStatus {
        let (status, url) = match module.remote_url.as_deref().filter(|u| !u.is_empty()) {
            None => (ModuleState::NotCreated, None),
            Some(base) => (self.probe(&module.name, base).await, Some(base.to_string())),
        };

        ModuleStatus {
            name: module.name.clone(),
            display_name: module.display_name.clone(),
            status,
            url,
            start_stop_supported: false,
        }
    }

    async fn probe(&self, name: &str, base: &str) -> ModuleState {
        let Some(health_url) = health_url(base) else {
            tracing::warn!(module = %name, url = %base, "Remote URL is not a valid base URL");
            return ModuleState::Offline;
        };
        match self.transport.get(health_url.as_str(), self.timeout).await {
            Ok(reply) => {
                let state = interpret_health(reply.status, &reply.body);
                tracing::debug!(module = %name, http_status = reply.status, state = %state, "Health probe complete");
                state
            }
            Err(e) => {
                tracing::warn!(module = %name, url = %health_url, error = %e, "Health probe failed");
                ModuleState::Offline
            }
        }
    }
}

#[async_trait]
impl StatusProvider for RemoteStatusProvider {
    fn known_modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }

    async fn resolve(&self) -> Vec<ModuleStatus> {
        join_all(self.modules.iter().map(|m| self.resolve_one(m))).await
    }

    async fn start_module(&self, name: &str) -> GatewayResult<()> {
        Err(GatewayError::BadRequest(format!(
            "Module {} is externally managed in remote mode",
            name
        )))
    }

    async fn stop_module(&self, name: &str) -> GatewayResult<()> {
        self.start_module(name).await
    }
}

/// `<base>/health`, keeping any query string on `base`.
pub fn health_url(base: &str) -> Option<reqwest::Url> {
    let mut url = reqwest::Url::parse(base).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    let path = format!("{}/health", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Some(url)
}

/// Map a health probe reply to a module state.
///
/// Non-200 is offline. Otherwise `model_loaded`, then `activated`, decide by
/// truthiness; a 200 without either field (or without JSON) is running.
pub fn interpret_health(status: u16, body: &[u8]) -> ModuleState {
    if status != 200 {
        return ModuleState::Offline;
    }

    let flag = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map
            .get("model_loaded")
            .or_else(|| map.get("activated"))
            .map(is_truthy),
        _ => None,
    };

    match flag {
        Some(false) => ModuleState::Offline,
        Some(true) | None => ModuleState::Running,
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModuleCategory;
    use crate::engine::testing::{FakeSupervisor, ScriptedTransport};
    use crate::engine::transport::{HttpReply, TransportError};
    use serde_json::json;

    fn module(name: &str, remote_url: Option<&str>) -> ModuleDefinition {
        ModuleDefinition {
            name: name.to_string(),
            display_name: name.to_string(),
            category: ModuleCategory::Toxicity,
            fallback_url: format!("http://{}:8000/predict", name),
            remote_url: remote_url.map(str::to_string),
        }
    }

    #[test]
    fn test_interpret_health() {
        let ok = |v: serde_json::Value| interpret_health(200, v.to_string().as_bytes());

        assert_eq!(ok(json!({"status": "ok", "model_loaded": false})), ModuleState::Offline);
        assert_eq!(ok(json!({"status": "ok", "model_loaded": true})), ModuleState::Running);
        assert_eq!(ok(json!({"status": "ok", "activated": true})), ModuleState::Running);
        assert_eq!(ok(json!({"status": "ok", "activated": false})), ModuleState::Offline);
        assert_eq!(ok(json!({"status": "ok"})), ModuleState::Running);
        assert_eq!(interpret_health(200, b"not json"), ModuleState::Running);
        assert_eq!(interpret_health(200, b""), ModuleState::Running);
        assert_eq!(interpret_health(500, b"{}"), ModuleState::Offline);
    }

    #[test]
    fn test_health_url() {
        let url = |base: &str| health_url(base).map(|u| u.to_string());
        assert_eq!(url("https://tox.example").as_deref(), Some("https://tox.example/health"));
        assert_eq!(url("https://tox.example/").as_deref(), Some("https://tox.example/health"));
        assert_eq!(
            url("https://tox.example/v1/").as_deref(),
            Some("https://tox.example/v1/health")
        );
        assert_eq!(
            url("https://tox.example/?key=x").as_deref(),
            Some("https://tox.example/health?key=x")
        );
        assert_eq!(url("not a url"), None);
    }

    #[test]
    fn test_model_loaded_takes_priority_over_activated() {
        let body = json!({"model_loaded": false, "activated": true}).to_string();
        assert_eq!(interpret_health(200, body.as_bytes()), ModuleState::Offline);

        let body = json!({"model_loaded": 1, "activated": false}).to_string();
        assert_eq!(interpret_health(200, body.as_bytes()), ModuleState::Running);
    }

    #[tokio::test]
    async fn test_local_statuses() {
        let supervisor = FakeSupervisor::new(&[("tox", "running"), ("pii", "exited")]);
        let provider = LocalStatusProvider::new(
            vec![module("tox", None), module("pii", None), module("eu", None)],
            Arc::new(supervisor),
        );

        let statuses = provider.resolve().await;
        let states: Vec<ModuleState> = statuses.iter().map(|s| s.status).collect();
        assert_eq!(
            states,
            vec![ModuleState::Running, ModuleState::Stopped, ModuleState::NotCreated]
        );
        assert!(statuses.iter().all(|s| s.start_stop_supported && s.url.is_none()));
    }

    #[tokio::test]
    async fn test_local_unreachable_supervisor_is_unknown() {
        let provider = LocalStatusProvider::new(
            vec![module("tox", None), module("pii", None)],
            Arc::new(FakeSupervisor::unreachable()),
        );

        let statuses = provider.resolve().await;
        assert!(statuses
            .iter()
            .all(|s| s.status == ModuleState::Unknown && s.start_stop_supported));
    }

    #[tokio::test]
    async fn test_local_lifecycle() {
        let supervisor = Arc::new(FakeSupervisor::new(&[("tox", "exited")]));
        let provider = LocalStatusProvider::new(vec![module("tox", None)], supervisor.clone());

        provider.start_module("tox").await.unwrap();
        assert_eq!(supervisor.started.lock().unwrap().as_slice(), ["tox".to_string()]);
        assert!(matches!(
            provider.start_module("unknown").await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_statuses() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            "https://tox.example/health",
            Ok(HttpReply::json(json!({"model_loaded": true}))),
        );
        transport.reply(
            "https://pii.example/health",
            Err(TransportError::Timeout("3s".to_string())),
        );

        let provider = RemoteStatusProvider::new(
            vec![
                module("tox", Some("https://tox.example/")),
                module("pii", Some("https://pii.example")),
                module("eu", None),
            ],
            transport.clone(),
            Duration::from_secs(3),
        );

        let statuses = provider.resolve().await;
        assert_eq!(statuses[0].status, ModuleState::Running);
        assert_eq!(statuses[0].url.as_deref(), Some("https://tox.example/"));
        assert_eq!(statuses[1].status, ModuleState::Offline);
        assert_eq!(statuses[2].status, ModuleState::NotCreated);
        assert_eq!(statuses[2].url, None);
        assert!(statuses.iter().all(|s| !s.start_stop_supported));
        assert_eq!(
            transport.timeouts_to("https://tox.example/health"),
            vec![Duration::from_secs(3)]
        );
    }

    #[tokio::test]
    async fn test_built_providers_probe_with_probe_timeout() {
        let mut config = ModulesConfig {
            probe_timeout_ms: 1500,
            classify_timeout_ms: 9000,
            docker_url: Some("http://docker.example:2375".to_string()),
            ..ModulesConfig::default()
        };
        let transport = Arc::new(ScriptedTransport::new());

        build_status_provider(&config, transport.clone())
            .unwrap()
            .resolve()
            .await;
        assert_eq!(
            transport.timeouts_to("http://docker.example:2375/_ping"),
            vec![Duration::from_millis(1500)]
        );

        config.mode = RunMode::Remote;
        config
            .remote_urls
            .insert("toxicity".to_string(), "https://tox.example".to_string());
        build_status_provider(&config, transport.clone())
            .unwrap()
            .resolve()
            .await;
        assert_eq!(
            transport.timeouts_to("https://tox.example/health"),
            vec![Duration::from_millis(1500)]
        );
    }

    #[tokio::test]
    async fn test_remote_lifecycle_rejected() {
        let provider = RemoteStatusProvider::new(
            vec![module("tox", Some("https://tox.example"))],
            Arc::new(ScriptedTransport::new()),
            Duration::from_secs(3),
        );
        assert!(matches!(
            provider.stop_module("tox").await,
            Err(GatewayError::BadRequest(_))
        ));
    }

    #[test]
    fn test_build_provider_validates_config() {
        let mut config = ModulesConfig::default();
        config.catalog[0].fallback_url = "not a url".to_string();
        let result = build_status_provider(&config, Arc::new(ScriptedTransport::new()));
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }
}
