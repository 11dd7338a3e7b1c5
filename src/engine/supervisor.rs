//! Container supervisor used in local mode.
//!
//! Talks to the Docker Engine HTTP API (`DOCKER_HOST=tcp://...` style
//! endpoint) to look up module containers and start or stop them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::engine::transport::HttpTransport;

/// State reported by the container engine for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    /// Raw engine status: `running`, `exited`, `paused`, `created`, ...
    pub status: String,
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("container engine unreachable: {0}")]
    Unreachable(String),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container engine rejected request with status {0}")]
    Rejected(u16),

    #[error("malformed container engine response: {0}")]
    Malformed(String),
}

/// Query and control interface of a container/process supervisor.
#[async_trait]
pub trait ContainerSupervisor: Send + Sync {
    /// Whether the supervisor answers at all.
    async fn ping(&self) -> bool;

    /// Look up a container by exact name. `Ok(None)` means it does not exist.
    async fn inspect(&self, name: &str) -> Result<Option<ContainerState>, SupervisorError>;

    async fn start(&self, name: &str) -> Result<(), SupervisorError>;

    async fn stop(&self, name: &str) -> Result<(), SupervisorError>;
}

#[derive(Debug, Deserialize)]
struct InspectBody {
    #[serde(rename = "State")]
    state: InspectState,
}

#[derive(Debug, Deserialize)]
struct InspectState {
    #[serde(rename = "Status")]
    status: String,
}

/// Docker Engine API client.
pub struct DockerEngineSupervisor {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl DockerEngineSupervisor {
    pub fn new(base_url: &str, transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            timeout,
        }
    }

    fn container_url(&self, name: &str, op: &str) -> String {
        format!("{}/containers/{}/{}", self.base_url, name, op)
    }

    async fn lifecycle(&self, name: &str, op: &str) -> Result<(), SupervisorError> {
        let reply = self
            .transport
            .post(&self.container_url(name, op), None, self.timeout)
            .await
            .map_err(|e| SupervisorError::Unreachable(e.to_string()))?;

        match reply.status {
            // 304: already in the requested state
            200..=299 | 304 => Ok(()),
            404 => Err(SupervisorError::NotFound(name.to_string())),
            status => Err(SupervisorError::Rejected(status)),
        }
    }
}

#[async_trait]
impl ContainerSupervisor for DockerEngineSupervisor {
    async fn ping(&self) -> bool {
        match self
            .transport
            .get(&format!("{}/_ping", self.base_url), self.timeout)
            .await
        {
            Ok(reply) => reply.is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, url = %self.base_url, "Container engine unreachable");
                false
            }
        }
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerState>, SupervisorError> {
        let reply = self
            .transport
            .get(&self.container_url(name, "json"), self.timeout)
            .await
            .map_err(|e| SupervisorError::Unreachable(e.to_string()))?;

        match reply.status {
            200 => {
                let body: InspectBody = serde_json::from_slice(&reply.body)
                    .map_err(|e| SupervisorError::Malformed(e.to_string()))?;
                Ok(Some(ContainerState {
                    status: body.state.status,
                }))
            }
            404 => Ok(None),
            status => Err(SupervisorError::Rejected(status)),
        }
    }

    async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        self.lifecycle(name, "start").await
    }

    async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        self.lifecycle(name, "stop").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedTransport;
    use crate::engine::transport::{HttpReply, TransportError};

    fn supervisor(transport: Arc<ScriptedTransport>) -> DockerEngineSupervisor {
        DockerEngineSupervisor::new("http://docker:2375/", transport, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_inspect_running_container() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            "http://docker:2375/containers/sentinel-presidio/json",
            Ok(HttpReply::json(serde_json::json!({
                "Name": "/sentinel-presidio",
                "State": {"Status": "running", "Running": true}
            }))),
        );

        let state = supervisor(transport)
            .inspect("sentinel-presidio")
            .await
            .unwrap()
            .unwrap();
        assert!(state.is_running());
    }

    #[tokio::test]
    async fn test_inspect_missing_container() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            "http://docker:2375/containers/sentinel-eu-ai/json",
            Ok(HttpReply::new(404, r#"{"message":"No such container"}"#)),
        );

        assert_eq!(supervisor(transport).inspect("sentinel-eu-ai").await, Ok(None));
    }

    #[tokio::test]
    async fn test_ping_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            "http://docker:2375/_ping",
            Err(TransportError::Request("connection refused".to_string())),
        );

        assert!(!supervisor(transport).ping().await);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(
            "http://docker:2375/containers/sentinel-toxicity/start",
            Ok(HttpReply::new(204, "")),
        );
        transport.reply(
            "http://docker:2375/containers/sentinel-toxicity/stop",
            Ok(HttpReply::new(304, "")),
        );
        transport.reply(
            "http://docker:2375/containers/ghost/start",
            Ok(HttpReply::new(404, "")),
        );

        let supervisor = supervisor(transport.clone());
        assert!(supervisor.start("sentinel-toxicity").await.is_ok());
        assert!(supervisor.stop("sentinel-toxicity").await.is_ok());
        assert_eq!(
            supervisor.start("ghost").await,
            Err(SupervisorError::NotFound("ghost".to_string()))
        );
        assert_eq!(
            transport.calls_to("http://docker:2375/containers/sentinel-toxicity/start"),
            1
        );
    }
}
