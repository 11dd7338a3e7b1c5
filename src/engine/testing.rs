//! In-process fakes for the engine's collaborator seams.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ModuleRecord, Rule};
use crate::engine::gate::ModuleCatalog;
use crate::engine::matcher::RuleStore;
use crate::engine::supervisor::{ContainerState, ContainerSupervisor, SupervisorError};
use crate::engine::transport::{HttpReply, HttpTransport, TransportError};
use crate::error::{GatewayError, GatewayResult};

type Scripted = Result<HttpReply, TransportError>;

/// One request seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub timeout: Duration,
}

/// Transport that answers from per-URL queues.
///
/// Replies are consumed in order; the last one queued for a URL keeps
/// answering. URLs with nothing queued fail with a transport error.
/// Hanging URLs never answer.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Scripted>>>,
    hanging: Mutex<HashSet<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, url: &str, reply: Scripted) {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Requests to `url` stay pending until the caller drops them.
    pub fn hang(&self, url: &str) {
        self.hanging.lock().unwrap().insert(url.to_string());
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.url == url).count()
    }

    /// Timeouts passed with each request to `url`, in call order.
    pub fn timeouts_to(&self, url: &str) -> Vec<Duration> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.url == url)
            .map(|c| c.timeout)
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_body(&self, url: &str) -> Option<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.url == url)
            .and_then(|c| c.body.clone())
    }

    async fn answer(&self, url: &str, body: Option<&serde_json::Value>, timeout: Duration) -> Scripted {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            body: body.cloned(),
            timeout,
        });

        let hanging = self.hanging.lock().unwrap().contains(url);
        if hanging {
            std::future::pending::<()>().await;
        }

        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if queue.len() == 1 => queue[0].clone(),
            _ => Err(TransportError::Request(format!("no route to {}", url))),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, TransportError> {
        self.answer(url, None, timeout).await
    }

    async fn post(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        self.answer(url, body, timeout).await
    }
}

/// Supervisor backed by a fixed container table.
pub struct FakeSupervisor {
    pub reachable: bool,
    pub containers: HashMap<String, String>,
    pub started: Mutex<Vec<String>>,
}

impl FakeSupervisor {
    pub fn new(containers: &[(&str, &str)]) -> Self {
        Self {
            reachable: true,
            containers: containers
                .iter()
                .map(|(name, status)| (name.to_string(), status.to_string()))
                .collect(),
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new(&[])
        }
    }
}

#[async_trait]
impl ContainerSupervisor for FakeSupervisor {
    async fn ping(&self) -> bool {
        self.reachable
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerState>, SupervisorError> {
        if !self.reachable {
            return Err(SupervisorError::Unreachable("down".to_string()));
        }
        Ok(self.containers.get(name).map(|status| ContainerState {
            status: status.clone(),
        }))
    }

    async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        if !self.containers.contains_key(name) {
            return Err(SupervisorError::NotFound(name.to_string()));
        }
        self.started.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        if !self.containers.contains_key(name) {
            return Err(SupervisorError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

/// Rule store over a fixed list. Returns only active rules, like the real one.
#[derive(Default)]
pub struct InMemoryRules {
    pub rules: Vec<Rule>,
    pub fail: bool,
}

impl InMemoryRules {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules, fail: false }
    }
}

#[async_trait]
impl RuleStore for InMemoryRules {
    async fn list_active_rules(&self) -> GatewayResult<Vec<Rule>> {
        if self.fail {
            return Err(GatewayError::Unavailable("rule store offline".to_string()));
        }
        Ok(self.rules.iter().filter(|r| r.active).cloned().collect())
    }
}

/// Module catalog over a fixed map.
#[derive(Default)]
pub struct InMemoryCatalog {
    pub records: HashMap<String, ModuleRecord>,
    pub fail: bool,
}

impl InMemoryCatalog {
    pub fn with_disabled(names: &[&str]) -> Self {
        Self {
            records: names
                .iter()
                .map(|n| (n.to_string(), ModuleRecord::new(*n, None, false)))
                .collect(),
            fail: false,
        }
    }
}

#[async_trait]
impl ModuleCatalog for InMemoryCatalog {
    async fn get_module(&self, name: &str) -> GatewayResult<Option<ModuleRecord>> {
        if self.fail {
            return Err(GatewayError::Unavailable("catalog offline".to_string()));
        }
        Ok(self.records.get(name).cloned())
    }
}
