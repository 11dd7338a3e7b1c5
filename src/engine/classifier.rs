//! Remote Classifier Client - calls classification modules and turns their
//! replies into verdicts.
//!
//! Each eligible module gets one POST `{"text": ...}` with a bounded timeout.
//! A transport failure is retried exactly once; a non-200 reply is not
//! retried. Calls run concurrently and results keep module order.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Url;
use serde::Deserialize;

use crate::config::{FailureMode, ModuleDefinition};
use crate::domain::{ModuleCategory, ModuleStatus, Verdict};
use crate::engine::transport::{HttpReply, HttpTransport};

/// Attempts per module call: the first try plus one retry.
const MAX_ATTEMPTS: u32 = 2;

/// Risk levels from the jurisdictional-risk module that force a decline.
const HIGH_SEVERITY_RISK: [&str; 2] = ["UNACCEPTABLE", "HIGH"];

/// A module that passed every eligibility check, with its call URL.
#[derive(Debug, Clone)]
pub struct EligibleModule {
    pub definition: ModuleDefinition,
    pub url: Url,
}

/// Append `api_path` when `resolved` has an empty or root path.
pub fn normalize_url(resolved: &str, api_path: &str) -> Option<Url> {
    let mut url = Url::parse(resolved).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path(api_path);
    }
    Some(url)
}

/// Call URL for a module: its reported address, else its fallback.
pub fn resolve_endpoint(status: &ModuleStatus, definition: &ModuleDefinition) -> Option<Url> {
    let api_path = definition.api_path();
    status
        .url
        .as_deref()
        .filter(|u| !u.is_empty())
        .and_then(|u| normalize_url(u, &api_path))
        .or_else(|| normalize_url(&definition.fallback_url, &api_path))
}

// ==================== Response shapes ====================

#[derive(Debug, Deserialize)]
struct PiiReply {
    found_pii: bool,
    #[serde(default)]
    entities: Vec<PiiEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PiiEntity {
    Tagged {
        #[serde(rename = "type")]
        entity_type: String,
    },
    Bare(String),
}

impl PiiEntity {
    fn entity_type(&self) -> &str {
        match self {
            PiiEntity::Tagged { entity_type } => entity_type,
            PiiEntity::Bare(entity_type) => entity_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToxicityReply {
    is_toxic: bool,
}

#[derive(Debug, Deserialize)]
struct RiskReply {
    risk_level: String,
    #[serde(default)]
    category: Option<String>,
}

/// A parsed classifier reply, one variant per module category.
#[derive(Debug)]
enum ModuleReply {
    Pii(PiiReply),
    Toxicity(ToxicityReply),
    JurisdictionalRisk(RiskReply),
}

impl ModuleReply {
    /// `None` when the body is not the JSON shape the category expects.
    fn parse(category: ModuleCategory, body: &[u8]) -> Option<Self> {
        let parsed = match category {
            ModuleCategory::Pii => serde_json::from_slice(body).map(ModuleReply::Pii),
            ModuleCategory::Toxicity => serde_json::from_slice(body).map(ModuleReply::Toxicity),
            ModuleCategory::JurisdictionalRisk => {
                serde_json::from_slice(body).map(ModuleReply::JurisdictionalRisk)
            }
        };
        parsed
            .map_err(|e| tracing::debug!(category = %category, error = %e, "Unexpected classifier reply"))
            .ok()
    }

    fn triggers(&self) -> bool {
        match self {
            ModuleReply::Pii(r) => r.found_pii,
            ModuleReply::Toxicity(r) => r.is_toxic,
            ModuleReply::JurisdictionalRisk(r) => {
                let level = r.risk_level.to_uppercase();
                HIGH_SEVERITY_RISK.contains(&level.as_str())
            }
        }
    }

    fn fragment(&self) -> String {
        match self {
            ModuleReply::Pii(r) => {
                let mut types: Vec<&str> = Vec::new();
                for entity in &r.entities {
                    if !types.contains(&entity.entity_type()) {
                        types.push(entity.entity_type());
                    }
                }
                if types.is_empty() {
                    "PII Detected".to_string()
                } else {
                    format!("PII Detected ({})", types.join(" "))
                }
            }
            ModuleReply::Toxicity(_) => "Toxic Content Detected".to_string(),
            ModuleReply::JurisdictionalRisk(r) => match r.category.as_deref() {
                Some(category) if !category.is_empty() => format!(
                    "EU AI Act Violation: {} risk ({})",
                    r.risk_level.to_uppercase(),
                    category
                ),
                _ => format!("EU AI Act Violation: {} risk", r.risk_level.to_uppercase()),
            },
        }
    }

    fn into_verdict(self, module: &ModuleDefinition) -> Option<Verdict> {
        self.triggers().then(|| {
            Verdict::module(&module.name, module.category, true, self.fragment())
        })
    }
}

// ==================== Client ====================

/// Calls classification modules.
pub struct ClassifierClient {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    failure_mode: FailureMode,
}

impl ClassifierClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        timeout: Duration,
        failure_mode: FailureMode,
    ) -> Self {
        Self {
            transport,
            timeout,
            failure_mode,
        }
    }

    /// Classify `text` with every module, concurrently.
    ///
    /// Verdicts come back in `modules` order. Dropping the returned future
    /// abandons in-flight calls without retrying them.
    pub async fn classify_all(&self, modules: &[EligibleModule], text: &str) -> Vec<Verdict> {
        let calls = modules.iter().map(|m| self.classify(m, text));
        join_all(calls).await.into_iter().flatten().collect()
    }

    /// Classify `text` with one module. `None` means no verdict.
    pub async fn classify(&self, module: &EligibleModule, text: &str) -> Option<Verdict> {
        let name = &module.definition.name;
        let body = serde_json::json!({ "text": text });

        let Some(reply) = self.post_with_retry(module, &body).await else {
            return self.unavailable(&module.definition);
        };

        if !reply.is_ok() {
            tracing::warn!(
                module = %name,
                http_status = reply.status,
                "Classifier returned non-200, skipping"
            );
            return self.unavailable(&module.definition);
        }

        let verdict = ModuleReply::parse(module.definition.category, &reply.body)
            .and_then(|r| r.into_verdict(&module.definition));
        tracing::debug!(module = %name, triggered = verdict.is_some(), "Classifier call complete");
        verdict
    }

    async fn post_with_retry(
        &self,
        module: &EligibleModule,
        body: &serde_json::Value,
    ) -> Option<HttpReply> {
        let url = module.url.as_str();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.transport.post(url, Some(body), self.timeout).await {
                Ok(reply) => return Some(reply),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(module = %module.definition.name, url, error = %e, "Classifier call failed, retrying");
                }
                Err(e) => {
                    tracing::warn!(module = %module.definition.name, url, error = %e, "Classifier call failed, skipping module");
                }
            }
        }
        None
    }

    fn unavailable(&self, module: &ModuleDefinition) -> Option<Verdict> {
        match self.failure_mode {
            FailureMode::Open => None,
            FailureMode::Closed => Some(Verdict::module(
                &module.name,
                module.category,
                true,
                format!("{} unavailable", module.display_name),
            )),
        }
    }
}
