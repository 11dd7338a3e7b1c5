//! Classification module domain types.
//!
//! A module is a remote classifier service (PII scanner, toxicity scorer,
//! risk analyzer). Its persisted record only carries the enabled flag; its
//! operational status is computed on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which response contract a module speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModuleCategory {
    /// Personally identifiable information detector.
    Pii,
    /// Toxic language classifier.
    Toxicity,
    /// Regulatory (EU AI Act) risk classifier.
    JurisdictionalRisk,
}

impl std::fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleCategory::Pii => write!(f, "PII"),
            ModuleCategory::Toxicity => write!(f, "TOXICITY"),
            ModuleCategory::JurisdictionalRisk => write!(f, "JURISDICTIONAL_RISK"),
        }
    }
}

impl ModuleCategory {
    /// Lowercase key used in configuration, matching the serde name.
    pub fn config_key(&self) -> &'static str {
        match self {
            ModuleCategory::Pii => "pii",
            ModuleCategory::Toxicity => "toxicity",
            ModuleCategory::JurisdictionalRisk => "jurisdictional_risk",
        }
    }
}

/// Operational state of a module at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    NotCreated,
    Stopped,
    Running,
    Offline,
    Unknown,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleState::NotCreated => write!(f, "not_created"),
            ModuleState::Stopped => write!(f, "stopped"),
            ModuleState::Running => write!(f, "running"),
            ModuleState::Offline => write!(f, "offline"),
            ModuleState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Transient status of one known module. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ModuleStatus {
    pub name: String,
    pub display_name: String,
    pub status: ModuleState,
    /// Address reported by the resolver, if any.
    pub url: Option<String>,
    pub start_stop_supported: bool,
}

impl ModuleStatus {
    pub fn is_running(&self) -> bool {
        self.status == ModuleState::Running
    }
}

/// Persisted module record owned by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModuleRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ModuleRecord {
    pub fn new(name: impl Into<String>, display_name: Option<String>, enabled: bool) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            display_name,
            enabled,
            created_at: now,
            updated_at: now,
        }
    }
}
