//! API request and response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ModuleState, Rule, RuleKind, Severity};
use crate::engine::{compile_pattern, ModuleOverview};
use crate::error::{GatewayError, GatewayResult};

// ==================== Prompts ====================

/// Request to evaluate a prompt.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EvaluatePromptRequest {
    /// The text to evaluate.
    pub prompt_text: String,
    /// What the prompt will be used for.
    pub intended_use: String,
    /// Optional free-form context.
    #[serde(default)]
    pub context: Option<String>,
}

/// Query parameters for prompt history.
#[derive(Debug, Deserialize, ToSchema)]
pub struct HistoryQuery {
    /// Maximum number of results.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Offset for pagination.
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

// ==================== Rules ====================

/// Body for creating or replacing a rule.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RuleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: RuleKind,
    /// e.g. `{"pattern": "bomb"}` for regex rules.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_severity() -> Severity {
    Severity::Block
}

fn default_active() -> bool {
    true
}

impl RuleRequest {
    /// Reject empty names and regex rules whose pattern does not compile.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::BadRequest("Rule name must not be empty".to_string()));
        }
        if self.kind == RuleKind::Regex {
            let pattern = self
                .payload
                .get("pattern")
                .and_then(|p| p.as_str())
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    GatewayError::BadRequest("Regex rules need a non-empty payload.pattern".to_string())
                })?;
            compile_pattern(pattern)
                .map_err(|e| GatewayError::BadRequest(format!("Invalid pattern: {}", e)))?;
        }
        Ok(())
    }

    /// Build a fresh rule from this request.
    pub fn into_rule(self) -> Rule {
        let mut rule = Rule::new(self.name, self.kind, self.payload, self.severity);
        rule.description = self.description;
        rule.active = self.active;
        rule
    }

    /// Apply this request onto an existing rule, keeping its identity.
    pub fn apply_to(self, mut rule: Rule) -> Rule {
        rule.name = self.name;
        rule.description = self.description;
        rule.kind = self.kind;
        rule.payload = self.payload;
        rule.severity = self.severity;
        rule.active = self.active;
        rule
    }
}

// ==================== Modules ====================

/// A module as shown to administrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleResponse {
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    pub status: ModuleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub start_stop_supported: bool,
}

impl From<ModuleOverview> for ModuleResponse {
    fn from(m: ModuleOverview) -> Self {
        Self {
            name: m.status.name,
            display_name: m.status.display_name,
            enabled: m.enabled,
            status: m.status.status,
            url: m.status.url,
            start_stop_supported: m.status.start_stop_supported,
        }
    }
}

/// Request to enable or disable a module.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ModuleUpdateRequest {
    pub enabled: bool,
}

/// Response after a lifecycle action.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleActionResponse {
    /// `started` or `stopped`.
    pub status: String,
    pub module: String,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Database connectivity.
    pub database: String,
    /// Timestamp.
    pub timestamp: String,
}
