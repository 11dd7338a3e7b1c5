//! Database models for Sentinel Gateway.
//!
//! These are the row types returned by SQLx queries.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{ModuleRecord, PromptRequest, Rule};
use crate::error::GatewayError;

fn parse_uuid(s: &str) -> Result<Uuid, GatewayError> {
    Uuid::parse_str(s).map_err(|e| GatewayError::Internal(e.to_string()))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, GatewayError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GatewayError::Internal(e.to_string()))
}

/// Database row for rules table.
#[derive(Debug, Clone, FromRow)]
pub struct RuleRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub payload: String,
    pub severity: String,
    pub active: bool,
    pub version: i64,
    pub updated_at: String,
}

impl TryFrom<RuleRow> for Rule {
    type Error = GatewayError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        Ok(Rule {
            id: parse_uuid(&row.id)?,
            name: row.name,
            description: row.description,
            kind: row.kind.parse().map_err(GatewayError::Internal)?,
            payload: serde_json::from_str(&row.payload)?,
            severity: row.severity.parse().map_err(GatewayError::Internal)?,
            active: row.active,
            version: row.version,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

/// Database row for modules table.
#[derive(Debug, Clone, FromRow)]
pub struct ModuleRow {
    pub name: String,
    pub display_name: Option<String>,
    pub enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<ModuleRow> for ModuleRecord {
    type Error = GatewayError;

    fn try_from(row: ModuleRow) -> Result<Self, Self::Error> {
        Ok(ModuleRecord {
            name: row.name,
            display_name: row.display_name,
            enabled: row.enabled,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

/// Database row for prompt_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct PromptRow {
    pub id: String,
    pub prompt_text: String,
    pub intended_use: String,
    pub context: Option<String>,
    pub decision: String,
    pub reason_summary: String,
    pub triggered_rule_ids: String,
    pub created_at: String,
}

impl TryFrom<PromptRow> for PromptRequest {
    type Error = GatewayError;

    fn try_from(row: PromptRow) -> Result<Self, Self::Error> {
        Ok(PromptRequest {
            id: parse_uuid(&row.id)?,
            prompt_text: row.prompt_text,
            intended_use: row.intended_use,
            context: row.context,
            decision: row.decision.parse().map_err(GatewayError::Internal)?,
            reason_summary: row.reason_summary,
            triggered_rule_ids: serde_json::from_str(&row.triggered_rule_ids)?,
            created_at: parse_time(&row.created_at)?,
        })
    }
}
