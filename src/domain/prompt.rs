//! Submitted prompt records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Decision, EvaluationResult};

/// A prompt submitted for evaluation, stored with its outcome.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromptRequest {
    pub id: Uuid,
    pub prompt_text: String,
    /// What the submitter says the prompt is for.
    pub intended_use: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub decision: Decision,
    pub reason_summary: String,
    pub triggered_rule_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PromptRequest {
    /// Record a prompt together with the result of evaluating it.
    pub fn evaluated(
        prompt_text: impl Into<String>,
        intended_use: impl Into<String>,
        context: Option<String>,
        result: EvaluationResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompt_text: prompt_text.into(),
            intended_use: intended_use.into(),
            context,
            decision: result.decision,
            reason_summary: result.reason_summary,
            triggered_rule_ids: result.triggered_rule_ids,
            created_at: Utc::now(),
        }
    }
}
