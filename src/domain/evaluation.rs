//! Evaluation-related domain types.
//!
//! Represents the gateway's decision for a submitted prompt.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ModuleCategory;

/// Final decision for a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Prompt may proceed.
    Accept,
    /// Prompt is refused.
    Decline,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Accept => write!(f, "ACCEPT"),
            Decision::Decline => write!(f, "DECLINE"),
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACCEPT" => Ok(Decision::Accept),
            "DECLINE" => Ok(Decision::Decline),
            _ => Err(format!("Unknown decision: {}", s)),
        }
    }
}

/// Where a verdict came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictSource {
    /// A locally stored pattern rule.
    Rule { id: Uuid, name: String },
    /// A remote classification module.
    Module { name: String, category: ModuleCategory },
}

/// One check's finding within a single evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub source: VerdictSource,
    /// Whether this verdict alone forces a decline.
    pub forces_decline: bool,
    /// Short text used in the reason summary.
    pub fragment: String,
}

impl Verdict {
    pub fn rule(id: Uuid, name: &str, forces_decline: bool) -> Self {
        Self {
            source: VerdictSource::Rule {
                id,
                name: name.to_string(),
            },
            forces_decline,
            fragment: name.to_string(),
        }
    }

    pub fn module(
        name: &str,
        category: ModuleCategory,
        forces_decline: bool,
        fragment: impl Into<String>,
    ) -> Self {
        Self {
            source: VerdictSource::Module {
                name: name.to_string(),
                category,
            },
            forces_decline,
            fragment: fragment.into(),
        }
    }

    /// Rule id, for verdicts produced by local rules.
    pub fn rule_id(&self) -> Option<Uuid> {
        match &self.source {
            VerdictSource::Rule { id, .. } => Some(*id),
            VerdictSource::Module { .. } => None,
        }
    }

    /// `name (CATEGORY)` for module verdicts, used in evaluation logs.
    pub fn module_label(&self) -> Option<String> {
        match &self.source {
            VerdictSource::Module { name, category } => Some(format!("{} ({})", name, category)),
            VerdictSource::Rule { .. } => None,
        }
    }
}

/// Outcome of evaluating one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvaluationResult {
    pub decision: Decision,
    pub reason_summary: String,
    /// Ids of local rules that matched. Module triggers are not listed here.
    pub triggered_rule_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&Decision::Decline).unwrap();
        assert_eq!(json, "\"DECLINE\"");
        assert_eq!("accept".parse::<Decision>().unwrap(), Decision::Accept);
    }

    #[test]
    fn test_only_rule_verdicts_carry_ids() {
        let id = Uuid::new_v4();
        assert_eq!(Verdict::rule(id, "weapons", true).rule_id(), Some(id));
        let module = Verdict::module("sentinel-toxicity", ModuleCategory::Toxicity, true, "Toxic");
        assert_eq!(module.rule_id(), None);
    }

    #[test]
    fn test_module_label() {
        let module = Verdict::module("sentinel-eu-ai", ModuleCategory::JurisdictionalRisk, true, "EU");
        assert_eq!(
            module.module_label().as_deref(),
            Some("sentinel-eu-ai (JURISDICTIONAL_RISK)")
        );
        assert_eq!(Verdict::rule(Uuid::new_v4(), "weapons", true).module_label(), None);
    }
}
