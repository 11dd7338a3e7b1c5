//! Policy rule domain types.
//!
//! Rules are authored by administrators and read by the evaluation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How a rule's payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Case-insensitive regular expression over the prompt text.
    Regex,
    /// Stored but not evaluated.
    Keyword,
    /// Stored but not evaluated.
    Llm,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Regex => write!(f, "regex"),
            RuleKind::Keyword => write!(f, "keyword"),
            RuleKind::Llm => write!(f, "llm"),
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regex" => Ok(RuleKind::Regex),
            "keyword" => Ok(RuleKind::Keyword),
            "llm" => Ok(RuleKind::Llm),
            _ => Err(format!("Unknown rule kind: {}", s)),
        }
    }
}

/// What happens when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// A match forces the prompt to be declined.
    Block,
    /// A match is reported but does not decline on its own.
    Warn,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Block => write!(f, "BLOCK"),
            Severity::Warn => write!(f, "WARN"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BLOCK" => Ok(Severity::Block),
            "WARN" => Ok(Severity::Warn),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// A persisted policy rule.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Rule {
    pub id: Uuid,
    /// Globally unique rule name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: RuleKind,
    /// Kind-specific payload, e.g. `{"pattern": "bomb"}` for regex rules.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub severity: Severity,
    /// Only active rules take part in evaluation.
    pub active: bool,
    /// Incremented on every update.
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Create a new, active, version 1 rule.
    pub fn new(
        name: impl Into<String>,
        kind: RuleKind,
        payload: serde_json::Value,
        severity: Severity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            kind,
            payload,
            severity,
            active: true,
            version: 1,
            updated_at: Utc::now(),
        }
    }

    /// Shorthand for a regex rule with the given pattern.
    pub fn regex(name: impl Into<String>, pattern: &str, severity: Severity) -> Self {
        Self::new(
            name,
            RuleKind::Regex,
            serde_json::json!({ "pattern": pattern }),
            severity,
        )
    }

    /// The `pattern` field of the payload, if present and non-empty.
    pub fn pattern(&self) -> Option<&str> {
        self.payload
            .get("pattern")
            .and_then(|p| p.as_str())
            .filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_string(&Severity::Block).unwrap();
        assert_eq!(json, "\"BLOCK\"");
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warn);
    }

    #[test]
    fn test_pattern_extraction() {
        let rule = Rule::regex("weapons", "bomb", Severity::Block);
        assert_eq!(rule.pattern(), Some("bomb"));

        let empty = Rule::new(
            "empty",
            RuleKind::Regex,
            serde_json::json!({ "pattern": "" }),
            Severity::Warn,
        );
        assert_eq!(empty.pattern(), None);

        let missing = Rule::new("missing", RuleKind::Regex, serde_json::json!({}), Severity::Warn);
        assert_eq!(missing.pattern(), None);
    }
}
