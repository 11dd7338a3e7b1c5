//! Local Rule Matcher - applies stored pattern rules to prompt text.
//!
//! Only active regex rules participate. Patterns match case-insensitively
//! anywhere in the text.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use crate::domain::{Rule, RuleKind, Severity, Verdict};
use crate::error::GatewayResult;

/// Read access to the persisted rule set.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All rules with `active = true`, in a stable order.
    async fn list_active_rules(&self) -> GatewayResult<Vec<Rule>>;
}

/// Compile a rule pattern the way the matcher evaluates it.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Evaluates pattern rules against prompt text.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleMatcher;

impl RuleMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Produce one verdict per matching rule, in rule order.
    pub fn evaluate(&self, text: &str, rules: &[Rule]) -> Vec<Verdict> {
        rules
            .iter()
            .filter(|rule| rule.active && rule.kind == RuleKind::Regex)
            .filter(|rule| self.matches(rule, text))
            .map(|rule| Verdict::rule(rule.id, &rule.name, rule.severity == Severity::Block))
            .collect()
    }

    fn matches(&self, rule: &Rule, text: &str) -> bool {
        let Some(pattern) = rule.pattern() else {
            return false;
        };

        match compile_pattern(pattern) {
            Ok(re) => re.is_match(text),
            Err(e) => {
                tracing::warn!(rule = %rule.name, error = %e, "Skipping rule with invalid pattern");
                false
            }
        }
    }
}
