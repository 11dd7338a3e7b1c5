//! Decision Aggregator - folds all verdicts into the final result.

use crate::domain::{Decision, EvaluationResult, Verdict};

/// Summary used when nothing triggered.
pub const NO_TRIGGERS_SUMMARY: &str = "No rules triggered.";

/// Merges local and remote verdicts.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecisionAggregator;

impl DecisionAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Decline if any verdict forces it; otherwise accept.
    ///
    /// Local verdicts are listed before remote ones in the summary. Only
    /// local rule matches contribute to `triggered_rule_ids`.
    pub fn aggregate(&self, local: Vec<Verdict>, remote: Vec<Verdict>) -> EvaluationResult {
        let triggered_rule_ids = local.iter().filter_map(Verdict::rule_id).collect();

        let verdicts: Vec<Verdict> = local.into_iter().chain(remote).collect();

        let decision = if verdicts.iter().any(|v| v.forces_decline) {
            Decision::Decline
        } else {
            Decision::Accept
        };

        let reason_summary = if verdicts.is_empty() {
            NO_TRIGGERS_SUMMARY.to_string()
        } else {
            let fragments: Vec<&str> = verdicts.iter().map(|v| v.fragment.as_str()).collect();
            format!(
                "Triggered {} rules: {}",
                verdicts.len(),
                fragments.join(", ")
            )
        };

        EvaluationResult {
            decision,
            reason_summary,
            triggered_rule_ids,
        }
    }
}
