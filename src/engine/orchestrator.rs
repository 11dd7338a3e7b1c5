//! Policy Orchestrator - runs every check for a prompt and produces the
//! final decision.
//!
//! This is the central component. Rule store and catalog failures abort the
//! evaluation; module failures never do.

use std::sync::Arc;

use crate::domain::{EvaluationResult, ModuleStatus, Verdict};
use crate::engine::classifier::{resolve_endpoint, ClassifierClient, EligibleModule};
use crate::engine::{
    DecisionAggregator, EnablementGate, ModuleCatalog, RuleMatcher, RuleStore, StatusProvider,
};
use crate::error::GatewayResult;

/// A module's live status together with its enabled flag.
#[derive(Debug, Clone)]
pub struct ModuleOverview {
    pub status: ModuleStatus,
    pub enabled: bool,
}

/// Orchestrates the policy evaluation pipeline.
pub struct PolicyOrchestrator {
    rules: Arc<dyn RuleStore>,
    gate: EnablementGate,
    status: Arc<dyn StatusProvider>,
    matcher: RuleMatcher,
    classifier: ClassifierClient,
    aggregator: DecisionAggregator,
}

impl PolicyOrchestrator {
    /// Create a new orchestrator with the given collaborators.
    pub fn new(
        rules: Arc<dyn RuleStore>,
        catalog: Arc<dyn ModuleCatalog>,
        status: Arc<dyn StatusProvider>,
        classifier: ClassifierClient,
    ) -> Self {
        Self {
            rules,
            gate: EnablementGate::new(catalog),
            status,
            matcher: RuleMatcher::new(),
            classifier,
            aggregator: DecisionAggregator::new(),
        }
    }

    pub fn status_provider(&self) -> &Arc<dyn StatusProvider> {
        &self.status
    }

    /// Evaluate a prompt through the full pipeline.
    ///
    /// Pipeline order:
    /// 1. Local rules against the active rule set
    /// 2. Status + enablement to find callable modules
    /// 3. Remote classification (concurrent)
    /// 4. Aggregate to the final decision
    pub async fn evaluate(&self, text: &str) -> GatewayResult<EvaluationResult> {
        // Stage 1: Local rules
        let rules = self.rules.list_active_rules().await?;
        let local = self.matcher.evaluate(text, &rules);
        tracing::debug!(
            active_rules = rules.len(),
            matched = local.len(),
            "Local rule evaluation complete"
        );

        // Stage 2: Active module set
        let modules = self.active_modules().await?;
        tracing::debug!(
            modules = ?modules.iter().map(|m| m.definition.name.as_str()).collect::<Vec<_>>(),
            "Resolved callable modules"
        );

        // Stage 3: Remote classification
        let remote = self.classifier.classify_all(&modules, text).await;

        // Stage 4: Aggregate
        let local_count = local.len();
        let triggered_modules: Vec<String> = remote.iter().filter_map(Verdict::module_label).collect();
        let result = self.aggregator.aggregate(local, remote);

        tracing::info!(
            decision = %result.decision,
            local_triggers = local_count,
            triggered_modules = ?triggered_modules,
            modules_called = modules.len(),
            "Evaluation complete"
        );

        Ok(result)
    }

    /// Modules that are running, enabled and addressable, in catalog order.
    pub async fn active_modules(&self) -> GatewayResult<Vec<EligibleModule>> {
        let mut eligible = Vec::new();

        for status in self.status.resolve().await {
            if !status.is_running() {
                continue;
            }
            if !self.gate.is_enabled(&status.name).await? {
                tracing::debug!(module = %status.name, "Module disabled, not calling");
                continue;
            }
            let Some(definition) = self.status.definition(&status.name) else {
                continue;
            };
            match resolve_endpoint(&status, definition) {
                Some(url) => eligible.push(EligibleModule {
                    definition: definition.clone(),
                    url,
                }),
                None => {
                    tracing::warn!(module = %status.name, "No usable URL for module, skipping")
                }
            }
        }

        Ok(eligible)
    }

    /// Live status plus enabled flag for every known module.
    pub async fn module_overview(&self) -> GatewayResult<Vec<ModuleOverview>> {
        let mut overview = Vec::new();
        for status in self.status.resolve().await {
            let enabled = self.gate.is_enabled(&status.name).await?;
            overview.push(ModuleOverview { status, enabled });
        }
        Ok(overview)
    }
}
