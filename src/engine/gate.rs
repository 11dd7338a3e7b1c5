//! Module Enablement Gate - administrator on/off switch per module.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ModuleRecord;
use crate::error::GatewayResult;

/// Read access to persisted module records.
#[async_trait]
pub trait ModuleCatalog: Send + Sync {
    async fn get_module(&self, name: &str) -> GatewayResult<Option<ModuleRecord>>;
}

/// Decides whether a module may be called at all.
#[derive(Clone)]
pub struct EnablementGate {
    catalog: Arc<dyn ModuleCatalog>,
}

impl EnablementGate {
    pub fn new(catalog: Arc<dyn ModuleCatalog>) -> Self {
        Self { catalog }
    }

    /// Modules without a record are enabled.
    pub async fn is_enabled(&self, name: &str) -> GatewayResult<bool> {
        let record = self.catalog.get_module(name).await?;
        Ok(record.map_or(true, |m| m.enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::InMemoryCatalog;

    #[tokio::test]
    async fn test_missing_record_is_enabled() {
        let gate = EnablementGate::new(Arc::new(InMemoryCatalog::default()));
        assert!(gate.is_enabled("sentinel-new").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_flag_is_used_verbatim() {
        let mut catalog = InMemoryCatalog::with_disabled(&["sentinel-presidio"]);
        catalog.records.insert(
            "sentinel-toxicity".to_string(),
            ModuleRecord::new("sentinel-toxicity", None, true),
        );
        let gate = EnablementGate::new(Arc::new(catalog));

        assert!(!gate.is_enabled("sentinel-presidio").await.unwrap());
        assert!(gate.is_enabled("sentinel-toxicity").await.unwrap());
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let catalog = InMemoryCatalog {
            fail: true,
            ..Default::default()
        };
        let gate = EnablementGate::new(Arc::new(catalog));
        assert!(gate.is_enabled("sentinel-presidio").await.is_err());
    }
}
