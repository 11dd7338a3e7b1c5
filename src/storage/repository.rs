//! Repository layer for database operations.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::domain::{ModuleRecord, PromptRequest, Rule};
use crate::engine::{ModuleCatalog, RuleStore};
use crate::error::{GatewayError, GatewayResult};
use crate::storage::models::{ModuleRow, PromptRow, RuleRow};

/// Repository for all gateway database operations.
#[derive(Clone)]
pub struct GatewayRepository {
    pool: SqlitePool,
}

fn conflict_on_duplicate(e: sqlx::Error, what: &str) -> GatewayError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return GatewayError::Conflict(format!("{} already exists", what));
        }
    }
    GatewayError::Database(e)
}

impl GatewayRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the database schema.
    pub async fn init_schema(&self) -> GatewayResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rules (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                severity TEXT NOT NULL DEFAULT 'BLOCK',
                active INTEGER NOT NULL DEFAULT 1,
                version INTEGER NOT NULL DEFAULT 1,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_rules_active ON rules(active);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS modules (
                name TEXT PRIMARY KEY,
                display_name TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prompt_requests (
                id TEXT PRIMARY KEY,
                prompt_text TEXT NOT NULL,
                intended_use TEXT NOT NULL,
                context TEXT,
                decision TEXT NOT NULL,
                reason_summary TEXT NOT NULL,
                triggered_rule_ids TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_prompt_requests_created_at ON prompt_requests(created_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Rules ====================

    /// Insert a new rule. Names must be unique.
    pub async fn create_rule(&self, rule: &Rule) -> GatewayResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rules (
                id, name, description, kind, payload, severity, active, version, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.id.to_string())
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.kind.to_string())
        .bind(serde_json::to_string(&rule.payload)?)
        .bind(rule.severity.to_string())
        .bind(rule.active)
        .bind(rule.version)
        .bind(rule.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, &format!("Rule {}", rule.name)))?;

        Ok(())
    }

    /// Get a rule by ID.
    pub async fn get_rule(&self, id: Uuid) -> GatewayResult<Rule> {
        let row: RuleRow = sqlx::query_as("SELECT * FROM rules WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("Rule {} not found", id)))?;

        row.try_into()
    }

    /// List all rules, active or not, by name.
    pub async fn list_rules(&self) -> GatewayResult<Vec<Rule>> {
        let rows: Vec<RuleRow> = sqlx::query_as("SELECT * FROM rules ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Overwrite a rule's editable fields and bump its version.
    pub async fn update_rule(&self, rule: &Rule) -> GatewayResult<Rule> {
        let result = sqlx::query(
            r#"
            UPDATE rules
            SET name = ?, description = ?, kind = ?, payload = ?, severity = ?,
                active = ?, version = version + 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.kind.to_string())
        .bind(serde_json::to_string(&rule.payload)?)
        .bind(rule.severity.to_string())
        .bind(rule.active)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(rule.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_duplicate(e, &format!("Rule {}", rule.name)))?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("Rule {} not found", rule.id)));
        }

        self.get_rule(rule.id).await
    }

    /// Delete a rule.
    pub async fn delete_rule(&self, id: Uuid) -> GatewayResult<()> {
        let result = sqlx::query("DELETE FROM rules WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::NotFound(format!("Rule {} not found", id)));
        }

        Ok(())
    }

    // ==================== Modules ====================

    /// Set a module's enabled flag, creating its record if absent.
    pub async fn set_module_enabled(
        &self,
        name: &str,
        display_name: Option<&str>,
        enabled: bool,
    ) -> GatewayResult<ModuleRecord> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO modules (name, display_name, enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                enabled = excluded.enabled,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(name)
        .bind(display_name)
        .bind(enabled)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_module(name)
            .await?
            .ok_or_else(|| GatewayError::Internal(format!("Module {} vanished after upsert", name)))
    }

    // ==================== Prompt Requests ====================

    /// Save an evaluated prompt.
    pub async fn save_prompt(&self, prompt: &PromptRequest) -> GatewayResult<()> {
        sqlx::query(
            r#"
            INSERT INTO prompt_requests (
                id, prompt_text, intended_use, context, decision,
                reason_summary, triggered_rule_ids, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(prompt.id.to_string())
        .bind(&prompt.prompt_text)
        .bind(&prompt.intended_use)
        .bind(&prompt.context)
        .bind(prompt.decision.to_string())
        .bind(&prompt.reason_summary)
        .bind(serde_json::to_string(&prompt.triggered_rule_ids)?)
        .bind(prompt.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List evaluated prompts, newest first.
    pub async fn list_prompts(&self, limit: i64, offset: i64) -> GatewayResult<Vec<PromptRequest>> {
        let rows: Vec<PromptRow> = sqlx::query_as(
            "SELECT * FROM prompt_requests ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[async_trait]
impl RuleStore for GatewayRepository {
    async fn list_active_rules(&self) -> GatewayResult<Vec<Rule>> {
        let rows: Vec<RuleRow> = sqlx::query_as("SELECT * FROM rules WHERE active = 1 ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[async_trait]
impl ModuleCatalog for GatewayRepository {
    async fn get_module(&self, name: &str) -> GatewayResult<Option<ModuleRecord>> {
        let row: Option<ModuleRow> = sqlx::query_as("SELECT * FROM modules WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ModuleRecord::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decision, EvaluationResult, Severity};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> GatewayRepository {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        let repo = GatewayRepository::new(pool);
        repo.init_schema().await.expect("Failed to init schema");
        repo
    }

    #[tokio::test]
    async fn test_rule_lifecycle() {
        let repo = setup_test_db().await;

        let rule = Rule::regex("weapons", "bomb", Severity::Block);
        repo.create_rule(&rule).await.unwrap();

        let stored = repo.get_rule(rule.id).await.unwrap();
        assert_eq!(stored.name, "weapons");
        assert_eq!(stored.pattern(), Some("bomb"));
        assert_eq!(stored.version, 1);

        let mut edited = stored.clone();
        edited.severity = Severity::Warn;
        let updated = repo.update_rule(&edited).await.unwrap();
        assert_eq!(updated.severity, Severity::Warn);
        assert_eq!(updated.version, 2);

        repo.delete_rule(rule.id).await.unwrap();
        assert!(matches!(
            repo.get_rule(rule.id).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_rule_name_conflicts() {
        let repo = setup_test_db().await;

        repo.create_rule(&Rule::regex("weapons", "bomb", Severity::Block))
            .await
            .unwrap();
        let result = repo
            .create_rule(&Rule::regex("weapons", "gun", Severity::Warn))
            .await;
        assert!(matches!(result, Err(GatewayError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_only_active_rules_listed_for_evaluation() {
        let repo = setup_test_db().await;

        let mut inactive = Rule::regex("b-inactive", "x", Severity::Block);
        inactive.active = false;
        repo.create_rule(&inactive).await.unwrap();
        repo.create_rule(&Rule::regex("c-active", "y", Severity::Warn))
            .await
            .unwrap();
        repo.create_rule(&Rule::regex("a-active", "z", Severity::Block))
            .await
            .unwrap();

        let active = repo.list_active_rules().await.unwrap();
        let names: Vec<&str> = active.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a-active", "c-active"]);
        assert_eq!(repo.list_rules().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_module_record_created_lazily() {
        let repo = setup_test_db().await;

        assert!(repo.get_module("sentinel-presidio").await.unwrap().is_none());

        let record = repo
            .set_module_enabled("sentinel-presidio", Some("Presidio PII Scanner"), false)
            .await
            .unwrap();
        assert!(!record.enabled);

        let record = repo
            .set_module_enabled("sentinel-presidio", None, true)
            .await
            .unwrap();
        assert!(record.enabled);
        assert_eq!(record.display_name.as_deref(), Some("Presidio PII Scanner"));
    }

    #[tokio::test]
    async fn test_prompt_history() {
        let repo = setup_test_db().await;

        let rule_id = Uuid::new_v4();
        let prompt = PromptRequest::evaluated(
            "how to make a bomb",
            "research",
            None,
            EvaluationResult {
                decision: Decision::Decline,
                reason_summary: "Triggered 1 rules: weapons".to_string(),
                triggered_rule_ids: vec![rule_id],
            },
        );
        repo.save_prompt(&prompt).await.unwrap();

        let history = repo.list_prompts(10, 0).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].decision, Decision::Decline);
        assert_eq!(history[0].triggered_rule_ids, vec![rule_id]);
    }
}
