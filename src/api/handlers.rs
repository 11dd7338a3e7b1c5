//! HTTP request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::api::types::*;
use crate::domain::{PromptRequest, Rule};
use crate::error::{GatewayError, GatewayResult};
use crate::AppState;

// ==================== Prompts ====================

/// Evaluate a prompt against the active policy.
///
/// POST /v1/prompts/evaluate
#[utoipa::path(
    post,
    path = "/v1/prompts/evaluate",
    request_body = EvaluatePromptRequest,
    responses(
        (status = 200, description = "Evaluation complete", body = PromptRequest),
        (status = 400, description = "Invalid request"),
        (status = 503, description = "Rule store or module catalog unavailable")
    ),
    tag = "prompts"
)]
pub async fn evaluate_prompt(
    State(state): State<AppState>,
    Json(request): Json<EvaluatePromptRequest>,
) -> GatewayResult<Json<PromptRequest>> {
    if request.prompt_text.trim().is_empty() {
        return Err(GatewayError::BadRequest("prompt_text must not be empty".to_string()));
    }

    tracing::info!(
        intended_use = %request.intended_use,
        prompt_len = request.prompt_text.len(),
        "Evaluating prompt"
    );

    let result = state.orchestrator.evaluate(&request.prompt_text).await?;

    let prompt = PromptRequest::evaluated(
        request.prompt_text,
        request.intended_use,
        request.context,
        result,
    );
    state.repository.save_prompt(&prompt).await?;

    tracing::info!(
        prompt_id = %prompt.id,
        decision = %prompt.decision,
        triggered_rules = prompt.triggered_rule_ids.len(),
        "Prompt recorded"
    );

    Ok(Json(prompt))
}

/// List evaluated prompts, newest first.
///
/// GET /v1/prompts/history
#[utoipa::path(
    get,
    path = "/v1/prompts/history",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum results (default 20)"),
        ("offset" = Option<i64>, Query, description = "Pagination offset")
    ),
    responses(
        (status = 200, description = "Prompt history", body = [PromptRequest])
    ),
    tag = "prompts"
)]
pub async fn prompt_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> GatewayResult<Json<Vec<PromptRequest>>> {
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    Ok(Json(state.repository.list_prompts(limit, offset).await?))
}

// ==================== Rules ====================

/// List all rules.
///
/// GET /v1/rules
#[utoipa::path(
    get,
    path = "/v1/rules",
    responses((status = 200, description = "All rules", body = [Rule])),
    tag = "rules"
)]
pub async fn list_rules(State(state): State<AppState>) -> GatewayResult<Json<Vec<Rule>>> {
    Ok(Json(state.repository.list_rules().await?))
}

/// Create a rule.
///
/// POST /v1/rules
#[utoipa::path(
    post,
    path = "/v1/rules",
    request_body = RuleRequest,
    responses(
        (status = 201, description = "Rule created", body = Rule),
        (status = 400, description = "Invalid rule"),
        (status = 409, description = "Rule name already in use")
    ),
    tag = "rules"
)]
pub async fn create_rule(
    State(state): State<AppState>,
    Json(request): Json<RuleRequest>,
) -> GatewayResult<(StatusCode, Json<Rule>)> {
    request.validate()?;
    let rule = request.into_rule();
    state.repository.create_rule(&rule).await?;

    tracing::info!(rule_id = %rule.id, name = %rule.name, severity = %rule.severity, "Rule created");

    Ok((StatusCode::CREATED, Json(rule)))
}

/// Get a rule.
///
/// GET /v1/rules/{id}
#[utoipa::path(
    get,
    path = "/v1/rules/{id}",
    params(("id" = Uuid, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Rule", body = Rule),
        (status = 404, description = "Rule not found")
    ),
    tag = "rules"
)]
pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> GatewayResult<Json<Rule>> {
    Ok(Json(state.repository.get_rule(id).await?))
}

/// Replace a rule's fields. Bumps the version.
///
/// PUT /v1/rules/{id}
#[utoipa::path(
    put,
    path = "/v1/rules/{id}",
    params(("id" = Uuid, Path, description = "Rule ID")),
    request_body = RuleRequest,
    responses(
        (status = 200, description = "Rule updated", body = Rule),
        (status = 400, description = "Invalid rule"),
        (status = 404, description = "Rule not found"),
        (status = 409, description = "Rule name already in use")
    ),
    tag = "rules"
)]
pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RuleRequest>,
) -> GatewayResult<Json<Rule>> {
    request.validate()?;
    let existing = state.repository.get_rule(id).await?;
    let updated = state
        .repository
        .update_rule(&request.apply_to(existing))
        .await?;

    tracing::info!(rule_id = %id, version = updated.version, "Rule updated");

    Ok(Json(updated))
}

/// Delete a rule.
///
/// DELETE /v1/rules/{id}
#[utoipa::path(
    delete,
    path = "/v1/rules/{id}",
    params(("id" = Uuid, Path, description = "Rule ID")),
    responses(
        (status = 204, description = "Rule deleted"),
        (status = 404, description = "Rule not found")
    ),
    tag = "rules"
)]
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> GatewayResult<StatusCode> {
    state.repository.delete_rule(id).await?;
    tracing::info!(rule_id = %id, "Rule deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Modules ====================

/// List known modules with live status.
///
/// GET /v1/modules
#[utoipa::path(
    get,
    path = "/v1/modules",
    responses((status = 200, description = "Known modules", body = [ModuleResponse])),
    tag = "modules"
)]
pub async fn list_modules(State(state): State<AppState>) -> GatewayResult<Json<Vec<ModuleResponse>>> {
    let modules = state.orchestrator.module_overview().await?;
    Ok(Json(modules.into_iter().map(ModuleResponse::from).collect()))
}

/// Enable or disable a module.
///
/// PUT /v1/modules/{name}
#[utoipa::path(
    put,
    path = "/v1/modules/{name}",
    params(("name" = String, Path, description = "Module name")),
    request_body = ModuleUpdateRequest,
    responses(
        (status = 200, description = "Module updated", body = crate::domain::ModuleRecord),
        (status = 404, description = "Unknown module")
    ),
    tag = "modules"
)]
pub async fn update_module(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ModuleUpdateRequest>,
) -> GatewayResult<Json<crate::domain::ModuleRecord>> {
    let definition = state
        .orchestrator
        .status_provider()
        .definition(&name)
        .ok_or_else(|| GatewayError::NotFound(format!("Module {} not found", name)))?;

    let record = state
        .repository
        .set_module_enabled(&name, Some(&definition.display_name), request.enabled)
        .await?;

    tracing::info!(module = %name, enabled = record.enabled, "Module toggled");

    Ok(Json(record))
}

/// Start a module container.
///
/// POST /v1/modules/{name}/start
#[utoipa::path(
    post,
    path = "/v1/modules/{name}/start",
    params(("name" = String, Path, description = "Module name")),
    responses(
        (status = 200, description = "Module started", body = ModuleActionResponse),
        (status = 400, description = "Lifecycle not supported in this mode"),
        (status = 404, description = "Unknown module"),
        (status = 503, description = "Container engine unavailable")
    ),
    tag = "modules"
)]
pub async fn start_module(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> GatewayResult<Json<ModuleActionResponse>> {
    state.orchestrator.status_provider().start_module(&name).await?;
    Ok(Json(ModuleActionResponse {
        status: "started".to_string(),
        module: name,
    }))
}

/// Stop a module container.
///
/// POST /v1/modules/{name}/stop
#[utoipa::path(
    post,
    path = "/v1/modules/{name}/stop",
    params(("name" = String, Path, description = "Module name")),
    responses(
        (status = 200, description = "Module stopped", body = ModuleActionResponse),
        (status = 400, description = "Lifecycle not supported in this mode"),
        (status = 404, description = "Unknown module"),
        (status = 503, description = "Container engine unavailable")
    ),
    tag = "modules"
)]
pub async fn stop_module(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> GatewayResult<Json<ModuleActionResponse>> {
    state.orchestrator.status_provider().stop_module(&name).await?;
    Ok(Json(ModuleActionResponse {
        status: "stopped".to_string(),
        module: name,
    }))
}

// ==================== Health ====================

/// Health check endpoint.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Check database connectivity
    let db_status = match sqlx::query("SELECT 1")
        .fetch_one(state.repository.pool())
        .await
    {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
