//! Route definitions for the API.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers;
use crate::AppState;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::evaluate_prompt,
        handlers::prompt_history,
        handlers::list_rules,
        handlers::create_rule,
        handlers::get_rule,
        handlers::update_rule,
        handlers::delete_rule,
        handlers::list_modules,
        handlers::update_module,
        handlers::start_module,
        handlers::stop_module,
        handlers::health_check,
    ),
    components(schemas(
        crate::api::types::EvaluatePromptRequest,
        crate::api::types::HistoryQuery,
        crate::api::types::RuleRequest,
        crate::api::types::ModuleResponse,
        crate::api::types::ModuleUpdateRequest,
        crate::api::types::ModuleActionResponse,
        crate::api::types::HealthResponse,
        crate::domain::PromptRequest,
        crate::domain::Decision,
        crate::domain::EvaluationResult,
        crate::domain::Rule,
        crate::domain::RuleKind,
        crate::domain::Severity,
        crate::domain::ModuleRecord,
        crate::domain::ModuleState,
        crate::domain::ModuleCategory,
    )),
    tags(
        (name = "prompts", description = "Prompt evaluation and history"),
        (name = "rules", description = "Local rule management"),
        (name = "modules", description = "Classifier module management"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "Sentinel Gateway API",
        version = "0.1.0",
        description = "Prompt policy gateway - evaluates prompts against local rules and classifier modules",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Prompts
        .route("/v1/prompts/evaluate", post(handlers::evaluate_prompt))
        .route("/v1/prompts/history", get(handlers::prompt_history))
        // Rules
        .route(
            "/v1/rules",
            get(handlers::list_rules).post(handlers::create_rule),
        )
        .route(
            "/v1/rules/:id",
            get(handlers::get_rule)
                .put(handlers::update_rule)
                .delete(handlers::delete_rule),
        )
        // Modules
        .route("/v1/modules", get(handlers::list_modules))
        .route("/v1/modules/:name", put(handlers::update_module))
        .route("/v1/modules/:name/start", post(handlers::start_module))
        .route("/v1/modules/:name/stop", post(handlers::stop_module))
        // Health
        .route("/health", get(handlers::health_check))
        .with_state(state)
        // OpenAPI docs
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
