//! JSON API: read endpoints for runs/links/issues plus trigger endpoints for
//! full audits and ad hoc single-URL checks.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use linkpulse_core::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn map_db_error(error: &linkpulse_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new("internal_error", "database query failed")
}

fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// Assemble the router with CORS and request tracing.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/runs", get(list_runs))
        .route("/api/links", get(list_links))
        .route("/api/issues", get(list_issues))
        .route("/api/audits", post(trigger_audit))
        .route("/api/check", post(check_url))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthData>, ApiError> {
    match linkpulse_db::health_check(&state.pool).await {
        Ok(()) => Ok(Json(HealthData {
            status: "ok",
            database: "ok",
        })),
        Err(e) => {
            tracing::error!(error = %e, "database health check failed");
            Err(ApiError::new("internal_error", "database unreachable"))
        }
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListRunsQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    public_id: Uuid,
    owner_id: Uuid,
    run_type: String,
    trigger_source: String,
    status: String,
    links_audited: i32,
    links_skipped: i32,
    issues_found: i32,
    critical_count: i32,
    warning_count: i32,
    info_count: i32,
    error_message: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<linkpulse_db::AuditRunRow> for RunResponse {
    fn from(row: linkpulse_db::AuditRunRow) -> Self {
        Self {
            public_id: row.public_id,
            owner_id: row.owner_id,
            run_type: row.run_type,
            trigger_source: row.trigger_source,
            status: row.status,
            links_audited: row.links_audited,
            links_skipped: row.links_skipped,
            issues_found: row.issues_found,
            critical_count: row.critical_count,
            warning_count: row.warning_count,
            info_count: row.info_count,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        }
    }
}

async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<Vec<RunResponse>>, ApiError> {
    let rows = linkpulse_db::list_audit_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(&e))?;

    Ok(Json(rows.into_iter().map(RunResponse::from).collect()))
}

// ---------------------------------------------------------------------------
// Link health
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListLinksQuery {
    owner_id: Uuid,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct LinkHealthResponse {
    url: String,
    final_url: String,
    health_score: i32,
    is_broken: bool,
    is_out_of_stock: bool,
    has_affiliate_tag: bool,
    affiliate_network: Option<String>,
    content_drifted: bool,
    drift_change_pct: i32,
    redirect_count: i32,
    checked_at: DateTime<Utc>,
}

impl From<linkpulse_db::LinkHealthRow> for LinkHealthResponse {
    fn from(row: linkpulse_db::LinkHealthRow) -> Self {
        Self {
            url: row.url,
            final_url: row.final_url,
            health_score: row.health_score,
            is_broken: row.is_broken,
            is_out_of_stock: row.is_out_of_stock,
            has_affiliate_tag: row.has_affiliate_tag,
            affiliate_network: row.affiliate_network,
            content_drifted: row.content_drifted,
            drift_change_pct: row.drift_change_pct,
            redirect_count: row.redirect_count,
            checked_at: row.checked_at,
        }
    }
}

async fn list_links(
    State(state): State<AppState>,
    Query(query): Query<ListLinksQuery>,
) -> Result<Json<Vec<LinkHealthResponse>>, ApiError> {
    let rows = linkpulse_db::list_link_health(
        &state.pool,
        query.owner_id,
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(&e))?;

    Ok(Json(rows.into_iter().map(LinkHealthResponse::from).collect()))
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListIssuesQuery {
    run_id: i64,
}

#[derive(Debug, Serialize)]
struct IssueResponse {
    id: i64,
    link_health_id: i64,
    issue_type: String,
    severity: String,
    revenue_impact: f64,
    confidence: i32,
    status: String,
    detail: String,
    created_at: DateTime<Utc>,
}

impl From<linkpulse_db::LinkIssueRow> for IssueResponse {
    fn from(row: linkpulse_db::LinkIssueRow) -> Self {
        Self {
            id: row.id,
            link_health_id: row.link_health_id,
            issue_type: row.issue_type,
            severity: row.severity,
            revenue_impact: row.revenue_impact,
            confidence: row.confidence,
            status: row.status,
            detail: row.detail,
            created_at: row.created_at,
        }
    }
}

async fn list_issues(
    State(state): State<AppState>,
    Query(query): Query<ListIssuesQuery>,
) -> Result<Json<Vec<IssueResponse>>, ApiError> {
    let rows = linkpulse_db::list_issues_for_run(&state.pool, query.run_id)
        .await
        .map_err(|e| map_db_error(&e))?;

    Ok(Json(rows.into_iter().map(IssueResponse::from).collect()))
}

// ---------------------------------------------------------------------------
// Audit trigger
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TriggerAuditRequest {
    owner_id: Uuid,
    run_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct TriggerAuditResponse {
    owner_id: Uuid,
    run_type: String,
    accepted: bool,
}

/// Kick off a full audit in the background and return immediately.
///
/// The run records its own outcome; callers poll `/api/runs`.
async fn trigger_audit(
    State(state): State<AppState>,
    Json(request): Json<TriggerAuditRequest>,
) -> (StatusCode, Json<TriggerAuditResponse>) {
    let run_type = request.run_type.unwrap_or_else(|| "full".to_string());
    let owner_id = request.owner_id;

    let pool = state.pool.clone();
    let config = Arc::clone(&state.config);
    let spawned_run_type = run_type.clone();
    tokio::spawn(async move {
        if let Err(e) =
            linkpulse_engine::run_audit(&pool, &config, owner_id, &spawned_run_type, "api").await
        {
            tracing::error!(%owner_id, error = %e, "api-triggered audit failed");
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(TriggerAuditResponse {
            owner_id,
            run_type,
            accepted: true,
        }),
    )
}

// ---------------------------------------------------------------------------
// Ad hoc check
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CheckRequest {
    url: String,
    expected_tag: Option<String>,
}

async fn check_url(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<linkpulse_engine::LinkAuditRecord>, ApiError> {
    let options = linkpulse_engine::CheckUrlOptions {
        expected_tag: request.expected_tag,
        previous_fingerprint: None,
    };

    match linkpulse_engine::check_url(&state.config, &request.url, options).await {
        Ok(record) => Ok(Json(record)),
        Err(e) => Err(ApiError::new("bad_request", format!("{e:#}"))),
    }
}
