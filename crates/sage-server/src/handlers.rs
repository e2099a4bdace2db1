//! HTTP Handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use risk_report::report::{Badge, ChartBar};
use risk_report::{
    ReportError, ReportSnapshot, RunId, RunOutcome, RunState, SupportedToken, SupportedTokenCatalog,
    WalletState,
};
use sage_core::{ChatMessage, ChatReply, ChatTransport, SageError};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ollama_connected: bool,
    pub market_reachable: bool,
    pub model: String,
    pub scorer: &'static str,
    pub market: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

/// Snapshot plus the derived views the dashboard renders
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    #[serde(flatten)]
    pub snapshot: Arc<ReportSnapshot>,
    pub headline: String,
    pub badge: Badge,
    pub chart: Vec<ChartBar>,
    pub total_value_usd: Option<String>,
}

impl From<Arc<ReportSnapshot>> for ReportView {
    fn from(snapshot: Arc<ReportSnapshot>) -> Self {
        Self {
            headline: snapshot.headline(),
            badge: snapshot.badge(),
            chart: snapshot.chart(),
            total_value_usd: snapshot.total_value_usd().map(|v| v.to_string()),
            snapshot,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub run_id: RunId,
    #[serde(flatten)]
    pub state: RunState,
    pub report: Option<ReportView>,
    pub last_ready_report: Option<ReportView>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_connected = state.provider.health_check().await.unwrap_or(false);
    let market_reachable = state.market.health_check().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ollama_connected,
        market_reachable,
        model: state.config.model.clone(),
        scorer: state.config.scorer.name(),
        market: state.config.market.name(),
    })
}

/// Tokens the report can recognise
pub async fn list_catalog() -> Json<&'static [SupportedToken]> {
    Json(SupportedTokenCatalog::global().tokens())
}

/// Run the report pipeline for the posted wallet state
pub async fn generate_report(
    State(state): State<AppState>,
    Json(wallet): Json<WalletState>,
) -> Result<Json<ReportView>, ApiError> {
    match state.surface.generate(wallet).await {
        RunOutcome::Ready(snapshot) => Ok(Json(ReportView::from(snapshot))),
        RunOutcome::NotConnected => Err(api_error(
            StatusCode::BAD_REQUEST,
            "WALLET_NOT_CONNECTED",
            ReportError::NotConnected.user_message(),
        )),
        RunOutcome::ScoringFailed { message, .. } => {
            Err(api_error(StatusCode::BAD_GATEWAY, "SCORING_UNAVAILABLE", message))
        }
        RunOutcome::Superseded(run) => Err(api_error(
            StatusCode::CONFLICT,
            "RUN_SUPERSEDED",
            format!("{run} was replaced by a newer request"),
        )),
        RunOutcome::Ignored { in_flight } => Err(api_error(
            StatusCode::ACCEPTED,
            "RUN_IN_PROGRESS",
            format!("{in_flight} is already analysing this wallet"),
        )),
    }
}

/// Current run state and reports
pub async fn report_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.surface.status().await;

    Json(StatusResponse {
        run_id: status.run_id,
        state: status.state,
        report: status.report.map(ReportView::from),
        last_ready_report: status.last_ready_report.map(ReportView::from),
    })
}

pub async fn reset_report(State(state): State<AppState>) -> StatusCode {
    state.surface.reset().await;
    StatusCode::NO_CONTENT
}

/// Download (text) or share (JSON) the last ready report
pub async fn export_report(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let snapshot = state
        .surface
        .last_ready_report()
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "NO_REPORT", "No report has been generated yet."))?;

    let date = snapshot.generated_at.format("%Y-%m-%d");

    match query.format {
        ExportFormat::Text => Ok((
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"safesage-risk-report-{date}.txt\""),
                ),
            ],
            snapshot.render_text(),
        )
            .into_response()),
        ExportFormat::Json => {
            let body = snapshot.to_json().map_err(|e| {
                tracing::error!("Report export error: {}", e);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "EXPORT_ERROR", e.user_message())
            })?;
            Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
        }
    }
}

/// Support chat endpoint
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = state
        .assistant
        .send_message(&payload.message, &payload.history)
        .await
        .map_err(|e| match e {
            SageError::InvalidInput(msg) => api_error(StatusCode::BAD_REQUEST, "INVALID_INPUT", msg),
            other => {
                tracing::error!("Support chat error: {}", other);
                api_error(StatusCode::BAD_GATEWAY, "AI_UNAVAILABLE", other.user_message())
            }
        })?;

    Ok(Json(reply))
}
