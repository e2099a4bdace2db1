//! SafeSage HTTP Server
//!
//! Axum-based server exposing the wallet risk report pipeline and the
//! support chat assistant.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sage_core::LlmProvider;
use sage_runtime::OllamaProvider;

use crate::config::ServerConfig;
use crate::handlers::{
    chat_handler, export_report, generate_report, health_check, list_catalog, report_status, reset_report,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();

    // Initialize LLM provider
    let provider: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::from_env());

    // Verify Ollama connection
    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to Ollama");
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - AI reports and chat will fail");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    tracing::info!(
        scorer = config.scorer.name(),
        market = config.market.name(),
        model = %config.model,
        "Report pipeline configured"
    );

    let addr = config.bind_addr.clone();
    let state = AppState::build(config, provider)?;
    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 SafeSage server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health             - Health check");
    tracing::info!("  GET  /api/catalog        - Supported tokens");
    tracing::info!("  POST /api/report         - Generate risk report");
    tracing::info!("  GET  /api/report         - Current report state");
    tracing::info!("  POST /api/report/reset   - Reset report");
    tracing::info!("  GET  /api/report/export  - Download report (?format=text|json)");
    tracing::info!("  POST /api/chat           - Support chat");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/catalog", get(list_catalog))

        // Risk report
        .route("/api/report", post(generate_report).get(report_status))
        .route("/api/report/reset", post(reset_report))
        .route("/api/report/export", get(export_report))

        // Support chat
        .route("/api/chat", post(chat_handler))

        // Static frontend
        .fallback_service(ServeDir::new("static"))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use risk_report::{MarketDataClient, MockMarketClient, MockRiskScorer, RiskScorer};
    use sage_core::provider::{Completion, GenerationOptions, ModelInfo};
    use sage_core::{Message, SageError};
    use tower::ServiceExt;

    /// The AI backend is always down
    struct OfflineProvider;

    #[async_trait]
    impl LlmProvider for OfflineProvider {
        fn name(&self) -> &str {
            "offline"
        }

        async fn health_check(&self) -> sage_core::Result<bool> {
            Ok(false)
        }

        async fn complete(&self, _messages: &[Message], _options: &GenerationOptions) -> sage_core::Result<Completion> {
            Err(SageError::ProviderUnavailable("offline".into()))
        }

        async fn list_models(&self) -> sage_core::Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    fn app_with(scorer: Arc<MockRiskScorer>) -> Router {
        let market: Arc<dyn MarketDataClient> = Arc::new(MockMarketClient::new());
        let scorer: Arc<dyn RiskScorer> = scorer;
        router(AppState::new(ServerConfig::default(), Arc::new(OfflineProvider), market, scorer))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_report_endpoint_returns_views() {
        let app = app_with(Arc::new(MockRiskScorer::new()));
        let wallet = serde_json::json!({"isConnected": true, "address": "0xabc", "balance": "2", "chainId": 1});

        let (status, body) = send(app, post_json("/api/report", &wallet)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["overallTier"], "Low");
        assert_eq!(body["badge"]["score"], "3.0");
        assert_eq!(body["chart"][0]["label"], "ETH");
        assert_eq!(body["totalValueUsd"], "6900");
    }

    #[tokio::test]
    async fn test_disconnected_wallet_is_bad_request() {
        let app = app_with(Arc::new(MockRiskScorer::new()));
        let wallet = serde_json::json!({"isConnected": false});

        let (status, body) = send(app, post_json("/api/report", &wallet)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "WALLET_NOT_CONNECTED");
    }

    #[tokio::test]
    async fn test_scoring_failure_is_bad_gateway_and_keeps_last_report() {
        let scorer = Arc::new(MockRiskScorer::new());
        let app = app_with(scorer.clone());
        let wallet = serde_json::json!({"isConnected": true, "address": "0xabc", "balance": "1", "chainId": 1});

        let (status, _) = send(app.clone(), post_json("/api/report", &wallet)).await;
        assert_eq!(status, StatusCode::OK);

        scorer.set_failing(true);
        let (status, body) = send(app.clone(), post_json("/api/report", &wallet)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "SCORING_UNAVAILABLE");

        let (_, status_body) = send(app, Request::get("/api/report").body(Body::empty()).unwrap()).await;
        assert_eq!(status_body["state"], "scoringFailed");
        assert!(status_body["report"].is_null());
        assert_eq!(status_body["lastReadyReport"]["runId"], 1);
    }

    #[tokio::test]
    async fn test_export_requires_report() {
        let app = app_with(Arc::new(MockRiskScorer::new()));

        let response = app
            .oneshot(Request::get("/api/report/export").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_text_export_after_report() {
        let app = app_with(Arc::new(MockRiskScorer::new()));
        let wallet = serde_json::json!({"isConnected": true, "address": "0xabc", "balance": "1", "chainId": 1});
        send(app.clone(), post_json("/api/report", &wallet)).await;

        let response = app
            .oneshot(Request::get("/api/report/export?format=text").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("Risk Level: Low"));
    }

    #[tokio::test]
    async fn test_chat_with_ai_down() {
        let app = app_with(Arc::new(MockRiskScorer::new()));

        let (status, body) = send(app.clone(), post_json("/api/chat", &serde_json::json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "AI_UNAVAILABLE");

        let (status, body) = send(app, post_json("/api/chat", &serde_json::json!({"message": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_health_and_catalog() {
        let app = app_with(Arc::new(MockRiskScorer::new()));

        let (status, body) = send(app.clone(), Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ollama_connected"], false);
        assert_eq!(body["market_reachable"], true);

        let (_, catalog) = send(app, Request::get("/api/catalog").body(Body::empty()).unwrap()).await;
        assert!(catalog.as_array().is_some_and(|tokens| tokens.iter().any(|t| t["symbol"] == "ETH")));
    }
}
