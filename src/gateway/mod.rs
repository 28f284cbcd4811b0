//! Axum-based HTTP gateway.
//!
//! Thin JSON handlers over the core units of work. Every unit-of-work
//! failure is caught at the handler boundary and converted into an error
//! response; nothing crashes the hosting process.

mod handlers;

use crate::prompt::PromptSet;
use crate::providers::CompletionProvider;
use crate::store::Store;
use anyhow::Result;
use axum::{
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use handlers::{
    handle_create_model, handle_create_project, handle_delete_model, handle_delete_project,
    handle_delete_synthetic, handle_expert_review, handle_export, handle_get_project,
    handle_health, handle_import, handle_judge, handle_judge_optimize, handle_score, handle_sync,
    handle_synthesize, handle_taxonomy_automate, handle_update_project,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (1MB) — bulk output imports carry hundreds of
/// paragraph-sized entries.
pub const MAX_BODY_SIZE: usize = 1_048_576;
/// Request timeout (300s) — judge and optimizer calls are single long
/// completion round trips.
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn CompletionProvider>,
    pub store: Arc<Store>,
    pub prompts: Arc<PromptSet>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/projects", post(handle_create_project))
        .route(
            "/projects/{id}",
            get(handle_get_project)
                .post(handle_update_project)
                .delete(handle_delete_project),
        )
        .route("/models", post(handle_create_model))
        .route("/models/{id}", delete(handle_delete_model))
        .route("/synthetic/{id}", delete(handle_delete_synthetic))
        .route("/taxonomy-automate", post(handle_taxonomy_automate))
        .route("/synthesize", post(handle_synthesize))
        .route("/judge", post(handle_judge))
        .route("/judge-optimize", post(handle_judge_optimize))
        .route("/sync", post(handle_sync))
        .route("/expert-review", post(handle_expert_review))
        .route("/score", post(handle_score))
        .route("/export", post(handle_export))
        .route("/import", post(handle_import))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Run the HTTP gateway.
pub async fn run_gateway(host: &str, port: u16, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_gateway_with_listener(host, listener, state).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    host: &str,
    listener: tokio::net::TcpListener,
    state: AppState,
) -> Result<()> {
    let actual_port = listener.local_addr()?.port();
    tracing::info!("gateway listening on {host}:{actual_port}");

    let app = router(state);
    axum::serve(listener, app).await?;

    Ok(())
}
