//! HTTP and serverless transport for the question-answering pipeline.

pub mod core;
pub mod error_handler;
pub mod routes;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use contextor::Contextor;
use tokio::signal;
use tracing::{error, info};

pub use crate::core::app_state::{AppState, ServerConfig};
pub use crate::core::event::{FunctionEvent, FunctionResult, handle_event};
pub use crate::error_handler::AppError;

use crate::routes::{
    ask::ask_question_route::{ask_question, method_not_allowed},
    health_route::health,
};

/// Builds the router: `POST {ask_route}` (other methods → 405) and `GET /health`.
pub fn router(state: AppState, ask_route: &str) -> Router {
    Router::new()
        .route(ask_route, post(ask_question).fallback(method_not_allowed))
        .route("/health", get(health))
        .with_state(state)
}

/// Serves until Ctrl+C.
pub async fn start(contextor: Arc<Contextor>, cfg: ServerConfig) -> Result<(), AppError> {
    let app = router(AppState::new(contextor), &cfg.ask_route);

    let listener = tokio::net::TcpListener::bind(&cfg.address)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %cfg.address, route = %cfg.ask_route, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
