use std::sync::Arc;

use contextor::Contextor;

use crate::error_handler::AppError;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub contextor: Arc<Contextor>,
}

impl AppState {
    pub fn new(contextor: Arc<Contextor>) -> Self {
        Self { contextor }
    }
}

/// Listener address and route of the question endpoint.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// e.g. `127.0.0.1:8080`
    pub address: String,
    /// e.g. `/api/ask`
    pub ask_route: String,
}

impl ServerConfig {
    /// Reads `API_ADDRESS` and `ASK_ROUTE`.
    pub fn from_env() -> Result<Self, AppError> {
        let address = std::env::var("API_ADDRESS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "127.0.0.1:8080".into());
        let ask_route = std::env::var("ASK_ROUTE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "/api/ask".into());
        if !ask_route.starts_with('/') {
            return Err(AppError::Config(format!("ASK_ROUTE must start with '/', got {ask_route:?}")));
        }
        Ok(Self { address, ask_route })
    }
}
