use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("invalid server configuration: {0}")]
    Config(String),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("{0}")]
    BadRequest(String),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Failure while answering a question.
    #[error(transparent)]
    Contextor(#[from] ContextorError),
}

/// Message for every server-side failure; the cause goes to `details`.
const INTERNAL_MESSAGE: &str = "An internal server error occurred.";

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Contextor(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Contextor(_)
            | AppError::Config(_)
            | AppError::Bind(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for the error: `{"error"}` for client errors,
    /// `{"error", "details"}` for server errors.
    pub fn body(&self) -> Value {
        let status = self.status_code();
        if status.is_client_error() {
            json!({ "error": self.to_string() })
        } else {
            json!({ "error": INTERNAL_MESSAGE, "details": self.to_string() })
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        if let AppError::MethodNotAllowed = self {
            let mut resp = (status, "Method Not Allowed").into_response();
            resp.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
            return resp;
        }
        (status, Json(self.body())).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}
