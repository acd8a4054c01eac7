//! POST {ASK_ROUTE}: answers a question about the plot.

use axum::{Json, extract::State, extract::rejection::JsonRejection};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::ask::ask_request::{AskRequest, AskResponse},
};

/// Handler: POST /api/ask
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/api/ask \
///   -H 'content-type: application/json' \
///   -d '{"question":"Who is Bella?"}'
/// ```
pub async fn ask_question(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> AppResult<Json<AskResponse>> {
    let Json(req) = body?;
    let qa = state.contextor.handle(req.question.as_deref()).await?;
    Ok(Json(AskResponse { answer: qa.answer }))
}

/// Any other method on the question route.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
