//! Serverless adapter: `{httpMethod, body}` in, `{statusCode, headers, body}` out.
//!
//! Same mapping as the HTTP route, for runtimes that deliver requests as
//! JSON events instead of HTTP connections.

use std::collections::BTreeMap;

use contextor::Contextor;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error_handler::AppError;
use crate::routes::ask::ask_request::AskRequest;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionEvent {
    pub http_method: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResult {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl FunctionResult {
    fn json(status_code: u16, body: serde_json::Value) -> Self {
        Self {
            status_code,
            headers: BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: body.to_string(),
        }
    }

    fn from_error(err: AppError) -> Self {
        let status = err.status_code().as_u16();
        if let AppError::MethodNotAllowed = err {
            return Self {
                status_code: status,
                headers: BTreeMap::from([("Allow".to_string(), "POST".to_string())]),
                body: "Method Not Allowed".into(),
            };
        }
        Self::json(status, err.body())
    }
}

/// Answers one event through [`Contextor::handle`].
pub async fn handle_event(contextor: &Contextor, event: FunctionEvent) -> FunctionResult {
    debug!(method = %event.http_method, has_body = event.body.is_some(), "function event");
    match answer(contextor, event).await {
        Ok(answer) => FunctionResult::json(200, json!({ "answer": answer })),
        Err(err) => FunctionResult::from_error(err),
    }
}

async fn answer(contextor: &Contextor, event: FunctionEvent) -> Result<String, AppError> {
    if !event.http_method.eq_ignore_ascii_case("POST") {
        return Err(AppError::MethodNotAllowed);
    }
    let req: AskRequest = match event.body.as_deref().map(str::trim) {
        None | Some("") => AskRequest::default(),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))?,
    };
    let qa = contextor.handle(req.question.as_deref()).await?;
    Ok(qa.answer)
}
