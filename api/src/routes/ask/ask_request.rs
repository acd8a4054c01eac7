use serde::{Deserialize, Serialize};

/// Request payload for the question endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    /// Natural language question; validated by the orchestrator.
    #[serde(default)]
    pub question: Option<String>,
}

/// Response payload for the question endpoint.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}
