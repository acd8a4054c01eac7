//! Public API types re-used by external crates (e.g., the HTTP API layer).

use serde::Serialize;

/// A context chunk that was fed to the model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UsedChunk {
    pub id: String,
    pub score: f32,
    pub text: String,
}

/// Final answer together with the context passed to the model.
///
/// `grounded` is `false` when retrieval found nothing and the answer is the
/// configured "no information" text.
///
/// # Example
/// ```
/// use contextor::QaAnswer;
/// let qa = QaAnswer {
///     answer: "The captain betrays the crew in chapter 3.".into(),
///     context: vec![],
///     grounded: true,
/// };
/// assert!(!qa.answer.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QaAnswer {
    pub answer: String,
    pub context: Vec<UsedChunk>,
    pub grounded: bool,
}
