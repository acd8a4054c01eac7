//! Prompt builder: role preamble, reference block, question.

use rag_store::RagHit;

/// Default role and grounding instructions.
pub const DEFAULT_PREAMBLE: &str = "You are a professional manga editor. Answer the user's \
question in friendly, clear language, based only on the reference information below. \
Do not use outside knowledge. If the reference information does not contain the answer, \
say that the information is not available.";

/// Default answer when retrieval finds nothing.
pub const DEFAULT_NO_INFO_ANSWER: &str =
    "Sorry, there is no information about that in the plot.";

/// Retrieved texts in ranking order, joined by `separator`.
pub fn join_context(hits: &[RagHit], separator: &str) -> String {
    hits.iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Builds the single prompt sent to the model.
///
/// With an empty `context` the reference block is replaced by an explicit
/// instruction to reply with `no_info_answer`.
///
/// # Example
/// ```
/// # use contextor::prompt::build_prompt;
/// let p = build_prompt("Be brief.", "Bella is a spy.", "Who is Bella?", "No info.");
/// assert!(p.contains("# Reference information"));
/// assert!(p.ends_with("Who is Bella?"));
/// ```
pub fn build_prompt(preamble: &str, context: &str, question: &str, no_info_answer: &str) -> String {
    let mut out = String::with_capacity(preamble.len() + context.len() + question.len() + 128);
    out.push_str(preamble.trim());
    out.push_str("\n\n# Reference information\n---\n");
    if context.trim().is_empty() {
        out.push_str("(none)\n---\n\n");
        out.push_str(
            "No reference information is available for this question. Do not answer it; \
reply exactly with: ",
        );
        out.push_str(no_info_answer);
        out.push_str("\n\n");
    } else {
        out.push_str(context);
        out.push_str("\n---\n\n");
    }
    out.push_str("# Question\n");
    out.push_str(question.trim());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str) -> RagHit {
        RagHit {
            id: text.into(),
            text: text.into(),
            score: 1.0,
        }
    }

    #[test]
    fn context_keeps_order_and_separator() {
        let ctx = join_context(&[hit("DEFG"), hit("ABCD")], "\n\n---\n\n");
        assert_eq!(ctx, "DEFG\n\n---\n\nABCD");
        assert_eq!(join_context(&[], "|"), "");
    }

    #[test]
    fn prompt_orders_preamble_context_question() {
        let p = build_prompt(DEFAULT_PREAMBLE, "DEFG", " what happens? ", DEFAULT_NO_INFO_ANSWER);
        let pre = p.find("based only on the reference information").unwrap();
        let ctx = p.find("DEFG").unwrap();
        let q = p.find("# Question\nwhat happens?").unwrap();
        assert!(pre < ctx && ctx < q);
        assert!(!p.contains(DEFAULT_NO_INFO_ANSWER));
    }

    #[test]
    fn empty_context_demands_no_info_reply() {
        let p = build_prompt(DEFAULT_PREAMBLE, "  ", "Who is Bella?", "Nothing known.");
        assert!(p.contains("No reference information is available"));
        assert!(p.contains("reply exactly with: Nothing known."));
    }
}
