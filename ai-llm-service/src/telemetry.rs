//! Log formatting shared by the workspace binaries.
//!
//! Only events emitted by workspace crates are rendered; dependencies
//! (hyper, h2, tonic, ...) stay quiet unless `RUST_LOG` asks for them
//! through the global filter and a separate layer.

use std::io::{self, IsTerminal};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Target prefixes of the workspace crates and binaries.
pub const WORKSPACE_TARGETS: &[&str] = &[
    "plot_qa",
    "ingest_plot",
    "ai_llm_service",
    "rag_store",
    "contextor",
    "api",
];

/// RFC3339 UTC timer implemented via `chrono`.
/// Example output: `2025-09-12T10:20:30Z`
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Formatting layer that renders only events whose target starts with one of `targets`.
///
/// - RFC3339 UTC timestamps
/// - compact single-line format with `file:line`
/// - span close events, so `#[instrument]`ed calls report their duration
/// - ANSI colors only when stdout is a terminal
pub fn layer<S>(targets: &'static [&'static str]) -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();
    let only_ours = filter::filter_fn(move |meta| {
        let target = meta.target();
        targets.iter().any(|t| target_matches(target, t))
    });

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(only_ours)
}

/// `RUST_LOG` if set, otherwise `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global subscriber for a workspace binary.
pub fn init(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(layer(WORKSPACE_TARGETS))
        .try_init()
}

/// `rag_store::index` matches `rag_store`, `rag_storex` does not.
fn target_matches(target: &str, prefix: &str) -> bool {
    target == prefix
        || target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with("::"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_prefix_respects_module_boundaries() {
        assert!(target_matches("rag_store", "rag_store"));
        assert!(target_matches("rag_store::index::jsonl", "rag_store"));
        assert!(!target_matches("rag_store_ext::x", "rag_store"));
        assert!(!target_matches("hyper::proto", "api"));
    }
}
