//! Progress reporting for ingestion.
//!
//! Use `NoopProgress` for headless runs and `IndicatifProgress` for a TTY.

use indicatif::{ProgressBar, ProgressStyle};

use crate::ingest::IngestReport;

/// Callbacks fired by the ingestion pipeline.
pub trait IngestProgress: Send + Sync {
    /// Called once chunking is done.
    fn start(&self, _total_chunks: usize, _total_batches: usize) {}
    /// Called after every committed batch with chunks processed so far.
    fn batch_committed(&self, _processed: usize, _total: usize) {}
    fn finish(&self, _report: &IngestReport) {}
}

#[derive(Default, Clone, Copy, Debug)]
pub struct NoopProgress;
impl IngestProgress for NoopProgress {}

/// Bounded bar over chunks.
pub struct IndicatifProgress {
    pb: ProgressBar,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>5}/{len:5} chunks {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Self { pb }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestProgress for IndicatifProgress {
    fn start(&self, total_chunks: usize, total_batches: usize) {
        self.pb.set_length(total_chunks as u64);
        self.pb.set_message(format!("in {total_batches} batches"));
    }

    fn batch_committed(&self, processed: usize, _total: usize) {
        self.pb.set_position(processed as u64);
    }

    fn finish(&self, report: &IngestReport) {
        self.pb
            .finish_with_message(format!("done, {} new records", report.stored));
    }
}
