//! Chunked analysis run shared by both execution paths.
//!
//! An [`AnalysisRun`] owns the decoded table, resolves the header once and
//! then advances one chunk at a time. A chunk ends right after a progress
//! emission, so callers can forward the percentage and yield between
//! chunks.

use insight_core::columns::HeaderIndex;
use insight_core::dates::DateNormalizer;
use insight_core::models::{AggregationResult, RawRow};
use tracing::{debug, warn};

use crate::aggregator::Aggregator;
use crate::progress::ProgressReporter;

// ── AnalysisRun ───────────────────────────────────────────────────────────────

/// Column Resolver → Aggregator → Progress Reporter over one table.
#[derive(Debug)]
pub struct AnalysisRun {
    rows: std::vec::IntoIter<RawRow>,
    aggregator: Aggregator,
    progress: ProgressReporter,
    started: bool,
}

impl AnalysisRun {
    /// Prepare a run over `table`; the first row is the header.
    ///
    /// A table without even a header row is treated as having no data rows.
    pub fn new(table: Vec<RawRow>, normalizer: DateNormalizer) -> Self {
        let mut rows = table.into_iter();
        let header = rows
            .next()
            .map(|h| HeaderIndex::resolve(&h))
            .unwrap_or_default();

        let missing = header.missing();
        if !missing.is_empty() {
            warn!(?missing, "header is missing columns; they read as empty");
        }

        let total = rows.len();
        debug!(total_rows = total, ?header, "analysis run prepared");

        Self {
            rows,
            aggregator: Aggregator::new(header, normalizer),
            progress: ProgressReporter::new(total),
            started: false,
        }
    }

    /// Number of data rows (header excluded).
    pub fn total_rows(&self) -> usize {
        self.progress.total()
    }

    pub fn rows_processed(&self) -> usize {
        self.aggregator.rows_processed()
    }

    /// `true` once every row has been ingested and the final progress
    /// emitted.
    pub fn is_finished(&self) -> bool {
        self.started && self.rows.len() == 0
    }

    /// Advance one chunk and return the progress it emitted.
    ///
    /// Returns `None` only when the run is already finished.
    pub fn step(&mut self) -> Option<u8> {
        if !self.started {
            self.started = true;
            if let Some(p) = self.progress.start() {
                return Some(p);
            }
        }

        for row in self.rows.by_ref() {
            self.aggregator.ingest(&row);
            if let Some(p) = self.progress.on_row(self.aggregator.rows_processed()) {
                return Some(p);
            }
        }
        None
    }

    /// Consume the run and produce its result.
    ///
    /// Rows not yet stepped through are ingested first.
    pub fn finish(mut self) -> AggregationResult {
        for row in self.rows.by_ref() {
            self.aggregator.ingest(&row);
        }
        let result = self.aggregator.finalize();
        debug!(
            rows = result.rows_processed,
            countries = result.countries.len(),
            days = result.date_counts.len(),
            "analysis run finished"
        );
        result
    }
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the whole table synchronously, reporting each progress emission.
pub fn analyze_rows(
    table: Vec<RawRow>,
    normalizer: DateNormalizer,
    mut on_progress: impl FnMut(u8),
) -> AggregationResult {
    let mut run = AnalysisRun::new(table, normalizer);
    while let Some(percent) = run.step() {
        on_progress(percent);
    }
    run.finish()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
