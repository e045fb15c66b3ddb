//! Structured observability hooks for the grading lifecycle.
//!
//! - Repository-scoped tracing spans via the `RepoSpan` RAII guard
//! - Emission functions for lifecycle events: evaluation start and finish,
//!   corpus assembly, recovery failure, report persistence, batch completion
//!
//! Events are emitted at `info!` (failures at `warn!`). Filter with `RUST_LOG`.

use tracing::{info, warn};

use crate::corpus::CorpusStats;

/// RAII guard that enters a repository-scoped span for one evaluation.
///
/// ```ignore
/// let _span = RepoSpan::enter("alice/todo-app");
/// // every event until the guard drops carries repo = "alice/todo-app"
/// ```
pub struct RepoSpan {
    _span: tracing::span::EnteredSpan,
}

impl RepoSpan {
    pub fn enter(repo: &str) -> Self {
        let span = tracing::info_span!("repograde.repo", repo = %repo);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_evaluation_started(repo: &str, model: &str) {
    info!(event = "evaluation.started", repo = %repo, model = %model);
}

pub fn emit_corpus_built(repo: &str, stats: &CorpusStats) {
    info!(
        event = "corpus.built",
        repo = %repo,
        files = stats.files_included,
        candidates = stats.candidates,
        oversized = stats.oversized,
        skipped = stats.skipped,
        has_readme = stats.has_readme,
        chars = stats.chars,
    );
}

/// Emit event: evaluation finished; `success` mirrors the report's `done` flag.
pub fn emit_evaluation_finished(repo: &str, duration_ms: u64, success: bool) {
    info!(
        event = "evaluation.finished",
        repo = %repo,
        duration_ms = duration_ms,
        success = success,
    );
}

pub fn emit_endpoint_failed(repo: &str, error: &dyn std::fmt::Display) {
    warn!(event = "endpoint.failed", repo = %repo, error = %error);
}

pub fn emit_recovery_failed(repo: &str, error: &dyn std::fmt::Display, raw_preview: &str) {
    warn!(
        event = "recovery.failed",
        repo = %repo,
        error = %error,
        raw_preview = %raw_preview,
    );
}

pub fn emit_report_written(repo: &str, path: &std::path::Path) {
    info!(event = "report.written", repo = %repo, path = %path.display());
}

pub fn emit_report_write_failed(repo: &str, error: &dyn std::fmt::Display) {
    warn!(event = "report.write_failed", repo = %repo, error = %error);
}

pub fn emit_batch_finished(evaluated: usize, succeeded: usize, failed: usize) {
    info!(
        event = "batch.finished",
        evaluated = evaluated,
        succeeded = succeeded,
        failed = failed,
    );
}
