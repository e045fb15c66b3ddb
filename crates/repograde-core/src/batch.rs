//! Sequential batch evaluation.

use std::path::{Path, PathBuf};

use chat_endpoint::ChatClient;
use serde::Serialize;

use crate::discovery::discover_repositories;
use crate::domain::{RepoTarget, Result};
use crate::evaluate::Evaluator;
use crate::obs::{emit_batch_finished, emit_report_write_failed, emit_report_written};
use crate::report::write_report;

/// Outcome counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub evaluated: usize,
    /// Reports with `done: true`
    pub succeeded: usize,
    pub failed: usize,
    /// Reports that could not be persisted
    pub write_failures: usize,
    /// Paths of reports written, in evaluation order
    pub reports: Vec<PathBuf>,
}

/// Evaluate `targets` one at a time, writing a report for each under
/// `out_dir`. A failed evaluation or report write never stops the batch.
pub async fn run_batch<C: ChatClient>(
    evaluator: &Evaluator<C>,
    targets: &[RepoTarget],
    out_dir: &Path,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for target in targets {
        let report = evaluator.evaluate(target).await;
        summary.evaluated += 1;
        if report.done {
            summary.succeeded += 1;
        } else {
            summary.failed += 1;
        }

        let repo = target.display_name();
        match write_report(&report, out_dir) {
            Ok(path) => {
                emit_report_written(&repo, &path);
                summary.reports.push(path);
            }
            Err(e) => {
                emit_report_write_failed(&repo, &e);
                summary.write_failures += 1;
            }
        }
    }

    emit_batch_finished(summary.evaluated, summary.succeeded, summary.failed);
    summary
}

/// Discover every repository under `root` and run the batch over them.
pub async fn evaluate_root<C: ChatClient>(
    evaluator: &Evaluator<C>,
    root: &Path,
    out_dir: &Path,
) -> Result<BatchSummary> {
    let targets = discover_repositories(root, evaluator.policy())?;
    Ok(run_batch(evaluator, &targets, out_dir).await)
}
