//! Per-repository evaluation reports and their persistence.
//!
//! Every evaluated repository gets exactly one report, success or not.
//! Reports are written to `<out>/<owner>/<repo>.json` through a temp file in
//! the same directory followed by a rename, so readers never observe a
//! half-written document.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::corpus::CorpusStats;
use crate::domain::{RepoTarget, Result, ScoreRecord};

/// Reason recorded for a completed evaluation.
pub const DONE_REASON_STOP: &str = "stop";

/// Assistant message wrapping the normalized score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMessage {
    pub role: String,
    pub content: ScoreRecord,
}

/// Persisted outcome of one repository evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Model identifier used for the chat call
    pub model: String,
    pub created_at: DateTime<Utc>,
    /// `true` only when a score record was produced
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    pub owner: String,
    pub repo_name: String,
    /// How the evidence excerpt was assembled
    pub corpus: CorpusStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ReportMessage>,
    /// `git log -1 --format=%cd`, success only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<String>,
    /// Failure description, failure only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Untouched model output (empty when the endpoint itself failed), failure only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    /// Candidate text that failed to parse, recovery failures only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
}

impl EvaluationReport {
    pub fn success(
        target: &RepoTarget,
        model: &str,
        corpus: CorpusStats,
        score: ScoreRecord,
        last_commit: String,
    ) -> Self {
        Self {
            model: model.to_string(),
            created_at: Utc::now(),
            done: true,
            done_reason: Some(DONE_REASON_STOP.to_string()),
            owner: target.owner.clone(),
            repo_name: target.name.clone(),
            corpus,
            message: Some(ReportMessage {
                role: "assistant".to_string(),
                content: score,
            }),
            last_commit: Some(last_commit),
            error: None,
            raw_output: None,
            candidate: None,
        }
    }

    pub fn failure(
        target: &RepoTarget,
        model: &str,
        corpus: CorpusStats,
        error: &dyn std::fmt::Display,
        raw_output: String,
    ) -> Self {
        Self {
            model: model.to_string(),
            created_at: Utc::now(),
            done: false,
            done_reason: None,
            owner: target.owner.clone(),
            repo_name: target.name.clone(),
            corpus,
            message: None,
            last_commit: None,
            error: Some(error.to_string()),
            raw_output: Some(raw_output),
            candidate: None,
        }
    }

    /// Attach the candidate that recovery gave up on.
    pub fn with_candidate(mut self, candidate: Option<String>) -> Self {
        self.candidate = candidate;
        self
    }

    /// The score record, for successful reports.
    pub fn score(&self) -> Option<&ScoreRecord> {
        self.message.as_ref().map(|m| &m.content)
    }
}

/// Destination of the report for `owner`/`repo_name` under `out_dir`.
pub fn report_path(out_dir: &Path, owner: &str, repo_name: &str) -> PathBuf {
    out_dir.join(owner).join(format!("{repo_name}.json"))
}

/// Atomically write `report` under `out_dir`, returning the final path.
pub fn write_report(report: &EvaluationReport, out_dir: &Path) -> Result<PathBuf> {
    let path = report_path(out_dir, &report.owner, &report.repo_name);
    let dir = path.parent().unwrap_or(out_dir);
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_vec_pretty(report)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.persist(&path).map_err(|e| e.error)?;

    Ok(path)
}

/// Read a report written by [`write_report`].
pub fn read_report(path: &Path) -> Result<EvaluationReport> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
