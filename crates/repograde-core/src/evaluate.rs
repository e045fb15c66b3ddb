//! Per-repository evaluation.
//!
//! One evaluation runs corpus → prompt → chat → recovery → normalization and
//! always ends in an [`EvaluationReport`]. Endpoint and recovery failures are
//! folded into a failure report here; they never escape to the batch.

use std::time::Instant;

use chat_endpoint::{ChatClient, ChatOptions, ChatRequest};
use tracing::warn;

use crate::corpus::{truncate_chars, CorpusBudget, CorpusBuilder, CorpusExcerpt};
use crate::domain::{RepoTarget, ScoreRecord};
use crate::git::last_commit_date;
use crate::normalize::normalize;
use crate::obs::{
    emit_corpus_built, emit_endpoint_failed, emit_evaluation_finished, emit_evaluation_started,
    emit_recovery_failed, RepoSpan,
};
use crate::policy::SourcePolicy;
use crate::prompt::PromptTemplate;
use crate::recovery::{recover, RecoveryError};
use crate::report::EvaluationReport;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "deepseek-r1:8b";

/// Characters of raw output included in recovery-failure log events.
const RAW_PREVIEW_CHARS: usize = 200;

/// Recover and normalize one raw model response.
pub fn score_response(raw: &str) -> Result<ScoreRecord, RecoveryError> {
    let recovered = recover(raw)?;
    Ok(normalize(&recovered.record))
}

/// Grades repositories against one model with fixed settings.
pub struct Evaluator<C> {
    client: C,
    model: String,
    options: ChatOptions,
    policy: SourcePolicy,
    budget: CorpusBudget,
    template: PromptTemplate,
}

impl<C: ChatClient> Evaluator<C> {
    /// Evaluator with the standard policy, budget, options and template.
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            options: ChatOptions::default(),
            policy: SourcePolicy::standard(),
            budget: CorpusBudget::default(),
            template: PromptTemplate::default(),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_budget(mut self, budget: CorpusBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn policy(&self) -> &SourcePolicy {
        &self.policy
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Build the excerpt for `target` without contacting the model.
    pub fn build_corpus(&self, target: &RepoTarget) -> CorpusExcerpt {
        CorpusBuilder::new(&self.policy, self.budget).build(&target.path)
    }

    /// Evaluate one repository. Never fails: every outcome is a report.
    pub async fn evaluate(&self, target: &RepoTarget) -> EvaluationReport {
        let repo = target.display_name();
        let _span = RepoSpan::enter(&repo);
        let started = Instant::now();
        emit_evaluation_started(&repo, &self.model);

        let excerpt = self.build_corpus(target);
        emit_corpus_built(&repo, excerpt.stats());
        let stats = excerpt.stats().clone();

        let prompt = self.template.render(excerpt.as_str());
        let request = ChatRequest::single_prompt(&self.model, prompt, self.options);

        let report = match self.client.chat(&request).await {
            Err(e) => {
                emit_endpoint_failed(&repo, &e);
                EvaluationReport::failure(target, &self.model, stats, &e, String::new())
            }
            Ok(raw) => match score_response(&raw) {
                Ok(score) => {
                    if !score.total_is_consistent() {
                        warn!(
                            total_score = score.total_score,
                            metric_sum = score.scores.sum(),
                            "total_score does not match metric sum; keeping model value"
                        );
                    }
                    let last_commit = last_commit_date(&target.path);
                    EvaluationReport::success(target, &self.model, stats, score, last_commit)
                }
                Err(e) => {
                    emit_recovery_failed(&repo, &e, truncate_chars(&raw, RAW_PREVIEW_CHARS));
                    let candidate = e.candidate().map(str::to_string);
                    EvaluationReport::failure(target, &self.model, stats, &e, raw)
                        .with_candidate(candidate)
                }
            },
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        emit_evaluation_finished(&repo, duration_ms, report.done);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_endpoint::fakes::{ScriptedChatClient, ScriptedReply};

    fn repo_with_main() -> (tempfile::TempDir, RepoTarget) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
        let target = RepoTarget::new("alice", "hello", dir.path());
        (dir, target)
    }

    #[test]
    fn score_response_recovers_fenced_output() {
        let score = score_response("```json\n{\"code_quality\": 6, \"summary\": \"ok\",}\n```").unwrap();
        assert_eq!(score.scores.code_quality, 6);
        assert_eq!(score.summary, "ok");
    }

    #[tokio::test]
    async fn successful_evaluation_produces_score_report() {
        let (_dir, target) = repo_with_main();
        let client = ScriptedChatClient::with_texts(["{\"functionality\": 8, \"total_score\": 8}"]);
        let evaluator = Evaluator::new(client, "test-model");

        let report = evaluator.evaluate(&target).await;

        assert!(report.done);
        assert_eq!(report.model, "test-model");
        assert_eq!(report.score().unwrap().scores.functionality, 8);
        assert_eq!(report.corpus.files_included, 1);
        assert!(report.last_commit.is_some());
    }

    #[tokio::test]
    async fn prompt_carries_the_excerpt() {
        let (_dir, target) = repo_with_main();
        let client = ScriptedChatClient::with_texts(["{}"]);
        let evaluator = Evaluator::new(client, "m")
            .with_template(PromptTemplate::new("GRADE>>{project_info}<<").unwrap());

        evaluator.evaluate(&target).await;

        let requests = evaluator.client().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].messages[0].content,
            "GRADE>>\nFILE: main.py\nprint('hi')\n<<"
        );
    }

    #[tokio::test]
    async fn endpoint_failure_becomes_failure_report() {
        let (_dir, target) = repo_with_main();
        let client = ScriptedChatClient::new(vec![ScriptedReply::Status(500)]);
        let evaluator = Evaluator::new(client, "m");

        let report = evaluator.evaluate(&target).await;

        assert!(!report.done);
        assert!(report.error.is_some());
        assert_eq!(report.raw_output.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn unrecoverable_output_keeps_raw_text() {
        let (_dir, target) = repo_with_main();
        let client = ScriptedChatClient::with_texts(["I will not grade this."]);
        let evaluator = Evaluator::new(client, "m");

        let report = evaluator.evaluate(&target).await;

        assert!(!report.done);
        assert_eq!(report.error.as_deref(), Some("no object delimiters found"));
        assert_eq!(report.raw_output.as_deref(), Some("I will not grade this."));
        assert!(report.candidate.is_none());
    }

    #[tokio::test]
    async fn unparseable_object_records_candidate() {
        let (_dir, target) = repo_with_main();
        let client = ScriptedChatClient::with_texts(["Result: {\"a\": 1 \"b\": 2} done"]);
        let evaluator = Evaluator::new(client, "m");

        let report = evaluator.evaluate(&target).await;

        assert!(!report.done);
        assert_eq!(report.candidate.as_deref(), Some("{\"a\": 1 \"b\": 2}"));
        assert_eq!(report.raw_output.as_deref(), Some("Result: {\"a\": 1 \"b\": 2} done"));
    }
}
