//! repograde-core: batch grading of student repositories
//!
//! Builds a size-bounded excerpt of each repository, asks a chat model to
//! grade it, recovers a JSON object from whatever the model returned and
//! normalizes it into a fixed [`ScoreRecord`].
//!
//! Layers, leaf first:
//! - [`policy`]: which directories are pruned and which files count as source
//! - [`corpus`]: deterministic, budgeted excerpt construction
//! - [`prompt`]: `{project_info}` template rendering
//! - [`recovery`]: fence/escape cleanup, object slicing, one trailing-comma repair
//! - [`normalize`]: recovered object → `ScoreRecord`
//! - [`evaluate`], [`report`], [`batch`]: per-repository pipeline and persistence

pub mod batch;
pub mod corpus;
pub mod discovery;
pub mod domain;
pub mod evaluate;
pub mod git;
pub mod normalize;
pub mod obs;
pub mod policy;
pub mod prompt;
pub mod recovery;
pub mod report;
pub mod telemetry;

pub use batch::{evaluate_root, run_batch, BatchSummary};
pub use corpus::{CorpusBudget, CorpusBuilder, CorpusExcerpt, CorpusStats};
pub use discovery::discover_repositories;
pub use domain::{AiLabel, GradeError, Metric, RepoTarget, Result, RubricScores, ScoreRecord};
pub use evaluate::{score_response, Evaluator, DEFAULT_MODEL};
pub use normalize::normalize;
pub use policy::SourcePolicy;
pub use prompt::PromptTemplate;
pub use recovery::{recover, ParseAttempt, Recovered, RecoveredRecord, RecoveryError};
pub use report::{write_report, EvaluationReport};
pub use telemetry::init_tracing;
