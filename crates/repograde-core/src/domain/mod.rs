//! Domain models for repograde.
//!
//! - `RepoTarget`: a repository directory selected for grading
//! - `ScoreRecord`: the normalized grading result
//! - `GradeError`: the domain error taxonomy

pub mod error;
pub mod score;
pub mod target;

pub use error::{GradeError, Result};
pub use score::{AiLabel, Metric, RubricScores, ScoreRecord};
pub use target::RepoTarget;
