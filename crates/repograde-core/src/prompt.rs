//! Prompt rendering.
//!
//! The grading instructions live in a template with a single
//! `{project_info}` placeholder that receives the corpus excerpt.

use std::path::Path;

use crate::domain::{GradeError, Result};

/// Placeholder replaced by the corpus excerpt.
pub const PROJECT_INFO_PLACEHOLDER: &str = "{project_info}";

/// Built-in grading instructions.
pub const DEFAULT_TEMPLATE: &str = r#"You are grading ONE second-year computer science student project.
Analyze ONLY the code and README given below. Do not assume features you cannot see.

Return a single JSON object and nothing else: no markdown fences, no prose.
Score ten metrics as integers from 0 to 10. total_score is the sum of the ten metrics.
Cite file or folder names as evidence. With no evidence, score 0 and write "evidence: not found".
If the excerpt is too thin to grade in one pass, set "needs_second_attempt" to true.

PROJECT CODE (trimmed excerpts):
{project_info}

METRICS
1) feature_completion: features present versus what the project domain needs.
2) functionality: would it run; obvious bugs, missing wiring, broken flows.
3) ui_ux_interactivity: usability, event handling, state logic.
4) code_quality: readability, naming, modularity, duplication.
5) error_handling: validation, edge cases, guards, fallbacks.
6) best_practices: structure, config separation, lint or test hints.
7) tech_stack_depth: frameworks, libraries, APIs and tooling beyond the basics.
8) github_usage: README, .gitignore, repository hygiene.
9) uniqueness_innovation: originality versus template or tutorial code.
10) ai_generated_score: 10 means very unlikely AI-generated, 0 means highly AI-like.

OUTPUT KEYS
{
  "tech_stack": "main technologies observed",
  "feature_completion": 0,
  "functionality": 0,
  "ui_ux_interactivity": 0,
  "code_quality": 0,
  "error_handling": 0,
  "best_practices": 0,
  "tech_stack_depth": 0,
  "github_usage": 0,
  "uniqueness_innovation": 0,
  "ai_generated_score": 0,
  "ai_generated_label": "Unlikely|Possibly|Likely",
  "total_score": 0,
  "score_explanation": "10 semicolon-separated justifications in metric order, each citing a file",
  "summary": "one sentence on impact and level",
  "strengths": "comma-separated strengths tied to files",
  "improvements": "comma-separated next steps tied to files",
  "needs_second_attempt": false
}
"#;

/// A validated instruction template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Wrap `text`, which must contain [`PROJECT_INFO_PLACEHOLDER`].
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !text.contains(PROJECT_INFO_PLACEHOLDER) {
            return Err(GradeError::InvalidTemplate(format!(
                "template has no {PROJECT_INFO_PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self { text })
    }

    /// Load a template from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::new(text)
    }

    /// Substitute the excerpt into every placeholder occurrence.
    ///
    /// The excerpt is inserted literally; braces inside it are not
    /// interpreted.
    pub fn render(&self, excerpt: &str) -> String {
        self.text.replace(PROJECT_INFO_PLACEHOLDER, excerpt)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}
