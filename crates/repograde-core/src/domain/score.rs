//! The fixed score schema produced for every graded repository.

use serde::{Deserialize, Serialize};

/// One of the ten rubric metrics, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    FeatureCompletion,
    Functionality,
    UiUxInteractivity,
    CodeQuality,
    ErrorHandling,
    BestPractices,
    TechStackDepth,
    GithubUsage,
    UniquenessInnovation,
    AiGeneratedScore,
}

impl Metric {
    /// All metrics in rubric order. Justifications are zipped against this.
    pub const ALL: [Metric; 10] = [
        Metric::FeatureCompletion,
        Metric::Functionality,
        Metric::UiUxInteractivity,
        Metric::CodeQuality,
        Metric::ErrorHandling,
        Metric::BestPractices,
        Metric::TechStackDepth,
        Metric::GithubUsage,
        Metric::UniquenessInnovation,
        Metric::AiGeneratedScore,
    ];

    /// Key used for this metric in model output and persisted records.
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::FeatureCompletion => "feature_completion",
            Metric::Functionality => "functionality",
            Metric::UiUxInteractivity => "ui_ux_interactivity",
            Metric::CodeQuality => "code_quality",
            Metric::ErrorHandling => "error_handling",
            Metric::BestPractices => "best_practices",
            Metric::TechStackDepth => "tech_stack_depth",
            Metric::GithubUsage => "github_usage",
            Metric::UniquenessInnovation => "uniqueness_innovation",
            Metric::AiGeneratedScore => "ai_generated_score",
        }
    }

    /// Position of this metric in [`Metric::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ten rubric scores. Values are whatever the model supplied; range checks
/// belong to the rubric, not to this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricScores {
    pub feature_completion: i64,
    pub functionality: i64,
    pub ui_ux_interactivity: i64,
    pub code_quality: i64,
    pub error_handling: i64,
    pub best_practices: i64,
    pub tech_stack_depth: i64,
    pub github_usage: i64,
    pub uniqueness_innovation: i64,
    pub ai_generated_score: i64,
}

impl RubricScores {
    pub fn get(&self, metric: Metric) -> i64 {
        match metric {
            Metric::FeatureCompletion => self.feature_completion,
            Metric::Functionality => self.functionality,
            Metric::UiUxInteractivity => self.ui_ux_interactivity,
            Metric::CodeQuality => self.code_quality,
            Metric::ErrorHandling => self.error_handling,
            Metric::BestPractices => self.best_practices,
            Metric::TechStackDepth => self.tech_stack_depth,
            Metric::GithubUsage => self.github_usage,
            Metric::UniquenessInnovation => self.uniqueness_innovation,
            Metric::AiGeneratedScore => self.ai_generated_score,
        }
    }

    pub fn set(&mut self, metric: Metric, value: i64) {
        let slot = match metric {
            Metric::FeatureCompletion => &mut self.feature_completion,
            Metric::Functionality => &mut self.functionality,
            Metric::UiUxInteractivity => &mut self.ui_ux_interactivity,
            Metric::CodeQuality => &mut self.code_quality,
            Metric::ErrorHandling => &mut self.error_handling,
            Metric::BestPractices => &mut self.best_practices,
            Metric::TechStackDepth => &mut self.tech_stack_depth,
            Metric::GithubUsage => &mut self.github_usage,
            Metric::UniquenessInnovation => &mut self.uniqueness_innovation,
            Metric::AiGeneratedScore => &mut self.ai_generated_score,
        };
        *slot = value;
    }

    /// Sum of the ten metrics.
    pub fn sum(&self) -> i64 {
        Metric::ALL.iter().map(|m| self.get(*m)).sum()
    }
}

/// Categorical "was this AI-generated" label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiLabel {
    Unlikely,
    Possibly,
    Likely,
}

impl AiLabel {
    /// Case-insensitive parse; anything outside the three labels is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unlikely" => Some(AiLabel::Unlikely),
            "possibly" => Some(AiLabel::Possibly),
            "likely" => Some(AiLabel::Likely),
            _ => None,
        }
    }
}

/// Normalized grading result for one repository.
///
/// Serializes flat, with the same keys the model is asked to emit, so a
/// serialized record can be fed back through normalization unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Main technologies observed
    pub tech_stack: String,
    #[serde(flatten)]
    pub scores: RubricScores,
    pub ai_generated_label: Option<AiLabel>,
    /// Total as reported by the model. Never recomputed.
    pub total_score: i64,
    /// One justification per metric, aligned with [`Metric::ALL`]
    pub score_explanation: Vec<String>,
    /// One-sentence summary
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub needs_second_attempt: bool,
}

impl ScoreRecord {
    /// Justification for `metric`, or `""` when none was given.
    pub fn explanation(&self, metric: Metric) -> &str {
        self.score_explanation
            .get(metric.index())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Whether the reported total agrees with the ten metrics.
    pub fn total_is_consistent(&self) -> bool {
        self.total_score == self.scores.sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_keys_follow_rubric_order() {
        let keys: Vec<&str> = Metric::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(keys[0], "feature_completion");
        assert_eq!(keys[2], "ui_ux_interactivity");
        assert_eq!(keys[9], "ai_generated_score");
        for (i, m) in Metric::ALL.iter().enumerate() {
            assert_eq!(m.index(), i);
        }
    }

    #[test]
    fn metric_serde_matches_as_str() {
        for m in Metric::ALL {
            let v = serde_json::to_value(m).unwrap();
            assert_eq!(v, m.as_str());
        }
    }

    #[test]
    fn rubric_get_set_and_sum() {
        let mut scores = RubricScores::default();
        for (i, m) in Metric::ALL.iter().enumerate() {
            scores.set(*m, i as i64);
        }
        assert_eq!(scores.get(Metric::CodeQuality), 3);
        assert_eq!(scores.sum(), 45);
    }

    #[test]
    fn ai_label_parse_is_case_insensitive() {
        assert_eq!(AiLabel::parse(" likely "), Some(AiLabel::Likely));
        assert_eq!(AiLabel::parse("UNLIKELY"), Some(AiLabel::Unlikely));
        assert_eq!(AiLabel::parse("Possibly"), Some(AiLabel::Possibly));
        assert_eq!(AiLabel::parse("Unlikely|Possibly|Likely"), None);
    }

    #[test]
    fn score_record_serializes_flat() {
        let record = ScoreRecord::default();
        let v = serde_json::to_value(&record).unwrap();
        let obj = v.as_object().unwrap();
        for m in Metric::ALL {
            assert!(obj.contains_key(m.as_str()), "missing key: {}", m);
        }
        assert!(obj.contains_key("total_score"));
        assert!(!obj.contains_key("scores"));
    }

    #[test]
    fn inconsistent_total_is_detectable() {
        let mut record = ScoreRecord::default();
        record.scores.code_quality = 5;
        record.total_score = 90;
        assert!(!record.total_is_consistent());
        record.total_score = 5;
        assert!(record.total_is_consistent());
    }
}
