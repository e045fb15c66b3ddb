//! Schema normalization: recovered object → [`ScoreRecord`].
//!
//! Pure shape mapping. Missing keys get defaults, mistyped values degrade to
//! the empty default of their slot, and nothing here returns an error. Text
//! values are already decoded, so only real line breaks, tabs and fence
//! markers are scrubbed from them. Score ranges are not checked and
//! `total_score` is copied, not recomputed.

use serde_json::Value;

use crate::domain::{AiLabel, Metric, RubricScores, ScoreRecord};
use crate::recovery::{scrub_decoded, RecoveredRecord};

/// Map a recovered record onto the fixed score schema.
pub fn normalize(record: &RecoveredRecord) -> ScoreRecord {
    let mut scores = RubricScores::default();
    for metric in Metric::ALL {
        scores.set(metric, coerce_int(record.get(metric.as_str())));
    }

    ScoreRecord {
        tech_stack: coerce_text(record.get("tech_stack")),
        scores,
        ai_generated_label: record
            .get("ai_generated_label")
            .and_then(Value::as_str)
            .and_then(AiLabel::parse),
        total_score: coerce_int(record.get("total_score")),
        score_explanation: justifications(record.get("score_explanation")),
        summary: coerce_text(record.get("summary")),
        strengths: split_list(record.get("strengths"), ','),
        improvements: split_list(record.get("improvements"), ','),
        needs_second_attempt: record
            .get("needs_second_attempt")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Integer view of a JSON value; 0 for anything that is not a number or a
/// numeric string. Fractions truncate toward zero.
fn coerce_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| float_to_int(n.as_f64()?))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| float_to_int(s.parse::<f64>().ok()?))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    f.is_finite().then(|| f.trunc() as i64)
}

fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => scrub_decoded(s),
        _ => String::new(),
    }
}

/// A delimiter-joined string or an array of strings, as an ordered list of
/// trimmed, non-empty items.
fn split_list(value: Option<&Value>, delimiter: char) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(delimiter)
            .map(scrub_decoded)
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(scrub_decoded)
            .filter(|item| !item.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Exactly one justification per metric, in rubric order.
fn justifications(value: Option<&Value>) -> Vec<String> {
    let slots: Vec<String> = match value {
        Some(Value::String(s)) => s
            .split(';')
            .map(scrub_decoded)
            .filter(|part| !part.is_empty())
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(scrub_decoded).unwrap_or_default())
            .collect(),
        Some(Value::Object(by_metric)) => Metric::ALL
            .iter()
            .map(|m| {
                by_metric
                    .get(m.as_str())
                    .and_then(Value::as_str)
                    .map(scrub_decoded)
                    .unwrap_or_default()
            })
            .collect(),
        _ => Vec::new(),
    };

    Metric::ALL
        .iter()
        .map(|m| slots.get(m.index()).cloned().unwrap_or_default())
        .collect()
}
