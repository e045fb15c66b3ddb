//! Structured-output recovery for raw model responses.
//!
//! Models are asked for a bare JSON object but routinely wrap it in markdown
//! fences, emit escaped newlines, add prose around it or leave a trailing
//! comma. [`recover`] reduces such text to a JSON object in a fixed sequence:
//!
//! 1. clean (strip fences, flatten newlines, collapse whitespace)
//! 2. slice from the first `{` to the last `}`
//! 3. parse
//! 4. on failure, drop trailing commas and parse once more
//! 5. otherwise fail with [`RecoveryError`]
//!
//! There is no open-ended repair loop: at most two parses happen per call.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::corpus::truncate_chars;

/// A parsed object from model output. Keys may be missing or mistyped;
/// normalization deals with that.
pub type RecoveredRecord = Map<String, Value>;

/// Characters of the failing candidate kept in [`RecoveryError::Unparseable`].
pub const CANDIDATE_PREVIEW_CHARS: usize = 1000;

/// Raw model output could not be reduced to a JSON object.
///
/// Every variant carries the untouched response so a failure report can keep
/// it for manual inspection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecoveryError {
    #[error("no object delimiters found")]
    NoObjectDelimiters { raw: String },

    #[error("object parse failed after trailing-comma repair: {message}")]
    Unparseable {
        message: String,
        /// Repaired candidate, truncated to [`CANDIDATE_PREVIEW_CHARS`]
        candidate: String,
        raw: String,
    },
}

impl RecoveryError {
    /// The original response text.
    pub fn raw_text(&self) -> &str {
        match self {
            RecoveryError::NoObjectDelimiters { raw } => raw,
            RecoveryError::Unparseable { raw, .. } => raw,
        }
    }

    /// The substring that failed to parse, when one was found.
    pub fn candidate(&self) -> Option<&str> {
        match self {
            RecoveryError::NoObjectDelimiters { .. } => None,
            RecoveryError::Unparseable { candidate, .. } => Some(candidate),
        }
    }
}

/// Which parse attempt produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAttempt {
    /// The cleaned candidate parsed as-is.
    Direct,
    /// The candidate parsed after trailing commas were removed.
    Repaired,
}

/// Successful recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub record: RecoveredRecord,
    pub attempt: ParseAttempt,
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```(?:[A-Za-z][A-Za-z0-9_+.\-]*)?(\s|[{\[]|$)").expect("valid regex")
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid regex"))
}

/// Remove fence markers, with or without a language tag, anywhere in `text`.
fn strip_fences(text: &str) -> String {
    fence_re().replace_all(text, " ${1}").replace("```", "")
}

/// Replace the two-character escapes `\n` and `\r\n` with a space.
///
/// An escaped backslash (`\\`) is copied through as a pair, so `\\n`,
/// `\t`, `\r` and every other escape survive for the JSON parser.
fn flatten_escaped_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('\\') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if let Some(after) = tail.strip_prefix("\\r\\n") {
            out.push(' ');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("\\n") {
            out.push(' ');
            rest = after;
        } else {
            // `\\` pairs and every other escape are copied verbatim.
            let len = tail[1..].chars().next().map_or(0, char::len_utf8);
            out.push_str(&tail[..1 + len]);
            rest = &tail[1 + len..];
        }
    }
    out.push_str(rest);
    out
}

fn collapse_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text, " ").trim().to_string()
}

/// Clean raw model output before slicing: strip fences, turn literal line
/// breaks and escaped `\n` sequences into spaces, collapse whitespace runs
/// and trim.
///
/// Lossy on purpose: any line break the model meant to keep inside a string
/// is flattened. Other escapes are left for the parser. Applying it twice
/// gives the same result as applying it once.
pub fn clean_text(text: &str) -> String {
    let flattened = flatten_escaped_newlines(&strip_fences(text)).replace(['\r', '\n'], " ");
    collapse_whitespace(&flattened)
}

/// Scrub a string value that has already been decoded by the JSON parser:
/// strip fences, turn real control whitespace into spaces, collapse runs and
/// trim. Backslashes are ordinary characters here and are never touched.
pub fn scrub_decoded(text: &str) -> String {
    let flattened = strip_fences(text).replace(['\r', '\n', '\t'], " ");
    collapse_whitespace(&flattened)
}

/// The slice from the first `{` through the last `}`, if both exist in order.
pub fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Remove a comma that directly precedes (modulo whitespace) `}` or `]`.
pub fn remove_trailing_commas(candidate: &str) -> String {
    trailing_comma_re().replace_all(candidate, "$1").into_owned()
}

fn parse_object(candidate: &str) -> Result<RecoveredRecord, serde_json::Error> {
    serde_json::from_str::<RecoveredRecord>(candidate)
}

/// Steps of the recovery sequence. Transitions only move forward.
#[derive(Debug)]
enum Stage {
    RawParse(String),
    Repair(String),
    RetryParse(String),
}

enum Transition {
    Next(Stage),
    Done(Recovered),
    Failed { message: String, candidate: String },
}

impl Stage {
    fn advance(self) -> Transition {
        match self {
            Stage::RawParse(candidate) => match parse_object(&candidate) {
                Ok(record) => Transition::Done(Recovered {
                    record,
                    attempt: ParseAttempt::Direct,
                }),
                Err(e) => {
                    debug!(error = %e, "Direct parse failed; attempting trailing-comma repair");
                    Transition::Next(Stage::Repair(candidate))
                }
            },
            Stage::Repair(candidate) => {
                Transition::Next(Stage::RetryParse(remove_trailing_commas(&candidate)))
            }
            Stage::RetryParse(candidate) => match parse_object(&candidate) {
                Ok(record) => Transition::Done(Recovered {
                    record,
                    attempt: ParseAttempt::Repaired,
                }),
                Err(e) => Transition::Failed {
                    message: e.to_string(),
                    candidate,
                },
            },
        }
    }
}

/// Recover a JSON object from raw model output.
pub fn recover(raw: &str) -> Result<Recovered, RecoveryError> {
    let cleaned = clean_text(raw);
    let Some(candidate) = outermost_object(&cleaned) else {
        return Err(RecoveryError::NoObjectDelimiters {
            raw: raw.to_string(),
        });
    };

    // RawParse -> Repair -> RetryParse: three transitions at most.
    let mut stage = Stage::RawParse(candidate.to_string());
    loop {
        match stage.advance() {
            Transition::Next(next) => stage = next,
            Transition::Done(recovered) => return Ok(recovered),
            Transition::Failed { message, candidate } => {
                return Err(RecoveryError::Unparseable {
                    message,
                    candidate: truncate_chars(&candidate, CANDIDATE_PREVIEW_CHARS).to_string(),
                    raw: raw.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_text_strips_tagged_and_bare_fences() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nthanks ```";
        assert_eq!(clean_text(raw), "Here you go: {\"a\": 1} thanks");
    }

    #[test]
    fn clean_text_strips_fences_mid_text() {
        let raw = "prefix ```python\nprint(1)\n``` suffix";
        assert_eq!(clean_text(raw), "prefix print(1) suffix");
    }

    #[test]
    fn clean_text_flattens_literal_and_escaped_newlines() {
        let raw = "{\"summary\": \"line one\\nline two\"}\r\n";
        assert_eq!(clean_text(raw), "{\"summary\": \"line one line two\"}");
    }

    #[test]
    fn clean_text_strips_tagged_fence_sharing_a_line_with_the_object() {
        assert_eq!(clean_text("```json {\"a\": 1} ```"), "{\"a\": 1}");
        assert_eq!(clean_text("```json{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn clean_text_flattens_escaped_crlf_as_one_unit() {
        assert_eq!(clean_text(r#"{"s": "a\r\nb"}"#), r#"{"s": "a b"}"#);
    }

    #[test]
    fn clean_text_keeps_other_escapes_for_the_parser() {
        let raw = r#"{"summary": "see src\\tests\\app.py\tand \"quotes\""}"#;
        assert_eq!(clean_text(raw), raw);
    }

    #[test]
    fn clean_text_keeps_escaped_backslash_before_n() {
        let raw = r#"{"path": "C:\\new\\main.py"}"#;
        assert_eq!(clean_text(raw), raw);
    }

    #[test]
    fn windows_paths_in_valid_json_parse_directly() {
        let raw = r#"{"summary": "see src\\tests\\app.py", "code_quality": 5}"#;
        let recovered = recover(raw).unwrap();
        assert_eq!(recovered.attempt, ParseAttempt::Direct);
        assert_eq!(recovered.record["summary"], json!("see src\\tests\\app.py"));
    }

    #[test]
    fn scrub_decoded_flattens_control_chars_and_keeps_backslashes() {
        assert_eq!(
            scrub_decoded("handlers in src\\routes\\api.js\n\tsee ```js"),
            "handlers in src\\routes\\api.js see"
        );
        assert_eq!(scrub_decoded(r"a\nb"), r"a\nb");
    }

    #[test]
    fn clean_text_is_idempotent() {
        let raw = "```json\n{ \"a\" :\t1,\n\n \"b\": \"x\\ny\" }\n```";
        let once = clean_text(raw);
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn outermost_object_spans_first_open_to_last_close() {
        assert_eq!(
            outermost_object("say {\"a\": {\"b\": 1}} and }"),
            Some("{\"a\": {\"b\": 1}} and }")
        );
        assert_eq!(outermost_object("} backwards {"), None);
        assert_eq!(outermost_object("no braces"), None);
    }

    #[test]
    fn trailing_commas_removed_before_braces_and_brackets() {
        assert_eq!(
            remove_trailing_commas("{\"a\": [1, 2, ], \"b\": 3 , }"),
            "{\"a\": [1, 2], \"b\": 3 }"
        );
    }

    #[test]
    fn direct_parse_reports_direct_attempt() {
        let recovered = recover("{\"code_quality\": 7}").unwrap();
        assert_eq!(recovered.attempt, ParseAttempt::Direct);
        assert_eq!(recovered.record["code_quality"], json!(7));
    }

    #[test]
    fn trailing_comma_reports_repaired_attempt() {
        let recovered = recover("{\"code_quality\": 7,}").unwrap();
        assert_eq!(recovered.attempt, ParseAttempt::Repaired);
    }

    #[test]
    fn missing_delimiters_keep_raw_text() {
        let err = recover("I cannot grade this project.").unwrap_err();
        assert!(matches!(err, RecoveryError::NoObjectDelimiters { .. }));
        assert_eq!(err.raw_text(), "I cannot grade this project.");
        assert_eq!(err.to_string(), "no object delimiters found");
    }

    #[test]
    fn unrepairable_object_fails_with_candidate() {
        let raw = "{\"a\": 1 \"b\": 2}";
        let err = recover(raw).unwrap_err();
        assert!(matches!(err, RecoveryError::Unparseable { .. }));
        assert_eq!(err.raw_text(), raw);
        assert_eq!(err.candidate(), Some("{\"a\": 1 \"b\": 2}"));
    }

    #[test]
    fn failure_candidate_is_truncated() {
        let raw = format!("{{\"a\": \"{}\" oops}}", "x".repeat(5000));
        let err = recover(&raw).unwrap_err();
        assert_eq!(
            err.candidate().unwrap().chars().count(),
            CANDIDATE_PREVIEW_CHARS
        );
        assert_eq!(err.raw_text(), raw);
    }
}
