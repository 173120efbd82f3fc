//! Tiered parser for semi-structured model replies.
//!
//! Models are asked for JSON but do not reliably return it bare: replies
//! arrive fenced, wrapped in prose, or (for audit scoring) as free text.
//! The cascade tries the most structured reading first and falls through:
//!
//! 1. fenced block tagged `json`
//! 2. first `{` to last `}` span
//! 3. line scan for `Dimension: N(/10)?` patterns (scores only)
//!
//! Every numeric score must lie in [1,10]; a value outside that range
//! invalidates the whole tier and the cascade continues. Callers treat total
//! failure as "no update", never as zero scores.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum distinct dimensions the prose scan must recognize.
const MIN_PROSE_DIMENSIONS: usize = 3;

/// Which tier produced a result. Persisted in audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParseMethod {
    JsonFence,
    RawJson,
    /// Prose line scan (tier 3).
    Regex,
}

/// A parsed payload tagged by the tier that produced it, so callers can
/// never confuse "scanned from prose" with "model returned the schema".
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    Fenced(T),
    Raw(T),
    Scanned(T),
}

impl<T> Extracted<T> {
    pub fn method(&self) -> ParseMethod {
        match self {
            Extracted::Fenced(_) => ParseMethod::JsonFence,
            Extracted::Raw(_) => ParseMethod::RawJson,
            Extracted::Scanned(_) => ParseMethod::Regex,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Extracted::Fenced(v) | Extracted::Raw(v) | Extracted::Scanned(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("no JSON object found in model reply")]
    NoJson,

    #[error("malformed JSON from model: {0}")]
    Json(String),

    #[error("{label} score {value} is outside 1-10")]
    OutOfRange { label: String, value: f64 },

    #[error("prose scan recognized {found} scored dimensions, need {required}")]
    TooFewDimensions { found: usize, required: usize },

    #[error("model reply contained no scores")]
    NoScores,
}

/// Scores recovered from one reviewer reply, before provenance is attached.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreSheet {
    pub overall_score: Option<f64>,
    pub dimensions: BTreeMap<String, f64>,
    pub top_strength: Option<String>,
    pub top_weakness: Option<String>,
}

impl ScoreSheet {
    /// Explicit overall when captured, otherwise the mean of the dimensions.
    pub fn overall(&self) -> Option<f64> {
        self.overall_score.or_else(|| {
            if self.dimensions.is_empty() {
                None
            } else {
                Some(self.dimensions.values().sum::<f64>() / self.dimensions.len() as f64)
            }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Structured payloads (tiers 1-2)
// ─────────────────────────────────────────────────────────────────────────

/// Parse a JSON payload of shape `T` from a model reply. Used for
/// recommendation envelopes and factual-refresh payloads, which are
/// inherently structured, so the prose tier never applies.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<Extracted<T>, ParseError> {
    let mut first_err: Option<ParseError> = None;

    if let Some(block) = fenced_json(raw) {
        match serde_json::from_str::<T>(block) {
            Ok(value) => return Ok(Extracted::Fenced(value)),
            Err(e) => first_err = Some(ParseError::Json(e.to_string())),
        }
    }

    if let Some(span) = raw_json_span(raw) {
        match serde_json::from_str::<T>(span) {
            Ok(value) => return Ok(Extracted::Raw(value)),
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(ParseError::Json(e.to_string()));
                }
            }
        }
    }

    Err(first_err.unwrap_or(ParseError::NoJson))
}

// ─────────────────────────────────────────────────────────────────────────
// Score sheets (all three tiers)
// ─────────────────────────────────────────────────────────────────────────

/// Parse an audit score sheet. `recognized` is the closed set of dimension
/// names the prose tier may accept; JSON tiers keep whatever dimensions the
/// model returned (range-checked).
pub fn parse_scores(raw: &str, recognized: &[&str]) -> Result<Extracted<ScoreSheet>, ParseError> {
    let mut first_err: Option<ParseError> = None;

    if let Some(block) = fenced_json(raw) {
        match sheet_from_json(block) {
            Ok(sheet) => return Ok(Extracted::Fenced(sheet)),
            Err(e) => first_err = Some(e),
        }
    }

    if let Some(span) = raw_json_span(raw) {
        match sheet_from_json(span) {
            Ok(sheet) => return Ok(Extracted::Raw(sheet)),
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
    }

    match scan_prose(raw, recognized) {
        Ok(sheet) => Ok(Extracted::Scanned(sheet)),
        Err(e) => Err(first_err.unwrap_or(e)),
    }
}

fn sheet_from_json(text: &str) -> Result<ScoreSheet, ParseError> {
    let sheet: ScoreSheet =
        serde_json::from_str(text).map_err(|e| ParseError::Json(e.to_string()))?;
    validate_sheet(&sheet)?;
    Ok(sheet)
}

fn validate_sheet(sheet: &ScoreSheet) -> Result<(), ParseError> {
    if let Some(value) = sheet.overall_score {
        check_range("overall", value)?;
    }
    for (label, value) in &sheet.dimensions {
        check_range(label, *value)?;
    }
    if sheet.overall().is_none() {
        return Err(ParseError::NoScores);
    }
    Ok(())
}

fn check_range(label: &str, value: f64) -> Result<(), ParseError> {
    if (1.0..=10.0).contains(&value) {
        Ok(())
    } else {
        Err(ParseError::OutOfRange {
            label: label.to_string(),
            value,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Tier helpers
// ─────────────────────────────────────────────────────────────────────────

/// Body of the first code fence tagged `json`, if any.
fn fenced_json(text: &str) -> Option<&str> {
    let start = text.find("```json")?;
    let body = &text[start + "```json".len()..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Widest `{`..`}` span in the text.
fn raw_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Tier 3: scan prose lines for `<Dimension>: <number>(/10 | out of 10)?`.
/// Only labels in `recognized` count as dimensions; `overall` is captured
/// separately when present. First occurrence of a label wins.
fn scan_prose(raw: &str, recognized: &[&str]) -> Result<ScoreSheet, ParseError> {
    let mut dimensions: BTreeMap<String, f64> = BTreeMap::new();
    let mut overall: Option<f64> = None;

    for line in raw.lines() {
        let Some((label, rest)) = line.split_once(':') else {
            continue;
        };
        let label = clean_label(label);
        let Some(value) = leading_number(rest) else {
            continue;
        };

        if label == "overall" || label == "overall score" {
            check_range("overall", value)?;
            if overall.is_none() {
                overall = Some(value);
            }
        } else if let Some(dim) = recognized.iter().find(|d| d.eq_ignore_ascii_case(&label)) {
            check_range(dim, value)?;
            dimensions.entry(dim.to_string()).or_insert(value);
        }
    }

    if dimensions.len() < MIN_PROSE_DIMENSIONS {
        return Err(ParseError::TooFewDimensions {
            found: dimensions.len(),
            required: MIN_PROSE_DIMENSIONS,
        });
    }

    Ok(ScoreSheet {
        overall_score: overall,
        dimensions,
        top_strength: None,
        top_weakness: None,
    })
}

/// Strip list markers and markdown emphasis from a candidate label, then
/// lowercase it. `"- **Accuracy**"` → `"accuracy"`, `"3. Clarity"` →
/// `"clarity"`.
fn clean_label(label: &str) -> String {
    let mut s = label
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '#' | '>' | '•') || c.is_whitespace());
    // Numbered list prefix: digits followed by `.` or `)`.
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = s[digits..].strip_prefix(['.', ')']) {
            s = rest;
        }
    }
    s.trim_matches(|c: char| c == '*' || c.is_whitespace())
        .to_lowercase()
}

/// First numeric token after the colon, if the value starts with one.
fn leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start_matches(|c: char| c == '*' || c.is_whitespace());
    let token: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if token.is_empty() {
        return None;
    }
    token.parse().ok()
}
