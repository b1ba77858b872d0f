//! Defensive parsing of analysis-service responses
//!
//! The service is asked for a single JSON object:
//!
//! ```json
//! { "mood": "Joyful", "moodScore": 0.8, "summary": "...", "tags": ["work"] }
//! ```
//!
//! What comes back is model output, so parsing tolerates code fences, prose
//! around the object, raw newlines inside strings, `mood_score` / `keywords`
//! field aliases, 0–100 scores and comma-separated tag strings. Anything that
//! still lacks a usable mood and summary is a `ResponseShapeError`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::lexicon::Lexicon;
use crate::models::{analysis::normalize_tags, clamp_score, Mood};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(.*?)\s*```").expect("code fence regex is valid")
});

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseShapeError {
    #[error("Response is empty")]
    Empty,

    #[error("Response is not valid JSON: {0}")]
    Json(String),

    #[error("Response JSON is not an object")]
    NotAnObject,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Mood '{0}' is outside the vocabulary")]
    UnknownMood(String),
}

/// Validated fields extracted from a service response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnalysis {
    pub mood: Mood,
    pub summary: String,
    pub mood_score: Option<f32>,
    pub tags: Vec<String>,
}

pub fn parse_analysis_response(
    raw: &str,
    lexicon: &Lexicon,
) -> Result<ParsedAnalysis, ResponseShapeError> {
    let obj = extract_object(raw)?;

    let mood_label = obj
        .get("mood")
        .and_then(Value::as_str)
        .ok_or(ResponseShapeError::MissingField("mood"))?;
    let mood = normalize_mood(mood_label, lexicon)?;

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
        .ok_or(ResponseShapeError::MissingField("summary"))?;

    let mood_score = obj
        .get("moodScore")
        .or_else(|| obj.get("mood_score"))
        .and_then(score_value);

    let tags = obj
        .get("tags")
        .or_else(|| obj.get("keywords"))
        .map(tag_values)
        .unwrap_or_default();

    Ok(ParsedAnalysis {
        mood,
        summary,
        mood_score,
        tags,
    })
}

/// Case-fold and trim a label, then resolve it against the vocabulary and aliases.
pub fn normalize_mood(label: &str, lexicon: &Lexicon) -> Result<Mood, ResponseShapeError> {
    let cleaned = label.trim_matches(|c: char| !c.is_alphanumeric());
    lexicon
        .resolve_mood(cleaned)
        .ok_or_else(|| ResponseShapeError::UnknownMood(label.trim().to_string()))
}

fn extract_object(raw: &str) -> Result<Map<String, Value>, ResponseShapeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ResponseShapeError::Empty);
    }

    let unfenced = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    // Whitespace between JSON tokens is insignificant, so flattening line breaks
    // keeps valid documents valid and rescues multi-line string values.
    let flat: String = unfenced
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect();

    let value = match serde_json::from_str::<Value>(&flat) {
        Ok(v) => v,
        Err(first_err) => {
            let start = flat.find('{');
            let end = flat.rfind('}');
            match (start, end) {
                (Some(s), Some(e)) if s < e => serde_json::from_str::<Value>(&flat[s..=e])
                    .map_err(|e| ResponseShapeError::Json(e.to_string()))?,
                _ => return Err(ResponseShapeError::Json(first_err.to_string())),
            }
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ResponseShapeError::NotAnObject),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Accepts numbers or numeric strings. Values are clamped to 0–1, except
/// percentages ("85%") and whole numbers from 2 to 100, which are rescaled.
fn score_value(v: &Value) -> Option<f32> {
    let (n, percent) = match v {
        Value::Number(n) => (n.as_f64()?, false),
        Value::String(s) => match s.trim().strip_suffix('%') {
            Some(p) => (p.trim().parse::<f64>().ok()?, true),
            None => (s.trim().parse::<f64>().ok()?, false),
        },
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    let whole_percent = n.fract() == 0.0 && (2.0..=100.0).contains(&n);
    let n = if percent || whole_percent { n / 100.0 } else { n };
    Some(clamp_score(n as f32))
}

fn tag_values(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => normalize_tags(items.iter().filter_map(Value::as_str)),
        Value::String(s) => normalize_tags(s.split(',')),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<ParsedAnalysis, ResponseShapeError> {
        parse_analysis_response(raw, &Lexicon::default())
    }

    #[test]
    fn test_parses_canonical_schema() {
        let parsed = parse(
            r#"{"mood":"Peaceful","moodScore":0.72,"summary":"A slow Sunday.","tags":["Family","rest"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.mood, Mood::Peaceful);
        assert_eq!(parsed.summary, "A slow Sunday.");
        assert_eq!(parsed.mood_score, Some(0.72));
        assert_eq!(parsed.tags, vec!["family".to_string(), "rest".to_string()]);
    }

    #[test]
    fn test_strips_code_fence_and_accepts_aliases() {
        let raw = "```json\n{\n  \"mood\": \"happy\",\n  \"mood_score\": 85,\n  \"summary\": \"Got the job.\",\n  \"keywords\": [\"job\", \"career\"]\n}\n```";
        let parsed = parse(raw).unwrap();
        assert_eq!(parsed.mood, Mood::Joyful);
        assert_eq!(parsed.mood_score, Some(0.85));
        assert_eq!(parsed.tags, vec!["career".to_string(), "job".to_string()]);
    }

    #[test]
    fn test_tolerates_prose_and_multiline_summary() {
        let raw = "Here is the analysis:\n{\"mood\": \"Nervous\", \"summary\": \"Big interview\ntomorrow,\n  feeling unprepared.\"}\nHope this helps!";
        let parsed = parse(raw).unwrap();
        assert_eq!(parsed.mood, Mood::Nervous);
        assert_eq!(parsed.summary, "Big interview tomorrow, feeling unprepared.");
        assert_eq!(parsed.mood_score, None);
        assert!(parsed.tags.is_empty());
    }

    #[test]
    fn test_comma_separated_tags_and_string_score() {
        let parsed = parse(
            r#"{"mood":"inspired","moodScore":"0.9","summary":"New project","tags":"art, Music ,art"}"#,
        )
        .unwrap();
        assert_eq!(parsed.mood, Mood::Inspired);
        assert_eq!(parsed.mood_score, Some(0.9));
        assert_eq!(parsed.tags, vec!["art".to_string(), "music".to_string()]);
    }

    #[test]
    fn test_score_is_clamped() {
        let parsed = parse(r#"{"mood":"Lonely","moodScore":-3,"summary":"x"}"#).unwrap();
        assert_eq!(parsed.mood_score, Some(0.0));
        let parsed = parse(r#"{"mood":"Joyful","moodScore":250,"summary":"x"}"#).unwrap();
        assert_eq!(parsed.mood_score, Some(1.0));
    }

    #[test]
    fn test_fractional_score_above_one_is_clamped_not_rescaled() {
        let parsed = parse(r#"{"mood":"Joyful","moodScore":1.5,"summary":"ecstatic day"}"#).unwrap();
        assert_eq!(parsed.mood_score, Some(1.0));
        let parsed = parse(r#"{"mood":"Joyful","moodScore":1,"summary":"x"}"#).unwrap();
        assert_eq!(parsed.mood_score, Some(1.0));
    }

    #[test]
    fn test_percentage_scores_are_rescaled() {
        let parsed = parse(r#"{"mood":"Peaceful","moodScore":"40%","summary":"x"}"#).unwrap();
        assert_eq!(parsed.mood_score, Some(0.4));
        let parsed = parse(r#"{"mood":"Peaceful","moodScore":"1.5%","summary":"x"}"#).unwrap();
        assert_eq!(parsed.mood_score, Some(0.015));
        let parsed = parse(r#"{"mood":"Peaceful","moodScore":60,"summary":"x"}"#).unwrap();
        assert_eq!(parsed.mood_score, Some(0.6));
    }

    #[test]
    fn test_mood_label_punctuation_is_trimmed() {
        let parsed = parse(r#"{"mood":" Frustrated. ","summary":"Traffic"}"#).unwrap();
        assert_eq!(parsed.mood, Mood::Frustrated);
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(parse("   "), Err(ResponseShapeError::Empty));
        assert!(matches!(parse("not json at all"), Err(ResponseShapeError::Json(_))));
        assert_eq!(parse("[1,2,3]"), Err(ResponseShapeError::NotAnObject));
        assert_eq!(
            parse(r#"{"summary":"no mood"}"#),
            Err(ResponseShapeError::MissingField("mood"))
        );
        assert_eq!(
            parse(r#"{"mood":"Joyful","summary":"   "}"#),
            Err(ResponseShapeError::MissingField("summary"))
        );
        assert_eq!(
            parse(r#"{"mood":"Bewildered","summary":"hm"}"#),
            Err(ResponseShapeError::UnknownMood("Bewildered".to_string()))
        );
    }
}
