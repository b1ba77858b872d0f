use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mood::Mood;

/// Neutral baseline for mood scores.
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Which path of the pipeline produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    External,
    Fallback,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::External => "external",
            AnalysisSource::Fallback => "fallback",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown analysis source '{0}'")]
pub struct UnknownSource(pub String);

impl std::str::FromStr for AnalysisSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(AnalysisSource::External),
            "fallback" => Ok(AnalysisSource::Fallback),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// Raw text submitted for analysis. The title only feeds scoring and tagging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisInput {
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
}

impl AnalysisInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            title: None,
            text: text.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Body and title joined for keyword scans.
    pub fn combined(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => format!("{} {}", self.text, t),
            _ => self.text.clone(),
        }
    }
}

/// Normalized output of the inference pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub mood: Mood,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_score: Option<f32>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: AnalysisSource,
}

/// Clamp a score into [0, 1]. NaN collapses to the neutral baseline.
pub fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        NEUTRAL_SCORE
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Trim, lower-case, dedupe and sort a tag list.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(-0.3), 0.0);
        assert_eq!(clamp_score(1.7), 1.0);
        assert_eq!(clamp_score(0.42), 0.42);
        assert_eq!(clamp_score(f32::NAN), NEUTRAL_SCORE);
    }

    #[test]
    fn test_source_parses_stored_labels() {
        assert_eq!("external".parse::<AnalysisSource>(), Ok(AnalysisSource::External));
        assert_eq!("fallback".parse::<AnalysisSource>(), Ok(AnalysisSource::Fallback));
        let err = "gemini".parse::<AnalysisSource>().unwrap_err();
        assert_eq!(err, UnknownSource("gemini".to_string()));
        assert_eq!(err.to_string(), "unknown analysis source 'gemini'");
    }

    #[test]
    fn test_normalize_tags_dedupes_and_sorts() {
        let tags = normalize_tags(["Work", " family ", "work", ""]);
        assert_eq!(tags, vec!["family".to_string(), "work".to_string()]);
    }

    #[test]
    fn test_result_serializes_camel_case_with_source() {
        let result = AnalysisResult {
            mood: Mood::Peaceful,
            summary: "A quiet evening".to_string(),
            mood_score: Some(0.7),
            tags: vec!["health".to_string()],
            source: AnalysisSource::Fallback,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mood"], "Peaceful");
        assert_eq!(json["source"], "fallback");
        assert!(json["moodScore"].is_number());
        assert!(json.get("mood_score").is_none());
    }

    #[test]
    fn test_combined_ignores_blank_title() {
        let input = AnalysisInput::new("body text").with_title("   ");
        assert_eq!(input.combined(), "body text");

        let input = AnalysisInput::new("body text").with_title("Great day");
        assert_eq!(input.combined(), "body text Great day");
    }
}
