//! Fallback analyzer: deterministic, network-free mood heuristics
//!
//! Total and pure: every input (including the empty string) yields a complete
//! `AnalysisResult`. All checks are independent substring scans over the
//! lower-cased text, so cost is linear in the text length per keyword.

use std::sync::Arc;

use crate::lexicon::{Lexicon, FRAGMENT_PLACEHOLDER};
use crate::models::{
    analysis::normalize_tags, clamp_score, AnalysisInput, AnalysisResult, AnalysisSource, Mood,
    NEUTRAL_SCORE,
};

/// Character budget for summaries built from the raw text.
pub const SUMMARY_CHAR_BUDGET: usize = 100;

#[derive(Debug, Clone)]
pub struct FallbackAnalyzer {
    lexicon: Arc<Lexicon>,
}

impl Default for FallbackAnalyzer {
    fn default() -> Self {
        Self::new(Lexicon::default())
    }
}

impl FallbackAnalyzer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self {
            lexicon: Arc::new(lexicon.normalized()),
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn analyze(&self, text: &str) -> AnalysisResult {
        self.analyze_input(&AnalysisInput::new(text))
    }

    pub fn analyze_input(&self, input: &AnalysisInput) -> AnalysisResult {
        let haystack = input.combined().to_lowercase();

        let mood = self.classify(&haystack);
        let mood_score = self.score(&haystack);
        let summary = self.summarize(mood, &input.text);
        let tags = self.tags(&haystack);

        AnalysisResult {
            mood,
            summary,
            mood_score: Some(mood_score),
            tags,
            source: AnalysisSource::Fallback,
        }
    }

    /// First rule with any trigger present wins.
    fn classify(&self, lowered: &str) -> Mood {
        self.lexicon
            .moods
            .iter()
            .find(|r| r.triggers.iter().any(|t| lowered.contains(t.as_str())))
            .map(|r| r.mood)
            .unwrap_or_else(Mood::neutral)
    }

    fn score(&self, lowered: &str) -> f32 {
        let mut positive = 0u32;
        let mut negative = 0u32;

        for token in lowered.split_whitespace() {
            if self
                .lexicon
                .positive_words
                .iter()
                .any(|w| token.contains(w.as_str()))
            {
                positive += 1;
            }
            if self
                .lexicon
                .negative_words
                .iter()
                .any(|w| token.contains(w.as_str()))
            {
                negative += 1;
            }
        }

        let step = self.lexicon.score_step;
        clamp_score(NEUTRAL_SCORE + step * positive as f32 - step * negative as f32)
    }

    fn summarize(&self, mood: Mood, text: &str) -> String {
        let template = self.lexicon.template_for(mood);
        let rendered = if template.contains(FRAGMENT_PLACEHOLDER) {
            template.replace(FRAGMENT_PLACEHOLDER, &first_sentence(text))
        } else {
            template.to_string()
        };

        let rendered = rendered.trim();
        if !rendered.is_empty() {
            return rendered.to_string();
        }

        let truncated = truncate_chars(text.trim(), SUMMARY_CHAR_BUDGET);
        if !truncated.is_empty() {
            return truncated;
        }

        self.lexicon.default_summary.clone()
    }

    fn tags(&self, lowered: &str) -> Vec<String> {
        normalize_tags(
            self.lexicon
                .tags
                .iter()
                .filter(|t| t.keywords.iter().any(|k| lowered.contains(k.as_str())))
                .map(|t| t.tag.as_str()),
        )
    }
}

/// Analyze with the built-in lexicon.
pub fn fallback_analyze(text: &str) -> AnalysisResult {
    FallbackAnalyzer::default().analyze(text)
}

/// Lower-cased first sentence, capped at the summary budget.
fn first_sentence(text: &str) -> String {
    let trimmed = text.trim();
    let sentence = trimmed.split('.').next().unwrap_or("").trim();
    let sentence = if sentence.is_empty() { trimmed } else { sentence };
    sentence
        .to_lowercase()
        .chars()
        .take(SUMMARY_CHAR_BUDGET)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Truncate on a char boundary, appending "..." when anything was cut.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut out: String = text.chars().take(budget).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::MoodRule;

    #[test]
    fn test_joyful_scenario() {
        let r = fallback_analyze("I just got the job, I'm so happy and excited!");
        assert_eq!(r.mood, Mood::Joyful);
        assert_eq!(r.source, AnalysisSource::Fallback);
        assert!(r.mood_score.unwrap() > NEUTRAL_SCORE);
        assert!(r.tags.contains(&"work".to_string()));
    }

    #[test]
    fn test_frustrated_scenario_interpolates_first_sentence() {
        let r = fallback_analyze(
            "My coworker took credit for my work and it's so unfair, I'm furious",
        );
        assert_eq!(r.mood, Mood::Frustrated);
        assert!(
            r.summary.ends_with("my coworker took credit for my work and it's so unfair, i'm furious"),
            "unexpected summary: {}",
            r.summary
        );
    }

    #[test]
    fn test_nervous_scenario() {
        let r = fallback_analyze(
            "I have an interview tomorrow and feel like such an imposter, very anxious",
        );
        assert_eq!(r.mood, Mood::Nervous);
        assert_eq!(
            r.summary,
            "Feeling anxious and nervous about upcoming challenges or self-doubt"
        );
        assert!(r.mood_score.unwrap() < NEUTRAL_SCORE);
    }

    #[test]
    fn test_empty_text_yields_neutral_default() {
        let r = fallback_analyze("");
        assert_eq!(r.mood, Mood::Reflective);
        assert_eq!(r.mood_score, Some(NEUTRAL_SCORE));
        assert!(!r.summary.is_empty());
        assert!(r.tags.is_empty());
    }

    #[test]
    fn test_priority_order_first_match_wins() {
        // Joyful is checked before Nervous.
        let r = fallback_analyze("I'm happy about the move but worried about money");
        assert_eq!(r.mood, Mood::Joyful);
    }

    #[test]
    fn test_deterministic() {
        let text = "Calm morning, yoga and tea. Grateful for my family.";
        assert_eq!(fallback_analyze(text), fallback_analyze(text));
    }

    #[test]
    fn test_score_clamps_at_both_ends() {
        let joy = "happy ".repeat(50);
        assert_eq!(fallback_analyze(&joy).mood_score, Some(1.0));

        let gloom = "awful ".repeat(50);
        assert_eq!(fallback_analyze(&gloom).mood_score, Some(0.0));
    }

    #[test]
    fn test_positive_without_negative_never_below_neutral() {
        for text in ["a wonderful walk", "LOVE this", "fantastic!!!", "grateful today"] {
            let score = fallback_analyze(text).mood_score.unwrap();
            assert!(score >= NEUTRAL_SCORE, "{text}: {score}");
        }
    }

    #[test]
    fn test_title_counts_towards_score_and_tags() {
        let analyzer = FallbackAnalyzer::default();
        let plain = analyzer.analyze("Spent the afternoon outside.");
        let titled = analyzer.analyze_input(
            &AnalysisInput::new("Spent the afternoon outside.").with_title("Great trip"),
        );
        assert!(titled.mood_score.unwrap() > plain.mood_score.unwrap());
        assert!(titled.tags.contains(&"travel".to_string()));
    }

    #[test]
    fn test_tags_deduped_and_sorted() {
        let r = fallback_analyze("Work at the office, then gym, then my job again. Thankful.");
        assert_eq!(
            r.tags,
            vec!["gratitude".to_string(), "health".to_string(), "work".to_string()]
        );
    }

    #[test]
    fn test_custom_lexicon_changes_policy_without_code() {
        let mut lexicon = Lexicon::default();
        lexicon.moods.insert(
            0,
            MoodRule {
                mood: Mood::Inspired,
                triggers: vec!["Sunrise".to_string()],
                summary: "Starting fresh".to_string(),
            },
        );
        let analyzer = FallbackAnalyzer::new(lexicon);
        let r = analyzer.analyze("Watched the sunrise, so happy");
        assert_eq!(r.mood, Mood::Inspired);
        assert_eq!(r.summary, "Starting fresh");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        let long = "é".repeat(120);
        let cut = truncate_chars(&long, SUMMARY_CHAR_BUDGET);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), SUMMARY_CHAR_BUDGET + 3);
    }

    #[test]
    fn test_long_text_stays_well_formed() {
        let text = "nothing in particular ".repeat(10_000);
        let r = fallback_analyze(&text);
        assert_eq!(r.mood, Mood::Reflective);
        assert!(!r.summary.is_empty());
    }
}
