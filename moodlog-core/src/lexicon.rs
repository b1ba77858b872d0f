//! Lexicon: the keyword data that drives the fallback analyzer
//!
//! Everything tunable about the heuristic lives here as plain data:
//! - ordered mood rules (first match wins) with their summary templates
//! - positive / negative score words and the per-hit step
//! - tag keyword groups
//! - mood aliases used to normalize labels returned by the analysis service
//!
//! A lexicon can be loaded from TOML; any section left out keeps its default.

use config::{Config, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Mood;

/// Placeholder in summary templates replaced by the first sentence of the text.
pub const FRAGMENT_PLACEHOLDER: &str = "{fragment}";

#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("Failed to load lexicon: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid lexicon: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodRule {
    pub mood: Mood,
    pub triggers: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRule {
    pub tag: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodAlias {
    pub label: String,
    pub mood: Mood,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    pub moods: Vec<MoodRule>,
    pub default_summary: String,
    pub positive_words: Vec<String>,
    pub negative_words: Vec<String>,
    pub score_step: f32,
    pub tags: Vec<TagRule>,
    pub aliases: Vec<MoodAlias>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn rule(mood: Mood, triggers: &[&str], summary: &str) -> MoodRule {
    MoodRule {
        mood,
        triggers: words(triggers),
        summary: summary.to_string(),
    }
}

fn tag(tag: &str, keywords: &[&str]) -> TagRule {
    TagRule {
        tag: tag.to_string(),
        keywords: words(keywords),
    }
}

fn alias(label: &str, mood: Mood) -> MoodAlias {
    MoodAlias {
        label: label.to_string(),
        mood,
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            moods: vec![
                rule(
                    Mood::Joyful,
                    &[
                        "happy", "joy", "excited", "amazing", "wonderful", "great", "love",
                        "perfect", "fantastic",
                    ],
                    "Sharing positive experiences and joyful moments from their day",
                ),
                rule(
                    Mood::Frustrated,
                    &[
                        "angry",
                        "furious",
                        "mad",
                        "frustrated",
                        "annoyed",
                        "irritated",
                        "passive-aggressive",
                        "took credit",
                        "exhausting",
                        "unfair",
                    ],
                    "Expressing frustration about a challenging situation involving {fragment}",
                ),
                rule(
                    Mood::Nervous,
                    &[
                        "nervous", "worried", "anxious", "scared", "afraid", "imposter",
                        "interview", "overwhelmed", "stress",
                    ],
                    "Feeling anxious and nervous about upcoming challenges or self-doubt",
                ),
                rule(
                    Mood::Lonely,
                    &[
                        "sad", "lonely", "depressed", "empty", "hurt", "crying", "invisible",
                        "nobody",
                    ],
                    "Processing feelings of loneliness and emotional isolation",
                ),
                rule(
                    Mood::Peaceful,
                    &[
                        "peaceful", "calm", "content", "relaxed", "yoga", "meditation", "quiet",
                        "serene",
                    ],
                    "Reflecting on moments of peace and tranquility in their life",
                ),
                rule(
                    Mood::Inspired,
                    &[
                        "inspired", "motivated", "hopeful", "passionate", "determined", "goal",
                    ],
                    "Feeling motivated and inspired by recent experiences or realizations",
                ),
            ],
            default_summary: "Deep reflection on personal thoughts and life experiences"
                .to_string(),
            positive_words: words(&[
                "happy", "joy", "excited", "grateful", "amazing", "wonderful", "great", "love",
                "excellent", "fantastic",
            ]),
            negative_words: words(&[
                "sad",
                "angry",
                "frustrated",
                "terrible",
                "awful",
                "hate",
                "disappointed",
                "worried",
                "stressed",
                "anxious",
            ]),
            score_step: 0.1,
            tags: vec![
                tag("work", &["work", "job", "office", "career", "boss", "coworker"]),
                tag("family", &["family", "parent", "mom", "dad", "sister", "brother"]),
                tag("relationships", &["friend", "social", "partner", "relationship"]),
                tag("health", &["health", "exercise", "workout", "gym", "doctor", "sleep"]),
                tag("travel", &["travel", "vacation", "trip", "flight"]),
                tag(
                    "creativity",
                    &["creative", "painting", "drawing", "music", "writing", "poem"],
                ),
                tag(
                    "mental-health",
                    &["therapy", "therapist", "meditation", "anxiety", "mental health"],
                ),
                tag("gratitude", &["grateful", "thankful", "gratitude", "blessed"]),
            ],
            aliases: vec![
                alias("happy", Mood::Joyful),
                alias("joy", Mood::Joyful),
                alias("excited", Mood::Joyful),
                alias("grateful", Mood::Joyful),
                alias("positive", Mood::Joyful),
                alias("angry", Mood::Frustrated),
                alias("annoyed", Mood::Frustrated),
                alias("irritated", Mood::Frustrated),
                alias("anxious", Mood::Nervous),
                alias("worried", Mood::Nervous),
                alias("stressed", Mood::Nervous),
                alias("scared", Mood::Nervous),
                alias("sad", Mood::Lonely),
                alias("depressed", Mood::Lonely),
                alias("negative", Mood::Lonely),
                alias("calm", Mood::Peaceful),
                alias("content", Mood::Peaceful),
                alias("relaxed", Mood::Peaceful),
                alias("hopeful", Mood::Inspired),
                alias("motivated", Mood::Inspired),
                alias("determined", Mood::Inspired),
                alias("neutral", Mood::Reflective),
                alias("thoughtful", Mood::Reflective),
                alias("confused", Mood::Reflective),
            ],
        }
    }
}

impl Lexicon {
    /// Load a lexicon from a TOML file, then lower-case and validate it.
    pub fn load(path: &str) -> Result<Self, LexiconError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        let lexicon: Lexicon = s.try_deserialize()?;
        let lexicon = lexicon.normalized();
        lexicon.validate()?;
        Ok(lexicon)
    }

    /// Lower-case every keyword so matching can run against lower-cased text.
    pub fn normalized(mut self) -> Self {
        let lower = |list: &mut Vec<String>| {
            for w in list.iter_mut() {
                *w = w.trim().to_lowercase();
            }
            list.retain(|w| !w.is_empty());
        };

        for r in &mut self.moods {
            lower(&mut r.triggers);
        }
        for t in &mut self.tags {
            lower(&mut t.keywords);
            t.tag = t.tag.trim().to_lowercase();
        }
        lower(&mut self.positive_words);
        lower(&mut self.negative_words);
        for a in &mut self.aliases {
            a.label = a.label.trim().to_lowercase();
        }
        self
    }

    pub fn validate(&self) -> Result<(), LexiconError> {
        if !(self.score_step > 0.0 && self.score_step <= 1.0) {
            return Err(LexiconError::Invalid(format!(
                "score_step must be in (0, 1], got {}",
                self.score_step
            )));
        }
        if self.default_summary.trim().is_empty() {
            return Err(LexiconError::Invalid("default_summary is empty".to_string()));
        }
        for r in &self.moods {
            if r.triggers.is_empty() {
                return Err(LexiconError::Invalid(format!(
                    "mood rule {} has no triggers",
                    r.mood
                )));
            }
            if r.summary.trim().is_empty() {
                return Err(LexiconError::Invalid(format!(
                    "mood rule {} has an empty summary template",
                    r.mood
                )));
            }
        }
        for t in &self.tags {
            if t.tag.is_empty() || t.keywords.is_empty() {
                return Err(LexiconError::Invalid(format!(
                    "tag rule '{}' needs a name and at least one keyword",
                    t.tag
                )));
            }
        }
        Ok(())
    }

    /// Map a free-form label onto the vocabulary: exact label first, then aliases.
    pub fn resolve_mood(&self, label: &str) -> Option<Mood> {
        if let Ok(mood) = label.parse::<Mood>() {
            return Some(mood);
        }
        let needle = label.trim().to_lowercase();
        self.aliases
            .iter()
            .find(|a| a.label == needle)
            .map(|a| a.mood)
    }

    /// Summary template for a mood; the default template when no rule names it.
    pub fn template_for(&self, mood: Mood) -> &str {
        self.moods
            .iter()
            .find(|r| r.mood == mood)
            .map(|r| r.summary.as_str())
            .unwrap_or(&self.default_summary)
    }
}
