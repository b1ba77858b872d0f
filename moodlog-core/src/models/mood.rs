use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed mood vocabulary. Every analysis result carries exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mood {
    Joyful,
    Frustrated,
    Nervous,
    Lonely,
    Peaceful,
    Inspired,
    Reflective,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Joyful,
        Mood::Frustrated,
        Mood::Nervous,
        Mood::Lonely,
        Mood::Peaceful,
        Mood::Inspired,
        Mood::Reflective,
    ];

    /// The mood used when nothing else matches.
    pub fn neutral() -> Self {
        Mood::Reflective
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Joyful => "Joyful",
            Mood::Frustrated => "Frustrated",
            Mood::Nervous => "Nervous",
            Mood::Lonely => "Lonely",
            Mood::Peaceful => "Peaceful",
            Mood::Inspired => "Inspired",
            Mood::Reflective => "Reflective",
        }
    }
}

impl Default for Mood {
    fn default() -> Self {
        Mood::neutral()
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown mood label '{0}'")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    /// Exact vocabulary match, ignoring case and surrounding whitespace.
    /// Synonyms ("happy", "anxious", ...) are resolved by the lexicon, not here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Mood::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}
