use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::analysis::{AnalysisInput, AnalysisResult, AnalysisSource};
use super::mood::Mood;

/// A stored diary entry. Immutable once the store has assigned `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub owner_id: String,
    pub title: Option<String>,
    pub raw_text: String,
    pub mood: Mood,
    pub mood_score: Option<f32>,
    pub summary: String,
    pub tags: Vec<String>,
    pub source: AnalysisSource,
    pub created_at: DateTime<Utc>,
}

/// An analyzed submission waiting for the store to assign identity and time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub owner_id: String,
    pub title: Option<String>,
    pub raw_text: String,
    pub mood: Mood,
    pub mood_score: Option<f32>,
    pub summary: String,
    pub tags: Vec<String>,
    pub source: AnalysisSource,
}

impl NewEntry {
    pub fn from_analysis(
        owner_id: impl Into<String>,
        input: AnalysisInput,
        analysis: AnalysisResult,
    ) -> Self {
        let title = input
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            owner_id: owner_id.into(),
            title,
            raw_text: input.text.trim().to_string(),
            mood: analysis.mood,
            mood_score: analysis.mood_score,
            summary: analysis.summary,
            tags: analysis.tags,
            source: analysis.source,
        }
    }

    /// Stamp identity and creation time.
    pub fn into_entry(self, id: Uuid, created_at: DateTime<Utc>) -> JournalEntry {
        JournalEntry {
            id,
            owner_id: self.owner_id,
            title: self.title,
            raw_text: self.raw_text,
            mood: self.mood,
            mood_score: self.mood_score,
            summary: self.summary,
            tags: self.tags,
            source: self.source,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_analysis_trims_text_and_drops_blank_title() {
        let input = AnalysisInput::new("  Went for a run.  ").with_title("  ");
        let analysis = AnalysisResult {
            mood: Mood::Peaceful,
            summary: "A run".to_string(),
            mood_score: Some(0.6),
            tags: vec!["health".to_string()],
            source: AnalysisSource::External,
        };

        let entry = NewEntry::from_analysis("user-1", input, analysis);
        assert_eq!(entry.raw_text, "Went for a run.");
        assert!(entry.title.is_none());
        assert_eq!(entry.owner_id, "user-1");
        assert_eq!(entry.source, AnalysisSource::External);

        let id = Uuid::new_v4();
        let now = Utc::now();
        let stored = entry.into_entry(id, now);
        assert_eq!(stored.id, id);
        assert_eq!(stored.created_at, now);
        assert_eq!(stored.mood, Mood::Peaceful);
    }
}
