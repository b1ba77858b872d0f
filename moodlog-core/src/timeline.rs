//! Timeline filtering and aggregate mood statistics

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{JournalEntry, Mood};

/// Number of tags reported in `MoodStats::top_tags`.
pub const TOP_TAGS: usize = 5;

/// Conjunctive entry filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryFilter {
    pub mood: Option<Mood>,
    pub tag: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive substring over text, title and summary.
    pub query: Option<String>,
}

impl EntryFilter {
    pub fn is_empty(&self) -> bool {
        *self == EntryFilter::default()
    }

    pub fn matches(&self, entry: &JournalEntry) -> bool {
        if let Some(mood) = self.mood {
            if entry.mood != mood {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            let tag = tag.trim().to_lowercase();
            if !entry.tags.iter().any(|t| *t == tag) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.created_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.created_at > until {
                return false;
            }
        }
        if let Some(q) = &self.query {
            let q = q.trim().to_lowercase();
            if !q.is_empty() {
                let hit = entry.raw_text.to_lowercase().contains(&q)
                    || entry.summary.to_lowercase().contains(&q)
                    || entry
                        .title
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&q));
                if !hit {
                    return false;
                }
            }
        }
        true
    }

    /// Keep matching entries, preserving order.
    pub fn apply(&self, entries: Vec<JournalEntry>) -> Vec<JournalEntry> {
        if self.is_empty() {
            return entries;
        }
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodStats {
    pub total: usize,
    pub by_mood: BTreeMap<Mood, usize>,
    pub average_score: Option<f32>,
    pub dominant_mood: Option<Mood>,
    pub top_tags: Vec<TagCount>,
}

impl MoodStats {
    pub fn from_entries(entries: &[JournalEntry]) -> Self {
        let mut by_mood: BTreeMap<Mood, usize> = BTreeMap::new();
        let mut tag_counts: HashMap<&str, usize> = HashMap::new();
        let mut score_sum = 0.0f32;
        let mut scored = 0usize;

        for entry in entries {
            *by_mood.entry(entry.mood).or_insert(0) += 1;
            if let Some(score) = entry.mood_score {
                score_sum += score;
                scored += 1;
            }
            for tag in &entry.tags {
                *tag_counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }

        // BTreeMap iterates in vocabulary order, so the earliest mood wins ties.
        let mut dominant_mood = None;
        let mut best = 0usize;
        for (mood, count) in &by_mood {
            if *count > best {
                best = *count;
                dominant_mood = Some(*mood);
            }
        }

        let mut top_tags: Vec<TagCount> = tag_counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag: tag.to_string(),
                count,
            })
            .collect();
        top_tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        top_tags.truncate(TOP_TAGS);

        Self {
            total: entries.len(),
            by_mood,
            average_score: (scored > 0).then(|| score_sum / scored as f32),
            dominant_mood,
            top_tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisSource;
    use chrono::Duration;
    use uuid::Uuid;

    fn entry(mood: Mood, score: Option<f32>, tags: &[&str], hours_ago: i64) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            owner_id: "alice".to_string(),
            title: None,
            raw_text: format!("{} entry", mood),
            mood,
            mood_score: score,
            summary: "summary".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            source: AnalysisSource::Fallback,
            created_at: Utc::now() - Duration::hours(hours_ago),
        }
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let entries = vec![entry(Mood::Joyful, None, &[], 1), entry(Mood::Lonely, None, &[], 2)];
        let filter = EntryFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(entries.clone()), entries);
    }

    #[test]
    fn test_filter_by_mood_tag_and_window() {
        let entries = vec![
            entry(Mood::Joyful, None, &["work"], 1),
            entry(Mood::Joyful, None, &["family"], 30),
            entry(Mood::Nervous, None, &["work"], 2),
        ];

        let by_mood = EntryFilter {
            mood: Some(Mood::Joyful),
            ..Default::default()
        };
        assert_eq!(by_mood.apply(entries.clone()).len(), 2);

        let by_tag = EntryFilter {
            tag: Some(" WORK ".to_string()),
            ..Default::default()
        };
        assert_eq!(by_tag.apply(entries.clone()).len(), 2);

        let recent_joy = EntryFilter {
            mood: Some(Mood::Joyful),
            since: Some(Utc::now() - Duration::hours(24)),
            ..Default::default()
        };
        let kept = recent_joy.apply(entries.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].tags, vec!["work".to_string()]);

        let old_only = EntryFilter {
            until: Some(Utc::now() - Duration::hours(24)),
            ..Default::default()
        };
        assert_eq!(old_only.apply(entries).len(), 1);
    }

    #[test]
    fn test_filter_query_matches_text_case_insensitively() {
        let mut e = entry(Mood::Peaceful, None, &[], 1);
        e.raw_text = "Long walk by the Lake".to_string();
        let filter = EntryFilter {
            query: Some("lake".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&e));

        let miss = EntryFilter {
            query: Some("mountain".to_string()),
            ..Default::default()
        };
        assert!(!miss.matches(&e));
    }

    #[test]
    fn test_stats_counts_average_and_top_tags() {
        let entries = vec![
            entry(Mood::Joyful, Some(0.9), &["work", "family"], 1),
            entry(Mood::Joyful, Some(0.7), &["work"], 2),
            entry(Mood::Nervous, Some(0.2), &["work", "health"], 3),
            entry(Mood::Reflective, None, &[], 4),
        ];
        let stats = MoodStats::from_entries(&entries);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_mood[&Mood::Joyful], 2);
        assert_eq!(stats.by_mood[&Mood::Nervous], 1);
        assert_eq!(stats.dominant_mood, Some(Mood::Joyful));
        let avg = stats.average_score.unwrap();
        assert!((avg - 0.6).abs() < 1e-6, "avg = {avg}");
        assert_eq!(
            stats.top_tags[0],
            TagCount {
                tag: "work".to_string(),
                count: 3
            }
        );
        assert_eq!(stats.top_tags.len(), 3);
        assert_eq!(stats.top_tags[1].tag, "family");
    }

    #[test]
    fn test_stats_dominant_tie_uses_vocabulary_order() {
        let entries = vec![
            entry(Mood::Lonely, None, &[], 1),
            entry(Mood::Frustrated, None, &[], 2),
        ];
        let stats = MoodStats::from_entries(&entries);
        assert_eq!(stats.dominant_mood, Some(Mood::Frustrated));
        assert!(stats.average_score.is_none());
    }

    #[test]
    fn test_stats_on_empty_timeline() {
        let stats = MoodStats::from_entries(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.dominant_mood.is_none());
        assert!(stats.top_tags.is_empty());

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["by_mood"].is_object());
    }
}
