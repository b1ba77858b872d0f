//! Persistence collaborator for journal entries
//!
//! The pipeline only needs two operations: put an analyzed entry and list an
//! owner's entries newest first. Two implementations:
//! - `MemoryJournalStore`: process-local, used by default and in tests
//! - `PgJournalStore`: PostgreSQL via sqlx, one `journal_entries` table

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{AnalysisSource, JournalEntry, Mood, NewEntry};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Persist an analyzed entry, assigning its id and creation time.
    async fn put(&self, entry: NewEntry) -> Result<JournalEntry, StoreError>;

    /// All entries of one owner, newest first.
    async fn list(&self, owner_id: &str) -> Result<Vec<JournalEntry>, StoreError>;

    /// Short description of the backing store for health reports.
    async fn health(&self) -> Result<String, StoreError>;
}

// ============================================================================
// MemoryJournalStore
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryJournalStore {
    entries: RwLock<HashMap<String, Vec<JournalEntry>>>,
}

impl MemoryJournalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JournalStore for MemoryJournalStore {
    async fn put(&self, entry: NewEntry) -> Result<JournalEntry, StoreError> {
        let mut guard = self.entries.write().await;
        let owned = guard.entry(entry.owner_id.clone()).or_default();

        // Keep creation times non-decreasing per owner.
        let now = Utc::now();
        let created_at = owned
            .last()
            .map(|last| last.created_at.max(now))
            .unwrap_or(now);

        let stored = entry.into_entry(Uuid::new_v4(), created_at);
        owned.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<JournalEntry>, StoreError> {
        let guard = self.entries.read().await;
        let mut out: Vec<JournalEntry> = guard
            .get(owner_id)
            .map(|v| v.iter().rev().cloned().collect())
            .unwrap_or_default();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn health(&self) -> Result<String, StoreError> {
        let guard = self.entries.read().await;
        let total: usize = guard.values().map(Vec::len).sum();
        Ok(format!("memory ({} entries)", total))
    }
}

// ============================================================================
// PgJournalStore
// ============================================================================

#[derive(Debug, Clone)]
pub struct PgJournalStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    owner_id: String,
    title: Option<String>,
    raw_text: String,
    mood: String,
    mood_score: Option<f32>,
    summary: String,
    tags: Vec<String>,
    source: String,
    created_at: DateTime<Utc>,
}

impl EntryRow {
    fn into_entry(self) -> Result<JournalEntry, StoreError> {
        let mood: Mood = self.mood.parse().map_err(|e| StoreError::Corrupt {
            id: self.id,
            reason: format!("{}", e),
        })?;
        let source: AnalysisSource = self
            .source
            .parse::<AnalysisSource>()
            .map_err(|e| StoreError::Corrupt {
                id: self.id,
                reason: e.to_string(),
            })?;

        Ok(JournalEntry {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            raw_text: self.raw_text,
            mood,
            mood_score: self.mood_score,
            summary: self.summary,
            tags: self.tags,
            source,
            created_at: self.created_at,
        })
    }
}

const ENTRY_COLUMNS: &str =
    "id, owner_id, title, raw_text, mood, mood_score, summary, tags, source, created_at";

impl PgJournalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect-time setup: make sure the table exists.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        crate::db::ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JournalStore for PgJournalStore {
    async fn put(&self, entry: NewEntry) -> Result<JournalEntry, StoreError> {
        let sql = format!(
            "INSERT INTO journal_entries \
             (owner_id, title, raw_text, mood, mood_score, summary, tags, source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            ENTRY_COLUMNS
        );

        let row: EntryRow = sqlx::query_as(&sql)
            .bind(&entry.owner_id)
            .bind(&entry.title)
            .bind(&entry.raw_text)
            .bind(entry.mood.as_str())
            .bind(entry.mood_score)
            .bind(&entry.summary)
            .bind(&entry.tags)
            .bind(entry.source.as_str())
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(id = %row.id, owner = %row.owner_id, "Inserted journal entry");

        row.into_entry()
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<JournalEntry>, StoreError> {
        let sql = format!(
            "SELECT {} FROM journal_entries WHERE owner_id = $1 ORDER BY created_at DESC",
            ENTRY_COLUMNS
        );

        let rows: Vec<EntryRow> = sqlx::query_as(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    async fn health(&self) -> Result<String, StoreError> {
        Ok(crate::db::health_check(&self.pool).await?)
    }
}
