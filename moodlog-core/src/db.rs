use crate::config::DatabaseConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

/// Create the entries table and its timeline index if they are missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS journal_entries (
            id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            owner_id    TEXT NOT NULL,
            title       TEXT,
            raw_text    TEXT NOT NULL CHECK (length(btrim(raw_text)) > 0),
            mood        TEXT NOT NULL,
            mood_score  REAL CHECK (mood_score IS NULL OR (mood_score >= 0 AND mood_score <= 1)),
            summary     TEXT NOT NULL CHECK (length(summary) > 0),
            tags        TEXT[] NOT NULL DEFAULT '{}',
            source      TEXT NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS journal_entries_owner_created_idx \
         ON journal_entries (owner_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
