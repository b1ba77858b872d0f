use moodlog_core::{
    AnalysisInput, InferenceStage, InvalidInput, JournalEntry, JournalStore, NewEntry, StoreError,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    #[error("Failed to save journal entry: {0}")]
    Store(#[from] StoreError),
}

/// Analyze a submission and persist it.
///
/// The write happens only after analysis completes inside the same future, so
/// a submission abandoned mid-analysis (future dropped) is never stored.
pub async fn submit_entry(
    stage: &InferenceStage,
    store: &dyn JournalStore,
    owner_id: &str,
    input: AnalysisInput,
) -> Result<JournalEntry, SubmitError> {
    let analysis = stage.analyze(&input).await?;
    let new_entry = NewEntry::from_analysis(owner_id, input, analysis);

    let entry = store.put(new_entry).await.map_err(|e| {
        tracing::error!(owner = %owner_id, error = %e, "Failed to persist journal entry");
        e
    })?;

    tracing::info!(
        id = %entry.id,
        mood = %entry.mood,
        source = entry.source.as_str(),
        "Entry saved"
    );

    Ok(entry)
}
