//! Pipeline construction: builds the inference stage and store from config
//!
//! The API credential is read once here, at startup, and handed to the
//! inference stage explicitly.

use std::sync::Arc;

use moodlog_core::config::StorageBackend;
use moodlog_core::{
    FallbackAnalyzer, InferenceStage, JournalStore, Lexicon, MemoryJournalStore, MoodlogConfig,
    MoodlogError, PgJournalStore,
};

/// Read the analysis API key from the environment variable named in config.
pub fn read_api_key(config: &MoodlogConfig) -> Option<String> {
    std::env::var(&config.analysis.api_key_env)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Build the fallback analyzer, loading a custom lexicon when configured.
pub fn build_fallback(config: &MoodlogConfig) -> Result<FallbackAnalyzer, MoodlogError> {
    let lexicon = match &config.analysis.lexicon_path {
        Some(path) => {
            let lexicon = Lexicon::load(path)?;
            tracing::info!(path = %path, rules = lexicon.moods.len(), "Loaded custom lexicon");
            lexicon
        }
        None => Lexicon::default(),
    };
    Ok(FallbackAnalyzer::new(lexicon))
}

/// Build the inference stage. Without a credential, or with analysis
/// disabled, every entry is analyzed by the fallback.
pub fn build_inference_stage(
    config: &MoodlogConfig,
    api_key: Option<String>,
) -> Result<InferenceStage, MoodlogError> {
    let fallback = build_fallback(config)?;

    if !config.analysis.enabled {
        tracing::info!("Remote analysis disabled in config, keyword fallback only");
        return Ok(InferenceStage::fallback_only(fallback));
    }

    let stage = match api_key {
        Some(key) => InferenceStage::with_gemini(config.analysis.client_config(key), fallback),
        None => {
            tracing::warn!(
                env = %config.analysis.api_key_env,
                "No analysis API key set, keyword fallback only"
            );
            InferenceStage::fallback_only(fallback)
        }
    };

    if let Some(name) = stage.remote_name() {
        tracing::info!(
            backend = name,
            model = %config.analysis.model,
            timeout_seconds = config.analysis.timeout_seconds,
            "Remote analysis enabled"
        );
    }

    Ok(stage)
}

/// Build the configured journal store.
pub async fn build_store(config: &MoodlogConfig) -> Result<Arc<dyn JournalStore>, MoodlogError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory journal store (entries are lost on restart)");
            Ok(Arc::new(MemoryJournalStore::new()))
        }
        StorageBackend::Postgres => {
            let pool = moodlog_core::db::create_pool(&config.database).await?;
            let store = PgJournalStore::connect(pool).await?;
            tracing::info!("Using PostgreSQL journal store");
            Ok(Arc::new(store))
        }
    }
}
