pub mod config;
pub mod db;
pub mod error;
pub mod fallback;
pub mod inference;
pub mod lexicon;
pub mod models;
pub mod response;
pub mod store;
pub mod timeline;

pub use config::MoodlogConfig;
pub use error::MoodlogError;
pub use fallback::{fallback_analyze, FallbackAnalyzer};
pub use inference::{
    AnalysisBackend, AnalysisConfig, AnalysisError, GeminiAnalysisClient, InferenceStage,
    InvalidInput,
};
pub use lexicon::{Lexicon, LexiconError};
pub use models::{AnalysisInput, AnalysisResult, AnalysisSource, JournalEntry, Mood, NewEntry};
pub use response::{ParsedAnalysis, ResponseShapeError};
pub use store::{JournalStore, MemoryJournalStore, PgJournalStore, StoreError};
pub use timeline::{EntryFilter, MoodStats};
