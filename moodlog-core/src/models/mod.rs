pub mod analysis;
pub mod entry;
pub mod mood;

pub use analysis::{
    clamp_score, AnalysisInput, AnalysisResult, AnalysisSource, UnknownSource,
    NEUTRAL_SCORE,
};
pub use entry::{JournalEntry, NewEntry};
pub use mood::{Mood, UnknownMood};
