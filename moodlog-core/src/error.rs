use thiserror::Error;

use crate::lexicon::LexiconError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum MoodlogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Lexicon error: {0}")]
    Lexicon(#[from] LexiconError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_lexicon_and_store_errors_convert() {
        let err: MoodlogError = LexiconError::Invalid("no mood rules".to_string()).into();
        assert!(matches!(err, MoodlogError::Lexicon(_)));
        assert_eq!(
            err.to_string(),
            "Lexicon error: Invalid lexicon: no mood rules"
        );

        let id = Uuid::nil();
        let err: MoodlogError = StoreError::Corrupt {
            id,
            reason: "bad mood".to_string(),
        }
        .into();
        assert!(matches!(err, MoodlogError::Store(_)));
    }
}
