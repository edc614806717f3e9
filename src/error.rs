use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FertilityError {
    /// Source table or coordinate file is missing or cannot be parsed.
    #[error("data unavailable ({path:?}): {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    /// Requested years are reversed or fall outside the dataset.
    #[error("invalid year range {start}..={end}, dataset covers {first}..={last}")]
    InvalidRange {
        start: i32,
        end: i32,
        first: i32,
        last: i32,
    },
}

impl FertilityError {
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        FertilityError::DataUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
