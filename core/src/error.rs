use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChurnError {
    #[error("Invalid feature '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Storage write failed during {operation}: {reason}")]
    StorageWrite { operation: &'static str, reason: String },

    #[error("Cannot load model bundle from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChurnError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field:  field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ChurnResult<T> = Result<T, ChurnError>;
