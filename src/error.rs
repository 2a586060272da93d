use std::path::PathBuf;

/// Failure taxonomy shared by the generator and the evaluator.
#[derive(thiserror::Error, Debug)]
pub enum PlateError {
    /// A required resource (font, model, setting) is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single dataset image could not be read. Callers skip the record.
    #[error("Failed to read image {}: {reason}", path.display())]
    ImageRead { path: PathBuf, reason: String },

    #[error("Malformed manifest at line {line}: {reason}")]
    Manifest { line: usize, reason: String },

    /// Degenerate input to the metrics aggregation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
