use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, ConceptError>;

/// Enum representing all possible errors raised while building a concept store.
#[derive(Error, Debug)]
pub enum ConceptError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Data directory not found or could not be determined")]
    DataDirNotFound,

    /// The build filtered everything away; an empty store is never written.
    #[error("No data produced: zero {0} after filtering")]
    NoData(String),

    /// A lemma or concept key was inserted twice. Indicates a build logic defect.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
