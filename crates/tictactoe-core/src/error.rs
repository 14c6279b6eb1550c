use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Field '{0}' contains reserved protocol delimiters (;, |, % or line breaks)")]
    InvalidField(String),

    // Board errors
    #[error("Board snapshot needs {expected} cells, got {actual}")]
    InvalidBoard { expected: usize, actual: usize },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Per-line decode failure.
///
/// Both variants are recoverable: the listener counts them towards its
/// circuit breaker and keeps reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// First field does not name any message kind in the catalog.
    #[error("Unrecognised message kind: {0}")]
    UnknownKind(String),

    /// Known kind, but a required field is missing or not an integer.
    #[error("Malformed message: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
