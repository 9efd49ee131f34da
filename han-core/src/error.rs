use thiserror::Error;

/// Main error type for HAN streaming operations
#[derive(Error, Debug)]
pub enum HanError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for HAN streaming operations
pub type HanResult<T> = Result<T, HanError>;
