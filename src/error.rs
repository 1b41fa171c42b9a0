use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuadError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Data corruption: {message}")]
    DataCorruption { message: String },
}

pub type Result<T> = std::result::Result<T, QuadError>;

// Helper conversions
impl From<config::ConfigError> for QuadError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl QuadError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
    pub(crate) fn corrupted(message: impl Into<String>) -> Self {
        Self::DataCorruption { message: message.into() }
    }
}
