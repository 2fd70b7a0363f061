use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Move rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<toml::de::Error> for BoardError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
