//! Error types for the Wordgap speech assembler

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Input text is empty")]
    EmptyInput,

    #[error("Synthesis failed for unit {index} ({text:?}): {reason}")]
    Synthesis {
        index: usize,
        text: String,
        reason: String,
    },

    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("TTS service error: {0}")]
    ServiceError(String),

    #[error("Audio error: {0}")]
    AudioError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Per-unit synthesis failure.
    pub fn synthesis(index: usize, text: impl Into<String>, reason: impl ToString) -> Self {
        Error::Synthesis {
            index,
            text: text.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::AudioError(e.to_string())
    }
}

impl From<symphonia::core::errors::Error> for Error {
    fn from(e: symphonia::core::errors::Error) -> Self {
        Error::AudioError(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::ConfigError(e.to_string())
    }
}
