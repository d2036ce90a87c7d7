use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unable to cast to unknown type: {0}")]
    UnknownCastType(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Cannot cast {value} to {type_name}")]
    CastFailed { type_name: String, value: Value },

    #[error("Invalid schema document: {0}")]
    InvalidDocument(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    /// Convenience for cast functions rejecting a value.
    pub fn cast_failed(type_name: impl Into<String>, value: Value) -> Self {
        ModelError::CastFailed {
            type_name: type_name.into(),
            value,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
