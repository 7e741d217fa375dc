use thiserror::Error;

/// An error raised while parsing JSON-LD.
#[derive(Error, Debug)]
pub enum JsonLdParseError {
    /// The document is not valid JSON; the inner error carries the 1-based
    /// line and column.
    #[error("Format error: {0}")]
    Json(#[from] serde_json::Error),
    /// The JSON is valid but is not a usable JSON-LD document.
    #[error(transparent)]
    Syntax(#[from] JsonLdSyntaxError),
}

/// A JSON-LD document shape error.
#[derive(Error, Debug, Clone)]
#[error("Format error: {message}")]
pub struct JsonLdSyntaxError {
    message: String,
}

impl JsonLdSyntaxError {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message, without the kind marker.
    pub fn message(&self) -> &str {
        &self.message
    }
}
