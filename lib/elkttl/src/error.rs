use std::error::Error;
use std::fmt;

/// A position in a parsed text: 0-based `line` and `column` (in code
/// points) plus a 0-based byte `offset`.
///
/// Human-readable output ([`TurtleSyntaxError`]'s `Display`) is 1-based.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct TextPosition {
    pub line: u64,
    pub column: u64,
    pub offset: u64,
}

/// An error in the syntax of a parsed document, with its position.
#[derive(Debug, Clone)]
pub struct TurtleSyntaxError {
    message: String,
    position: TextPosition,
    source_name: Option<String>,
}

impl TurtleSyntaxError {
    pub(crate) fn new(message: impl Into<String>, position: TextPosition) -> Self {
        Self {
            message: message.into(),
            position,
            source_name: None,
        }
    }

    pub(crate) fn with_source_name(mut self, source_name: Option<&str>) -> Self {
        if self.source_name.is_none() {
            self.source_name = source_name.map(ToOwned::to_owned);
        }
        self
    }

    /// The error message, without position information.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Where the error was raised.
    pub fn position(&self) -> TextPosition {
        self.position
    }

    /// The name the parser was given for the document, if any.
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }
}

impl fmt::Display for TurtleSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Format error: {} at ", self.message)?;
        if let Some(source_name) = &self.source_name {
            write!(f, "{source_name}:")?;
        }
        write!(
            f,
            "{}:{}",
            self.position.line + 1,
            self.position.column + 1
        )
    }
}

impl Error for TurtleSyntaxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based() {
        let err = TurtleSyntaxError::new(
            "unexpected token",
            TextPosition {
                line: 2,
                column: 6,
                offset: 40,
            },
        );
        assert_eq!(err.to_string(), "Format error: unexpected token at 3:7");
        let named = err.with_source_name(Some("data.ttl"));
        assert_eq!(
            named.to_string(),
            "Format error: unexpected token at data.ttl:3:7"
        );
    }
}
