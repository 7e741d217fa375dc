use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// An error raised while parsing RDF/XML.
#[derive(Error, Debug)]
pub enum RdfXmlParseError {
    /// The underlying XML is malformed.
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    /// The XML is well-formed but is not valid RDF/XML.
    #[error(transparent)]
    Syntax(#[from] RdfXmlSyntaxError),
}

/// An RDF/XML validity error, with the 0-based line and column of the
/// element that raised it when known.
#[derive(Debug, Clone)]
pub struct RdfXmlSyntaxError {
    message: String,
    position: Option<(u64, u64)>,
    source_name: Option<String>,
}

impl RdfXmlSyntaxError {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            source_name: None,
        }
    }

    pub(crate) fn with_position(mut self, line: u64, column: u64) -> Self {
        if self.position.is_none() {
            self.position = Some((line, column));
        }
        self
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

    /// 0-based (line, column) of the error, when known.
    pub fn position(&self) -> Option<(u64, u64)> {
        self.position
    }
}

impl fmt::Display for RdfXmlSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Format error: {}", self.message)?;
        if let Some((line, column)) = self.position {
            f.write_str(" at ")?;
            if let Some(source_name) = &self.source_name {
                write!(f, "{source_name}:")?;
            }
            write!(f, "{}:{}", line + 1, column + 1)?;
        }
        Ok(())
    }
}

impl StdError for RdfXmlSyntaxError {}

/// An error raised when a graph cannot be represented in RDF/XML.
#[derive(Error, Debug, Clone)]
#[error("Encoding error: {message}")]
pub struct RdfXmlEncodeError {
    message: String,
}

impl RdfXmlEncodeError {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
