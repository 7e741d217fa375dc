use thiserror::Error;

/// An error raised while decoding any of the registered formats.
#[derive(Error, Debug)]
pub enum RdfParseError {
    #[error(transparent)]
    Turtle(#[from] elkttl::TurtleSyntaxError),
    #[error(transparent)]
    RdfXml(#[from] elkrdfxml::RdfXmlParseError),
    #[error(transparent)]
    JsonLd(#[from] elkjsonld::JsonLdParseError),
    /// The base IRI given in the codec options is not a valid IRI.
    #[error("invalid base IRI: {0}")]
    InvalidBaseIri(#[from] elkiri::IriParseError),
    /// No registered codec handles the requested content type.
    #[error("no registered codec supports the content type '{content_type}'")]
    UnsupportedContentType { content_type: String },
}

/// An error raised while encoding into one of the registered formats.
#[derive(Error, Debug)]
pub enum RdfEncodeError {
    #[error(transparent)]
    RdfXml(#[from] elkrdfxml::RdfXmlEncodeError),
    /// The base IRI given in the codec options is not a valid IRI.
    #[error("invalid base IRI: {0}")]
    InvalidBaseIri(#[from] elkiri::IriParseError),
    /// No registered codec handles the requested content type.
    #[error("no registered codec supports the content type '{content_type}'")]
    UnsupportedContentType { content_type: String },
}
