#![doc = include_str!("../README.md")]

mod error;
mod parser;
mod serializer;
mod utils;

pub use crate::error::{RdfXmlEncodeError, RdfXmlParseError, RdfXmlSyntaxError};
pub use crate::parser::RdfXmlParser;
pub use crate::serializer::RdfXmlSerializer;
