#![doc = include_str!("../README.md")]

mod context;
mod error;
mod parser;
mod serializer;

pub use crate::error::{JsonLdParseError, JsonLdSyntaxError};
pub use crate::parser::JsonLdParser;
pub use crate::serializer::JsonLdSerializer;
