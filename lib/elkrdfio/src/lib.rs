#![doc = include_str!("../README.md")]

mod codec;
mod error;
mod format;
mod options;

pub use crate::codec::{CodecRegistry, RdfCodec};
pub use crate::error::{RdfEncodeError, RdfParseError};
pub use crate::format::RdfFormat;
pub use crate::options::{
    CodecOptions, JsonLdCodecOptions, RdfXmlCodecOptions, TurtleCodecOptions,
};
