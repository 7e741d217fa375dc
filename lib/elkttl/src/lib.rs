#![doc = include_str!("../README.md")]

mod error;
mod lexer;
pub mod line_formats;
mod pretty;
mod relaxations;
mod terse;
pub mod trig;
pub mod turtle;

pub use crate::error::{TextPosition, TurtleSyntaxError};
pub use crate::line_formats::{
    NQuadsParser, NQuadsSerializer, NTriplesParser, NTriplesSerializer,
};
pub use crate::relaxations::{TurtleRelaxation, TurtleRelaxations};
pub use crate::trig::{TriGParser, TriGSerializer};
pub use crate::turtle::{TurtleParser, TurtleSerializer};
pub use elkiri::RelativizationPolicy;
