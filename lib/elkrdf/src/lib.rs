#![doc = include_str!("../README.md")]

mod blank_node;
pub mod dataset;
pub mod graph;
mod literal;
mod named_node;
mod namespaces;
mod term;
pub mod vocab;

pub use crate::blank_node::{BlankNode, BlankNodeIdParseError};
pub use crate::dataset::Dataset;
pub use crate::graph::Graph;
pub use crate::literal::Literal;
pub use crate::named_node::{NamedNode, NamedNodeRef};
pub use crate::namespaces::NamespaceMap;
pub use crate::term::{GraphName, NamedOrBlankNode, Quad, Term, TermRoleError, Triple};
pub use elkiri::IriParseError;
pub use oxilangtag::LanguageTagParseError;
