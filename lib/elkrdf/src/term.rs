use crate::blank_node::BlankNode;
use crate::literal::Literal;
use crate::named_node::{NamedNode, NamedNodeRef};
use std::fmt;
use thiserror::Error;

/// The union of [IRIs](NamedNode) and [blank nodes](BlankNode): the terms
/// allowed in subject and graph-name position.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum NamedOrBlankNode {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

impl NamedOrBlankNode {
    #[inline]
    pub fn is_named_node(&self) -> bool {
        matches!(self, Self::NamedNode(_))
    }

    #[inline]
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    /// The IRI or the blank node identifier.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NamedNode(node) => node.as_str(),
            Self::BlankNode(node) => node.as_str(),
        }
    }
}

impl fmt::Display for NamedOrBlankNode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => node.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
        }
    }
}

impl From<NamedNode> for NamedOrBlankNode {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<NamedNodeRef<'_>> for NamedOrBlankNode {
    #[inline]
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self::NamedNode(node.into_owned())
    }
}

impl From<BlankNode> for NamedOrBlankNode {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl TryFrom<Term> for NamedOrBlankNode {
    type Error = TermRoleError;

    #[inline]
    fn try_from(term: Term) -> Result<Self, Self::Error> {
        match term {
            Term::NamedNode(node) => Ok(Self::NamedNode(node)),
            Term::BlankNode(node) => Ok(Self::BlankNode(node)),
            Term::Literal(_) => Err(TermRoleError::new(term, "subject")),
        }
    }
}

/// An RDF term: an IRI, a blank node or a literal.
///
/// Operations consuming terms match exhaustively over the three variants.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Term {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

impl Term {
    #[inline]
    pub fn is_named_node(&self) -> bool {
        matches!(self, Self::NamedNode(_))
    }

    #[inline]
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl fmt::Display for Term {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => node.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
            Self::Literal(literal) => literal.fmt(f),
        }
    }
}

impl From<NamedNode> for Term {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<NamedNodeRef<'_>> for Term {
    #[inline]
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self::NamedNode(node.into_owned())
    }
}

impl From<BlankNode> for Term {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl From<Literal> for Term {
    #[inline]
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<NamedOrBlankNode> for Term {
    #[inline]
    fn from(node: NamedOrBlankNode) -> Self {
        match node {
            NamedOrBlankNode::NamedNode(node) => Self::NamedNode(node),
            NamedOrBlankNode::BlankNode(node) => Self::BlankNode(node),
        }
    }
}

/// The name of a graph inside a [`Dataset`](crate::Dataset): a named graph
/// name, or the default graph.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub enum GraphName {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    #[default]
    DefaultGraph,
}

impl GraphName {
    #[inline]
    pub fn is_default_graph(&self) -> bool {
        matches!(self, Self::DefaultGraph)
    }

    /// The graph name term, or `None` for the default graph.
    #[inline]
    pub fn as_named(&self) -> Option<NamedOrBlankNode> {
        match self {
            Self::NamedNode(node) => Some(node.clone().into()),
            Self::BlankNode(node) => Some(node.clone().into()),
            Self::DefaultGraph => None,
        }
    }
}

impl fmt::Display for GraphName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => node.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
            Self::DefaultGraph => f.write_str("DEFAULT"),
        }
    }
}

impl From<NamedNode> for GraphName {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<BlankNode> for GraphName {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl From<NamedOrBlankNode> for GraphName {
    #[inline]
    fn from(node: NamedOrBlankNode) -> Self {
        match node {
            NamedOrBlankNode::NamedNode(node) => Self::NamedNode(node),
            NamedOrBlankNode::BlankNode(node) => Self::BlankNode(node),
        }
    }
}

impl From<Option<NamedOrBlankNode>> for GraphName {
    #[inline]
    fn from(name: Option<NamedOrBlankNode>) -> Self {
        name.map_or(Self::DefaultGraph, Into::into)
    }
}

/// An RDF [triple](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-triple).
///
/// Role constraints are carried by the component types: the subject is an
/// IRI or blank node, the predicate an IRI, the object any term. Equality
/// is structural.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Triple {
    pub subject: NamedOrBlankNode,
    pub predicate: NamedNode,
    pub object: Term,
}

impl Triple {
    #[inline]
    pub fn new(
        subject: impl Into<NamedOrBlankNode>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Builds a triple from three generic terms, rejecting terms used in a
    /// role they cannot take (a literal subject, a non-IRI predicate).
    pub fn from_terms(subject: Term, predicate: Term, object: Term) -> Result<Self, TermRoleError> {
        Ok(Self {
            subject: subject.try_into()?,
            predicate: match predicate {
                Term::NamedNode(node) => node,
                term => return Err(TermRoleError::new(term, "predicate")),
            },
            object,
        })
    }

    /// Attaches a graph name, turning this triple into a [`Quad`].
    #[inline]
    pub fn in_graph(self, graph_name: impl Into<GraphName>) -> Quad {
        Quad {
            subject: self.subject,
            predicate: self.predicate,
            object: self.object,
            graph_name: graph_name.into(),
        }
    }
}

impl fmt::Display for Triple {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// An RDF triple plus the name of the graph holding it.
///
/// [`GraphName::DefaultGraph`] denotes the default graph.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Quad {
    pub subject: NamedOrBlankNode,
    pub predicate: NamedNode,
    pub object: Term,
    pub graph_name: GraphName,
}

impl Quad {
    #[inline]
    pub fn new(
        subject: impl Into<NamedOrBlankNode>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
        graph_name: impl Into<GraphName>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph_name: graph_name.into(),
        }
    }

    /// Drops the graph name.
    #[inline]
    pub fn into_triple(self) -> Triple {
        Triple {
            subject: self.subject,
            predicate: self.predicate,
            object: self.object,
        }
    }
}

impl fmt::Display for Quad {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.graph_name.is_default_graph() {
            write!(f, "{} {} {}", self.subject, self.predicate, self.object)
        } else {
            write!(
                f,
                "{} {} {} {}",
                self.subject, self.predicate, self.object, self.graph_name
            )
        }
    }
}

impl From<Quad> for Triple {
    #[inline]
    fn from(quad: Quad) -> Self {
        quad.into_triple()
    }
}

/// An error raised when a term is placed in a role it cannot take.
#[derive(Error, Debug, Clone)]
#[error("{term} cannot be used as a {role}")]
pub struct TermRoleError {
    term: Term,
    role: &'static str,
}

impl TermRoleError {
    pub(crate) fn new(term: Term, role: &'static str) -> Self {
        Self { term, role }
    }

    /// The rejected term.
    pub fn into_term(self) -> Term {
        self.term
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Literal;

    #[test]
    fn from_terms_enforces_roles() {
        let iri = |s: &str| Term::NamedNode(NamedNode::new_unchecked(s));
        assert!(Triple::from_terms(iri("s"), iri("p"), iri("o")).is_ok());
        assert!(Triple::from_terms(
            Term::Literal(Literal::from("x")),
            iri("p"),
            iri("o")
        )
        .is_err());
        assert!(Triple::from_terms(
            iri("s"),
            Term::BlankNode(BlankNode::default()),
            iri("o")
        )
        .is_err());
        assert!(Triple::from_terms(iri("s"), iri("p"), Term::Literal(Literal::from("x"))).is_ok());
    }

    #[test]
    fn quad_display_omits_default_graph() {
        let quad = Quad::new(
            NamedNode::new_unchecked("http://e/s"),
            NamedNode::new_unchecked("http://e/p"),
            Literal::from("o"),
            GraphName::DefaultGraph,
        );
        assert_eq!(quad.to_string(), "<http://e/s> <http://e/p> \"o\"");
        let named = Quad::new(
            NamedNode::new_unchecked("http://e/s"),
            NamedNode::new_unchecked("http://e/p"),
            Literal::from("o"),
            NamedNode::new_unchecked("http://e/g"),
        );
        assert_eq!(
            named.to_string(),
            "<http://e/s> <http://e/p> \"o\" <http://e/g>"
        );
    }
}
