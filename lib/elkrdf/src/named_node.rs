use crate::term::{Term, TermRoleError};
use elkiri::{validate_reference, IriParseError};
use std::cmp::Ordering;
use std::fmt;

/// An owned RDF [IRI](https://www.w3.org/TR/rdf11-concepts/#dfn-iri).
///
/// The IRI may be relative; parsers resolve references against their base
/// before constructing terms, so terms built by a parser are absolute.
/// Equality is string equality on the stored form.
///
/// The default string formatter returns an N-Triples and Turtle compatible
/// representation:
/// ```
/// use elkrdf::NamedNode;
///
/// assert_eq!(
///     "<http://example.com/foo>",
///     NamedNode::new("http://example.com/foo")?.to_string()
/// );
/// # Result::<_, elkrdf::IriParseError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct NamedNode {
    iri: String,
}

impl NamedNode {
    /// Builds an IRI term, validating RFC 3986 reference structure.
    pub fn new(iri: impl Into<String>) -> Result<Self, IriParseError> {
        let iri = iri.into();
        validate_reference(&iri)?;
        Ok(Self::new_unchecked(iri))
    }

    /// Builds an IRI term from a string known to be structurally valid.
    #[inline]
    pub fn new_unchecked(iri: impl Into<String>) -> Self {
        Self { iri: iri.into() }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.iri.as_str()
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.iri
    }

    #[inline]
    pub fn as_ref(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.iri)
    }
}

impl fmt::Display for NamedNode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl PartialEq<str> for NamedNode {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for NamedNode {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl From<elkiri::Iri> for NamedNode {
    #[inline]
    fn from(iri: elkiri::Iri) -> Self {
        Self {
            iri: iri.into_inner(),
        }
    }
}

impl TryFrom<Term> for NamedNode {
    type Error = TermRoleError;

    #[inline]
    fn try_from(term: Term) -> Result<Self, Self::Error> {
        if let Term::NamedNode(node) = term {
            Ok(node)
        } else {
            Err(TermRoleError::new(term, "named node"))
        }
    }
}

/// A borrowed RDF IRI, usable in `const` context for vocabulary terms.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Hash)]
pub struct NamedNodeRef<'a> {
    iri: &'a str,
}

impl<'a> NamedNodeRef<'a> {
    /// Builds an IRI term from a string known to be structurally valid.
    #[inline]
    pub const fn new_unchecked(iri: &'a str) -> Self {
        Self { iri }
    }

    #[inline]
    pub const fn as_str(self) -> &'a str {
        self.iri
    }

    #[inline]
    pub fn into_owned(self) -> NamedNode {
        NamedNode::new_unchecked(self.iri)
    }
}

impl fmt::Display for NamedNodeRef<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.iri)
    }
}

impl From<NamedNodeRef<'_>> for NamedNode {
    #[inline]
    fn from(node: NamedNodeRef<'_>) -> Self {
        node.into_owned()
    }
}

impl<'a> From<&'a NamedNode> for NamedNodeRef<'a> {
    #[inline]
    fn from(node: &'a NamedNode) -> Self {
        node.as_ref()
    }
}

impl PartialEq<NamedNode> for NamedNodeRef<'_> {
    #[inline]
    fn eq(&self, other: &NamedNode) -> bool {
        self.as_str() == other.as_str()
    }
}

impl PartialEq<NamedNodeRef<'_>> for NamedNode {
    #[inline]
    fn eq(&self, other: &NamedNodeRef<'_>) -> bool {
        self.as_str() == other.as_str()
    }
}

impl PartialOrd<NamedNode> for NamedNodeRef<'_> {
    #[inline]
    fn partial_cmp(&self, other: &NamedNode) -> Option<Ordering> {
        Some(self.as_str().cmp(other.as_str()))
    }
}

impl PartialOrd<NamedNodeRef<'_>> for NamedNode {
    #[inline]
    fn partial_cmp(&self, other: &NamedNodeRef<'_>) -> Option<Ordering> {
        Some(self.as_str().cmp(other.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Literal;

    #[test]
    fn equality_is_string_equality() {
        let a = NamedNode::new("http://example.com/a").unwrap();
        let b = NamedNode::new_unchecked("http://example.com/a");
        assert_eq!(a, b);
        assert_eq!(a, "http://example.com/a");
        assert_eq!(NamedNodeRef::new_unchecked("http://example.com/a"), a);
    }

    #[test]
    fn rejects_malformed() {
        assert!(NamedNode::new("http://example.com/a b").is_err());
        assert!(NamedNode::new("http://example.com/<a>").is_err());
        // Relative references are allowed as terms.
        assert!(NamedNode::new("relative/path").is_ok());
    }

    #[test]
    fn term_casting() {
        let node: Result<NamedNode, _> =
            Term::from(NamedNode::new_unchecked("http://example.org/x")).try_into();
        assert!(node.is_ok());
        let literal: Result<NamedNode, _> = Term::from(Literal::from("x")).try_into();
        assert_eq!(
            literal.unwrap_err().to_string(),
            "\"x\" cannot be used as a named node"
        );
    }
}
