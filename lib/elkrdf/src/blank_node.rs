use rand::random;
use std::fmt;
use thiserror::Error;

/// An owned RDF [blank node](https://www.w3.org/TR/rdf11-concepts/#dfn-blank-node).
///
/// The common way to create a fresh blank node is [`BlankNode::default()`],
/// which mints a process-unique random identifier. Two blank nodes are equal
/// only when they carry the same identifier; parsers scope textual labels to
/// one document by mapping each label to a fresh node, so two parses of the
/// same text produce distinct nodes.
///
/// ```
/// use elkrdf::BlankNode;
///
/// assert_eq!("_:a122", BlankNode::new("a122")?.to_string());
/// assert_ne!(BlankNode::default(), BlankNode::default());
/// # Result::<_, elkrdf::BlankNodeIdParseError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct BlankNode {
    id: String,
}

impl BlankNode {
    /// Creates a blank node from an identifier valid per the Turtle grammar.
    pub fn new(id: impl Into<String>) -> Result<Self, BlankNodeIdParseError> {
        let id = id.into();
        validate_blank_node_identifier(&id)?;
        Ok(Self::new_unchecked(id))
    }

    /// Creates a blank node from an identifier without validation.
    #[inline]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The identifier of this blank node.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.id
    }
}

impl Default for BlankNode {
    /// Mints a blank node with a fresh random identifier.
    fn default() -> Self {
        // The id must not start with a digit to stay a valid XML NCName
        // for RDF/XML rdf:nodeID attributes.
        loop {
            let id = format!("{:x}", random::<u128>());
            if matches!(id.as_bytes().first(), Some(b'a'..=b'f')) {
                return Self { id };
            }
        }
    }
}

impl fmt::Display for BlankNode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.id)
    }
}

/// An error raised when a blank node identifier is invalid.
#[derive(Error, Debug, Clone, Copy)]
#[error("the blank node identifier is invalid")]
pub struct BlankNodeIdParseError;

fn validate_blank_node_identifier(id: &str) -> Result<(), BlankNodeIdParseError> {
    let mut chars = id.chars();
    let first = chars.next().ok_or(BlankNodeIdParseError)?;
    if !(first.is_alphanumeric() || first == '_') {
        return Err(BlankNodeIdParseError);
    }
    let mut last = first;
    for c in chars {
        if !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{B7}')) {
            return Err(BlankNodeIdParseError);
        }
        last = c;
    }
    if last == '.' {
        return Err(BlankNodeIdParseError);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(BlankNode::new("a122").is_ok());
        assert!(BlankNode::new("1digit").is_ok());
        assert!(BlankNode::new("has.dot").is_ok());
        assert!(BlankNode::new("").is_err());
        assert!(BlankNode::new("ends.").is_err());
        assert!(BlankNode::new("with space").is_err());
    }

    #[test]
    fn fresh_nodes_are_distinct() {
        let a = BlankNode::default();
        assert_eq!(a, a.clone());
        assert_ne!(a, BlankNode::default());
    }
}
