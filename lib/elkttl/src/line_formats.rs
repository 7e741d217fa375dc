//! Strict line-oriented [N-Triples](https://www.w3.org/TR/n-triples/) and
//! [N-Quads](https://www.w3.org/TR/n-quads/) parsers and serializers.

use crate::error::TurtleSyntaxError;
use crate::lexer::{Lexer, LexerMode, Punct, Token, TokenKind};
use crate::relaxations::TurtleRelaxations;
use elkiri::Iri;
use elkrdf::{BlankNode, Dataset, Graph, GraphName, Literal, NamedNode, NamedOrBlankNode, Quad, Term};
use std::collections::HashMap;

/// An [N-Triples](https://www.w3.org/TR/n-triples/) parser: one triple per
/// statement, absolute IRIs only, no prefixes and no sugar.
///
/// ```
/// use elkttl::NTriplesParser;
///
/// let graph = NTriplesParser::new()
///     .parse("<http://example.com/s> <http://example.com/p> \"o\" .")?;
/// assert_eq!(graph.len(), 1);
/// # Result::<_, elkttl::TurtleSyntaxError>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct NTriplesParser {
    source_name: Option<String>,
}

impl NTriplesParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the parsed document in error messages.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn parse(self, input: &str) -> Result<Graph, TurtleSyntaxError> {
        let quads = LineParser::new(input, false)
            .parse()
            .map_err(|e| e.with_source_name(self.source_name.as_deref()))?;
        Ok(Graph::from_triples(quads.into_iter().map(Quad::into_triple)))
    }
}

/// An [N-Quads](https://www.w3.org/TR/n-quads/) parser: N-Triples plus an
/// optional graph name before the final `.`.
#[derive(Default, Clone)]
#[must_use]
pub struct NQuadsParser {
    source_name: Option<String>,
}

impl NQuadsParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the parsed document in error messages.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn parse(self, input: &str) -> Result<Dataset, TurtleSyntaxError> {
        let quads = LineParser::new(input, true)
            .parse()
            .map_err(|e| e.with_source_name(self.source_name.as_deref()))?;
        Ok(Dataset::from_quads(quads))
    }
}

/// An [N-Triples](https://www.w3.org/TR/n-triples/) serializer writing terms
/// in their canonical escaped form, one triple per line.
#[derive(Default, Clone, Copy, Debug)]
#[must_use]
pub struct NTriplesSerializer;

impl NTriplesSerializer {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::unused_self)]
    pub fn serialize(&self, graph: &Graph) -> String {
        let mut out = String::new();
        for triple in graph {
            out.push_str(&triple.to_string());
            out.push_str(" .\n");
        }
        out
    }
}

/// An [N-Quads](https://www.w3.org/TR/n-quads/) serializer.
#[derive(Default, Clone, Copy, Debug)]
#[must_use]
pub struct NQuadsSerializer;

impl NQuadsSerializer {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::unused_self)]
    pub fn serialize(&self, dataset: &Dataset) -> String {
        let mut out = String::new();
        for quad in dataset.quads() {
            out.push_str(&quad.to_string());
            out.push_str(" .\n");
        }
        out
    }
}

struct LineParser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    with_graph_name: bool,
    bnode_labels: HashMap<String, BlankNode>,
}

impl<'a> LineParser<'a> {
    fn new(input: &'a str, with_graph_name: bool) -> Self {
        Self {
            lexer: Lexer::new(input, LexerMode::NTriples, TurtleRelaxations::none()),
            peeked: None,
            with_graph_name,
            bnode_labels: HashMap::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Quad>, TurtleSyntaxError> {
        let mut quads = Vec::new();
        loop {
            let token = self.next()?;
            let subject: NamedOrBlankNode = match token.kind {
                TokenKind::Eof => return Ok(quads),
                TokenKind::IriRef(ref iri) => self.absolute(iri, &token)?.into(),
                TokenKind::BlankNodeLabel(ref label) => self.labeled_bnode(label).into(),
                _ => {
                    return Err(positioned(
                        &token,
                        "an IRI or blank node subject is expected",
                    ))
                }
            };
            let token = self.next()?;
            let predicate = match token.kind {
                TokenKind::IriRef(ref iri) => self.absolute(iri, &token)?,
                _ => return Err(positioned(&token, "an IRI predicate is expected")),
            };
            let object = self.object()?;
            let mut graph_name = GraphName::DefaultGraph;
            if self.with_graph_name {
                let token = self.peek()?.clone();
                match token.kind {
                    TokenKind::IriRef(ref iri) => {
                        graph_name = GraphName::from(self.absolute(iri, &token)?);
                        self.next()?;
                    }
                    TokenKind::BlankNodeLabel(ref label) => {
                        graph_name = GraphName::from(self.labeled_bnode(label));
                        self.next()?;
                    }
                    _ => {}
                }
            }
            let token = self.next()?;
            if !matches!(token.kind, TokenKind::Punct(Punct::Dot)) {
                return Err(positioned(
                    &token,
                    "'.' is expected at the end of the statement",
                ));
            }
            quads.push(Quad::new(subject, predicate, object, graph_name));
        }
    }

    fn object(&mut self) -> Result<Term, TurtleSyntaxError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::IriRef(ref iri) => Ok(self.absolute(iri, &token)?.into()),
            TokenKind::BlankNodeLabel(ref label) => Ok(self.labeled_bnode(label).into()),
            TokenKind::StringLiteral(value) => {
                let suffix = self.peek()?.clone();
                match suffix.kind {
                    TokenKind::LangTag(ref tag) => {
                        self.next()?;
                        Ok(Literal::new_language_tagged(value, tag.clone())
                            .map_err(|e| positioned(&suffix, e.to_string()))?
                            .into())
                    }
                    TokenKind::Punct(Punct::DatatypeMarker) => {
                        self.next()?;
                        let dt_token = self.next()?;
                        if let TokenKind::IriRef(ref iri) = dt_token.kind {
                            let datatype = self.absolute(iri, &dt_token)?;
                            Ok(Literal::new_typed(value, datatype).into())
                        } else {
                            Err(positioned(
                                &dt_token,
                                "a datatype IRI reference is expected after '^^'",
                            ))
                        }
                    }
                    _ => Ok(Literal::from(value).into()),
                }
            }
            _ => Err(positioned(
                &token,
                "an IRI, blank node or literal object is expected",
            )),
        }
    }

    fn peek(&mut self) -> Result<&Token, TurtleSyntaxError> {
        if self.peeked.is_none() {
            let token = self.lexer.next_token()?;
            return Ok(self.peeked.insert(token));
        }
        match &self.peeked {
            Some(token) => Ok(token),
            None => unreachable!("just filled above"),
        }
    }

    fn next(&mut self) -> Result<Token, TurtleSyntaxError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn absolute(&self, iri: &str, token: &Token) -> Result<NamedNode, TurtleSyntaxError> {
        Iri::parse(iri)
            .map(NamedNode::from)
            .map_err(|_| positioned(token, format!("<{iri}> is not an absolute IRI")))
    }

    fn labeled_bnode(&mut self, label: &str) -> BlankNode {
        self.bnode_labels
            .entry(label.to_owned())
            .or_default()
            .clone()
    }
}

fn positioned(token: &Token, message: impl Into<String>) -> TurtleSyntaxError {
    TurtleSyntaxError::new(message, token.position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_serializes_triples() {
        let input = "<http://e/s> <http://e/p> \"a\\nb\"@en .\n_:b <http://e/p> <http://e/o> .\n";
        let graph = NTriplesParser::new().parse(input).unwrap();
        assert_eq!(graph.len(), 2);
        let out = NTriplesSerializer::new().serialize(&graph);
        let reparsed = NTriplesParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.len(), 2);
    }

    #[test]
    fn quads_with_graph_names() {
        let input = "<http://e/s> <http://e/p> \"o\" <http://e/g> .\n<http://e/s> <http://e/p> \"o2\" .\n";
        let dataset = NQuadsParser::new().parse(input).unwrap();
        assert_eq!(dataset.default_graph().len(), 1);
        assert_eq!(dataset.graph_names().count(), 1);
        let out = NQuadsSerializer::new().serialize(&dataset);
        let reparsed = NQuadsParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed.graph_names().count(), 1);
    }

    #[test]
    fn rejects_turtle_sugar() {
        for input in [
            "ex:s <http://e/p> <http://e/o> .",
            "<http://e/s> a <http://e/T> .",
            "<http://e/s> <http://e/p> ( ) .",
            "<relative> <http://e/p> <http://e/o> .",
        ] {
            assert!(NTriplesParser::new().parse(input).is_err(), "{input}");
        }
    }

    #[test]
    fn typed_literals() {
        let graph = NTriplesParser::new()
            .parse("<http://e/s> <http://e/p> \"5\"^^<http://www.w3.org/2001/XMLSchema#integer> .")
            .unwrap();
        let triple = graph.iter().next().unwrap();
        let Term::Literal(literal) = &triple.object else {
            panic!("a literal object is expected");
        };
        assert_eq!(literal.datatype().as_str(), "http://www.w3.org/2001/XMLSchema#integer");
    }
}
