//! A [Turtle](https://www.w3.org/TR/turtle/) parser and serializer.

use crate::error::TurtleSyntaxError;
use crate::pretty::{serialize_turtle, PrettyOptions};
use crate::relaxations::TurtleRelaxations;
use crate::terse::{ParserConfig, TerseParser};
use elkiri::{Iri, IriParseError, RelativizationPolicy};
use elkrdf::{Graph, NamespaceMap, Quad};

/// A [Turtle](https://www.w3.org/TR/turtle/) parser.
///
/// Parsers are single-use: build one, configure it, and consume it on one
/// input string.
///
/// ```
/// use elkttl::TurtleParser;
///
/// let graph = TurtleParser::new().parse(
///     "@prefix foaf: <http://xmlns.com/foaf/0.1/> .
///      <http://example.com/#me> foaf:name \"Foo Bar\"@en .",
/// )?;
/// assert_eq!(graph.len(), 1);
/// # Result::<_, elkttl::TurtleSyntaxError>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct TurtleParser {
    base: Option<Iri>,
    prefixes: Vec<(String, String)>,
    relaxations: TurtleRelaxations,
    source_name: Option<String>,
}

impl TurtleParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides the IRI against which relative IRI references are resolved.
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    /// Declares a prefix ahead of parsing, as if the document carried the
    /// matching `@prefix` line.
    pub fn with_prefix(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.prefixes.push((prefix.into(), iri.into()));
        self
    }

    /// Enables a set of grammar relaxations; strict parsing is the default.
    pub fn with_relaxations(mut self, relaxations: TurtleRelaxations) -> Self {
        self.relaxations = relaxations;
        self
    }

    /// Names the parsed document in error messages.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    /// Parses a complete document into a [`Graph`], stopping at the first
    /// error.
    pub fn parse(self, input: &str) -> Result<Graph, TurtleSyntaxError> {
        let source_name = self.source_name;
        let quads = TerseParser::new(
            input,
            ParserConfig {
                base: self.base,
                prefixes: self.prefixes,
                relaxations: self.relaxations,
                with_graph_name: false,
            },
        )
        .parse()
        .map_err(|e| e.with_source_name(source_name.as_deref()))?;
        Ok(Graph::from_triples(quads.into_iter().map(Quad::into_triple)))
    }
}

/// A [Turtle](https://www.w3.org/TR/turtle/) serializer producing compact,
/// prefix-aware output.
///
/// ```
/// use elkrdf::{Graph, Literal, NamedNode, Triple};
/// use elkttl::TurtleSerializer;
///
/// let graph = Graph::new().add(Triple::new(
///     NamedNode::new("http://example.com/s")?,
///     NamedNode::new("http://purl.org/dc/terms/title")?,
///     Literal::from("T"),
/// ));
/// let out = TurtleSerializer::new().serialize(&graph);
/// assert!(out.contains("@prefix dc: <http://purl.org/dc/terms/> ."));
/// assert!(out.contains("dc:title \"T\""));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct TurtleSerializer {
    options: PrettyOptions,
}

impl TurtleSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole prefix table; the default is the well-known set.
    pub fn with_namespaces(mut self, namespaces: NamespaceMap) -> Self {
        self.options.namespaces = namespaces;
        self
    }

    /// Registers one prefix, overriding an earlier registration.
    pub fn with_prefix(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.options.namespaces.insert(prefix, iri);
        self
    }

    /// Sets the base IRI used for relativization and the `@base` header.
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.options.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    /// Disables subject grouping and blank-node/list sugar; one statement
    /// per line.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.options.pretty = pretty;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.options.indent = indent;
        self
    }

    /// Controls how aggressively IRIs are shortened against the base.
    pub fn with_relativization(mut self, policy: RelativizationPolicy) -> Self {
        self.options.relativization = policy;
        self
    }

    /// Controls whether the `@base` directive is written when a base is set.
    pub fn with_base_declaration(mut self, include: bool) -> Self {
        self.options.include_base_declaration = include;
        self
    }

    /// Controls whether namespaces without a registered prefix get a
    /// generated `nsN` prefix instead of absolute IRIs.
    pub fn with_generated_prefixes(mut self, generate: bool) -> Self {
        self.options.generate_missing_prefixes = generate;
        self
    }

    pub fn serialize(&self, graph: &Graph) -> String {
        serialize_turtle(graph, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relaxations::TurtleRelaxation;
    use elkrdf::vocab::rdf;
    use elkrdf::{Literal, NamedNode, NamedOrBlankNode, Term, Triple};

    fn ex(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{s}"))
    }

    #[test]
    fn parses_collections_into_first_rest_chains() {
        let graph = TurtleParser::new()
            .parse(
                "@prefix ex: <http://example.org/> .
                 ex:subj1 ex:prop1 ( \"item1\" \"item2\" ) .",
            )
            .unwrap();
        assert_eq!(graph.len(), 5);
        let subject = NamedOrBlankNode::from(ex("subj1"));
        let prop = ex("prop1");
        let head = graph
            .object_for_subject_predicate(&subject, &prop)
            .unwrap()
            .clone();
        let Term::BlankNode(head) = head else {
            panic!("the collection head must be a blank node");
        };
        let head = NamedOrBlankNode::from(head);
        assert_eq!(
            graph
                .object_for_subject_predicate(&head, &rdf::FIRST.into_owned())
                .unwrap(),
            &Term::from(Literal::from("item1"))
        );
        let Some(Term::BlankNode(second)) =
            graph.object_for_subject_predicate(&head, &rdf::REST.into_owned())
        else {
            panic!("rdf:rest must link to the second node");
        };
        let second = NamedOrBlankNode::from(second.clone());
        assert_eq!(
            graph
                .object_for_subject_predicate(&second, &rdf::REST.into_owned())
                .unwrap(),
            &Term::from(rdf::NIL.into_owned())
        );
    }

    #[test]
    fn collection_roundtrip_uses_sugar() {
        let input = "@prefix ex: <http://example.org/> .
            ex:subj1 ex:prop1 ( \"item1\" \"item2\" ) .";
        let graph = TurtleParser::new().parse(input).unwrap();
        let out = TurtleSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&graph);
        assert!(out.contains("( \"item1\" \"item2\" )"), "{out}");
        let reparsed = TurtleParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.len(), graph.len());
    }

    #[test]
    fn inline_blank_nodes() {
        let input = "@prefix ex: <http://example.org/> .
            ex:s ex:knows [ ex:name \"Anna\" ] .";
        let graph = TurtleParser::new().parse(input).unwrap();
        assert_eq!(graph.len(), 2);
        let out = TurtleSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&graph);
        assert!(out.contains("[ ex:name \"Anna\" ]"), "{out}");
        let reparsed = TurtleParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.len(), 2);
    }

    #[test]
    fn shared_blank_nodes_get_labels() {
        let input = "@prefix ex: <http://example.org/> .
            ex:a ex:p _:shared . ex:b ex:p _:shared . _:shared ex:name \"x\" .";
        let graph = TurtleParser::new().parse(input).unwrap();
        let out = TurtleSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&graph);
        assert!(out.contains("_:"), "{out}");
        assert!(!out.contains('['), "{out}");
        let reparsed = TurtleParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.len(), 3);
    }

    #[test]
    fn relativizes_base_to_empty_reference() {
        let graph = Graph::new().add(Triple::new(
            NamedNode::new_unchecked("http://example.org/resource"),
            NamedNode::new_unchecked("http://purl.org/dc/terms/title"),
            Literal::from("T"),
        ));
        let out = TurtleSerializer::new()
            .with_base_iri("http://example.org/resource")
            .unwrap()
            .serialize(&graph);
        assert!(out.contains("<> dc:title \"T\""), "{out}");
        assert!(!out.contains("</>"), "{out}");
        assert!(out.contains("@base <http://example.org/resource> ."), "{out}");
    }

    #[test]
    fn relaxed_directives() {
        let input = "prefix ex: <http://x/>\nex:s ex:p ex:o .";
        let strict = TurtleParser::new().parse(input);
        let err = strict.unwrap_err();
        assert_eq!(err.position().line, 0);
        assert!(err.to_string().starts_with("Format error:"), "{err}");

        let relaxed = TurtleParser::new()
            .with_relaxations(
                TurtleRelaxations::none()
                    .with(TurtleRelaxation::PrefixWithoutAtSign)
                    .with(TurtleRelaxation::MissingDotAfterPrefix),
            )
            .parse(input)
            .unwrap();
        assert_eq!(relaxed.len(), 1);
        assert!(relaxed.contains(&Triple::new(
            NamedNode::new_unchecked("http://x/s"),
            NamedNode::new_unchecked("http://x/p"),
            NamedNode::new_unchecked("http://x/o"),
        )));
    }

    #[test]
    fn missing_final_dot_relaxation() {
        let input = "@prefix ex: <http://example.org/> .\nex:s ex:p ex:o";
        assert!(TurtleParser::new().parse(input).is_err());
        let graph = TurtleParser::new()
            .with_relaxations(TurtleRelaxations::none().with(TurtleRelaxation::MissingFinalDot))
            .parse(input)
            .unwrap();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn auto_add_common_prefixes_relaxation() {
        let input = "<http://example.org/s> foaf:name \"Alice\" .";
        assert!(TurtleParser::new().parse(input).is_err());
        let graph = TurtleParser::new()
            .with_relaxations(
                TurtleRelaxations::none().with(TurtleRelaxation::AutoAddCommonPrefixes),
            )
            .parse(input)
            .unwrap();
        assert!(graph.contains(&Triple::new(
            NamedNode::new_unchecked("http://example.org/s"),
            NamedNode::new_unchecked("http://xmlns.com/foaf/0.1/name"),
            Literal::from("Alice"),
        )));
    }

    #[test]
    fn undeclared_prefix_is_a_positioned_error() {
        let err = TurtleParser::new()
            .with_source_name("data.ttl")
            .parse("ex:s ex:p ex:o .")
            .unwrap_err();
        assert!(err.message().contains("'ex:'"), "{err}");
        assert_eq!(err.source_name(), Some("data.ttl"));
        assert!(err.to_string().contains("data.ttl:1:1"), "{err}");
    }

    #[test]
    fn base_and_relative_iris() {
        let graph = TurtleParser::new()
            .parse("@base <http://example.org/dir/> . <child> <#prop> <../up> .")
            .unwrap();
        assert!(graph.contains(&Triple::new(
            NamedNode::new_unchecked("http://example.org/dir/child"),
            NamedNode::new_unchecked("http://example.org/dir/#prop"),
            NamedNode::new_unchecked("http://example.org/up"),
        )));
    }

    #[test]
    fn numbers_and_booleans() {
        let graph = TurtleParser::new()
            .with_base_iri("http://example.org/")
            .unwrap()
            .parse("<s> <p> 42, 4.2, 4.2e1, true .")
            .unwrap();
        assert_eq!(graph.len(), 4);
        let out = TurtleSerializer::new().serialize(&graph);
        for token in ["42", "4.2", "4.2e1", "true"] {
            assert!(out.contains(token), "{token} missing in {out}");
        }
    }

    #[test]
    fn strict_output_reparses_strictly() {
        let input = "@prefix ex: <http://example.org/> .
            ex:s a ex:T ; ex:p \"x\"@en, 5 ; ex:q [ ex:r ( ex:a ex:b ) ] .";
        let graph = TurtleParser::new().parse(input).unwrap();
        let out = TurtleSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&graph);
        let reparsed = TurtleParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.len(), graph.len());
        let again = TurtleSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&reparsed);
        assert_eq!(out, again);
    }
}
