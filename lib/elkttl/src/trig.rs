//! A [TriG](https://www.w3.org/TR/trig/) parser and serializer.

use crate::error::TurtleSyntaxError;
use crate::pretty::{serialize_trig, PrettyOptions};
use crate::relaxations::TurtleRelaxations;
use crate::terse::{ParserConfig, TerseParser};
use elkiri::{Iri, IriParseError, RelativizationPolicy};
use elkrdf::{Dataset, NamespaceMap};

/// A [TriG](https://www.w3.org/TR/trig/) parser.
///
/// TriG is Turtle plus graph blocks: statements inside `name { … }` belong
/// to that named graph, everything else to the default graph.
///
/// ```
/// use elkttl::TriGParser;
///
/// let dataset = TriGParser::new().parse(
///     "@prefix ex: <http://example.org/> .
///      ex:g { ex:s ex:p ex:o . }",
/// )?;
/// assert_eq!(dataset.graph_names().count(), 1);
/// # Result::<_, elkttl::TurtleSyntaxError>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct TriGParser {
    base: Option<Iri>,
    prefixes: Vec<(String, String)>,
    relaxations: TurtleRelaxations,
    source_name: Option<String>,
}

impl TriGParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides the IRI against which relative IRI references are resolved.
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    /// Declares a prefix ahead of parsing.
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

    /// Parses a complete document into a [`Dataset`], stopping at the first
    /// error.
    pub fn parse(self, input: &str) -> Result<Dataset, TurtleSyntaxError> {
        let source_name = self.source_name;
        let quads = TerseParser::new(
            input,
            ParserConfig {
                base: self.base,
                prefixes: self.prefixes,
                relaxations: self.relaxations,
                with_graph_name: true,
            },
        )
        .parse()
        .map_err(|e| e.with_source_name(source_name.as_deref()))?;
        Ok(Dataset::from_quads(quads))
    }
}

/// A [TriG](https://www.w3.org/TR/trig/) serializer.
///
/// Default-graph statements come first, then one block per named graph.
#[derive(Default, Clone)]
#[must_use]
pub struct TriGSerializer {
    options: PrettyOptions,
}

impl TriGSerializer {
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

    pub fn serialize(&self, dataset: &Dataset) -> String {
        serialize_trig(dataset, &self.options)
    }
}
