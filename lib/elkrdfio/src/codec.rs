use crate::error::{RdfEncodeError, RdfParseError};
use crate::format::RdfFormat;
use crate::options::CodecOptions;
use elkjsonld::{JsonLdParser, JsonLdSerializer};
use elkrdf::{Dataset, Graph};
use elkrdfxml::{RdfXmlParser, RdfXmlSerializer};
use elkttl::{
    NQuadsParser, NQuadsSerializer, NTriplesParser, NTriplesSerializer, TriGParser,
    TriGSerializer, TurtleParser, TurtleSerializer,
};

/// One encoder/decoder pair for a concrete RDF syntax.
///
/// The registry talks to codecs only through this trait, so third-party
/// formats plug in with [`CodecRegistry::add_codec`].
pub trait RdfCodec: Send + Sync {
    /// The format this codec reads and writes.
    fn format(&self) -> RdfFormat;

    /// Checks if this codec serves the given media type.
    fn handles_content_type(&self, content_type: &str) -> bool {
        RdfFormat::from_media_type(content_type) == Some(self.format())
    }

    /// A cheap probe: does the content look like this codec's format?
    fn can_parse(&self, content: &str) -> bool {
        RdfFormat::from_content(content) == self.format()
    }

    /// Decodes into a dataset; formats without named-graph support fill
    /// only the default graph.
    fn decode_dataset(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Dataset, RdfParseError>;

    /// Decodes into a single graph. For dataset formats the graph names
    /// are dropped and every triple lands in the result (flattening).
    fn decode_graph(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Graph, RdfParseError> {
        Ok(self.decode_dataset(content, options)?.flattened())
    }

    /// Encodes a dataset. Codecs for graph-only formats merge the named
    /// graphs into the default graph first (the documented lossy policy).
    fn encode_dataset(
        &self,
        dataset: &Dataset,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError>;

    /// Encodes a single graph.
    fn encode_graph(
        &self,
        graph: &Graph,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        self.encode_dataset(&Dataset::from_graph(graph.clone()), options)
    }
}

/// The content-type-dispatching codec registry.
///
/// ```
/// use elkrdfio::CodecRegistry;
///
/// let registry = CodecRegistry::with_standard_codecs();
/// let graph = registry.decode("<http://e/s> <http://e/p> \"o\" .", Some("text/turtle"))?;
/// assert_eq!(graph.len(), 1);
/// # Result::<_, elkrdfio::RdfParseError>::Ok(())
/// ```
#[derive(Default)]
pub struct CodecRegistry {
    codecs: Vec<Box<dyn RdfCodec>>,
}

impl CodecRegistry {
    /// An empty registry; codecs must be added before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the six standard codecs: Turtle, TriG, JSON-LD,
    /// RDF/XML, N-Triples and N-Quads.
    pub fn with_standard_codecs() -> Self {
        let mut registry = Self::new();
        registry.add_codec(Box::new(TurtleCodec));
        registry.add_codec(Box::new(TriGCodec));
        registry.add_codec(Box::new(JsonLdCodec));
        registry.add_codec(Box::new(RdfXmlCodec));
        registry.add_codec(Box::new(NTriplesCodec));
        registry.add_codec(Box::new(NQuadsCodec));
        registry
    }

    /// Registers a codec; a later registration wins over an earlier one
    /// serving the same content types.
    pub fn add_codec(&mut self, codec: Box<dyn RdfCodec>) {
        self.codecs.push(codec);
    }

    /// Decodes a graph, auto-detecting the format when no content type is
    /// given. Dataset formats are flattened into the default graph.
    pub fn decode(
        &self,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<Graph, RdfParseError> {
        self.decode_with(content, content_type, None)
    }

    pub fn decode_with(
        &self,
        content: &str,
        content_type: Option<&str>,
        options: Option<&CodecOptions>,
    ) -> Result<Graph, RdfParseError> {
        self.decoder_for(content, content_type)?
            .decode_graph(content, options)
    }

    /// Decodes a dataset, auto-detecting the format when no content type
    /// is given.
    pub fn decode_dataset(
        &self,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<Dataset, RdfParseError> {
        self.decode_dataset_with(content, content_type, None)
    }

    pub fn decode_dataset_with(
        &self,
        content: &str,
        content_type: Option<&str>,
        options: Option<&CodecOptions>,
    ) -> Result<Dataset, RdfParseError> {
        self.decoder_for(content, content_type)?
            .decode_dataset(content, options)
    }

    /// Encodes a graph; Turtle when no content type is given.
    pub fn encode(
        &self,
        graph: &Graph,
        content_type: Option<&str>,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        self.encoder_for(content_type, RdfFormat::Turtle)?
            .encode_graph(graph, options)
    }

    /// Encodes a dataset; TriG when no content type is given.
    pub fn encode_dataset(
        &self,
        dataset: &Dataset,
        content_type: Option<&str>,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        self.encoder_for(content_type, RdfFormat::TriG)?
            .encode_dataset(dataset, options)
    }

    fn decoder_for(
        &self,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<&dyn RdfCodec, RdfParseError> {
        if let Some(content_type) = content_type {
            return self
                .by_content_type(content_type)
                .ok_or_else(|| RdfParseError::UnsupportedContentType {
                    content_type: content_type.to_owned(),
                });
        }
        let format = RdfFormat::from_content(content);
        self.by_format(format)
            .or_else(|| {
                self.codecs
                    .iter()
                    .rev()
                    .find(|codec| codec.can_parse(content))
                    .map(|codec| &**codec)
            })
            .ok_or_else(|| RdfParseError::UnsupportedContentType {
                content_type: format.media_type().to_owned(),
            })
    }

    fn encoder_for(
        &self,
        content_type: Option<&str>,
        default_format: RdfFormat,
    ) -> Result<&dyn RdfCodec, RdfEncodeError> {
        match content_type {
            Some(content_type) => self.by_content_type(content_type).ok_or_else(|| {
                RdfEncodeError::UnsupportedContentType {
                    content_type: content_type.to_owned(),
                }
            }),
            None => self.by_format(default_format).ok_or_else(|| {
                RdfEncodeError::UnsupportedContentType {
                    content_type: default_format.media_type().to_owned(),
                }
            }),
        }
    }

    fn by_content_type(&self, content_type: &str) -> Option<&dyn RdfCodec> {
        self.codecs
            .iter()
            .rev()
            .find(|codec| codec.handles_content_type(content_type))
            .map(|codec| &**codec)
    }

    fn by_format(&self, format: RdfFormat) -> Option<&dyn RdfCodec> {
        self.codecs
            .iter()
            .rev()
            .find(|codec| codec.format() == format)
            .map(|codec| &**codec)
    }
}

struct TurtleCodec;

impl RdfCodec for TurtleCodec {
    fn format(&self) -> RdfFormat {
        RdfFormat::Turtle
    }

    fn decode_dataset(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Dataset, RdfParseError> {
        Ok(Dataset::from_graph(self.decode_graph(content, options)?))
    }

    fn decode_graph(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Graph, RdfParseError> {
        let options = options.map(CodecOptions::turtle).unwrap_or_default();
        let mut parser = TurtleParser::new().with_relaxations(options.relaxations);
        if let Some(base) = &options.base_iri {
            parser = parser.with_base_iri(base.clone())?;
        }
        for (prefix, iri) in options.custom_prefixes.iter() {
            parser = parser.with_prefix(prefix, iri);
        }
        Ok(parser.parse(content)?)
    }

    fn encode_dataset(
        &self,
        dataset: &Dataset,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        // Graph-only format: named graphs merge into the default graph.
        self.encode_graph(&dataset.flattened(), options)
    }

    fn encode_graph(
        &self,
        graph: &Graph,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        let options = options.map(CodecOptions::turtle).unwrap_or_default();
        let mut serializer = TurtleSerializer::new()
            .with_namespaces(options.custom_prefixes)
            .with_pretty(options.pretty)
            .with_indent(options.indent)
            .with_relativization(options.relativization)
            .with_base_declaration(options.include_base_declaration)
            .with_generated_prefixes(options.generate_missing_prefixes);
        if let Some(base) = &options.base_iri {
            serializer = serializer.with_base_iri(base.clone())?;
        }
        Ok(serializer.serialize(graph))
    }
}

struct TriGCodec;

impl RdfCodec for TriGCodec {
    fn format(&self) -> RdfFormat {
        RdfFormat::TriG
    }

    fn decode_dataset(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Dataset, RdfParseError> {
        let options = options.map(CodecOptions::turtle).unwrap_or_default();
        let mut parser = TriGParser::new().with_relaxations(options.relaxations);
        if let Some(base) = &options.base_iri {
            parser = parser.with_base_iri(base.clone())?;
        }
        for (prefix, iri) in options.custom_prefixes.iter() {
            parser = parser.with_prefix(prefix, iri);
        }
        Ok(parser.parse(content)?)
    }

    fn encode_dataset(
        &self,
        dataset: &Dataset,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        let options = options.map(CodecOptions::turtle).unwrap_or_default();
        let mut serializer = TriGSerializer::new()
            .with_namespaces(options.custom_prefixes)
            .with_pretty(options.pretty)
            .with_indent(options.indent)
            .with_relativization(options.relativization)
            .with_base_declaration(options.include_base_declaration)
            .with_generated_prefixes(options.generate_missing_prefixes);
        if let Some(base) = &options.base_iri {
            serializer = serializer.with_base_iri(base.clone())?;
        }
        Ok(serializer.serialize(dataset))
    }
}

struct JsonLdCodec;

impl RdfCodec for JsonLdCodec {
    fn format(&self) -> RdfFormat {
        RdfFormat::JsonLd
    }

    fn can_parse(&self, content: &str) -> bool {
        let trimmed = content.trim_start();
        trimmed.starts_with('{') || trimmed.starts_with('[')
    }

    fn decode_dataset(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Dataset, RdfParseError> {
        let options = options.map(CodecOptions::json_ld).unwrap_or_default();
        let mut parser = JsonLdParser::new();
        if let Some(base) = &options.base_iri {
            parser = parser.with_base_iri(base.clone())?;
        }
        Ok(parser.parse(content)?)
    }

    fn encode_dataset(
        &self,
        dataset: &Dataset,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        let options = options.map(CodecOptions::json_ld).unwrap_or_default();
        let mut serializer = JsonLdSerializer::new()
            .with_namespaces(options.custom_prefixes)
            .with_pretty(options.pretty)
            .with_relativization(options.relativization)
            .with_base_declaration(options.include_base_declaration);
        if let Some(base) = &options.base_iri {
            serializer = serializer.with_base_iri(base.clone())?;
        }
        Ok(serializer.serialize(dataset))
    }
}

struct RdfXmlCodec;

impl RdfCodec for RdfXmlCodec {
    fn format(&self) -> RdfFormat {
        RdfFormat::RdfXml
    }

    fn can_parse(&self, content: &str) -> bool {
        let trimmed = content.trim_start();
        trimmed.starts_with("<?xml")
            || trimmed.starts_with("<rdf:RDF")
            || trimmed.starts_with("<!DOCTYPE")
    }

    fn decode_dataset(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Dataset, RdfParseError> {
        Ok(Dataset::from_graph(self.decode_graph(content, options)?))
    }

    fn decode_graph(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Graph, RdfParseError> {
        let options = options.map(CodecOptions::rdf_xml).unwrap_or_default();
        let mut parser = RdfXmlParser::new();
        if let Some(base) = &options.base_iri {
            parser = parser.with_base_iri(base.clone())?;
        }
        Ok(parser.parse(content)?)
    }

    fn encode_dataset(
        &self,
        dataset: &Dataset,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        // Graph-only format: named graphs merge into the default graph.
        self.encode_graph(&dataset.flattened(), options)
    }

    fn encode_graph(
        &self,
        graph: &Graph,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        let options = options.map(CodecOptions::rdf_xml).unwrap_or_default();
        let mut serializer = RdfXmlSerializer::new()
            .with_namespaces(options.custom_prefixes)
            .with_pretty(options.pretty)
            .with_indent_spaces(options.indent_spaces)
            .with_typed_nodes(options.use_typed_nodes)
            .with_base_declaration(options.include_base_declaration)
            .with_relativization(options.relativization);
        if let Some(base) = &options.base_iri {
            serializer = serializer.with_base_iri(base.clone())?;
        }
        Ok(serializer.serialize(graph)?)
    }
}

struct NTriplesCodec;

impl RdfCodec for NTriplesCodec {
    fn format(&self) -> RdfFormat {
        RdfFormat::NTriples
    }

    fn can_parse(&self, content: &str) -> bool {
        looks_line_oriented(content)
    }

    fn decode_dataset(
        &self,
        content: &str,
        options: Option<&CodecOptions>,
    ) -> Result<Dataset, RdfParseError> {
        Ok(Dataset::from_graph(self.decode_graph(content, options)?))
    }

    fn decode_graph(
        &self,
        content: &str,
        _options: Option<&CodecOptions>,
    ) -> Result<Graph, RdfParseError> {
        Ok(NTriplesParser::new().parse(content)?)
    }

    fn encode_dataset(
        &self,
        dataset: &Dataset,
        options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        // Graph-only format: named graphs merge into the default graph.
        self.encode_graph(&dataset.flattened(), options)
    }

    fn encode_graph(
        &self,
        graph: &Graph,
        _options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        Ok(NTriplesSerializer::new().serialize(graph))
    }
}

struct NQuadsCodec;

impl RdfCodec for NQuadsCodec {
    fn format(&self) -> RdfFormat {
        RdfFormat::NQuads
    }

    fn can_parse(&self, content: &str) -> bool {
        looks_line_oriented(content)
    }

    fn decode_dataset(
        &self,
        content: &str,
        _options: Option<&CodecOptions>,
    ) -> Result<Dataset, RdfParseError> {
        Ok(NQuadsParser::new().parse(content)?)
    }

    fn encode_dataset(
        &self,
        dataset: &Dataset,
        _options: Option<&CodecOptions>,
    ) -> Result<String, RdfEncodeError> {
        Ok(NQuadsSerializer::new().serialize(dataset))
    }
}

/// True when every non-empty line looks like an N-Triples/N-Quads
/// statement: a `<`, `_:` or comment start, ending in `.`.
fn looks_line_oriented(content: &str) -> bool {
    let mut statements = 0;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !(line.starts_with('<') || line.starts_with("_:")) || !line.ends_with('.') {
            return false;
        }
        statements += 1;
    }
    statements > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use elkrdf::{Literal, NamedNode, Quad, Triple};

    fn node(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    #[test]
    fn dispatches_on_content_type() {
        let registry = CodecRegistry::with_standard_codecs();
        let turtle = "<http://e/s> <http://e/p> \"o\" .";
        assert_eq!(registry.decode(turtle, Some("text/turtle")).unwrap().len(), 1);
        assert_eq!(
            registry
                .decode(turtle, Some("application/n-triples"))
                .unwrap()
                .len(),
            1
        );
        assert!(matches!(
            registry.decode(turtle, Some("text/csv")),
            Err(RdfParseError::UnsupportedContentType { .. })
        ));
    }

    #[test]
    fn auto_detects_formats() {
        let registry = CodecRegistry::with_standard_codecs();
        let turtle = "@prefix ex: <http://e/> . ex:s ex:p ex:o .";
        let json = r#"{"@id": "http://e/s", "http://e/p": "o"}"#;
        let xml = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:ex="http://e/">
  <rdf:Description rdf:about="http://e/s"><ex:p>o</ex:p></rdf:Description>
</rdf:RDF>"#;
        let trig = "<http://e/g> { <http://e/s> <http://e/p> \"o\" . }";
        assert_eq!(registry.decode(turtle, None).unwrap().len(), 1);
        assert_eq!(registry.decode(json, None).unwrap().len(), 1);
        assert_eq!(registry.decode(xml, None).unwrap().len(), 1);
        let dataset = registry.decode_dataset(trig, None).unwrap();
        assert_eq!(dataset.graph_names().count(), 1);
        // Graph-level decoding flattens named graphs.
        assert_eq!(registry.decode(trig, None).unwrap().len(), 1);
    }

    #[test]
    fn encodes_with_defaults() {
        let registry = CodecRegistry::with_standard_codecs();
        let graph = Graph::new().add(Triple::new(
            node("http://e/s"),
            node("http://e/p"),
            Literal::from("o"),
        ));
        let turtle = registry.encode(&graph, None, None).unwrap();
        assert!(turtle.contains("\"o\""), "{turtle}");
        let dataset = Dataset::from_quads([Quad::new(
            node("http://e/s"),
            node("http://e/p"),
            Literal::from("o"),
            node("http://e/g"),
        )]);
        let trig = registry.encode_dataset(&dataset, None, None).unwrap();
        assert!(trig.contains('{'), "{trig}");
        let jsonld = registry
            .encode_dataset(&dataset, Some("application/ld+json"), None)
            .unwrap();
        assert!(jsonld.starts_with('{'), "{jsonld}");
        // Encoding a dataset into a graph-only format merges the graphs.
        let ntriples = registry
            .encode_dataset(&dataset, Some("application/n-triples"), None)
            .unwrap();
        assert!(ntriples.contains("<http://e/s> <http://e/p> \"o\" ."), "{ntriples}");
        assert!(!ntriples.contains("http://e/g"), "{ntriples}");
    }

    #[test]
    fn custom_codecs_take_precedence() {
        struct UpperCaseTurtle;
        impl RdfCodec for UpperCaseTurtle {
            fn format(&self) -> RdfFormat {
                RdfFormat::Turtle
            }
            fn decode_dataset(
                &self,
                content: &str,
                options: Option<&CodecOptions>,
            ) -> Result<Dataset, RdfParseError> {
                Ok(Dataset::from_graph(self.decode_graph(content, options)?))
            }
            fn decode_graph(
                &self,
                content: &str,
                _options: Option<&CodecOptions>,
            ) -> Result<Graph, RdfParseError> {
                Ok(TurtleParser::new().parse(&content.to_lowercase())?)
            }
            fn encode_dataset(
                &self,
                _dataset: &Dataset,
                _options: Option<&CodecOptions>,
            ) -> Result<String, RdfEncodeError> {
                Ok("CUSTOM".to_owned())
            }
        }
        let mut registry = CodecRegistry::with_standard_codecs();
        registry.add_codec(Box::new(UpperCaseTurtle));
        let out = registry
            .encode(&Graph::new(), Some("text/turtle"), None)
            .unwrap();
        assert_eq!(out, "CUSTOM");
    }
}
