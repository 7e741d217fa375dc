use elkiri::RelativizationPolicy;
use elkrdf::NamespaceMap;
use elkttl::TurtleRelaxations;

/// Options of the Turtle and TriG codecs.
///
/// Converting options of another codec with `from` is lossy: fields the
/// source codec has no notion of keep their defaults (strict relaxations,
/// pretty output, indent 4, generated prefixes on).
#[derive(Debug, Clone)]
pub struct TurtleCodecOptions {
    pub custom_prefixes: NamespaceMap,
    pub relaxations: TurtleRelaxations,
    pub pretty: bool,
    pub indent: usize,
    pub relativization: RelativizationPolicy,
    pub include_base_declaration: bool,
    pub generate_missing_prefixes: bool,
    pub base_iri: Option<String>,
}

impl Default for TurtleCodecOptions {
    fn default() -> Self {
        Self {
            custom_prefixes: NamespaceMap::default(),
            relaxations: TurtleRelaxations::none(),
            pretty: true,
            indent: 4,
            relativization: RelativizationPolicy::Full,
            include_base_declaration: true,
            generate_missing_prefixes: true,
            base_iri: None,
        }
    }
}

/// Options of the JSON-LD codec.
///
/// Converting options of another codec with `from` is lossy: fields the
/// source codec has no notion of keep their defaults.
#[derive(Debug, Clone)]
pub struct JsonLdCodecOptions {
    pub custom_prefixes: NamespaceMap,
    pub pretty: bool,
    pub relativization: RelativizationPolicy,
    pub include_base_declaration: bool,
    pub base_iri: Option<String>,
}

impl Default for JsonLdCodecOptions {
    fn default() -> Self {
        Self {
            custom_prefixes: NamespaceMap::default(),
            pretty: false,
            relativization: RelativizationPolicy::Full,
            include_base_declaration: true,
            base_iri: None,
        }
    }
}

/// Options of the RDF/XML codec.
///
/// Converting options of another codec with `from` is lossy: fields the
/// source codec has no notion of keep their defaults (typed nodes on,
/// two-space indent).
#[derive(Debug, Clone)]
pub struct RdfXmlCodecOptions {
    pub custom_prefixes: NamespaceMap,
    pub pretty: bool,
    pub indent_spaces: usize,
    pub use_typed_nodes: bool,
    pub include_base_declaration: bool,
    pub relativization: RelativizationPolicy,
    pub base_iri: Option<String>,
}

impl Default for RdfXmlCodecOptions {
    fn default() -> Self {
        Self {
            custom_prefixes: NamespaceMap::default(),
            pretty: true,
            indent_spaces: 2,
            use_typed_nodes: true,
            include_base_declaration: true,
            relativization: RelativizationPolicy::Full,
            base_iri: None,
        }
    }
}

impl From<JsonLdCodecOptions> for TurtleCodecOptions {
    fn from(options: JsonLdCodecOptions) -> Self {
        Self {
            custom_prefixes: options.custom_prefixes,
            pretty: options.pretty,
            relativization: options.relativization,
            include_base_declaration: options.include_base_declaration,
            base_iri: options.base_iri,
            ..Self::default()
        }
    }
}

impl From<RdfXmlCodecOptions> for TurtleCodecOptions {
    fn from(options: RdfXmlCodecOptions) -> Self {
        Self {
            custom_prefixes: options.custom_prefixes,
            pretty: options.pretty,
            indent: options.indent_spaces,
            relativization: options.relativization,
            include_base_declaration: options.include_base_declaration,
            base_iri: options.base_iri,
            ..Self::default()
        }
    }
}

impl From<TurtleCodecOptions> for JsonLdCodecOptions {
    fn from(options: TurtleCodecOptions) -> Self {
        Self {
            custom_prefixes: options.custom_prefixes,
            pretty: options.pretty,
            relativization: options.relativization,
            include_base_declaration: options.include_base_declaration,
            base_iri: options.base_iri,
        }
    }
}

impl From<RdfXmlCodecOptions> for JsonLdCodecOptions {
    fn from(options: RdfXmlCodecOptions) -> Self {
        Self {
            custom_prefixes: options.custom_prefixes,
            pretty: options.pretty,
            relativization: options.relativization,
            include_base_declaration: options.include_base_declaration,
            base_iri: options.base_iri,
        }
    }
}

impl From<TurtleCodecOptions> for RdfXmlCodecOptions {
    fn from(options: TurtleCodecOptions) -> Self {
        Self {
            custom_prefixes: options.custom_prefixes,
            pretty: options.pretty,
            indent_spaces: options.indent,
            relativization: options.relativization,
            include_base_declaration: options.include_base_declaration,
            base_iri: options.base_iri,
            ..Self::default()
        }
    }
}

impl From<JsonLdCodecOptions> for RdfXmlCodecOptions {
    fn from(options: JsonLdCodecOptions) -> Self {
        Self {
            custom_prefixes: options.custom_prefixes,
            pretty: options.pretty,
            relativization: options.relativization,
            include_base_declaration: options.include_base_declaration,
            base_iri: options.base_iri,
            ..Self::default()
        }
    }
}

/// The options accepted by the registry entry points: any codec's options.
///
/// A codec receiving options of another codec converts them, filling the
/// unrepresentable fields with defaults.
#[derive(Debug, Clone)]
pub enum CodecOptions {
    Turtle(TurtleCodecOptions),
    JsonLd(JsonLdCodecOptions),
    RdfXml(RdfXmlCodecOptions),
}

impl CodecOptions {
    pub fn turtle(&self) -> TurtleCodecOptions {
        match self {
            Self::Turtle(options) => options.clone(),
            Self::JsonLd(options) => options.clone().into(),
            Self::RdfXml(options) => options.clone().into(),
        }
    }

    pub fn json_ld(&self) -> JsonLdCodecOptions {
        match self {
            Self::Turtle(options) => options.clone().into(),
            Self::JsonLd(options) => options.clone(),
            Self::RdfXml(options) => options.clone().into(),
        }
    }

    pub fn rdf_xml(&self) -> RdfXmlCodecOptions {
        match self {
            Self::Turtle(options) => options.clone().into(),
            Self::JsonLd(options) => options.clone().into(),
            Self::RdfXml(options) => options.clone(),
        }
    }
}

impl From<TurtleCodecOptions> for CodecOptions {
    fn from(options: TurtleCodecOptions) -> Self {
        Self::Turtle(options)
    }
}

impl From<JsonLdCodecOptions> for CodecOptions {
    fn from(options: JsonLdCodecOptions) -> Self {
        Self::JsonLd(options)
    }
}

impl From<RdfXmlCodecOptions> for CodecOptions {
    fn from(options: RdfXmlCodecOptions) -> Self {
        Self::RdfXml(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elkttl::TurtleRelaxation;

    #[test]
    fn conversions_keep_shared_fields_and_default_the_rest() {
        let turtle = TurtleCodecOptions {
            pretty: false,
            relativization: RelativizationPolicy::SameDocument,
            relaxations: TurtleRelaxations::none().with(TurtleRelaxation::MissingFinalDot),
            base_iri: Some("http://example.org/".to_owned()),
            ..TurtleCodecOptions::default()
        };
        let xml = RdfXmlCodecOptions::from(turtle.clone());
        assert!(!xml.pretty);
        assert_eq!(xml.relativization, RelativizationPolicy::SameDocument);
        assert_eq!(xml.base_iri.as_deref(), Some("http://example.org/"));
        assert!(xml.use_typed_nodes); // not representable in Turtle options

        let back = TurtleCodecOptions::from(xml);
        assert!(!back.pretty);
        // Relaxations are a parser concern the XML codec has no notion of.
        assert!(back.relaxations.is_empty());
    }
}
