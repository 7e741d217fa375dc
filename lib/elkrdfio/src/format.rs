use std::fmt;

/// The RDF serialization formats handled by the standard codecs.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
#[non_exhaustive]
pub enum RdfFormat {
    /// [JSON-LD](https://www.w3.org/TR/json-ld/)
    JsonLd,
    /// [N-Quads](https://www.w3.org/TR/n-quads/)
    NQuads,
    /// [N-Triples](https://www.w3.org/TR/n-triples/)
    NTriples,
    /// [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/)
    RdfXml,
    /// [TriG](https://www.w3.org/TR/trig/)
    TriG,
    /// [Turtle](https://www.w3.org/TR/turtle/)
    Turtle,
}

impl RdfFormat {
    /// The format IRI in the [W3C file format registry](https://www.w3.org/ns/formats/).
    #[inline]
    pub const fn iri(self) -> &'static str {
        match self {
            Self::JsonLd => "http://www.w3.org/ns/formats/JSON-LD",
            Self::NQuads => "http://www.w3.org/ns/formats/N-Quads",
            Self::NTriples => "http://www.w3.org/ns/formats/N-Triples",
            Self::RdfXml => "http://www.w3.org/ns/formats/RDF_XML",
            Self::TriG => "http://www.w3.org/ns/formats/TriG",
            Self::Turtle => "http://www.w3.org/ns/formats/Turtle",
        }
    }

    /// The canonical [IANA media type](https://tools.ietf.org/html/rfc2046).
    ///
    /// ```
    /// use elkrdfio::RdfFormat;
    ///
    /// assert_eq!(RdfFormat::NTriples.media_type(), "application/n-triples");
    /// ```
    #[inline]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::JsonLd => "application/ld+json",
            Self::NQuads => "application/n-quads",
            Self::NTriples => "application/n-triples",
            Self::RdfXml => "application/rdf+xml",
            Self::TriG => "application/trig",
            Self::Turtle => "text/turtle",
        }
    }

    /// The usual file extension.
    #[inline]
    pub const fn file_extension(self) -> &'static str {
        match self {
            Self::JsonLd => "jsonld",
            Self::NQuads => "nq",
            Self::NTriples => "nt",
            Self::RdfXml => "rdf",
            Self::TriG => "trig",
            Self::Turtle => "ttl",
        }
    }

    /// The human-readable name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::JsonLd => "JSON-LD",
            Self::NQuads => "N-Quads",
            Self::NTriples => "N-Triples",
            Self::RdfXml => "RDF/XML",
            Self::TriG => "TriG",
            Self::Turtle => "Turtle",
        }
    }

    /// Checks if the format can carry named graphs, not only a single
    /// graph.
    ///
    /// ```
    /// use elkrdfio::RdfFormat;
    ///
    /// assert!(!RdfFormat::Turtle.supports_datasets());
    /// assert!(RdfFormat::TriG.supports_datasets());
    /// ```
    #[inline]
    pub const fn supports_datasets(self) -> bool {
        matches!(self, Self::JsonLd | Self::NQuads | Self::TriG)
    }

    /// Looks up a format from a media type, accepting the common aliases
    /// (`application/xml` for RDF/XML, `text/plain` for N-Triples, …) and
    /// ignoring parameters other than a non-UTF-8 `charset`.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        const SUBTYPES: [(&str, RdfFormat); 13] = [
            ("json", RdfFormat::JsonLd),
            ("ld+json", RdfFormat::JsonLd),
            ("jsonld", RdfFormat::JsonLd),
            ("n-quads", RdfFormat::NQuads),
            ("nquads", RdfFormat::NQuads),
            ("n-triples", RdfFormat::NTriples),
            ("ntriples", RdfFormat::NTriples),
            ("plain", RdfFormat::NTriples),
            ("rdf+xml", RdfFormat::RdfXml),
            ("xml", RdfFormat::RdfXml),
            ("trig", RdfFormat::TriG),
            ("turtle", RdfFormat::Turtle),
            ("ttl", RdfFormat::Turtle),
        ];
        let (type_subtype, parameters) = media_type.split_once(';').unwrap_or((media_type, ""));
        let (r#type, subtype) = type_subtype.split_once('/')?;
        if !r#type.trim().eq_ignore_ascii_case("application")
            && !r#type.trim().eq_ignore_ascii_case("text")
        {
            return None;
        }
        let subtype = subtype.trim();
        let subtype = subtype.strip_prefix("x-").unwrap_or(subtype);
        for parameter in parameters.split(';') {
            if let Some((key, value)) = parameter.split_once('=') {
                if key.trim().eq_ignore_ascii_case("charset")
                    && !matches!(
                        value.trim().to_ascii_lowercase().as_str(),
                        "utf-8" | "utf8" | "ascii"
                    )
                {
                    return None;
                }
            }
        }
        SUBTYPES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(subtype))
            .map(|(_, format)| *format)
    }

    /// Looks up a format from a file extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        const EXTENSIONS: [(&str, RdfFormat); 8] = [
            ("json", RdfFormat::JsonLd),
            ("jsonld", RdfFormat::JsonLd),
            ("nq", RdfFormat::NQuads),
            ("nt", RdfFormat::NTriples),
            ("rdf", RdfFormat::RdfXml),
            ("trig", RdfFormat::TriG),
            ("ttl", RdfFormat::Turtle),
            ("xml", RdfFormat::RdfXml),
        ];
        EXTENSIONS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(extension))
            .map(|(_, format)| *format)
    }

    /// Guesses a format from the document content: JSON documents start
    /// with `{` or `[`, XML with `<?xml`, `<rdf:RDF` or a DOCTYPE;
    /// everything else is the Turtle family (TriG when graph blocks
    /// appear).
    pub fn from_content(content: &str) -> Self {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Self::JsonLd;
        }
        if trimmed.starts_with("<?xml")
            || trimmed.starts_with("<rdf:RDF")
            || trimmed.starts_with("<!DOCTYPE")
        {
            return Self::RdfXml;
        }
        if looks_like_trig(trimmed) {
            return Self::TriG;
        }
        Self::Turtle
    }
}

/// A cheap scan for TriG graph blocks: a `{` outside IRIs, strings and
/// comments.
fn looks_like_trig(content: &str) -> bool {
    let mut in_string = false;
    let mut in_iri = false;
    let mut in_comment = false;
    let mut previous = '\0';
    for c in content.chars() {
        match c {
            '\n' => in_comment = false,
            _ if in_comment => (),
            '"' if previous != '\\' => in_string = !in_string,
            _ if in_string => (),
            '<' => in_iri = true,
            '>' => in_iri = false,
            _ if in_iri => (),
            '#' => in_comment = true,
            '{' => return true,
            _ => (),
        }
        previous = c;
    }
    false
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_lookup() {
        assert_eq!(RdfFormat::from_media_type("foo/bar"), None);
        assert_eq!(RdfFormat::from_media_type("text/csv"), None);
        assert_eq!(
            RdfFormat::from_media_type("text/turtle"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(
            RdfFormat::from_media_type("application/x-turtle"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(
            RdfFormat::from_media_type("text/turtle; charset=utf-8"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(RdfFormat::from_media_type("text/turtle; charset=latin1"), None);
        assert_eq!(
            RdfFormat::from_media_type("application/ld+json"),
            Some(RdfFormat::JsonLd)
        );
        assert_eq!(
            RdfFormat::from_media_type("application/rdf+xml"),
            Some(RdfFormat::RdfXml)
        );
    }

    #[test]
    fn content_sniffing() {
        assert_eq!(RdfFormat::from_content(" {\"@id\": \"x\"}"), RdfFormat::JsonLd);
        assert_eq!(RdfFormat::from_content("[]"), RdfFormat::JsonLd);
        assert_eq!(
            RdfFormat::from_content("<?xml version=\"1.0\"?><rdf:RDF/>"),
            RdfFormat::RdfXml
        );
        assert_eq!(RdfFormat::from_content("<rdf:RDF/>"), RdfFormat::RdfXml);
        assert_eq!(
            RdfFormat::from_content("@prefix ex: <http://e/> ."),
            RdfFormat::Turtle
        );
        assert_eq!(
            RdfFormat::from_content("<http://e/g> { <http://e/s> <http://e/p> 1 . }"),
            RdfFormat::TriG
        );
        // A brace inside a string is not a graph block.
        assert_eq!(
            RdfFormat::from_content("<http://e/s> <http://e/p> \"{\" ."),
            RdfFormat::Turtle
        );
    }

    #[test]
    fn extensions() {
        assert_eq!(RdfFormat::from_extension("ttl"), Some(RdfFormat::Turtle));
        assert_eq!(RdfFormat::from_extension("NT"), Some(RdfFormat::NTriples));
        assert_eq!(RdfFormat::from_extension("exe"), None);
    }
}
