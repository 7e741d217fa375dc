use std::collections::BTreeMap;
use std::fmt;

/// The well-known prefixes seeded into [`NamespaceMap::default()`] and used
/// by the `auto-add-common-prefixes` parsing relaxation.
pub(crate) const WELL_KNOWN: [(&str, &str); 8] = [
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("dc", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("schema", "https://schema.org/"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
];

/// A bidirectional prefix ↔ namespace-IRI registry.
///
/// Namespace IRIs used for compaction should end in `/` or `#`. Registering
/// the same prefix twice keeps the last value; at most one prefix is used
/// per namespace when serializing (the longest-namespace match wins during
/// compaction).
///
/// ```
/// use elkrdf::NamespaceMap;
///
/// let namespaces = NamespaceMap::default();
/// assert_eq!(
///     namespaces.expand("foaf:name").as_deref(),
///     Some("http://xmlns.com/foaf/0.1/name")
/// );
/// assert_eq!(
///     namespaces.split("http://xmlns.com/foaf/0.1/name"),
///     Some(("foaf", "name"))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceMap {
    prefix_to_iri: BTreeMap<String, String>,
}

impl NamespaceMap {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self {
            prefix_to_iri: BTreeMap::new(),
        }
    }

    /// Creates a mapping from explicit pairs; later pairs win on prefix
    /// collision.
    pub fn custom(
        mappings: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        Self {
            prefix_to_iri: mappings
                .into_iter()
                .map(|(prefix, iri)| (prefix.into(), iri.into()))
                .collect(),
        }
    }

    /// Returns this mapping extended with one more entry.
    #[must_use]
    pub fn with(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.insert(prefix, iri);
        self
    }

    /// Registers a prefix; the last registration for a prefix wins.
    pub fn insert(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefix_to_iri.insert(prefix.into(), iri.into());
    }

    /// The namespace IRI registered for `prefix`.
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefix_to_iri.get(prefix).map(String::as_str)
    }

    /// Expands a `prefix:local` name into a full IRI.
    pub fn expand(&self, prefixed_name: &str) -> Option<String> {
        let (prefix, local) = prefixed_name.split_once(':')?;
        Some(format!("{}{local}", self.get(prefix)?))
    }

    /// The registered prefix whose namespace is the longest prefix of `iri`.
    pub fn prefix_for(&self, iri: &str) -> Option<&str> {
        self.split(iri).map(|(prefix, _)| prefix)
    }

    /// Splits an IRI into (prefix, local part) using the longest matching
    /// registered namespace.
    pub fn split<'a>(&self, iri: &'a str) -> Option<(&str, &'a str)> {
        self.prefix_to_iri
            .iter()
            .filter(|(_, namespace)| !namespace.is_empty() && iri.starts_with(namespace.as_str()))
            .max_by_key(|(_, namespace)| namespace.len())
            .map(|(prefix, namespace)| (prefix.as_str(), &iri[namespace.len()..]))
    }

    /// All registered (prefix, namespace) pairs in prefix order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefix_to_iri
            .iter()
            .map(|(prefix, iri)| (prefix.as_str(), iri.as_str()))
    }

    pub fn len(&self) -> usize {
        self.prefix_to_iri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix_to_iri.is_empty()
    }

    /// Looks up a well-known namespace (rdf, rdfs, owl, xsd, dc, foaf,
    /// schema, skos) by prefix.
    pub fn well_known(prefix: &str) -> Option<&'static str> {
        WELL_KNOWN
            .iter()
            .find(|(known, _)| *known == prefix)
            .map(|(_, iri)| *iri)
    }
}

impl Default for NamespaceMap {
    /// A mapping seeded with the well-known prefixes.
    fn default() -> Self {
        Self::custom(WELL_KNOWN)
    }
}

impl Extend<(String, String)> for NamespaceMap {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        for (prefix, iri) in iter {
            self.insert(prefix, iri);
        }
    }
}

impl fmt::Display for NamespaceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (prefix, iri) in self.iter() {
            writeln!(f, "{prefix}: <{iri}>")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_namespace_wins() {
        let namespaces = NamespaceMap::new()
            .with("ex", "http://example.org/")
            .with("voc", "http://example.org/voc/");
        assert_eq!(
            namespaces.split("http://example.org/voc/Person"),
            Some(("voc", "Person"))
        );
        assert_eq!(
            namespaces.split("http://example.org/other"),
            Some(("ex", "other"))
        );
        assert_eq!(namespaces.split("http://elsewhere.org/x"), None);
        assert_eq!(namespaces.prefix_for("http://example.org/voc/y"), Some("voc"));
    }

    #[test]
    fn expand_prefixed_names() {
        let namespaces = NamespaceMap::default().with("", "http://base.example/");
        assert_eq!(
            namespaces.expand(":local").as_deref(),
            Some("http://base.example/local")
        );
        assert_eq!(
            namespaces.expand("xsd:int").as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#int")
        );
        assert_eq!(namespaces.expand("nope:x"), None);
        assert_eq!(namespaces.expand("nocolon"), None);
    }

    #[test]
    fn last_registration_wins() {
        let namespaces = NamespaceMap::new()
            .with("ex", "http://one.example/")
            .with("ex", "http://two.example/");
        assert_eq!(namespaces.get("ex"), Some("http://two.example/"));
        assert_eq!(namespaces.len(), 1);
    }
}
