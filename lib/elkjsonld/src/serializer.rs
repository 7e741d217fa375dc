use elkiri::{Iri, RelativizationPolicy};
use elkrdf::vocab::rdf;
use elkrdf::{Dataset, Graph, Literal, NamedOrBlankNode, NamespaceMap, Term};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// A compacting [JSON-LD](https://www.w3.org/TR/json-ld11/) encoder.
///
/// Subjects are grouped into node objects with `@id`, `@type` and one key
/// per predicate; prefixes actually used end up in the emitted `@context`.
/// A dataset holding exactly one named graph and no default-graph triples
/// becomes a top-level graph object with its own `@id` and `@graph`;
/// otherwise every graph lands under a top-level `@graph` array.
///
/// ```
/// use elkrdf::{Dataset, Graph, Literal, NamedNode, Triple};
/// use elkjsonld::JsonLdSerializer;
///
/// let graph = Graph::new().add(Triple::new(
///     NamedNode::new("http://example.org/alice")?,
///     NamedNode::new("http://xmlns.com/foaf/0.1/name")?,
///     Literal::from("Alice"),
/// ));
/// let out = JsonLdSerializer::new().serialize(&Dataset::from_graph(graph));
/// assert!(out.contains("\"foaf:name\":\"Alice\""));
/// # Result::<_, elkrdf::IriParseError>::Ok(())
/// ```
#[derive(Clone)]
#[must_use]
pub struct JsonLdSerializer {
    namespaces: NamespaceMap,
    base: Option<Iri>,
    pretty: bool,
    include_base_declaration: bool,
    relativization: RelativizationPolicy,
}

impl Default for JsonLdSerializer {
    fn default() -> Self {
        Self {
            namespaces: NamespaceMap::default(),
            base: None,
            pretty: false,
            include_base_declaration: true,
            relativization: RelativizationPolicy::Full,
        }
    }
}

impl JsonLdSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole prefix table; the default is the well-known set.
    pub fn with_namespaces(mut self, namespaces: NamespaceMap) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Registers one prefix, overriding an earlier registration.
    pub fn with_prefix(mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix, iri);
        self
    }

    /// Sets the base IRI, declared as `@base` and used for relativization.
    pub fn with_base_iri(
        mut self,
        base_iri: impl Into<String>,
    ) -> Result<Self, elkiri::IriParseError> {
        self.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Controls whether `@base` is declared; suppressing it also disables
    /// relativization so that the output keeps resolving to the same IRIs.
    pub fn with_base_declaration(mut self, include: bool) -> Self {
        self.include_base_declaration = include;
        self
    }

    /// Controls how aggressively IRIs are shortened against the base.
    pub fn with_relativization(mut self, policy: RelativizationPolicy) -> Self {
        self.relativization = policy;
        self
    }

    pub fn serialize(&self, dataset: &Dataset) -> String {
        let mut encoder = Encoder {
            config: self,
            used_prefixes: BTreeSet::new(),
        };
        let document = encoder.document(dataset);
        if self.pretty {
            serde_json::to_string_pretty(&document).unwrap_or_default()
        } else {
            serde_json::to_string(&document).unwrap_or_default()
        }
    }
}

struct Encoder<'a> {
    config: &'a JsonLdSerializer,
    used_prefixes: BTreeSet<String>,
}

impl Encoder<'_> {
    fn document(&mut self, dataset: &Dataset) -> Value {
        let default_nodes = self.graph_nodes(dataset.default_graph());
        let mut names: Vec<&NamedOrBlankNode> = dataset.graph_names().collect();
        names.sort_by(|a, b| {
            (a.is_blank_node(), a.as_str()).cmp(&(b.is_blank_node(), b.as_str()))
        });

        let mut top = Map::new();
        if default_nodes.is_empty() && names.len() == 1 {
            let name = names[0];
            let nodes = dataset
                .named_graph(name)
                .map(|graph| self.graph_nodes(graph))
                .unwrap_or_default();
            top.insert("@id".to_owned(), Value::String(self.node_ref(name)));
            top.insert("@graph".to_owned(), Value::Array(nodes));
        } else {
            let mut entries = default_nodes;
            for name in names {
                let nodes = dataset
                    .named_graph(name)
                    .map(|graph| self.graph_nodes(graph))
                    .unwrap_or_default();
                entries.push(json!({
                    "@id": self.node_ref(name),
                    "@graph": nodes,
                }));
            }
            top.insert("@graph".to_owned(), Value::Array(entries));
        }

        let mut context = Map::new();
        if self.config.include_base_declaration {
            if let Some(base) = &self.config.base {
                context.insert("@base".to_owned(), Value::String(base.as_str().to_owned()));
            }
        }
        for prefix in &self.used_prefixes {
            if let Some(namespace) = self.config.namespaces.get(prefix) {
                context.insert(prefix.clone(), Value::String(namespace.to_owned()));
            }
        }
        if !context.is_empty() {
            top.insert("@context".to_owned(), Value::Object(context));
        }
        Value::Object(top)
    }

    fn graph_nodes(&mut self, graph: &Graph) -> Vec<Value> {
        let mut subjects: Vec<&NamedOrBlankNode> = graph.subjects().collect();
        subjects.sort_by(|a, b| {
            (a.is_blank_node(), a.as_str()).cmp(&(b.is_blank_node(), b.as_str()))
        });
        let mut nodes = Vec::new();
        for subject in subjects {
            let mut node = Map::new();
            node.insert("@id".to_owned(), Value::String(self.node_ref(subject)));
            let mut types = Vec::new();
            let mut predicates: Vec<&elkrdf::NamedNode> = Vec::new();
            for triple in graph.triples_for_subject(subject) {
                if triple.predicate == rdf::TYPE {
                    if let Term::NamedNode(class) = &triple.object {
                        types.push(Value::String(self.compact(class.as_str())));
                        continue;
                    }
                }
                if !predicates.contains(&&triple.predicate) {
                    predicates.push(&triple.predicate);
                }
            }
            predicates.sort_by_key(|p| p.as_str().to_owned());
            if !types.is_empty() {
                node.insert("@type".to_owned(), unwrap_singleton(types));
            }
            for predicate in predicates {
                let values: Vec<Value> = graph
                    .find(Some(subject), Some(predicate), None)
                    .filter(|t| {
                        !(t.predicate == rdf::TYPE && matches!(t.object, Term::NamedNode(_)))
                    })
                    .map(|t| self.object_value(&t.object))
                    .collect();
                if values.is_empty() {
                    continue;
                }
                let key = self.compact(predicate.as_str());
                node.insert(key, unwrap_singleton(values));
            }
            nodes.push(Value::Object(node));
        }
        nodes
    }

    fn object_value(&mut self, object: &Term) -> Value {
        match object {
            Term::NamedNode(node) => json!({"@id": self.reference(node.as_str())}),
            Term::BlankNode(node) => json!({"@id": format!("_:{}", node.as_str())}),
            Term::Literal(literal) => self.literal_value(literal),
        }
    }

    fn literal_value(&mut self, literal: &Literal) -> Value {
        if let Some(language) = literal.language() {
            return json!({"@value": literal.value(), "@language": language});
        }
        if literal.is_plain() {
            return Value::String(literal.value().to_owned());
        }
        let datatype = self.compact(literal.datatype().as_str());
        json!({"@value": literal.value(), "@type": datatype})
    }

    fn node_ref(&mut self, node: &NamedOrBlankNode) -> String {
        match node {
            NamedOrBlankNode::NamedNode(node) => self.reference(node.as_str()),
            NamedOrBlankNode::BlankNode(node) => format!("_:{}", node.as_str()),
        }
    }

    /// An IRI in `@id` position: compacted, or relativized against the
    /// declared base.
    fn reference(&mut self, iri: &str) -> String {
        self.compact(iri)
    }

    fn compact(&mut self, iri: &str) -> String {
        if let Some((prefix, local)) = self.config.namespaces.split(iri) {
            if !prefix.is_empty() {
                let compacted = format!("{prefix}:{local}");
                self.used_prefixes.insert(prefix.to_owned());
                return compacted;
            }
        }
        // Relativization only applies when @base ends up in the output.
        if self.config.include_base_declaration {
            if let Some(base) = &self.config.base {
                if let Ok(target) = Iri::parse(iri) {
                    if let Some(relative) =
                        base.relativize(&target, self.config.relativization)
                    {
                        return relative;
                    }
                }
            }
        }
        iri.to_owned()
    }
}

fn unwrap_singleton(mut values: Vec<Value>) -> Value {
    if values.len() == 1 {
        values.pop().unwrap_or_default()
    } else {
        Value::Array(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::JsonLdParser;
    use elkrdf::{BlankNode, GraphName, NamedNode, Quad, Triple};
    use std::collections::BTreeMap;

    fn node(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    #[test]
    fn single_named_graph_is_the_top_level_object() {
        let dataset = Dataset::from_quads([Quad::new(
            node("http://ex.org/alice"),
            node("http://xmlns.com/foaf/0.1/name"),
            Literal::from("Alice"),
            node("http://ex.org/g1"),
        )]);
        let out = JsonLdSerializer::new().serialize(&dataset);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["@id"], json!("http://ex.org/g1"));
        assert_eq!(value["@graph"][0]["foaf:name"], json!("Alice"));
        assert_eq!(
            value["@context"]["foaf"],
            json!("http://xmlns.com/foaf/0.1/")
        );

        let reparsed = JsonLdParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.graph_names().count(), 1);
        assert_eq!(
            reparsed
                .named_graph(&node("http://ex.org/g1").into())
                .map(Graph::len),
            Some(1)
        );
    }

    #[test]
    fn datasets_with_default_triples_use_a_graph_array() {
        let dataset = Dataset::from_quads([
            Quad::new(
                node("http://example.org/a"),
                node("http://example.org/p"),
                Literal::from("default"),
                GraphName::DefaultGraph,
            ),
            Quad::new(
                node("http://example.org/a"),
                node("http://example.org/p"),
                Literal::from("named"),
                node("http://example.org/g"),
            ),
        ]);
        let out = JsonLdSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&dataset);
        let reparsed = JsonLdParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.default_graph().len(), 1);
        assert_eq!(reparsed.graph_names().count(), 1);
        assert_eq!(reparsed.len(), 2);
    }

    #[test]
    fn roundtrip_preserves_blank_node_graph_incidence() {
        let shared = BlankNode::default();
        let dataset = Dataset::from_quads([
            Quad::new(
                shared.clone(),
                node("http://example.org/p"),
                Literal::from("in default"),
                GraphName::DefaultGraph,
            ),
            Quad::new(
                shared.clone(),
                node("http://example.org/p"),
                Literal::from("in g"),
                node("http://example.org/g"),
            ),
        ]);
        let out = JsonLdSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&dataset);
        let reparsed = JsonLdParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.len(), 2);

        // The same blank node still spans both graphs.
        let mut incidence: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for quad in reparsed.quads() {
            if let NamedOrBlankNode::BlankNode(b) = &quad.subject {
                incidence
                    .entry(b.as_str().to_owned())
                    .or_default()
                    .push(quad.graph_name.to_string());
            }
        }
        assert_eq!(incidence.len(), 1);
        let graphs = incidence.into_values().next().unwrap();
        assert_eq!(graphs.len(), 2);
    }

    #[test]
    fn typed_and_tagged_literals() {
        let graph = Graph::from_triples([
            Triple::new(
                node("http://example.org/s"),
                rdf::TYPE.into_owned(),
                node("http://example.org/T"),
            ),
            Triple::new(
                node("http://example.org/s"),
                node("http://example.org/age"),
                Literal::new_typed("30", elkrdf::vocab::xsd::INTEGER),
            ),
            Triple::new(
                node("http://example.org/s"),
                node("http://example.org/label"),
                Literal::new_language_tagged("chat", "fr").unwrap(),
            ),
        ]);
        let out = JsonLdSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&Dataset::from_graph(graph.clone()));
        let reparsed = JsonLdParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.default_graph(), &graph);
    }

    #[test]
    fn base_is_declared_and_applied() {
        let graph = Graph::new().add(Triple::new(
            node("http://example.org/dir/item"),
            node("http://purl.org/dc/terms/title"),
            Literal::from("T"),
        ));
        let out = JsonLdSerializer::new()
            .with_base_iri("http://example.org/dir/")
            .unwrap()
            .serialize(&Dataset::from_graph(graph.clone()));
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["@context"]["@base"], json!("http://example.org/dir/"));
        assert_eq!(value["@graph"][0]["@id"], json!("item"));
        let reparsed = JsonLdParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.default_graph(), &graph);
    }
}
