use crate::context::{Context, TermDefinition};
use crate::error::{JsonLdParseError, JsonLdSyntaxError};
use elkiri::Iri;
use elkrdf::vocab::{rdf, xsd};
use elkrdf::{BlankNode, Dataset, GraphName, Literal, NamedNode, NamedOrBlankNode, Quad, Term};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A [JSON-LD](https://www.w3.org/TR/json-ld11/) decoder producing a
/// [`Dataset`].
///
/// The decoder implements a simplified expansion over the JSON tree: the
/// recognized keywords are `@context`, `@id`, `@type`, `@graph`,
/// `@language` and `@value`. `@graph` inside a node object with an `@id`
/// puts the nested nodes into that named graph; a top-level `@graph`
/// without `@id` populates the default graph.
///
/// ```
/// use elkjsonld::JsonLdParser;
///
/// let dataset = JsonLdParser::new().parse(
///     r#"{"@context": {"name": "http://xmlns.com/foaf/0.1/name"},
///         "@id": "http://ex.org/g1",
///         "@graph": [{"@id": "http://ex.org/alice", "name": "Alice"}]}"#,
/// )?;
/// assert_eq!(dataset.graph_names().count(), 1);
/// # Result::<_, elkjsonld::JsonLdParseError>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct JsonLdParser {
    base: Option<Iri>,
}

impl JsonLdParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides the IRI against which relative `@id`s are resolved when no
    /// context `@base` applies.
    pub fn with_base_iri(
        mut self,
        base_iri: impl Into<String>,
    ) -> Result<Self, elkiri::IriParseError> {
        self.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    /// Parses a complete document into a [`Dataset`], stopping at the first
    /// error. Every triple lands in exactly one graph.
    pub fn parse(self, input: &str) -> Result<Dataset, JsonLdParseError> {
        let value: Value = serde_json::from_str(input)?;
        let mut decoder = Decoder {
            base: self.base,
            quads: Vec::new(),
            bnode_labels: HashMap::new(),
        };
        let context = Context::new();
        match &value {
            Value::Array(nodes) => {
                // A top-level array is an implicit @graph.
                for node in nodes {
                    decoder.node_object(node, &context, &GraphName::DefaultGraph)?;
                }
            }
            Value::Object(_) => {
                decoder.node_object(&value, &context, &GraphName::DefaultGraph)?;
            }
            _ => {
                return Err(JsonLdSyntaxError::msg(
                    "the top-level JSON-LD value must be an object or an array",
                )
                .into())
            }
        }
        Ok(Dataset::from_quads(decoder.quads))
    }
}

struct Decoder {
    base: Option<Iri>,
    quads: Vec<Quad>,
    bnode_labels: HashMap<String, BlankNode>,
}

impl Decoder {
    /// Processes one node object, emitting its quads into `graph`, and
    /// returns its subject.
    fn node_object(
        &mut self,
        value: &Value,
        inherited: &Context,
        graph: &GraphName,
    ) -> Result<NamedOrBlankNode, JsonLdParseError> {
        let Value::Object(object) = value else {
            return Err(JsonLdSyntaxError::msg("a node object must be a JSON object").into());
        };
        let mut context = inherited.clone();
        if let Some(context_value) = object.get("@context") {
            context.merge(context_value)?;
        }

        let subject = self.subject_of(object, &context)?;

        if let Some(types) = object.get("@type") {
            for type_value in as_array(types) {
                let Value::String(type_value) = type_value else {
                    return Err(JsonLdSyntaxError::msg("@type values must be strings").into());
                };
                let class = self.node_reference(type_value, &context)?;
                self.quads.push(Quad::new(
                    subject.clone(),
                    rdf::TYPE.into_owned(),
                    Term::from(class),
                    graph.clone(),
                ));
            }
        }

        for (key, value) in object {
            if key.starts_with('@') {
                continue; // keywords are handled separately
            }
            let Some(predicate_iri) = context.expand_iri(key) else {
                continue; // terms without an IRI mapping are dropped
            };
            let definition = context.definition(key).cloned().unwrap_or_default();
            let predicate = NamedNode::new_unchecked(predicate_iri);
            self.property_values(value, &subject, &predicate, &definition, &context, graph)?;
        }

        if let Some(nested) = object.get("@graph") {
            // Nodes nested under @graph belong to the graph named by this
            // node's subject; a top-level @graph without @id keeps filling
            // the surrounding graph.
            let nested_graph = if object.contains_key("@id") {
                GraphName::from(subject.clone())
            } else {
                graph.clone()
            };
            for node in as_array(nested) {
                self.node_object(node, &context, &nested_graph)?;
            }
        }

        Ok(subject)
    }

    fn property_values(
        &mut self,
        value: &Value,
        subject: &NamedOrBlankNode,
        predicate: &NamedNode,
        definition: &TermDefinition,
        context: &Context,
        graph: &GraphName,
    ) -> Result<(), JsonLdParseError> {
        match value {
            Value::Array(values) => {
                for value in values {
                    self.property_values(value, subject, predicate, definition, context, graph)?;
                }
                Ok(())
            }
            Value::Null => Ok(()),
            _ => {
                if let Some(object) = self.value_to_term(value, definition, context, graph)? {
                    self.quads.push(Quad::new(
                        subject.clone(),
                        predicate.clone(),
                        object,
                        graph.clone(),
                    ));
                }
                Ok(())
            }
        }
    }

    fn value_to_term(
        &mut self,
        value: &Value,
        definition: &TermDefinition,
        context: &Context,
        graph: &GraphName,
    ) -> Result<Option<Term>, JsonLdParseError> {
        Ok(match value {
            Value::Null => None,
            Value::Bool(b) => Some(Literal::new_typed(b.to_string(), xsd::BOOLEAN).into()),
            Value::Number(n) => Some(if n.is_i64() || n.is_u64() {
                Literal::new_typed(n.to_string(), xsd::INTEGER).into()
            } else {
                Literal::new_typed(n.to_string(), xsd::DOUBLE).into()
            }),
            Value::String(s) => Some(match (&definition.datatype, &definition.language) {
                (Some(datatype), _) if datatype == "@id" => {
                    Term::from(self.node_reference(s, context)?)
                }
                (Some(datatype), _) => {
                    let datatype = self.expand_datatype(datatype, context)?;
                    Literal::new_typed(s.clone(), datatype).into()
                }
                (None, Some(language)) => Literal::new_language_tagged(s.clone(), language.clone())
                    .map_err(|e| JsonLdSyntaxError::msg(e.to_string()))?
                    .into(),
                (None, None) => Literal::from(s.as_str()).into(),
            }),
            Value::Object(object) if object.contains_key("@value") => {
                Some(self.value_object(object, context)?)
            }
            Value::Object(_) => {
                let nested = self.node_object(value, context, graph)?;
                Some(Term::from(nested))
            }
            Value::Array(_) => {
                return Err(
                    JsonLdSyntaxError::msg("nested arrays are not allowed in JSON-LD").into(),
                )
            }
        })
    }

    fn value_object(
        &mut self,
        object: &Map<String, Value>,
        context: &Context,
    ) -> Result<Term, JsonLdParseError> {
        let value = match object.get("@value") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Null) | None => {
                return Err(JsonLdSyntaxError::msg("@value must carry a scalar value").into())
            }
            Some(_) => {
                return Err(JsonLdSyntaxError::msg("@value must be a scalar").into())
            }
        };
        let datatype = match object.get("@type") {
            Some(Value::String(datatype)) => Some(self.expand_datatype(datatype, context)?),
            Some(_) => return Err(JsonLdSyntaxError::msg("@type must be a string").into()),
            None => None,
        };
        let language = match object.get("@language") {
            Some(Value::String(language)) => Some(language.clone()),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(JsonLdSyntaxError::msg("@language must be a string").into())
            }
        };
        match (datatype, language) {
            (Some(_), Some(_)) => {
                Err(JsonLdSyntaxError::msg("@type and @language cannot be combined").into())
            }
            (Some(datatype), None) => Ok(Literal::new_typed(value, datatype).into()),
            (None, Some(language)) => Ok(Literal::new_language_tagged(value, language)
                .map_err(|e| JsonLdSyntaxError::msg(e.to_string()))?
                .into()),
            (None, None) => Ok(match object.get("@value") {
                Some(Value::Bool(_)) => Literal::new_typed(value, xsd::BOOLEAN).into(),
                Some(Value::Number(n)) if n.is_i64() || n.is_u64() => {
                    Literal::new_typed(value, xsd::INTEGER).into()
                }
                Some(Value::Number(_)) => Literal::new_typed(value, xsd::DOUBLE).into(),
                _ => Literal::from(value).into(),
            }),
        }
    }

    fn subject_of(
        &mut self,
        object: &Map<String, Value>,
        context: &Context,
    ) -> Result<NamedOrBlankNode, JsonLdParseError> {
        match object.get("@id") {
            Some(Value::String(id)) => Ok(self.node_reference(id, context)?),
            Some(_) => Err(JsonLdSyntaxError::msg("@id must be a string").into()),
            None => Ok(BlankNode::default().into()),
        }
    }

    /// Expands an `@id`-position string: a `_:` label, a term, a compact
    /// IRI or a (possibly relative) IRI reference.
    fn node_reference(
        &mut self,
        value: &str,
        context: &Context,
    ) -> Result<NamedOrBlankNode, JsonLdParseError> {
        if let Some(label) = value.strip_prefix("_:") {
            return Ok(self
                .bnode_labels
                .entry(label.to_owned())
                .or_default()
                .clone()
                .into());
        }
        let expanded = context.expand_iri(value);
        let iri = match expanded {
            Some(iri) => iri,
            None => value.to_owned(),
        };
        // Relative references resolve against the context @base, then the
        // parser base.
        if !iri.contains(':') {
            if let Some(base) = context.base() {
                let base = Iri::parse(base)
                    .map_err(|e| JsonLdSyntaxError::msg(e.to_string()))?;
                return Ok(NamedOrBlankNode::from(NamedNode::from(
                    base.resolve(&iri)
                        .map_err(|e| JsonLdSyntaxError::msg(e.to_string()))?,
                )));
            }
            if let Some(base) = &self.base {
                return Ok(NamedOrBlankNode::from(NamedNode::from(
                    base.resolve(&iri)
                        .map_err(|e| JsonLdSyntaxError::msg(e.to_string()))?,
                )));
            }
        }
        NamedNode::new(iri)
            .map(NamedOrBlankNode::from)
            .map_err(|e| JsonLdSyntaxError::msg(e.to_string()).into())
    }

    fn expand_datatype(
        &self,
        datatype: &str,
        context: &Context,
    ) -> Result<NamedNode, JsonLdParseError> {
        let iri = context
            .expand_iri(datatype)
            .unwrap_or_else(|| datatype.to_owned());
        NamedNode::new(iri).map_err(|e| JsonLdSyntaxError::msg(e.to_string()).into())
    }
}

fn as_array(value: &Value) -> &[Value] {
    match value {
        Value::Array(values) => values.as_slice(),
        other => std::slice::from_ref(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    #[test]
    fn named_graphs_partition_triples() {
        let dataset = JsonLdParser::new()
            .parse(
                r#"{"@context":{"name":"http://xmlns.com/foaf/0.1/name"},
 "@id":"http://ex.org/g1","@graph":[{"@id":"http://ex.org/alice","name":"Alice"}]}"#,
            )
            .unwrap();
        assert!(dataset.default_graph().is_empty());
        let names: Vec<_> = dataset.graph_names().collect();
        assert_eq!(names, [&NamedOrBlankNode::from(node("http://ex.org/g1"))]);
        let graph = dataset.named_graph(names[0]).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.contains(&elkrdf::Triple::new(
            node("http://ex.org/alice"),
            node("http://xmlns.com/foaf/0.1/name"),
            Literal::from("Alice"),
        )));
    }

    #[test]
    fn top_level_graph_fills_default() {
        let dataset = JsonLdParser::new()
            .parse(
                r#"{"@context":{"ex":"http://example.org/"},
 "@graph":[{"@id":"ex:a","ex:p":"x"},{"@id":"ex:b","ex:p":"y"}]}"#,
            )
            .unwrap();
        assert_eq!(dataset.default_graph().len(), 2);
        assert_eq!(dataset.graph_names().count(), 0);
    }

    #[test]
    fn json_types_map_to_datatypes() {
        let dataset = JsonLdParser::new()
            .parse(
                r#"{"@context":{"ex":"http://example.org/"},
 "@id":"ex:s","ex:i":42,"ex:d":4.5,"ex:b":true,
 "ex:t":{"@value":"2001-01-01","@type":"http://www.w3.org/2001/XMLSchema#date"},
 "ex:l":{"@value":"chat","@language":"fr"}}"#,
            )
            .unwrap();
        let graph = dataset.default_graph();
        let s = NamedOrBlankNode::from(node("http://example.org/s"));
        let get = |p: &str| {
            graph
                .object_for_subject_predicate(&s, &node(&format!("http://example.org/{p}")))
                .cloned()
        };
        assert_eq!(
            get("i"),
            Some(Literal::new_typed("42", xsd::INTEGER).into())
        );
        assert_eq!(get("d"), Some(Literal::new_typed("4.5", xsd::DOUBLE).into()));
        assert_eq!(
            get("b"),
            Some(Literal::new_typed("true", xsd::BOOLEAN).into())
        );
        assert_eq!(
            get("t"),
            Some(Literal::new_typed("2001-01-01", xsd::DATE).into())
        );
        assert_eq!(
            get("l"),
            Some(Literal::new_language_tagged("chat", "fr").unwrap().into())
        );
    }

    #[test]
    fn type_and_nesting() {
        let dataset = JsonLdParser::new()
            .parse(
                r#"{"@context":{"ex":"http://example.org/","knows":{"@id":"ex:knows"}},
 "@id":"ex:alice","@type":"ex:Person",
 "knows":{"@type":"ex:Person","ex:name":"Bob"}}"#,
            )
            .unwrap();
        let graph = dataset.default_graph();
        assert_eq!(graph.len(), 4);
        let alice = NamedOrBlankNode::from(node("http://example.org/alice"));
        let bob = graph
            .object_for_subject_predicate(&alice, &node("http://example.org/knows"))
            .unwrap();
        assert!(bob.is_blank_node());
    }

    #[test]
    fn blank_node_labels_are_preserved_per_document() {
        let dataset = JsonLdParser::new()
            .parse(
                r#"[{"@id":"_:x","http://e/p":{"@id":"_:y"}},
 {"@id":"_:y","http://e/q":"v"}]"#,
            )
            .unwrap();
        let graph = dataset.default_graph();
        assert_eq!(graph.len(), 2);
        // _:y used twice refers to the same node
        let y_object: Vec<_> = graph
            .iter()
            .filter(|t| t.predicate.as_str() == "http://e/p")
            .map(|t| t.object.clone())
            .collect();
        let y_subject: Vec<_> = graph
            .iter()
            .filter(|t| t.predicate.as_str() == "http://e/q")
            .map(|t| Term::from(t.subject.clone()))
            .collect();
        assert_eq!(y_object, y_subject);
    }

    #[test]
    fn iri_coercion_in_context() {
        let dataset = JsonLdParser::new()
            .parse(
                r#"{"@context":{"ex":"http://example.org/",
  "link":{"@id":"ex:link","@type":"@id"}},
 "@id":"ex:s","link":"ex:o"}"#,
            )
            .unwrap();
        assert!(dataset.default_graph().contains(&elkrdf::Triple::new(
            node("http://example.org/s"),
            node("http://example.org/link"),
            node("http://example.org/o"),
        )));
    }

    #[test]
    fn top_level_scalar_is_an_error() {
        assert!(JsonLdParser::new().parse("42").is_err());
        assert!(JsonLdParser::new().parse("not even json").is_err());
    }
}
