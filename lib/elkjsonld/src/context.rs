use crate::error::JsonLdSyntaxError;
use serde_json::Value;
use std::collections::HashMap;

const MAX_EXPANSION_DEPTH: usize = 16;

/// One term definition from an `@context` object.
#[derive(Debug, Clone, Default)]
pub(crate) struct TermDefinition {
    pub iri: String,
    /// A datatype IRI, or the `@id` keyword for IRI-coerced values.
    pub datatype: Option<String>,
    pub language: Option<String>,
}

/// The merged view of the active `@context`s.
///
/// String-valued contexts are recorded as opaque references (no remote
/// loading) and contribute no term definitions.
#[derive(Debug, Clone, Default)]
pub(crate) struct Context {
    terms: HashMap<String, TermDefinition>,
    base: Option<String>,
    opaque: Vec<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `@base` declared by a context, if any.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// The IRIs of contexts that were referenced but not loaded.
    #[allow(dead_code)]
    pub fn opaque_references(&self) -> &[String] {
        &self.opaque
    }

    /// Merges one more `@context` value into this context; later
    /// definitions win.
    pub fn merge(&mut self, value: &Value) -> Result<(), JsonLdSyntaxError> {
        match value {
            Value::Null => {
                self.terms.clear();
                self.base = None;
                Ok(())
            }
            Value::String(iri) => {
                self.opaque.push(iri.clone());
                Ok(())
            }
            Value::Array(contexts) => {
                for context in contexts {
                    self.merge(context)?;
                }
                Ok(())
            }
            Value::Object(definitions) => {
                for (term, definition) in definitions {
                    match term.as_str() {
                        "@base" => match definition {
                            Value::String(base) => self.base = Some(base.clone()),
                            Value::Null => self.base = None,
                            _ => {
                                return Err(JsonLdSyntaxError::msg(
                                    "@base must be a string or null",
                                ))
                            }
                        },
                        "@version" | "@vocab" | "@language" => (), // accepted, unused
                        term if term.starts_with('@') => {
                            return Err(JsonLdSyntaxError::msg(format!(
                                "the keyword '{term}' cannot be redefined in a context"
                            )))
                        }
                        _ => {
                            let parsed = Self::term_definition(definition)?;
                            match parsed {
                                Some(parsed) => {
                                    self.terms.insert(term.clone(), parsed);
                                }
                                None => {
                                    self.terms.remove(term);
                                }
                            }
                        }
                    }
                }
                Ok(())
            }
            _ => Err(JsonLdSyntaxError::msg(
                "a @context must be an object, a string, an array or null",
            )),
        }
    }

    fn term_definition(value: &Value) -> Result<Option<TermDefinition>, JsonLdSyntaxError> {
        match value {
            Value::Null => Ok(None),
            Value::String(iri) => Ok(Some(TermDefinition {
                iri: iri.clone(),
                ..TermDefinition::default()
            })),
            Value::Object(map) => {
                let iri = match map.get("@id") {
                    Some(Value::String(iri)) => iri.clone(),
                    Some(_) => {
                        return Err(JsonLdSyntaxError::msg(
                            "@id in a term definition must be a string",
                        ))
                    }
                    None => {
                        return Err(JsonLdSyntaxError::msg(
                            "expanded term definitions need an @id",
                        ))
                    }
                };
                let datatype = match map.get("@type") {
                    Some(Value::String(datatype)) => Some(datatype.clone()),
                    Some(_) => {
                        return Err(JsonLdSyntaxError::msg(
                            "@type in a term definition must be a string",
                        ))
                    }
                    None => None,
                };
                let language = match map.get("@language") {
                    Some(Value::String(language)) => Some(language.clone()),
                    Some(Value::Null) | None => None,
                    Some(_) => {
                        return Err(JsonLdSyntaxError::msg(
                            "@language in a term definition must be a string or null",
                        ))
                    }
                };
                Ok(Some(TermDefinition {
                    iri,
                    datatype,
                    language,
                }))
            }
            _ => Err(JsonLdSyntaxError::msg(
                "a term definition must be a string, an object or null",
            )),
        }
    }

    pub fn definition(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term)
    }

    /// Expands a term, compact IRI or absolute IRI; `None` when the value
    /// has no IRI mapping (the caller then drops or base-resolves it).
    pub fn expand_iri(&self, value: &str) -> Option<String> {
        self.expand_iri_at_depth(value, MAX_EXPANSION_DEPTH)
    }

    fn expand_iri_at_depth(&self, value: &str, depth: usize) -> Option<String> {
        if value.is_empty() || depth == 0 {
            return None;
        }
        if let Some(definition) = self.terms.get(value) {
            return self.expand_iri_at_depth(&definition.iri, depth - 1).or_else(|| {
                definition.iri.contains(':').then(|| definition.iri.clone())
            });
        }
        let (prefix, suffix) = value.split_once(':')?;
        if prefix == "_" {
            return None; // blank node labels are not IRIs
        }
        if let Some(definition) = self.terms.get(prefix) {
            if let Some(namespace) = self.expand_iri_at_depth(&definition.iri, depth - 1) {
                return Some(format!("{namespace}{suffix}"));
            }
            return Some(format!("{}{suffix}", definition.iri));
        }
        Some(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_definitions() {
        let mut context = Context::new();
        context
            .merge(&json!({
                "foaf": "http://xmlns.com/foaf/0.1/",
                "name": "foaf:name",
                "age": {"@id": "foaf:age", "@type": "http://www.w3.org/2001/XMLSchema#integer"}
            }))
            .unwrap();
        assert_eq!(
            context.expand_iri("name").as_deref(),
            Some("http://xmlns.com/foaf/0.1/name")
        );
        assert_eq!(
            context.expand_iri("foaf:mbox").as_deref(),
            Some("http://xmlns.com/foaf/0.1/mbox")
        );
        assert_eq!(
            context.definition("age").and_then(|d| d.datatype.as_deref()),
            Some("http://www.w3.org/2001/XMLSchema#integer")
        );
        assert_eq!(context.expand_iri("unmapped"), None);
        assert_eq!(
            context.expand_iri("http://example.org/x").as_deref(),
            Some("http://example.org/x")
        );
    }

    #[test]
    fn string_contexts_are_opaque() {
        let mut context = Context::new();
        context
            .merge(&json!("http://example.org/context.jsonld"))
            .unwrap();
        assert_eq!(context.opaque_references().len(), 1);
        assert_eq!(context.expand_iri("name"), None);
    }

    #[test]
    fn null_resets() {
        let mut context = Context::new();
        context.merge(&json!({"a": "http://e/a"})).unwrap();
        context.merge(&Value::Null).unwrap();
        assert_eq!(context.expand_iri("a"), None);
    }
}
