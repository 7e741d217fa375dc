use crate::error::{RdfXmlParseError, RdfXmlSyntaxError};
use elkiri::Iri;
use elkrdf::vocab::rdf;
use elkrdf::{BlankNode, Graph, Literal, NamedNode, NamedOrBlankNode, Term, Triple};
use quick_xml::escape::unescape_with;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::collections::{HashMap, HashSet};

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// An [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) parser.
///
/// DOCTYPE `<!ENTITY …>` declarations are collected up front and every
/// `&name;` reference in IRIs and literals is expanded before terms are
/// built. `xml:base` and `xml:lang` scope over the subtree of the element
/// carrying them.
///
/// ```
/// use elkrdfxml::RdfXmlParser;
///
/// let graph = RdfXmlParser::new().parse(
///     r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
///              xmlns:dc="http://purl.org/dc/terms/">
///   <rdf:Description rdf:about="http://example.com/doc">
///     <dc:title>A doc</dc:title>
///   </rdf:Description>
/// </rdf:RDF>"#,
/// )?;
/// assert_eq!(graph.len(), 1);
/// # Result::<_, elkrdfxml::RdfXmlParseError>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct RdfXmlParser {
    base: Option<Iri>,
    source_name: Option<String>,
}

impl RdfXmlParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provides the IRI used to resolve relative references when the
    /// document carries no `xml:base`.
    pub fn with_base_iri(
        mut self,
        base_iri: impl Into<String>,
    ) -> Result<Self, elkiri::IriParseError> {
        self.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    /// Names the parsed document in error messages.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    /// Parses a complete document into a [`Graph`], stopping at the first
    /// error.
    pub fn parse(self, input: &str) -> Result<Graph, RdfXmlParseError> {
        let mut reader = NsReader::from_str(input);
        reader.config_mut().expand_empty_elements = true;
        let mut state = ReaderState {
            input,
            source_name: self.source_name,
            frames: vec![Frame {
                kind: FrameKind::Rdf,
                scope: Scope {
                    base: self.base,
                    language: None,
                },
            }],
            triples: Vec::new(),
            entities: HashMap::new(),
            bnode_labels: HashMap::new(),
            known_ids: HashSet::new(),
        };
        loop {
            match reader.read_event()? {
                Event::Start(event) => state.handle_start(&event, &reader)?,
                Event::End(event) => state.handle_end(event.name().as_ref(), &reader)?,
                Event::Empty(_) => {
                    return Err(RdfXmlSyntaxError::msg(
                        "the expand_empty_elements option must be enabled",
                    )
                    .into())
                }
                Event::Text(event) => state.handle_text(&event, &reader)?,
                Event::CData(event) => {
                    let event = event.escape().map_err(quick_xml::Error::from)?;
                    state.handle_text(&event, &reader)?;
                }
                Event::DocType(event) => state.handle_doctype(&event, &reader)?,
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) => (),
                Event::Eof => break,
            }
        }
        if state.frames.len() > 1 {
            return Err(RdfXmlParseError::Syntax(
                RdfXmlSyntaxError::msg("unexpected end of file inside an element")
                    .with_source_name(state.source_name.as_deref()),
            ));
        }
        Ok(Graph::from_triples(state.triples))
    }
}

#[derive(Clone)]
struct Scope {
    base: Option<Iri>,
    language: Option<String>,
}

struct Frame {
    kind: FrameKind,
    scope: Scope,
}

enum FrameKind {
    /// The document root or the inside of `rdf:RDF`.
    Rdf,
    /// Inside a node element; children are property elements.
    Node { subject: NamedOrBlankNode },
    /// Inside a property element.
    Property {
        subject: NamedOrBlankNode,
        predicate: NamedNode,
        datatype: Option<NamedNode>,
        content: PropertyContent,
    },
    /// Inside `rdf:parseType="Collection"`.
    Collection {
        subject: NamedOrBlankNode,
        predicate: NamedNode,
        items: Vec<NamedOrBlankNode>,
    },
    /// Inside `rdf:parseType="Literal"`.
    XmlLiteral {
        subject: NamedOrBlankNode,
        predicate: NamedNode,
        depth: usize,
        content: String,
    },
}

enum PropertyContent {
    Empty,
    Text(String),
    /// The object was produced by an attribute or a nested node element.
    Done,
}

struct ReaderState<'a> {
    input: &'a str,
    source_name: Option<String>,
    frames: Vec<Frame>,
    triples: Vec<Triple>,
    entities: HashMap<String, String>,
    bnode_labels: HashMap<String, BlankNode>,
    known_ids: HashSet<String>,
}

impl ReaderState<'_> {
    fn handle_start(
        &mut self,
        event: &BytesStart<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<(), RdfXmlParseError> {
        if matches!(
            self.frames.last(),
            Some(Frame {
                kind: FrameKind::XmlLiteral { .. },
                ..
            })
        ) {
            return self.xml_literal_start(event, reader);
        }

        let tag_iri = self.element_iri(event, reader)?;
        match self.frames.last() {
            Some(Frame {
                kind: FrameKind::Rdf | FrameKind::Collection { .. } | FrameKind::Property { .. },
                ..
            }) => {
                if tag_iri == format!("{RDF_NS}RDF") {
                    if self.frames.len() == 1 {
                        let scope = self.child_scope(event, reader)?;
                        self.frames.push(Frame {
                            kind: FrameKind::Rdf,
                            scope,
                        });
                        return Ok(());
                    }
                    return Err(self.err(reader, "rdf:RDF is only allowed at the document root"));
                }
                self.node_element(tag_iri, event, reader)
            }
            Some(Frame {
                kind: FrameKind::Node { .. },
                ..
            }) => self.property_element(tag_iri, event, reader),
            Some(Frame {
                kind: FrameKind::XmlLiteral { .. },
                ..
            })
            | None => Err(self.err(reader, "unexpected element")),
        }
    }

    fn xml_literal_start(
        &mut self,
        event: &BytesStart<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<(), RdfXmlParseError> {
        let mut markup = String::from("<");
        markup.push_str(&decode(reader, event.name().as_ref())?);
        for attribute in event.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
            markup.push(' ');
            markup.push_str(&decode(reader, attribute.key.as_ref())?);
            markup.push_str("=\"");
            markup.push_str(&decode(reader, &attribute.value)?);
            markup.push('"');
        }
        markup.push('>');
        if let Some(Frame {
            kind: FrameKind::XmlLiteral { depth, content, .. },
            ..
        }) = self.frames.last_mut()
        {
            *depth += 1;
            content.push_str(&markup);
        }
        Ok(())
    }

    fn node_element(
        &mut self,
        tag_iri: String,
        event: &BytesStart<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<(), RdfXmlParseError> {
        let scope = self.child_scope(event, reader)?;
        let mut subject: Option<NamedOrBlankNode> = None;
        let mut property_attrs: Vec<(NamedNode, String)> = Vec::new();
        let mut type_attr: Option<String> = None;
        for attribute in event.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
            let Some(name) = self.attribute_iri(&attribute, reader)? else {
                continue;
            };
            let value = self.attribute_value(&attribute, reader)?;
            if let Some(local) = name.strip_prefix(RDF_NS) {
                match local {
                    "about" => {
                        let iri = self.resolve(&scope, &value, reader)?;
                        self.set_node_term(&mut subject, iri.into(), reader)?;
                    }
                    "ID" => {
                        let iri = self.resolve(&scope, &format!("#{value}"), reader)?;
                        if !self.known_ids.insert(iri.as_str().to_owned()) {
                            return Err(self.err(
                                reader,
                                format!("the rdf:ID '{value}' is used twice under the same base"),
                            ));
                        }
                        self.set_node_term(&mut subject, iri.into(), reader)?;
                    }
                    "nodeID" => {
                        let node = self.labeled_bnode(&value);
                        self.set_node_term(&mut subject, node.into(), reader)?;
                    }
                    "type" => type_attr = Some(value),
                    "aboutEach" | "aboutEachPrefix" | "bagID" | "li" => {
                        return Err(self.err(
                            reader,
                            format!("the rdf:{local} attribute is not allowed"),
                        ))
                    }
                    _ => property_attrs.push((NamedNode::new_unchecked(name.clone()), value)),
                }
            } else if name == format!("{XML_NS}base") || name == format!("{XML_NS}lang") {
                // already consumed by child_scope
            } else {
                property_attrs.push((NamedNode::new_unchecked(name), value));
            }
        }
        let subject = subject.unwrap_or_else(|| BlankNode::default().into());

        // Link the new node to its parent, validating with a read-only pass
        // first so error construction does not fight the later mutation.
        match self.frames.last() {
            Some(Frame {
                kind:
                    FrameKind::Property {
                        content: PropertyContent::Done,
                        ..
                    },
                ..
            }) => {
                return Err(self.err(
                    reader,
                    "a property element can only contain one node element",
                ))
            }
            Some(Frame {
                kind:
                    FrameKind::Property {
                        content: PropertyContent::Text(text),
                        ..
                    },
                ..
            }) if !text.trim().is_empty() => {
                return Err(self.err(
                    reader,
                    "a property element cannot mix text and node elements",
                ))
            }
            _ => (),
        }
        match self.frames.last_mut() {
            Some(Frame {
                kind:
                    FrameKind::Property {
                        subject: parent_subject,
                        predicate,
                        content,
                        ..
                    },
                ..
            }) => {
                let triple = Triple::new(
                    parent_subject.clone(),
                    predicate.clone(),
                    Term::from(subject.clone()),
                );
                *content = PropertyContent::Done;
                self.triples.push(triple);
            }
            Some(Frame {
                kind: FrameKind::Collection { items, .. },
                ..
            }) => items.push(subject.clone()),
            _ => (),
        }

        if tag_iri != format!("{RDF_NS}Description") {
            self.triples.push(Triple::new(
                subject.clone(),
                rdf::TYPE.into_owned(),
                NamedNode::new_unchecked(tag_iri),
            ));
        }
        if let Some(type_value) = type_attr {
            let type_iri = self.resolve(&scope, &type_value, reader)?;
            self.triples
                .push(Triple::new(subject.clone(), rdf::TYPE.into_owned(), type_iri));
        }
        for (predicate, value) in property_attrs {
            let literal = self.scoped_literal(value, &scope, None, reader)?;
            self.triples
                .push(Triple::new(subject.clone(), predicate, literal));
        }

        self.frames.push(Frame {
            kind: FrameKind::Node { subject },
            scope,
        });
        Ok(())
    }

    fn property_element(
        &mut self,
        tag_iri: String,
        event: &BytesStart<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<(), RdfXmlParseError> {
        let scope = self.child_scope(event, reader)?;
        let subject = match self.frames.last() {
            Some(Frame {
                kind: FrameKind::Node { subject },
                ..
            }) => subject.clone(),
            _ => return Err(self.err(reader, "a property element needs an enclosing node")),
        };
        let predicate = NamedNode::new_unchecked(tag_iri);

        let mut resource: Option<NamedOrBlankNode> = None;
        let mut datatype: Option<NamedNode> = None;
        let mut parse_type: Option<String> = None;
        let mut property_attrs: Vec<(NamedNode, String)> = Vec::new();
        for attribute in event.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
            let Some(name) = self.attribute_iri(&attribute, reader)? else {
                continue;
            };
            let value = self.attribute_value(&attribute, reader)?;
            if let Some(local) = name.strip_prefix(RDF_NS) {
                match local {
                    "resource" => {
                        let iri = self.resolve(&scope, &value, reader)?;
                        self.set_node_term(&mut resource, iri.into(), reader)?;
                    }
                    "nodeID" => {
                        let node = self.labeled_bnode(&value);
                        self.set_node_term(&mut resource, node.into(), reader)?;
                    }
                    "datatype" => datatype = Some(self.resolve(&scope, &value, reader)?),
                    "parseType" => parse_type = Some(value),
                    "ID" => {
                        return Err(self.err(
                            reader,
                            "rdf:ID on property elements (statement reification) is not supported",
                        ))
                    }
                    _ => property_attrs.push((NamedNode::new_unchecked(name.clone()), value)),
                }
            } else if name == format!("{XML_NS}base") || name == format!("{XML_NS}lang") {
                // already consumed by child_scope
            } else {
                property_attrs.push((NamedNode::new_unchecked(name), value));
            }
        }

        if parse_type.is_some() && (resource.is_some() || datatype.is_some()) {
            return Err(self.err(
                reader,
                "rdf:parseType cannot be mixed with rdf:resource or rdf:datatype",
            ));
        }
        match parse_type.as_deref() {
            Some("Collection") => {
                self.frames.push(Frame {
                    kind: FrameKind::Collection {
                        subject,
                        predicate,
                        items: Vec::new(),
                    },
                    scope,
                });
            }
            Some("Resource") => {
                let node = BlankNode::default();
                self.triples.push(Triple::new(
                    subject,
                    predicate,
                    Term::from(node.clone()),
                ));
                self.frames.push(Frame {
                    kind: FrameKind::Node {
                        subject: node.into(),
                    },
                    scope,
                });
            }
            Some(_) => {
                // "Literal"; unknown parse types read as XML literals too
                self.frames.push(Frame {
                    kind: FrameKind::XmlLiteral {
                        subject,
                        predicate,
                        depth: 0,
                        content: String::new(),
                    },
                    scope,
                });
            }
            None => {
                let content = if let Some(object) = resource {
                    if !property_attrs.is_empty() {
                        return Err(self.err(
                            reader,
                            "property attributes cannot be mixed with rdf:resource",
                        ));
                    }
                    self.triples.push(Triple::new(
                        subject.clone(),
                        predicate.clone(),
                        Term::from(object),
                    ));
                    PropertyContent::Done
                } else if !property_attrs.is_empty() {
                    // An empty property element with attributes describes a
                    // fresh blank node object.
                    let node = BlankNode::default();
                    self.triples.push(Triple::new(
                        subject.clone(),
                        predicate.clone(),
                        Term::from(node.clone()),
                    ));
                    for (attr_predicate, value) in property_attrs {
                        let literal = self.scoped_literal(value, &scope, None, reader)?;
                        self.triples.push(Triple::new(
                            NamedOrBlankNode::from(node.clone()),
                            attr_predicate,
                            literal,
                        ));
                    }
                    PropertyContent::Done
                } else {
                    PropertyContent::Empty
                };
                self.frames.push(Frame {
                    kind: FrameKind::Property {
                        subject,
                        predicate,
                        datatype,
                        content,
                    },
                    scope,
                });
            }
        }
        Ok(())
    }

    fn handle_text(
        &mut self,
        event: &BytesText<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<(), RdfXmlParseError> {
        let raw = decode(reader, event.as_ref())?.into_owned();
        enum Target {
            XmlLiteral,
            Property,
            WhitespaceOnly,
        }
        let target = match self.frames.last() {
            Some(Frame {
                kind: FrameKind::XmlLiteral { .. },
                ..
            }) => Target::XmlLiteral,
            Some(Frame {
                kind:
                    FrameKind::Property {
                        content: PropertyContent::Empty | PropertyContent::Text(_),
                        ..
                    },
                ..
            }) => Target::Property,
            _ => Target::WhitespaceOnly,
        };
        match target {
            Target::XmlLiteral => {
                if let Some(Frame {
                    kind: FrameKind::XmlLiteral { content, .. },
                    ..
                }) = self.frames.last_mut()
                {
                    content.push_str(&raw);
                }
                Ok(())
            }
            Target::Property => {
                let text = unescape_with(&raw, |e| self.entities.get(e).map(String::as_str))
                    .map_err(quick_xml::Error::from)?
                    .into_owned();
                if let Some(Frame {
                    kind: FrameKind::Property { content, .. },
                    ..
                }) = self.frames.last_mut()
                {
                    match content {
                        PropertyContent::Empty => *content = PropertyContent::Text(text),
                        PropertyContent::Text(existing) => existing.push_str(&text),
                        PropertyContent::Done => (),
                    }
                }
                Ok(())
            }
            Target::WhitespaceOnly => {
                let text = unescape_with(&raw, |e| self.entities.get(e).map(String::as_str))
                    .map_err(quick_xml::Error::from)?;
                if text.trim().is_empty() {
                    Ok(())
                } else {
                    Err(self.err(reader, "unexpected text outside of property elements"))
                }
            }
        }
    }

    fn handle_end(
        &mut self,
        tag_name: &[u8],
        reader: &NsReader<&[u8]>,
    ) -> Result<(), RdfXmlParseError> {
        if let Some(Frame {
            kind: FrameKind::XmlLiteral { depth, .. },
            ..
        }) = self.frames.last()
        {
            if *depth > 0 {
                let name = decode(reader, tag_name)?.into_owned();
                if let Some(Frame {
                    kind: FrameKind::XmlLiteral { depth, content, .. },
                    ..
                }) = self.frames.last_mut()
                {
                    *depth -= 1;
                    content.push_str("</");
                    content.push_str(&name);
                    content.push('>');
                }
                return Ok(());
            }
        }
        let Some(frame) = self.frames.pop() else {
            return Err(self.err(reader, "unexpected closing tag"));
        };
        match frame.kind {
            FrameKind::Rdf | FrameKind::Node { .. } => Ok(()),
            FrameKind::Property {
                subject,
                predicate,
                datatype,
                content,
            } => {
                match content {
                    PropertyContent::Done => (),
                    PropertyContent::Empty => {
                        let literal =
                            self.scoped_literal(String::new(), &frame.scope, datatype, reader)?;
                        self.triples.push(Triple::new(subject, predicate, literal));
                    }
                    PropertyContent::Text(text) => {
                        let literal = self.scoped_literal(text, &frame.scope, datatype, reader)?;
                        self.triples.push(Triple::new(subject, predicate, literal));
                    }
                }
                Ok(())
            }
            FrameKind::Collection {
                subject,
                predicate,
                items,
            } => {
                if items.is_empty() {
                    self.triples
                        .push(Triple::new(subject, predicate, rdf::NIL.into_owned()));
                    return Ok(());
                }
                let nodes: Vec<BlankNode> = items.iter().map(|_| BlankNode::default()).collect();
                self.triples.push(Triple::new(
                    subject,
                    predicate,
                    Term::from(nodes[0].clone()),
                ));
                for (i, item) in items.into_iter().enumerate() {
                    self.triples.push(Triple::new(
                        nodes[i].clone(),
                        rdf::FIRST.into_owned(),
                        Term::from(item),
                    ));
                    let rest: Term = match nodes.get(i + 1) {
                        Some(next) => next.clone().into(),
                        None => rdf::NIL.into_owned().into(),
                    };
                    self.triples
                        .push(Triple::new(nodes[i].clone(), rdf::REST.into_owned(), rest));
                }
                Ok(())
            }
            FrameKind::XmlLiteral {
                subject,
                predicate,
                content,
                ..
            } => {
                self.triples.push(Triple::new(
                    subject,
                    predicate,
                    Literal::new_typed(content, rdf::XML_LITERAL),
                ));
                Ok(())
            }
        }
    }

    fn handle_doctype(
        &mut self,
        event: &BytesText<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<(), RdfXmlParseError> {
        let text = decode(reader, event.as_ref())?.into_owned();
        for declaration in text.split('<').skip(1) {
            let Some(declaration) = declaration.strip_prefix("!ENTITY") else {
                continue;
            };
            let Some((name, rest)) = declaration
                .trim_start()
                .split_once(|c: char| c.is_ascii_whitespace())
            else {
                return Err(self.err(
                    reader,
                    "<!ENTITY declarations need an entity name and a value",
                ));
            };
            let rest = rest.trim_start();
            let Some(rest) = rest.strip_prefix('"') else {
                return Err(self.err(reader, "<!ENTITY values must be double quoted"));
            };
            let Some((value, _)) = rest.split_once('"') else {
                return Err(self.err(reader, "<!ENTITY values must be double quoted"));
            };
            // Entity values may reference earlier entities.
            let value = unescape_with(value, |e| self.entities.get(e).map(String::as_str))
                .map_err(quick_xml::Error::from)?
                .into_owned();
            self.entities.insert(name.to_owned(), value);
        }
        Ok(())
    }

    /// Computes the scope of a child element: the inherited base/language
    /// overridden by its `xml:base` and `xml:lang` attributes.
    fn child_scope(
        &self,
        event: &BytesStart<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<Scope, RdfXmlParseError> {
        let mut scope = match self.frames.last() {
            Some(frame) => frame.scope.clone(),
            None => Scope {
                base: None,
                language: None,
            },
        };
        for attribute in event.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
            let Some(name) = self.attribute_iri(&attribute, reader)? else {
                continue;
            };
            if name == format!("{XML_NS}base") {
                let value = self.attribute_value(&attribute, reader)?;
                scope.base = Some(match &scope.base {
                    Some(base) => base
                        .resolve(&value)
                        .map_err(|e| self.err(reader, e.to_string()))?,
                    None => Iri::parse(value).map_err(|e| self.err(reader, e.to_string()))?,
                });
            } else if name == format!("{XML_NS}lang") {
                let value = self.attribute_value(&attribute, reader)?;
                scope.language = if value.is_empty() {
                    None
                } else {
                    Some(value.to_lowercase())
                };
            }
        }
        Ok(scope)
    }

    fn scoped_literal(
        &self,
        value: String,
        scope: &Scope,
        datatype: Option<NamedNode>,
        reader: &NsReader<&[u8]>,
    ) -> Result<Term, RdfXmlParseError> {
        Ok(match (datatype, &scope.language) {
            (Some(datatype), _) => Literal::new_typed(value, datatype).into(),
            (None, Some(language)) => Literal::new_language_tagged(value, language.clone())
                .map_err(|e| self.err(reader, e.to_string()))?
                .into(),
            (None, None) => Literal::from(value).into(),
        })
    }

    fn element_iri(
        &self,
        event: &BytesStart<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<String, RdfXmlParseError> {
        let (namespace, local) = reader.resolve_element(event.name());
        match namespace {
            ResolveResult::Bound(namespace) => Ok(format!(
                "{}{}",
                decode(reader, namespace.as_ref())?,
                decode(reader, local.as_ref())?
            )),
            _ => Err(self.err(
                reader,
                format!(
                    "the element '{}' has no namespace",
                    String::from_utf8_lossy(event.name().as_ref())
                ),
            )),
        }
    }

    /// The expanded IRI of an attribute, `None` for `xmlns` declarations
    /// and other unqualified attributes.
    fn attribute_iri(
        &self,
        attribute: &Attribute<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<Option<String>, RdfXmlParseError> {
        let key = attribute.key;
        if key.as_ref() == b"xmlns" || key.as_ref().starts_with(b"xmlns:") {
            return Ok(None);
        }
        let (namespace, local) = reader.resolve_attribute(key);
        match namespace {
            ResolveResult::Bound(namespace) => Ok(Some(format!(
                "{}{}",
                decode(reader, namespace.as_ref())?,
                decode(reader, local.as_ref())?
            ))),
            _ => Ok(None),
        }
    }

    fn attribute_value(
        &self,
        attribute: &Attribute<'_>,
        reader: &NsReader<&[u8]>,
    ) -> Result<String, RdfXmlParseError> {
        let value = decode(reader, &attribute.value)?;
        let value = unescape_with(&value, |e| self.entities.get(e).map(String::as_str))
            .map_err(quick_xml::Error::from)?;
        Ok(value.into_owned())
    }

    fn resolve(
        &self,
        scope: &Scope,
        value: &str,
        reader: &NsReader<&[u8]>,
    ) -> Result<NamedNode, RdfXmlParseError> {
        match &scope.base {
            Some(base) => base
                .resolve(value)
                .map(NamedNode::from)
                .map_err(|e| self.err(reader, e.to_string())),
            None => Iri::parse(value).map(NamedNode::from).map_err(|_| {
                self.err(
                    reader,
                    format!("the relative IRI '{value}' cannot be resolved, no base IRI is set"),
                )
            }),
        }
    }

    fn set_node_term(
        &self,
        slot: &mut Option<NamedOrBlankNode>,
        term: NamedOrBlankNode,
        reader: &NsReader<&[u8]>,
    ) -> Result<(), RdfXmlParseError> {
        if slot.is_some() {
            return Err(self.err(
                reader,
                "rdf:about, rdf:ID, rdf:resource and rdf:nodeID are mutually exclusive",
            ));
        }
        *slot = Some(term);
        Ok(())
    }

    fn labeled_bnode(&mut self, label: &str) -> BlankNode {
        self.bnode_labels
            .entry(label.to_owned())
            .or_default()
            .clone()
    }

    fn err(&self, reader: &NsReader<&[u8]>, message: impl Into<String>) -> RdfXmlParseError {
        let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        let (line, column) = text_position(self.input, offset);
        RdfXmlParseError::Syntax(
            RdfXmlSyntaxError::msg(message)
                .with_position(line, column)
                .with_source_name(self.source_name.as_deref()),
        )
    }
}

fn decode<'b>(
    reader: &NsReader<&[u8]>,
    bytes: &'b [u8],
) -> Result<std::borrow::Cow<'b, str>, quick_xml::Error> {
    reader.decoder().decode(bytes).map_err(quick_xml::Error::from)
}

/// 0-based line/column of a byte offset.
fn text_position(input: &str, offset: usize) -> (u64, u64) {
    let mut line = 0;
    let mut column = 0;
    for c in input[..offset.min(input.len())].chars() {
        if c == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    #[test]
    fn typed_node_elements() {
        let graph = RdfXmlParser::new()
            .parse(
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:schema="http://schema.org/">
  <schema:Person rdf:about="http://example.com/#me">
    <schema:name xml:lang="en">Foo Bar</schema:name>
  </schema:Person>
</rdf:RDF>"#,
            )
            .unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.contains(&Triple::new(
            node("http://example.com/#me"),
            rdf::TYPE.into_owned(),
            node("http://schema.org/Person"),
        )));
        assert!(graph.contains(&Triple::new(
            node("http://example.com/#me"),
            node("http://schema.org/name"),
            Literal::new_language_tagged("Foo Bar", "en").unwrap(),
        )));
    }

    #[test]
    fn base_fragment_resolution() {
        let graph = RdfXmlParser::new()
            .parse(
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:ex="http://example.org/" xml:base="http://my.host/path#">
  <rdf:Description rdf:about="foo"><ex:p>v</ex:p></rdf:Description>
</rdf:RDF>"#,
            )
            .unwrap();
        assert!(graph.contains(&Triple::new(
            node("http://my.host/foo"),
            node("http://example.org/p"),
            Literal::from("v"),
        )));
    }

    #[test]
    fn entity_resolution() {
        let graph = RdfXmlParser::new()
            .parse(
                r#"<?xml version="1.0"?>
<!DOCTYPE rdf:RDF [
  <!ENTITY cmns-dt "https://www.omg.org/spec/Commons/DatesAndTimes/">
]>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:ex="http://example.org/">
  <rdf:Description rdf:about="&cmns-dt;precedes"><ex:p>v</ex:p></rdf:Description>
</rdf:RDF>"#,
            )
            .unwrap();
        let subject = graph.iter().next().unwrap().subject.as_str().to_owned();
        assert_eq!(
            subject,
            "https://www.omg.org/spec/Commons/DatesAndTimes/precedes"
        );
        for triple in &graph {
            assert!(!triple.subject.as_str().contains('&'));
            assert!(!triple.subject.as_str().contains(';'));
        }
    }

    #[test]
    fn duplicate_rdf_id_is_an_error() {
        let err = RdfXmlParser::new()
            .with_base_iri("http://example.org/doc")
            .unwrap()
            .parse(
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:ex="http://example.org/">
  <rdf:Description rdf:ID="a"><ex:p>1</ex:p></rdf:Description>
  <rdf:Description rdf:ID="a"><ex:p>2</ex:p></rdf:Description>
</rdf:RDF>"#,
            )
            .unwrap_err();
        assert!(err.to_string().contains("rdf:ID"), "{err}");
    }

    #[test]
    fn parse_type_collection() {
        let graph = RdfXmlParser::new()
            .parse(
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:ex="http://example.org/">
  <rdf:Description rdf:about="http://example.org/s">
    <ex:items rdf:parseType="Collection">
      <rdf:Description rdf:about="http://example.org/a"/>
      <rdf:Description rdf:about="http://example.org/b"/>
    </ex:items>
  </rdf:Description>
</rdf:RDF>"#,
            )
            .unwrap();
        // items triple + 2 × (first, rest)
        assert_eq!(graph.len(), 5);
        let s = NamedOrBlankNode::from(node("http://example.org/s"));
        let head = graph
            .object_for_subject_predicate(&s, &node("http://example.org/items"))
            .unwrap();
        let Term::BlankNode(head) = head else {
            panic!("the collection head must be a blank node");
        };
        let head = NamedOrBlankNode::from(head.clone());
        assert_eq!(
            graph
                .object_for_subject_predicate(&head, &rdf::FIRST.into_owned())
                .unwrap(),
            &Term::from(node("http://example.org/a"))
        );
    }

    #[test]
    fn parse_type_resource_and_literal() {
        let graph = RdfXmlParser::new()
            .parse(
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:ex="http://example.org/">
  <rdf:Description rdf:about="http://example.org/s">
    <ex:nested rdf:parseType="Resource"><ex:p>v</ex:p></ex:nested>
    <ex:xml rdf:parseType="Literal"><b>bold</b></ex:xml>
  </rdf:Description>
</rdf:RDF>"#,
            )
            .unwrap();
        assert_eq!(graph.len(), 3);
        let s = NamedOrBlankNode::from(node("http://example.org/s"));
        let xml = graph
            .object_for_subject_predicate(&s, &node("http://example.org/xml"))
            .unwrap();
        let Term::Literal(xml) = xml else {
            panic!("an XML literal is expected");
        };
        assert_eq!(xml.datatype(), rdf::XML_LITERAL);
        assert_eq!(xml.value(), "<b>bold</b>");
    }

    #[test]
    fn node_ids_and_nesting() {
        let graph = RdfXmlParser::new()
            .parse(
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:ex="http://example.org/">
  <rdf:Description rdf:about="http://example.org/s">
    <ex:knows><rdf:Description rdf:nodeID="b"><ex:name>Anna</ex:name></rdf:Description></ex:knows>
    <ex:alsoKnows rdf:nodeID="b"/>
  </rdf:Description>
</rdf:RDF>"#,
            )
            .unwrap();
        assert_eq!(graph.len(), 3);
        let s = NamedOrBlankNode::from(node("http://example.org/s"));
        let knows = graph
            .object_for_subject_predicate(&s, &node("http://example.org/knows"))
            .unwrap();
        let also = graph
            .object_for_subject_predicate(&s, &node("http://example.org/alsoKnows"))
            .unwrap();
        assert_eq!(knows, also);
    }

    #[test]
    fn property_attributes() {
        let graph = RdfXmlParser::new()
            .parse(
                r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:ex="http://example.org/">
  <ex:Thing rdf:about="http://example.org/t" ex:label="compact"/>
</rdf:RDF>"#,
            )
            .unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.contains(&Triple::new(
            node("http://example.org/t"),
            node("http://example.org/label"),
            Literal::from("compact"),
        )));
    }

    #[test]
    fn malformed_is_an_error() {
        assert!(RdfXmlParser::new().parse("<rdf:RDF>").is_err());
        assert!(RdfXmlParser::new()
            .parse("<unbound><p>x</p></unbound>")
            .is_err());
    }
}
