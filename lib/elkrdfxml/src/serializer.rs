use crate::error::RdfXmlEncodeError;
use crate::utils::split_iri_for_xml;
use elkiri::{Iri, RelativizationPolicy};
use elkrdf::vocab::rdf;
use elkrdf::{BlankNode, Graph, Literal, NamedOrBlankNode, NamespaceMap, Term, Triple};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::{BTreeMap, HashMap, HashSet};

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// An [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) serializer.
///
/// Subjects are grouped into node elements; a subject with exactly one
/// `rdf:type` whose IRI abbreviates to a qualified name becomes a typed
/// node element, everything else an `rdf:Description`. Blank nodes
/// referenced exactly once are nested inline; well-formed single-reference
/// lists use `rdf:parseType="Collection"`. Only the namespaces actually
/// used appear as `xmlns:` declarations on the root.
///
/// ```
/// use elkrdf::{Graph, NamedNode, Triple};
/// use elkrdf::vocab::rdf;
/// use elkrdfxml::RdfXmlSerializer;
///
/// let graph = Graph::new().add(Triple::new(
///     NamedNode::new("http://example.com/#me")?,
///     rdf::TYPE,
///     NamedNode::new("http://schema.org/Person")?,
/// ));
/// let out = RdfXmlSerializer::new()
///     .with_prefix("schema", "http://schema.org/")
///     .serialize(&graph)?;
/// assert!(out.contains("<schema:Person rdf:about=\"http://example.com/#me\"/>"));
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone)]
#[must_use]
pub struct RdfXmlSerializer {
    namespaces: NamespaceMap,
    base: Option<Iri>,
    pretty: bool,
    indent_spaces: usize,
    use_typed_nodes: bool,
    include_base_declaration: bool,
    relativization: RelativizationPolicy,
}

impl Default for RdfXmlSerializer {
    fn default() -> Self {
        Self {
            namespaces: NamespaceMap::default(),
            base: None,
            pretty: true,
            indent_spaces: 2,
            use_typed_nodes: true,
            include_base_declaration: true,
            relativization: RelativizationPolicy::Full,
        }
    }
}

impl RdfXmlSerializer {
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

    /// Sets the base IRI used for relativization and the `xml:base`
    /// declaration.
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, elkiri::IriParseError> {
        self.base = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_indent_spaces(mut self, indent_spaces: usize) -> Self {
        self.indent_spaces = indent_spaces;
        self
    }

    /// Controls the typed node element abbreviation
    /// (`<schema:Person rdf:about="…">` instead of `rdf:Description`).
    pub fn with_typed_nodes(mut self, use_typed_nodes: bool) -> Self {
        self.use_typed_nodes = use_typed_nodes;
        self
    }

    /// Controls whether `xml:base` is written when a base is set.
    pub fn with_base_declaration(mut self, include: bool) -> Self {
        self.include_base_declaration = include;
        self
    }

    /// Controls how aggressively IRIs are shortened against the base.
    pub fn with_relativization(mut self, policy: RelativizationPolicy) -> Self {
        self.relativization = policy;
        self
    }

    pub fn serialize(&self, graph: &Graph) -> Result<String, RdfXmlEncodeError> {
        Serialization::new(self, graph)?.run(graph)
    }
}

/// One serialization run: the resolved qualified names, the blank node
/// analysis and the output writer.
struct Serialization<'a> {
    config: &'a RdfXmlSerializer,
    /// IRI → (prefix, local) for every name written as an XML qname.
    qnames: HashMap<String, (String, String)>,
    /// namespace → prefix, for the root `xmlns:` declarations.
    used_namespaces: BTreeMap<String, String>,
    lists: HashMap<BlankNode, Vec<Term>>,
    inline: HashSet<BlankNode>,
    consumed: HashSet<BlankNode>,
    minted: u32,
}

impl<'a> Serialization<'a> {
    fn new(config: &'a RdfXmlSerializer, graph: &Graph) -> Result<Self, RdfXmlEncodeError> {
        let mut this = Self {
            config,
            qnames: HashMap::new(),
            used_namespaces: BTreeMap::new(),
            lists: HashMap::new(),
            inline: HashSet::new(),
            consumed: HashSet::new(),
            minted: 0,
        };
        this.used_namespaces.insert(RDF_NS.to_owned(), "rdf".to_owned());
        this.analyze_blanks(graph);

        // Every predicate written must abbreviate to a qualified name.
        for triple in graph {
            if triple.predicate == rdf::FIRST
                || triple.predicate == rdf::REST
                || triple.predicate == rdf::TYPE
            {
                continue;
            }
            this.require_qname(triple.predicate.as_str())?;
        }
        if config.use_typed_nodes {
            for triple in graph {
                if triple.predicate == rdf::TYPE {
                    if let Term::NamedNode(class) = &triple.object {
                        // Best effort: an unabbreviatable type keeps the
                        // rdf:Description form.
                        this.require_qname(class.as_str()).ok();
                    }
                }
            }
        }
        Ok(this)
    }

    fn analyze_blanks(&mut self, graph: &Graph) {
        let mut in_degree: HashMap<&BlankNode, usize> = HashMap::new();
        for triple in graph {
            if let Term::BlankNode(node) = &triple.object {
                *in_degree.entry(node).or_insert(0) += 1;
            }
        }
        let mut links: HashMap<&BlankNode, (&Term, &Term)> = HashMap::new();
        for subject in graph.subjects() {
            let NamedOrBlankNode::BlankNode(node) = subject else {
                continue;
            };
            let triples: Vec<&Triple> = graph.triples_for_subject(subject).collect();
            if triples.len() != 2 {
                continue;
            }
            let first = triples.iter().find(|t| t.predicate == rdf::FIRST);
            let rest = triples.iter().find(|t| t.predicate == rdf::REST);
            if let (Some(first), Some(rest)) = (first, rest) {
                links.insert(node, (&first.object, &rest.object));
            }
        }
        let rest_targets: HashSet<&BlankNode> = links
            .values()
            .filter_map(|(_, rest)| match rest {
                Term::BlankNode(node) => Some(node),
                _ => None,
            })
            .collect();
        for &head in links.keys() {
            if rest_targets.contains(head) || in_degree.get(head).copied().unwrap_or(0) != 1 {
                continue;
            }
            let mut items = Vec::new();
            let mut members = vec![head.clone()];
            let mut node = head;
            let well_formed = loop {
                let Some((item, rest)) = links.get(node) else {
                    break false;
                };
                // Collection items are node elements; a literal item cannot
                // be abbreviated, keep the explicit chain then.
                if matches!(item, Term::Literal(_)) {
                    break false;
                }
                items.push((*item).clone());
                match rest {
                    Term::NamedNode(n) if *n == rdf::NIL => break true,
                    Term::BlankNode(next) => {
                        if in_degree.get(next).copied().unwrap_or(0) != 1
                            || members.contains(next)
                        {
                            break false;
                        }
                        members.push(next.clone());
                        node = next;
                    }
                    _ => break false,
                }
            };
            if well_formed {
                self.lists.insert(head.clone(), items);
                self.consumed.extend(members);
            }
        }
        for (&node, &count) in &in_degree {
            if count == 1 && !self.consumed.contains(node) {
                self.inline.insert(node.clone());
            }
        }
        // Inline nesting must be reachable from an emitted subject.
        let mut reachable: HashSet<BlankNode> = HashSet::new();
        let roots: Vec<&NamedOrBlankNode> = graph
            .subjects()
            .filter(|subject| match subject {
                NamedOrBlankNode::BlankNode(node) => {
                    !self.consumed.contains(node) && !self.inline.contains(node)
                }
                NamedOrBlankNode::NamedNode(_) => true,
            })
            .collect();
        for root in roots {
            for triple in graph.triples_for_subject(root) {
                self.visit_object(graph, &triple.object, &mut reachable);
            }
        }
        let inline = std::mem::take(&mut self.inline);
        self.inline = inline
            .into_iter()
            .filter(|node| reachable.contains(node))
            .collect();
    }

    fn visit_object(&self, graph: &Graph, object: &Term, reachable: &mut HashSet<BlankNode>) {
        let Term::BlankNode(node) = object else {
            return;
        };
        if let Some(items) = self.lists.get(node) {
            for item in items {
                self.visit_object(graph, item, reachable);
            }
            return;
        }
        if self.inline.contains(node) && reachable.insert(node.clone()) {
            let subject = NamedOrBlankNode::from(node.clone());
            for triple in graph.triples_for_subject(&subject) {
                self.visit_object(graph, &triple.object, reachable);
            }
        }
    }

    fn require_qname(&mut self, iri: &str) -> Result<(String, String), RdfXmlEncodeError> {
        if let Some(qname) = self.qnames.get(iri) {
            return Ok(qname.clone());
        }
        let (namespace, local) = match self.config.namespaces.split(iri) {
            Some((prefix, local))
                if !prefix.is_empty() && is_ncname(local) && !local.is_empty() =>
            {
                let namespace = &iri[..iri.len() - local.len()];
                (namespace.to_owned(), local.to_owned())
            }
            _ => match split_iri_for_xml(iri) {
                Some((namespace, local)) => (namespace.to_owned(), local.to_owned()),
                None => {
                    return Err(RdfXmlEncodeError::msg(format!(
                        "<{iri}> cannot be abbreviated to an XML qualified name"
                    )))
                }
            },
        };
        let prefix = match self.used_namespaces.get(&namespace) {
            Some(prefix) => prefix.clone(),
            None => {
                let prefix = match self.config.namespaces.split(&namespace) {
                    Some((prefix, "")) if !prefix.is_empty() => prefix.to_owned(),
                    _ => loop {
                        self.minted += 1;
                        let candidate = format!("ns{}", self.minted);
                        if self.used_namespaces.values().all(|p| *p != candidate)
                            && self.config.namespaces.get(&candidate).is_none()
                        {
                            break candidate;
                        }
                    },
                };
                self.used_namespaces.insert(namespace.clone(), prefix.clone());
                prefix
            }
        };
        let qname = (prefix, local);
        self.qnames.insert(iri.to_owned(), qname.clone());
        Ok(qname)
    }

    fn run(mut self, graph: &Graph) -> Result<String, RdfXmlEncodeError> {
        // Resolve the node element names up front so that the root carries
        // every namespace declaration.
        let mut subjects: Vec<&NamedOrBlankNode> = graph
            .subjects()
            .filter(|subject| match subject {
                NamedOrBlankNode::BlankNode(node) => {
                    !self.consumed.contains(node) && !self.inline.contains(node)
                }
                NamedOrBlankNode::NamedNode(_) => true,
            })
            .collect();
        subjects.sort_by(|a, b| {
            (a.is_blank_node(), a.as_str()).cmp(&(b.is_blank_node(), b.as_str()))
        });

        let mut writer = if self.config.pretty {
            Writer::new_with_indent(Vec::new(), b' ', self.config.indent_spaces)
        } else {
            Writer::new(Vec::new())
        };
        write_event(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;

        // The body is written into a separate buffer first: nested nodes can
        // still mint namespaces that must appear on the root element.
        let mut body = if self.config.pretty {
            Writer::new_with_indent(Vec::new(), b' ', self.config.indent_spaces)
        } else {
            Writer::new(Vec::new())
        };
        for subject in subjects {
            self.write_node(&mut body, graph, subject, false)?;
        }

        let mut root = BytesStart::new("rdf:RDF");
        for (namespace, prefix) in &self.used_namespaces {
            root.push_attribute((format!("xmlns:{prefix}").as_str(), namespace.as_str()));
        }
        if self.config.include_base_declaration {
            if let Some(base) = &self.config.base {
                root.push_attribute(("xml:base", base.as_str()));
            }
        }
        write_event(&mut writer, Event::Start(root))?;
        let body = body.into_inner();
        if !body.is_empty() {
            // Re-indent the buffered body one level below the root.
            let text = String::from_utf8(body)
                .map_err(|e| RdfXmlEncodeError::msg(e.to_string()))?;
            let mut indented = String::new();
            for line in text.lines() {
                indented.push('\n');
                if self.config.pretty {
                    for _ in 0..self.config.indent_spaces {
                        indented.push(' ');
                    }
                }
                indented.push_str(line);
            }
            indented.push('\n');
            write_event(&mut writer, Event::Text(BytesText::from_escaped(indented)))?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new("rdf:RDF")))?;
        String::from_utf8(writer.into_inner()).map_err(|e| RdfXmlEncodeError::msg(e.to_string()))
    }

    fn write_node(
        &mut self,
        writer: &mut Writer<Vec<u8>>,
        graph: &Graph,
        subject: &NamedOrBlankNode,
        anonymous: bool,
    ) -> Result<(), RdfXmlEncodeError> {
        let mut triples: Vec<&Triple> = graph.triples_for_subject(subject).collect();
        triples.sort_by(|a, b| {
            let rank = |t: &Triple| (t.predicate != rdf::TYPE, t.predicate.as_str().to_owned());
            rank(a).cmp(&rank(b))
        });

        let mut element = "rdf:Description".to_owned();
        if self.config.use_typed_nodes {
            let types: Vec<usize> = triples
                .iter()
                .enumerate()
                .filter(|(_, t)| t.predicate == rdf::TYPE)
                .map(|(i, _)| i)
                .collect();
            if types.len() == 1 {
                if let Term::NamedNode(class) = &triples[types[0]].object {
                    if let Ok((prefix, local)) = self.require_qname(class.as_str()) {
                        element = format!("{prefix}:{local}");
                        triples.remove(types[0]);
                    }
                }
            }
        }

        let mut start = BytesStart::new(element.clone());
        match subject {
            NamedOrBlankNode::NamedNode(node) => {
                start.push_attribute(("rdf:about", self.reference(node.as_str()).as_str()));
            }
            NamedOrBlankNode::BlankNode(node) => {
                if !anonymous {
                    start.push_attribute(("rdf:nodeID", node.as_str()));
                }
            }
        }
        if triples.is_empty() {
            write_event(writer, Event::Empty(start))?;
            return Ok(());
        }
        write_event(writer, Event::Start(start))?;
        for triple in triples {
            self.write_property(writer, graph, triple)?;
        }
        write_event(writer, Event::End(BytesEnd::new(element)))?;
        Ok(())
    }

    fn write_property(
        &mut self,
        writer: &mut Writer<Vec<u8>>,
        graph: &Graph,
        triple: &Triple,
    ) -> Result<(), RdfXmlEncodeError> {
        let (prefix, local) = self.require_qname(triple.predicate.as_str())?;
        let qname = format!("{prefix}:{local}");
        let mut start = BytesStart::new(qname.clone());
        match &triple.object {
            Term::NamedNode(node) => {
                start.push_attribute(("rdf:resource", self.reference(node.as_str()).as_str()));
                write_event(writer, Event::Empty(start))?;
            }
            Term::Literal(literal) => {
                write_literal_property(writer, start, &qname, literal)?;
            }
            Term::BlankNode(node) => {
                if let Some(items) = self.lists.get(node).cloned() {
                    start.push_attribute(("rdf:parseType", "Collection"));
                    write_event(writer, Event::Start(start))?;
                    for item in items {
                        match item {
                            Term::NamedNode(item) => {
                                let mut element = BytesStart::new("rdf:Description");
                                element.push_attribute((
                                    "rdf:about",
                                    self.reference(item.as_str()).as_str(),
                                ));
                                write_event(writer, Event::Empty(element))?;
                            }
                            Term::BlankNode(item) => {
                                let anonymous = self.inline.contains(&item);
                                self.write_node(
                                    writer,
                                    graph,
                                    &NamedOrBlankNode::from(item),
                                    anonymous,
                                )?;
                            }
                            Term::Literal(_) => {
                                // Excluded during analysis.
                            }
                        }
                    }
                    write_event(writer, Event::End(BytesEnd::new(qname)))?;
                } else if self.inline.contains(node) {
                    write_event(writer, Event::Start(start))?;
                    self.write_node(writer, graph, &NamedOrBlankNode::from(node.clone()), true)?;
                    write_event(writer, Event::End(BytesEnd::new(qname)))?;
                } else {
                    start.push_attribute(("rdf:nodeID", node.as_str()));
                    write_event(writer, Event::Empty(start))?;
                }
            }
        }
        Ok(())
    }

    /// An IRI written as an attribute value, relativized against the base.
    fn reference(&self, iri: &str) -> String {
        if let Some(base) = &self.config.base {
            if let Ok(target) = Iri::parse(iri) {
                if let Some(relative) = base.relativize(&target, self.config.relativization) {
                    return relative;
                }
            }
        }
        iri.to_owned()
    }
}

fn write_literal_property(
    writer: &mut Writer<Vec<u8>>,
    mut start: BytesStart<'static>,
    qname: &str,
    literal: &Literal,
) -> Result<(), RdfXmlEncodeError> {
    if let Some(language) = literal.language() {
        start.push_attribute(("xml:lang", language));
    } else if !literal.is_plain() {
        start.push_attribute(("rdf:datatype", literal.datatype().as_str()));
    }
    write_event(writer, Event::Start(start))?;
    write_event(writer, Event::Text(BytesText::new(literal.value())))?;
    write_event(writer, Event::End(BytesEnd::new(qname.to_owned())))?;
    Ok(())
}

fn is_ncname(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        None => return false,
        Some(c) if crate::utils::is_name_start_char(c) => {}
        Some(_) => return false,
    }
    chars.all(crate::utils::is_name_char)
}

fn write_event(
    writer: &mut Writer<Vec<u8>>,
    event: Event<'_>,
) -> Result<(), RdfXmlEncodeError> {
    writer
        .write_event(event)
        .map_err(|e| RdfXmlEncodeError::msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RdfXmlParser;
    use elkrdf::NamedNode;

    fn node(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    #[test]
    fn typed_node_abbreviation() {
        let graph = Graph::from_triples([
            Triple::new(
                node("http://example.com/#me"),
                rdf::TYPE.into_owned(),
                node("http://schema.org/Person"),
            ),
            Triple::new(
                node("http://example.com/#me"),
                node("http://schema.org/name"),
                Literal::new_language_tagged("Foo Bar", "en").unwrap(),
            ),
        ]);
        let out = RdfXmlSerializer::new()
            .with_prefix("schema", "http://schema.org/")
            .serialize(&graph)
            .unwrap();
        assert!(out.contains("<schema:Person rdf:about=\"http://example.com/#me\">"), "{out}");
        assert!(out.contains("<schema:name xml:lang=\"en\">Foo Bar</schema:name>"), "{out}");
        assert!(out.contains("xmlns:schema=\"http://schema.org/\""), "{out}");
        let reparsed = RdfXmlParser::new().parse(&out).unwrap();
        assert_eq!(reparsed, graph);
    }

    #[test]
    fn untyped_nodes_use_description() {
        let graph = Graph::new().add(Triple::new(
            node("http://example.com/doc"),
            node("http://purl.org/dc/terms/title"),
            Literal::from("T"),
        ));
        let out = RdfXmlSerializer::new()
            .with_typed_nodes(false)
            .serialize(&graph)
            .unwrap();
        assert!(out.contains("<rdf:Description rdf:about=\"http://example.com/doc\">"), "{out}");
        assert!(out.contains("<dc:title>T</dc:title>"), "{out}");
    }

    #[test]
    fn base_relativizes_to_empty_about() {
        let graph = Graph::new().add(Triple::new(
            node("http://example.org/resource"),
            node("http://purl.org/dc/terms/title"),
            Literal::from("T"),
        ));
        let out = RdfXmlSerializer::new()
            .with_base_iri("http://example.org/resource")
            .unwrap()
            .serialize(&graph)
            .unwrap();
        assert!(out.contains("rdf:about=\"\""), "{out}");
        assert!(out.contains("xml:base=\"http://example.org/resource\""), "{out}");
        assert!(!out.contains("rdf:about=\"/\""), "{out}");
    }

    #[test]
    fn collections_and_nested_blanks_roundtrip() {
        let ttl_graph = elkrdf::Graph::from_triples({
            let head = BlankNode::default();
            let second = BlankNode::default();
            let nested = BlankNode::default();
            vec![
                Triple::new(
                    node("http://example.org/s"),
                    node("http://example.org/items"),
                    head.clone(),
                ),
                Triple::new(head.clone(), rdf::FIRST.into_owned(), node("http://example.org/a")),
                Triple::new(head, rdf::REST.into_owned(), second.clone()),
                Triple::new(second.clone(), rdf::FIRST.into_owned(), node("http://example.org/b")),
                Triple::new(second, rdf::REST.into_owned(), rdf::NIL.into_owned()),
                Triple::new(
                    node("http://example.org/s"),
                    node("http://example.org/knows"),
                    nested.clone(),
                ),
                Triple::new(
                    nested,
                    node("http://example.org/name"),
                    Literal::from("Anna"),
                ),
            ]
        });
        let out = RdfXmlSerializer::new()
            .with_prefix("ex", "http://example.org/")
            .serialize(&ttl_graph)
            .unwrap();
        assert!(out.contains("rdf:parseType=\"Collection\""), "{out}");
        let reparsed = RdfXmlParser::new().parse(&out).unwrap();
        assert_eq!(reparsed.len(), ttl_graph.len());
        // The list still expands to the same chain shape.
        assert!(out.matches("rdf:Description").count() >= 2, "{out}");
    }

    #[test]
    fn unabbreviatable_predicate_is_an_encoding_error() {
        let graph = Graph::new().add(Triple::new(
            node("http://example.org/s"),
            node("http://example.org/"),
            Literal::from("x"),
        ));
        let err = RdfXmlSerializer::new().serialize(&graph).unwrap_err();
        assert!(err.to_string().starts_with("Encoding error:"), "{err}");
    }
}
