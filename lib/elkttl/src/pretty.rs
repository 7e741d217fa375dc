//! The pretty-printing engine shared by the Turtle and TriG serializers.
//!
//! Output is deterministic: IRI subjects come first in lexicographic order,
//! blank subjects follow sorted by label, and `rdf:type` leads every
//! predicate list. Blank nodes referenced exactly once are nested as
//! `[ … ]`; single-reference well-formed `rdf:first`/`rdf:rest` chains are
//! folded back into `( … )`.

use elkiri::{Iri, RelativizationPolicy};
use elkrdf::vocab::{rdf, xsd};
use elkrdf::{
    BlankNode, Dataset, Graph, Literal, NamedNode, NamedOrBlankNode, NamespaceMap, Term, Triple,
};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Clone)]
pub(crate) struct PrettyOptions {
    pub namespaces: NamespaceMap,
    pub base: Option<Iri>,
    pub pretty: bool,
    pub indent: usize,
    pub relativization: RelativizationPolicy,
    pub include_base_declaration: bool,
    pub generate_missing_prefixes: bool,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            namespaces: NamespaceMap::default(),
            base: None,
            pretty: true,
            indent: 4,
            relativization: RelativizationPolicy::Full,
            include_base_declaration: true,
            generate_missing_prefixes: true,
        }
    }
}

pub(crate) fn serialize_turtle(graph: &Graph, options: &PrettyOptions) -> String {
    let mut writer = PrettyWriter::new(options);
    let analysis = GraphAnalysis::new(graph, &HashSet::new(), options.pretty);
    writer.write_graph(graph, &analysis, 0);
    writer.finish()
}

pub(crate) fn serialize_trig(dataset: &Dataset, options: &PrettyOptions) -> String {
    let mut writer = PrettyWriter::new(options);
    let graph_name_blanks: HashSet<BlankNode> = dataset
        .graph_names()
        .filter_map(|name| match name {
            NamedOrBlankNode::BlankNode(node) => Some(node.clone()),
            NamedOrBlankNode::NamedNode(_) => None,
        })
        .collect();
    if !dataset.default_graph().is_empty() {
        let analysis = GraphAnalysis::new(dataset.default_graph(), &graph_name_blanks, options.pretty);
        writer.write_graph(dataset.default_graph(), &analysis, 0);
    }
    let mut names: Vec<&NamedOrBlankNode> = dataset.graph_names().collect();
    names.sort_by(|a, b| {
        (a.is_blank_node(), a.as_str()).cmp(&(b.is_blank_node(), b.as_str()))
    });
    for name in names {
        let Some(graph) = dataset.named_graph(name) else {
            continue;
        };
        if !writer.out.is_empty() {
            writer.out.push('\n');
        }
        writer.write_named_or_blank(name);
        writer.out.push_str(" {\n");
        let analysis = GraphAnalysis::new(graph, &graph_name_blanks, options.pretty);
        writer.write_graph(graph, &analysis, 1);
        writer.out.push_str("}\n");
    }
    writer.finish()
}

/// The up-front reference-count pass over a graph's blank nodes.
struct GraphAnalysis {
    /// List head → items, for chains folded into `( … )`.
    lists: HashMap<BlankNode, Vec<Term>>,
    /// Blanks referenced exactly once in object position, nested as `[ … ]`.
    inline: HashSet<BlankNode>,
    /// List member nodes whose triples are swallowed by the sugar.
    consumed: HashSet<BlankNode>,
}

impl GraphAnalysis {
    fn new(graph: &Graph, excluded: &HashSet<BlankNode>, pretty: bool) -> Self {
        let mut lists = HashMap::new();
        let mut inline = HashSet::new();
        let mut consumed: HashSet<BlankNode> = HashSet::new();
        if !pretty {
            return Self {
                lists,
                inline,
                consumed,
            };
        }

        let mut in_degree: HashMap<&BlankNode, usize> = HashMap::new();
        for triple in graph {
            if let Term::BlankNode(node) = &triple.object {
                *in_degree.entry(node).or_insert(0) += 1;
            }
        }

        // Blank subjects carrying exactly {rdf:first, rdf:rest} are list links.
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
            if rest_targets.contains(head)
                || excluded.contains(head)
                || in_degree.get(head).copied().unwrap_or(0) != 1
            {
                continue;
            }
            let mut items = Vec::new();
            let mut members = vec![head.clone()];
            let mut node = head;
            let well_formed = loop {
                let Some((item, rest)) = links.get(node) else {
                    break false;
                };
                items.push((*item).clone());
                match rest {
                    Term::NamedNode(n) if *n == rdf::NIL => break true,
                    Term::BlankNode(next) => {
                        if excluded.contains(next)
                            || in_degree.get(next).copied().unwrap_or(0) != 1
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
                lists.insert(head.clone(), items);
                consumed.extend(members);
            }
        }

        for (&node, &count) in &in_degree {
            if count == 1 && !excluded.contains(node) && !consumed.contains(node) {
                inline.insert(node.clone());
            }
        }

        // Nested emission must reach every inline blank from an emitted
        // subject; cycles of single-reference blanks fall back to labels.
        let mut reachable: HashSet<BlankNode> = HashSet::new();
        let roots: Vec<&NamedOrBlankNode> = graph
            .subjects()
            .filter(|subject| match subject {
                NamedOrBlankNode::BlankNode(node) => {
                    !consumed.contains(node) && !inline.contains(node)
                }
                NamedOrBlankNode::NamedNode(_) => true,
            })
            .collect();
        for root in roots {
            for triple in graph.triples_for_subject(root) {
                visit_object(graph, &triple.object, &lists, &inline, &mut reachable);
            }
        }
        inline.retain(|node| reachable.contains(node));

        Self {
            lists,
            inline,
            consumed,
        }
    }
}

fn visit_object(
    graph: &Graph,
    object: &Term,
    lists: &HashMap<BlankNode, Vec<Term>>,
    inline: &HashSet<BlankNode>,
    reachable: &mut HashSet<BlankNode>,
) {
    let Term::BlankNode(node) = object else {
        return;
    };
    if let Some(items) = lists.get(node) {
        for item in items {
            visit_object(graph, item, lists, inline, reachable);
        }
        return;
    }
    if inline.contains(node) && reachable.insert(node.clone()) {
        let subject = NamedOrBlankNode::from(node.clone());
        for triple in graph.triples_for_subject(&subject) {
            visit_object(graph, &triple.object, lists, inline, reachable);
        }
    }
}

struct PrettyWriter<'a> {
    options: &'a PrettyOptions,
    namespaces: NamespaceMap,
    used_prefixes: BTreeSet<String>,
    minted: u32,
    out: String,
}

impl<'a> PrettyWriter<'a> {
    fn new(options: &'a PrettyOptions) -> Self {
        Self {
            options,
            namespaces: options.namespaces.clone(),
            used_prefixes: BTreeSet::new(),
            minted: 0,
            out: String::new(),
        }
    }

    /// Prepends the directive header listing only the prefixes the body used.
    fn finish(self) -> String {
        let mut header = String::new();
        if self.options.include_base_declaration {
            if let Some(base) = &self.options.base {
                header.push_str("@base <");
                header.push_str(base.as_str());
                header.push_str("> .\n");
            }
        }
        for prefix in &self.used_prefixes {
            if let Some(iri) = self.namespaces.get(prefix) {
                header.push_str("@prefix ");
                header.push_str(prefix);
                header.push_str(": <");
                header.push_str(iri);
                header.push_str("> .\n");
            }
        }
        if header.is_empty() {
            self.out
        } else if self.out.is_empty() {
            header
        } else {
            format!("{header}\n{}", self.out)
        }
    }

    fn write_graph(&mut self, graph: &Graph, analysis: &GraphAnalysis, level: usize) {
        if !self.options.pretty {
            let mut triples: Vec<&Triple> = graph.iter().collect();
            triples.sort_by_key(|t| t.to_string());
            for triple in triples {
                self.push_indent(level);
                self.write_named_or_blank(&triple.subject);
                self.out.push(' ');
                self.write_predicate(&triple.predicate);
                self.out.push(' ');
                self.write_object(graph, analysis, &triple.object, level);
                self.out.push_str(" .\n");
            }
            return;
        }
        let mut subjects: Vec<&NamedOrBlankNode> = graph
            .subjects()
            .filter(|subject| match subject {
                NamedOrBlankNode::BlankNode(node) => {
                    !analysis.consumed.contains(node) && !analysis.inline.contains(node)
                }
                NamedOrBlankNode::NamedNode(_) => true,
            })
            .collect();
        subjects.sort_by(|a, b| {
            (a.is_blank_node(), a.as_str()).cmp(&(b.is_blank_node(), b.as_str()))
        });
        for (i, subject) in subjects.into_iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.write_subject_block(graph, analysis, subject, level);
        }
    }

    fn write_subject_block(
        &mut self,
        graph: &Graph,
        analysis: &GraphAnalysis,
        subject: &NamedOrBlankNode,
        level: usize,
    ) {
        self.push_indent(level);
        self.write_named_or_blank(subject);
        let groups = predicate_groups(graph, subject);
        let last = groups.len().saturating_sub(1);
        for (i, (predicate, objects)) in groups.iter().enumerate() {
            if i == 0 {
                self.out.push(' ');
            } else {
                self.out.push('\n');
                self.push_indent(level + 1);
            }
            self.write_predicate(predicate);
            self.out.push(' ');
            for (j, object) in objects.iter().copied().enumerate() {
                if j > 0 {
                    self.out.push_str(", ");
                }
                self.write_object(graph, analysis, object, level);
            }
            if i < last {
                self.out.push_str(" ;");
            }
        }
        self.out.push_str(" .\n");
    }

    fn write_object(
        &mut self,
        graph: &Graph,
        analysis: &GraphAnalysis,
        object: &Term,
        level: usize,
    ) {
        match object {
            Term::NamedNode(node) => self.write_iri(node.as_str()),
            Term::Literal(literal) => self.write_literal(literal),
            Term::BlankNode(node) => {
                if let Some(items) = analysis.lists.get(node) {
                    self.out.push('(');
                    for item in items {
                        self.out.push(' ');
                        self.write_object(graph, analysis, item, level);
                    }
                    self.out.push_str(" )");
                } else if analysis.inline.contains(node) {
                    let subject = NamedOrBlankNode::from(node.clone());
                    let groups = predicate_groups(graph, &subject);
                    if groups.is_empty() {
                        self.out.push_str("[]");
                        return;
                    }
                    self.out.push_str("[ ");
                    for (i, (predicate, objects)) in groups.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(" ; ");
                        }
                        self.write_predicate(predicate);
                        self.out.push(' ');
                        for (j, object) in objects.iter().copied().enumerate() {
                            if j > 0 {
                                self.out.push_str(", ");
                            }
                            self.write_object(graph, analysis, object, level);
                        }
                    }
                    self.out.push_str(" ]");
                } else {
                    self.out.push_str("_:");
                    self.out.push_str(node.as_str());
                }
            }
        }
    }

    fn write_named_or_blank(&mut self, node: &NamedOrBlankNode) {
        match node {
            NamedOrBlankNode::NamedNode(node) => self.write_iri(node.as_str()),
            NamedOrBlankNode::BlankNode(node) => {
                self.out.push_str("_:");
                self.out.push_str(node.as_str());
            }
        }
    }

    fn write_predicate(&mut self, predicate: &NamedNode) {
        if *predicate == rdf::TYPE {
            self.out.push('a');
        } else {
            self.write_iri(predicate.as_str());
        }
    }

    fn write_iri(&mut self, iri: &str) {
        if let Some((prefix, local)) = self.namespaces.split(iri) {
            if is_valid_pn_local(local) {
                let prefix = prefix.to_owned();
                let local = local.to_owned();
                self.used_prefixes.insert(prefix.clone());
                self.out.push_str(&prefix);
                self.out.push(':');
                self.out.push_str(&local);
                return;
            }
        }
        if let Some(base) = &self.options.base {
            if let Ok(target) = Iri::parse(iri) {
                if let Some(relative) = base.relativize(&target, self.options.relativization) {
                    self.out.push('<');
                    self.out.push_str(&relative);
                    self.out.push('>');
                    return;
                }
            }
        }
        if self.options.generate_missing_prefixes {
            if let Some((namespace, local)) = split_for_minting(iri) {
                if is_valid_pn_local(local) && !local.is_empty() {
                    let prefix = self.mint_prefix(namespace);
                    self.used_prefixes.insert(prefix.clone());
                    self.out.push_str(&prefix);
                    self.out.push(':');
                    self.out.push_str(local);
                    return;
                }
            }
        }
        self.out.push('<');
        self.out.push_str(iri);
        self.out.push('>');
    }

    fn mint_prefix(&mut self, namespace: &str) -> String {
        loop {
            self.minted += 1;
            let candidate = format!("ns{}", self.minted);
            if self.namespaces.get(&candidate).is_none() {
                self.namespaces.insert(candidate.clone(), namespace);
                return candidate;
            }
        }
    }

    fn write_literal(&mut self, literal: &Literal) {
        let value = literal.value();
        if literal.language().is_none() {
            let datatype = literal.datatype();
            let shorthand = (datatype == xsd::INTEGER && is_turtle_integer(value))
                || (datatype == xsd::DECIMAL && is_turtle_decimal(value))
                || (datatype == xsd::DOUBLE && is_turtle_double(value))
                || (datatype == xsd::BOOLEAN && (value == "true" || value == "false"));
            if shorthand {
                self.out.push_str(value);
                return;
            }
        }
        push_quoted(&mut self.out, value);
        if let Some(language) = literal.language() {
            self.out.push('@');
            self.out.push_str(language);
        } else if !literal.is_plain() {
            self.out.push_str("^^");
            let datatype = literal.datatype().as_str().to_owned();
            self.write_iri(&datatype);
        }
    }

    fn push_indent(&mut self, level: usize) {
        for _ in 0..level * self.options.indent {
            self.out.push(' ');
        }
    }
}

fn predicate_groups<'a>(
    graph: &'a Graph,
    subject: &NamedOrBlankNode,
) -> Vec<(NamedNode, Vec<&'a Term>)> {
    let mut order: Vec<NamedNode> = Vec::new();
    let mut groups: HashMap<NamedNode, Vec<&Term>> = HashMap::new();
    for triple in graph.triples_for_subject(subject) {
        groups
            .entry(triple.predicate.clone())
            .or_insert_with(|| {
                order.push(triple.predicate.clone());
                Vec::new()
            })
            .push(&triple.object);
    }
    order.sort_by(|a, b| {
        let rank = |p: &NamedNode| (*p != rdf::TYPE, p.as_str().to_owned());
        rank(a).cmp(&rank(b))
    });
    order
        .into_iter()
        .map(|predicate| {
            let objects = groups.remove(&predicate).unwrap_or_default();
            (predicate, objects)
        })
        .collect()
}

fn split_for_minting(iri: &str) -> Option<(&str, &str)> {
    let pos = iri.rfind(['#', '/'])?;
    let (namespace, local) = iri.split_at(pos + 1);
    // Do not split inside the scheme or authority.
    let after_scheme = iri.find("://").map_or(iri.find(':')? + 1, |i| i + 3);
    if namespace.len() <= after_scheme + 1 {
        return None;
    }
    Some((namespace, local))
}

fn is_valid_pn_local(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        None => return true,
        // A leading digit is valid Turtle 1.1 but rejected by strict
        // parsing here, so never emit it.
        Some(c) if c.is_alphabetic() || c == '_' => {}
        Some(_) => return false,
    }
    if local.ends_with('.') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn is_turtle_integer(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_turtle_decimal(value: &str) -> bool {
    let value = value.strip_prefix(['+', '-']).unwrap_or(value);
    let Some((integral, fractional)) = value.split_once('.') else {
        return false;
    };
    integral.bytes().all(|b| b.is_ascii_digit())
        && !fractional.is_empty()
        && fractional.bytes().all(|b| b.is_ascii_digit())
}

fn is_turtle_double(value: &str) -> bool {
    let value = value.strip_prefix(['+', '-']).unwrap_or(value);
    let Some((mantissa, exponent)) = value
        .split_once(['e', 'E'])
        .map(|(m, e)| (m, e.strip_prefix(['+', '-']).unwrap_or(e)))
    else {
        return false;
    };
    if exponent.is_empty() || !exponent.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (integral, fractional) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    (!integral.is_empty() || !fractional.is_empty())
        && integral.bytes().all(|b| b.is_ascii_digit())
        && fractional.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '\u{08}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{0C}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
}
