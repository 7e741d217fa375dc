//! In-memory implementation of [RDF datasets](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset).

use crate::graph::Graph;
use crate::term::{GraphName, NamedOrBlankNode, Quad};
use indexmap::IndexMap;
use std::fmt;

/// An immutable RDF dataset: a default [`Graph`] plus named graphs.
///
/// Every quad belongs to exactly one graph and graph names are unique.
/// Named graphs keep their insertion order for deterministic serialization;
/// equality ignores it.
///
/// ```
/// use elkrdf::{Dataset, NamedNode, Quad, Literal};
///
/// let g = NamedNode::new("http://example.org/g")?;
/// let dataset = Dataset::from_quads([Quad::new(
///     NamedNode::new("http://example.org/s")?,
///     NamedNode::new("http://example.org/p")?,
///     Literal::from("o"),
///     g.clone(),
/// )]);
/// assert!(dataset.default_graph().is_empty());
/// assert_eq!(dataset.graph_names().count(), 1);
/// assert_eq!(dataset.named_graph(&g.into()).map(elkrdf::Graph::len), Some(1));
/// # Result::<_, elkrdf::IriParseError>::Ok(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    default: Graph,
    named: IndexMap<NamedOrBlankNode, Graph>,
}

impl Dataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dataset holding `graph` as its default graph.
    pub fn from_graph(graph: Graph) -> Self {
        Self {
            default: graph,
            named: IndexMap::new(),
        }
    }

    /// Creates a dataset by grouping quads by graph name.
    pub fn from_quads(quads: impl IntoIterator<Item = Quad>) -> Self {
        let mut default = Vec::new();
        let mut named: IndexMap<NamedOrBlankNode, Vec<_>> = IndexMap::new();
        for quad in quads {
            match quad.graph_name.clone() {
                GraphName::DefaultGraph => default.push(quad.into_triple()),
                GraphName::NamedNode(name) => named
                    .entry(name.into())
                    .or_default()
                    .push(quad.into_triple()),
                GraphName::BlankNode(name) => named
                    .entry(name.into())
                    .or_default()
                    .push(quad.into_triple()),
            }
        }
        Self {
            default: Graph::from_triples(default),
            named: named
                .into_iter()
                .map(|(name, triples)| (name, Graph::from_triples(triples)))
                .collect(),
        }
    }

    /// The default graph.
    pub fn default_graph(&self) -> &Graph {
        &self.default
    }

    /// The graph with the given name, `None` if absent.
    ///
    /// [`GraphName::DefaultGraph`] returns the default graph, which always
    /// exists.
    pub fn graph(&self, name: &GraphName) -> Option<&Graph> {
        match name {
            GraphName::DefaultGraph => Some(&self.default),
            GraphName::NamedNode(node) => self.named.get(&NamedOrBlankNode::from(node.clone())),
            GraphName::BlankNode(node) => self.named.get(&NamedOrBlankNode::from(node.clone())),
        }
    }

    /// The named graph with the given name, `None` if absent.
    pub fn named_graph(&self, name: &NamedOrBlankNode) -> Option<&Graph> {
        self.named.get(name)
    }

    /// The names of the named graphs, in insertion order.
    pub fn graph_names(&self) -> impl Iterator<Item = &NamedOrBlankNode> {
        self.named.keys()
    }

    /// All quads: default graph first, then named graphs in insertion order.
    pub fn quads(&self) -> impl Iterator<Item = Quad> + '_ {
        self.default
            .iter()
            .map(|t| t.clone().in_graph(GraphName::DefaultGraph))
            .chain(self.named.iter().flat_map(|(name, graph)| {
                graph
                    .iter()
                    .map(move |t| t.clone().in_graph(GraphName::from(name.clone())))
            }))
    }

    /// Merges every named graph into the default graph, dropping graph
    /// names. Blank nodes are preserved without renaming.
    #[must_use]
    pub fn flattened(&self) -> Graph {
        if self.named.values().all(Graph::is_empty) {
            return self.default.clone();
        }
        Graph::from_triples(
            self.default
                .iter()
                .cloned()
                .chain(self.named.values().flat_map(Graph::iter).cloned()),
        )
    }

    /// The total number of quads.
    pub fn len(&self) -> usize {
        self.default.len() + self.named.values().map(Graph::len).sum::<usize>()
    }

    /// Checks if the dataset holds no quad at all.
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.named.values().all(Graph::is_empty)
    }
}

impl FromIterator<Quad> for Dataset {
    fn from_iter<I: IntoIterator<Item = Quad>>(iter: I) -> Self {
        Self::from_quads(iter)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quad in self.quads() {
            writeln!(f, "{quad} .")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Literal, NamedNode, Triple};

    fn node(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{s}"))
    }

    #[test]
    fn groups_quads_by_graph() {
        let quads = vec![
            Quad::new(node("s"), node("p"), Literal::from("default"), GraphName::DefaultGraph),
            Quad::new(node("s"), node("p"), Literal::from("one"), node("g1")),
            Quad::new(node("s"), node("p"), Literal::from("two"), node("g1")),
            Quad::new(node("s"), node("p"), Literal::from("three"), node("g2")),
        ];
        let dataset = Dataset::from_quads(quads.clone());
        assert_eq!(dataset.default_graph().len(), 1);
        assert_eq!(dataset.named_graph(&node("g1").into()).unwrap().len(), 2);
        assert_eq!(dataset.named_graph(&node("g2").into()).unwrap().len(), 1);
        assert_eq!(dataset.len(), 4);

        // from_quads(quads()) roundtrips as a multiset
        let roundtripped = Dataset::from_quads(dataset.quads());
        assert_eq!(roundtripped, dataset);
        let mut original = quads;
        let mut output: Vec<_> = dataset.quads().collect();
        original.sort_by_key(ToString::to_string);
        output.sort_by_key(ToString::to_string);
        assert_eq!(original, output);
    }

    #[test]
    fn flatten_drops_graph_names() {
        let dataset = Dataset::from_quads([
            Quad::new(node("s"), node("p"), Literal::from("a"), GraphName::DefaultGraph),
            Quad::new(node("s"), node("p"), Literal::from("b"), node("g")),
        ]);
        let flat = dataset.flattened();
        assert_eq!(flat.len(), 2);
        assert!(flat.contains(&Triple::new(node("s"), node("p"), Literal::from("a"))));
        assert!(flat.contains(&Triple::new(node("s"), node("p"), Literal::from("b"))));
    }

    #[test]
    fn default_graph_is_always_reachable() {
        let dataset = Dataset::new();
        assert!(dataset.graph(&GraphName::DefaultGraph).is_some());
        assert!(dataset.graph(&GraphName::from(node("g"))).is_none());
        assert!(dataset.is_empty());
    }
}
