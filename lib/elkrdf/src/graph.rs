//! In-memory implementation of [RDF graphs](https://www.w3.org/TR/rdf11-concepts/#dfn-graph).

use crate::term::{NamedOrBlankNode, Term, Triple};
use crate::NamedNode;
use std::collections::HashMap;
use std::fmt;
use std::slice;
use std::sync::Arc;

/// An immutable, indexed set of [`Triple`]s.
///
/// Graphs are persistent values: [`add`](Graph::add),
/// [`add_all`](Graph::add_all) and [`merge`](Graph::merge) return new
/// graphs and never mutate the receiver, and the new graph shares the
/// underlying triple storage of the graph it extends. Triples live in
/// reference-counted segments whose sizes at least double front to back;
/// extending a graph appends a (possibly merged) trailing segment and
/// reuses the large segments untouched, and cloning a graph only bumps
/// reference counts.
///
/// Each segment carries three per-position hash indices and a graph holds
/// a logarithmic number of segments, so [`find`](Graph::find) with any
/// bound position avoids a full scan. Insertion order is preserved for
/// deterministic serialization but is irrelevant for equality, which is
/// set equality (blank nodes compared by identity).
///
/// ```
/// use elkrdf::{Graph, NamedNode, Triple};
///
/// let ex = NamedNode::new("http://example.com")?;
/// let graph = Graph::new().add(Triple::new(ex.clone(), ex.clone(), ex.clone()));
///
/// let results: Vec<_> = graph.find(None, Some(&ex), None).collect();
/// assert_eq!(results.len(), 1);
/// # Result::<_, elkrdf::IriParseError>::Ok(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Graph {
    segments: Vec<Arc<Segment>>,
    len: usize,
}

/// One immutable, deduplicated run of triples plus its indices.
#[derive(Debug, Default)]
struct Segment {
    triples: Vec<Triple>,
    by_subject: HashMap<NamedOrBlankNode, Vec<usize>>,
    by_predicate: HashMap<NamedNode, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
}

impl Segment {
    fn push(&mut self, triple: Triple) {
        let i = self.triples.len();
        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .push(i);
        self.by_predicate
            .entry(triple.predicate.clone())
            .or_default()
            .push(i);
        self.by_object
            .entry(triple.object.clone())
            .or_default()
            .push(i);
        self.triples.push(triple);
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.by_subject
            .get(&triple.subject)
            .is_some_and(|indices| indices.iter().any(|&i| self.triples[i] == *triple))
    }

    fn len(&self) -> usize {
        self.triples.len()
    }
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph from triples, deduplicating them.
    pub fn from_triples(triples: impl IntoIterator<Item = Triple>) -> Self {
        Self::new().add_all(triples)
    }

    /// Returns a new graph also containing `triple`, sharing the storage
    /// of this one.
    #[must_use]
    pub fn add(&self, triple: Triple) -> Self {
        self.add_all([triple])
    }

    /// Returns a new graph also containing every triple of `triples`.
    #[must_use]
    pub fn add_all(&self, triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut tail = Segment::default();
        for triple in triples {
            if !self.contains(&triple) && !tail.contains(&triple) {
                tail.push(triple);
            }
        }
        if tail.triples.is_empty() {
            return self.clone();
        }
        let mut graph = Self {
            segments: self.segments.clone(),
            len: self.len + tail.len(),
        };
        graph.segments.push(Arc::new(tail));
        graph.compact();
        graph
    }

    /// Returns the union of both graphs.
    ///
    /// Blank nodes keep their identity: no renaming happens, so a node
    /// shared by both inputs stays a single node in the result.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        self.add_all(other.iter().cloned())
    }

    /// Re-merges trailing segments until sizes at least double front to
    /// back, keeping the segment count logarithmic in the triple count.
    /// Segments shared with an older graph version are copied only here.
    fn compact(&mut self) {
        while self.segments.len() >= 2 {
            let last_len = self.segments[self.segments.len() - 1].len();
            let previous_len = self.segments[self.segments.len() - 2].len();
            if previous_len >= 2 * last_len {
                return;
            }
            let (Some(last), Some(previous)) = (self.segments.pop(), self.segments.pop()) else {
                return;
            };
            let mut merged = Segment::default();
            merged.triples.reserve(previous_len + last_len);
            for segment in [previous, last] {
                match Arc::try_unwrap(segment) {
                    Ok(segment) => {
                        for triple in segment.triples {
                            merged.push(triple);
                        }
                    }
                    Err(segment) => {
                        for triple in &segment.triples {
                            merged.push(triple.clone());
                        }
                    }
                }
            }
            self.segments.push(Arc::new(merged));
        }
    }

    /// Checks if the graph contains the given triple.
    pub fn contains(&self, triple: &Triple) -> bool {
        self.segments.iter().any(|segment| segment.contains(triple))
    }

    /// Returns the triples matching the pattern, lazily.
    ///
    /// A `None` position matches anything; the all-`None` pattern returns
    /// every triple. When at least one position is bound the smallest
    /// matching index of each segment drives the iteration.
    pub fn find<'a, 'b>(
        &'a self,
        subject: Option<&'b NamedOrBlankNode>,
        predicate: Option<&'b NamedNode>,
        object: Option<&'b Term>,
    ) -> FindTriples<'a, 'b> {
        FindTriples {
            segments: self.segments.iter(),
            cursor: SegmentCursor::Done,
            subject,
            predicate,
            object,
        }
    }

    /// Returns all triples of the graph in insertion order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            segments: self.segments.iter(),
            current: slice::Iter::default(),
        }
    }

    /// Returns the distinct subjects of the graph in insertion order.
    pub fn subjects(&self) -> impl Iterator<Item = &NamedOrBlankNode> {
        let mut seen = std::collections::HashSet::new();
        self.iter()
            .map(|t| &t.subject)
            .filter(move |s| seen.insert(*s))
    }

    /// Returns the triples with the given subject.
    pub fn triples_for_subject<'a, 'b>(
        &'a self,
        subject: &'b NamedOrBlankNode,
    ) -> FindTriples<'a, 'b> {
        self.find(Some(subject), None, None)
    }

    /// Returns the first object of a triple matching (subject, predicate).
    pub fn object_for_subject_predicate<'a>(
        &'a self,
        subject: &NamedOrBlankNode,
        predicate: &NamedNode,
    ) -> Option<&'a Term> {
        self.find(Some(subject), Some(predicate), None)
            .next()
            .map(|t| &t.object)
    }

    /// Returns the number of triples in this graph.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks if this graph contains no triple.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|t| other.contains(t))
    }
}

impl Eq for Graph {}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Triple;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        Self::from_triples(iter)
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for triple in self {
            writeln!(f, "{triple} .")?;
        }
        Ok(())
    }
}

/// Iterator returned by [`Graph::iter`].
pub struct Iter<'a> {
    segments: slice::Iter<'a, Arc<Segment>>,
    current: slice::Iter<'a, Triple>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Triple;

    fn next(&mut self) -> Option<&'a Triple> {
        loop {
            if let Some(triple) = self.current.next() {
                return Some(triple);
            }
            self.current = self.segments.next()?.triples.iter();
        }
    }
}

/// Iterator returned by [`Graph::find`].
pub struct FindTriples<'a, 'b> {
    segments: slice::Iter<'a, Arc<Segment>>,
    cursor: SegmentCursor<'a>,
    subject: Option<&'b NamedOrBlankNode>,
    predicate: Option<&'b NamedNode>,
    object: Option<&'b Term>,
}

enum SegmentCursor<'a> {
    Done,
    Indexed {
        segment: &'a Segment,
        indices: slice::Iter<'a, usize>,
    },
    Scan(slice::Iter<'a, Triple>),
}

impl FindTriples<'_, '_> {
    fn matches(&self, triple: &Triple) -> bool {
        self.subject.is_none_or(|s| *s == triple.subject)
            && self.predicate.is_none_or(|p| *p == triple.predicate)
            && self.object.is_none_or(|o| *o == triple.object)
    }
}

impl<'a> Iterator for FindTriples<'a, '_> {
    type Item = &'a Triple;

    fn next(&mut self) -> Option<&'a Triple> {
        loop {
            let candidate = match &mut self.cursor {
                SegmentCursor::Done => None,
                SegmentCursor::Indexed { segment, indices } => {
                    indices.next().map(|&i| &segment.triples[i])
                }
                SegmentCursor::Scan(triples) => triples.next(),
            };
            match candidate {
                Some(triple) => {
                    if self.matches(triple) {
                        return Some(triple);
                    }
                }
                None => {
                    let segment = self.segments.next()?;
                    self.cursor =
                        segment_cursor(segment, self.subject, self.predicate, self.object);
                }
            }
        }
    }
}

/// Picks the smallest matching index of a segment, or a full scan for the
/// unbound pattern.
fn segment_cursor<'a>(
    segment: &'a Segment,
    subject: Option<&NamedOrBlankNode>,
    predicate: Option<&NamedNode>,
    object: Option<&Term>,
) -> SegmentCursor<'a> {
    const EMPTY: &[usize] = &[];
    let mut best: Option<&'a [usize]> = None;
    let mut narrow = |indices: Option<&'a Vec<usize>>| {
        let indices = indices.map_or(EMPTY, Vec::as_slice);
        if best.is_none_or(|current| indices.len() < current.len()) {
            best = Some(indices);
        }
    };
    if let Some(subject) = subject {
        narrow(segment.by_subject.get(subject));
    }
    if let Some(predicate) = predicate {
        narrow(segment.by_predicate.get(predicate));
    }
    if let Some(object) = object {
        narrow(segment.by_object.get(object));
    }
    match best {
        Some(indices) => SegmentCursor::Indexed {
            segment,
            indices: indices.iter(),
        },
        None => SegmentCursor::Scan(segment.triples.iter()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlankNode, Literal};

    fn node(s: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{s}"))
    }

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(node(s), node(p), node(o))
    }

    #[test]
    fn add_returns_a_new_graph() {
        let empty = Graph::new();
        let one = empty.add(triple("s", "p", "o"));
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
        assert!(one.contains(&triple("s", "p", "o")));
    }

    #[test]
    fn deduplicates() {
        let graph = Graph::from_triples([triple("s", "p", "o"), triple("s", "p", "o")]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.add(triple("s", "p", "o")).len(), 1);
    }

    #[test]
    fn equality_ignores_order() {
        let a = Graph::from_triples([triple("s", "p", "o"), triple("s2", "p", "o")]);
        let b = Graph::from_triples([triple("s2", "p", "o"), triple("s", "p", "o")]);
        assert_eq!(a, b);
        assert_ne!(a, Graph::new());
    }

    #[test]
    fn find_matches_pattern_exactly() {
        let graph = Graph::from_triples([
            triple("s", "p", "o"),
            triple("s", "p", "o2"),
            triple("s", "q", "o"),
            triple("s2", "p", "o"),
        ]);
        let s = node("s").into();
        let p = node("p");
        let o = node("o").into();
        assert_eq!(graph.find(Some(&s), None, None).count(), 3);
        assert_eq!(graph.find(None, Some(&p), None).count(), 3);
        assert_eq!(graph.find(None, None, Some(&o)).count(), 3);
        assert_eq!(graph.find(Some(&s), Some(&p), None).count(), 2);
        assert_eq!(graph.find(Some(&s), Some(&p), Some(&o)).count(), 1);
        assert_eq!(graph.find(None, None, None).count(), 4);
        let missing = node("nope").into();
        assert_eq!(graph.find(Some(&missing), None, None).count(), 0);
    }

    #[test]
    fn find_spans_segments() {
        // Grow through several segment merges, then extend, so matches
        // live in more than one segment.
        let mut graph = Graph::new();
        for i in 0..20 {
            graph = graph.add(triple(&format!("s{i}"), "p", "o"));
        }
        let p = node("p");
        assert_eq!(graph.find(None, Some(&p), None).count(), 20);
        let subjects: Vec<_> = graph.subjects().map(ToString::to_string).collect();
        assert_eq!(subjects.first().map(String::as_str), Some("<http://example.org/s0>"));
        assert_eq!(subjects.len(), 20);
    }

    #[test]
    fn merge_preserves_blank_identity() {
        let bnode = BlankNode::default();
        let a = Graph::new().add(Triple::new(bnode.clone(), node("p"), Literal::from("x")));
        let b = Graph::new().add(Triple::new(bnode.clone(), node("q"), Literal::from("y")));
        let merged = a.merge(&b);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged
                .triples_for_subject(&bnode.clone().into())
                .count(),
            2
        );
    }

    #[test]
    fn insertion_order_is_preserved() {
        let graph = Graph::from_triples([triple("b", "p", "o"), triple("a", "p", "o")]);
        let subjects: Vec<_> = graph.subjects().map(|s| s.as_str().to_owned()).collect();
        assert_eq!(subjects, ["http://example.org/b", "http://example.org/a"]);
    }

    #[test]
    fn versions_share_segments() {
        let mut graph = Graph::new();
        for i in 0..40 {
            graph = graph.add(triple(&format!("s{i}"), "p", "o"));
        }
        // Repeated single adds keep a logarithmic number of segments.
        assert!(graph.segments.len() <= 7, "{} segments", graph.segments.len());

        let extended = graph.add(triple("extra", "p", "o"));
        // The new version reuses the old storage instead of copying it.
        assert!(Arc::ptr_eq(&graph.segments[0], &extended.segments[0]));
        assert_eq!(graph.len(), 40);
        assert_eq!(extended.len(), 41);

        let merged = Graph::new().merge(&extended);
        assert!(Arc::ptr_eq(&extended.segments[0], &merged.segments[0]));
    }
}
