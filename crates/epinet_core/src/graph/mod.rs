//! Contact networks.
//!
//! Vertices are dense indices `[0, n)`. Each vertex also carries a `label`, the
//! location it had in the graph it was cut from, so that induced sub-graphs and
//! splice pieces can be mapped back onto the original network.

mod decomposition;
pub mod generators;

pub use decomposition::{Decomposition, IsoClass};

use crate::error::GraphError;
use nalgebra::DMatrix;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::OnceLock;

/// Attributes stored on an adjacency entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub weight: Option<f64>,
    pub directed: bool,
}

impl Edge {
    const PLAIN: Edge = Edge {
        weight: None,
        directed: false,
    };
}

#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    labels: Vec<usize>,
    /// Outgoing adjacency. An undirected edge is stored in both directions.
    adjacency: Vec<BTreeMap<usize, Edge>>,
    /// Reverse adjacency, kept so the undirected view is cheap.
    incoming: Vec<BTreeSet<usize>>,
    num_edges: usize,
    version: u64,
    decomposition: OnceLock<Decomposition>,
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.labels == other.labels && self.adjacency == other.adjacency
    }
}

impl Graph {
    pub fn new(num_vertices: usize, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: (0..num_vertices).collect(),
            adjacency: vec![BTreeMap::new(); num_vertices],
            incoming: vec![BTreeSet::new(); num_vertices],
            num_edges: 0,
            version: 0,
            decomposition: OnceLock::new(),
        }
    }

    /// Builds an undirected, unweighted graph from an edge list.
    pub fn from_edges(
        num_vertices: usize,
        name: impl Into<String>,
        edges: &[(usize, usize)],
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new(num_vertices, name);
        for &(i, j) in edges {
            graph.add_edge(i, j)?;
        }
        Ok(graph)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn num_vertices(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of adjacent vertex pairs. A pair joined in both directions counts once.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Structural version, bumped by every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn vertices(&self) -> std::ops::Range<usize> {
        0..self.num_vertices()
    }

    /// Location `vertex` had in the graph it was cut from, `None` when out of range.
    pub fn label(&self, vertex: usize) -> Option<usize> {
        self.labels.get(vertex).copied()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn index_of(&self, label: usize) -> Option<usize> {
        self.labels.iter().position(|&l| l == label)
    }

    fn check(&self, vertex: usize) -> Result<(), GraphError> {
        if vertex < self.num_vertices() {
            Ok(())
        } else {
            Err(GraphError::VertexOutOfRange {
                vertex,
                len: self.num_vertices(),
            })
        }
    }

    fn check_pair(&self, i: usize, j: usize) -> Result<(), GraphError> {
        self.check(i)?;
        self.check(j)?;
        if i == j {
            return Err(GraphError::SelfLoop(i));
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.decomposition.take();
    }

    /// Inserts an edge without validation. A directed edge replaces only the
    /// `i -> j` entry, so opposing directed edges coexist; anything involving an
    /// undirected edge replaces whatever is stored on the pair.
    fn link(&mut self, i: usize, j: usize, edge: Edge) {
        let existed = self.has_edge(i, j);
        let was_undirected = self.edge(i, j).is_some_and(|e| !e.directed);
        if was_undirected || !edge.directed {
            self.unlink(i, j);
        }
        self.adjacency[i].insert(j, edge);
        self.incoming[j].insert(i);
        if !edge.directed {
            self.adjacency[j].insert(i, edge);
            self.incoming[i].insert(j);
        }
        if !existed {
            self.num_edges += 1;
        }
        self.touch();
    }

    fn unlink(&mut self, i: usize, j: usize) {
        self.adjacency[i].remove(&j);
        self.adjacency[j].remove(&i);
        self.incoming[i].remove(&j);
        self.incoming[j].remove(&i);
    }

    pub fn add_edge(&mut self, i: usize, j: usize) -> Result<(), GraphError> {
        self.check_pair(i, j)?;
        self.link(i, j, Edge::PLAIN);
        Ok(())
    }

    pub fn add_weighted_edge(&mut self, i: usize, j: usize, weight: f64) -> Result<(), GraphError> {
        self.check_pair(i, j)?;
        self.link(
            i,
            j,
            Edge {
                weight: Some(weight),
                directed: false,
            },
        );
        Ok(())
    }

    pub fn add_directed_edge(&mut self, from: usize, to: usize) -> Result<(), GraphError> {
        self.check_pair(from, to)?;
        self.link(
            from,
            to,
            Edge {
                weight: None,
                directed: true,
            },
        );
        Ok(())
    }

    pub fn add_weighted_directed_edge(
        &mut self,
        from: usize,
        to: usize,
        weight: f64,
    ) -> Result<(), GraphError> {
        self.check_pair(from, to)?;
        self.link(
            from,
            to,
            Edge {
                weight: Some(weight),
                directed: true,
            },
        );
        Ok(())
    }

    /// Removes whatever joins `i` and `j`, in either direction. Returns whether
    /// anything was removed.
    pub fn remove_edge(&mut self, i: usize, j: usize) -> bool {
        if !self.has_edge(i, j) {
            return false;
        }
        self.unlink(i, j);
        self.num_edges -= 1;
        self.touch();
        true
    }

    /// Appends an isolated vertex and returns its index. Its label is one past the
    /// largest label in use.
    pub fn add_vertex(&mut self) -> usize {
        let label = self.labels.iter().max().map_or(0, |&l| l + 1);
        self.labels.push(label);
        self.adjacency.push(BTreeMap::new());
        self.incoming.push(BTreeSet::new());
        self.touch();
        self.num_vertices() - 1
    }

    /// Removes a vertex and its edges. Later vertices shift down by one; labels
    /// travel with their vertices.
    pub fn remove_vertex(&mut self, vertex: usize) -> Result<(), GraphError> {
        self.check(vertex)?;
        let keep: Vec<usize> = self.vertices().filter(|&v| v != vertex).collect();
        let mut rebuilt = self.induced(&keep);
        rebuilt.name = std::mem::take(&mut self.name);
        rebuilt.version = self.version;
        *self = rebuilt;
        self.touch();
        Ok(())
    }

    /// True when `i` and `j` are joined in either direction.
    pub fn has_edge(&self, i: usize, j: usize) -> bool {
        i < self.num_vertices()
            && j < self.num_vertices()
            && (self.adjacency[i].contains_key(&j) || self.adjacency[j].contains_key(&i))
    }

    /// True when an edge leads from `from` to `to`. Undirected edges lead both ways.
    pub fn has_directed_edge(&self, from: usize, to: usize) -> bool {
        from < self.num_vertices() && self.adjacency[from].contains_key(&to)
    }

    pub fn edge(&self, from: usize, to: usize) -> Option<&Edge> {
        self.adjacency.get(from)?.get(&to)
    }

    /// Weight on the edge leading from `from` to `to`, if it exists and is weighted.
    pub fn weight(&self, from: usize, to: usize) -> Option<f64> {
        self.edge(from, to)?.weight
    }

    /// Vertices reachable along one outgoing edge, ascending. Empty for an
    /// out-of-range vertex.
    pub fn successors(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.out_edges(vertex).map(|(to, _)| to)
    }

    /// Vertices reachable along one outgoing edge, with the edge attributes.
    pub fn out_edges(&self, vertex: usize) -> impl Iterator<Item = (usize, &Edge)> + '_ {
        self.adjacency
            .get(vertex)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(&to, edge)| (to, edge)))
    }

    /// Neighbours in the undirected view of the graph, ascending. Empty for an
    /// out-of-range vertex.
    pub fn neighbours(&self, vertex: usize) -> Vec<usize> {
        let incoming = self.incoming.get(vertex).into_iter().flatten();
        let mut out: Vec<usize> = self.successors(vertex).chain(incoming.copied()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.neighbours(vertex).len()
    }

    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let all: Vec<usize> = self.vertices().collect();
        self.components_within(&all)
    }

    /// Connected components of the sub-graph induced by `subset`. Components are
    /// sorted internally and ordered by their smallest vertex.
    pub fn components_within(&self, subset: &[usize]) -> Vec<Vec<usize>> {
        let members: BTreeSet<usize> = subset
            .iter()
            .copied()
            .filter(|&v| v < self.num_vertices())
            .collect();
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for &start in &members {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(v) = queue.pop_front() {
                for w in self.neighbours(v) {
                    if members.contains(&w) && seen.insert(w) {
                        component.push(w);
                        queue.push_back(w);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    /// True when the vertices in `subset` induce a connected sub-graph. The empty
    /// set and singletons are connected.
    pub fn are_all_connected(&self, subset: &[usize]) -> bool {
        self.components_within(subset).len() <= 1
    }

    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }

    /// The sub-graph induced by `subset`, re-indexed densely in ascending order of
    /// the chosen vertices. Labels are preserved.
    pub fn induced(&self, subset: &[usize]) -> Graph {
        let chosen: BTreeSet<usize> = subset
            .iter()
            .copied()
            .filter(|&v| v < self.num_vertices())
            .collect();
        let index: BTreeMap<usize, usize> = chosen.iter().enumerate().map(|(k, &v)| (v, k)).collect();

        let mut graph = Graph::new(chosen.len(), self.name.clone());
        graph.labels = chosen.iter().map(|&v| self.labels[v]).collect();
        for (&v, &k) in &index {
            for (to, edge) in self.out_edges(v) {
                if let Some(&l) = index.get(&to) {
                    if edge.directed || k < l {
                        graph.link(k, l, *edge);
                    }
                }
            }
        }
        graph.version = 0;
        graph
    }

    /// One splicing step: removes `cut` from its connected component and returns
    /// the vertex sets of the components left behind, each with `cut` added back.
    pub fn split_at(&self, cut: usize) -> Vec<Vec<usize>> {
        if cut >= self.num_vertices() {
            return Vec::new();
        }
        let home = self
            .components_within(&self.vertices().collect::<Vec<_>>())
            .into_iter()
            .find(|c| c.contains(&cut))
            .unwrap_or_default();
        let rest: Vec<usize> = home.into_iter().filter(|&v| v != cut).collect();
        self.components_within(&rest)
            .into_iter()
            .map(|mut piece| {
                piece.push(cut);
                piece.sort_unstable();
                piece
            })
            .collect()
    }

    /// Dense adjacency matrix; entry `(i, j)` is 1 when an edge leads from `i` to `j`.
    pub fn adjacency_matrix(&self) -> DMatrix<f64> {
        let n = self.num_vertices();
        DMatrix::from_fn(n, n, |i, j| if self.has_directed_edge(i, j) { 1.0 } else { 0.0 })
    }

    /// Number of walks made of exactly `len` edges.
    pub fn count_walks(&self, len: usize) -> u64 {
        let n = self.num_vertices();
        let step = self.adjacency_matrix();
        let mut walks = DMatrix::<f64>::identity(n, n);
        for _ in 0..len {
            walks = &walks * &step;
        }
        walks.sum().round() as u64
    }

    pub fn iso_class(&self) -> IsoClass {
        IsoClass::of(self)
    }

    /// Approximate isomorphism: same vertex count, edge count and degree multiset.
    pub fn is_isomorphic(&self, other: &Graph) -> bool {
        self.iso_class() == other.iso_class()
    }

    /// The memoized decomposition, recomputed after any mutation.
    pub fn decomposition(&self) -> &Decomposition {
        self.decomposition
            .get_or_init(|| Decomposition::compute(self))
    }

    /// Cut vertices in ascending order.
    pub fn cut_vertices(&self) -> &[usize] {
        self.decomposition().cut_vertices()
    }

    /// Biconnected pieces of the graph, labels preserved.
    pub fn splice(&self) -> &[Graph] {
        self.decomposition().spliced()
    }

    /// Owned copy of [`Graph::splice`].
    pub fn spliced(&self) -> Vec<Graph> {
        self.splice().to_vec()
    }

    /// Number of splice pieces each cut vertex (by label) belongs to.
    pub fn cut_vertex_freq(&self) -> &BTreeMap<usize, usize> {
        self.decomposition().cut_vertex_freq()
    }

    /// Number of splice pieces in each approximate isomorphism class.
    pub fn sub_graph_freq(&self) -> &BTreeMap<IsoClass, usize> {
        self.decomposition().sub_graph_freq()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in self.vertices() {
            write!(f, "{v}->")?;
            for w in self.successors(v) {
                write!(f, " {w}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
