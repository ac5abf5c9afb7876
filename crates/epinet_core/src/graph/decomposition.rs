//! Cut vertices and biconnected splicing.
//!
//! A graph is spliced by removing its first cut vertex, adding it back to every
//! component left behind and splicing those pieces in turn until none of them
//! has a cut vertex. Disconnected graphs are spliced one component at a time.
//!
//! The cut vertices of a piece are the cut vertices of its parent that it
//! contains, minus the vertex it was split at, so the low-link search runs once
//! and the pieces are tracked as vertex sets of the input graph.

use super::Graph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Approximate isomorphism class of a graph: vertex count, edge count and the
/// sorted degree sequence. Isomorphic graphs always share a class; the converse
/// does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IsoClass {
    pub vertices: usize,
    pub edges: usize,
    pub degrees: Vec<usize>,
}

impl IsoClass {
    pub fn of(graph: &Graph) -> Self {
        let mut degrees: Vec<usize> = graph.vertices().map(|v| graph.degree(v)).collect();
        degrees.sort_unstable();
        Self {
            vertices: graph.num_vertices(),
            edges: graph.num_edges(),
            degrees,
        }
    }
}

/// Everything derived from the biconnected structure of one graph version.
#[derive(Debug, Clone)]
pub struct Decomposition {
    version: u64,
    cut_vertices: Vec<usize>,
    spliced: Vec<Graph>,
    cut_vertex_freq: BTreeMap<usize, usize>,
    sub_graph_freq: BTreeMap<IsoClass, usize>,
}

impl Decomposition {
    #[instrument(skip_all, fields(graph = graph.name(), vertices = graph.num_vertices()))]
    pub(super) fn compute(graph: &Graph) -> Self {
        let cut_vertices = find_cut_vertices(graph);

        let mut spliced = Vec::new();
        if cut_vertices.is_empty() && graph.is_connected() {
            spliced.push(graph.clone());
        } else {
            for component in graph.connected_components() {
                splice_connected(graph, component, &cut_vertices, &mut spliced);
            }
        }

        let cut_vertex_freq = cut_vertices
            .iter()
            .filter_map(|&c| graph.label(c))
            .map(|label| {
                let count = spliced
                    .iter()
                    .filter(|piece| piece.labels().contains(&label))
                    .count();
                (label, count)
            })
            .collect();

        let mut sub_graph_freq = BTreeMap::new();
        for piece in &spliced {
            *sub_graph_freq.entry(piece.iso_class()).or_insert(0) += 1;
        }

        debug!(
            cut_vertices = cut_vertices.len(),
            pieces = spliced.len(),
            classes = sub_graph_freq.len(),
            "spliced graph"
        );

        Self {
            version: graph.version(),
            cut_vertices,
            spliced,
            cut_vertex_freq,
            sub_graph_freq,
        }
    }

    /// Graph version this decomposition was computed for.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn cut_vertices(&self) -> &[usize] {
        &self.cut_vertices
    }

    pub fn spliced(&self) -> &[Graph] {
        &self.spliced
    }

    pub fn cut_vertex_freq(&self) -> &BTreeMap<usize, usize> {
        &self.cut_vertex_freq
    }

    pub fn sub_graph_freq(&self) -> &BTreeMap<IsoClass, usize> {
        &self.sub_graph_freq
    }
}

/// Splices one connected component, given as ascending vertices of `graph`.
///
/// Pieces are emitted depth first: all pieces from the first component left by
/// a split come before any from the second. The worklist keeps that order
/// without recursing once per cut vertex.
fn splice_connected(
    graph: &Graph,
    component: Vec<usize>,
    cut_vertices: &[usize],
    out: &mut Vec<Graph>,
) {
    let cuts = within(cut_vertices, &component);
    let mut work = vec![(component, cuts)];

    while let Some((members, cuts)) = work.pop() {
        let Some((&cut, remaining)) = cuts.split_first() else {
            out.push(graph.induced(&members));
            continue;
        };
        let rest: Vec<usize> = members.into_iter().filter(|&v| v != cut).collect();
        let pieces: Vec<(Vec<usize>, Vec<usize>)> = graph
            .components_within(&rest)
            .into_iter()
            .map(|mut piece| {
                piece.push(cut);
                piece.sort_unstable();
                let cuts = within(remaining, &piece);
                (piece, cuts)
            })
            .collect();
        work.extend(pieces.into_iter().rev());
    }
}

/// The entries of `cuts` that belong to the ascending vertex list `members`.
fn within(cuts: &[usize], members: &[usize]) -> Vec<usize> {
    cuts.iter()
        .copied()
        .filter(|v| members.binary_search(v).is_ok())
        .collect()
}

/// Articulation points by low-link search, ascending.
///
/// The depth-first search keeps its own stack of `(vertex, parent, next
/// neighbour)` frames so long paths cannot overflow the call stack.
pub(super) fn find_cut_vertices(graph: &Graph) -> Vec<usize> {
    let n = graph.num_vertices();
    let neighbours: Vec<Vec<usize>> = graph.vertices().map(|v| graph.neighbours(v)).collect();
    let mut disc: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0; n];
    let mut is_cut = vec![false; n];
    let mut time = 0;

    for root in 0..n {
        if disc[root].is_some() {
            continue;
        }
        disc[root] = Some(time);
        low[root] = time;
        time += 1;
        let mut root_children = 0;
        let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];

        while let Some(frame) = stack.last_mut() {
            let (u, parent, next) = *frame;
            match neighbours[u].get(next) {
                Some(&v) => {
                    frame.2 += 1;
                    match disc[v] {
                        None => {
                            disc[v] = Some(time);
                            low[v] = time;
                            time += 1;
                            if u == root {
                                root_children += 1;
                            }
                            stack.push((v, Some(u), 0));
                        }
                        Some(d) if Some(v) != parent => low[u] = low[u].min(d),
                        Some(_) => {}
                    }
                }
                None => {
                    stack.pop();
                    if let Some(p) = parent {
                        low[p] = low[p].min(low[u]);
                        if p != root && disc[p].is_some_and(|d| low[u] >= d) {
                            is_cut[p] = true;
                        }
                    }
                }
            }
        }

        if root_children >= 2 {
            is_cut[root] = true;
        }
    }

    (0..n).filter(|&v| is_cut[v]).collect()
}

#[cfg(test)]
mod tests {
    use super::super::generators;
    use super::*;

    fn labels_of(pieces: &[Graph]) -> Vec<Vec<usize>> {
        pieces.iter().map(|p| p.labels().to_vec()).collect()
    }

    #[test]
    fn test_lollipop_has_one_cut_vertex() {
        let g = generators::lollipop();
        assert_eq!(g.cut_vertices(), &[0]);

        let pieces = g.splice();
        assert_eq!(pieces.len(), 2);
        assert_eq!(labels_of(pieces), vec![vec![0, 1, 2], vec![0, 3]]);
        assert_eq!(pieces[0].num_edges(), 3);
        assert_eq!(pieces[1].num_edges(), 1);
        assert_eq!(g.cut_vertex_freq().get(&0), Some(&2));
    }

    #[test]
    fn test_biconnected_graph_splices_to_itself() {
        for g in [generators::triangle(), generators::toast(), generators::cycle(6)] {
            assert!(g.cut_vertices().is_empty());
            assert_eq!(g.splice(), std::slice::from_ref(&g));
            assert!(g.cut_vertex_freq().is_empty());
        }
    }

    #[test]
    fn test_degenerate_graphs() {
        let empty = Graph::new(0, "empty");
        assert!(empty.cut_vertices().is_empty());
        assert_eq!(empty.splice(), std::slice::from_ref(&empty));

        let single = Graph::new(1, "single");
        assert!(single.cut_vertices().is_empty());
        assert_eq!(single.splice(), std::slice::from_ref(&single));

        let edge = generators::edge();
        assert!(edge.cut_vertices().is_empty());
        assert_eq!(edge.splice().len(), 1);
    }

    #[test]
    fn test_disconnected_graph_splices_per_component() {
        let g = Graph::from_edges(5, "two parts", &[(0, 1), (1, 2), (3, 4)]).unwrap();
        assert_eq!(g.cut_vertices(), &[1]);
        assert_eq!(
            labels_of(g.splice()),
            vec![vec![0, 1], vec![1, 2], vec![3, 4]]
        );

        let isolated = Graph::from_edges(3, "isolated", &[(0, 1)]).unwrap();
        assert!(isolated.cut_vertices().is_empty());
        assert_eq!(labels_of(isolated.splice()), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_bow_tie_pieces_share_a_class() {
        let g = generators::bow_tie();
        assert_eq!(g.cut_vertices(), &[0]);
        assert_eq!(labels_of(g.splice()), vec![vec![0, 1, 2], vec![0, 3, 4]]);

        let triangle = generators::triangle().iso_class();
        assert_eq!(g.sub_graph_freq().get(&triangle), Some(&2));
        assert_eq!(g.sub_graph_freq().len(), 1);
    }

    #[test]
    fn test_bow_tie_with_bridge_recurses() {
        let g = generators::bow_tie_with_bridge();
        assert_eq!(g.cut_vertices(), &[0, 3]);
        assert_eq!(
            labels_of(g.splice()),
            vec![vec![0, 1, 2], vec![0, 3], vec![3, 4, 5]]
        );
        assert_eq!(g.cut_vertex_freq().get(&0), Some(&2));
        assert_eq!(g.cut_vertex_freq().get(&3), Some(&2));
        assert_eq!(g.sub_graph_freq().get(&generators::edge().iso_class()), Some(&1));
    }

    #[test]
    fn test_path_and_star() {
        let path = generators::path(5);
        assert_eq!(path.cut_vertices(), &[1, 2, 3]);
        assert_eq!(path.splice().len(), 4);
        assert!(path.cut_vertex_freq().values().all(|&f| f == 2));

        let star = generators::star(5);
        assert_eq!(star.cut_vertices(), &[0]);
        assert_eq!(star.splice().len(), 4);
        assert_eq!(star.cut_vertex_freq().get(&0), Some(&4));
    }

    #[test]
    fn test_long_path_does_not_overflow() {
        let g = generators::path(20_000);
        assert_eq!(find_cut_vertices(&g).len(), 19_998);
    }

    #[test]
    fn test_long_path_splices_without_overflow() {
        let n = 3_000;
        let g = generators::path(n);
        let pieces = g.splice();
        assert_eq!(pieces.len(), n - 1);
        assert_eq!(pieces[0].labels(), &[0, 1]);
        assert_eq!(pieces[n - 2].labels(), &[n - 2, n - 1]);
        assert!(pieces.iter().all(|p| p.num_edges() == 1));
        assert_eq!(g.cut_vertex_freq().len(), n - 2);
    }

    #[test]
    fn test_splice_order_is_depth_first() {
        // Cut vertex 0 joins {0,1,2} (with a tail 2-6) and the triangle {0,3,4}.
        let g = Graph::from_edges(
            7,
            "branches",
            &[(0, 1), (1, 2), (0, 2), (2, 6), (0, 3), (3, 4), (0, 4), (4, 5)],
        )
        .unwrap();
        assert_eq!(g.cut_vertices(), &[0, 2, 4]);
        assert_eq!(
            labels_of(g.splice()),
            vec![vec![0, 1, 2], vec![2, 6], vec![0, 3, 4], vec![4, 5]]
        );
    }

    #[test]
    fn test_iso_class_is_degree_multiset() {
        // Two non-isomorphic graphs on six vertices with the same degree sequence.
        let prism = Graph::from_edges(
            6,
            "prism",
            &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5), (0, 3), (1, 4), (2, 5)],
        )
        .unwrap();
        let k33 = Graph::from_edges(
            6,
            "K3,3",
            &[(0, 3), (0, 4), (0, 5), (1, 3), (1, 4), (1, 5), (2, 3), (2, 4), (2, 5)],
        )
        .unwrap();
        assert!(prism.is_isomorphic(&k33));
        assert!(!generators::path(4).is_isomorphic(&generators::star(4)));
    }
}
