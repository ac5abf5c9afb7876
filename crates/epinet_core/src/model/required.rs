//! Enumeration of the tuples an exact ODE system must track.
//!
//! A single vertex is tracked in every state that needs its own equation. A
//! larger tuple is tracked when its locations are distinct and induce a
//! connected sub-graph, and its states are mixed. With `closures` set, tuples
//! holding only the base state are tracked as well.
//!
//! Rather than filtering every subset of the singles, connected location sets
//! are grown one neighbour at a time and then given every admissible state
//! assignment. The output set is the same.

use super::params::ModelParams;
use super::tuple::Tuple;
use super::vertex::Vertex;
use crate::graph::Graph;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredTuples {
    /// Sorted by size, then member-wise.
    tuples: Vec<Tuple>,
    single_states: Vec<char>,
    base_state: char,
    closures: bool,
}

impl RequiredTuples {
    #[instrument(skip_all, fields(graph = graph.name(), closures = closures))]
    pub fn new(graph: &Graph, model: &ModelParams, closures: bool) -> Self {
        let single_states = model.single_states();
        let base_state = model.base_state();
        let mut found = BTreeSet::new();

        for location in graph.vertices() {
            for &state in &single_states {
                found.insert(Tuple::single(Vertex::new(location, state)));
            }
        }

        for locations in connected_sets(graph) {
            for states in assignments(&single_states, locations.len()) {
                let tuple = Tuple::new(
                    locations
                        .iter()
                        .zip(&states)
                        .map(|(&location, &state)| Vertex::new(location, state)),
                );
                if admits_states(&tuple, base_state, closures) {
                    found.insert(tuple);
                }
            }
        }

        let required = Self {
            tuples: found.into_iter().collect(),
            single_states,
            base_state,
            closures,
        };
        debug!(tuples = required.len(), sizes = ?required.sizes(), "enumerated required tuples");
        required
    }

    /// The singles: one tuple per vertex and per state needing its own equation.
    pub fn singles(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.tuples.iter().take_while(|t| t.len() == 1)
    }

    /// Membership rule applied to an arbitrary tuple.
    pub fn is_required(&self, tuple: &Tuple, graph: &Graph) -> bool {
        !tuple.is_empty()
            && tuple.locations_are_different()
            && tuple.vertices().iter().all(|v| {
                v.location < graph.num_vertices() && self.single_states.contains(&v.state)
            })
            && graph.are_all_connected(&tuple.locations())
            && (tuple.len() == 1 || admits_states(tuple, self.base_state, self.closures))
    }

    pub fn closures(&self) -> bool {
        self.closures
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tuple> {
        self.tuples.get(index)
    }

    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.index_of(tuple).is_some()
    }

    pub fn index_of(&self, tuple: &Tuple) -> Option<usize> {
        self.tuples.binary_search(tuple).ok()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tuple> {
        self.tuples.iter()
    }

    /// Number of tuples of each size.
    pub fn sizes(&self) -> BTreeMap<usize, usize> {
        let mut sizes = BTreeMap::new();
        for t in &self.tuples {
            *sizes.entry(t.len()).or_insert(0) += 1;
        }
        sizes
    }
}

impl<'a> IntoIterator for &'a RequiredTuples {
    type Item = &'a Tuple;
    type IntoIter = std::slice::Iter<'a, Tuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.tuples.iter()
    }
}

impl fmt::Display for RequiredTuples {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for t in &self.tuples {
            writeln!(f, "{t}")?;
        }
        Ok(())
    }
}

/// Mixed states, or only the base state when closures are tracked.
fn admits_states(tuple: &Tuple, base_state: char, closures: bool) -> bool {
    !tuple.is_homogeneous()
        || (closures && tuple.vertices().iter().all(|v| v.state == base_state))
}

/// Every connected vertex set with at least two members, each sorted.
fn connected_sets(graph: &Graph) -> BTreeSet<Vec<usize>> {
    let mut seen: BTreeSet<Vec<usize>> = graph.vertices().map(|v| vec![v]).collect();
    let mut frontier: Vec<Vec<usize>> = seen.iter().cloned().collect();

    while let Some(set) = frontier.pop() {
        let mut reach = BTreeSet::new();
        for &v in &set {
            reach.extend(graph.neighbours(v));
        }
        for w in reach {
            if set.binary_search(&w).is_ok() {
                continue;
            }
            let mut grown = set.clone();
            grown.push(w);
            grown.sort_unstable();
            if seen.insert(grown.clone()) {
                frontier.push(grown);
            }
        }
    }

    seen.retain(|set| set.len() >= 2);
    seen
}

/// All length-`len` sequences over `states`.
fn assignments(states: &[char], len: usize) -> Vec<Vec<char>> {
    let mut out: Vec<Vec<char>> = vec![Vec::new()];
    for _ in 0..len {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                states.iter().map(move |&s| {
                    let mut next = prefix.clone();
                    next.push(s);
                    next
                })
            })
            .collect();
    }
    out
}
