//! Cut-vertex closures.
//!
//! When a tuple's member at a cut vertex holds the base state and the rest of
//! the tuple falls on two or more sides of that cut vertex, the sides evolve
//! independently given the cut vertex. The tuple is then closed as
//!
//! ```text
//! 〈T〉 ≈ 〈F1〉〈F2〉…〈Fk〉 / 〈c〉^(k-1)
//! ```
//!
//! where each factor `Fi` holds the members on one side plus the cut vertex in
//! the base state and `〈c〉` is the cut vertex alone in the base state.

use super::equation::Equation;
use super::params::ModelParams;
use super::required::RequiredTuples;
use super::tuple::Tuple;
use crate::graph::Graph;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    pub tuple: Tuple,
    pub factors: Vec<Tuple>,
    pub denominator: Tuple,
}

impl Closure {
    /// Closure of `tuple` at the first eligible cut vertex, if any.
    pub fn find(tuple: &Tuple, graph: &Graph, model: &ModelParams) -> Option<Self> {
        if tuple.len() <= 2 {
            return None;
        }
        let base = model.base_state();
        let cut_vertices = graph.cut_vertices();

        tuple
            .vertices()
            .iter()
            .filter(|v| v.state == base && cut_vertices.binary_search(&v.location).is_ok())
            .find_map(|&cut| {
                let factors: Vec<Tuple> = graph
                    .split_at(cut.location)
                    .into_iter()
                    .filter_map(|piece| {
                        let side: Vec<_> = tuple
                            .vertices()
                            .iter()
                            .filter(|v| v.location != cut.location)
                            .filter(|v| piece.binary_search(&v.location).is_ok())
                            .copied()
                            .collect();
                        (!side.is_empty()).then(|| Tuple::new(side).with(cut))
                    })
                    .collect();
                (factors.len() >= 2).then(|| Closure {
                    tuple: tuple.clone(),
                    factors,
                    denominator: Tuple::single(cut),
                })
            })
    }

    /// Power the denominator is raised to.
    pub fn power(&self) -> i32 {
        self.factors.len() as i32 - 1
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}≈", self.tuple)?;
        for factor in &self.factors {
            write!(f, "{factor}")?;
        }
        write!(f, "/{}", self.denominator)?;
        if self.power() > 1 {
            write!(f, "^{}", self.power())?;
        }
        Ok(())
    }
}

/// Tracked equations and closures of a reduced system.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub equations: Vec<Equation>,
    pub closures: Vec<Closure>,
}

/// Starting from the required tuples, closes every closable tuple and derives an
/// equation for every other one, following factors and equation sources until
/// each referenced tuple is either tracked or closed.
#[instrument(skip_all, fields(graph = graph.name(), required = required.len()))]
pub fn reduce(graph: &Graph, model: &ModelParams, required: &RequiredTuples) -> Reduction {
    let mut tracked: BTreeMap<Tuple, Equation> = BTreeMap::new();
    let mut closed: BTreeMap<Tuple, Closure> = BTreeMap::new();
    let mut queue: VecDeque<Tuple> = required.iter().cloned().collect();

    while let Some(tuple) = queue.pop_front() {
        if tracked.contains_key(&tuple) || closed.contains_key(&tuple) {
            continue;
        }
        match Closure::find(&tuple, graph, model) {
            Some(closure) => {
                queue.extend(closure.factors.iter().cloned());
                queue.push_back(closure.denominator.clone());
                closed.insert(tuple, closure);
            }
            None => {
                let equation = Equation::new(tuple.clone(), model, graph);
                queue.extend(equation.sources().cloned());
                tracked.insert(tuple, equation);
            }
        }
    }

    let added = tracked.keys().filter(|t| !required.contains(t)).count();
    debug!(
        tracked = tracked.len(),
        closed = closed.len(),
        added,
        "reduced system"
    );

    Reduction {
        equations: tracked.into_values().collect(),
        closures: closed.into_values().collect(),
    }
}
