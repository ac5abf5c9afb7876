//! Equation-count estimate from the biconnected pieces of a graph.

use super::params::ModelParams;
use super::required::RequiredTuples;
use crate::graph::Graph;
use std::collections::BTreeMap;
use tracing::debug;

/// Upper bound on the size of a reduced system.
///
/// Each splice piece is charged the number of tuples it would need on its own
/// with closures tracked, pieces of the same approximate isomorphism class
/// counted once and multiplied by their frequency. Singles of a cut vertex are
/// charged once per piece containing it, so the surplus is taken back.
pub fn upper_bound(graph: &Graph, model: &ModelParams) -> usize {
    let mut per_class = BTreeMap::new();
    for piece in graph.splice() {
        per_class
            .entry(piece.iso_class())
            .or_insert_with(|| RequiredTuples::new(piece, model, true).len());
    }

    let charged: usize = graph
        .sub_graph_freq()
        .iter()
        .map(|(class, &freq)| per_class.get(class).copied().unwrap_or(0) * freq)
        .sum();
    let singles_per_vertex = model.single_states().len();
    let surplus: usize = graph
        .cut_vertex_freq()
        .values()
        .map(|&freq| singles_per_vertex * freq.saturating_sub(1))
        .sum();

    let bound = charged.saturating_sub(surplus);
    debug!(charged, surplus, bound, "equation upper bound");
    bound
}
