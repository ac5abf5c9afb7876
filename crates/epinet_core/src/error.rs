//! Typed errors raised while building graphs and compartmental models.
//!
//! Candidate tuples that fail validity checks are never reported here; they are
//! filtered out of the enumeration and derivation results instead.

use thiserror::Error;

/// An invalid compartmental model definition. Raised at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("model has no states")]
    NoStates,
    #[error("state '{0}' is listed more than once")]
    DuplicateState(char),
    #[error("expected {expected} {kind} requirements (one per state), got {found}")]
    RequirementCount {
        kind: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("requirement {0} is not one of 0 (absent), 1 (unconditional) or 2 (neighbour)")]
    InvalidRequirement(u8),
    #[error("state '{0}' is not part of the model")]
    UnknownState(char),
    #[error("state '{0}' cannot transition to itself")]
    SelfTransition(char),
    #[error("rate for transition '{from}' -> '{to}' must be finite and non-negative, got {rate}")]
    InvalidRate { from: char, to: char, rate: f64 },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// An invalid mutation of a contact network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("vertex {vertex} is out of range for a graph with {len} vertices")]
    VertexOutOfRange { vertex: usize, len: usize },
    #[error("self loops are not allowed (vertex {0})")]
    SelfLoop(usize),
}
