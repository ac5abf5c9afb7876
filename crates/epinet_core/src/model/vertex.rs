use serde::{Deserialize, Serialize};
use std::fmt;

/// A graph location paired with a state. Ordered by location, then state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vertex {
    pub location: usize,
    pub state: char,
}

impl Vertex {
    pub fn new(location: usize, state: char) -> Self {
        Self { location, state }
    }

    /// The same location in another state.
    pub fn in_state(self, state: char) -> Self {
        Self { state, ..self }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.state, self.location)
    }
}
