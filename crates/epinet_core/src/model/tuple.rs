//! Joint vertex-state events.

use super::vertex::Vertex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A set of vertices observed simultaneously in the given states.
///
/// Members are kept sorted and de-duplicated, so two tuples are equal exactly
/// when they hold the same vertices. A tuple may name one location twice in
/// different states; such tuples describe impossible events and are filtered
/// out wherever they can arise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tuple(Vec<Vertex>);

impl Tuple {
    pub fn new(vertices: impl IntoIterator<Item = Vertex>) -> Self {
        let mut vertices: Vec<Vertex> = vertices.into_iter().collect();
        vertices.sort_unstable();
        vertices.dedup();
        Self(vertices)
    }

    pub fn single(vertex: Vertex) -> Self {
        Self(vec![vertex])
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, vertex: &Vertex) -> bool {
        self.0.binary_search(vertex).is_ok()
    }

    /// Copy with `vertex` added.
    pub fn with(&self, vertex: Vertex) -> Self {
        match self.0.binary_search(&vertex) {
            Ok(_) => self.clone(),
            Err(at) => {
                let mut vertices = self.0.clone();
                vertices.insert(at, vertex);
                Self(vertices)
            }
        }
    }

    /// Copy with `vertex` removed.
    pub fn without(&self, vertex: &Vertex) -> Self {
        Self(self.0.iter().filter(|v| *v != vertex).copied().collect())
    }

    pub fn locations(&self) -> Vec<usize> {
        self.0.iter().map(|v| v.location).collect()
    }

    /// True when no location appears twice.
    pub fn locations_are_different(&self) -> bool {
        self.0.windows(2).all(|w| w[0].location != w[1].location)
    }

    /// True when every member holds the same state.
    pub fn is_homogeneous(&self) -> bool {
        self.0.windows(2).all(|w| w[0].state == w[1].state)
    }

    pub fn state_at(&self, location: usize) -> Option<char> {
        self.0.iter().find(|v| v.location == location).map(|v| v.state)
    }

    /// Bracket-free rendering, e.g. `S0_I1` for a separator of `_`.
    pub fn plain(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(Vertex::to_string)
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl From<Vertex> for Tuple {
    fn from(vertex: Vertex) -> Self {
        Self::single(vertex)
    }
}

impl Ord for Tuple {
    /// Smaller tuples first, then member by member.
    fn cmp(&self, other: &Self) -> Ordering {
        self.len()
            .cmp(&other.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Tuple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "〈{}〉", self.plain(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(location: usize, state: char) -> Vertex {
        Vertex::new(location, state)
    }

    #[test]
    fn test_normalised_membership() {
        let a = Tuple::new([v(2, 'I'), v(0, 'S'), v(2, 'I')]);
        let b = Tuple::new([v(0, 'S'), v(2, 'I')]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_string(), "〈S0 I2〉");
        assert_eq!(a.plain("_"), "S0_I2");
        assert_eq!(a.locations(), vec![0, 2]);
    }

    #[test]
    fn test_with_and_without() {
        let t = Tuple::new([v(0, 'S'), v(1, 'I')]);
        let grown = t.with(v(2, 'I'));
        assert_eq!(grown.to_string(), "〈S0 I1 I2〉");
        assert_eq!(grown.without(&v(1, 'I')).to_string(), "〈S0 I2〉");
        assert_eq!(t.with(v(1, 'I')), t);
        assert!(grown.contains(&v(2, 'I')));
        assert!(!grown.contains(&v(2, 'S')));
    }

    #[test]
    fn test_validity_predicates() {
        let clash = Tuple::new([v(0, 'S'), v(0, 'I')]);
        assert!(!clash.locations_are_different());
        assert!(Tuple::new([v(0, 'S'), v(1, 'I')]).locations_are_different());

        assert!(Tuple::new([v(0, 'S'), v(1, 'S')]).is_homogeneous());
        assert!(!Tuple::new([v(0, 'S'), v(1, 'I')]).is_homogeneous());
        assert!(Tuple::single(v(4, 'R')).is_homogeneous());
        assert_eq!(Tuple::new([v(0, 'S'), v(3, 'I')]).state_at(3), Some('I'));
    }

    #[test]
    fn test_ordering_by_size_then_members() {
        let mut tuples = vec![
            Tuple::new([v(0, 'S'), v(1, 'I')]),
            Tuple::single(v(1, 'S')),
            Tuple::new([v(0, 'I'), v(1, 'S')]),
            Tuple::single(v(0, 'S')),
            Tuple::single(v(0, 'I')),
        ];
        tuples.sort();
        let rendered: Vec<String> = tuples.iter().map(Tuple::to_string).collect();
        assert_eq!(rendered, ["〈I0〉", "〈S0〉", "〈S1〉", "〈I0 S1〉", "〈S0 I1〉"]);
    }
}
