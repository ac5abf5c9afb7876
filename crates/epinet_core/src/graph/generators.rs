//! Small named contact networks used in tests and as building blocks.
//!
//! All generators are deterministic.

use super::{Edge, Graph};

fn build(num_vertices: usize, name: impl Into<String>, edges: &[(usize, usize)]) -> Graph {
    let mut graph = Graph::new(num_vertices, name);
    for &(i, j) in edges {
        graph.link(i, j, Edge::PLAIN);
    }
    graph.version = 0;
    graph
}

pub fn edge() -> Graph {
    build(2, "Edge", &[(0, 1)])
}

pub fn triangle() -> Graph {
    build(3, "Triangle", &[(0, 1), (1, 2), (0, 2)])
}

/// Two triangles sharing the edge 1-2.
pub fn toast() -> Graph {
    build(4, "Toast", &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
}

/// A triangle on 0, 1, 2 with a pendant vertex 3 hanging off 0.
pub fn lollipop() -> Graph {
    build(4, "Lollipop", &[(0, 1), (0, 2), (1, 2), (0, 3)])
}

/// Two triangles sharing vertex 0.
pub fn bow_tie() -> Graph {
    build(
        5,
        "Bow tie",
        &[(0, 1), (0, 2), (1, 2), (0, 3), (0, 4), (3, 4)],
    )
}

/// Triangles on 0, 1, 2 and 3, 4, 5 joined by the bridge 0-3.
pub fn bow_tie_with_bridge() -> Graph {
    build(
        6,
        "Bow tie with bridge",
        &[(0, 1), (0, 2), (1, 2), (3, 4), (3, 5), (4, 5), (0, 3)],
    )
}

pub fn path(n: usize) -> Graph {
    let edges: Vec<(usize, usize)> = (1..n).map(|v| (v - 1, v)).collect();
    build(n, format!("Path {n}"), &edges)
}

/// Cycle on `n` vertices. Fewer than three vertices give a path.
pub fn cycle(n: usize) -> Graph {
    let mut edges: Vec<(usize, usize)> = (1..n).map(|v| (v - 1, v)).collect();
    if n >= 3 {
        edges.push((0, n - 1));
    }
    build(n, format!("Cycle {n}"), &edges)
}

pub fn complete(n: usize) -> Graph {
    let edges: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect();
    build(n, format!("Complete {n}"), &edges)
}

/// Star on `n` vertices with centre 0.
pub fn star(n: usize) -> Graph {
    let edges: Vec<(usize, usize)> = (1..n).map(|v| (0, v)).collect();
    build(n, format!("Star {n}"), &edges)
}
