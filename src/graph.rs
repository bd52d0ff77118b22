//! Graph adapter traits.
//!
//! `graphwave` never owns or builds a graph. It reads node count, neighbor lists and edge
//! weights through these traits, so callers can plug in their own storage (or `petgraph`
//! with the `petgraph` feature).
//!
//! Contract for adapters:
//! - nodes are indexed `0..node_count()`, and that order is the order of every output
//! - `neighbors(u)` only returns indices `< node_count()` (violations are reported as
//!   configuration errors by the spectral builder, never silently dropped)

use crate::{Error, Result};

/// Unweighted read access to a graph.
pub trait Graph {
    fn node_count(&self) -> usize;

    fn neighbors(&self, node: usize) -> Vec<usize>;

    fn out_degree(&self, node: usize) -> usize {
        self.neighbors(node).len()
    }
}

/// A [`Graph`] with edge weights. Unweighted graphs report `1.0`.
pub trait WeightedGraph: Graph {
    fn edge_weight(&self, source: usize, target: usize) -> f64;
}

/// Borrowing variant of [`Graph`] for adapters that already store adjacency lists.
///
/// Used for traversals that run once per node (e.g. hop distances) to avoid allocating
/// a neighbor `Vec` per step.
pub trait GraphRef {
    fn node_count(&self) -> usize;

    fn neighbors_ref(&self, node: usize) -> &[usize];
}

/// Unweighted hop distance from `source` to every node, by BFS. `None` marks unreachable
/// nodes.
pub fn hop_distances<G: GraphRef>(graph: &G, source: usize) -> Vec<Option<usize>> {
    let n = graph.node_count();
    let mut dist = vec![None; n];
    if source >= n {
        return dist;
    }
    let mut queue: std::collections::VecDeque<usize> = std::collections::VecDeque::new();
    dist[source] = Some(0);
    queue.push_back(source);
    while let Some(u) = queue.pop_front() {
        let next = dist[u].map_or(0, |d| d + 1);
        for &v in graph.neighbors_ref(u) {
            if v >= n {
                continue;
            }
            if dist[v].is_none() {
                dist[v] = Some(next);
                queue.push_back(v);
            }
        }
    }
    dist
}

/// Dense adjacency matrix adapter: `adj[u][v]` is the weight of edge `u -> v`, `0.0` means
/// no edge.
///
/// Only constructible through [`AdjacencyMatrix::new`], so every value is non-empty and
/// square.
#[derive(Debug, Clone, Copy)]
pub struct AdjacencyMatrix<'a> {
    rows: &'a [Vec<f64>],
}

impl<'a> AdjacencyMatrix<'a> {
    /// Wrap `rows`, rejecting empty and non-square matrices.
    pub fn new(rows: &'a [Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(Error::Configuration(
                "adjacency matrix is empty".to_string(),
            ));
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(Error::Configuration(format!(
                "adjacency matrix must be square: row {row} has {} entries, expected {n}",
                r.len()
            )));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &'a [Vec<f64>] {
        self.rows
    }
}

impl Graph for AdjacencyMatrix<'_> {
    fn node_count(&self) -> usize {
        self.rows.len()
    }

    fn neighbors(&self, node: usize) -> Vec<usize> {
        self.rows[node]
            .iter()
            .enumerate()
            .filter(|(_, &w)| w != 0.0)
            .map(|(v, _)| v)
            .collect()
    }
}

impl WeightedGraph for AdjacencyMatrix<'_> {
    fn edge_weight(&self, source: usize, target: usize) -> f64 {
        self.rows
            .get(source)
            .and_then(|row| row.get(target))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Owned adjacency lists; handy for tests and for callers that build graphs from edge lists.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyList {
    adj: Vec<Vec<usize>>,
}

impl AdjacencyList {
    pub fn with_nodes(n: usize) -> Self {
        Self {
            adj: vec![Vec::new(); n],
        }
    }

    /// Undirected edge list over `n` nodes. Endpoints `>= n` are recorded as neighbors of
    /// the in-range endpoint (the node count does not grow), so the spectral builder can
    /// reject them.
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut g = Self::with_nodes(n);
        for &(u, v) in edges {
            g.add_edge(u, v);
        }
        g
    }

    /// Add an undirected edge. Duplicates are ignored.
    pub fn add_edge(&mut self, u: usize, v: usize) {
        if let Some(row) = self.adj.get_mut(u) {
            if !row.contains(&v) {
                row.push(v);
            }
        }
        if u == v {
            return;
        }
        if let Some(row) = self.adj.get_mut(v) {
            if !row.contains(&u) {
                row.push(u);
            }
        }
    }
}

impl GraphRef for AdjacencyList {
    fn node_count(&self) -> usize {
        self.adj.len()
    }

    fn neighbors_ref(&self, node: usize) -> &[usize] {
        &self.adj[node]
    }
}

impl Graph for AdjacencyList {
    fn node_count(&self) -> usize {
        self.adj.len()
    }

    fn neighbors(&self, node: usize) -> Vec<usize> {
        self.adj[node].clone()
    }

    fn out_degree(&self, node: usize) -> usize {
        self.adj[node].len()
    }
}

impl WeightedGraph for AdjacencyList {
    fn edge_weight(&self, source: usize, target: usize) -> f64 {
        if self.adj[source].contains(&target) {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(feature = "petgraph")]
mod petgraph_impls {
    use super::{Graph, WeightedGraph};
    use petgraph::graph::{IndexType, NodeIndex};
    use petgraph::EdgeType;

    /// Edge weights are taken from `f64` edge data; use `petgraph::Graph<N, f64, ..>`.
    impl<N, Ty: EdgeType, Ix: IndexType> Graph for petgraph::Graph<N, f64, Ty, Ix> {
        fn node_count(&self) -> usize {
            petgraph::Graph::node_count(self)
        }

        fn neighbors(&self, node: usize) -> Vec<usize> {
            petgraph::Graph::neighbors(self, NodeIndex::new(node))
                .map(|n| n.index())
                .collect()
        }
    }

    impl<N, Ty: EdgeType, Ix: IndexType> WeightedGraph for petgraph::Graph<N, f64, Ty, Ix> {
        fn edge_weight(&self, source: usize, target: usize) -> f64 {
            self.find_edge(NodeIndex::new(source), NodeIndex::new(target))
                .and_then(|e| petgraph::Graph::edge_weight(self, e))
                .copied()
                .unwrap_or(0.0)
        }
    }
}
