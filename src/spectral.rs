//! Laplacian spectrum: the combinatorial Laplacian `L = D − W`, its dense eigendecomposition,
//! and a cheap upper estimate of the largest eigenvalue.
//!
//! Two representations are kept side by side:
//! - [`Laplacian`]: sparse adjacency lists, used for matrix-free products `L·x` (Chebyshev
//!   recurrence, λ_max estimation, hop distances)
//! - [`SpectralBasis`]: dense eigenpairs, used for exact heat-kernel coefficients
//!
//! Invariants:
//! - eigenvalues are sorted ascending and are non-negative (round-off below zero is clamped)
//! - column `i` of the eigenvector matrix pairs with eigenvalue `i`; columns are orthonormal

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ordered_float::OrderedFloat;
use tracing::debug;

use crate::graph::{GraphRef, WeightedGraph};
use crate::{Error, Result};

/// Smallest value [`Laplacian::estimate_lmax`] returns (edgeless graphs have λ_max = 0).
pub const LMAX_FLOOR: f64 = 1e-6;

/// Multiplicative headroom applied to the power-iteration estimate.
pub const LMAX_HEADROOM: f64 = 1.01;

const POWER_MAX_ITERATIONS: usize = 200;
const POWER_TOLERANCE: f64 = 1e-10;

/// Tolerance for eigenvalues that are negative only through round-off.
const NEGATIVE_EIGENVALUE_TOLERANCE: f64 = 1e-9;

/// Sparse symmetric combinatorial Laplacian `L = D − W`.
#[derive(Debug, Clone)]
pub struct Laplacian {
    neighbors: Vec<Vec<usize>>,
    weights: Vec<Vec<f64>>,
    degree: Vec<f64>,
}

impl Laplacian {
    /// Build from any weighted adapter.
    ///
    /// The adjacency is read as undirected: an edge seen in either direction contributes,
    /// with weight `max(w(u,v), w(v,u))`. Self loops and zero weights are skipped.
    pub fn from_graph<G: WeightedGraph>(graph: &G) -> Result<Self> {
        let n = graph.node_count();
        if n == 0 {
            return Err(Error::Configuration("graph has no nodes".to_string()));
        }

        let mut rows: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        for u in 0..n {
            for v in graph.neighbors(u) {
                if v >= n {
                    return Err(Error::Configuration(format!(
                        "node {u} has neighbor {v} outside 0..{n}"
                    )));
                }
                if v == u {
                    continue;
                }
                let w = graph.edge_weight(u, v);
                if !w.is_finite() {
                    return Err(Error::Configuration(format!(
                        "edge ({u}, {v}) has non-finite weight {w}"
                    )));
                }
                if w < 0.0 {
                    return Err(Error::Configuration(format!(
                        "edge ({u}, {v}) has negative weight {w}"
                    )));
                }
                if w == 0.0 {
                    continue;
                }
                for (a, b) in [(u, v), (v, u)] {
                    let slot = rows[a].entry(b).or_insert(0.0);
                    *slot = slot.max(w);
                }
            }
        }

        let mut neighbors = Vec::with_capacity(n);
        let mut weights = Vec::with_capacity(n);
        let mut degree = Vec::with_capacity(n);
        for row in rows {
            degree.push(row.values().sum());
            let (ns, ws): (Vec<usize>, Vec<f64>) = row.into_iter().unzip();
            neighbors.push(ns);
            weights.push(ws);
        }

        Ok(Self {
            neighbors,
            weights,
            degree,
        })
    }

    pub fn node_count(&self) -> usize {
        self.degree.len()
    }

    /// Weighted degree `d_i = Σ_j w_ij`.
    pub fn degree(&self) -> &[f64] {
        &self.degree
    }

    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// `(L·x)_i = d_i·x_i − Σ_j w_ij·x_j`.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.node_count());
        (0..self.node_count())
            .map(|i| {
                let off: f64 = self.neighbors[i]
                    .iter()
                    .zip(&self.weights[i])
                    .map(|(&j, &w)| w * x[j])
                    .sum();
                self.degree[i] * x[i] - off
            })
            .collect()
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.node_count();
        let mut m = DMatrix::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = self.degree[i];
            for (&j, &w) in self.neighbors[i].iter().zip(&self.weights[i]) {
                m[(i, j)] = -w;
            }
        }
        m
    }

    /// Weighted shortest-path length from `source` to every node (Dijkstra), using the
    /// symmetrized edge weights as lengths. `None` marks unreachable nodes.
    pub fn path_lengths(&self, source: usize) -> Vec<Option<f64>> {
        let n = self.node_count();
        let mut dist: Vec<Option<f64>> = vec![None; n];
        if source >= n {
            return dist;
        }
        let mut heap: BinaryHeap<(Reverse<OrderedFloat<f64>>, usize)> = BinaryHeap::new();
        dist[source] = Some(0.0);
        heap.push((Reverse(OrderedFloat(0.0)), source));

        while let Some((Reverse(OrderedFloat(d)), u)) = heap.pop() {
            // stale entry
            if dist[u].is_some_and(|best| d > best) {
                continue;
            }
            for (&v, &w) in self.neighbors[u].iter().zip(&self.weights[u]) {
                let next = d + w;
                if dist[v].map_or(true, |best| next < best) {
                    dist[v] = Some(next);
                    heap.push((Reverse(OrderedFloat(next)), v));
                }
            }
        }
        dist
    }

    /// Gershgorin upper bound on the spectrum: `max_i 2·d_i`.
    pub fn gershgorin_bound(&self) -> f64 {
        self.degree.iter().fold(0.0, |acc, &d| acc.max(2.0 * d))
    }

    /// Cheap estimate of the largest eigenvalue.
    ///
    /// Power iteration on the sparse operator, scaled by [`LMAX_HEADROOM`], capped by the
    /// Gershgorin bound and floored at [`LMAX_FLOOR`]. The start vector is a fixed
    /// low-discrepancy sequence, so the estimate is deterministic.
    pub fn estimate_lmax(&self) -> f64 {
        let n = self.node_count();
        let mut x: Vec<f64> = (0..n)
            .map(|i| (i as f64 * 0.618_033_988_749_895).fract() - 0.5)
            .collect();
        if !normalize(&mut x) {
            return LMAX_FLOOR;
        }

        let mut rayleigh = 0.0;
        let mut iterations = 0usize;
        for _ in 0..POWER_MAX_ITERATIONS {
            iterations += 1;
            let mut y = self.apply(&x);
            let next: f64 = x.iter().zip(&y).map(|(a, b)| a * b).sum();
            if !normalize(&mut y) {
                // x is in the null space: no edges touch its support
                rayleigh = 0.0;
                break;
            }
            x = y;
            let done = (next - rayleigh).abs() <= POWER_TOLERANCE * next.abs().max(1.0);
            rayleigh = next;
            if done {
                break;
            }
        }

        let estimate = (rayleigh * LMAX_HEADROOM)
            .min(self.gershgorin_bound())
            .max(LMAX_FLOOR);
        debug!(iterations, rayleigh, estimate, "estimated lmax");
        estimate
    }
}

impl GraphRef for Laplacian {
    fn node_count(&self) -> usize {
        self.degree.len()
    }

    fn neighbors_ref(&self, node: usize) -> &[usize] {
        &self.neighbors[node]
    }
}

fn normalize(v: &mut [f64]) -> bool {
    let norm = v.iter().map(|a| a * a).sum::<f64>().sqrt();
    if norm <= 1e-300 {
        return false;
    }
    for a in v.iter_mut() {
        *a /= norm;
    }
    true
}

/// Eigenvalues (ascending) and orthonormal eigenvectors of the Laplacian.
#[derive(Debug, Clone)]
pub struct SpectralBasis {
    eigenvalues: DVector<f64>,
    eigenvectors: DMatrix<f64>,
}

impl SpectralBasis {
    pub fn from_graph<G: WeightedGraph>(graph: &G) -> Result<Self> {
        Self::from_laplacian(&Laplacian::from_graph(graph)?)
    }

    /// Dense symmetric eigendecomposition of `laplacian`.
    pub fn from_laplacian(laplacian: &Laplacian) -> Result<Self> {
        let n = laplacian.node_count();
        let eigen = SymmetricEigen::try_new(laplacian.to_dense(), f64::EPSILON, 0).ok_or_else(
            || Error::Configuration("Laplacian eigendecomposition did not converge".to_string()),
        )?;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let eigenvalues = DVector::from_iterator(
            n,
            order.iter().map(|&k| eigen.eigenvalues[k].max(0.0)),
        );
        let eigenvectors = DMatrix::from_fn(n, n, |r, c| eigen.eigenvectors[(r, order[c])]);
        debug!(
            nodes = n,
            edges = laplacian.edge_count(),
            lmax = eigenvalues[n - 1],
            "computed Laplacian eigenbasis"
        );
        Ok(Self {
            eigenvalues,
            eigenvectors,
        })
    }

    /// Accept a precomputed basis.
    ///
    /// Eigenvalues must be finite, ascending and non-negative (values above
    /// `-1e-9` are clamped to zero); `eigenvectors` must be `N×N` with `N` eigenvalues.
    /// Orthonormality is the caller's responsibility.
    pub fn from_parts(eigenvalues: Vec<f64>, eigenvectors: DMatrix<f64>) -> Result<Self> {
        let n = eigenvalues.len();
        if n == 0 {
            return Err(Error::Configuration("spectral basis is empty".to_string()));
        }
        if eigenvectors.shape() != (n, n) {
            return Err(Error::Configuration(format!(
                "eigenvector matrix must be {n}x{n}, got {}x{}",
                eigenvectors.nrows(),
                eigenvectors.ncols()
            )));
        }
        if eigenvalues.iter().any(|v| !v.is_finite()) || eigenvectors.iter().any(|v| !v.is_finite())
        {
            return Err(Error::Configuration(
                "spectral basis contains non-finite values".to_string(),
            ));
        }
        if eigenvalues.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::Configuration(
                "eigenvalues must be sorted ascending".to_string(),
            ));
        }
        if eigenvalues[0] < -NEGATIVE_EIGENVALUE_TOLERANCE {
            return Err(Error::Configuration(format!(
                "Laplacian eigenvalues must be non-negative, got {}",
                eigenvalues[0]
            )));
        }
        Ok(Self {
            eigenvalues: DVector::from_iterator(n, eigenvalues.into_iter().map(|v| v.max(0.0))),
            eigenvectors,
        })
    }

    pub fn node_count(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    pub fn eigenvectors(&self) -> &DMatrix<f64> {
        &self.eigenvectors
    }

    pub fn max_eigenvalue(&self) -> f64 {
        self.eigenvalues[self.node_count() - 1]
    }
}
