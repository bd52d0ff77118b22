//! `graphwave`: structural node embeddings from spectral graph wavelets.
//!
//! Each node is described by the heat `exp(−τL)` diffusing out of it. The resulting
//! wavelet-coefficient distribution is summarized at sample points `t_k = k·step_size`
//! by its empirical characteristic function (or a moment-style statistic), giving a
//! fixed-length vector that depends on the node's structural role, not its position.
//!
//! ```rust
//! use graphwave::{AdjacencyList, EmbeddingMode, GraphWave, GraphWaveConfig};
//!
//! // 5-node star: node 0 is the hub
//! let g = AdjacencyList::from_edges(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
//! let config = GraphWaveConfig { sample_number: 3, step_size: 1.0, ..Default::default() };
//! let gw = GraphWave::from_graph(&g, config).unwrap();
//!
//! let emb = gw.single_scale_embedding(0.5, EmbeddingMode::Characteristic).unwrap();
//! assert_eq!(emb.dim(), 6);
//! assert_ne!(emb.get(&0).unwrap(), emb.get(&1).unwrap());
//! ```
//!
//! Guarantees:
//! - Row `i` of every embedding belongs to node `i` as numbered by the graph adapter, and
//!   carries `labels[i]`; [`Embedding::get`] looks rows up by label.
//! - The same graph, config and scale give bit-identical vectors, with or without the
//!   `parallel` feature.
//! - The eigenbasis is built once in the constructor. Embedding calls allocate fresh
//!   results; the only state a [`GraphWave`] picks up afterwards is its memoized λ_max.
//!
//! Not guaranteed: how the λ_max estimate is reached (only that `[0, λ_max]` contains the
//! spectrum), or whether per-node work runs on one thread or many.

pub mod embedding;
pub mod filter;
pub mod graph;
pub mod graphwave;
pub mod spectral;
pub mod wavelet;

pub use embedding::{
    sample_points, Embedding, EmbeddingMode, MultiScaleEmbedding, NumericalWarning,
};
pub use filter::{ChebyshevApproximation, HeatKernel};
pub use graph::{hop_distances, AdjacencyList, AdjacencyMatrix, Graph, GraphRef, WeightedGraph};
pub use graphwave::{EmbeddingRun, GraphWave, GraphWaveConfig, MultiScaleRun};
pub use spectral::{Laplacian, SpectralBasis};
pub use wavelet::{
    check_coefficients, check_node, impulse_response, kernel_matrix, node_coefficients,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("unsupported embedding mode {0:?}; expected one of \"cha\", \"mog\", \"mo\"")]
    InvalidMode(String),
    #[error("node index {index} out of bounds for {node_count} nodes (valid: 0..{node_count})")]
    IndexOutOfBounds { index: usize, node_count: usize },
    #[error("expected {expected} wavelet coefficients, got {actual}")]
    CoefficientLength { expected: usize, actual: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
