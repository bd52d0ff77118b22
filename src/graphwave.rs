//! Scale orchestration: the [`GraphWave`] embedder.
//!
//! A `GraphWave` owns the immutable spectral data of one graph (sparse Laplacian, dense
//! eigenbasis, lazily estimated λ_max) and nothing else. Every embedding call computes
//! and returns its result by value.
//!
//! Per-node work is independent; with the `parallel` feature it runs on rayon and is
//! collected in node order, so serial and parallel outputs are identical.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use crate::embedding::{
    sample_points, Embedding, EmbeddingMode, Labels, MultiScaleEmbedding, NumericalWarning,
};
use crate::filter::{ChebyshevApproximation, HeatKernel};
use crate::graph::{hop_distances, AdjacencyMatrix, WeightedGraph};
use crate::spectral::{Laplacian, SpectralBasis};
use crate::wavelet::{check_coefficients, impulse_response, kernel_matrix, node_coefficients};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphWaveConfig {
    /// Spacing between sample points `t_k = k · step_size`.
    pub step_size: f64,
    /// Number of sample points `K`.
    pub sample_number: usize,
    /// Default diffusion scale `τ` (used by [`GraphWave::approx_embedding`]).
    pub heat_coefficient: f64,
    /// Chebyshev polynomial degree `m`.
    pub approximation: usize,
}

impl Default for GraphWaveConfig {
    fn default() -> Self {
        Self {
            step_size: 0.1,
            sample_number: 50,
            heat_coefficient: 1.0,
            approximation: 100,
        }
    }
}

impl GraphWaveConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(Error::Configuration(
                "step_size must be finite and > 0".to_string(),
            ));
        }
        if self.sample_number == 0 {
            return Err(Error::Configuration(
                "sample_number must be > 0".to_string(),
            ));
        }
        if !self.heat_coefficient.is_finite() || self.heat_coefficient <= 0.0 {
            return Err(Error::Configuration(
                "heat_coefficient must be finite and > 0".to_string(),
            ));
        }
        if self.approximation == 0 {
            return Err(Error::Configuration(
                "approximation must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Single-scale embedding plus the numerical warnings raised while computing it.
#[derive(Debug, Clone)]
pub struct EmbeddingRun<L> {
    pub embedding: Embedding<L>,
    pub warnings: Vec<NumericalWarning>,
}

/// Multi-scale embedding plus `(scale, warning)` pairs.
#[derive(Debug, Clone)]
pub struct MultiScaleRun<L> {
    pub embeddings: MultiScaleEmbedding<L>,
    pub warnings: Vec<(f64, NumericalWarning)>,
}

/// GraphWave embedder for one graph.
#[derive(Debug)]
pub struct GraphWave<L> {
    config: GraphWaveConfig,
    labels: Arc<Labels<L>>,
    laplacian: Laplacian,
    basis: SpectralBasis,
    samples: Vec<f64>,
    lmax: OnceLock<f64>,
}

impl GraphWave<usize> {
    /// Embedder labelled by node index.
    pub fn from_graph<G: WeightedGraph>(graph: &G, config: GraphWaveConfig) -> Result<Self> {
        let labels = (0..graph.node_count()).collect();
        Self::new(graph, labels, config)
    }
}

impl<L: Clone + Eq + Hash + fmt::Debug> GraphWave<L> {
    /// Build the Laplacian and its eigenbasis. `labels[i]` names node `i`.
    pub fn new<G: WeightedGraph>(
        graph: &G,
        labels: Vec<L>,
        config: GraphWaveConfig,
    ) -> Result<Self> {
        config.validate()?;
        let laplacian = Laplacian::from_graph(graph)?;
        let basis = SpectralBasis::from_laplacian(&laplacian)?;
        Self::assemble(laplacian, basis, labels, config)
    }

    /// Like [`GraphWave::new`] for a dense adjacency matrix, rejecting non-square input.
    pub fn from_adjacency(
        adjacency: &[Vec<f64>],
        labels: Vec<L>,
        config: GraphWaveConfig,
    ) -> Result<Self> {
        let graph = AdjacencyMatrix::new(adjacency)?;
        Self::new(&graph, labels, config)
    }

    /// Use a precomputed eigenbasis of the graph's combinatorial Laplacian.
    pub fn with_basis<G: WeightedGraph>(
        graph: &G,
        labels: Vec<L>,
        basis: SpectralBasis,
        config: GraphWaveConfig,
    ) -> Result<Self> {
        config.validate()?;
        let laplacian = Laplacian::from_graph(graph)?;
        if basis.node_count() != laplacian.node_count() {
            return Err(Error::Configuration(format!(
                "spectral basis has {} nodes, graph has {}",
                basis.node_count(),
                laplacian.node_count()
            )));
        }
        Self::assemble(laplacian, basis, labels, config)
    }

    fn assemble(
        laplacian: Laplacian,
        basis: SpectralBasis,
        labels: Vec<L>,
        config: GraphWaveConfig,
    ) -> Result<Self> {
        if labels.len() != laplacian.node_count() {
            return Err(Error::Configuration(format!(
                "got {} labels for {} nodes",
                labels.len(),
                laplacian.node_count()
            )));
        }
        let labels = Arc::new(Labels::new(labels)?);
        let samples = sample_points(config.step_size, config.sample_number)?;
        Ok(Self {
            config,
            labels,
            laplacian,
            basis,
            samples,
            lmax: OnceLock::new(),
        })
    }
}

impl<L> GraphWave<L> {
    pub fn config(&self) -> &GraphWaveConfig {
        &self.config
    }

    pub fn node_count(&self) -> usize {
        self.laplacian.node_count()
    }

    pub fn labels(&self) -> &[L] {
        self.labels.as_slice()
    }

    pub fn laplacian(&self) -> &Laplacian {
        &self.laplacian
    }

    pub fn spectral_basis(&self) -> &SpectralBasis {
        &self.basis
    }

    pub fn sample_points(&self) -> &[f64] {
        &self.samples
    }

    /// Upper end of the Chebyshev interval, estimated on first use.
    ///
    /// The power-iteration estimate is raised to the largest computed eigenvalue if it
    /// falls short, so the interval always covers the spectrum.
    pub fn lmax(&self) -> f64 {
        *self.lmax.get_or_init(|| {
            self.laplacian
                .estimate_lmax()
                .max(self.basis.max_eigenvalue())
        })
    }

    /// Exact wavelet coefficients of `node` at `scale`.
    pub fn node_coefficients(&self, node: usize, scale: f64) -> Result<Vec<f64>> {
        node_coefficients(&self.basis, node, scale)
    }

    /// Chebyshev expansion of the heat kernel at the configured scale.
    pub fn chebyshev(&self) -> Result<ChebyshevApproximation> {
        HeatKernel::new(self.config.heat_coefficient)?
            .chebyshev(self.config.approximation, self.lmax())
    }

    /// Chebyshev-approximated wavelet coefficients of `node` at the configured scale.
    pub fn impulse_response(&self, node: usize) -> Result<Vec<f64>> {
        impulse_response(&self.laplacian, &self.chebyshev()?, node)
    }

    /// Reduce an externally computed coefficient vector with this embedder's sample points.
    pub fn embed_coefficients(
        &self,
        coefficients: &[f64],
        mode: EmbeddingMode,
    ) -> Result<Vec<f64>> {
        check_coefficients(coefficients, self.node_count())?;
        let (vector, warning) = mode.reduce(0, coefficients, &self.samples);
        if let Some(w) = warning {
            warn!(warning = %w, "raw-moment embedding produced NaN");
        }
        Ok(vector)
    }

    pub fn single_scale_embedding(&self, scale: f64, mode: EmbeddingMode) -> Result<Embedding<L>> {
        Ok(self.single_scale_embedding_run(scale, mode)?.embedding)
    }

    /// Exact embedding at `scale`, with numerical warnings.
    pub fn single_scale_embedding_run(
        &self,
        scale: f64,
        mode: EmbeddingMode,
    ) -> Result<EmbeddingRun<L>> {
        let kernel = HeatKernel::new(scale)?;
        let basis = &self.basis;
        self.embed_nodes(kernel.scale(), mode, move |node| {
            node_coefficients(basis, node, kernel.scale())
        })
    }

    pub fn multi_scale_embedding(
        &self,
        scales: &[f64],
        mode: EmbeddingMode,
    ) -> Result<MultiScaleEmbedding<L>> {
        Ok(self.multi_scale_embedding_run(scales, mode)?.embeddings)
    }

    /// Exact embedding at each of `scales`, in order. Every scale is validated before any
    /// is computed; repeated scales are recomputed.
    pub fn multi_scale_embedding_run(
        &self,
        scales: &[f64],
        mode: EmbeddingMode,
    ) -> Result<MultiScaleRun<L>> {
        for &scale in scales {
            HeatKernel::new(scale)?;
        }
        debug!(scales = scales.len(), %mode, "multi-scale embedding");

        let mut embeddings = Vec::with_capacity(scales.len());
        let mut warnings = Vec::new();
        for &scale in scales {
            let run = self.single_scale_embedding_run(scale, mode)?;
            warnings.extend(run.warnings.into_iter().map(|w| (scale, w)));
            embeddings.push(run.embedding);
        }
        Ok(MultiScaleRun {
            embeddings: MultiScaleEmbedding::new(embeddings),
            warnings,
        })
    }

    pub fn approx_embedding(&self, mode: EmbeddingMode) -> Result<Embedding<L>> {
        Ok(self.approx_embedding_run(mode)?.embedding)
    }

    /// Chebyshev-approximated embedding at the configured `heat_coefficient`.
    pub fn approx_embedding_run(&self, mode: EmbeddingMode) -> Result<EmbeddingRun<L>> {
        let cheb = self.chebyshev()?;
        debug!(order = cheb.order(), lmax = cheb.lmax(), "chebyshev heat filter");
        let laplacian = &self.laplacian;
        self.embed_nodes(self.config.heat_coefficient, mode, move |node| {
            impulse_response(laplacian, &cheb, node)
        })
    }

    /// Mean exact wavelet coefficient between node pairs, grouped by unweighted hop
    /// distance.
    ///
    /// Edge weights shape the coefficients but not the grouping; see
    /// [`GraphWave::coefficients_by_path_length`] for weighted distances. Distance 0 is
    /// the self-coefficient. Unreachable pairs are skipped.
    pub fn coefficients_by_distance(&self, scale: f64) -> Result<BTreeMap<usize, f64>> {
        self.mean_coefficient_by(scale, |source| hop_distances(&self.laplacian, source))
    }

    /// Like [`GraphWave::coefficients_by_distance`], grouped by weighted shortest-path
    /// length (edge weights as lengths), in ascending order of length.
    pub fn coefficients_by_path_length(&self, scale: f64) -> Result<Vec<(f64, f64)>> {
        let by_length = self.mean_coefficient_by(scale, |source| {
            self.laplacian
                .path_lengths(source)
                .into_iter()
                .map(|d| d.map(OrderedFloat))
                .collect()
        })?;
        Ok(by_length
            .into_iter()
            .map(|(d, mean)| (d.into_inner(), mean))
            .collect())
    }

    fn mean_coefficient_by<K, D>(&self, scale: f64, distances: D) -> Result<BTreeMap<K, f64>>
    where
        K: Ord,
        D: Fn(usize) -> Vec<Option<K>>,
    {
        let kernel = HeatKernel::new(scale)?;
        let k = kernel_matrix(&self.basis, kernel.scale())?;

        let mut sums: BTreeMap<K, (f64, usize)> = BTreeMap::new();
        for source in 0..self.node_count() {
            for (target, dist) in distances(source).into_iter().enumerate() {
                if let Some(d) = dist {
                    let slot = sums.entry(d).or_insert((0.0, 0));
                    slot.0 += k[(target, source)];
                    slot.1 += 1;
                }
            }
        }
        Ok(sums
            .into_iter()
            .map(|(d, (sum, count))| (d, sum / count as f64))
            .collect())
    }

    fn embed_nodes<F>(
        &self,
        scale: f64,
        mode: EmbeddingMode,
        coefficients: F,
    ) -> Result<EmbeddingRun<L>>
    where
        F: Fn(usize) -> Result<Vec<f64>> + Sync,
    {
        let n = self.node_count();
        let samples = &self.samples;
        debug!(nodes = n, scale, %mode, "embedding nodes");

        let reduce = |node: usize| -> Result<(Vec<f64>, Option<NumericalWarning>)> {
            let c = coefficients(node)?;
            check_coefficients(&c, n)?;
            Ok(mode.reduce(node, &c, samples))
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<(Vec<f64>, Option<NumericalWarning>)> = {
            use rayon::prelude::*;
            (0..n).into_par_iter().map(reduce).collect::<Result<_>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<(Vec<f64>, Option<NumericalWarning>)> =
            (0..n).map(reduce).collect::<Result<_>>()?;

        let mut vectors = Vec::with_capacity(n);
        let mut warnings = Vec::new();
        for (vector, warning) in rows {
            vectors.push(vector);
            if let Some(w) = warning {
                warn!(scale, warning = %w, "raw-moment embedding produced NaN");
                warnings.push(w);
            }
        }

        Ok(EmbeddingRun {
            embedding: Embedding::new(
                scale,
                mode,
                mode.dim(self.config.sample_number),
                Arc::clone(&self.labels),
                vectors,
            ),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AdjacencyList;

    fn star5() -> AdjacencyList {
        AdjacencyList::from_edges(5, &[(0, 1), (0, 2), (0, 3), (0, 4)])
    }

    fn star_config() -> GraphWaveConfig {
        GraphWaveConfig {
            step_size: 1.0,
            sample_number: 3,
            heat_coefficient: 0.5,
            approximation: 30,
        }
    }

    fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
    }

    #[test]
    fn config_validate_rejects_bad_values() {
        let ok = GraphWaveConfig::default();
        assert!(ok.validate().is_ok());
        let cases = [
            GraphWaveConfig { step_size: 0.0, ..ok },
            GraphWaveConfig { step_size: f64::NAN, ..ok },
            GraphWaveConfig { sample_number: 0, ..ok },
            GraphWaveConfig { heat_coefficient: -1.0, ..ok },
            GraphWaveConfig { approximation: 0, ..ok },
        ];
        for bad in cases {
            assert!(
                matches!(bad.validate(), Err(Error::Configuration(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn star_center_differs_from_leaves() {
        let gw = GraphWave::from_graph(&star5(), star_config()).unwrap();
        let emb = gw
            .single_scale_embedding(0.5, EmbeddingMode::Characteristic)
            .unwrap();
        assert_eq!(emb.len(), 5);
        assert_eq!(emb.dim(), 6);
        let center = emb.get(&0).unwrap();
        for leaf in 1..5 {
            let v = emb.get(&leaf).unwrap();
            assert_eq!(v.len(), 6);
            assert!(max_abs_diff(center, v) > 1e-3, "leaf {leaf}");
            assert!(max_abs_diff(emb.get(&1).unwrap(), v) < 1e-12, "leaf {leaf}");
        }
        // t_0 = 0: characteristic function is exactly 1 + 0i
        assert!((center[0] - 1.0).abs() < 1e-15);
        assert!(center[1].abs() < 1e-15);
    }

    #[test]
    fn vector_lengths_follow_mode() {
        let gw = GraphWave::from_graph(&star5(), star_config()).unwrap();
        for mode in EmbeddingMode::ALL {
            let emb = gw.single_scale_embedding(1.0, mode).unwrap();
            let expected = if mode == EmbeddingMode::Characteristic { 6 } else { 3 };
            assert_eq!(emb.dim(), expected);
            assert!(emb.iter().all(|(_, v)| v.len() == expected));
            assert_eq!(emb.mode(), mode);
        }
    }

    #[test]
    fn labels_are_paired_in_node_order() {
        let labels = vec!["hub", "a", "b", "c", "d"];
        let gw = GraphWave::new(&star5(), labels.clone(), star_config()).unwrap();
        let emb = gw
            .single_scale_embedding(0.5, EmbeddingMode::MomentGenerating)
            .unwrap();
        assert_eq!(emb.labels(), labels.as_slice());
        assert_eq!(emb.get(&"hub"), emb.vector(0));
        assert_eq!(emb.get(&"d"), emb.vector(4));
    }

    #[test]
    fn rejects_label_count_mismatch_and_duplicates() {
        let err = GraphWave::new(&star5(), vec![1, 2, 3], star_config()).unwrap_err();
        assert!(format!("{err}").contains("labels"), "{err}");
        let err = GraphWave::new(&star5(), vec![1, 2, 3, 4, 1], star_config()).unwrap_err();
        assert!(format!("{err}").contains("duplicate"), "{err}");
    }

    #[test]
    fn rejects_non_positive_scale() {
        let gw = GraphWave::from_graph(&star5(), star_config()).unwrap();
        for bad in [0.0, -0.5, f64::NAN] {
            assert!(matches!(
                gw.single_scale_embedding(bad, EmbeddingMode::Characteristic),
                Err(Error::Configuration(_))
            ));
        }
        // one bad scale fails the whole request
        assert!(gw
            .multi_scale_embedding(&[1.0, 0.0], EmbeddingMode::Characteristic)
            .is_err());
    }

    #[test]
    fn repeated_scales_are_identical() {
        let gw = GraphWave::from_graph(&star5(), star_config()).unwrap();
        let multi = gw
            .multi_scale_embedding(&[0.5, 2.0, 0.5], EmbeddingMode::Characteristic)
            .unwrap();
        assert_eq!(multi.len(), 3);
        assert_eq!(multi.scales(), vec![0.5, 2.0, 0.5]);
        assert_eq!(multi[0], multi[2]);
        assert_ne!(multi[0], multi[1]);
        let single = gw.single_scale_embedding(2.0, EmbeddingMode::Characteristic).unwrap();
        assert_eq!(multi.get(2.0), Some(&single));
    }

    #[test]
    fn empty_scale_list_gives_empty_result() {
        let gw = GraphWave::from_graph(&star5(), star_config()).unwrap();
        let multi = gw.multi_scale_embedding(&[], EmbeddingMode::Moment).unwrap();
        assert!(multi.is_empty());
    }

    #[test]
    fn approx_embedding_matches_exact() {
        let gw = GraphWave::from_graph(&star5(), star_config()).unwrap();
        let exact = gw.single_scale_embedding(0.5, EmbeddingMode::Characteristic).unwrap();
        let approx = gw.approx_embedding(EmbeddingMode::Characteristic).unwrap();
        assert_eq!(approx.scale(), 0.5);
        for node in 0..5 {
            let d = max_abs_diff(exact.vector(node).unwrap(), approx.vector(node).unwrap());
            assert!(d < 1e-8, "node {node}: {d}");
        }
    }

    #[test]
    fn lmax_covers_spectrum() {
        let gw = GraphWave::from_graph(&star5(), star_config()).unwrap();
        assert!(gw.lmax() >= 5.0);
        assert_eq!(gw.lmax(), gw.chebyshev().unwrap().lmax());
    }

    #[test]
    fn embed_coefficients_checks_length() {
        let gw = GraphWave::from_graph(&star5(), star_config()).unwrap();
        let err = gw
            .embed_coefficients(&[0.2; 4], EmbeddingMode::Moment)
            .unwrap_err();
        assert!(matches!(err, Error::CoefficientLength { expected: 5, actual: 4 }));
        let c = gw.node_coefficients(0, 0.5).unwrap();
        let v = gw.embed_coefficients(&c, EmbeddingMode::Moment).unwrap();
        let emb = gw.single_scale_embedding(0.5, EmbeddingMode::Moment).unwrap();
        assert_eq!(emb.vector(0), Some(v.as_slice()));
    }

    /// Single edge with a rotated eigenbasis: the heat kernel has a negative
    /// off-diagonal entry `-(1 - e^{-2τ})/2`.
    fn signed_kernel_graph() -> GraphWave<usize> {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let u = nalgebra::DMatrix::from_row_slice(2, 2, &[h, h, -h, h]);
        let basis = SpectralBasis::from_parts(vec![0.0, 2.0], u).unwrap();
        let config = GraphWaveConfig {
            step_size: 0.5,
            sample_number: 3,
            ..Default::default()
        };
        let g = AdjacencyList::from_edges(2, &[(0, 1)]);
        GraphWave::with_basis(&g, vec![0, 1], basis, config).unwrap()
    }

    #[test]
    fn moment_mode_reports_negative_coefficients_at_fractional_samples() {
        let gw = signed_kernel_graph();
        let c = gw.node_coefficients(0, 1.0).unwrap();
        assert!(c[1] < 0.0, "{c:?}");

        let run = gw
            .single_scale_embedding_run(1.0, EmbeddingMode::Moment)
            .unwrap();
        assert_eq!(run.warnings.len(), 2);
        for (node, w) in run.warnings.iter().enumerate() {
            assert_eq!(w.node, node);
            assert_eq!(w.negative_coefficients, 1);
            assert_eq!(w.fractional_samples, vec![0.5]);
            // t = 0 and t = 1 use integer powers and stay finite
            let v = run.embedding.vector(node).unwrap();
            assert_eq!(v[0], 1.0);
            assert!(v[1].is_nan());
            // mean coefficient at t = 1 is e^{-2τ}/2
            assert!((v[2] - (-2.0f64).exp() / 2.0).abs() < 1e-12, "{v:?}");
        }

        // characteristic mode never warns
        let cha = gw
            .single_scale_embedding_run(1.0, EmbeddingMode::Characteristic)
            .unwrap();
        assert!(cha.warnings.is_empty());
    }

    #[test]
    fn multi_scale_run_pairs_warnings_with_scales() {
        let gw = signed_kernel_graph();
        let run = gw
            .multi_scale_embedding_run(&[1.0, 2.0], EmbeddingMode::Moment)
            .unwrap();
        assert_eq!(run.embeddings.len(), 2);
        let pairs: Vec<(f64, usize)> = run.warnings.iter().map(|(s, w)| (*s, w.node)).collect();
        assert_eq!(pairs, vec![(1.0, 0), (1.0, 1), (2.0, 0), (2.0, 1)]);
        for e in &run.embeddings {
            assert!(e.iter().all(|(_, v)| v[1].is_nan()));
        }
    }

    #[test]
    fn non_negative_coefficients_do_not_warn() {
        let config = GraphWaveConfig {
            step_size: 0.5,
            sample_number: 3,
            heat_coefficient: 0.5,
            approximation: 30,
        };
        let gw = GraphWave::from_graph(&star5(), config).unwrap();
        let exact = gw
            .single_scale_embedding_run(0.5, EmbeddingMode::Moment)
            .unwrap();
        let approx = gw.approx_embedding_run(EmbeddingMode::Moment).unwrap();
        for run in [&exact, &approx] {
            assert!(run.warnings.is_empty());
            assert!(run.embedding.iter().all(|(_, v)| v.iter().all(|x| x.is_finite())));
        }
    }

    #[test]
    fn coefficients_decay_with_distance() {
        let path = AdjacencyList::from_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let gw = GraphWave::from_graph(&path, GraphWaveConfig::default()).unwrap();
        let by_dist = gw.coefficients_by_distance(1.0).unwrap();
        let keys: Vec<usize> = by_dist.keys().copied().collect();
        assert_eq!(keys, vec![0, 1, 2, 3, 4]);
        let vals: Vec<f64> = by_dist.values().copied().collect();
        assert!(vals.windows(2).all(|w| w[0] > w[1]), "{vals:?}");
    }

    #[test]
    fn coefficients_by_distance_skips_unreachable_pairs() {
        let g = AdjacencyList::from_edges(4, &[(0, 1), (2, 3)]);
        let gw = GraphWave::from_graph(&g, GraphWaveConfig::default()).unwrap();
        let by_dist = gw.coefficients_by_distance(0.3).unwrap();
        assert_eq!(by_dist.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn path_length_grouping_uses_edge_weights() {
        let adj = vec![
            vec![0.0, 2.0, 0.0],
            vec![2.0, 0.0, 0.5],
            vec![0.0, 0.5, 0.0],
        ];
        let gw = GraphWave::from_adjacency(&adj, vec![0, 1, 2], GraphWaveConfig::default())
            .unwrap();
        let by_length = gw.coefficients_by_path_length(1.0).unwrap();
        let lengths: Vec<f64> = by_length.iter().map(|&(d, _)| d).collect();
        assert_eq!(lengths, vec![0.0, 0.5, 2.0, 2.5]);

        // only the 1-2 pair sits at length 0.5
        let k = kernel_matrix(gw.spectral_basis(), 1.0).unwrap();
        assert!((by_length[1].1 - k[(1, 2)]).abs() < 1e-12);

        let hops: Vec<usize> = gw.coefficients_by_distance(1.0).unwrap().into_keys().collect();
        assert_eq!(hops, vec![0, 1, 2]);
    }

    #[test]
    fn path_length_matches_hops_on_unweighted_graph() {
        let path = AdjacencyList::from_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let gw = GraphWave::from_graph(&path, GraphWaveConfig::default()).unwrap();
        let hops = gw.coefficients_by_distance(0.7).unwrap();
        let lengths = gw.coefficients_by_path_length(0.7).unwrap();
        assert_eq!(hops.len(), lengths.len());
        for ((h, a), (l, b)) in hops.into_iter().zip(lengths) {
            assert_eq!(h as f64, l);
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn with_basis_rejects_mismatched_basis() {
        let other = SpectralBasis::from_graph(&AdjacencyList::from_edges(3, &[(0, 1)])).unwrap();
        let err = GraphWave::with_basis(&star5(), (0..5usize).collect(), other, star_config())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let basis = SpectralBasis::from_graph(&star5()).unwrap();
        let gw =
            GraphWave::with_basis(&star5(), (0..5usize).collect(), basis, star_config()).unwrap();
        let fresh = GraphWave::from_graph(&star5(), star_config()).unwrap();
        assert_eq!(
            gw.single_scale_embedding(0.5, EmbeddingMode::Characteristic).unwrap(),
            fresh.single_scale_embedding(0.5, EmbeddingMode::Characteristic).unwrap()
        );
    }

    #[test]
    fn from_adjacency_rejects_non_square() {
        let adj = vec![vec![0.0, 1.0, 0.0], vec![1.0, 0.0]];
        let err = GraphWave::from_adjacency(&adj, vec![0, 1], star_config()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
