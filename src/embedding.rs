//! Embedding statistics: reduce a node's wavelet coefficients to a fixed-length vector.
//!
//! For coefficients `c ∈ ℝᴺ` and sample points `t_0..t_{K−1}`:
//!
//! | mode  | value at `t`             | output length |
//! |-------|--------------------------|---------------|
//! | `cha` | `mean(exp(i·t·c))`       | `2K` (re, im) |
//! | `mog` | `mean(exp(t·c))`         | `K`           |
//! | `mo`  | `mean(c^t)`              | `K`           |
//!
//! `mo` is only well defined for non-negative coefficients or integer `t`. Integer `t`
//! uses `powi`; fractional `t` on a negative coefficient yields NaN, and the reduction
//! reports it as a [`NumericalWarning`] instead of rewriting the value.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::{Error, Result};

/// Statistic used to summarize a wavelet-coefficient distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EmbeddingMode {
    /// `cha`: empirical characteristic function.
    Characteristic,
    /// `mog`: moment generating function.
    MomentGenerating,
    /// `mo`: raw moments.
    Moment,
}

impl EmbeddingMode {
    pub const ALL: [EmbeddingMode; 3] = [
        EmbeddingMode::Characteristic,
        EmbeddingMode::MomentGenerating,
        EmbeddingMode::Moment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EmbeddingMode::Characteristic => "cha",
            EmbeddingMode::MomentGenerating => "mog",
            EmbeddingMode::Moment => "mo",
        }
    }

    /// Output vector length for `sample_number` sample points.
    pub fn dim(self, sample_number: usize) -> usize {
        match self {
            EmbeddingMode::Characteristic => 2 * sample_number,
            EmbeddingMode::MomentGenerating | EmbeddingMode::Moment => sample_number,
        }
    }

    /// Reduce one node's coefficients.
    ///
    /// `node` is only used to label a returned warning.
    pub fn reduce(
        self,
        node: usize,
        coefficients: &[f64],
        samples: &[f64],
    ) -> (Vec<f64>, Option<NumericalWarning>) {
        match self {
            EmbeddingMode::Characteristic => (characteristic(coefficients, samples), None),
            EmbeddingMode::MomentGenerating => (moment_generating(coefficients, samples), None),
            EmbeddingMode::Moment => moment(node, coefficients, samples),
        }
    }
}

impl FromStr for EmbeddingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cha" => Ok(EmbeddingMode::Characteristic),
            "mog" => Ok(EmbeddingMode::MomentGenerating),
            "mo" => Ok(EmbeddingMode::Moment),
            other => Err(Error::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `t_k = k · step_size` for `k in 0..sample_number`.
pub fn sample_points(step_size: f64, sample_number: usize) -> Result<Vec<f64>> {
    if !step_size.is_finite() || step_size <= 0.0 {
        return Err(Error::Configuration(format!(
            "step_size must be finite and > 0, got {step_size}"
        )));
    }
    if sample_number == 0 {
        return Err(Error::Configuration(
            "sample_number must be > 0".to_string(),
        ));
    }
    Ok((0..sample_number).map(|k| k as f64 * step_size).collect())
}

fn characteristic(coefficients: &[f64], samples: &[f64]) -> Vec<f64> {
    let n = coefficients.len() as f64;
    let mut out = Vec::with_capacity(2 * samples.len());
    for &t in samples {
        let mean = coefficients
            .iter()
            .map(|&c| Complex64::new(0.0, t * c).exp())
            .sum::<Complex64>()
            / n;
        out.push(mean.re);
        out.push(mean.im);
    }
    out
}

fn moment_generating(coefficients: &[f64], samples: &[f64]) -> Vec<f64> {
    let n = coefficients.len() as f64;
    samples
        .iter()
        .map(|&t| coefficients.iter().map(|&c| (t * c).exp()).sum::<f64>() / n)
        .collect()
}

fn moment(
    node: usize,
    coefficients: &[f64],
    samples: &[f64],
) -> (Vec<f64>, Option<NumericalWarning>) {
    let n = coefficients.len() as f64;
    let negative = coefficients.iter().filter(|&&c| c < 0.0).count();
    let mut fractional = Vec::new();

    let values: Vec<f64> = samples
        .iter()
        .map(|&t| {
            let integral = t.fract() == 0.0 && t.abs() <= i32::MAX as f64;
            if !integral && negative > 0 {
                fractional.push(t);
            }
            let sum: f64 = if integral {
                coefficients.iter().map(|&c| c.powi(t as i32)).sum()
            } else {
                coefficients.iter().map(|&c| c.powf(t)).sum()
            };
            sum / n
        })
        .collect();

    let warning = (!fractional.is_empty()).then(|| NumericalWarning {
        node,
        negative_coefficients: negative,
        fractional_samples: fractional,
    });
    (values, warning)
}

/// Raw-moment reduction hit negative coefficients at fractional sample points; the
/// affected entries are NaN.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumericalWarning {
    pub node: usize,
    pub negative_coefficients: usize,
    pub fractional_samples: Vec<f64>,
}

impl fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {}: {} negative wavelet coefficient(s) raised to fractional power(s) {:?}",
            self.node, self.negative_coefficients, self.fractional_samples
        )
    }
}

/// Node labels in node-index order, with reverse lookup.
#[derive(Debug)]
pub(crate) struct Labels<L> {
    labels: Vec<L>,
    index: HashMap<L, usize>,
}

impl<L: Clone + Eq + Hash + fmt::Debug> Labels<L> {
    pub(crate) fn new(labels: Vec<L>) -> Result<Self> {
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if let Some(prev) = index.insert(label.clone(), i) {
                return Err(Error::Configuration(format!(
                    "duplicate node label {label:?} at positions {prev} and {i}"
                )));
            }
        }
        Ok(Self { labels, index })
    }
}

impl<L> Labels<L> {
    pub(crate) fn as_slice(&self) -> &[L] {
        &self.labels
    }

    pub(crate) fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Node → vector mapping for one scale, in node-index order.
#[derive(Debug, Clone)]
pub struct Embedding<L> {
    scale: f64,
    mode: EmbeddingMode,
    dim: usize,
    labels: Arc<Labels<L>>,
    vectors: Vec<Vec<f64>>,
}

impl<L> Embedding<L> {
    pub(crate) fn new(
        scale: f64,
        mode: EmbeddingMode,
        dim: usize,
        labels: Arc<Labels<L>>,
        vectors: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert_eq!(labels.len(), vectors.len());
        debug_assert!(vectors.iter().all(|v| v.len() == dim));
        Self {
            scale,
            mode,
            dim,
            labels,
            vectors,
        }
    }

    /// Diffusion scale `τ` this embedding was computed at.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn mode(&self) -> EmbeddingMode {
        self.mode
    }

    /// Length of every vector.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn labels(&self) -> &[L] {
        self.labels.as_slice()
    }

    /// Vector of the node at index `node`.
    pub fn vector(&self, node: usize) -> Option<&[f64]> {
        self.vectors.get(node).map(Vec::as_slice)
    }

    /// `(label, vector)` pairs in node-index order.
    pub fn iter(&self) -> impl Iterator<Item = (&L, &[f64])> + '_ {
        self.labels
            .as_slice()
            .iter()
            .zip(self.vectors.iter().map(Vec::as_slice))
    }

    /// `N × dim` matrix, row `i` is node `i`.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), self.dim, |r, c| self.vectors[r][c])
    }
}

impl<L: Eq + Hash> Embedding<L> {
    pub fn get(&self, label: &L) -> Option<&[f64]> {
        self.labels
            .index
            .get(label)
            .and_then(|&i| self.vector(i))
    }
}

impl<L: PartialEq> PartialEq for Embedding<L> {
    fn eq(&self, other: &Self) -> bool {
        self.scale.to_bits() == other.scale.to_bits()
            && self.mode == other.mode
            && self.dim == other.dim
            && self.labels.as_slice() == other.labels.as_slice()
            && self.vectors == other.vectors
    }
}

/// One [`Embedding`] per requested scale, in request order. Repeated scales are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiScaleEmbedding<L> {
    embeddings: Vec<Embedding<L>>,
}

impl<L> MultiScaleEmbedding<L> {
    pub(crate) fn new(embeddings: Vec<Embedding<L>>) -> Self {
        Self { embeddings }
    }

    pub fn scales(&self) -> Vec<f64> {
        self.embeddings.iter().map(Embedding::scale).collect()
    }

    /// First embedding computed at exactly `scale`.
    pub fn get(&self, scale: f64) -> Option<&Embedding<L>> {
        self.embeddings.iter().find(|e| e.scale() == scale)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Embedding<L>> {
        self.embeddings.iter()
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    pub fn into_vec(self) -> Vec<Embedding<L>> {
        self.embeddings
    }
}

impl<L> std::ops::Index<usize> for MultiScaleEmbedding<L> {
    type Output = Embedding<L>;

    fn index(&self, i: usize) -> &Embedding<L> {
        &self.embeddings[i]
    }
}

impl<'a, L> IntoIterator for &'a MultiScaleEmbedding<L> {
    type Item = &'a Embedding<L>;
    type IntoIter = std::slice::Iter<'a, Embedding<L>>;

    fn into_iter(self) -> Self::IntoIter {
        self.embeddings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mode_parses_known_strings() {
        for mode in EmbeddingMode::ALL {
            assert_eq!(mode.as_str().parse::<EmbeddingMode>().unwrap(), mode);
            assert_eq!(mode.to_string(), mode.as_str());
        }
    }

    #[test]
    fn mode_rejects_unknown_string_listing_valid_set() {
        let err = "xyz".parse::<EmbeddingMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidMode(ref m) if m == "xyz"));
        let msg = format!("{err}");
        for valid in ["\"cha\"", "\"mog\"", "\"mo\""] {
            assert!(msg.contains(valid), "{msg}");
        }
    }

    #[test]
    fn sample_points_are_multiples_of_step() {
        assert_eq!(sample_points(0.5, 4).unwrap(), vec![0.0, 0.5, 1.0, 1.5]);
        assert!(sample_points(0.0, 4).is_err());
        assert!(sample_points(-1.0, 4).is_err());
        assert!(sample_points(1.0, 0).is_err());
    }

    #[test]
    fn characteristic_at_zero_is_one_plus_zero_i() {
        let c = [0.2, 0.5, 0.3];
        let (v, w) = EmbeddingMode::Characteristic.reduce(0, &c, &[0.0, 1.0]);
        assert!(w.is_none());
        assert_eq!(v.len(), 4);
        assert!((v[0] - 1.0).abs() < 1e-15);
        assert!(v[1].abs() < 1e-15);
        let re: f64 = c.iter().map(|x| x.cos()).sum::<f64>() / 3.0;
        let im: f64 = c.iter().map(|x| x.sin()).sum::<f64>() / 3.0;
        assert!((v[2] - re).abs() < 1e-15);
        assert!((v[3] - im).abs() < 1e-15);
    }

    #[test]
    fn moment_generating_matches_definition() {
        let c = [0.0, 1.0];
        let (v, _) = EmbeddingMode::MomentGenerating.reduce(0, &c, &[0.0, 2.0]);
        assert_eq!(v.len(), 2);
        assert!((v[0] - 1.0).abs() < 1e-15);
        assert!((v[1] - (1.0 + 2.0f64.exp()) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn moment_integer_exponents_accept_negative_coefficients() {
        let c = [-1.0, 2.0];
        let (v, w) = EmbeddingMode::Moment.reduce(3, &c, &[0.0, 1.0, 2.0]);
        assert!(w.is_none());
        assert_eq!(v, vec![1.0, 0.5, 2.5]);
    }

    #[test]
    fn moment_fractional_exponent_on_negative_coefficient_warns() {
        let c = [-0.25, 0.25];
        let (v, w) = EmbeddingMode::Moment.reduce(7, &c, &[0.0, 0.5]);
        assert_eq!(v[0], 1.0);
        assert!(v[1].is_nan());
        let w = w.unwrap();
        assert_eq!(w.node, 7);
        assert_eq!(w.negative_coefficients, 1);
        assert_eq!(w.fractional_samples, vec![0.5]);
        assert!(w.to_string().contains("node 7"));
    }

    #[test]
    fn labels_reject_duplicates() {
        let err = Labels::new(vec!["a", "b", "a"]).unwrap_err();
        assert!(format!("{err}").contains("duplicate"), "{err}");
    }

    #[test]
    fn embedding_lookup_by_label_and_index() {
        let labels = Arc::new(Labels::new(vec!["x", "y"]).unwrap());
        let e = Embedding::new(
            1.0,
            EmbeddingMode::Moment,
            2,
            labels,
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        );
        assert_eq!(e.get(&"y"), Some(&[3.0, 4.0][..]));
        assert_eq!(e.get(&"z"), None);
        assert_eq!(e.vector(0), Some(&[1.0, 2.0][..]));
        assert_eq!(e.to_matrix()[(1, 0)], 3.0);
        let pairs: Vec<_> = e.iter().map(|(l, v)| (*l, v[1])).collect();
        assert_eq!(pairs, vec![("x", 2.0), ("y", 4.0)]);
    }

    proptest! {
        #[test]
        fn prop_output_lengths_follow_mode(
            coeffs in proptest::collection::vec(0.0f64..1.0, 1..20),
            k in 1usize..10,
        ) {
            let samples = sample_points(0.3, k).unwrap();
            for mode in EmbeddingMode::ALL {
                let (v, _) = mode.reduce(0, &coeffs, &samples);
                prop_assert_eq!(v.len(), mode.dim(k));
                prop_assert!(v.iter().all(|x| x.is_finite()));
            }
        }

        #[test]
        fn prop_characteristic_modulus_is_at_most_one(
            coeffs in proptest::collection::vec(-2.0f64..2.0, 1..20),
            t in 0.0f64..50.0,
        ) {
            let (v, _) = EmbeddingMode::Characteristic.reduce(0, &coeffs, &[t]);
            prop_assert!((v[0] * v[0] + v[1] * v[1]).sqrt() <= 1.0 + 1e-12);
        }
    }
}
