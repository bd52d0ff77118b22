//! Wavelet coefficients: the heat-filtered impulse at a node.
//!
//! Two paths produce the same length-N vector for node `i`:
//! - [`node_coefficients`]: exact, `U · diag(exp(−τλ)) · Uᵀ · e_i`, O(N²) per node
//! - [`impulse_response`]: Chebyshev recurrence on the sparse Laplacian, O(m·|E|) per node
//!
//! Node indices are checked against the half-open range `0..N`; index `N` is rejected.

use nalgebra::{DMatrix, DVector};

use crate::filter::ChebyshevApproximation;
use crate::spectral::{Laplacian, SpectralBasis};
use crate::{Error, Result};

/// Reject node indices outside `0..node_count`.
pub fn check_node(node: usize, node_count: usize) -> Result<()> {
    if node >= node_count {
        return Err(Error::IndexOutOfBounds {
            index: node,
            node_count,
        });
    }
    Ok(())
}

/// Reject coefficient vectors whose length is not `node_count`.
pub fn check_coefficients(coefficients: &[f64], node_count: usize) -> Result<()> {
    if coefficients.len() != node_count {
        return Err(Error::CoefficientLength {
            expected: node_count,
            actual: coefficients.len(),
        });
    }
    Ok(())
}

fn check_scale(scale: f64) -> Result<()> {
    if !scale.is_finite() || scale < 0.0 {
        return Err(Error::Configuration(format!(
            "diffusion scale must be finite and >= 0, got {scale}"
        )));
    }
    Ok(())
}

/// Exact heat-kernel wavelet coefficients of `node` at `scale`.
///
/// `scale == 0` is accepted here (the kernel is the identity and the result is `e_node`);
/// embedding entry points require `scale > 0`.
pub fn node_coefficients(basis: &SpectralBasis, node: usize, scale: f64) -> Result<Vec<f64>> {
    check_node(node, basis.node_count())?;
    check_scale(scale)?;

    let u = basis.eigenvectors();
    // Uᵀ·e_i is row i of U
    let projected: DVector<f64> = basis
        .eigenvalues()
        .map(|lambda| (-scale * lambda).exp())
        .component_mul(&u.row(node).transpose());
    let coefficients = u * projected;
    Ok(coefficients.as_slice().to_vec())
}

/// Full `N×N` exact heat kernel `U · diag(exp(−τλ)) · Uᵀ`.
///
/// Column `i` equals [`node_coefficients`] of node `i`.
pub fn kernel_matrix(basis: &SpectralBasis, scale: f64) -> Result<DMatrix<f64>> {
    check_scale(scale)?;
    let u = basis.eigenvectors();
    let mut scaled = u.clone();
    for (mut column, &lambda) in scaled.column_iter_mut().zip(basis.eigenvalues().iter()) {
        column *= (-scale * lambda).exp();
    }
    Ok(scaled * u.transpose())
}

/// Chebyshev-approximated wavelet coefficients of `node`.
pub fn impulse_response(
    laplacian: &Laplacian,
    approximation: &ChebyshevApproximation,
    node: usize,
) -> Result<Vec<f64>> {
    let n = laplacian.node_count();
    check_node(node, n)?;
    let mut impulse = vec![0.0; n];
    impulse[node] = 1.0;
    let coefficients = approximation.apply(laplacian, &impulse)?;
    check_coefficients(&coefficients, n)?;
    Ok(coefficients)
}
