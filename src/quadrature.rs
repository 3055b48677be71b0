//! Quadrature rules on the reference edge and the reference triangle.
//!
//! Points are given in barycentric coordinates (one column per point) and the
//! weights are normalized to sum to one, so the integral over a cell is the
//! weighted sum times the cell measure.

use crate::{multi_index::MultiIndexMatrix, Dim};

/// A quadrature rule in barycentric coordinates.
#[derive(Debug, Clone)]
pub struct QuadRule {
  bcs: na::DMatrix<f64>,
  weights: na::DVector<f64>,
}
impl QuadRule {
  /// Gauss-Legendre rule with `npoints` points on the unit edge.
  ///
  /// Nodes and weights come from the eigen decomposition of the symmetric
  /// Jacobi matrix of the Legendre recursion (Golub-Welsch).
  pub fn gauss_legendre(npoints: usize) -> Self {
    let n = npoints.max(1);
    let mut jacobi = na::DMatrix::zeros(n, n);
    for k in 1..n {
      let kf = k as f64;
      let beta = kf / (4.0 * kf * kf - 1.0).sqrt();
      jacobi[(k - 1, k)] = beta;
      jacobi[(k, k - 1)] = beta;
    }
    let eigen = na::SymmetricEigen::new(jacobi);

    let mut nodes: Vec<(f64, f64)> = eigen
      .eigenvalues
      .iter()
      .zip(eigen.eigenvectors.row(0).iter())
      .map(|(&x, &v)| ((x + 1.0) / 2.0, v * v))
      .collect();
    nodes.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut bcs = na::DMatrix::zeros(2, n);
    let mut weights = na::DVector::zeros(n);
    for (i, (t, w)) in nodes.into_iter().enumerate() {
      bcs[(0, i)] = 1.0 - t;
      bcs[(1, i)] = t;
      weights[i] = w;
    }
    Self { bcs, weights }
  }

  /// Rule on the reference edge exact for polynomials of degree `degree`.
  pub fn edge(degree: usize) -> Self {
    Self::gauss_legendre(degree / 2 + 1)
  }

  /// Rule on the reference triangle exact for polynomials of degree `degree`.
  ///
  /// Collapsed (Duffy) product of two Gauss-Legendre rules:
  /// `l1 = u`, `l2 = v (1 - u)`, weight `2 wu wv (1 - u)`.
  pub fn triangle(degree: usize) -> Self {
    let n = (degree + 3) / 2;
    let gl = Self::gauss_legendre(n);

    let npoints = n * n;
    let mut bcs = na::DMatrix::zeros(3, npoints);
    let mut weights = na::DVector::zeros(npoints);
    let mut iqp = 0;
    for i in 0..n {
      let u = gl.bcs[(1, i)];
      for j in 0..n {
        let v = gl.bcs[(1, j)];
        let l1 = u;
        let l2 = v * (1.0 - u);
        bcs[(0, iqp)] = 1.0 - l1 - l2;
        bcs[(1, iqp)] = l1;
        bcs[(2, iqp)] = l2;
        weights[iqp] = 2.0 * gl.weights[i] * gl.weights[j] * (1.0 - u);
        iqp += 1;
      }
    }
    Self { bcs, weights }
  }

  /// Equispaced nodal points of a degree `p` triangle.
  pub fn triangle_nodes(p: usize) -> na::DMatrix<f64> {
    let mi = MultiIndexMatrix::triangle(p);
    let mut bcs = na::DMatrix::zeros(3, mi.nrows());
    for k in 0..mi.nrows() {
      bcs.set_column(k, &mi.convex_weights(k));
    }
    bcs
  }

  pub fn nbarys(&self) -> usize {
    self.bcs.nrows()
  }
  pub fn dim(&self) -> Dim {
    self.nbarys() - 1
  }
  pub fn npoints(&self) -> usize {
    self.bcs.ncols()
  }
  pub fn bcs(&self) -> &na::DMatrix<f64> {
    &self.bcs
  }
  pub fn bc(&self, iqp: usize) -> na::DVectorView<f64> {
    self.bcs.column(iqp)
  }
  pub fn weights(&self) -> &na::DVector<f64> {
    &self.weights
  }

  pub fn iter(&self) -> impl Iterator<Item = (na::DVectorView<f64>, f64)> {
    self.bcs.column_iter().zip(self.weights.iter().copied())
  }

  /// Weighted sum over the rule. Multiply by the cell measure for the integral.
  pub fn apply<F>(&self, f: F) -> f64
  where
    F: Fn(na::DVectorView<f64>) -> f64,
  {
    self.iter().map(|(bc, w)| w * f(bc)).sum()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  use approx::assert_relative_eq;
  use num_integer::binomial;

  fn factorial(n: usize) -> f64 {
    (1..=n).product::<usize>() as f64
  }

  #[test]
  fn weights_sum_to_one() {
    for n in 1..=6 {
      let rule = QuadRule::gauss_legendre(n);
      assert_relative_eq!(rule.weights().sum(), 1.0, epsilon = 1e-14);
    }
    for d in 0..=8 {
      let rule = QuadRule::triangle(d);
      assert_relative_eq!(rule.weights().sum(), 1.0, epsilon = 1e-14);
    }
  }

  #[test]
  fn gauss_legendre_exactness() {
    for n in 1..=6 {
      let rule = QuadRule::gauss_legendre(n);
      for k in 0..2 * n {
        let approx = rule.apply(|bc| bc[1].powi(k as i32));
        assert_relative_eq!(approx, 1.0 / (k + 1) as f64, epsilon = 1e-13);
      }
    }
  }

  /// Integral of `l1^a l2^b` over the reference triangle divided by its area
  /// is `2 a! b! / (a + b + 2)!`.
  #[test]
  fn triangle_exactness() {
    for d in 0..=8 {
      let rule = QuadRule::triangle(d);
      for a in 0..=d {
        for b in 0..=d - a {
          let approx = rule.apply(|bc| bc[1].powi(a as i32) * bc[2].powi(b as i32));
          let exact = 2.0 * factorial(a) * factorial(b) / factorial(a + b + 2);
          assert_relative_eq!(approx, exact, epsilon = 1e-13);
        }
      }
    }
  }

  #[test]
  fn triangle_nodes_are_convex() {
    let bcs = QuadRule::triangle_nodes(3);
    assert_eq!(bcs.ncols(), binomial(5, 2));
    for c in bcs.column_iter() {
      assert_relative_eq!(c.sum(), 1.0);
      assert!(c.iter().all(|&l| l >= 0.0));
    }
  }
}
