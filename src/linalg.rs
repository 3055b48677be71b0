pub trait DMatrixExt {
  fn gramian(&self) -> Self;
  fn gram_det(&self) -> f64;
  fn gram_det_sqrt(&self) -> f64;
  fn condition_number(&self) -> f64;
}
impl DMatrixExt for na::DMatrix<f64> {
  /// `A A^T`, the metric of a matrix whose rows are tangent vectors.
  fn gramian(&self) -> Self {
    self * self.transpose()
  }
  fn gram_det(&self) -> f64 {
    self.gramian().determinant()
  }
  fn gram_det_sqrt(&self) -> f64 {
    self.gram_det().max(0.0).sqrt()
  }

  /// Spectral condition number of a symmetric matrix.
  ///
  /// Ratio of the largest to the smallest eigenvalue magnitude.
  /// Infinite for singular matrices.
  fn condition_number(&self) -> f64 {
    let eigenvalues = na::SymmetricEigen::new(self.clone()).eigenvalues;
    let max = eigenvalues.iter().fold(0.0f64, |m, l| m.max(l.abs()));
    let min = eigenvalues.iter().fold(f64::INFINITY, |m, l| m.min(l.abs()));
    if min == 0.0 {
      f64::INFINITY
    } else {
      max / min
    }
  }
}
