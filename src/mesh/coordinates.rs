use super::NodeIdx;
use crate::Dim;

#[derive(Debug, Clone)]
pub struct NodeCoords {
  /// The node coordinates in the columns of a matrix.
  matrix: na::DMatrix<f64>,
}
impl NodeCoords {
  pub fn new(matrix: na::DMatrix<f64>) -> Self {
    Self { matrix }
  }

  /// Build from rows of coordinates, as mesh data is usually written down.
  pub fn from_rows<const D: usize>(rows: &[[f64; D]]) -> Self {
    let matrix = na::DMatrix::from_fn(D, rows.len(), |i, j| rows[j][i]);
    Self { matrix }
  }

  pub fn dim(&self) -> Dim {
    self.matrix.nrows()
  }
  pub fn nnodes(&self) -> usize {
    self.matrix.ncols()
  }

  pub fn coord(&self, inode: NodeIdx) -> na::DVectorView<f64> {
    self.matrix.column(inode)
  }

  pub fn matrix(&self) -> &na::DMatrix<f64> {
    &self.matrix
  }

  /// Convex combination of the given nodes.
  pub fn combination(&self, nodes: &[NodeIdx], weights: na::DVectorView<f64>) -> na::DVector<f64> {
    let mut point = na::DVector::zeros(self.dim());
    for (&inode, &w) in nodes.iter().zip(weights.iter()) {
      point.axpy(w, &self.coord(inode), 1.0);
    }
    point
  }

  pub fn from_columns(columns: &[na::DVector<f64>], dim: Dim) -> Self {
    let mut matrix = na::DMatrix::zeros(dim, columns.len());
    for (i, c) in columns.iter().enumerate() {
      matrix.set_column(i, c);
    }
    Self { matrix }
  }
}
