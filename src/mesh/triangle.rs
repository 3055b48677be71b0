use super::{EdgeBetweenNodes, EdgeIdx, NodeCoords, NodeIdx};
use crate::{linalg::DMatrixExt as _, CellIdx, Dim};

use indexmap::IndexSet;
use std::collections::HashMap;

/// Local edge `i` is opposite of local vertex `i`.
pub const LOCAL_EDGES: [[usize; 2]; 3] = [[1, 2], [2, 0], [0, 1]];

/// Derivatives of the barycentric coordinates w.r.t. the reference coordinates.
#[rustfmt::skip]
pub fn ref_difbarys() -> na::DMatrix<f64> {
  na::dmatrix![
    -1.0, 1.0, 0.0;
    -1.0, 0.0, 1.0;
  ]
}

/// A triangle mesh embedded in 2D or 3D.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
  node_coords: NodeCoords,
  cells: Vec<[NodeIdx; 3]>,
  edges: Vec<[NodeIdx; 2]>,
  cell2edge: Vec<[EdgeIdx; 3]>,
}

impl TriangleMesh {
  pub fn new(node_coords: NodeCoords, cells: Vec<[NodeIdx; 3]>) -> Self {
    let mut edge_set = IndexSet::new();
    let cell2edge = cells
      .iter()
      .map(|cell| {
        LOCAL_EDGES.map(|[i, j]| edge_set.insert_full(EdgeBetweenNodes::new(cell[i], cell[j])).0)
      })
      .collect();
    let edges = edge_set.into_iter().map(|e| e.nodes()).collect();

    Self {
      node_coords,
      cells,
      edges,
      cell2edge,
    }
  }

  pub fn from_rows<const D: usize>(nodes: &[[f64; D]], cells: Vec<[NodeIdx; 3]>) -> Self {
    Self::new(NodeCoords::from_rows(nodes), cells)
  }

  pub fn dim_embedded(&self) -> Dim {
    self.node_coords.dim()
  }
  pub fn nnodes(&self) -> usize {
    self.node_coords.nnodes()
  }
  pub fn nedges(&self) -> usize {
    self.edges.len()
  }
  pub fn ncells(&self) -> usize {
    self.cells.len()
  }
  pub fn node_coords(&self) -> &NodeCoords {
    &self.node_coords
  }
  pub fn cells(&self) -> &[[NodeIdx; 3]] {
    &self.cells
  }
  pub fn cell(&self, icell: CellIdx) -> &[NodeIdx; 3] {
    &self.cells[icell]
  }
  pub fn edges(&self) -> &[[NodeIdx; 2]] {
    &self.edges
  }
  pub fn cell2edge(&self) -> &[[EdgeIdx; 3]] {
    &self.cell2edge
  }

  /// Rows are the edge vectors `x1 - x0` and `x2 - x0`.
  pub fn jacobi_matrix(&self, icell: CellIdx) -> na::DMatrix<f64> {
    let [v0, v1, v2] = self.cells[icell];
    let x0 = self.node_coords.coord(v0);
    let e1 = self.node_coords.coord(v1) - x0;
    let e2 = self.node_coords.coord(v2) - x0;
    na::DMatrix::from_rows(&[e1.transpose(), e2.transpose()])
  }

  pub fn cell_measure(&self, icell: CellIdx) -> f64 {
    self.jacobi_matrix(icell).gram_det_sqrt() / 2.0
  }
  pub fn cell_measures(&self) -> Vec<f64> {
    (0..self.ncells()).map(|icell| self.cell_measure(icell)).collect()
  }

  pub fn bc_to_point(&self, icell: CellIdx, bc: na::DVectorView<f64>) -> na::DVector<f64> {
    self.node_coords.combination(&self.cells[icell], bc)
  }
  pub fn barycenter(&self, icell: CellIdx) -> na::DVector<f64> {
    let third = na::DVector::from_element(3, 1.0 / 3.0);
    self.bc_to_point(icell, third.as_view())
  }

  /// Gradients of the barycentric coordinates in the columns (`dim x 3`).
  ///
  /// For surfaces embedded in 3D these are the tangential gradients.
  pub fn grad_lambda(&self, icell: CellIdx) -> Option<na::DMatrix<f64>> {
    let jacobi = self.jacobi_matrix(icell);
    let metric_inv = jacobi.gramian().try_inverse()?;
    Some(jacobi.transpose() * metric_inv * ref_difbarys())
  }

  /// Edge vectors `x_j - x_i` of the local edges `(i, j)` in [`LOCAL_EDGES`].
  pub fn edge_tangent(&self, icell: CellIdx, iedge: usize) -> na::DVector<f64> {
    let [i, j] = LOCAL_EDGES[iedge];
    let cell = &self.cells[icell];
    self.node_coords.coord(cell[j]) - self.node_coords.coord(cell[i])
  }

  /// Splits every triangle into four by connecting the edge midpoints.
  pub fn uniform_refine(self, nrefinements: usize) -> Self {
    let dim = self.dim_embedded();
    let nodes: Vec<na::DVector<f64>> = self
      .node_coords
      .matrix()
      .column_iter()
      .map(|c| c.into_owned())
      .collect();
    let (cells, nodes) = subdivide(self.cells, nodes, nrefinements);
    Self::new(NodeCoords::from_columns(&nodes, dim), cells)
  }

  /// Applies `f` to every node, e.g. a projection onto a surface.
  pub fn map_nodes<F>(self, mut f: F) -> Self
  where
    F: FnMut(na::DVectorView<f64>) -> na::DVector<f64>,
  {
    let dim = self.dim_embedded();
    let nodes: Vec<_> = self.node_coords.matrix().column_iter().map(&mut f).collect();
    Self {
      node_coords: NodeCoords::from_columns(&nodes, dim),
      ..self
    }
  }
}

fn subdivide(
  cells: Vec<[NodeIdx; 3]>,
  mut nodes: Vec<na::DVector<f64>>,
  depth: usize,
) -> (Vec<[NodeIdx; 3]>, Vec<na::DVector<f64>>) {
  if depth == 0 {
    return (cells, nodes);
  }

  let mut midpoints = HashMap::new();

  let cells = cells
    .into_iter()
    .flat_map(|[v0, v1, v2]| {
      let v01 = get_midpoint(v0, v1, &mut nodes, &mut midpoints);
      let v12 = get_midpoint(v1, v2, &mut nodes, &mut midpoints);
      let v20 = get_midpoint(v2, v0, &mut nodes, &mut midpoints);

      [
        [v0, v01, v20],
        [v1, v12, v01],
        [v2, v20, v12],
        [v01, v12, v20],
      ]
    })
    .collect();

  subdivide(cells, nodes, depth - 1)
}

fn get_midpoint(
  v0: NodeIdx,
  v1: NodeIdx,
  nodes: &mut Vec<na::DVector<f64>>,
  midpoints: &mut HashMap<EdgeBetweenNodes, NodeIdx>,
) -> NodeIdx {
  let edge = EdgeBetweenNodes::new(v0, v1);
  if let Some(&midpoint) = midpoints.get(&edge) {
    return midpoint;
  }

  let midpoint = (&nodes[v0] + &nodes[v1]) / 2.0;
  nodes.push(midpoint);
  let index = nodes.len() - 1;
  midpoints.insert(edge, index);
  index
}
