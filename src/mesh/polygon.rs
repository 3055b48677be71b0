use super::{EdgeBetweenNodes, EdgeIdx, NodeCoords, NodeIdx, TriangleMesh};
use crate::{quadrature::QuadRule, CellIdx};

use indexmap::IndexMap;

/// Edge of a polygon mesh with its neighbouring cells.
///
/// The edge runs from `nodes[0]` to `nodes[1]` in counter-clockwise order of
/// the left cell. Boundary edges have `right == left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolygonEdge {
  pub nodes: [NodeIdx; 2],
  pub left: CellIdx,
  pub right: CellIdx,
}
impl PolygonEdge {
  pub fn is_boundary(&self) -> bool {
    self.left == self.right
  }
}

/// A 2D mesh of counter-clockwise oriented, star-shaped polygons.
#[derive(Debug, Clone)]
pub struct PolygonMesh {
  node_coords: NodeCoords,
  cells: Vec<Vec<NodeIdx>>,
  edges: Vec<PolygonEdge>,
  cell2edge: Vec<Vec<EdgeIdx>>,
  measures: Vec<f64>,
  barycenters: Vec<na::Vector2<f64>>,
}

impl PolygonMesh {
  pub fn new(node_coords: NodeCoords, cells: Vec<Vec<NodeIdx>>) -> Self {
    assert!(node_coords.dim() == 2, "Polygon meshes are planar.");

    let mut edge_map: IndexMap<EdgeBetweenNodes, PolygonEdge> = IndexMap::new();
    let cell2edge = cells
      .iter()
      .enumerate()
      .map(|(icell, cell)| {
        let n = cell.len();
        (0..n)
          .map(|i| {
            let [a, b] = [cell[i], cell[(i + 1) % n]];
            let entry = edge_map.entry(EdgeBetweenNodes::new(a, b));
            let iedge = entry.index();
            entry
              .and_modify(|e| e.right = icell)
              .or_insert(PolygonEdge {
                nodes: [a, b],
                left: icell,
                right: icell,
              });
            iedge
          })
          .collect()
      })
      .collect();
    let edges = edge_map.into_values().collect();

    let (measures, barycenters) = cells
      .iter()
      .map(|cell| polygon_area_centroid(&node_coords, cell))
      .unzip();

    Self {
      node_coords,
      cells,
      edges,
      cell2edge,
      measures,
      barycenters,
    }
  }

  pub fn from_rows(nodes: &[[f64; 2]], cells: Vec<Vec<NodeIdx>>) -> Self {
    Self::new(NodeCoords::from_rows(nodes), cells)
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
  pub fn node(&self, inode: NodeIdx) -> na::Vector2<f64> {
    let c = self.node_coords.coord(inode);
    na::Vector2::new(c[0], c[1])
  }
  pub fn cells(&self) -> &[Vec<NodeIdx>] {
    &self.cells
  }
  pub fn cell(&self, icell: CellIdx) -> &[NodeIdx] {
    &self.cells[icell]
  }
  pub fn edges(&self) -> &[PolygonEdge] {
    &self.edges
  }
  pub fn cell2edge(&self) -> &[Vec<EdgeIdx>] {
    &self.cell2edge
  }
  pub fn cell_measure(&self, icell: CellIdx) -> f64 {
    self.measures[icell]
  }
  pub fn cell_measures(&self) -> &[f64] {
    &self.measures
  }
  /// Area weighted centroid.
  pub fn barycenter(&self, icell: CellIdx) -> na::Vector2<f64> {
    self.barycenters[icell]
  }
  pub fn barycenters(&self) -> &[na::Vector2<f64>] {
    &self.barycenters
  }
  pub fn edge_length(&self, iedge: EdgeIdx) -> f64 {
    self.edge_normal(iedge).norm()
  }

  /// Normal of the edge, outward for the left cell, with the length of the edge.
  pub fn edge_normal(&self, iedge: EdgeIdx) -> na::Vector2<f64> {
    let [a, b] = self.edges[iedge].nodes;
    let t = self.node(b) - self.node(a);
    na::Vector2::new(t.y, -t.x)
  }

  /// Physical quadrature points and weights on a cell.
  ///
  /// The polygon is split into the triangles `(x_K, v_i, v_{i+1})`. The weights
  /// include the sub triangle areas, so they sum to the cell measure.
  pub fn cell_quadrature(&self, icell: CellIdx, rule: &QuadRule) -> Vec<(na::Vector2<f64>, f64)> {
    let cell = &self.cells[icell];
    let n = cell.len();
    let xk = self.barycenters[icell];
    let mut qps = Vec::with_capacity(n * rule.npoints());
    for i in 0..n {
      let a = self.node(cell[i]);
      let b = self.node(cell[(i + 1) % n]);
      let area = 0.5 * (a - xk).perp(&(b - xk));
      for (bc, w) in rule.iter() {
        let x = bc[0] * xk + bc[1] * a + bc[2] * b;
        qps.push((x, w * area));
      }
    }
    qps
  }
}

impl From<&TriangleMesh> for PolygonMesh {
  fn from(mesh: &TriangleMesh) -> Self {
    let cells = mesh.cells().iter().map(|c| c.to_vec()).collect();
    let node_coords = mesh.node_coords().clone();
    Self::new(node_coords, cells)
  }
}

/// Shoelace area and centroid.
fn polygon_area_centroid(coords: &NodeCoords, cell: &[NodeIdx]) -> (f64, na::Vector2<f64>) {
  let n = cell.len();
  let mut area = 0.0;
  let mut centroid = na::Vector2::zeros();
  for i in 0..n {
    let a = coords.coord(cell[i]);
    let b = coords.coord(cell[(i + 1) % n]);
    let cross = a[0] * b[1] - b[0] * a[1];
    area += cross;
    centroid += cross * na::Vector2::new(a[0] + b[0], a[1] + b[1]);
  }
  area /= 2.0;
  centroid /= 6.0 * area;
  (area, centroid)
}
