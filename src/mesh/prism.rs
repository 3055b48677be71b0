use super::{EdgeBetweenNodes, NodeCoords, NodeIdx, TriangleMesh};
use crate::CellIdx;

use indexmap::IndexSet;

/// Local edges of a prism `(v0 v1 v2 | v3 v4 v5)`, bottom, top, then vertical.
pub const PRISM_EDGES: [[usize; 2]; 9] = [
  [0, 1],
  [1, 2],
  [2, 0],
  [3, 4],
  [4, 5],
  [5, 3],
  [0, 3],
  [1, 4],
  [2, 5],
];
pub const PRISM_TRI_FACES: [[usize; 3]; 2] = [[0, 1, 2], [3, 4, 5]];
pub const PRISM_QUAD_FACES: [[usize; 4]; 3] = [[0, 1, 4, 3], [1, 2, 5, 4], [2, 0, 3, 5]];

/// A 3D mesh of triangular prisms.
///
/// Vertices `0, 1, 2` span the bottom triangle and `3, 4, 5` the top one,
/// vertex `i + 3` above vertex `i`.
#[derive(Debug, Clone)]
pub struct PrismMesh {
  node_coords: NodeCoords,
  cells: Vec<[NodeIdx; 6]>,
  nedges: usize,
  ntri_faces: usize,
  nquad_faces: usize,
}

impl PrismMesh {
  pub fn new(node_coords: NodeCoords, cells: Vec<[NodeIdx; 6]>) -> Self {
    let mut edges = IndexSet::new();
    let mut tri_faces = IndexSet::new();
    let mut quad_faces = IndexSet::new();
    for cell in &cells {
      for [i, j] in PRISM_EDGES {
        edges.insert(EdgeBetweenNodes::new(cell[i], cell[j]));
      }
      for face in PRISM_TRI_FACES {
        let mut face = face.map(|i| cell[i]);
        face.sort_unstable();
        tri_faces.insert(face);
      }
      for face in PRISM_QUAD_FACES {
        let mut face = face.map(|i| cell[i]);
        face.sort_unstable();
        quad_faces.insert(face);
      }
    }

    Self {
      node_coords,
      cells,
      nedges: edges.len(),
      ntri_faces: tri_faces.len(),
      nquad_faces: quad_faces.len(),
    }
  }

  /// Extrudes a planar triangle mesh into `nlayers` layers of prisms.
  pub fn extrude(base: &TriangleMesh, nlayers: usize, height: f64) -> Self {
    assert!(base.dim_embedded() == 2, "Can only extrude planar meshes.");
    let nbase = base.nnodes();
    let nnodes = nbase * (nlayers + 1);

    let mut matrix = na::DMatrix::zeros(3, nnodes);
    for layer in 0..=nlayers {
      let z = height * layer as f64 / nlayers as f64;
      for inode in 0..nbase {
        let c = base.node_coords().coord(inode);
        matrix[(0, layer * nbase + inode)] = c[0];
        matrix[(1, layer * nbase + inode)] = c[1];
        matrix[(2, layer * nbase + inode)] = z;
      }
    }

    let cells = (0..nlayers)
      .flat_map(|layer| {
        base.cells().iter().map(move |&[a, b, c]| {
          let bottom = layer * nbase;
          let top = (layer + 1) * nbase;
          [a + bottom, b + bottom, c + bottom, a + top, b + top, c + top]
        })
      })
      .collect();

    Self::new(NodeCoords::new(matrix), cells)
  }

  pub fn nnodes(&self) -> usize {
    self.node_coords.nnodes()
  }
  pub fn nedges(&self) -> usize {
    self.nedges
  }
  pub fn ntri_faces(&self) -> usize {
    self.ntri_faces
  }
  pub fn nquad_faces(&self) -> usize {
    self.nquad_faces
  }
  pub fn ncells(&self) -> usize {
    self.cells.len()
  }
  pub fn node_coords(&self) -> &NodeCoords {
    &self.node_coords
  }
  pub fn cells(&self) -> &[[NodeIdx; 6]] {
    &self.cells
  }
  pub fn cell(&self, icell: CellIdx) -> &[NodeIdx; 6] {
    &self.cells[icell]
  }
}
