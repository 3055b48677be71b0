//! In-memory meshes consumed by the function spaces.
//!
//! A mesh stores the node coordinates (one column per node) and the cell
//! connectivity. Derived entities (edges, faces) get a global numbering in
//! order of first appearance during cell traversal.

pub mod coordinates;
pub mod polygon;
pub mod prism;
pub mod triangle;

pub use coordinates::NodeCoords;
pub use polygon::PolygonMesh;
pub use prism::PrismMesh;
pub use triangle::TriangleMesh;

pub type NodeIdx = usize;
pub type EdgeIdx = usize;
pub type FaceIdx = usize;

/// Edge without orientation. Always use [`Self::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeBetweenNodes(NodeIdx, NodeIdx);
impl EdgeBetweenNodes {
  pub fn new(a: NodeIdx, b: NodeIdx) -> Self {
    if a < b {
      Self(a, b)
    } else {
      Self(b, a)
    }
  }
  pub fn nodes(&self) -> [NodeIdx; 2] {
    [self.0, self.1]
  }
}
