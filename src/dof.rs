//! Degree-of-freedom management.
//!
//! A [`DofLayout`] numbers the local basis functions of every cell globally.
//! Nodal layouts identify every local DOF with a point, given as vertex weights
//! in a [`MultiIndexMatrix`]. Local DOFs which describe the same point on a
//! shared mesh entity receive the same global index.

use crate::{
  error::{FemError, FemResult},
  mesh::{NodeCoords, NodeIdx, PrismMesh, TriangleMesh},
  multi_index::{self, MultiIndexMatrix},
  CellIdx,
};

use itertools::Itertools;
use std::{
  collections::{BTreeMap, BTreeSet},
  rc::Rc,
};
use tracing::debug;

pub type DofIdx = usize;

/// A local DOF, addressed by cell and local index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDof {
  pub icell: CellIdx,
  pub ilocal: usize,
}

/// The cell-to-dof map together with one representative local DOF per global DOF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofMap {
  cell2dof: Vec<Vec<DofIdx>>,
  representatives: Vec<Option<LocalDof>>,
}

impl DofMap {
  /// Representatives are the first occurrences in cell order.
  pub fn new(cell2dof: Vec<Vec<DofIdx>>, ndofs: usize) -> Self {
    let mut representatives = vec![None; ndofs];
    for (icell, dofs) in cell2dof.iter().enumerate() {
      for (ilocal, &idof) in dofs.iter().enumerate() {
        representatives[idof].get_or_insert(LocalDof { icell, ilocal });
      }
    }
    Self {
      cell2dof,
      representatives,
    }
  }

  /// Every cell owns its own block of `ldof` DOFs.
  pub fn discontinuous(ncells: usize, ldof: usize) -> Self {
    let cell2dof = (0..ncells)
      .map(|icell| (icell * ldof..(icell + 1) * ldof).collect())
      .collect();
    Self::new(cell2dof, ncells * ldof)
  }

  /// Global numbering of nodal DOFs with vertex weights `weights`.
  ///
  /// A local DOF is classified by the number of non-zero weights: one means it
  /// sits on a node and takes the node index, all means it is interior to the
  /// cell, anything else means it lives on an edge or face shared with other
  /// cells. Shared DOFs are identified by their sorted `(node, weight)` pairs,
  /// the distinct keys are numbered lexicographically after the nodes. Interior
  /// DOFs come last, one contiguous block per cell.
  pub fn nodal<C>(cells: &[C], nnodes: usize, weights: &MultiIndexMatrix) -> Self
  where
    C: AsRef<[NodeIdx]>,
  {
    #[derive(Clone, Copy)]
    enum Kind {
      Node(usize),
      Shared,
      Interior,
    }

    let ldof = weights.nrows();
    let nverts = weights.ncomps();
    let kinds: Vec<Kind> = (0..ldof)
      .map(|k| match weights.support_size(k) {
        1 => {
          let ivert = weights.row(k).iter().position(|&w| w != 0).unwrap_or(0);
          Kind::Node(ivert)
        }
        s if s == nverts => Kind::Interior,
        _ => Kind::Shared,
      })
      .collect();
    let shared_locals: Vec<usize> = (0..ldof)
      .filter(|&k| matches!(kinds[k], Kind::Shared))
      .collect();
    let ninterior = kinds
      .iter()
      .filter(|k| matches!(k, Kind::Interior))
      .count();

    let shared_key = |cell: &[NodeIdx], k: usize| -> Vec<(NodeIdx, usize)> {
      weights
        .row(k)
        .iter()
        .zip(cell)
        .filter(|(&w, _)| w != 0)
        .map(|(&w, &v)| (v, w))
        .sorted_unstable()
        .collect()
    };

    let keys: BTreeSet<_> = cells
      .iter()
      .flat_map(|cell| {
        shared_locals
          .iter()
          .map(move |&k| shared_key(cell.as_ref(), k))
      })
      .collect();
    let nshared = keys.len();
    let shared: BTreeMap<_, DofIdx> = keys
      .into_iter()
      .enumerate()
      .map(|(j, key)| (key, nnodes + j))
      .collect();

    let interior_offset = nnodes + nshared;
    let cell2dof = cells
      .iter()
      .enumerate()
      .map(|(icell, cell)| {
        let cell = cell.as_ref();
        let mut iinterior = 0;
        kinds
          .iter()
          .enumerate()
          .map(|(k, kind)| match *kind {
            Kind::Node(ivert) => cell[ivert],
            Kind::Shared => shared[&shared_key(cell, k)],
            Kind::Interior => {
              let idof = interior_offset + icell * ninterior + iinterior;
              iinterior += 1;
              idof
            }
          })
          .collect()
      })
      .collect();

    let ndofs = interior_offset + cells.len() * ninterior;
    debug!(
      "numbered {} dofs ({} nodes, {} shared, {} interior per cell) on {} cells",
      ndofs,
      nnodes,
      nshared,
      ninterior,
      cells.len()
    );
    Self::new(cell2dof, ndofs)
  }

  pub fn ncells(&self) -> usize {
    self.cell2dof.len()
  }
  pub fn ndofs(&self) -> usize {
    self.representatives.len()
  }
  pub fn cell2dof(&self) -> &[Vec<DofIdx>] {
    &self.cell2dof
  }
  pub fn local2global(&self, icell: CellIdx) -> &[DofIdx] {
    &self.cell2dof[icell]
  }
  pub fn representative(&self, idof: DofIdx) -> Option<LocalDof> {
    self.representatives[idof]
  }
  pub fn representatives(&self) -> &[Option<LocalDof>] {
    &self.representatives
  }
}

/// Numbering of the basis functions of a function space.
pub trait DofLayout {
  fn degree(&self) -> usize;
  fn local_dof_count(&self) -> usize;
  /// Closed form in terms of the mesh entity counts.
  fn global_dof_count(&self) -> usize;
  fn dof_map(&self) -> &DofMap;

  fn cell_to_dof(&self) -> &[Vec<DofIdx>] {
    self.dof_map().cell2dof()
  }
}

/// A layout whose DOFs are point values.
pub trait NodalDofLayout: DofLayout {
  fn multi_index(&self) -> &MultiIndexMatrix;
  fn node_coords(&self) -> &NodeCoords;
  fn cell_nodes(&self, icell: CellIdx) -> &[NodeIdx];

  /// Coordinates of all global DOFs, one column per DOF.
  fn interpolation_points(&self) -> na::DMatrix<f64> {
    let coords = self.node_coords();
    let map = self.dof_map();
    let mi = self.multi_index();
    let mut points = na::DMatrix::zeros(coords.dim(), map.ndofs());
    for idof in 0..map.ndofs() {
      let point = match map.representative(idof) {
        Some(LocalDof { icell, ilocal }) => {
          let weights = mi.convex_weights(ilocal);
          coords.combination(self.cell_nodes(icell), weights.as_view())
        }
        // orphan node not referenced by any cell
        None if idof < coords.nnodes() => coords.coord(idof).into_owned(),
        None => continue,
      };
      points.set_column(idof, &point);
    }
    points
  }
}

fn check_degree(degree: usize, min: usize) -> FemResult<()> {
  if degree < min {
    Err(FemError::InvalidDegree { degree, min })
  } else {
    Ok(())
  }
}

/// Continuous Lagrange DOFs of a prism mesh.
#[derive(Debug, Clone)]
pub struct PrismDof {
  mesh: Rc<PrismMesh>,
  degree: usize,
  multi_index: MultiIndexMatrix,
  dof_map: DofMap,
}
impl PrismDof {
  pub fn new(mesh: Rc<PrismMesh>, degree: usize) -> FemResult<Self> {
    check_degree(degree, 1)?;
    let multi_index = MultiIndexMatrix::prism(degree);
    let dof_map = DofMap::nodal(mesh.cells(), mesh.nnodes(), &multi_index);
    Ok(Self {
      mesh,
      degree,
      multi_index,
      dof_map,
    })
  }
  pub fn mesh(&self) -> &Rc<PrismMesh> {
    &self.mesh
  }
}
impl DofLayout for PrismDof {
  fn degree(&self) -> usize {
    self.degree
  }
  fn local_dof_count(&self) -> usize {
    multi_index::ndofs_prism(self.degree)
  }
  fn global_dof_count(&self) -> usize {
    let p = self.degree;
    let mesh = &self.mesh;
    let mut gdof = mesh.nnodes();
    if p > 1 {
      gdof += mesh.nedges() * (p - 1) + mesh.nquad_faces() * (p - 1) * (p - 1);
    }
    if p > 2 {
      let tfdof = (p - 1) * (p - 2) / 2;
      gdof += mesh.ntri_faces() * tfdof + mesh.ncells() * tfdof * (p - 1);
    }
    gdof
  }
  fn dof_map(&self) -> &DofMap {
    &self.dof_map
  }
}
impl NodalDofLayout for PrismDof {
  fn multi_index(&self) -> &MultiIndexMatrix {
    &self.multi_index
  }
  fn node_coords(&self) -> &NodeCoords {
    self.mesh.node_coords()
  }
  fn cell_nodes(&self, icell: CellIdx) -> &[NodeIdx] {
    self.mesh.cell(icell)
  }
}

/// Continuous Lagrange DOFs of a triangle mesh.
#[derive(Debug, Clone)]
pub struct LagrangeDof {
  mesh: Rc<TriangleMesh>,
  degree: usize,
  multi_index: MultiIndexMatrix,
  dof_map: DofMap,
}
impl LagrangeDof {
  pub fn new(mesh: Rc<TriangleMesh>, degree: usize) -> FemResult<Self> {
    check_degree(degree, 1)?;
    let multi_index = MultiIndexMatrix::triangle(degree);
    let dof_map = DofMap::nodal(mesh.cells(), mesh.nnodes(), &multi_index);
    Ok(Self {
      mesh,
      degree,
      multi_index,
      dof_map,
    })
  }
}
impl DofLayout for LagrangeDof {
  fn degree(&self) -> usize {
    self.degree
  }
  fn local_dof_count(&self) -> usize {
    multi_index::ndofs_triangle(self.degree)
  }
  fn global_dof_count(&self) -> usize {
    let p = self.degree;
    let mesh = &self.mesh;
    mesh.nnodes() + mesh.nedges() * (p - 1) + mesh.ncells() * (p - 1) * p.saturating_sub(2) / 2
  }
  fn dof_map(&self) -> &DofMap {
    &self.dof_map
  }
}
impl NodalDofLayout for LagrangeDof {
  fn multi_index(&self) -> &MultiIndexMatrix {
    &self.multi_index
  }
  fn node_coords(&self) -> &NodeCoords {
    self.mesh.node_coords()
  }
  fn cell_nodes(&self, icell: CellIdx) -> &[NodeIdx] {
    self.mesh.cell(icell)
  }
}

/// Lagrange DOFs of a triangle mesh without inter-element continuity.
#[derive(Debug, Clone)]
pub struct DiscontinuousLagrangeDof {
  mesh: Rc<TriangleMesh>,
  degree: usize,
  multi_index: MultiIndexMatrix,
  dof_map: DofMap,
}
impl DiscontinuousLagrangeDof {
  pub fn new(mesh: Rc<TriangleMesh>, degree: usize) -> Self {
    let multi_index = MultiIndexMatrix::triangle(degree);
    let dof_map = DofMap::discontinuous(mesh.ncells(), multi_index.nrows());
    Self {
      mesh,
      degree,
      multi_index,
      dof_map,
    }
  }
}
impl DofLayout for DiscontinuousLagrangeDof {
  fn degree(&self) -> usize {
    self.degree
  }
  fn local_dof_count(&self) -> usize {
    multi_index::ndofs_triangle(self.degree)
  }
  fn global_dof_count(&self) -> usize {
    self.mesh.ncells() * self.local_dof_count()
  }
  fn dof_map(&self) -> &DofMap {
    &self.dof_map
  }
}
impl NodalDofLayout for DiscontinuousLagrangeDof {
  fn multi_index(&self) -> &MultiIndexMatrix {
    &self.multi_index
  }
  fn node_coords(&self) -> &NodeCoords {
    self.mesh.node_coords()
  }
  fn cell_nodes(&self, icell: CellIdx) -> &[NodeIdx] {
    self.mesh.cell(icell)
  }
}

/// DOFs of a scaled monomial space, one block of monomials per cell.
#[derive(Debug, Clone)]
pub struct ScaledMonomialDof {
  degree: usize,
  multi_index: MultiIndexMatrix,
  dof_map: DofMap,
}
impl ScaledMonomialDof {
  pub fn new(ncells: usize, degree: usize) -> Self {
    let multi_index = MultiIndexMatrix::monomial(degree);
    let dof_map = DofMap::discontinuous(ncells, multi_index.nrows());
    Self {
      degree,
      multi_index,
      dof_map,
    }
  }
  pub fn multi_index(&self) -> &MultiIndexMatrix {
    &self.multi_index
  }
}
impl DofLayout for ScaledMonomialDof {
  fn degree(&self) -> usize {
    self.degree
  }
  fn local_dof_count(&self) -> usize {
    multi_index::ndofs_triangle(self.degree)
  }
  fn global_dof_count(&self) -> usize {
    self.dof_map.ncells() * self.local_dof_count()
  }
  fn dof_map(&self) -> &DofMap {
    &self.dof_map
  }
}

/// Continuous or discontinuous Lagrange DOFs of a triangle mesh.
#[derive(Debug, Clone)]
pub enum TriangleDof {
  Continuous(LagrangeDof),
  Discontinuous(DiscontinuousLagrangeDof),
}
impl TriangleDof {
  fn as_layout(&self) -> &dyn NodalDofLayout {
    match self {
      Self::Continuous(dof) => dof,
      Self::Discontinuous(dof) => dof,
    }
  }
}
impl DofLayout for TriangleDof {
  fn degree(&self) -> usize {
    self.as_layout().degree()
  }
  fn local_dof_count(&self) -> usize {
    self.as_layout().local_dof_count()
  }
  fn global_dof_count(&self) -> usize {
    self.as_layout().global_dof_count()
  }
  fn dof_map(&self) -> &DofMap {
    self.as_layout().dof_map()
  }
}
impl NodalDofLayout for TriangleDof {
  fn multi_index(&self) -> &MultiIndexMatrix {
    self.as_layout().multi_index()
  }
  fn node_coords(&self) -> &NodeCoords {
    self.as_layout().node_coords()
  }
  fn cell_nodes(&self, icell: CellIdx) -> &[NodeIdx] {
    self.as_layout().cell_nodes(icell)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn unit_square() -> Rc<TriangleMesh> {
    Rc::new(TriangleMesh::from_rows(
      &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
      vec![[1, 2, 0], [3, 0, 2]],
    ))
  }

  fn ndistinct(map: &DofMap) -> usize {
    map.cell2dof().iter().flatten().unique().count()
  }

  #[test]
  fn linear_map_is_connectivity() {
    let mesh = unit_square();
    let dof = LagrangeDof::new(mesh.clone(), 1).unwrap();
    let expected: Vec<Vec<DofIdx>> = mesh.cells().iter().map(|c| c.to_vec()).collect();
    assert_eq!(dof.cell_to_dof(), expected.as_slice());
    assert_eq!(dof.global_dof_count(), 4);
  }

  #[test]
  fn zero_degree_is_rejected() {
    let err = LagrangeDof::new(unit_square(), 0).unwrap_err();
    assert_eq!(err, FemError::InvalidDegree { degree: 0, min: 1 });
  }

  #[test]
  fn quadratic_shares_edge_dofs() {
    let mesh = unit_square();
    let dof = LagrangeDof::new(mesh.clone(), 2).unwrap();
    // cells share the diagonal (0, 2) whose midpoint has key [(0, 1), (2, 1)]
    let c0 = dof.dof_map().local2global(0);
    let c1 = dof.dof_map().local2global(1);
    let shared: Vec<_> = c0.iter().filter(|d| c1.contains(d)).collect();
    assert_eq!(shared.len(), 3);
    assert_eq!(dof.global_dof_count(), 9);
    assert_eq!(ndistinct(dof.dof_map()), 9);
  }

  #[test]
  fn map_is_onto() {
    let mesh = Rc::new(TriangleMesh::clone(&unit_square()).uniform_refine(2));
    for p in 1..=4 {
      let dof = LagrangeDof::new(mesh.clone(), p).unwrap();
      let map = dof.dof_map();
      assert_eq!(map.ndofs(), dof.global_dof_count());
      assert_eq!(ndistinct(map), dof.global_dof_count());
      assert!(map.representatives().iter().all(Option::is_some));
    }
  }

  #[test]
  fn interpolation_points_match_representatives() {
    let mesh = unit_square();
    let dof = LagrangeDof::new(mesh.clone(), 3).unwrap();
    let points = dof.interpolation_points();
    let mi = dof.multi_index();
    for (icell, dofs) in dof.cell_to_dof().iter().enumerate() {
      for (ilocal, &idof) in dofs.iter().enumerate() {
        let expected = mesh.bc_to_point(icell, mi.convex_weights(ilocal).as_view());
        assert!((points.column(idof) - expected).norm() < 1e-14);
      }
    }
  }

  #[test]
  fn discontinuous_layout() {
    let mesh = unit_square();
    let dof = DiscontinuousLagrangeDof::new(mesh, 2);
    assert_eq!(dof.global_dof_count(), 12);
    assert_eq!(dof.dof_map().local2global(1), &[6, 7, 8, 9, 10, 11]);
    assert_eq!(ndistinct(dof.dof_map()), 12);
  }

  #[test]
  fn prism_layout_is_onto() {
    let base = TriangleMesh::clone(&unit_square()).uniform_refine(1);
    let mesh = Rc::new(PrismMesh::extrude(&base, 2, 1.0));
    for p in 1..=4 {
      let dof = PrismDof::new(mesh.clone(), p).unwrap();
      let map = dof.dof_map();
      assert_eq!(map.ndofs(), dof.global_dof_count(), "p = {p}");
      assert_eq!(ndistinct(map), dof.global_dof_count(), "p = {p}");
      assert_eq!(dof.local_dof_count(), (p + 1) * (p + 1) * (p + 2) / 2);
    }
  }

  #[test]
  fn prism_linear_map_is_connectivity() {
    let base = TriangleMesh::clone(&unit_square());
    let mesh = Rc::new(PrismMesh::extrude(&base, 1, 1.0));
    let dof = PrismDof::new(mesh.clone(), 1).unwrap();
    let expected: Vec<Vec<DofIdx>> = mesh.cells().iter().map(|c| c.to_vec()).collect();
    assert_eq!(dof.cell_to_dof(), expected.as_slice());
  }

  #[test]
  fn prism_interpolation_points_are_distinct() {
    let base = TriangleMesh::clone(&unit_square());
    let mesh = Rc::new(PrismMesh::extrude(&base, 2, 1.0));
    let dof = PrismDof::new(mesh, 3).unwrap();
    let points = dof.interpolation_points();
    for i in 0..points.ncols() {
      for j in i + 1..points.ncols() {
        assert!((points.column(i) - points.column(j)).norm() > 1e-10);
      }
    }
  }
}
