//! Scaled monomial spaces on polygonal meshes.
//!
//! On every cell `K` with barycenter `x_K`, area `|K|` and size `h = sqrt(|K|)`
//! the basis consists of the monomials of `(x - x_K) / h` of degree at most
//! `p`, enumerated by [`MultiIndexMatrix::monomial`]. The scaling keeps the
//! local coefficients of comparable size for large and small cells.

use crate::{
  assemble::{self, GalMat, GalVec},
  dof::{DofIdx, DofLayout, ScaledMonomialDof},
  error::{FemError, FemResult},
  mesh::PolygonMesh,
  multi_index::{monomial_index, MultiIndexMatrix},
  quadrature::QuadRule,
  CellIdx, Point2,
};

use num_integer::binomial;
use std::rc::Rc;
use tracing::debug;

pub struct ScaledMonomialSpace2d {
  mesh: Rc<PolygonMesh>,
  dof: ScaledMonomialDof,
  barycenters: Vec<Point2>,
  areas: Vec<f64>,
  h: Vec<f64>,
  quad_degree: usize,
}

impl ScaledMonomialSpace2d {
  pub fn new(mesh: Rc<PolygonMesh>, degree: usize) -> Self {
    let barycenters = mesh.barycenters().to_vec();
    Self::build(mesh, degree, barycenters)
  }

  /// Expands around the given points instead of the cell barycenters.
  pub fn with_barycenters(
    mesh: Rc<PolygonMesh>,
    degree: usize,
    barycenters: Vec<Point2>,
  ) -> FemResult<Self> {
    if barycenters.len() != mesh.ncells() {
      return Err(FemError::LengthMismatch {
        expected: mesh.ncells(),
        found: barycenters.len(),
      });
    }
    Ok(Self::build(mesh, degree, barycenters))
  }

  fn build(mesh: Rc<PolygonMesh>, degree: usize, barycenters: Vec<Point2>) -> Self {
    let dof = ScaledMonomialDof::new(mesh.ncells(), degree);
    let areas = mesh.cell_measures().to_vec();
    let h = areas.iter().map(|a| a.sqrt()).collect();
    debug!(
      "scaled monomial space of degree {} with {} dofs",
      degree,
      dof.global_dof_count()
    );
    Self {
      mesh,
      dof,
      barycenters,
      areas,
      h,
      quad_degree: (degree + 3).max(2 * degree),
    }
  }

  /// Overrides the polynomial exactness of the cell quadrature.
  pub fn with_quad_degree(mut self, quad_degree: usize) -> Self {
    self.quad_degree = quad_degree;
    self
  }

  pub fn mesh(&self) -> &Rc<PolygonMesh> {
    &self.mesh
  }
  pub fn dof(&self) -> &ScaledMonomialDof {
    &self.dof
  }
  pub fn degree(&self) -> usize {
    self.dof.degree()
  }
  pub fn multi_index(&self) -> &MultiIndexMatrix {
    self.dof.multi_index()
  }
  pub fn number_of_local_dofs(&self) -> usize {
    self.dof.local_dof_count()
  }
  pub fn number_of_global_dofs(&self) -> usize {
    self.dof.global_dof_count()
  }
  pub fn cell_to_dof(&self) -> &[Vec<DofIdx>] {
    self.dof.cell_to_dof()
  }
  pub fn barycenter(&self, icell: CellIdx) -> Point2 {
    self.barycenters[icell]
  }
  pub fn cell_size(&self, icell: CellIdx) -> f64 {
    self.h[icell]
  }
  pub fn cell_measure(&self, icell: CellIdx) -> f64 {
    self.areas[icell]
  }
  pub fn function(&self) -> na::DVector<f64> {
    na::DVector::zeros(self.number_of_global_dofs())
  }

  /// Cell of every point. Without explicit cells point `i` belongs to cell `i`.
  fn resolve_cells(&self, npoints: usize, cells: Option<&[CellIdx]>) -> FemResult<Vec<CellIdx>> {
    let ncells = self.mesh.ncells();
    match cells {
      Some(cells) => {
        if cells.len() != npoints {
          return Err(FemError::ShapeMismatch {
            npoints,
            ncells: cells.len(),
          });
        }
        if let Some(&icell) = cells.iter().find(|&&c| c >= ncells) {
          return Err(FemError::CellOutOfRange { icell, ncells });
        }
        Ok(cells.to_vec())
      }
      None => {
        if npoints != ncells {
          return Err(FemError::ShapeMismatch { npoints, ncells });
        }
        Ok((0..ncells).collect())
      }
    }
  }

  fn scaled_coords(&self, x: &Point2, icell: CellIdx) -> Point2 {
    (x - self.barycenters[icell]) / self.h[icell]
  }

  fn local_block<'a>(&self, uh: &'a na::DVector<f64>, icell: CellIdx) -> na::DVectorView<'a, f64> {
    let ldof = self.number_of_local_dofs();
    uh.rows(icell * ldof, ldof)
  }

  /// All basis functions of `icell` at `x`.
  ///
  /// The degree `i` terms are the degree `i - 1` terms times `x^`, followed by
  /// the last one times `y^`.
  pub fn cell_basis(&self, x: &Point2, icell: CellIdx) -> na::DVector<f64> {
    let p = self.degree();
    let mut phi = na::DVector::zeros(self.number_of_local_dofs());
    phi[0] = 1.0;
    if p > 0 {
      let xh = self.scaled_coords(x, icell);
      phi[1] = xh.x;
      phi[2] = xh.y;
      for i in 2..=p {
        let start = i * (i + 1) / 2;
        for k in 0..i {
          phi[start + k] = phi[start - i + k] * xh.x;
        }
        phi[start + i] = phi[start - 1] * xh.y;
      }
    }
    phi
  }

  /// Gradients of all basis functions (`ldof x 2`).
  pub fn cell_grad_basis(&self, x: &Point2, icell: CellIdx) -> na::DMatrix<f64> {
    let phi = self.cell_basis(x, icell);
    let h = self.h[icell];
    let mi = self.multi_index();
    let mut grad = na::DMatrix::zeros(mi.nrows(), 2);
    for (k, alpha) in mi.iter().enumerate() {
      let (a, b) = (alpha[0], alpha[1]);
      if a > 0 {
        grad[(k, 0)] = a as f64 * phi[monomial_index(a - 1, b)] / h;
      }
      if b > 0 {
        grad[(k, 1)] = b as f64 * phi[monomial_index(a, b - 1)] / h;
      }
    }
    grad
  }

  /// Second derivatives `(xx, yy, xy)` of all basis functions (`ldof x 3`).
  pub fn cell_hessian_basis(&self, x: &Point2, icell: CellIdx) -> na::DMatrix<f64> {
    let phi = self.cell_basis(x, icell);
    let area = self.areas[icell];
    let mi = self.multi_index();
    let mut hessian = na::DMatrix::zeros(mi.nrows(), 3);
    for (k, alpha) in mi.iter().enumerate() {
      let (a, b) = (alpha[0], alpha[1]);
      if a > 1 {
        hessian[(k, 0)] = (a * (a - 1)) as f64 * phi[monomial_index(a - 2, b)] / area;
      }
      if b > 1 {
        hessian[(k, 1)] = (b * (b - 1)) as f64 * phi[monomial_index(a, b - 2)] / area;
      }
      if a > 0 && b > 0 {
        hessian[(k, 2)] = (a * b) as f64 * phi[monomial_index(a - 1, b - 1)] / area;
      }
    }
    hessian
  }

  pub fn cell_laplace_basis(&self, x: &Point2, icell: CellIdx) -> na::DVector<f64> {
    let hessian = self.cell_hessian_basis(x, icell);
    hessian.column(0) + hessian.column(1)
  }

  /// Basis values, one row per point.
  pub fn basis(&self, points: &[Point2], cells: Option<&[CellIdx]>) -> FemResult<na::DMatrix<f64>> {
    let cells = self.resolve_cells(points.len(), cells)?;
    let mut phi = na::DMatrix::zeros(points.len(), self.number_of_local_dofs());
    for (i, (x, &icell)) in points.iter().zip(&cells).enumerate() {
      phi.set_row(i, &self.cell_basis(x, icell).transpose());
    }
    Ok(phi)
  }

  /// Partial derivatives in `x` and `y`, each with one row per point.
  pub fn grad_basis(
    &self,
    points: &[Point2],
    cells: Option<&[CellIdx]>,
  ) -> FemResult<[na::DMatrix<f64>; 2]> {
    let cells = self.resolve_cells(points.len(), cells)?;
    let ldof = self.number_of_local_dofs();
    let mut grad = [
      na::DMatrix::zeros(points.len(), ldof),
      na::DMatrix::zeros(points.len(), ldof),
    ];
    for (i, (x, &icell)) in points.iter().zip(&cells).enumerate() {
      let g = self.cell_grad_basis(x, icell);
      for (d, comp) in grad.iter_mut().enumerate() {
        comp.set_row(i, &g.column(d).transpose());
      }
    }
    Ok(grad)
  }

  /// Second derivatives `xx`, `yy` and `xy`, each with one row per point.
  pub fn hessian_basis(
    &self,
    points: &[Point2],
    cells: Option<&[CellIdx]>,
  ) -> FemResult<[na::DMatrix<f64>; 3]> {
    let cells = self.resolve_cells(points.len(), cells)?;
    let ldof = self.number_of_local_dofs();
    let mut hessian = [
      na::DMatrix::zeros(points.len(), ldof),
      na::DMatrix::zeros(points.len(), ldof),
      na::DMatrix::zeros(points.len(), ldof),
    ];
    for (i, (x, &icell)) in points.iter().zip(&cells).enumerate() {
      let h = self.cell_hessian_basis(x, icell);
      for (d, comp) in hessian.iter_mut().enumerate() {
        comp.set_row(i, &h.column(d).transpose());
      }
    }
    Ok(hessian)
  }

  pub fn laplace_basis(
    &self,
    points: &[Point2],
    cells: Option<&[CellIdx]>,
  ) -> FemResult<na::DMatrix<f64>> {
    let [xx, yy, _] = self.hessian_basis(points, cells)?;
    Ok(xx + yy)
  }

  pub fn value(
    &self,
    uh: &na::DVector<f64>,
    points: &[Point2],
    cells: Option<&[CellIdx]>,
  ) -> FemResult<na::DVector<f64>> {
    self.check_coeffs(uh)?;
    let cells = self.resolve_cells(points.len(), cells)?;
    Ok(na::DVector::from_iterator(
      points.len(),
      points
        .iter()
        .zip(&cells)
        .map(|(x, &icell)| self.cell_basis(x, icell).dot(&self.local_block(uh, icell))),
    ))
  }

  pub fn grad_value(
    &self,
    uh: &na::DVector<f64>,
    points: &[Point2],
    cells: Option<&[CellIdx]>,
  ) -> FemResult<Vec<Point2>> {
    self.check_coeffs(uh)?;
    let cells = self.resolve_cells(points.len(), cells)?;
    Ok(
      points
        .iter()
        .zip(&cells)
        .map(|(x, &icell)| {
          let g = self.cell_grad_basis(x, icell).transpose() * self.local_block(uh, icell);
          Point2::new(g[0], g[1])
        })
        .collect(),
    )
  }

  pub fn laplace_value(
    &self,
    uh: &na::DVector<f64>,
    points: &[Point2],
    cells: Option<&[CellIdx]>,
  ) -> FemResult<na::DVector<f64>> {
    self.check_coeffs(uh)?;
    let cells = self.resolve_cells(points.len(), cells)?;
    Ok(na::DVector::from_iterator(
      points.len(),
      points
        .iter()
        .zip(&cells)
        .map(|(x, &icell)| self.cell_laplace_basis(x, icell).dot(&self.local_block(uh, icell))),
    ))
  }

  fn check_coeffs(&self, uh: &na::DVector<f64>) -> FemResult<()> {
    let expected = self.number_of_global_dofs();
    if uh.len() != expected {
      return Err(FemError::LengthMismatch {
        expected,
        found: uh.len(),
      });
    }
    Ok(())
  }

  /// Local Gram matrices `H_K = (m_i, m_j)_K` from boundary integrals.
  ///
  /// For monomials homogeneous in `x - x_K`, the divergence theorem gives
  /// `int_K m = 1/(deg m + 2) int_dK m (x - x_K).n`, and `(x - x_K).n` is
  /// constant on every straight edge.
  pub fn matrix_h(&self) -> Vec<na::DMatrix<f64>> {
    let ldof = self.number_of_local_dofs();
    let mut gram = vec![na::DMatrix::zeros(ldof, ldof); self.mesh.ncells()];
    let rule = QuadRule::gauss_legendre(self.degree() + 1);

    for (iedge, edge) in self.mesh.edges().iter().enumerate() {
      let [a, b] = edge.nodes.map(|inode| self.mesh.node(inode));
      let normal = self.mesh.edge_normal(iedge);
      for (bc, w) in rule.iter() {
        let x = bc[0] * a + bc[1] * b;

        let c0 = edge.left;
        let phi0 = self.cell_basis(&x, c0);
        let offset0 = (a - self.barycenters[c0]).dot(&normal);
        gram[c0] += (w * offset0) * &phi0 * phi0.transpose();

        if !edge.is_boundary() {
          let c1 = edge.right;
          let phi1 = self.cell_basis(&x, c1);
          let offset1 = -(a - self.barycenters[c1]).dot(&normal);
          gram[c1] += (w * offset1) * &phi1 * phi1.transpose();
        }
      }
    }

    let degrees: Vec<usize> = self.multi_index().iter().map(|r| r[0] + r[1]).collect();
    for h in &mut gram {
      for i in 0..ldof {
        for j in 0..ldof {
          h[(i, j)] /= (degrees[i] + degrees[j] + 2) as f64;
        }
      }
    }
    gram
  }

  /// Local cross Gram matrices `C_K = (m_i, n_j)_K` against the basis of `other`.
  pub fn matrix_c(&self, other: &ScaledMonomialSpace2d) -> FemResult<Vec<na::DMatrix<f64>>> {
    self.check_same_mesh(other)?;
    let rule = QuadRule::triangle(self.degree() + other.degree());
    let cross = (0..self.mesh.ncells())
      .map(|icell| {
        let mut c = na::DMatrix::zeros(self.number_of_local_dofs(), other.number_of_local_dofs());
        for (x, w) in self.mesh.cell_quadrature(icell, &rule) {
          let phi = self.cell_basis(&x, icell);
          let psi = other.cell_basis(&x, icell);
          c += w * &phi * psi.transpose();
        }
        c
      })
      .collect();
    Ok(cross)
  }

  /// L2 projection of `coeffs`, given in `other`, onto this space.
  ///
  /// Per cell `Pi = H^-1 C` is applied to the local coefficients.
  pub fn projection(
    &self,
    other: &ScaledMonomialSpace2d,
    coeffs: &na::DVector<f64>,
  ) -> FemResult<na::DVector<f64>> {
    other.check_coeffs(coeffs)?;
    let gram = self.matrix_h();
    let cross = self.matrix_c(other)?;

    let ldof = self.number_of_local_dofs();
    let mut projected = self.function();
    for (icell, (h, c)) in gram.into_iter().zip(cross).enumerate() {
      let h_inv = h.try_inverse().ok_or(FemError::SingularMatrix(icell))?;
      let local = h_inv * c * other.local_block(coeffs, icell);
      projected.rows_mut(icell * ldof, ldof).copy_from(&local);
    }
    Ok(projected)
  }

  /// Transfers `uh` from `source` onto this space along `(target, source)` cell pairs.
  ///
  /// The source polynomial is re-expanded around the target barycenter with
  /// the target scale. Targets with several sources get the average, targets
  /// without a source stay zero.
  pub fn interpolation(
    &self,
    source: &ScaledMonomialSpace2d,
    uh: &na::DVector<f64>,
    mapping: &[(CellIdx, CellIdx)],
  ) -> FemResult<na::DVector<f64>> {
    if source.degree() != self.degree() {
      return Err(FemError::DegreeMismatch {
        from: source.degree(),
        to: self.degree(),
      });
    }
    source.check_coeffs(uh)?;
    let ncells = self.mesh.ncells();
    let ncells_source = source.mesh.ncells();

    let ldof = self.number_of_local_dofs();
    let mi = self.multi_index();
    let mut transferred = self.function();
    let mut counts = vec![0usize; ncells];
    for &(itarget, isource) in mapping {
      if itarget >= ncells {
        return Err(FemError::CellOutOfRange { icell: itarget, ncells });
      }
      if isource >= ncells_source {
        return Err(FemError::CellOutOfRange {
          icell: isource,
          ncells: ncells_source,
        });
      }

      // (x - x_s)/h_s = r y + d with y = (x - x_t)/h_t
      let hs = source.h[isource];
      let r = self.h[itarget] / hs;
      let d = (self.barycenters[itarget] - source.barycenters[isource]) / hs;

      let coeffs = source.local_block(uh, isource);
      let mut local = na::DVector::zeros(ldof);
      for (k, alpha) in mi.iter().enumerate() {
        let (a, b) = (alpha[0], alpha[1]);
        let c = coeffs[k];
        if c == 0.0 {
          continue;
        }
        for i in 0..=a {
          let fx = binomial(a, i) as f64 * d.x.powi((a - i) as i32);
          for j in 0..=b {
            let fy = binomial(b, j) as f64 * d.y.powi((b - j) as i32);
            local[monomial_index(i, j)] += c * fx * fy * r.powi((i + j) as i32);
          }
        }
      }

      let mut block = transferred.rows_mut(itarget * ldof, ldof);
      block += local;
      counts[itarget] += 1;
    }

    for (icell, &count) in counts.iter().enumerate() {
      if count > 1 {
        let mut block = transferred.rows_mut(icell * ldof, ldof);
        block /= count as f64;
      }
    }
    Ok(transferred)
  }

  fn check_same_mesh(&self, other: &ScaledMonomialSpace2d) -> FemResult<()> {
    if !Rc::ptr_eq(&self.mesh, &other.mesh) {
      return Err(FemError::MeshMismatch);
    }
    Ok(())
  }

  fn cell_rule(&self) -> QuadRule {
    QuadRule::triangle(self.quad_degree)
  }

  pub fn mass_matrix(&self) -> FemResult<GalMat> {
    let rule = self.cell_rule();
    let ldof = self.number_of_local_dofs();
    let elmat = |icell: CellIdx| -> FemResult<na::DMatrix<f64>> {
      let mut elmat = na::DMatrix::zeros(ldof, ldof);
      for (x, w) in self.mesh.cell_quadrature(icell, &rule) {
        let phi = self.cell_basis(&x, icell);
        elmat += w * &phi * phi.transpose();
      }
      Ok(elmat)
    };
    let dofs = self.dof.dof_map();
    assemble::assemble_galmat(dofs, dofs, elmat)
  }

  pub fn stiffness_matrix(&self) -> FemResult<GalMat> {
    let rule = self.cell_rule();
    let ldof = self.number_of_local_dofs();
    let elmat = |icell: CellIdx| -> FemResult<na::DMatrix<f64>> {
      let mut elmat = na::DMatrix::zeros(ldof, ldof);
      for (x, w) in self.mesh.cell_quadrature(icell, &rule) {
        let grad = self.cell_grad_basis(&x, icell);
        elmat += w * &grad * grad.transpose();
      }
      Ok(elmat)
    };
    let dofs = self.dof.dof_map();
    assemble::assemble_galmat(dofs, dofs, elmat)
  }

  pub fn source_vector<F>(&self, f: F) -> FemResult<GalVec>
  where
    F: Fn(&Point2) -> f64,
  {
    let rule = self.cell_rule();
    let ldof = self.number_of_local_dofs();
    let elvec = |icell: CellIdx| -> FemResult<na::DVector<f64>> {
      let mut elvec = na::DVector::zeros(ldof);
      for (x, w) in self.mesh.cell_quadrature(icell, &rule) {
        elvec += (w * f(&x)) * self.cell_basis(&x, icell);
      }
      Ok(elvec)
    };
    assemble::assemble_galvec(self.dof.dof_map(), elvec)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  use approx::assert_relative_eq;

  fn hexagon_and_square() -> Rc<PolygonMesh> {
    Rc::new(PolygonMesh::from_rows(
      &[
        [0.0, 0.0],
        [1.0, 0.0],
        [1.5, 0.6],
        [1.0, 1.2],
        [0.0, 1.2],
        [-0.4, 0.6],
        [2.5, 0.6],
        [2.5, 1.2],
      ],
      vec![vec![0, 1, 2, 3, 4, 5], vec![2, 6, 7, 3]],
    ))
  }

  #[test]
  fn basis_is_scaled_monomial() {
    let space = ScaledMonomialSpace2d::new(hexagon_and_square(), 3);
    let x = Point2::new(0.3, 0.7);
    let phi = space.cell_basis(&x, 0);
    let xh = (x - space.barycenter(0)) / space.cell_size(0);
    for (k, alpha) in space.multi_index().iter().enumerate() {
      let expected = xh.x.powi(alpha[0] as i32) * xh.y.powi(alpha[1] as i32);
      assert_relative_eq!(phi[k], expected, epsilon = 1e-14);
    }
  }

  #[test]
  fn constant_mass_is_area() {
    let mesh = Rc::new(PolygonMesh::from_rows(
      &[[0.0, 0.0], [2.0, 0.0], [0.0, 1.0]],
      vec![vec![0, 1, 2]],
    ));
    let space = ScaledMonomialSpace2d::new(mesh, 0);
    let mass = na::DMatrix::from(&space.mass_matrix().unwrap());
    assert_eq!(mass.shape(), (1, 1));
    assert_relative_eq!(mass[(0, 0)], 1.0, epsilon = 1e-14);
  }

  #[test]
  fn boundary_gram_matches_cell_quadrature() {
    for p in 0..=4 {
      let space = ScaledMonomialSpace2d::new(hexagon_and_square(), p);
      let gram = space.matrix_h();
      let cross = space.matrix_c(&space).unwrap();
      for (h, c) in gram.iter().zip(&cross) {
        assert_relative_eq!(*h, *c, epsilon = 1e-12);
      }
    }
  }

  #[test]
  fn shape_mismatch_is_reported() {
    let space = ScaledMonomialSpace2d::new(hexagon_and_square(), 1);
    let points = [Point2::new(0.0, 0.0); 3];
    assert_eq!(
      space.basis(&points, None).unwrap_err(),
      FemError::ShapeMismatch {
        npoints: 3,
        ncells: 2
      }
    );
    assert_eq!(
      space.basis(&points, Some(&[0, 1])).unwrap_err(),
      FemError::ShapeMismatch {
        npoints: 3,
        ncells: 2
      }
    );
    assert_eq!(
      space.basis(&points, Some(&[0, 1, 2])).unwrap_err(),
      FemError::CellOutOfRange { icell: 2, ncells: 2 }
    );
  }
}
