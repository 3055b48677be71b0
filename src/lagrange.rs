//! Lagrange bases in barycentric coordinates and the Lagrange space on flat
//! triangle meshes.
//!
//! The basis function of the multi-index `a` is
//! `phi_a = prod_t A_{a_t}(l_t)` with `A_0 = 1` and
//! `A_k(l) = prod_{s < k} (p l - s) / k!`.

use crate::{
  assemble::{self, GalMat, GalVec},
  dof::{DiscontinuousLagrangeDof, DofLayout, LagrangeDof, NodalDofLayout, TriangleDof},
  error::{FemError, FemResult},
  mesh::{triangle::ref_difbarys, TriangleMesh},
  multi_index::MultiIndexMatrix,
  quadrature::QuadRule,
  CellIdx,
};

use std::rc::Rc;
use tracing::debug;

/// Values and derivatives of `A_0..=A_p` at `l`.
fn lagrange_factors(p: usize, l: f64) -> (Vec<f64>, Vec<f64>) {
  let pl = p as f64 * l;
  let mut values = vec![1.0; p + 1];
  let mut derivs = vec![0.0; p + 1];
  for k in 1..=p {
    let kf = k as f64;
    let shift = pl - (k - 1) as f64;
    values[k] = values[k - 1] * shift / kf;
    derivs[k] = (derivs[k - 1] * shift + values[k - 1] * p as f64) / kf;
  }
  (values, derivs)
}

/// Basis values at the barycentric point `bc`, one per multi-index row.
pub fn lagrange_basis(mi: &MultiIndexMatrix, bc: na::DVectorView<f64>) -> na::DVector<f64> {
  let p = mi.degree();
  let factors: Vec<_> = bc.iter().map(|&l| lagrange_factors(p, l).0).collect();
  na::DVector::from_iterator(
    mi.nrows(),
    mi.iter().map(|alpha| {
      alpha
        .iter()
        .enumerate()
        .map(|(t, &a)| factors[t][a])
        .product::<f64>()
    }),
  )
}

/// Derivatives w.r.t. the barycentric coordinates (`ldof x nbarys`).
pub fn lagrange_basis_dbary(mi: &MultiIndexMatrix, bc: na::DVectorView<f64>) -> na::DMatrix<f64> {
  let p = mi.degree();
  let factors: Vec<_> = bc.iter().map(|&l| lagrange_factors(p, l)).collect();
  let nbarys = bc.len();
  let mut dphi = na::DMatrix::zeros(mi.nrows(), nbarys);
  for (i, alpha) in mi.iter().enumerate() {
    for t in 0..nbarys {
      dphi[(i, t)] = (0..nbarys)
        .map(|s| {
          let (values, derivs) = &factors[s];
          if s == t {
            derivs[alpha[s]]
          } else {
            values[alpha[s]]
          }
        })
        .product::<f64>();
    }
  }
  dphi
}

/// Derivatives w.r.t. the two reference coordinates of the triangle (`ldof x 2`).
pub fn lagrange_basis_ref_grad(mi: &MultiIndexMatrix, bc: na::DVectorView<f64>) -> na::DMatrix<f64> {
  lagrange_basis_dbary(mi, bc) * ref_difbarys().transpose()
}

/// Tensor product Lagrange basis on a prism.
///
/// `bc_tri` are barycentric coordinates in the base triangle and `bc_edge` in
/// the layer direction. Local index `l = i * ldof2 + k` as in
/// [`MultiIndexMatrix::prism`].
pub fn prism_basis(
  p: usize,
  bc_tri: na::DVectorView<f64>,
  bc_edge: na::DVectorView<f64>,
) -> na::DVector<f64> {
  let phi_tri = lagrange_basis(&MultiIndexMatrix::triangle(p), bc_tri);
  let phi_edge = lagrange_basis(&MultiIndexMatrix::edge(p), bc_edge);
  phi_edge.kronecker(&phi_tri)
}

/// A Lagrange finite element space on a flat triangle mesh.
pub struct LagrangeSpace {
  mesh: Rc<TriangleMesh>,
  dof: TriangleDof,
}

impl LagrangeSpace {
  pub fn new(mesh: Rc<TriangleMesh>, degree: usize) -> FemResult<Self> {
    let dof = TriangleDof::Continuous(LagrangeDof::new(mesh.clone(), degree)?);
    debug!(
      "continuous Lagrange space of degree {} with {} dofs",
      degree,
      dof.global_dof_count()
    );
    Ok(Self { mesh, dof })
  }

  pub fn new_discontinuous(mesh: Rc<TriangleMesh>, degree: usize) -> Self {
    let dof = TriangleDof::Discontinuous(DiscontinuousLagrangeDof::new(mesh.clone(), degree));
    Self { mesh, dof }
  }

  pub fn mesh(&self) -> &Rc<TriangleMesh> {
    &self.mesh
  }
  pub fn dof(&self) -> &TriangleDof {
    &self.dof
  }
  pub fn degree(&self) -> usize {
    self.dof.degree()
  }
  pub fn ndofs(&self) -> usize {
    self.dof.global_dof_count()
  }

  pub fn basis(&self, bc: na::DVectorView<f64>) -> na::DVector<f64> {
    lagrange_basis(self.dof.multi_index(), bc)
  }

  pub fn ref_grad_basis(&self, bc: na::DVectorView<f64>) -> na::DMatrix<f64> {
    lagrange_basis_ref_grad(self.dof.multi_index(), bc)
  }

  /// Physical gradients (`ldof x dim`).
  pub fn grad_basis(&self, bc: na::DVectorView<f64>, icell: CellIdx) -> FemResult<na::DMatrix<f64>> {
    let grad_lambda = self
      .mesh
      .grad_lambda(icell)
      .ok_or(FemError::SingularMatrix(icell))?;
    Ok(lagrange_basis_dbary(self.dof.multi_index(), bc) * grad_lambda.transpose())
  }

  pub fn interpolation_points(&self) -> na::DMatrix<f64> {
    self.dof.interpolation_points()
  }

  pub fn interpolation<F>(&self, f: F) -> na::DVector<f64>
  where
    F: FnMut(na::DVectorView<f64>) -> f64,
  {
    let points = self.interpolation_points();
    na::DVector::from_iterator(points.ncols(), points.column_iter().map(f))
  }

  pub fn function(&self) -> na::DVector<f64> {
    na::DVector::zeros(self.ndofs())
  }

  pub fn value(&self, uh: &na::DVector<f64>, bc: na::DVectorView<f64>, icell: CellIdx) -> f64 {
    let phi = self.basis(bc);
    self
      .dof
      .dof_map()
      .local2global(icell)
      .iter()
      .zip(phi.iter())
      .map(|(&idof, &phi)| uh[idof] * phi)
      .sum()
  }

  pub fn grad_value(
    &self,
    uh: &na::DVector<f64>,
    bc: na::DVectorView<f64>,
    icell: CellIdx,
  ) -> FemResult<na::DVector<f64>> {
    let grad = self.grad_basis(bc, icell)?;
    let coeffs = local_coeffs(uh, self.dof.dof_map().local2global(icell));
    Ok(grad.transpose() * coeffs)
  }

  fn default_quad(&self) -> QuadRule {
    QuadRule::triangle(2 * self.degree())
  }

  pub fn mass_matrix(&self, quad: Option<QuadRule>) -> FemResult<GalMat> {
    let quad = quad.unwrap_or_else(|| self.default_quad());
    let ldof = self.dof.local_dof_count();
    let elmat = |icell: CellIdx| -> FemResult<na::DMatrix<f64>> {
      let measure = self.mesh.cell_measure(icell);
      let mut elmat = na::DMatrix::zeros(ldof, ldof);
      for (bc, w) in quad.iter() {
        let phi = self.basis(bc);
        elmat += (w * measure) * &phi * phi.transpose();
      }
      Ok(elmat)
    };
    assemble::assemble_galmat(self.dof.dof_map(), self.dof.dof_map(), elmat)
  }

  pub fn stiffness_matrix(&self, quad: Option<QuadRule>) -> FemResult<GalMat> {
    let quad = quad.unwrap_or_else(|| self.default_quad());
    let ldof = self.dof.local_dof_count();
    let elmat = |icell: CellIdx| -> FemResult<na::DMatrix<f64>> {
      let measure = self.mesh.cell_measure(icell);
      let mut elmat = na::DMatrix::zeros(ldof, ldof);
      for (bc, w) in quad.iter() {
        let grad = self.grad_basis(bc, icell)?;
        elmat += (w * measure) * &grad * grad.transpose();
      }
      Ok(elmat)
    };
    assemble::assemble_galmat(self.dof.dof_map(), self.dof.dof_map(), elmat)
  }

  pub fn source_vector<F>(&self, f: F, quad: Option<QuadRule>) -> FemResult<GalVec>
  where
    F: Fn(na::DVectorView<f64>) -> f64,
  {
    let quad = quad.unwrap_or_else(|| QuadRule::triangle(self.degree() + 3));
    let ldof = self.dof.local_dof_count();
    let elvec = |icell: CellIdx| -> FemResult<na::DVector<f64>> {
      let measure = self.mesh.cell_measure(icell);
      let mut elvec = na::DVector::zeros(ldof);
      for (bc, w) in quad.iter() {
        let x = self.mesh.bc_to_point(icell, bc);
        elvec += (w * measure * f(x.as_view())) * self.basis(bc);
      }
      Ok(elvec)
    };
    assemble::assemble_galvec(self.dof.dof_map(), elvec)
  }
}

pub(crate) fn local_coeffs(uh: &na::DVector<f64>, dofs: &[usize]) -> na::DVector<f64> {
  na::DVector::from_iterator(dofs.len(), dofs.iter().map(|&idof| uh[idof]))
}
