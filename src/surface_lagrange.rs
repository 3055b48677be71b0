//! Lagrange finite elements on a higher order surface mesh.

use crate::{
  assemble::{self, GalMat, GalVec},
  dof::{DiscontinuousLagrangeDof, DofLayout, LagrangeDof, NodalDofLayout, TriangleDof},
  error::{FemError, FemResult},
  lagrange::{lagrange_basis, lagrange_basis_ref_grad, local_coeffs},
  linalg::DMatrixExt as _,
  mesh::TriangleMesh,
  quadrature::QuadRule,
  surface::{ImplicitSurface, Point3},
  surface_mesh::{tangent_cross, SurfaceTriangleMesh},
  CellIdx,
};

use std::{rc::Rc, str::FromStr};
use tracing::{debug, warn};

/// Metric condition numbers above this are reported.
const METRIC_CONDITION_WARN: f64 = 1e8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpaceType {
  #[default]
  Continuous,
  Discontinuous,
}

impl FromStr for SpaceType {
  type Err = FemError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "C" => Ok(Self::Continuous),
      "D" => Ok(Self::Discontinuous),
      _ => Err(FemError::UnknownSpaceType(s.to_string())),
    }
  }
}

/// Construction parameters of a [`SurfaceLagrangeSpace`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSpaceOptions {
  /// Degree of the surface parametrization, defaults to the space degree.
  pub p0: Option<usize>,
  /// Exactness of the cell quadrature, defaults to `2 p + 2`.
  pub quad_degree: Option<usize>,
  pub space_type: SpaceType,
  pub scale: Option<f64>,
}
impl Default for SurfaceSpaceOptions {
  fn default() -> Self {
    Self {
      p0: None,
      quad_degree: None,
      space_type: SpaceType::Continuous,
      scale: None,
    }
  }
}

pub struct SurfaceLagrangeSpace<S> {
  mesh: SurfaceTriangleMesh<S>,
  dof: TriangleDof,
  quad: QuadRule,
}

impl<S: ImplicitSurface> SurfaceLagrangeSpace<S> {
  pub fn new(
    mesh: Rc<TriangleMesh>,
    surface: S,
    degree: usize,
    options: SurfaceSpaceOptions,
  ) -> FemResult<Self> {
    let p0 = options.p0.unwrap_or(degree);
    let smesh = SurfaceTriangleMesh::new(mesh.clone(), surface, p0, options.scale)?;

    let dof = match options.space_type {
      SpaceType::Continuous if p0 == degree => smesh.space().dof().clone(),
      SpaceType::Continuous => TriangleDof::Continuous(LagrangeDof::new(mesh, degree)?),
      SpaceType::Discontinuous => {
        TriangleDof::Discontinuous(DiscontinuousLagrangeDof::new(mesh, degree))
      }
    };
    let quad = QuadRule::triangle(options.quad_degree.unwrap_or(2 * degree + 2));
    debug!(
      "surface Lagrange space of degree {} on a degree {} surface with {} dofs",
      degree,
      p0,
      dof.global_dof_count()
    );

    Ok(Self {
      mesh: smesh,
      dof,
      quad,
    })
  }

  pub fn mesh(&self) -> &SurfaceTriangleMesh<S> {
    &self.mesh
  }
  pub fn dof(&self) -> &TriangleDof {
    &self.dof
  }
  pub fn degree(&self) -> usize {
    self.dof.degree()
  }
  pub fn number_of_local_dofs(&self) -> usize {
    self.dof.local_dof_count()
  }
  pub fn number_of_global_dofs(&self) -> usize {
    self.dof.global_dof_count()
  }
  pub fn cell_to_dof(&self) -> &[Vec<usize>] {
    self.dof.cell_to_dof()
  }
  pub fn function(&self) -> na::DVector<f64> {
    na::DVector::zeros(self.number_of_global_dofs())
  }

  pub fn basis(&self, bc: na::DVectorView<f64>) -> na::DVector<f64> {
    lagrange_basis(self.dof.multi_index(), bc)
  }

  /// Gradients on the discrete surface (`ldof x 3`), `grad_ref Gp^-1 Jp`.
  pub fn grad_basis(&self, bc: na::DVectorView<f64>, icell: CellIdx) -> FemResult<na::DMatrix<f64>> {
    self.grad_basis_with_cond(bc, icell).map(|(grad, _)| grad)
  }

  /// Like [`Self::grad_basis`], also returning the condition number of the
  /// metric `Gp = Jp Jp^T`.
  pub fn grad_basis_with_cond(
    &self,
    bc: na::DVectorView<f64>,
    icell: CellIdx,
  ) -> FemResult<(na::DMatrix<f64>, f64)> {
    let (jacobi, _) = self.mesh.jacobi_matrix(bc, icell);
    let metric = jacobi.gramian();
    let cond = metric.condition_number();
    if cond > METRIC_CONDITION_WARN {
      warn!("metric of cell {} is badly conditioned ({:e})", icell, cond);
    }
    let metric_inv = metric
      .try_inverse()
      .ok_or(FemError::SingularMatrix(icell))?;
    let grad = lagrange_basis_ref_grad(self.dof.multi_index(), bc) * metric_inv * jacobi;
    Ok((grad, cond))
  }

  /// Gradients tangential to the exact surface, with the surface point and the
  /// unnormalized surface normal.
  pub fn grad_basis_on_surface(
    &self,
    bc: na::DVectorView<f64>,
    icell: CellIdx,
  ) -> FemResult<(na::DMatrix<f64>, Point3, na::Vector3<f64>)> {
    let (js, _, ps) = self.mesh.surface_jacobi_matrix(bc, icell);
    let metric_inv = js
      .gramian()
      .try_inverse()
      .ok_or(FemError::SingularMatrix(icell))?;
    let normal = tangent_cross(&js);
    let grad = lagrange_basis_ref_grad(self.dof.multi_index(), bc) * metric_inv * js;
    Ok((grad, ps, normal))
  }

  fn local(&self, uh: &na::DVector<f64>, icell: CellIdx) -> na::DVector<f64> {
    local_coeffs(uh, self.dof.dof_map().local2global(icell))
  }

  pub fn value(&self, uh: &na::DVector<f64>, bc: na::DVectorView<f64>, icell: CellIdx) -> f64 {
    self.basis(bc).dot(&self.local(uh, icell))
  }

  pub fn grad_value(
    &self,
    uh: &na::DVector<f64>,
    bc: na::DVectorView<f64>,
    icell: CellIdx,
  ) -> FemResult<na::Vector3<f64>> {
    let grad = self.grad_basis(bc, icell)?;
    let g = grad.transpose() * self.local(uh, icell);
    Ok(na::Vector3::new(g[0], g[1], g[2]))
  }

  pub fn grad_value_on_surface(
    &self,
    uh: &na::DVector<f64>,
    bc: na::DVectorView<f64>,
    icell: CellIdx,
  ) -> FemResult<(na::Vector3<f64>, Point3, na::Vector3<f64>)> {
    let (grad, ps, normal) = self.grad_basis_on_surface(bc, icell)?;
    let g = grad.transpose() * self.local(uh, icell);
    Ok((na::Vector3::new(g[0], g[1], g[2]), ps, normal))
  }

  /// Surface points of all DOFs, one column per DOF.
  pub fn interpolation_points(&self) -> na::DMatrix<f64> {
    let map = self.dof.dof_map();
    let mi = self.dof.multi_index();
    let mut points = na::DMatrix::zeros(3, map.ndofs());
    for (idof, rep) in map.representatives().iter().enumerate() {
      if let Some(rep) = rep {
        let bc = mi.convex_weights(rep.ilocal);
        let p = self.mesh.bc_to_point(bc.as_view(), rep.icell);
        points.set_column(idof, &p);
      }
    }
    points
  }

  pub fn interpolation<F>(&self, mut f: F) -> na::DVector<f64>
  where
    F: FnMut(&Point3) -> f64,
  {
    let points = self.interpolation_points();
    na::DVector::from_iterator(
      points.ncols(),
      points
        .column_iter()
        .map(|x| f(&Point3::new(x[0], x[1], x[2]))),
    )
  }

  /// Quadrature weight times surface area element.
  fn measure(&self, bc: na::DVectorView<f64>, w: f64, icell: CellIdx) -> f64 {
    w * self.mesh.area_element(bc, icell) / 2.0
  }

  pub fn mass_matrix(&self) -> FemResult<GalMat> {
    let ldof = self.number_of_local_dofs();
    let elmat = |icell: CellIdx| -> FemResult<na::DMatrix<f64>> {
      let mut elmat = na::DMatrix::zeros(ldof, ldof);
      for (bc, w) in self.quad.iter() {
        let phi = self.basis(bc);
        elmat += self.measure(bc, w, icell) * &phi * phi.transpose();
      }
      Ok(elmat)
    };
    let dofs = self.dof.dof_map();
    assemble::assemble_galmat(dofs, dofs, elmat)
  }

  pub fn stiffness_matrix(&self) -> FemResult<GalMat> {
    let ldof = self.number_of_local_dofs();
    let elmat = |icell: CellIdx| -> FemResult<na::DMatrix<f64>> {
      let mut elmat = na::DMatrix::zeros(ldof, ldof);
      for (bc, w) in self.quad.iter() {
        let grad = self.grad_basis(bc, icell)?;
        elmat += self.measure(bc, w, icell) * &grad * grad.transpose();
      }
      Ok(elmat)
    };
    let dofs = self.dof.dof_map();
    assemble::assemble_galmat(dofs, dofs, elmat)
  }

  /// Load vector of `f` evaluated on the exact surface.
  pub fn source_vector<F>(&self, f: F) -> FemResult<GalVec>
  where
    F: Fn(&Point3) -> f64,
  {
    let ldof = self.number_of_local_dofs();
    let elvec = |icell: CellIdx| -> FemResult<na::DVector<f64>> {
      let mut elvec = na::DVector::zeros(ldof);
      for (bc, w) in self.quad.iter() {
        let x = self.mesh.bc_to_point(bc, icell);
        elvec += (self.measure(bc, w, icell) * f(&x)) * self.basis(bc);
      }
      Ok(elvec)
    };
    assemble::assemble_galvec(self.dof.dof_map(), elvec)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::surface::SphereSurface;

  use approx::assert_relative_eq;

  fn sphere_space(p: usize, options: SurfaceSpaceOptions) -> SurfaceLagrangeSpace<SphereSurface> {
    let sphere = SphereSurface::default();
    let mesh = Rc::new(sphere.init_mesh(1));
    SurfaceLagrangeSpace::new(mesh, sphere, p, options).unwrap()
  }

  #[test]
  fn space_type_parsing() {
    assert_eq!("C".parse::<SpaceType>(), Ok(SpaceType::Continuous));
    assert_eq!("D".parse::<SpaceType>(), Ok(SpaceType::Discontinuous));
    assert_eq!(
      "X".parse::<SpaceType>(),
      Err(FemError::UnknownSpaceType("X".to_string()))
    );
  }

  #[test]
  fn dof_counts() {
    let mesh = SphereSurface::default().init_mesh(1);
    let (nn, ne, nc) = (mesh.nnodes(), mesh.nedges(), mesh.ncells());

    let space = sphere_space(2, SurfaceSpaceOptions::default());
    assert_eq!(space.number_of_global_dofs(), nn + ne);

    let options = SurfaceSpaceOptions {
      p0: Some(1),
      ..Default::default()
    };
    let space = sphere_space(3, options);
    assert_eq!(space.number_of_global_dofs(), nn + 2 * ne + nc);

    let options = SurfaceSpaceOptions {
      space_type: SpaceType::Discontinuous,
      ..Default::default()
    };
    let space = sphere_space(1, options);
    assert_eq!(space.number_of_global_dofs(), 3 * nc);
  }

  #[test]
  fn gradients_are_tangential() {
    let space = sphere_space(2, SurfaceSpaceOptions::default());
    let bc = na::dvector![0.2, 0.5, 0.3];
    for icell in [0, 11, 63] {
      let (jacobi, _) = space.mesh().jacobi_matrix(bc.as_view(), icell);
      let normal = tangent_cross(&jacobi);
      let (grad, cond) = space.grad_basis_with_cond(bc.as_view(), icell).unwrap();
      assert!(cond < 10.0);
      for row in grad.row_iter() {
        let g = na::Vector3::new(row[0], row[1], row[2]);
        assert!(g.dot(&normal).abs() < 1e-12);
      }
      // gradients of a partition of unity sum to zero
      let sum = grad.row_sum();
      assert!(sum.norm() < 1e-12);

      let (grad, ps, n) = space.grad_basis_on_surface(bc.as_view(), icell).unwrap();
      let n = n.normalize();
      assert_relative_eq!(n.dot(&ps).abs(), 1.0, epsilon = 1e-10);
      for row in grad.row_iter() {
        let g = na::Vector3::new(row[0], row[1], row[2]);
        assert!(g.dot(&ps).abs() < 1e-10);
      }
    }
  }

  #[test]
  fn linear_function_gradient() {
    // the surface gradient of u = z on the unit sphere is e_z - z n
    let sphere = SphereSurface::default();
    let mesh = Rc::new(sphere.init_mesh(2));
    let space = SurfaceLagrangeSpace::new(mesh, sphere, 2, Default::default()).unwrap();
    let uh = space.interpolation(|p| p.z);
    let bc = na::dvector![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
    let (g, ps, _) = space.grad_value_on_surface(&uh, bc.as_view(), 5).unwrap();
    let exact = na::Vector3::z() - ps.z * ps;
    assert_relative_eq!(g, exact, epsilon = 5e-2);
    assert_relative_eq!(space.value(&uh, bc.as_view(), 5), ps.z, epsilon = 1e-2);
  }

  #[test]
  fn scaled_surface_gradient() {
    // on the sphere of radius 3 the surface gradient of u = z is e_z - z x / 9
    let sphere = SphereSurface::default();
    let unit = SurfaceLagrangeSpace::new(Rc::new(sphere.init_mesh(2)), sphere, 2, Default::default())
      .unwrap();
    let options = SurfaceSpaceOptions {
      scale: Some(3.0),
      ..Default::default()
    };
    let mesh = Rc::new(sphere.init_mesh(2).map_nodes(|x| 3.0 * x));
    let scaled = SurfaceLagrangeSpace::new(mesh, sphere, 2, options).unwrap();

    let uh_unit = unit.interpolation(|p| p.z);
    let uh = scaled.interpolation(|p| p.z);
    let bc = na::dvector![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
    for icell in [5, 40, 200] {
      let (g, ps, _) = scaled.grad_value_on_surface(&uh, bc.as_view(), icell).unwrap();
      assert_relative_eq!(ps.norm(), 3.0, epsilon = 1e-12);
      let exact = na::Vector3::z() - (ps.z / 9.0) * ps;
      assert_relative_eq!(g, exact, epsilon = 5e-2);
      assert!(g.dot(&ps).abs() < 1e-10);

      // u = z scales like x, so its gradient is invariant under scaling
      let (g_unit, _, _) = unit.grad_value_on_surface(&uh_unit, bc.as_view(), icell).unwrap();
      assert_relative_eq!(g, g_unit, epsilon = 1e-10);
    }
  }

  #[test]
  fn mass_matrix_integrates_area() {
    let space = sphere_space(2, SurfaceSpaceOptions::default());
    let mass = na::DMatrix::from(&space.mass_matrix().unwrap());
    let ones = na::DVector::from_element(space.number_of_global_dofs(), 1.0);
    let area = ones.dot(&(&mass * &ones));
    let cell_area: f64 = space.mesh().area(Some(QuadRule::triangle(6))).iter().sum();
    assert_relative_eq!(area, cell_area, epsilon = 1e-10);
    assert_relative_eq!(area, 4.0 * std::f64::consts::PI, epsilon = 5e-2);

    let source = space.source_vector(|_| 1.0).unwrap();
    assert_relative_eq!(source.sum(), area, epsilon = 1e-10);

    let stiffness = na::DMatrix::from(&space.stiffness_matrix().unwrap());
    assert!((&stiffness * &ones).norm() < 1e-10);
  }
}
