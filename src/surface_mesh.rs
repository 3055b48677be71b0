//! Higher order approximation of an implicit surface by a triangle mesh.
//!
//! The flat mesh carries a degree `p0` Lagrange space. Its interpolation points
//! are projected onto the surface, which gives a piecewise polynomial
//! parametrization of the surface over the reference triangle.

use crate::{
  dof::DofLayout,
  error::{FemError, FemResult},
  lagrange::LagrangeSpace,
  mesh::TriangleMesh,
  quadrature::QuadRule,
  surface::{ImplicitSurface, Point3},
  CellIdx, Dim,
};

use std::rc::Rc;
use tracing::debug;

pub struct SurfaceTriangleMesh<S> {
  mesh: Rc<TriangleMesh>,
  surface: S,
  space: LagrangeSpace,
  /// Projected interpolation points, one column per DOF of `space`.
  nodes: na::DMatrix<f64>,
  scale: Option<f64>,
}

impl<S: ImplicitSurface> SurfaceTriangleMesh<S> {
  /// Projects the degree `p0` interpolation points of `mesh` onto `surface`.
  ///
  /// With a `scale` the points are shrunk by it before and stretched after
  /// the projection, i.e. the surface is scaled by `scale`.
  pub fn new(
    mesh: Rc<TriangleMesh>,
    surface: S,
    p0: usize,
    scale: Option<f64>,
  ) -> FemResult<Self> {
    if mesh.dim_embedded() != 3 {
      return Err(FemError::EmbeddingMismatch {
        expected: 3,
        found: mesh.dim_embedded(),
      });
    }
    let space = LagrangeSpace::new(mesh.clone(), p0)?;

    let factor = scale.unwrap_or(1.0);
    let mut nodes = space.interpolation_points();
    for mut column in nodes.column_iter_mut() {
      let p = Point3::new(column[0], column[1], column[2]) / factor;
      let projected = surface.project(&p).point * factor;
      column.copy_from(&projected);
    }
    debug!(
      "surface mesh of degree {} with {} nodes",
      p0,
      nodes.ncols()
    );

    Ok(Self {
      mesh,
      surface,
      space,
      nodes,
      scale,
    })
  }

  pub fn mesh(&self) -> &Rc<TriangleMesh> {
    &self.mesh
  }
  pub fn surface(&self) -> &S {
    &self.surface
  }
  pub fn space(&self) -> &LagrangeSpace {
    &self.space
  }
  pub fn degree(&self) -> usize {
    self.space.degree()
  }
  pub fn nodes(&self) -> &na::DMatrix<f64> {
    &self.nodes
  }
  pub fn scale(&self) -> Option<f64> {
    self.scale
  }

  pub fn nnodes(&self) -> usize {
    self.nodes.ncols()
  }
  pub fn nedges(&self) -> usize {
    self.mesh.nedges()
  }
  pub fn ncells(&self) -> usize {
    self.mesh.ncells()
  }
  pub fn dim_embedded(&self) -> Dim {
    3
  }
  pub fn dim_intrinsic(&self) -> Dim {
    2
  }

  pub fn integrator(&self, degree: usize) -> QuadRule {
    QuadRule::triangle(degree)
  }

  /// Local surface nodes of `icell` in the rows (`ldof x 3`).
  fn cell_nodes(&self, icell: CellIdx) -> na::DMatrix<f64> {
    let dofs = self.space.dof().dof_map().local2global(icell);
    na::DMatrix::from_fn(dofs.len(), 3, |i, j| self.nodes[(j, dofs[i])])
  }

  /// Tangent vectors of the parametrization in the rows (`2 x 3`) together
  /// with the reference gradients of the degree `p0` basis (`ldof x 2`).
  pub fn jacobi_matrix(
    &self,
    bc: na::DVectorView<f64>,
    icell: CellIdx,
  ) -> (na::DMatrix<f64>, na::DMatrix<f64>) {
    let grad = self.space.ref_grad_basis(bc);
    let jacobi = grad.transpose() * self.cell_nodes(icell);
    (jacobi, grad)
  }

  /// Unprojected point of the degree `p0` parametrization.
  fn bc_to_mesh_point(&self, bc: na::DVectorView<f64>, icell: CellIdx) -> Point3 {
    let phi = self.space.basis(bc);
    let x = self.cell_nodes(icell).transpose() * phi;
    Point3::new(x[0], x[1], x[2])
  }

  /// Point of the exact surface above `bc`.
  pub fn bc_to_point(&self, bc: na::DVectorView<f64>, icell: CellIdx) -> Point3 {
    let x = self.bc_to_mesh_point(bc, icell);
    match self.scale {
      Some(scale) => self.surface.project(&(x / scale)).point * scale,
      None => self.surface.project(&x).point,
    }
  }

  /// Tangent vectors mapped onto the exact surface (`2 x 3`), the reference
  /// gradients of the degree `p0` basis and the surface point.
  pub fn surface_jacobi_matrix(
    &self,
    bc: na::DVectorView<f64>,
    icell: CellIdx,
  ) -> (na::DMatrix<f64>, na::DMatrix<f64>, Point3) {
    let (jacobi, grad) = self.jacobi_matrix(bc, icell);
    let ps = self.bc_to_point(bc, icell);
    // the closest point map of the scaled surface is `x -> s P(x / s)`
    let jsp = match self.scale {
      Some(scale) => self.surface.jacobi_matrix(&(ps / scale)),
      None => self.surface.jacobi_matrix(&ps),
    };
    let jsp = na::DMatrix::from_fn(3, 3, |i, j| jsp[(i, j)]);
    let surface_jacobi = jacobi * jsp.transpose();
    (surface_jacobi, grad, ps)
  }

  /// Unnormalized normal of the exact surface, scaled by the area element.
  pub fn normal(&self, bc: na::DVectorView<f64>, icell: CellIdx) -> (na::Vector3<f64>, Point3) {
    let (js, _, ps) = self.surface_jacobi_matrix(bc, icell);
    (tangent_cross(&js), ps)
  }

  /// Area element `|J0 x J1|` of the parametrization, twice the local area scaling.
  pub fn area_element(&self, bc: na::DVectorView<f64>, icell: CellIdx) -> f64 {
    let (jacobi, _) = self.jacobi_matrix(bc, icell);
    tangent_cross(&jacobi).norm()
  }

  /// Areas of the curved cells.
  pub fn area(&self, quad: Option<QuadRule>) -> Vec<f64> {
    let quad = quad.unwrap_or_else(|| self.integrator(2 * self.degree() + 1));
    (0..self.ncells())
      .map(|icell| {
        quad
          .iter()
          .map(|(bc, w)| w * self.area_element(bc, icell) / 2.0)
          .sum()
      })
      .collect()
  }
}

/// Cross product of the two rows of a `2 x 3` matrix.
pub(crate) fn tangent_cross(rows: &na::DMatrix<f64>) -> na::Vector3<f64> {
  let a = na::Vector3::new(rows[(0, 0)], rows[(0, 1)], rows[(0, 2)]);
  let b = na::Vector3::new(rows[(1, 0)], rows[(1, 1)], rows[(1, 2)]);
  a.cross(&b)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::surface::SphereSurface;

  use approx::assert_relative_eq;
  use std::f64::consts::PI;

  #[test]
  fn nodes_lie_on_surface() {
    let sphere = SphereSurface::default();
    let mesh = Rc::new(sphere.init_mesh(1));
    let smesh = SurfaceTriangleMesh::new(mesh.clone(), sphere, 2, None).unwrap();
    assert_eq!(smesh.nnodes(), mesh.nnodes() + mesh.nedges());
    for x in smesh.nodes().column_iter() {
      let p = Point3::new(x[0], x[1], x[2]);
      assert!(sphere.value(&p).abs() < 1e-12);
    }
  }

  #[test]
  fn scaled_projection() {
    let sphere = SphereSurface::default();
    let mesh = Rc::new(sphere.init_mesh(0).map_nodes(|x| 3.0 * x));
    let smesh = SurfaceTriangleMesh::new(mesh, sphere, 1, Some(3.0)).unwrap();
    for x in smesh.nodes().column_iter() {
      assert_relative_eq!(x.norm(), 3.0, epsilon = 1e-12);
    }
    let bc = na::dvector![0.2, 0.3, 0.5];
    assert_relative_eq!(smesh.bc_to_point(bc.as_view(), 4).norm(), 3.0, epsilon = 1e-12);
  }

  #[test]
  fn planar_mesh_is_rejected() {
    let mesh = TriangleMesh::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], vec![[0, 1, 2]]);
    let result = SurfaceTriangleMesh::new(Rc::new(mesh), SphereSurface::default(), 1, None);
    assert_eq!(
      result.err(),
      Some(FemError::EmbeddingMismatch {
        expected: 3,
        found: 2
      })
    );
  }

  #[test]
  fn scaled_normal_grows_with_area() {
    let sphere = SphereSurface::default();
    let mesh = Rc::new(sphere.init_mesh(1));
    let unit = SurfaceTriangleMesh::new(mesh.clone(), sphere, 2, None).unwrap();
    let scaled_mesh = Rc::new(sphere.init_mesh(1).map_nodes(|x| 3.0 * x));
    let scaled = SurfaceTriangleMesh::new(scaled_mesh, sphere, 2, Some(3.0)).unwrap();
    let bc = na::dvector![0.2, 0.3, 0.5];
    for icell in [0, 11, 63] {
      let (n1, p1) = unit.normal(bc.as_view(), icell);
      let (n3, p3) = scaled.normal(bc.as_view(), icell);
      assert_relative_eq!(p3, 3.0 * p1, epsilon = 1e-10);
      assert_relative_eq!(n3, 9.0 * n1, epsilon = 1e-10);
    }
  }

  #[test]
  fn higher_order_area_converges() {
    let sphere = SphereSurface::default();
    let mesh = Rc::new(sphere.init_mesh(2));
    let error = |p0: usize| {
      let smesh = SurfaceTriangleMesh::new(mesh.clone(), sphere, p0, None).unwrap();
      let area: f64 = smesh.area(None).iter().sum();
      (area - 4.0 * PI).abs()
    };
    let (e1, e2) = (error(1), error(2));
    assert!(e1 < 0.3);
    assert!(e2 < e1 / 4.0);
  }

  #[test]
  fn surface_normal_is_radial() {
    let sphere = SphereSurface::default();
    let mesh = Rc::new(sphere.init_mesh(1));
    let smesh = SurfaceTriangleMesh::new(mesh, sphere, 1, None).unwrap();
    let bc = na::dvector![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
    for icell in [0, 17, 42] {
      let (n, ps) = smesh.normal(bc.as_view(), icell);
      let n = n.normalize();
      assert_relative_eq!(n.dot(&ps).abs(), 1.0, epsilon = 1e-10);
    }
  }
}
