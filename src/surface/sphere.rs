use super::{ImplicitSurface, Point3, Projection, ProjectionOptions};
use crate::mesh::TriangleMesh;

use once_cell::sync::Lazy;

/// Sphere with exact one step projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereSurface {
  pub center: Point3,
  pub radius: f64,
}

impl Default for SphereSurface {
  fn default() -> Self {
    Self {
      center: Point3::zeros(),
      radius: 1.0,
    }
  }
}

impl SphereSurface {
  pub fn new(center: Point3, radius: f64) -> Self {
    Self { center, radius }
  }

  /// Geodesic sphere from the icosahedron refined `nrefinements` times.
  ///
  /// New midpoints are projected back onto the sphere after every step.
  pub fn init_mesh(&self, nrefinements: usize) -> TriangleMesh {
    let mut mesh = ICOSAHEDRON.clone().map_nodes(|x| {
      let p = self.center + self.radius * Point3::new(x[0], x[1], x[2]);
      na::DVector::from_column_slice(p.as_slice())
    });
    for _ in 0..nrefinements {
      mesh = mesh.uniform_refine(1).map_nodes(|x| {
        let p = self.project(&Point3::new(x[0], x[1], x[2])).point;
        na::DVector::from_column_slice(p.as_slice())
      });
    }
    mesh
  }
}

impl ImplicitSurface for SphereSurface {
  fn value(&self, p: &Point3) -> f64 {
    (p - self.center).norm() - self.radius
  }

  fn gradient(&self, p: &Point3) -> na::Vector3<f64> {
    (p - self.center).normalize()
  }

  fn unit_normal(&self, p: &Point3) -> na::Vector3<f64> {
    self.gradient(p)
  }

  fn hessian(&self, p: &Point3) -> na::Matrix3<f64> {
    let x = p - self.center;
    let l = x.norm();
    (na::Matrix3::identity() - x * x.transpose() / (l * l)) / l
  }

  fn project_with(&self, p: &Point3, _options: &ProjectionOptions) -> Projection {
    let distance = self.value(p);
    Projection {
      point: p - distance * self.unit_normal(p),
      distance,
      converged: true,
      niterations: 1,
    }
  }
}

static ICOSAHEDRON: Lazy<TriangleMesh> = Lazy::new(|| {
  let phi = (1.0 + 5.0f64.sqrt()) / 2.0;

  #[rustfmt::skip]
  let vertices = [
    [-1.0, phi, 0.0],
    [ 1.0, phi, 0.0],
    [-1.0,-phi, 0.0],
    [ 1.0,-phi, 0.0],
    [ 0.0,-1.0, phi],
    [ 0.0, 1.0, phi],
    [ 0.0,-1.0,-phi],
    [ 0.0, 1.0,-phi],
    [ phi, 0.0,-1.0],
    [ phi, 0.0, 1.0],
    [-phi, 0.0,-1.0],
    [-phi, 0.0, 1.0],
  ];
  let norm = (1.0 + phi * phi).sqrt();
  let vertices = vertices.map(|v| v.map(|c| c / norm));

  let cells = vec![
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
  ];

  TriangleMesh::from_rows(&vertices[..], cells)
});

#[cfg(test)]
mod test {
  use super::*;

  use approx::assert_relative_eq;

  #[test]
  fn projection_is_idempotent() {
    let sphere = SphereSurface::new(Point3::new(0.5, -1.0, 2.0), 2.0);
    for p in [
      Point3::new(3.0, 1.0, 0.5),
      Point3::new(0.6, -0.9, 2.1),
      Point3::new(-4.0, 2.0, 7.0),
    ] {
      let once = sphere.project(&p);
      assert!(sphere.value(&once.point).abs() < 1e-8);
      let twice = sphere.project(&once.point);
      assert_relative_eq!(once.point, twice.point, epsilon = 1e-12);
      assert!(twice.distance.abs() < 1e-8);
    }
  }

  #[test]
  fn analytic_hessian_matches_differences() {
    struct Numeric(SphereSurface);
    impl ImplicitSurface for Numeric {
      fn value(&self, p: &Point3) -> f64 {
        self.0.value(p)
      }
      fn gradient(&self, p: &Point3) -> na::Vector3<f64> {
        self.0.gradient(p)
      }
    }
    let sphere = SphereSurface::new(Point3::new(0.1, 0.2, 0.3), 1.5);
    let p = Point3::new(1.0, -0.5, 0.8);
    assert_relative_eq!(
      sphere.hessian(&p),
      Numeric(sphere).hessian(&p),
      epsilon = 1e-6
    );
  }

  #[test]
  fn jacobian_scales_tangent_plane() {
    let sphere = SphereSurface::default();
    let p = Point3::new(0.0, 0.0, 2.0);
    let j = sphere.jacobi_matrix(&p);
    let expected = na::Matrix3::from_diagonal(&na::vector![0.5, 0.5, 0.0]);
    assert_relative_eq!(j, expected, epsilon = 1e-12);
  }

  #[test]
  fn geodesic_mesh() {
    let sphere = SphereSurface::new(Point3::new(1.0, 0.0, 0.0), 2.0);
    let mesh = sphere.init_mesh(0);
    assert_eq!(mesh.nnodes(), 12);
    assert_eq!(mesh.nedges(), 30);
    assert_eq!(mesh.ncells(), 20);

    let mesh = sphere.init_mesh(2);
    assert_eq!(mesh.ncells(), 20 * 16);
    assert_eq!(mesh.nnodes() + mesh.ncells(), mesh.nedges() + 2);
    for x in mesh.node_coords().matrix().column_iter() {
      let p = Point3::new(x[0], x[1], x[2]);
      assert!(sphere.value(&p).abs() < 1e-12);
    }
  }
}
