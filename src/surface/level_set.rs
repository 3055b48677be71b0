//! Benchmark surfaces given by polynomial or distance-like level set functions.
//!
//! All of them project with the default Newton iteration.

use super::{ImplicitSurface, Point3};

/// Union of twelve spheres of equal radius, `phi = min_i |x - c_i| - r`.
#[derive(Debug, Clone, PartialEq)]
pub struct TwelveSpheres {
  pub centers: [Point3; 12],
  pub radius: f64,
}

impl TwelveSpheres {
  pub fn new(radius: f64) -> Self {
    let s = 0.866025403784439;
    let t = 1.73205080756888;
    #[rustfmt::skip]
    let centers = [
      [ 1.0, 0.0, 0.0],
      [-1.0, 0.0, 0.0],
      [ 0.5,   s, 0.0],
      [-0.5,   s, 0.0],
      [ 0.5,  -s, 0.0],
      [-0.5,  -s, 0.0],
      [ 2.0, 0.0, 0.0],
      [ 1.0,   t, 0.0],
      [-1.0,   t, 0.0],
      [-2.0, 0.0, 0.0],
      [-1.0,  -t, 0.0],
      [ 1.0,  -t, 0.0],
    ]
    .map(|c| Point3::new(c[0], c[1], c[2]));
    Self { centers, radius }
  }
}
impl Default for TwelveSpheres {
  fn default() -> Self {
    Self::new(0.7)
  }
}
impl ImplicitSurface for TwelveSpheres {
  fn value(&self, p: &Point3) -> f64 {
    self
      .centers
      .iter()
      .map(|c| (p - c).norm() - self.radius)
      .fold(f64::INFINITY, f64::min)
  }
}

/// `(x - z^2)^2 + y^2 + z^2 - 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeartSurface;
impl ImplicitSurface for HeartSurface {
  fn value(&self, p: &Point3) -> f64 {
    let (x, y, z) = (p.x, p.y, p.z);
    (x - z * z).powi(2) + y * y + z * z - 1.0
  }

  fn gradient(&self, p: &Point3) -> na::Vector3<f64> {
    let (x, y, z) = (p.x, p.y, p.z);
    na::Vector3::new(2.0 * (x - z * z), 2.0 * y, -4.0 * (x - z * z) * z + 2.0 * z)
  }

  #[rustfmt::skip]
  fn hessian(&self, p: &Point3) -> na::Matrix3<f64> {
    let (x, z) = (p.x, p.z);
    na::Matrix3::new(
      2.0,      0.0, -4.0 * z,
      0.0,      2.0,      0.0,
      -4.0 * z, 0.0, -4.0 * x + 12.0 * z * z + 2.0,
    )
  }
}

/// `x^2/a^2 + y^2/b^2 + z^2/c^2 - 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipsoidSurface {
  pub axes: [f64; 3],
}
impl Default for EllipsoidSurface {
  fn default() -> Self {
    Self {
      axes: [9.0, 3.0, 1.0],
    }
  }
}
impl ImplicitSurface for EllipsoidSurface {
  fn value(&self, p: &Point3) -> f64 {
    let [a, b, c] = self.axes;
    (p.x / a).powi(2) + (p.y / b).powi(2) + (p.z / c).powi(2) - 1.0
  }

  fn gradient(&self, p: &Point3) -> na::Vector3<f64> {
    let [a, b, c] = self.axes;
    na::Vector3::new(2.0 * p.x / (a * a), 2.0 * p.y / (b * b), 2.0 * p.z / (c * c))
  }

  fn hessian(&self, _p: &Point3) -> na::Matrix3<f64> {
    let [a, b, c] = self.axes;
    na::Matrix3::from_diagonal(&na::Vector3::new(2.0 / (a * a), 2.0 / (b * b), 2.0 / (c * c)))
  }
}

/// Torus with major radius 4 and minor radius 1 around the z axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TorusSurface;
impl ImplicitSurface for TorusSurface {
  fn value(&self, p: &Point3) -> f64 {
    let s1 = p.x.hypot(p.y);
    (s1 * s1 + p.z * p.z + 16.0 - 8.0 * s1).sqrt() - 1.0
  }

  fn gradient(&self, p: &Point3) -> na::Vector3<f64> {
    let s1 = p.x.hypot(p.y);
    let s2 = (s1 * s1 + p.z * p.z + 16.0 - 8.0 * s1).sqrt();
    na::Vector3::new(
      (s1 - 4.0) * p.x / (s1 * s2),
      (s1 - 4.0) * p.y / (s1 * s2),
      p.z / s2,
    )
  }
}

/// `d1 d2 d3 - c0^2 (1 + c1 |x|^2)` with the tubes
/// `d1 = (x^2 + y^2 - 1)^2 + z^2` and its cyclic permutations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthocircleSurface {
  pub c: [f64; 2],
}
impl Default for OrthocircleSurface {
  fn default() -> Self {
    Self { c: [0.075, 3.0] }
  }
}
impl ImplicitSurface for OrthocircleSurface {
  fn value(&self, p: &Point3) -> f64 {
    let (x2, y2, z2) = (p.x * p.x, p.y * p.y, p.z * p.z);
    let d1 = (x2 + y2 - 1.0).powi(2) + z2;
    let d2 = (y2 + z2 - 1.0).powi(2) + x2;
    let d3 = (z2 + x2 - 1.0).powi(2) + y2;
    let [c0, c1] = self.c;
    d1 * d2 * d3 - c0 * c0 * (1.0 + c1 * (x2 + y2 + z2))
  }

  fn gradient(&self, p: &Point3) -> na::Vector3<f64> {
    let (x, y, z) = (p.x, p.y, p.z);
    let (x2, y2, z2) = (x * x, y * y, z * z);
    let (e1, e2, e3) = (x2 + y2 - 1.0, y2 + z2 - 1.0, z2 + x2 - 1.0);
    let d1 = e1 * e1 + z2;
    let d2 = e2 * e2 + x2;
    let d3 = e3 * e3 + y2;

    let grad_d1 = na::Vector3::new(4.0 * x * e1, 4.0 * y * e1, 2.0 * z);
    let grad_d2 = na::Vector3::new(2.0 * x, 4.0 * y * e2, 4.0 * z * e2);
    let grad_d3 = na::Vector3::new(4.0 * x * e3, 2.0 * y, 4.0 * z * e3);

    let [c0, c1] = self.c;
    grad_d1 * (d2 * d3) + grad_d2 * (d1 * d3) + grad_d3 * (d1 * d2) - (2.0 * c0 * c0 * c1) * p
  }
}

/// `(x^2 - 1)^2 + (y^2 - 1)^2 + (z^2 - 1)^2 - r`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuarticsSurface {
  pub r: f64,
}
impl Default for QuarticsSurface {
  fn default() -> Self {
    Self { r: 1.05 }
  }
}
impl ImplicitSurface for QuarticsSurface {
  fn value(&self, p: &Point3) -> f64 {
    p.iter().map(|c| (c * c - 1.0).powi(2)).sum::<f64>() - self.r
  }

  fn gradient(&self, p: &Point3) -> na::Vector3<f64> {
    p.map(|c| 4.0 * (c * c - 1.0) * c)
  }

  fn hessian(&self, p: &Point3) -> na::Matrix3<f64> {
    na::Matrix3::from_diagonal(&p.map(|c| 12.0 * c * c - 4.0))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::surface::ProjectionOptions;

  use approx::assert_relative_eq;

  fn check_gradient(surface: &impl ImplicitSurface, p: &Point3) {
    let h = 1e-6;
    let numeric = na::Vector3::from_fn(|i, _| {
      let mut forward = *p;
      let mut backward = *p;
      forward[i] += h;
      backward[i] -= h;
      (surface.value(&forward) - surface.value(&backward)) / (2.0 * h)
    });
    assert_relative_eq!(surface.gradient(p), numeric, epsilon = 1e-5, max_relative = 1e-6);
  }

  fn check_hessian(surface: &impl ImplicitSurface, p: &Point3) {
    let h = 1e-5;
    let mut numeric = na::Matrix3::zeros();
    for j in 0..3 {
      let mut forward = *p;
      let mut backward = *p;
      forward[j] += h;
      backward[j] -= h;
      numeric.set_column(
        j,
        &((surface.gradient(&forward) - surface.gradient(&backward)) / (2.0 * h)),
      );
    }
    assert_relative_eq!(surface.hessian(p), numeric, epsilon = 1e-5, max_relative = 1e-6);
  }

  #[test]
  fn analytic_derivatives() {
    let p = Point3::new(0.7, -0.4, 0.9);
    check_gradient(&HeartSurface, &p);
    check_hessian(&HeartSurface, &p);
    check_gradient(&EllipsoidSurface::default(), &p);
    check_hessian(&EllipsoidSurface::default(), &p);
    check_gradient(&QuarticsSurface::default(), &p);
    check_hessian(&QuarticsSurface::default(), &p);
    check_gradient(&OrthocircleSurface::default(), &p);
    check_gradient(&TorusSurface, &Point3::new(4.5, 0.3, 0.2));
  }

  #[test]
  fn newton_lands_on_level_set() {
    let options = ProjectionOptions::default();
    let cases: Vec<(Box<dyn ImplicitSurface>, Point3)> = vec![
      (Box::new(HeartSurface), Point3::new(1.2, 0.5, 0.4)),
      (Box::new(EllipsoidSurface::default()), Point3::new(8.0, 2.0, 0.8)),
      (Box::new(TorusSurface), Point3::new(5.5, 0.5, 0.3)),
      (Box::new(QuarticsSurface::default()), Point3::new(1.3, 0.2, 0.1)),
      (Box::new(TwelveSpheres::default()), Point3::new(2.9, 0.1, 0.2)),
    ];
    for (surface, p) in cases {
      let proj = surface.project_with(&p, &options);
      assert!(proj.converged);
      assert!(surface.value(&proj.point).abs() < options.tol);
      assert!(proj.distance > 0.0);
    }
  }

  #[test]
  fn twelve_spheres_is_nearest_sphere() {
    let surface = TwelveSpheres::default();
    assert_relative_eq!(surface.value(&Point3::new(2.0, 0.0, 1.0)), 0.3, epsilon = 1e-12);
    assert_relative_eq!(surface.value(&Point3::new(1.0, 0.0, 0.0)), -0.7, epsilon = 1e-12);
  }
}
