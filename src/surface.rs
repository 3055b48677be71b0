//! Implicitly defined surfaces and closest point projection.
//!
//! A surface is the zero level set of a scalar function `phi`. The gradient of
//! `phi` points outward. Projections are pure: they return a new point together
//! with the signed distance instead of overwriting their input.

pub mod level_set;
pub mod sphere;

pub use level_set::{
  EllipsoidSurface, HeartSurface, OrthocircleSurface, QuarticsSurface, TorusSurface, TwelveSpheres,
};
pub use sphere::SphereSurface;

use tracing::warn;

pub type Point3 = na::Vector3<f64>;

/// Stopping criteria of the Newton projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionOptions {
  pub maxit: usize,
  pub tol: f64,
}
impl Default for ProjectionOptions {
  fn default() -> Self {
    Self {
      maxit: 200,
      tol: 1e-8,
    }
  }
}

/// Result of projecting a point onto a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
  pub point: Point3,
  /// Signed distance of the input point, positive outside.
  pub distance: f64,
  /// `false` if the iteration stopped at `maxit` or on a vanishing gradient.
  pub converged: bool,
  pub niterations: usize,
}

fn fd_step() -> f64 {
  f64::EPSILON.sqrt()
}

pub trait ImplicitSurface {
  fn value(&self, p: &Point3) -> f64;

  /// Forward differences, override when an analytic gradient is known.
  fn gradient(&self, p: &Point3) -> na::Vector3<f64> {
    let h = fd_step();
    let v = self.value(p);
    na::Vector3::from_fn(|i, _| {
      let mut q = *p;
      q[i] += h;
      (self.value(&q) - v) / h
    })
  }

  fn unit_normal(&self, p: &Point3) -> na::Vector3<f64> {
    self.gradient(p).normalize()
  }

  /// Central differences of the gradient.
  fn hessian(&self, p: &Point3) -> na::Matrix3<f64> {
    let h = f64::EPSILON.cbrt();
    let mut hessian = na::Matrix3::zeros();
    for j in 0..3 {
      let mut forward = *p;
      let mut backward = *p;
      forward[j] += h;
      backward[j] -= h;
      let column = (self.gradient(&forward) - self.gradient(&backward)) / (2.0 * h);
      hessian.set_column(j, &column);
    }
    (hessian + hessian.transpose()) / 2.0
  }

  fn project(&self, p: &Point3) -> Projection {
    self.project_with(p, &ProjectionOptions::default())
  }

  /// Newton iteration `x <- x - phi(x) grad(x) / |grad(x)|^2`.
  fn project_with(&self, p: &Point3, options: &ProjectionOptions) -> Projection {
    newton_projection(self, p, options)
  }

  /// Derivative of the closest point map at `p`.
  ///
  /// `J = I - n n^T - d (I - n n^T) H / |grad|` with the approximate distance
  /// `d = phi / |grad|`, all evaluated at the unprojected point.
  fn jacobi_matrix(&self, p: &Point3) -> na::Matrix3<f64> {
    let grad = self.gradient(p);
    let len = grad.norm();
    let n = grad / len;
    let d = self.value(p) / len;
    let tangential = na::Matrix3::identity() - n * n.transpose();
    tangential - (d / len) * tangential * self.hessian(p)
  }
}

pub fn newton_projection<S>(surface: &S, p: &Point3, options: &ProjectionOptions) -> Projection
where
  S: ImplicitSurface + ?Sized,
{
  let mut x = *p;
  let mut converged = false;
  let mut niterations = 0;
  while niterations < options.maxit {
    let phi = surface.value(&x);
    if phi.abs() < options.tol {
      converged = true;
      break;
    }
    let grad = surface.gradient(&x);
    let norm2 = grad.norm_squared();
    if norm2 <= f64::EPSILON {
      warn!("vanishing gradient at {:?}, stopping projection", x.as_slice());
      break;
    }
    x -= (phi / norm2) * grad;
    niterations += 1;
  }
  if !converged && surface.value(&x).abs() < options.tol {
    converged = true;
  }
  if !converged {
    warn!(
      "projection of {:?} did not converge after {} iterations",
      p.as_slice(),
      niterations
    );
  }

  let distance = (x - p).norm().copysign(surface.value(p));
  Projection {
    point: x,
    distance,
    converged,
    niterations,
  }
}
