//! Data of the Poisson Equation `-Δu = f` on planar domains.

use super::MeshType;
use crate::{
  error::{FemError, FemResult},
  mesh::TriangleMesh,
  Point2,
};

use std::f64::consts::PI;

/// Exact solution, right hand side and initial mesh of a Poisson problem.
pub trait PoissonData {
  fn solution(&self, p: &Point2) -> f64;
  fn source(&self, p: &Point2) -> f64;
  fn gradient(&self, p: &Point2) -> Point2;

  fn dirichlet(&self, p: &Point2) -> f64 {
    self.solution(p)
  }

  /// Whether `p` is on the Dirichlet boundary, if the data set knows.
  fn is_boundary(&self, _p: &Point2) -> Option<bool> {
    None
  }

  /// Unrefined triangulation of the domain.
  fn coarse_mesh(&self) -> TriangleMesh;

  /// The coarse mesh refined `n` times.
  fn init_mesh(&self, n: usize, mesh_type: MeshType) -> FemResult<TriangleMesh> {
    match mesh_type {
      MeshType::Tri => Ok(self.coarse_mesh().uniform_refine(n)),
      other => Err(FemError::UnsupportedMeshType(other.to_string())),
    }
  }
}

fn unit_square() -> TriangleMesh {
  TriangleMesh::from_rows(
    &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
    vec![[1, 2, 0], [3, 0, 2]],
  )
}

fn centered_square() -> TriangleMesh {
  TriangleMesh::from_rows(
    &[[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]],
    vec![[1, 2, 0], [3, 0, 2]],
  )
}

fn on_unit_square_boundary(p: &Point2) -> bool {
  let eps = 1e-14;
  p.x < eps || p.y < eps || p.x > 1.0 - eps || p.y > 1.0 - eps
}

/// Polar angle in `[0, 2π)`.
fn polar_angle(p: &Point2) -> f64 {
  let theta = p.y.atan2(p.x);
  if theta < 0.0 {
    theta + 2.0 * PI
  } else {
    theta
  }
}

/// `u = cos(πx) cos(πy)` on the unit square.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosCosData;
impl CosCosData {
  /// Bounding box `[xmin, xmax, ymin, ymax]`.
  pub fn domain(&self) -> [f64; 4] {
    [0.0, 1.0, 0.0, 1.0]
  }
}
impl PoissonData for CosCosData {
  fn solution(&self, p: &Point2) -> f64 {
    (PI * p.x).cos() * (PI * p.y).cos()
  }
  fn source(&self, p: &Point2) -> f64 {
    2.0 * PI * PI * (PI * p.x).cos() * (PI * p.y).cos()
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    Point2::new(
      -PI * (PI * p.x).sin() * (PI * p.y).cos(),
      -PI * (PI * p.x).cos() * (PI * p.y).sin(),
    )
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    unit_square()
  }
}

/// Checkerboard right hand side `±1` on a 4x4 pattern with homogeneous
/// boundary values. No closed form solution is known, the solution and
/// gradient are reported as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfData;
impl PoissonData for FfData {
  fn solution(&self, _p: &Point2) -> f64 {
    0.0
  }
  fn source(&self, p: &Point2) -> f64 {
    let sum = (4.0 * p.x).floor() + (4.0 * p.y).floor();
    if sum.rem_euclid(2.0) == 0.0 {
      -1.0
    } else {
      1.0
    }
  }
  fn gradient(&self, _p: &Point2) -> Point2 {
    Point2::zeros()
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    unit_square()
  }
}

/// Kellogg's interface problem: `-∇·(a∇u) = 0` with a coefficient jumping
/// between the quadrants, `u = r^γ μ(θ)`.
#[derive(Debug, Clone, Copy)]
pub struct KelloggData {
  pub a: f64,
  pub gamma: f64,
  pub sigma: f64,
  pub rho: f64,
}
impl Default for KelloggData {
  fn default() -> Self {
    Self {
      a: 161.4476387975881,
      gamma: 0.1,
      sigma: -14.9225565104455152,
      rho: PI / 4.0,
    }
  }
}
impl KelloggData {
  /// `a` in the first and third quadrant, `1` elsewhere.
  pub fn diffusion_coefficient(&self, p: &Point2) -> f64 {
    if p.x * p.y > 0.0 {
      self.a
    } else {
      1.0
    }
  }

  /// Membership in the two coefficient subdomains `xy > 0` and `xy < 0`.
  pub fn subdomain(&self, p: &Point2) -> [bool; 2] {
    let xy = p.x * p.y;
    [xy > 0.0, xy < 0.0]
  }

  /// Angular factor `μ(θ)` and its derivative.
  fn angular(&self, theta: f64) -> (f64, f64) {
    let Self {
      gamma, sigma, rho, ..
    } = *self;
    let (amplitude, shift) = if theta < PI / 2.0 {
      ((PI / 2.0 - sigma) * gamma, PI / 2.0 - rho)
    } else if theta < PI {
      (rho * gamma, PI - sigma)
    } else if theta < 1.5 * PI {
      (sigma * gamma, PI + rho)
    } else {
      ((PI / 2.0 - rho) * gamma, 1.5 * PI + sigma)
    };
    let amplitude = amplitude.cos();
    let arg = (theta - shift) * gamma;
    (amplitude * arg.cos(), -gamma * amplitude * arg.sin())
  }
}
impl PoissonData for KelloggData {
  fn solution(&self, p: &Point2) -> f64 {
    let (mu, _) = self.angular(polar_angle(p));
    p.norm().powf(self.gamma) * mu
  }
  fn source(&self, _p: &Point2) -> f64 {
    0.0
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    let r = p.norm();
    let theta = polar_angle(p);
    let (mu, dmu) = self.angular(theta);
    let e_r = Point2::new(theta.cos(), theta.sin());
    let e_theta = Point2::new(-theta.sin(), theta.cos());
    r.powf(self.gamma - 1.0) * (self.gamma * mu * e_r + dmu * e_theta)
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    #[rustfmt::skip]
    let nodes = [
      [-1.0, -1.0], [0.0, -1.0], [1.0, -1.0],
      [-1.0,  0.0], [0.0,  0.0], [1.0,  0.0],
      [-1.0,  1.0], [0.0,  1.0], [1.0,  1.0],
    ];
    let cells = vec![
      [1, 4, 0],
      [3, 0, 4],
      [4, 1, 5],
      [2, 5, 1],
      [4, 7, 3],
      [6, 3, 7],
      [7, 4, 8],
      [5, 8, 4],
    ];
    TriangleMesh::from_rows(&nodes, cells)
  }
}

/// `u = r^(2/3) sin(2θ/3)` on the L-shaped domain `[-1,1]^2 \ [0,1]x[-1,0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LShapeRSinData;
impl LShapeRSinData {
  /// Corner points of the domain and the boundary segments between them.
  pub fn domain(&self) -> (Vec<[f64; 2]>, Vec<[usize; 2]>) {
    let points = vec![
      [0.0, 0.0],
      [1.0, 0.0],
      [1.0, 1.0],
      [-1.0, 1.0],
      [-1.0, -1.0],
      [0.0, -1.0],
    ];
    let facets = (0..points.len())
      .map(|i| [i, (i + 1) % points.len()])
      .collect();
    (points, facets)
  }
}
impl PoissonData for LShapeRSinData {
  fn solution(&self, p: &Point2) -> f64 {
    let theta = polar_angle(p);
    p.norm_squared().powf(1.0 / 3.0) * (2.0 * theta / 3.0).sin()
  }
  fn source(&self, _p: &Point2) -> f64 {
    0.0
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    let theta = polar_angle(p);
    let (s, c) = (2.0 * theta / 3.0).sin_cos();
    let denom = 3.0 * p.norm_squared().powf(2.0 / 3.0);
    Point2::new(
      2.0 * (p.x * s - p.y * c) / denom,
      2.0 * (p.x * c + p.y * s) / denom,
    )
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    #[rustfmt::skip]
    let nodes = [
      [-1.0, -1.0], [0.0, -1.0],
      [-1.0,  0.0], [0.0,  0.0], [1.0, 0.0],
      [-1.0,  1.0], [0.0,  1.0], [1.0, 1.0],
    ];
    let cells = vec![
      [1, 3, 0],
      [2, 0, 3],
      [3, 6, 2],
      [5, 2, 6],
      [4, 7, 3],
      [6, 3, 7],
    ];
    TriangleMesh::from_rows(&nodes, cells)
  }
}

/// `u = sqrt((r - x)/2) - r^2/4` on the unit diamond slit along the
/// positive x axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrackData;
impl PoissonData for CrackData {
  fn solution(&self, p: &Point2) -> f64 {
    let r = p.norm();
    (0.5 * (r - p.x)).sqrt() - 0.25 * r * r
  }
  fn source(&self, _p: &Point2) -> f64 {
    1.0
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    let (x, y) = (p.x, p.y);
    let r = p.norm();
    let s = (0.5 * (r - x)).powf(-0.5);
    Point2::new(
      -0.5 * x + s * (0.25 * x / r - 0.25),
      0.25 * y * s / r - 0.5 * y,
    )
  }
  /// The slit tip `(1,0)` appears twice, once for each side of the crack.
  fn coarse_mesh(&self) -> TriangleMesh {
    let nodes = [
      [0.0, -1.0],
      [-1.0, 0.0],
      [0.0, 0.0],
      [1.0, 0.0],
      [1.0, 0.0],
      [0.0, 1.0],
    ];
    let cells = vec![[2, 1, 0], [2, 0, 3], [2, 5, 1], [2, 4, 5]];
    TriangleMesh::from_rows(&nodes, cells)
  }
}

/// Two sharp peaks of opposite sign at `(-1/2, 1/2)` and `(1/2, -1/2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoSingularData;
impl TwoSingularData {
  fn denominators(p: &Point2) -> (f64, f64) {
    let t0 = (p.x + 0.5).powi(2) + (p.y - 0.5).powi(2) + 0.01;
    let t1 = (p.x - 0.5).powi(2) + (p.y + 0.5).powi(2) + 0.01;
    (t0, t1)
  }
}
impl PoissonData for TwoSingularData {
  fn solution(&self, p: &Point2) -> f64 {
    let (t0, t1) = Self::denominators(p);
    1.0 / t0 - 1.0 / t1
  }
  fn source(&self, p: &Point2) -> f64 {
    let (x, y) = (p.x, p.y);
    let (t0, t1) = Self::denominators(p);
    (2.0 * x - 1.0) * (4.0 * x - 2.0) / t1.powi(3) - (2.0 * x + 1.0) * (4.0 * x + 2.0) / t0.powi(3)
      - (2.0 * y - 1.0) * (4.0 * y - 2.0) / t0.powi(3)
      + (2.0 * y + 1.0) * (4.0 * y + 2.0) / t1.powi(3)
      + 4.0 / t0.powi(2)
      - 4.0 / t1.powi(2)
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    let (x, y) = (p.x, p.y);
    let (t0, t1) = Self::denominators(p);
    Point2::new(
      -(1.0 - 2.0 * x) / t1.powi(2) + (-2.0 * x - 1.0) / t0.powi(2),
      (1.0 - 2.0 * y) / t0.powi(2) - (-2.0 * y - 1.0) / t1.powi(2),
    )
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    centered_square()
  }
}

/// `u = (x^2 + y^2)^(1/5)` with a gradient singularity at the origin corner.
#[derive(Debug, Clone, Copy, Default)]
pub struct CornerSingularData;
impl PoissonData for CornerSingularData {
  fn solution(&self, p: &Point2) -> f64 {
    p.norm_squared().powf(0.2)
  }
  fn source(&self, p: &Point2) -> f64 {
    -0.16 * p.norm_squared().powf(-0.8)
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    0.4 * p.norm_squared().powf(-0.8) * p
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    unit_square()
  }
}

/// `u = sin(πx) sin(πy)` on `[-1,1]^2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinSinData;
impl PoissonData for SinSinData {
  fn solution(&self, p: &Point2) -> f64 {
    (PI * p.x).sin() * (PI * p.y).sin()
  }
  fn source(&self, p: &Point2) -> f64 {
    2.0 * PI * PI * self.solution(p)
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    Point2::new(
      PI * (PI * p.x).cos() * (PI * p.y).sin(),
      PI * (PI * p.x).sin() * (PI * p.y).cos(),
    )
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    centered_square()
  }
}

/// `u = (x - x^2)(y - y^2)`, vanishing on the boundary of the unit square.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolynomialData;
impl PoissonData for PolynomialData {
  fn solution(&self, p: &Point2) -> f64 {
    (p.x - p.x * p.x) * (p.y - p.y * p.y)
  }
  fn source(&self, p: &Point2) -> f64 {
    2.0 * (p.y - p.y * p.y) + 2.0 * (p.x - p.x * p.x)
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    Point2::new(
      (1.0 - 2.0 * p.x) * (p.y - p.y * p.y),
      (1.0 - 2.0 * p.y) * (p.x - p.x * p.x),
    )
  }
  fn is_boundary(&self, p: &Point2) -> Option<bool> {
    Some(on_unit_square_boundary(p))
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    unit_square()
  }
}

/// `u = exp(x^2 + y^2)` on the unit square.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpData;
impl PoissonData for ExpData {
  fn solution(&self, p: &Point2) -> f64 {
    p.norm_squared().exp()
  }
  fn source(&self, p: &Point2) -> f64 {
    -(4.0 * p.norm_squared() + 4.0) * p.norm_squared().exp()
  }
  fn gradient(&self, p: &Point2) -> Point2 {
    2.0 * p.norm_squared().exp() * p
  }
  fn is_boundary(&self, p: &Point2) -> Option<bool> {
    Some(on_unit_square_boundary(p))
  }
  fn coarse_mesh(&self) -> TriangleMesh {
    unit_square()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  use approx::assert_relative_eq;

  fn fd_gradient(data: &dyn PoissonData, p: &Point2) -> Point2 {
    let h = 1e-6;
    let dx = Point2::new(h, 0.0);
    let dy = Point2::new(0.0, h);
    Point2::new(
      (data.solution(&(p + dx)) - data.solution(&(p - dx))) / (2.0 * h),
      (data.solution(&(p + dy)) - data.solution(&(p - dy))) / (2.0 * h),
    )
  }

  fn fd_negative_laplace(data: &dyn PoissonData, p: &Point2) -> f64 {
    let h = 1e-4;
    let dx = Point2::new(h, 0.0);
    let dy = Point2::new(0.0, h);
    let center = data.solution(p);
    -(data.solution(&(p + dx)) + data.solution(&(p - dx)) + data.solution(&(p + dy))
      + data.solution(&(p - dy))
      - 4.0 * center)
      / (h * h)
  }

  fn all_data() -> Vec<(&'static str, Box<dyn PoissonData>)> {
    vec![
      ("coscos", Box::new(CosCosData)),
      ("kellogg", Box::new(KelloggData::default())),
      ("lshape", Box::new(LShapeRSinData)),
      ("crack", Box::new(CrackData)),
      ("two_singular", Box::new(TwoSingularData)),
      ("corner_singular", Box::new(CornerSingularData)),
      ("sinsin", Box::new(SinSinData)),
      ("polynomial", Box::new(PolynomialData)),
      ("exp", Box::new(ExpData)),
    ]
  }

  #[test]
  fn gradients_match_finite_differences() {
    // away from singularities, slits and quadrant interfaces
    let points = [
      Point2::new(0.3, 0.7),
      Point2::new(-0.6, 0.2),
      Point2::new(-0.35, -0.45),
      Point2::new(0.55, -0.25),
    ];
    for (name, data) in all_data() {
      for p in &points {
        let numeric = fd_gradient(data.as_ref(), p);
        let exact = data.gradient(p);
        assert!(
          (exact - numeric).norm() <= 1e-6 * (1.0 + exact.norm()),
          "{name} at {p:?}: {exact:?} vs {numeric:?}"
        );
      }
    }
  }

  #[test]
  fn source_is_negative_laplacian() {
    let points = [Point2::new(0.3, 0.7), Point2::new(-0.6, 0.2), Point2::new(0.55, -0.25)];
    for (name, data) in all_data() {
      for p in &points {
        let numeric = fd_negative_laplace(data.as_ref(), p);
        let exact = data.source(p);
        assert!(
          (exact - numeric).abs() <= 1e-3 * (1.0 + exact.abs()),
          "{name} at {p:?}: {exact} vs {numeric}"
        );
      }
    }
  }

  #[test]
  fn kellogg_is_continuous_across_quadrants() {
    let data = KelloggData::default();
    let eps = 1e-10;
    for theta in [PI / 2.0, PI, 1.5 * PI] {
      let (before, _) = data.angular(theta - eps);
      let (after, _) = data.angular(theta + eps);
      assert_relative_eq!(before, after, epsilon = 1e-8);
    }
    let (last, _) = data.angular(2.0 * PI - eps);
    let (first, _) = data.angular(0.0);
    assert_relative_eq!(last, first, epsilon = 1e-8);

    assert_eq!(data.diffusion_coefficient(&Point2::new(0.5, 0.5)), data.a);
    assert_eq!(data.diffusion_coefficient(&Point2::new(-0.5, 0.5)), 1.0);
    assert_eq!(data.subdomain(&Point2::new(-0.5, -0.5)), [true, false]);
  }

  #[test]
  fn checkerboard_source() {
    assert_eq!(FfData.source(&Point2::new(0.1, 0.1)), -1.0);
    assert_eq!(FfData.source(&Point2::new(0.3, 0.1)), 1.0);
    assert_eq!(FfData.source(&Point2::new(0.3, 0.3)), -1.0);
  }

  #[test]
  fn boundary_predicate() {
    assert_eq!(PolynomialData.is_boundary(&Point2::new(0.0, 0.5)), Some(true));
    assert_eq!(ExpData.is_boundary(&Point2::new(0.5, 0.5)), Some(false));
    assert_eq!(CosCosData.is_boundary(&Point2::new(0.0, 0.5)), None);
    assert_eq!(PolynomialData.dirichlet(&Point2::new(1.0, 0.3)), 0.0);
  }

  #[test]
  fn init_mesh_refines_coarse_mesh() {
    let mesh = CosCosData.init_mesh(2, MeshType::Tri).unwrap();
    assert_eq!(mesh.ncells(), 2 * 4usize.pow(2));
    assert_eq!(mesh.nnodes(), 25);
    let area: f64 = mesh.cell_measures().iter().sum();
    assert_relative_eq!(area, 1.0, epsilon = 1e-12);

    let mesh = KelloggData::default().init_mesh(1, MeshType::Tri).unwrap();
    assert_eq!(mesh.ncells(), 32);

    let (points, facets) = LShapeRSinData.domain();
    assert_eq!(points.len(), facets.len());
    let mesh = LShapeRSinData.init_mesh(0, MeshType::Tri).unwrap();
    let area: f64 = mesh.cell_measures().iter().sum();
    assert_relative_eq!(area, 3.0, epsilon = 1e-12);

    assert_eq!(
      SinSinData.init_mesh(1, MeshType::Quadtree).unwrap_err(),
      FemError::UnsupportedMeshType("quadtree".to_string())
    );
  }
}
