extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod assemble;
pub mod dof;
pub mod error;
pub mod lagrange;
pub mod linalg;
pub mod marking;
pub mod mesh;
pub mod multi_index;
pub mod pde;
pub mod quadrature;
pub mod scaled_monomial;
pub mod surface;
pub mod surface_lagrange;
pub mod surface_mesh;

pub use error::{FemError, FemResult};

pub type Dim = usize;
pub type CellIdx = usize;

pub type Point2 = na::Vector2<f64>;
