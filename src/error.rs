use crate::CellIdx;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FemError {
  #[error("unknown mesh type `{0}`")]
  UnknownMeshType(String),
  #[error("mesh type `{0}` can not be generated by this data set")]
  UnsupportedMeshType(String),
  #[error("unknown marking method `{0}`, expected one of `MAX`, `COARSEN`, `L2`")]
  UnknownMarkingMethod(String),
  #[error("unknown space type `{0}`, expected `C` or `D`")]
  UnknownSpaceType(String),
  #[error("polynomial degree {degree} is below the minimum {min}")]
  InvalidDegree { degree: usize, min: usize },
  #[error("{npoints} points were given for {ncells} cells")]
  ShapeMismatch { npoints: usize, ncells: usize },
  #[error("cell {icell} is out of range for a mesh with {ncells} cells")]
  CellOutOfRange { icell: CellIdx, ncells: usize },
  #[error("expected {expected} entries, found {found}")]
  LengthMismatch { expected: usize, found: usize },
  #[error("degree mismatch: can not transfer degree {from} data to degree {to}")]
  DegreeMismatch { from: usize, to: usize },
  #[error("expected a mesh embedded in {expected}D, found {found}D")]
  EmbeddingMismatch { expected: usize, found: usize },
  #[error("spaces are defined on different meshes")]
  MeshMismatch,
  #[error("local matrix of cell {0} is singular")]
  SingularMatrix(CellIdx),
}

pub type FemResult<T> = Result<T, FemError>;
