//! Benchmark problems with known exact solutions.

pub mod poisson;

pub use poisson::PoissonData;

use crate::error::FemError;

use std::{fmt, str::FromStr};

/// Kind of initial mesh a data set is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshType {
  Tri,
  Quad,
  Quadtree,
  Tritree,
  StructuredTri,
}

impl MeshType {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Tri => "tri",
      Self::Quad => "quad",
      Self::Quadtree => "quadtree",
      Self::Tritree => "tritree",
      Self::StructuredTri => "stri",
    }
  }
}

impl fmt::Display for MeshType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for MeshType {
  type Err = FemError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "tri" => Ok(Self::Tri),
      "quad" => Ok(Self::Quad),
      "quadtree" => Ok(Self::Quadtree),
      "tritree" => Ok(Self::Tritree),
      "stri" => Ok(Self::StructuredTri),
      _ => Err(FemError::UnknownMeshType(s.to_string())),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn mesh_type_names_round_trip() {
    for ty in [
      MeshType::Tri,
      MeshType::Quad,
      MeshType::Quadtree,
      MeshType::Tritree,
      MeshType::StructuredTri,
    ] {
      assert_eq!(ty.to_string().parse::<MeshType>(), Ok(ty));
    }
    assert_eq!(
      "hex".parse::<MeshType>(),
      Err(FemError::UnknownMeshType("hex".to_string()))
    );
  }
}
