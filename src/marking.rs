//! Selection of cells for adaptive refinement and coarsening.

use crate::{
  error::{FemError, FemResult},
  CellIdx,
};

use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkingMethod {
  /// Cells with `eta > theta max(eta)`.
  Max,
  /// Cells with `eta < theta max(eta)`.
  Coarsen,
  /// Largest cells until their share of `sum(eta^2)` reaches `theta`.
  #[default]
  L2,
}

impl FromStr for MarkingMethod {
  type Err = FemError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "MAX" => Ok(Self::Max),
      "COARSEN" => Ok(Self::Coarsen),
      "L2" => Ok(Self::L2),
      _ => Err(FemError::UnknownMarkingMethod(s.to_string())),
    }
  }
}

/// Marks cells according to the error indicator `eta`.
///
/// The returned mask has the length of `eta`. [`MarkingMethod::L2`] sorts the
/// squared indicators in descending order and marks the prefix whose
/// cumulative sum stays below `theta` times the total. The largest indicator
/// is always marked, so a non-empty `eta` yields at least one cell.
pub fn mark(eta: &[f64], theta: f64, method: MarkingMethod) -> Vec<bool> {
  let mut marked = vec![false; eta.len()];
  if eta.is_empty() {
    return marked;
  }

  match method {
    MarkingMethod::Max | MarkingMethod::Coarsen => {
      let max = eta.iter().copied().fold(f64::NEG_INFINITY, f64::max);
      let threshold = theta * max;
      for (m, &e) in marked.iter_mut().zip(eta) {
        *m = match method {
          MarkingMethod::Max => e > threshold,
          _ => e < threshold,
        };
      }
    }
    MarkingMethod::L2 => {
      let squared: Vec<f64> = eta.iter().map(|e| e * e).collect();
      let mut order: Vec<usize> = (0..eta.len()).collect();
      order.sort_by(|&i, &j| squared[j].total_cmp(&squared[i]));

      let total: f64 = squared.iter().sum();
      let mut cumsum = 0.0;
      for &i in &order {
        cumsum += squared[i];
        if cumsum < theta * total {
          marked[i] = true;
        }
      }
      marked[order[0]] = true;
    }
  }

  debug!(
    "marked {} of {} cells with {:?}",
    marked.iter().filter(|&&m| m).count(),
    eta.len(),
    method
  );
  marked
}

/// Marker of an adaptive loop holding the indicator of the current leaf cells.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveMarker {
  pub eta: Vec<f64>,
  /// Refinement fraction.
  pub theta: f64,
  /// Coarsening fraction.
  pub ctheta: f64,
}

impl AdaptiveMarker {
  pub fn new(eta: Vec<f64>) -> Self {
    Self {
      eta,
      theta: 0.2,
      ctheta: 0.1,
    }
  }

  /// Leaf cells to refine, chosen by [`MarkingMethod::L2`] with `theta`.
  pub fn refine_marker(&self, leaf_cells: &[CellIdx]) -> FemResult<Vec<CellIdx>> {
    self.select(leaf_cells, self.theta, MarkingMethod::L2)
  }

  /// Leaf cells to coarsen, chosen by [`MarkingMethod::Coarsen`] with `ctheta`.
  pub fn coarsen_marker(&self, leaf_cells: &[CellIdx]) -> FemResult<Vec<CellIdx>> {
    self.select(leaf_cells, self.ctheta, MarkingMethod::Coarsen)
  }

  fn select(
    &self,
    leaf_cells: &[CellIdx],
    theta: f64,
    method: MarkingMethod,
  ) -> FemResult<Vec<CellIdx>> {
    if leaf_cells.len() != self.eta.len() {
      return Err(FemError::LengthMismatch {
        expected: self.eta.len(),
        found: leaf_cells.len(),
      });
    }
    let marked = mark(&self.eta, theta, method);
    Ok(
      leaf_cells
        .iter()
        .zip(marked)
        .filter_map(|(&icell, m)| m.then_some(icell))
        .collect(),
    )
  }
}
