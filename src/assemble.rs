use crate::{dof::DofMap, error::FemResult, CellIdx};

use itertools::Itertools;

pub type GalMat = nas::CsrMatrix<f64>;
pub type GalVec = na::DVector<f64>;

pub trait ElMatProvider {
  fn eval(&self, icell: CellIdx) -> FemResult<na::DMatrix<f64>>;
}
impl<F> ElMatProvider for F
where
  F: Fn(CellIdx) -> FemResult<na::DMatrix<f64>>,
{
  fn eval(&self, icell: CellIdx) -> FemResult<na::DMatrix<f64>> {
    self(icell)
  }
}

pub trait ElVecProvider {
  fn eval(&self, icell: CellIdx) -> FemResult<na::DVector<f64>>;
}
impl<F> ElVecProvider for F
where
  F: Fn(CellIdx) -> FemResult<na::DVector<f64>>,
{
  fn eval(&self, icell: CellIdx) -> FemResult<na::DVector<f64>> {
    self(icell)
  }
}

/// Assembly algorithm for the Galerkin Matrix.
///
/// Element matrices are scattered through the cell-to-dof maps of the test
/// (rows) and trial (columns) space. Contributions to the same global entry
/// are summed.
pub fn assemble_galmat(
  row_dofs: &DofMap,
  col_dofs: &DofMap,
  elmat: impl ElMatProvider,
) -> FemResult<GalMat> {
  assert!(row_dofs.ncells() == col_dofs.ncells());

  let mut triplets = Vec::new();
  for icell in 0..row_dofs.ncells() {
    let elmat = elmat.eval(icell)?;
    let row_globals = row_dofs.local2global(icell);
    let col_globals = col_dofs.local2global(icell);

    for (ilocal, &iglobal) in row_globals.iter().enumerate() {
      for (jlocal, &jglobal) in col_globals.iter().enumerate() {
        let val = elmat[(ilocal, jlocal)];
        if val != 0.0 {
          triplets.push((iglobal, jglobal, val));
        }
      }
    }
  }

  let (rows, cols, values) = triplets.into_iter().multiunzip();
  let coo = nas::CooMatrix::try_from_triplets(
    row_dofs.ndofs(),
    col_dofs.ndofs(),
    rows,
    cols,
    values,
  )
  .expect("Global dof indices are within the dof count.");
  Ok(GalMat::from(&coo))
}

/// Assembly algorithm for the Galerkin Vector.
pub fn assemble_galvec(dofs: &DofMap, elvec: impl ElVecProvider) -> FemResult<GalVec> {
  let mut galvec = na::DVector::zeros(dofs.ndofs());
  for icell in 0..dofs.ncells() {
    let elvec = elvec.eval(icell)?;
    for (ilocal, &iglobal) in dofs.local2global(icell).iter().enumerate() {
      galvec[iglobal] += elvec[ilocal];
    }
  }
  Ok(galvec)
}

#[cfg(test)]
mod test {
  use super::*;

  use approx::assert_relative_eq;

  #[test]
  fn duplicates_are_summed() {
    // two cells sharing dof 1
    let dofs = DofMap::new(vec![vec![0, 1], vec![1, 2]], 3);
    let elmat = |_: CellIdx| -> FemResult<na::DMatrix<f64>> { Ok(na::dmatrix![1.0, -1.0; -1.0, 1.0]) };
    let galmat = assemble_galmat(&dofs, &dofs, elmat).unwrap();
    let dense = na::DMatrix::from(&galmat);
    let expected = na::dmatrix![
      1.0, -1.0, 0.0;
      -1.0, 2.0, -1.0;
      0.0, -1.0, 1.0;
    ];
    assert_relative_eq!(dense, expected);

    let elvec = |_: CellIdx| -> FemResult<na::DVector<f64>> { Ok(na::dvector![0.5, 0.5]) };
    let galvec = assemble_galvec(&dofs, elvec).unwrap();
    assert_relative_eq!(galvec, na::dvector![0.5, 1.0, 0.5]);
  }
}
