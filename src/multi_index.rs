//! Enumerations of polynomial exponent tuples.
//!
//! Every local basis function of a nodal or monomial space is identified by one
//! row of a [`MultiIndexMatrix`]. The row order is fixed and is the local DOF
//! order of the spaces built on top of it.

use itertools::Itertools;

/// Inverts the triangular numbering `k = i0 (i0 + 1) / 2 + j`.
///
/// Returns `(i, j)` with `i = i0 - j`, so `k` enumerates all pairs with
/// `i + j = i0` before moving on to `i0 + 1`.
pub fn triangular_pair(k: usize) -> (usize, usize) {
  let mut i0 = ((-1.0 + (1.0 + 8.0 * k as f64).sqrt()) / 2.0).floor() as usize;
  // float estimate can be off by one for large `k`
  while (i0 + 1) * (i0 + 2) / 2 <= k {
    i0 += 1;
  }
  while i0 * (i0 + 1) / 2 > k {
    i0 -= 1;
  }
  let j = k - i0 * (i0 + 1) / 2;
  (i0 - j, j)
}

/// Linear index of the monomial `x^a y^b` in [`MultiIndexMatrix::monomial`] order.
pub fn monomial_index(a: usize, b: usize) -> usize {
  let n = a + b;
  n * (n + 1) / 2 + b
}

pub fn ndofs_edge(p: usize) -> usize {
  p + 1
}
pub fn ndofs_triangle(p: usize) -> usize {
  (p + 1) * (p + 2) / 2
}
pub fn ndofs_prism(p: usize) -> usize {
  ndofs_edge(p) * ndofs_triangle(p)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiIndexMatrix {
  degree: usize,
  rows: Vec<Vec<usize>>,
}

impl MultiIndexMatrix {
  /// Rows `(p - k, k)` for `k = 0..=p`.
  pub fn edge(p: usize) -> Self {
    let rows = (0..=p).map(|k| vec![p - k, k]).collect();
    Self { degree: p, rows }
  }

  /// Rows `(p - i0, i0 - j, j)` in triangular order. Row sums are `p`.
  pub fn triangle(p: usize) -> Self {
    let rows = (0..ndofs_triangle(p))
      .map(|k| {
        let (i, j) = triangular_pair(k);
        vec![p - i - j, i, j]
      })
      .collect();
    Self { degree: p, rows }
  }

  /// Exponents `(a, b)` of all monomials `x^a y^b` with `a + b <= p`.
  pub fn monomial(p: usize) -> Self {
    let rows = (0..ndofs_triangle(p))
      .map(|k| {
        let (a, b) = triangular_pair(k);
        vec![a, b]
      })
      .collect();
    Self { degree: p, rows }
  }

  /// Vertex weights of the nodal points of a prism.
  ///
  /// Tensor product of [`Self::edge`] in the layer direction and
  /// [`Self::triangle`] in the base. Local index `l = i * ldof2 + k`, the
  /// bottom vertices carry `w1[i][0] * w2[k]`, the top ones `w1[i][1] * w2[k]`.
  /// Row sums are `p^2`.
  pub fn prism(p: usize) -> Self {
    let w1 = Self::edge(p);
    let w2 = Self::triangle(p);
    let rows = w1
      .iter()
      .cartesian_product(w2.iter())
      .map(|(e, t)| {
        let bottom = t.iter().map(|&w| e[0] * w);
        let top = t.iter().map(|&w| e[1] * w);
        bottom.chain(top).collect()
      })
      .collect();
    Self { degree: p, rows }
  }

  pub fn degree(&self) -> usize {
    self.degree
  }
  pub fn nrows(&self) -> usize {
    self.rows.len()
  }
  pub fn ncomps(&self) -> usize {
    self.rows.first().map_or(0, |r| r.len())
  }
  pub fn row(&self, k: usize) -> &[usize] {
    &self.rows[k]
  }
  pub fn iter(&self) -> impl ExactSizeIterator<Item = &[usize]> + Clone {
    self.rows.iter().map(|r| r.as_slice())
  }

  /// Number of non-zero components of row `k`.
  pub fn support_size(&self, k: usize) -> usize {
    self.rows[k].iter().filter(|&&w| w != 0).count()
  }

  /// Row `k` divided by its sum, i.e. convex weights of the cell vertices.
  ///
  /// The zero row of degree 0 maps to the vertex average.
  pub fn convex_weights(&self, k: usize) -> na::DVector<f64> {
    let row = &self.rows[k];
    let n = row.len();
    let sum: usize = row.iter().sum();
    if sum == 0 {
      return na::DVector::from_element(n, 1.0 / n as f64);
    }
    na::DVector::from_iterator(n, row.iter().map(|&w| w as f64 / sum as f64))
  }
}
