use itertools::Itertools;
use serde::{ Serialize, Deserialize };


/// The shape of a [Tensor](crate::Tensor).
///
/// Tensors are always stored contiguously in row-major order,
/// so a shape is nothing more than its dimensions.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
  pub dims: Vec<usize>,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    Self { dims: dims.to_vec() }
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  /// Number of rows of a matrix. Vectors count as a single row.

  pub fn rows(&self) -> usize {
    match self.rank() {
      0 | 1 => 1,
      n => self.dims[..n - 1].iter().product(),
    }
  }

  /// Length of the innermost dimension.

  pub fn cols(&self) -> usize {
    self.dims.last().copied().unwrap_or(1)
  }

  pub(crate) fn strides(&self) -> Vec<usize> {
    if self.rank() == 0 { return vec![] }
    let mut strides = vec![1; self.rank()];
    for i in (1..self.rank()).rev() {
      strides[i - 1] = self.dims[i] * strides[i];
    }
    strides
  }

  pub(crate) fn index(&self, indices: &[usize]) -> usize {
    assert!(indices.len() <= self.rank());
    indices.iter()
      .zip(self.strides())
      .map(|(&i, s)| i * s )
      .sum()
  }
}

impl std::ops::Index<usize> for Shape {
  type Output = usize;

  fn index(&self, i: usize) -> &usize {
    &self.dims[i]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape[{}]", self.dims.iter().join(", "))
  }
}
