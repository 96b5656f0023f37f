use std::ops::Range;

use rand::Rng;
use serde::{ Serialize, Deserialize };

mod cops;

pub use cops::Gemm;

use crate::{
  internal::*,
  shape::Shape,
  scalar::{ Inner, Numeric, Real },
};


/// Dense, row-major array of up to two dimensions.
///
/// Tensors own their data. Every operation returns a fresh tensor,
/// with the exception of the explicit in-place updates used by
/// the [optimizer](crate::optimize).

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor<T>")]
pub struct Tensor<T: Inner> {
  shape: Shape,
  data: Vec<T>,
}

/// Deserialized form of a [Tensor], before its shape has been checked
/// against its data.

#[derive(Deserialize)]
struct RawTensor<T> {
  shape: Shape,
  data: Vec<T>,
}

impl<T: Inner> TryFrom<RawTensor<T>> for Tensor<T> {
  type Error = String;

  fn try_from(raw: RawTensor<T>) -> Result<Self, Self::Error> {
    if raw.shape.size() != raw.data.len() {
      return Err(format!("{} doesn't match data length {}", raw.shape, raw.data.len()))
    }
    Ok(Self { shape: raw.shape, data: raw.data })
  }
}

impl<T: Inner> Tensor<T> {
  pub fn from_shape(shape: Shape, data: Vec<T>) -> Self {
    assert_eq!(shape.size(), data.len(),
      "{} doesn't match data length {}", shape, data.len());
    Self { shape, data }
  }

  pub fn new(shape: &[usize], data: Vec<T>) -> Self {
    Self::from_shape(Shape::new(shape), data)
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn fill(shape: &[usize], filler: T) -> Self {
    Self::new(shape, vec![filler; shape.iter().product()])
  }

  /// Stack equally long rows into a `[rows.len(), cols]` matrix.

  pub fn rows(rows: &[Vec<T>], cols: usize) -> Self {
    let mut data = Vec::with_capacity(rows.len() * cols);
    for row in rows {
      assert_eq!(row.len(), cols, "Row of length {} doesn't fit {} columns", row.len(), cols);
      data.extend_from_slice(row);
    }
    Self::new(&[rows.len(), cols], data)
  }

  pub fn shape(&self) -> &Shape {
    &self.shape
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  pub fn raw(&self) -> &[T] {
    &self.data
  }

  pub fn raw_mut(&mut self) -> &mut [T] {
    &mut self.data
  }

  pub fn at(&self, indices: &[usize]) -> T {
    assert_eq!(indices.len(), self.rank(), "Index {:?} doesn't address an item of {}", indices, self.shape);
    self.data[self.shape.index(indices)]
  }

  pub fn item(&self) -> T {
    assert!(self.size() == 1,
      "Can't extract item from non-scalar {}", self.shape);
    self.data[0]
  }

  /// Borrow a single row of a matrix.

  pub fn row(&self, index: usize) -> &[T] {
    let cols = self.shape.cols();
    &self.data[index * cols..(index + 1) * cols]
  }

  pub fn row_iter(&self) -> impl Iterator<Item = &[T]> + '_ {
    let cols = self.shape.cols().max(1);
    self.data.chunks(cols)
  }

  /// Copy a contiguous range of rows into a new matrix.

  pub fn row_range(&self, range: Range<usize>) -> Self {
    assert!(range.end <= self.shape.rows(),
      "Rows {:?} out of bounds for {}", range, self.shape);
    let cols = self.shape.cols();
    let data = self.data[range.start * cols..range.end * cols].to_vec();
    Self::new(&[range.len(), cols], data)
  }

  pub fn zip<O,F>(&self, rhs: &Self, mut cb: F) -> Tensor<O>
  where
    O: Inner,
    F: FnMut((T, T)) -> O,
  {
    assert_eq!(self.shape, rhs.shape,
      "Could not combine {} & {} tensors", self.shape, rhs.shape);
    let data = self.data.iter()
      .zip(rhs.data.iter())
      .map(|(&a, &b)| cb((a, b)) )
      .collect();
    Tensor::from_shape(self.shape.clone(), data)
  }

  pub fn vectorize<O,F>(&self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: FnMut(T) -> O,
  {
    let data = self.data.iter().copied().map(cb).collect();
    Tensor::from_shape(self.shape.clone(), data)
  }

  /// Map every row of a matrix to a new row of equal length.

  pub fn map_rows<F>(&self, mut cb: F) -> Self
  where
    F: FnMut(&[T]) -> Vec<T>,
  {
    let cols = self.shape.cols();
    let mut data = Vec::with_capacity(self.size());
    for row in self.row_iter() {
      let mapped = cb(row);
      assert_eq!(mapped.len(), cols, "Row mapping must preserve row length");
      data.extend(mapped);
    }
    Self::from_shape(self.shape.clone(), data)
  }

  pub fn feed(&mut self, other: &Self) {
    assert_eq!(self.shape, other.shape,
      "Could not feed {} tensor with {} tensor", self.shape, other.shape);
    self.data.copy_from_slice(&other.data);
  }
}

impl<T: Numeric> Tensor<T> {
  pub fn zeros(shape: &[usize]) -> Self {
    Self::fill(shape, T::zero())
  }

  pub fn ones(shape: &[usize]) -> Self {
    Self::fill(shape, T::one())
  }

  pub fn add(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a + b )
  }

  pub fn sub(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a - b )
  }

  pub fn mul(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a * b )
  }

  pub fn div(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a / b )
  }

  /// Add a vector to every row of a matrix.

  pub fn add_row(&self, row: &Self) -> Self {
    assert_eq!(row.size(), self.shape.cols(),
      "Could not add {} row to {} matrix", row.shape, self.shape);
    let bias = row.raw();
    self.map_rows(|values| {
      values.iter()
        .zip(bias)
        .map(|(&a, &b)| a + b )
        .collect()
    })
  }

  /// Sum a matrix over its rows, yielding a vector of column totals.

  pub fn sum_rows(&self) -> Self {
    let mut sums = vec![T::zero(); self.shape.cols()];
    for row in self.row_iter() {
      for (sum, &a) in sums.iter_mut().zip(row) {
        *sum += a;
      }
    }
    Self::from_vec(sums)
  }

  pub fn sum(&self) -> T {
    self.data.iter().copied().sum()
  }

  /// Index of the greatest value in every row. Ties resolve to the lowest index.

  pub fn argmax_rows(&self) -> Vec<usize> {
    self.row_iter()
      .map(|row| {
        let mut index = 0;
        for (i, &value) in row.iter().enumerate() {
          if value > row[index] { index = i }
        }
        index
      })
      .collect()
  }

  pub fn from_vec(vec: Vec<T>) -> Self {
    Self::new(&[vec.len()], vec)
  }
}

impl<T: Gemm> Tensor<T> {
  fn matmul(&self, rhs: &Self, transpose_lhs: bool, transpose_rhs: bool) -> Self {
    assert!(self.rank() == 2 && rhs.rank() == 2,
      "Matrix multiplication needs matrices, got {} & {}", self.shape, rhs.shape);
    let (rows_l, cols_l) = (self.shape[0], self.shape[1]);
    let (rows_r, cols_r) = (rhs.shape[0], rhs.shape[1]);

    let (m, k, strides_l) = if transpose_lhs {
      (cols_l, rows_l, [1, cols_l])
    } else {
      (rows_l, cols_l, [cols_l, 1])
    };
    let (inner, n, strides_r) = if transpose_rhs {
      (cols_r, rows_r, [1, cols_r])
    } else {
      (rows_r, cols_r, [cols_r, 1])
    };
    assert_eq!(k, inner,
      "Could not multiply {} & {} matrices", self.shape, rhs.shape);

    let mut data = vec![T::zero(); m * n];
    if m * n > 0 && k > 0 {
      T::gemm([m, k, n], &self.data, strides_l, &rhs.data, strides_r, &mut data);
    }
    Self::new(&[m, n], data)
  }

  /// Matrix product `self * rhs`.

  pub fn mm(&self, rhs: &Self) -> Self {
    self.matmul(rhs, false, false)
  }

  /// Matrix product `self^T * rhs`, without materializing the transpose.

  pub fn t_mm(&self, rhs: &Self) -> Self {
    self.matmul(rhs, true, false)
  }

  /// Matrix product `self * rhs^T`, without materializing the transpose.

  pub fn mm_t(&self, rhs: &Self) -> Self {
    self.matmul(rhs, false, true)
  }
}

impl<T: Real> Tensor<T> {
  pub fn uniform(shape: &[usize], low: T, high: T, rng: &mut impl Rng) -> Self {
    let data = (0..shape.iter().product())
      .map(|_| rng.gen_range(low, high) )
      .collect();
    Self::new(shape, data)
  }

  /// Glorot (Xavier) uniform initialization for a `[fan_in, fan_out]` matrix.

  pub fn glorot_uniform(shape: &[usize], rng: &mut impl Rng) -> Self {
    let fan: usize = shape.iter().sum();
    let limit = (real::<T>(6.0) / count::<T>(fan.max(1))).sqrt();
    Self::uniform(shape, -limit, limit, rng)
  }

  /// Draw a mask that keeps every entry with probability `keep`.

  pub fn bernoulli(shape: &[usize], keep: T, rng: &mut impl Rng) -> Self {
    let data = (0..shape.iter().product())
      .map(|_| if rng.gen_range(T::zero(), T::one()) < keep { T::one() } else { T::zero() })
      .collect();
    Self::new(shape, data)
  }

  pub fn all_close(&self, rhs: &Self, tolerance: T) -> bool {
    self.shape == rhs.shape && self.data.iter()
      .zip(rhs.data.iter())
      .all(|(&a, &b)| (a - b).abs() <= tolerance )
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident) => {
    impl<T: Numeric> std::ops::$trait for &Tensor<T> { // &tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        Tensor::$meth(self, rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait for Tensor<T> { // tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        Tensor::$meth(&self, &rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<&Tensor<T>> for Tensor<T> { // tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: &Tensor<T>) -> Tensor<T> {
        Tensor::$meth(&self, rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for &Tensor<T> { // &tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        self.vectorize(|a| std::ops::$trait::$meth(a, rhs) )
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for Tensor<T> { // tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        self.vectorize(|a| std::ops::$trait::$meth(a, rhs) )
      }
    }
  };
}

add_operator!(Add, add);
add_operator!(Sub, sub);
add_operator!(Mul, mul);
add_operator!(Div, div);

impl<T: Numeric> std::ops::AddAssign<&Tensor<T>> for Tensor<T> {
  fn add_assign(&mut self, rhs: &Tensor<T>) {
    assert_eq!(self.shape, rhs.shape,
      "Could not add {} tensor to {} tensor", rhs.shape, self.shape);
    for (a, &b) in self.data.iter_mut().zip(rhs.data.iter()) {
      *a += b;
    }
  }
}

impl<T: Inner> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    if self.rank() < 2 {
      return write!(f, "{:?}", self.data)
    }
    write!(f, "[\n")?;
    for row in self.row_iter() {
      write!(f, "  {:?}\n", row)?;
    }
    write!(f, "]")
  }
}
