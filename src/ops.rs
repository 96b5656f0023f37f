use crate::{
  tensor::Tensor,
  scalar::Real,
};


/// Element- and row-wise operations on real valued tensors
/// that the layers and the loss function are made of.

pub trait RealOps<I: Real>: Sized {
  fn relu(&self) -> Self;
  fn sigmoid(&self) -> Self;
  fn exp(&self) -> Self;

  /// Numerically stable `log(softmax(x))` over the last dimension,
  /// computed as `(x - max) - log(sum(exp(x - max)))`.
  fn log_softmax(&self) -> Self;

  /// Mask that is one wherever the input is positive.
  fn positive(&self) -> Self;

  fn softmax(&self) -> Self {
    self.log_softmax().exp()
  }
}

impl<T: Real> RealOps<T> for Tensor<T> {
  fn relu(&self) -> Self {
    self.vectorize(|a| a.max(T::zero()) )
  }

  fn sigmoid(&self) -> Self {
    self.vectorize(|a| T::one() / (T::one() + (-a).exp()) )
  }

  fn exp(&self) -> Self {
    self.vectorize(|a| a.exp() )
  }

  fn log_softmax(&self) -> Self {
    self.map_rows(|row| {
      let max = row.iter().copied().fold(T::neg_infinity(), T::max);
      let sum: T = row.iter().map(|&a| (a - max).exp() ).sum();
      let log_sum = sum.ln();
      row.iter().map(|&a| a - max - log_sum ).collect()
    })
  }

  fn positive(&self) -> Self {
    self.vectorize(|a| if a > T::zero() { T::one() } else { T::zero() })
  }
}
