use crate::scalar::Real;


/// Convert a literal into the working float type.

#[inline]
pub fn real<T: Real>(value: f64) -> T {
  T::from(value).unwrap_or_else(T::nan)
}

#[inline]
pub fn count<T: Real>(n: usize) -> T {
  T::from(n).unwrap_or_else(T::nan)
}
