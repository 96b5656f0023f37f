use crate::scalar::Numeric;


/// Low-level matrix multiplication kernel.
///
/// Computes `c = a * b` for a `[m, k]` matrix `a` and a `[k, n]` matrix `b`,
/// both addressed through `[row, column]` strides, writing into the
/// zero-initialized, contiguous `[m, n]` buffer `c`.

pub trait Gemm: Numeric {
  fn gemm(
    dims: [usize; 3],
    a: &[Self], a_strides: [usize; 2],
    b: &[Self], b_strides: [usize; 2],
    c: &mut [Self],
  );
}

#[cfg(any(test, not(feature = "unsafe")))]
pub(crate) fn naive_gemm<T: Numeric>(
  [m, k, n]: [usize; 3],
  a: &[T], [rsa, csa]: [usize; 2],
  b: &[T], [rsb, csb]: [usize; 2],
  c: &mut [T],
) {
  for i in 0..m {
    for p in 0..k {
      let x = a[i * rsa + p * csa];
      for j in 0..n {
        c[i * n + j] += x * b[p * rsb + j * csb];
      }
    }
  }
}

#[cfg(not(feature = "unsafe"))]
macro_rules! naive_kernel {
  ($t:ty) => {
    impl Gemm for $t {
      fn gemm(dims: [usize; 3], a: &[$t], sa: [usize; 2], b: &[$t], sb: [usize; 2], c: &mut [$t]) {
        naive_gemm(dims, a, sa, b, sb, c)
      }
    }
  };
}

#[cfg(not(feature = "unsafe"))]
naive_kernel!(f32);

#[cfg(not(feature = "unsafe"))]
naive_kernel!(f64);

#[cfg(feature = "unsafe")]
impl Gemm for f32 {
  fn gemm([m, k, n]: [usize; 3], a: &[f32], sa: [usize; 2], b: &[f32], sb: [usize; 2], c: &mut [f32]) {
    assert!(c.len() >= m * n);
    unsafe {
      matrixmultiply::sgemm(
        m,
        k,
        n,
        1.0,
        a.as_ptr(),
        sa[0] as isize,
        sa[1] as isize,
        b.as_ptr(),
        sb[0] as isize,
        sb[1] as isize,
        0.0,
        c.as_mut_ptr(),
        n as isize,
        1,
      );
    }
  }
}

#[cfg(feature = "unsafe")]
impl Gemm for f64 {
  fn gemm([m, k, n]: [usize; 3], a: &[f64], sa: [usize; 2], b: &[f64], sb: [usize; 2], c: &mut [f64]) {
    assert!(c.len() >= m * n);
    unsafe {
      matrixmultiply::dgemm(
        m,
        k,
        n,
        1.0,
        a.as_ptr(),
        sa[0] as isize,
        sa[1] as isize,
        b.as_ptr(),
        sb[0] as isize,
        sb[1] as isize,
        0.0,
        c.as_mut_ptr(),
        n as isize,
        1,
      );
    }
  }
}
