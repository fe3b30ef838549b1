use rand::distributions::uniform::SampleUniform;
use num_traits::{ Float, NumAssignOps, NumCast, Num };


/// All types that may be used in a [Tensor](crate::Tensor).
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Inner: PartialEq + Clone + Copy + std::fmt::Debug + 'static {}
impl<T: PartialEq + Clone + Copy + std::fmt::Debug + 'static> Inner for T {}


/// All numeric types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Numeric: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum {}
impl<T: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum> Numeric for T {}


/// Continuous numeric types that gradients can be computed for.
///
/// Implemented for `f32` and `f64`, each bringing its own
/// matrix multiplication kernel.

pub trait Real: Numeric + Float + SampleUniform + std::fmt::Display {
  /// Multiply row-major `lhs` `[m, k]` with row-major `rhs` `[k, n]`
  /// into row-major `out` `[m, n]`, overwriting its contents.
  fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self], out: &mut [Self]);

  fn from_f64(value: f64) -> Self {
    <Self as NumCast>::from(value).unwrap_or_else(Self::nan)
  }
}


/// Reference kernel, used when the `unsafe` feature is disabled.

pub fn naive_gemm<T: Numeric>(m: usize, k: usize, n: usize, lhs: &[T], rhs: &[T], out: &mut [T]) {
  for i in 0..m {
    for j in 0..n {
      let mut acc = T::zero();
      for l in 0..k {
        acc += lhs[i * k + l] * rhs[l * n + j];
      }
      out[i * n + j] = acc;
    }
  }
}

macro_rules! impl_real {
  ($t:ty, $kernel:ident) => {
    impl Real for $t {
      #[cfg(feature = "unsafe")]
      fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self], out: &mut [Self]) {
        assert!(lhs.len() >= m * k && rhs.len() >= k * n && out.len() >= m * n);
        if m == 0 || n == 0 { return }
        if k == 0 {
          out.iter_mut().for_each(|a| *a = 0.0 );
          return
        }
        unsafe {
          matrixmultiply::$kernel(
            m, k, n,
            1.0,
            lhs.as_ptr(), k as isize, 1,
            rhs.as_ptr(), n as isize, 1,
            0.0,
            out.as_mut_ptr(), n as isize, 1,
          );
        }
      }

      #[cfg(not(feature = "unsafe"))]
      fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self], out: &mut [Self]) {
        naive_gemm(m, k, n, lhs, rhs, out)
      }
    }
  };
}

impl_real!(f32, sgemm);
impl_real!(f64, dgemm);


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kernels_agree() {
    let lhs: Vec<f32> = (0..6).map(|i| i as f32 ).collect();
    let rhs: Vec<f32> = (0..12).map(|i| i as f32 * 0.5 ).collect();
    let mut fast = vec![0.0; 8];
    let mut slow = vec![0.0; 8];
    f32::gemm(2, 3, 4, &lhs, &rhs, &mut fast);
    naive_gemm(2, 3, 4, &lhs, &rhs, &mut slow);
    assert_eq!(fast, slow);
  }

  #[test]
  fn empty_inner_dimension() {
    let mut out = vec![7.0f64; 4];
    f64::gemm(2, 0, 2, &[], &[], &mut out);
    assert_eq!(out, vec![0.0; 4]);
  }
}
