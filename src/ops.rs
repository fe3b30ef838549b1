use crate::scalar::Real;


/// Differentiable operations, implemented for both [Tensor](crate::Tensor)
/// and [Variable](crate::Variable).
///
/// Called on a tensor, these simply compute their result. Called on
/// a variable, they also record themselves in the computation graph.

pub trait RealOps<I: Real>: Sized {
  /// Matrix product of two rank 2 operands.
  fn mm(&self, rhs: &Self) -> Self;

  fn relu(&self) -> Self;

  fn sigmoid(&self) -> Self;

  /// Mean over all elements, producing a scalar.
  fn mean(&self) -> Self;

  /// Binary cross entropy between `self`, interpreted as logits,
  /// and `targets` in [0, 1], averaged over all elements.
  ///
  /// Uses the numerically stable formulation
  /// `max(x, 0) - x * y + ln(1 + exp(-|x|))`.
  fn bce_with_logits(&self, targets: &Self) -> Self;
}


#[inline]
pub(crate) fn sigmoid<I: Real>(x: I) -> I {
  I::one() / (I::one() + (-x).exp())
}

#[inline]
pub(crate) fn bce_with_logits<I: Real>(x: I, y: I) -> I {
  x.max(I::zero()) - x * y + (I::one() + (-x.abs()).exp()).ln()
}
