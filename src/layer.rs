use rand::Rng;

use crate::{
  ops::RealOps,
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
};


/// Fully connected layer storing its trainable tensors explicitly.
///
/// Weights have shape `[input_size, size]`, so inputs are multiplied
/// from the left. Both weights and bias are drawn from
/// `U(-1/sqrt(input_size), 1/sqrt(input_size))`.

#[derive(Debug, Clone)]
pub struct Dense<R: Real> {
  weights: Variable<R>,
  bias: Variable<R>,
}

impl<R: Real> Dense<R> {
  pub fn new(input_size: usize, size: usize, rng: &mut impl Rng) -> Self {
    let bound = R::one() / R::from(input_size.max(1)).unwrap_or_else(R::one).sqrt();
    Self {
      weights: Tensor::uniform(&[input_size, size], -bound, bound, rng).trained(),
      bias: Tensor::uniform(&[size], -bound, bound, rng).trained(),
    }
  }

  pub fn input_size(&self) -> usize {
    self.weights.dim(0)
  }

  pub fn size(&self) -> usize {
    self.weights.dim(1)
  }

  /// Run the layer, recording the computation for back-propagation.

  pub fn run(&self, input: &Variable<R>) -> Variable<R> {
    input.mm(&self.weights) + &self.bias
  }

  /// Run the layer without building a computation graph.

  pub fn infer(&self, input: &Tensor<R>) -> Tensor<R> {
    input.mm(self.weights.tensor()) + self.bias.tensor()
  }

  pub fn parameters(&self) -> [Variable<R>; 2] {
    [self.weights.clone(), self.bias.clone()]
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{ SeedableRng, rngs::StdRng };

  #[test]
  fn initialization_is_bounded() {
    let mut rng = StdRng::seed_from_u64(7);
    let layer: Dense<f32> = Dense::new(16, 8, &mut rng);
    assert_eq!((layer.input_size(), layer.size()), (16, 8));
    let bound = 0.25;
    for param in layer.parameters() {
      assert!(param.raw().iter().all(|w| w.abs() <= bound ));
      assert!(param.is_trainable());
    }
  }

  #[test]
  fn run_and_infer_agree() {
    let mut rng = StdRng::seed_from_u64(3);
    let layer: Dense<f64> = Dense::new(4, 3, &mut rng);
    let input = Tensor::uniform(&[5, 4], -1.0, 1.0, &mut rng);
    let traced = layer.run(&input.tracked());
    assert_eq!(traced.shape(), &[5, 3]);
    assert_eq!(*traced.tensor(), layer.infer(&input));
  }
}
