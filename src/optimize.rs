use std::collections::HashMap;

use crate::{
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
};


/// An optimization strategy to be used with [Optimizer].

pub trait Strategy<R: Real> {
  fn update(&mut self, param: &Variable<R>, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R>;
}


/// Generic optimizer that allows for several optimization [strategies](Strategy) to be used.

#[derive(Debug)]
pub struct Optimizer<R: Real, S: Strategy<R>> {
  strategy: S,
  pub learning_rate: R,
  step: usize,
}

impl<R: Real, S: Strategy<R>> Optimizer<R, S> {
  pub fn new(learning_rate: R, strategy: S) -> Self {
    Self { strategy, learning_rate, step: 1 }
  }

  pub fn steps_taken(&self) -> usize {
    self.step - 1
  }

  /// Back-propagate `loss`, update `params` and reset all gradients.
  ///
  /// Gradients get reset even when the update is rejected, so the
  /// next call starts from a clean slate.

  pub fn minimize(&mut self, loss: &Variable<R>, params: &[Variable<R>]) -> Result<()> {
    // Compute gradients
    loss.backward();
    let result = self.apply(params);
    // Reset gradients
    loss.reset();
    result
  }

  fn apply(&mut self, params: &[Variable<R>]) -> Result<()> {
    // Validate every gradient before the strategy updates its state
    let grads = params.iter()
      .map(|param| {
        let grad = param.grad().ok_or(Error::Untrainable(param.id()))?;
        if !grad.all_finite() { return Err(Error::NonFinite("gradient")) }
        Ok(grad)
      })
      .collect::<Result<Vec<_>>>()?;

    // Gather all changes before touching any weights
    let changes: Vec<_> = params.iter()
      .zip(grads)
      .map(|(param, grad)| self.strategy.update(param, grad, self.learning_rate, self.step) )
      .collect();

    // Apply changes
    for (param, change) in params.iter().zip(changes) {
      let weights = param.tensor();
      weights.assign(&(weights + change));
    }

    self.step += 1;
    Ok(())
  }
}


/// Stochastic Gradient Descent strategy

#[derive(Debug, Clone, Default)]
pub struct SGD;

impl<R: Real> Strategy<R> for SGD {
  fn update(&mut self, _param: &Variable<R>, grad: &Tensor<R>, rate: R, _step: usize) -> Tensor<R> {
    grad * -rate
  }
}


/// Adaptive Movement Estimation strategy (ADAM)

#[derive(Debug, Clone)]
pub struct Adam<R: Real> {
  pub beta1: R,
  pub beta2: R,
  pub epsilon: R,
  m: HashMap<usize, Tensor<R>>,
  v: HashMap<usize, Tensor<R>>,
}

impl<R: Real> Adam<R> {
  pub fn new(beta1: R, beta2: R, epsilon: R) -> Self {
    Self {
      beta1,
      beta2,
      epsilon,
      m: HashMap::new(),
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Adam<R> {
  fn default() -> Self {
    Self::new(R::from_f64(0.9), R::from_f64(0.999), R::from_f64(1e-8))
  }
}

impl<R: Real> Strategy<R> for Adam<R> {
  fn update(&mut self, param: &Variable<R>, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R> {
    let id = param.id();
    let shape = param.shape();
    let m = self.m.entry(id).or_insert_with(|| Tensor::zeros(shape) );
    m.assign(&(&*m * self.beta1 + grad * (R::one() - self.beta1)));
    let v = self.v.entry(id).or_insert_with(|| Tensor::zeros(shape) );
    v.assign(&(&*v * self.beta2 + grad.powf(R::from_f64(2.0)) * (R::one() - self.beta2)));
    let step = R::from(step).unwrap_or_else(R::one);
    let mt = &self.m[&id] / (R::one() - self.beta1.powf(step));
    let vt = &self.v[&id] / (R::one() - self.beta2.powf(step));
    mt * -rate / (vt.sqrt() + self.epsilon)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::RealOps;

  fn quadratic(w: &Variable<f64>) -> Variable<f64> {
    ((w - 3.0) * (w - 3.0)).mean()
  }

  #[test]
  fn adam_descends() {
    let w = Tensor::vec(&[0.0, 10.0]).trained();
    let mut optimizer = Optimizer::new(0.1, Adam::default());
    let start = quadratic(&w).item();
    for _ in 0..200 {
      let loss = quadratic(&w);
      optimizer.minimize(&loss, &loss.parameters()).unwrap();
    }
    assert!(quadratic(&w).item() < start * 0.01);
    assert_eq!(optimizer.steps_taken(), 200);
  }

  #[test]
  fn adam_first_step_moves_by_learning_rate() {
    let w = Tensor::vec(&[0.0f64]).trained();
    let mut optimizer = Optimizer::new(0.001, Adam::default());
    let loss = quadratic(&w);
    optimizer.minimize(&loss, &loss.parameters()).unwrap();
    // Bias-corrected first step has magnitude ~lr regardless of gradient scale
    assert!((w.item() - 0.001).abs() < 1e-6);
  }

  #[test]
  fn sgd_follows_gradient() {
    let w = Tensor::vec(&[1.0f64]).trained();
    let mut optimizer = Optimizer::new(0.5, SGD);
    let loss = quadratic(&w);
    optimizer.minimize(&loss, &loss.parameters()).unwrap();
    // d/dw (w - 3)^2 = -4 at w = 1
    assert!((w.item() - 3.0).abs() < 1e-12);
  }

  fn adam_after_steps(rejected_first: bool) -> (f64, usize) {
    let w1 = Tensor::vec(&[0.5f64]).trained();
    let w2 = Tensor::vec(&[1.0f64]).trained();
    let mut optimizer = Optimizer::new(0.1, Adam::default());
    if rejected_first {
      let nan = Tensor::vec(&[f64::NAN]).tracked();
      let loss = quadratic(&w1) + (&w2 * &nan).mean();
      let result = optimizer.minimize(&loss, &[w1.clone(), w2.clone()]);
      assert!(matches!(result, Err(Error::NonFinite("gradient"))));
      assert_eq!(w1.item(), 0.5);
    }
    let loss = quadratic(&w1) + quadratic(&w2);
    optimizer.minimize(&loss, &[w1.clone(), w2.clone()]).unwrap();
    (w1.item(), optimizer.steps_taken())
  }

  #[test]
  fn rejected_step_leaves_no_trace() {
    assert_eq!(adam_after_steps(true), adam_after_steps(false));
    assert_eq!(adam_after_steps(true).1, 1);
  }

  #[test]
  fn constants_cannot_be_optimized() {
    let w = Tensor::vec(&[1.0f64]).trained();
    let c = Tensor::vec(&[1.0f64]).tracked();
    let loss = quadratic(&w);
    let mut optimizer = Optimizer::new(0.5, SGD);
    assert!(matches!(optimizer.minimize(&loss, &[c]), Err(Error::Untrainable(_))));
    assert_eq!(w.grad().unwrap().item(), 0.0);
  }
}
