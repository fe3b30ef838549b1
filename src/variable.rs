use std::collections::HashSet;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::fmt::Debug;

mod mops;

use crate::{
  internal::*,
  tensor::Tensor,
  scalar::Real,
};


pub fn make_id() -> usize {
  static LAST_ID: AtomicUsize = AtomicUsize::new(0);
  LAST_ID.fetch_add(1, Ordering::Relaxed)
}


/// Unary computational operation that can also compute its derivative.

pub trait UnaryOp<T: Real>: Debug {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T>;
  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T>;
}


/// Binary computational operation that can also compute its derivative.

pub trait BinaryOp<T: Real>: Debug {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T>;
  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>);
}


#[derive(Debug)]
enum Op<T: Real> {
  Unary(Box<dyn UnaryOp<T>>),
  Binary(Box<dyn BinaryOp<T>>),
}


/// Node in a computation graph, containing a [Variable]'s data and gradient,
/// as well as the operation used to create it.

#[derive(Debug)]
struct Node<T: Real> {
  id: usize,
  data: Tensor<T>,
  grad: Option<Tensor<T>>,
  op: Option<Op<T>>,
  previous: Vec<RcT<Self>>,
  trainable: bool,
}

impl<T: Real> Node<T> {
  fn reset_gradient(&self, filler: T) {
    if let Some(grad) = &self.grad {
      grad.refill(filler);
    }
  }

  fn backward(&self) {
    let (Some(op), Some(grad)) = (&self.op, &self.grad) else { return };
    let lhs = &self.previous[0].data;
    let changes = match op {
      Op::Unary(op) => vec![op.derive(lhs, grad)],
      Op::Binary(op) => {
        let (l, r) = op.derive(lhs, &self.previous[1].data, grad);
        vec![l, r]
      },
    };
    for (change, prev) in changes.iter().zip(self.previous.iter()) {
      if let Some(grad) = &prev.grad {
        grad.op_assign(change, |a, b| *a += b );
      }
    }
  }
}


/// Variables track the computational operations used to create them and allow
/// for computing their gradient with respect to all input variables involved.
///
/// They get created by calling [tracked](Tensor::tracked) or
/// [trained](Tensor::trained) on a [Real] tensor.
///
/// Variables dereference to their underlying [Tensor] automatically for
/// non-differentiable operations. Differentiable operations, on the other hand,
/// will always return another Variable.

#[derive(Debug, Clone)]
pub struct Variable<T: Real> {
  node: RcT<Node<T>>,
}

impl<T: Real> std::ops::Deref for Variable<T> {
  type Target = Tensor<T>;

  fn deref(&self) -> &Self::Target {
    &self.node.data
  }
}

impl<T: Real> Variable<T> {
  pub(crate) fn from_tensor(tensor: Tensor<T>, trainable: bool) -> Self {
    Self {
      node: RcT::new(Node {
        id: make_id(),
        grad: trainable.then(|| Tensor::zeros(tensor.shape()) ),
        data: tensor,
        op: None,
        previous: vec![],
        trainable,
      }),
    }
  }

  fn operation(op: Op<T>, data: Tensor<T>, grad: bool, previous: Vec<RcT<Node<T>>>) -> Self {
    Self {
      node: RcT::new(Node {
        id: make_id(),
        grad: grad.then(|| Tensor::zeros(data.shape()) ),
        data,
        op: Some(op),
        previous,
        trainable: false,
      }),
    }
  }

  pub fn id(&self) -> usize {
    self.node.id
  }

  pub fn tensor(&self) -> &Tensor<T> {
    &self.node.data
  }

  pub fn grad(&self) -> Option<&Tensor<T>> {
    self.node.grad.as_ref()
  }

  pub fn is_trainable(&self) -> bool {
    self.node.trainable
  }

  pub fn unary_op(&self, op: impl UnaryOp<T> + 'static) -> Self {
    let data = op.run(&self.node.data);
    Self::operation(
      Op::Unary(Box::new(op)),
      data,
      self.grad().is_some(),
      vec![self.node.clone()],
    )
  }

  pub fn binary_op(&self, op: impl BinaryOp<T> + 'static, rhs: &Self) -> Self {
    let data = op.run(&self.node.data, &rhs.node.data);
    Self::operation(
      Op::Binary(Box::new(op)),
      data,
      self.grad().is_some() || rhs.grad().is_some(),
      vec![self.node.clone(), rhs.node.clone()],
    )
  }

  /// Compute gradients across this Variable's entire graph.
  ///
  /// Gradients accumulate until [reset](Variable::reset) gets called.

  pub fn backward(&self) {
    assert!(self.grad().is_some(), "Cannot compute gradients for constant {self}");
    self.node.reset_gradient(T::one());
    for node in self.history().iter().rev() {
      node.backward();
    }
  }

  /// List all trainable parameters in this Variable's graph.

  pub fn parameters(&self) -> Vec<Self> {
    self.history()
      .into_iter()
      .filter(|node| node.trainable )
      .map(|node| Self { node } )
      .collect()
  }

  /// Set gradients to zero for this Variable's entire graph.

  pub fn reset(&self) {
    for node in self.history() {
      node.reset_gradient(T::zero());
    }
  }

  fn history(&self) -> Vec<RcT<Node<T>>> {
    let mut history = vec![];
    Self::history_recurse(&self.node, &mut history, &mut HashSet::new());
    history
  }

  fn history_recurse(node: &RcT<Node<T>>, history: &mut Vec<RcT<Node<T>>>, visited: &mut HashSet<usize>) {
    if !visited.insert(node.id) { return }
    for prev in &node.previous {
      Self::history_recurse(prev, history, visited);
    }
    history.push(node.clone());
  }

  /// Compute a function's gradient with respect to a generated
  /// input numerically and compare it to the automatically derived
  /// solution.
  ///
  /// Returns the mean absolute difference between both gradients.

  pub fn check_gradients<F>(input: &Tensor<T>, generator: F) -> T
  where
    F: Fn(&Self) -> Self
  {
    let eps = T::from_f64(1e-3);
    let two = T::from_f64(2.0);
    let var = input.detach().trained();
    let output = generator(&var);
    output.backward();
    let grad = var.grad().map(|g| g.to_vec() ).unwrap_or_default();
    let len = input.size();
    let mut diff = T::zero();
    for i in 0..len {
      let probe = |delta: T| {
        let shifted = input.detach();
        shifted.raw_mut()[i] += delta;
        generator(&shifted.tracked()).item()
      };
      let numeric = (probe(eps) - probe(-eps)) / (two * eps);
      diff += (numeric - grad[i]).abs();
    }
    diff / T::from(len.max(1)).unwrap_or_else(T::one)
  }

  pub fn tracked(&self) -> Self { panic!("Tensor is already being tracked") }
  pub fn trained(&self) -> Self { panic!("Tensor is already being tracked") }
}

impl<T: Real> std::fmt::Display for Variable<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let title = if self.node.trainable { "Trainable" } else {
      if self.node.grad.is_some() { "Computed" } else { "Tracked" }
    };
    write!(f, "{title} {}", self.tensor())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn x_squared() {
    let x = Tensor::vec(&[3.0, 5.0]).trained();
    let z = &x * &x + 2.0;
    z.backward();
    assert_eq!(*z.tensor(), Tensor::vec(&[11.0, 27.0]));
    assert_eq!(x.grad(), Some(&Tensor::vec(&[6.0, 10.0])));
  }

  #[test]
  fn parameters_are_found_once() {
    let w = Tensor::vec(&[1.0f32, 2.0]).trained();
    let x = Tensor::vec(&[3.0, 4.0]).tracked();
    let y = &(&w * &x) + &w;
    let params = y.parameters();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].id(), w.id());
  }

  #[test]
  fn reset_clears_gradients() {
    let w = Tensor::vec(&[1.0f64, 2.0]).trained();
    let y = &w * 3.0;
    y.backward();
    assert_eq!(w.grad(), Some(&Tensor::vec(&[3.0, 3.0])));
    y.reset();
    assert_eq!(w.grad(), Some(&Tensor::vec(&[0.0, 0.0])));
  }

  #[test]
  #[should_panic]
  fn constants_have_no_gradient() {
    let c = Tensor::vec(&[1.0f32]).tracked();
    c.backward();
  }
}
