use crate::{
  tensor::Tensor,
  scalar::{ Numeric, Real },
  ops::{ self, RealOps },
};


impl<T: Real> RealOps<T> for Tensor<T> {
  fn mm(&self, rhs: &Self) -> Self {
    self.matmul(rhs)
  }

  fn relu(&self) -> Self {
    self.vectorize(|a| if a > T::zero() { a } else { T::zero() })
  }

  fn sigmoid(&self) -> Self {
    self.vectorize(ops::sigmoid)
  }

  fn mean(&self) -> Self {
    let n = T::from(self.size()).unwrap_or_else(T::one);
    Tensor::scalar(self.sum() / n)
  }

  fn bce_with_logits(&self, targets: &Self) -> Self {
    self.zip(targets, ops::bce_with_logits).mean()
  }
}

impl<T: Real> std::ops::Neg for &Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Tensor<T> {
    self.vectorize(|a| -a )
  }
}

impl<T: Real> std::ops::Neg for Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Tensor<T> {
    -&self
  }
}

macro_rules! add_operator {
  ($op:ident, $meth:ident, $symbol:tt) => {
    impl<T: Numeric> std::ops::$op for &Tensor<T> { // &tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        self.zip(rhs, |a, b| a $symbol b )
      }
    }

    impl<T: Numeric> std::ops::$op for Tensor<T> { // tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        &self $symbol &rhs
      }
    }

    impl<T: Numeric> std::ops::$op<Tensor<T>> for &Tensor<T> { // &tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Tensor<T>) -> Tensor<T> {
        self $symbol &rhs
      }
    }

    impl<T: Numeric> std::ops::$op<&Tensor<T>> for Tensor<T> { // tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: &Tensor<T>) -> Tensor<T> {
        &self $symbol rhs
      }
    }

    impl<T: Numeric> std::ops::$op<T> for &Tensor<T> { // &tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        self.vectorize(|a| a $symbol rhs )
      }
    }

    impl<T: Numeric> std::ops::$op<T> for Tensor<T> { // tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        &self $symbol rhs
      }
    }
  };
}

add_operator!(Add, add, +);
add_operator!(Sub, sub, -);
add_operator!(Mul, mul, *);
add_operator!(Div, div, /);


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn relu_clamps_negatives() {
    let x = Tensor::vec(&[-1.0f32, 0.0, 2.5]);
    assert_eq!(x.relu(), Tensor::vec(&[0.0, 0.0, 2.5]));
  }

  #[test]
  fn bce_of_confident_match_is_small() {
    let logits = Tensor::new(&[1, 2], vec![10.0f64, -10.0]);
    let targets = Tensor::new(&[1, 2], vec![1.0, 0.0]);
    assert!(logits.bce_with_logits(&targets).item() < 1e-4);
  }

  #[test]
  fn scalar_arithmetic() {
    let x = Tensor::vec(&[1.0f32, 2.0]);
    assert_eq!(&x * 2.0 - 1.0, Tensor::vec(&[1.0, 3.0]));
    assert_eq!(&x / &x, Tensor::vec(&[1.0, 1.0]));
  }
}
