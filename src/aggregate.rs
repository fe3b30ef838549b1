use itertools::Itertools;

use crate::error::{ Error, Result };


/// Collects per-user accuracies for summarizing a benchmark run.

#[derive(Debug, Clone, Default)]
pub struct Accumulator {
  values: Vec<f64>,
}

impl Accumulator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, value: f64) {
    self.values.push(value);
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn mean(&self) -> f64 {
    mean(&self.values)
  }

  pub fn median(&self) -> Result<f64> {
    median(&self.values)
  }
}


/// Arithmetic mean, zero for no values.

pub fn mean(values: &[f64]) -> f64 {
  if values.is_empty() { return 0.0 }
  values.iter().sum::<f64>() / values.len() as f64
}

/// Middle value, or the mean of both middle values for an even count.

pub fn median(values: &[f64]) -> Result<f64> {
  let sorted: Vec<f64> = values.iter().copied().sorted_by(|a, b| a.total_cmp(b) ).collect();
  let n = sorted.len();
  match n {
    0 => Err(Error::EmptyAggregate),
    _ if n % 2 == 1 => Ok(sorted[n / 2]),
    _ => Ok((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mean_of_nothing_is_zero() {
    assert_eq!(mean(&[]), 0.0);
    assert_eq!(mean(&[0.5, 1.0, 0.0]), 0.5);
  }

  #[test]
  fn median_odd_and_even() {
    assert_eq!(median(&[0.9, 0.1, 0.5]).unwrap(), 0.5);
    assert_eq!(median(&[1.0, 0.0, 0.5, 0.25]).unwrap(), 0.375);
  }

  #[test]
  fn median_of_nothing_fails() {
    assert!(matches!(median(&[]), Err(Error::EmptyAggregate)));
    assert!(Accumulator::new().median().is_err());
  }

  #[test]
  fn accumulator() {
    let mut acc = Accumulator::new();
    for value in [1.0, 0.0, 0.0, 1.0, 1.0] {
      acc.push(value);
    }
    assert_eq!(acc.len(), 5);
    assert_eq!(acc.mean(), 0.6);
    assert_eq!(acc.median().unwrap(), 1.0);
  }
}
