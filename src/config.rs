use std::path::Path;

use serde::{ Serialize, Deserialize };

use crate::error::{ Error, Result };


/// Hyperparameters and parameter grid of a benchmark run.
///
/// Every field has a default, so a config file only needs to name
/// the values it changes.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConfig {
  /// Full-batch training epochs per user.
  pub epochs: usize,
  pub learning_rate: f32,
  /// Fraction of each user's history used for training.
  pub split: f64,
  /// Largest intensity difference still counted as a correct prediction.
  pub tolerance: usize,
  /// Output probability at which a rating level counts as predicted.
  pub threshold: f32,
  /// Seeds both data generation and weight initialization when set.
  pub seed: Option<u64>,
  pub users: Vec<usize>,
  pub reviews: Vec<usize>,
}

impl Default for BenchmarkConfig {
  fn default() -> Self {
    Self {
      epochs: 25,
      learning_rate: 0.001,
      split: 0.8,
      tolerance: 2,
      threshold: 0.5,
      seed: None,
      users: vec![250],
      reviews: vec![5, 10, 25, 100, 200],
    }
  }
}

impl BenchmarkConfig {
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let text = std::fs::read_to_string(path)?;
    let config: Self = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if !(0.0..=1.0).contains(&self.split) {
      return Err(Error::Config(format!("split must lie in [0, 1], got {}", self.split)))
    }
    if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
      return Err(Error::Config(format!("learning rate must be positive, got {}", self.learning_rate)))
    }
    if !(0.0..=1.0).contains(&self.threshold) {
      return Err(Error::Config(format!("threshold must lie in [0, 1], got {}", self.threshold)))
    }
    if self.users.is_empty() || self.reviews.is_empty() {
      return Err(Error::Config("parameter grid is empty".into()))
    }
    Ok(())
  }

  /// All `(users, reviews per user)` combinations, users varying slowest.

  pub fn grid(&self) -> Vec<(usize, usize)> {
    self.users.iter()
      .flat_map(|&users| self.reviews.iter().map(move |&reviews| (users, reviews) ))
      .collect()
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_grid() {
    let config = BenchmarkConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.grid(), vec![(250, 5), (250, 10), (250, 25), (250, 100), (250, 200)]);
  }

  #[test]
  fn partial_file() {
    let config: BenchmarkConfig = serde_json::from_str(r#"{ "epochs": 5, "users": [10, 20] }"#).unwrap();
    assert_eq!(config.epochs, 5);
    assert_eq!(config.learning_rate, 0.001);
    assert_eq!(config.grid().len(), 10);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<BenchmarkConfig>(r#"{ "epoch": 5 }"#).is_err());
  }

  #[test]
  fn invalid_values() {
    let config = BenchmarkConfig { split: 1.5, ..Default::default() };
    assert!(matches!(config.validate(), Err(Error::Config(_))));
    let config = BenchmarkConfig { learning_rate: 0.0, ..Default::default() };
    assert!(config.validate().is_err());
    let config = BenchmarkConfig { reviews: vec![], ..Default::default() };
    assert!(config.validate().is_err());
  }

  #[test]
  fn load_from_file() {
    let path = std::env::temp_dir().join(format!("peruser-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "seed": 9, "reviews": [3] }"#).unwrap();
    let config = BenchmarkConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.seed, Some(9));
    assert_eq!(config.grid(), vec![(250, 3)]);
  }
}
