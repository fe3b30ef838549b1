//! Per-user training and evaluation loop.

use std::time::{ Duration, Instant };

use rand::{ SeedableRng, rngs::StdRng };
use serde::Serialize;
use tracing::{ debug, info, trace, warn };

use crate::{
  aggregate::Accumulator,
  config::BenchmarkConfig,
  data::{ DataSource, UserDataset, UserRecord, features_matrix, labels_matrix },
  error::{ Error, Result },
  model::MovieModel,
  optimize::{ Adam, Optimizer },
  tensor::Tensor,
};


/// Summary of one benchmark run over all users.

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
  pub users: usize,
  pub reviews_per_user: usize,
  /// Mean of per-user accuracies.
  pub accuracy: f64,
  /// Median of per-user accuracies.
  pub median: f64,
  /// Wall-clock time of the per-user loop, excluding data generation.
  pub elapsed: Duration,
  /// Training epochs that failed and were skipped, over all users.
  pub failed_epochs: usize,
}

impl BenchmarkReport {
  pub fn label(&self) -> String {
    format!("{} num_users + {} reviews per user", self.users, self.reviews_per_user)
  }
}


/// Outcome of training and evaluating a single user's model.

#[derive(Debug, Clone, PartialEq)]
pub struct UserOutcome {
  pub accuracy: f64,
  pub train_rows: usize,
  pub test_rows: usize,
  pub failed_epochs: usize,
}


/// A freshly trained model along with how its training went.

#[derive(Debug)]
pub struct Trained {
  pub model: MovieModel,
  pub failed_epochs: usize,
  pub final_loss: Option<f32>,
}


fn train_epoch(
  model: &MovieModel,
  optimizer: &mut Optimizer<f32, Adam<f32>>,
  features: &Tensor<f32>,
  labels: &Tensor<f32>,
) -> Result<f32> {
  let loss = model.loss(features, labels)?;
  let value = loss.item();
  if !value.is_finite() { return Err(Error::NonFinite("loss")) }
  optimizer.minimize(&loss, &model.parameters())?;
  Ok(value)
}


/// Train a new model on `rows` as a single batch.
///
/// Epochs that fail get logged and skipped; training carries on
/// with whatever parameters the model has at that point.

pub fn train_user(rows: &[UserRecord], config: &BenchmarkConfig, rng: &mut StdRng) -> Trained {
  let model = MovieModel::new(rng);
  let mut trained = Trained { model, failed_epochs: 0, final_loss: None };
  let features = features_matrix(rows);
  let labels = labels_matrix(rows);
  let mut optimizer = Optimizer::new(config.learning_rate, Adam::default());

  for epoch in 0..config.epochs {
    match train_epoch(&trained.model, &mut optimizer, &features, &labels) {
      Ok(loss) => {
        trace!(epoch, loss, "epoch finished");
        trained.final_loss = Some(loss);
      },
      Err(err) => {
        warn!(epoch, %err, "training epoch failed");
        trained.failed_epochs += 1;
      },
    }
  }
  trained
}


/// Fraction of `rows` whose predicted intensity lies within the configured
/// tolerance of the labelled intensity. Zero for no rows.

pub fn evaluate_user(model: &MovieModel, rows: &[UserRecord], config: &BenchmarkConfig) -> f64 {
  if rows.is_empty() { return 0.0 }
  let predictions = model.predict(&features_matrix(rows));
  let correct = rows.iter().enumerate()
    .filter(|(i, row)| {
      let predicted = predictions.row(*i).count(|p| p >= config.threshold );
      let actual = row.intensity();
      trace!(predicted, actual, "prediction");
      predicted.abs_diff(actual) <= config.tolerance
    })
    .count();
  correct as f64 / rows.len() as f64
}


/// Split, train and evaluate one user.
///
/// A user without training rows scores zero, as there is no model
/// fitted to them to evaluate.

pub fn run_user(dataset: &UserDataset, config: &BenchmarkConfig, rng: &mut StdRng) -> UserOutcome {
  let (train, test) = dataset.split(config.split);
  let trained = train_user(train, config, rng);
  let accuracy = if train.is_empty() {
    debug!(user = dataset.user_id, "empty training split");
    0.0
  } else {
    evaluate_user(&trained.model, test, config)
  };
  debug!(
    user = dataset.user_id,
    accuracy,
    loss = ?trained.final_loss,
    failed_epochs = trained.failed_epochs,
    "user evaluated"
  );
  UserOutcome {
    accuracy,
    train_rows: train.len(),
    test_rows: test.len(),
    failed_epochs: trained.failed_epochs,
  }
}


/// Generate `num_users` users with `reviews_per_user` ratings each,
/// train an independent model per user and summarize their accuracies.

pub fn run_per_user(
  source: &mut impl DataSource,
  num_users: usize,
  reviews_per_user: usize,
  config: &BenchmarkConfig,
) -> Result<BenchmarkReport> {
  let users = source.prepare(num_users, reviews_per_user)?;
  info!(device = "cpu", users = users.len(), reviews_per_user, "starting per-user benchmark");

  let mut rng = match config.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };
  let mut accuracies = Accumulator::new();
  let mut failed_epochs = 0;

  let start = Instant::now();
  for dataset in &users {
    let outcome = run_user(dataset, config, &mut rng);
    failed_epochs += outcome.failed_epochs;
    accuracies.push(outcome.accuracy);
  }
  let elapsed = start.elapsed();

  Ok(BenchmarkReport {
    users: num_users,
    reviews_per_user,
    accuracy: accuracies.mean(),
    median: accuracies.median()?,
    elapsed,
    failed_epochs,
  })
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::{ SyntheticSource, multi_hot, one_hot, GENRES, LANGUAGES, VOTE_AVG_BUCKETS, VOTE_COUNT_BUCKETS, RATING_LEVELS };
  use crate::ops::RealOps;

  fn config() -> BenchmarkConfig {
    BenchmarkConfig { seed: Some(17), ..Default::default() }
  }

  fn record(genre: usize, level: usize) -> UserRecord {
    UserRecord::new(
      0, genre,
      multi_hot(level, RATING_LEVELS),
      one_hot(genre, GENRES),
      one_hot(0, LANGUAGES),
      one_hot(1, VOTE_AVG_BUCKETS),
      one_hot(genre, VOTE_COUNT_BUCKETS),
    ).unwrap()
  }

  #[test]
  fn end_to_end() {
    let mut source = SyntheticSource::new(Some(1));
    let report = run_per_user(&mut source, 250, 5, &config()).unwrap();
    assert!((0.0..=1.0).contains(&report.accuracy));
    assert!((0.0..=1.0).contains(&report.median));
    assert!(report.elapsed > Duration::ZERO);
    assert_eq!(report.users, 250);
    assert_eq!(report.failed_epochs, 0);
    assert_eq!(report.label(), "250 num_users + 5 reviews per user");
  }

  #[test]
  fn unseeded_runs_stay_in_bounds() {
    let config = BenchmarkConfig::default();
    let mut source = SyntheticSource::new(None);
    for _ in 0..2 {
      let report = run_per_user(&mut source, 8, 10, &config).unwrap();
      assert!((0.0..=1.0).contains(&report.accuracy));
      assert!((0.0..=1.0).contains(&report.median));
    }
  }

  #[test]
  fn single_review_scores_zero() {
    let dataset = UserDataset::new(0, vec![record(1, 5)]);
    let mut rng = StdRng::seed_from_u64(0);
    let outcome = run_user(&dataset, &config(), &mut rng);
    assert_eq!(outcome.train_rows, 0);
    assert_eq!(outcome.test_rows, 1);
    assert_eq!(outcome.accuracy, 0.0);
    // The mean loss over zero rows is undefined, so every epoch gets skipped
    assert_eq!(outcome.failed_epochs, config().epochs);
  }

  #[test]
  fn no_users_is_an_error() {
    let mut source = SyntheticSource::new(Some(2));
    assert!(matches!(run_per_user(&mut source, 0, 5, &config()), Err(Error::EmptyAggregate)));
  }

  #[test]
  fn training_reduces_loss() {
    let rows: Vec<_> = (0..40).map(|i| record(i % GENRES, 1 + i % RATING_LEVELS) ).collect();
    let config = BenchmarkConfig { epochs: 200, learning_rate: 0.01, ..config() };
    let mut rng = StdRng::seed_from_u64(5);
    let initial = MovieModel::new(&mut rng.clone())
      .loss(&features_matrix(&rows), &labels_matrix(&rows)).unwrap().item();
    let trained = train_user(&rows, &config, &mut rng);
    assert_eq!(trained.failed_epochs, 0);
    assert!(trained.final_loss.unwrap() < initial);
  }

  #[test]
  fn evaluation_counts_within_tolerance() {
    let mut rng = StdRng::seed_from_u64(9);
    let model = MovieModel::new(&mut rng);
    let rows: Vec<_> = (0..=RATING_LEVELS).map(|level| record(3, level) ).collect();
    let predicted = model.predict(&features_matrix(&rows[..1])).count(|p| p >= 0.5 );
    // Every row shares the same features, so the prediction is shared too
    let expected = rows.iter()
      .filter(|row| predicted.abs_diff(row.intensity()) <= 2 )
      .count();
    let accuracy = evaluate_user(&model, &rows, &config());
    assert_eq!(accuracy, expected as f64 / rows.len() as f64);
    assert!(accuracy > 0.0 && accuracy < 1.0);
  }

  #[test]
  fn accuracy_is_bounded() {
    let mut source = SyntheticSource::new(Some(4));
    let mut rng = StdRng::seed_from_u64(4);
    for dataset in source.prepare(30, 12).unwrap() {
      let outcome = run_user(&dataset, &config(), &mut rng);
      assert!((0.0..=1.0).contains(&outcome.accuracy));
      assert_eq!(outcome.train_rows, 9);
      assert_eq!(outcome.test_rows, 3);
    }
  }

  #[test]
  fn predictions_match_traced_forward() {
    let mut rng = StdRng::seed_from_u64(6);
    let model = MovieModel::new(&mut rng);
    let rows = vec![record(2, 4), record(7, 8)];
    let features = features_matrix(&rows);
    assert_eq!(model.predict(&features), *model.run(&features.tracked()).tensor());
    assert_eq!(model.run(&features.tracked()).mean().shape(), &[] as &[usize]);
  }
}
