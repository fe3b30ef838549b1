//! Per-user rating records, their feature encoding and a synthetic
//! source to generate them.

use rand::{ Rng, SeedableRng, rngs::StdRng };
use tracing::debug;

use crate::{
  error::{ Error, Result },
  tensor::Tensor,
};


pub const GENRES: usize = 10;
pub const LANGUAGES: usize = 3;
pub const VOTE_AVG_BUCKETS: usize = 3;
pub const VOTE_COUNT_BUCKETS: usize = 10;
pub const RATING_LEVELS: usize = 10;

/// Width of the model input built by [UserRecord::features].
pub const FEATURES: usize = GENRES + VOTE_AVG_BUCKETS + LANGUAGES + VOTE_COUNT_BUCKETS;


/// One rating of a movie by a user, with the movie's categorical encodings.

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
  pub user_id: usize,
  pub movie_id: usize,
  rating: Vec<f32>,
  genre: Vec<f32>,
  lang: Vec<f32>,
  vote_avg: Vec<f32>,
  vote_count: Vec<f32>,
}

fn check_width(field: &'static str, encoding: &[f32], expected: usize) -> Result<()> {
  if encoding.len() == expected {
    Ok(())
  } else {
    Err(Error::Encoding { field, expected, actual: encoding.len() })
  }
}

impl UserRecord {
  pub fn new(
    user_id: usize,
    movie_id: usize,
    rating: Vec<f32>,
    genre: Vec<f32>,
    lang: Vec<f32>,
    vote_avg: Vec<f32>,
    vote_count: Vec<f32>,
  ) -> Result<Self> {
    check_width("rating", &rating, RATING_LEVELS)?;
    check_width("genre", &genre, GENRES)?;
    check_width("lang", &lang, LANGUAGES)?;
    check_width("vote_avg", &vote_avg, VOTE_AVG_BUCKETS)?;
    check_width("vote_count", &vote_count, VOTE_COUNT_BUCKETS)?;
    Ok(Self { user_id, movie_id, rating, genre, lang, vote_avg, vote_count })
  }

  /// Model input: genre, vote average, language and vote count encodings,
  /// concatenated in that order.

  pub fn features(&self) -> Vec<f32> {
    [&self.genre[..], &self.vote_avg[..], &self.lang[..], &self.vote_count[..]].concat()
  }

  /// Multi-hot rating label: the rating's intensity is the number of set entries.

  pub fn rating(&self) -> &[f32] {
    &self.rating
  }

  pub fn genre(&self) -> &[f32] {
    &self.genre
  }

  pub fn lang(&self) -> &[f32] {
    &self.lang
  }

  pub fn vote_avg(&self) -> &[f32] {
    &self.vote_avg
  }

  pub fn vote_count(&self) -> &[f32] {
    &self.vote_count
  }

  /// Number of set entries in the rating label.

  pub fn intensity(&self) -> usize {
    self.rating.iter().sum::<f32>().round().max(0.0) as usize
  }
}


/// Rating history of one user, in the order it was generated.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDataset {
  pub user_id: usize,
  pub records: Vec<UserRecord>,
}

impl UserDataset {
  pub fn new(user_id: usize, records: Vec<UserRecord>) -> Self {
    Self { user_id, records }
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Split by position into leading training rows and trailing test rows.
  /// The training part holds `floor(len * ratio)` rows.

  pub fn split(&self, ratio: f64) -> (&[UserRecord], &[UserRecord]) {
    self.records.split_at(split_index(self.len(), ratio))
  }
}


pub fn split_index(len: usize, ratio: f64) -> usize {
  ((len as f64 * ratio).floor() as usize).min(len)
}

/// Stack the feature vectors of `rows` into a `[rows, FEATURES]` matrix.

pub fn features_matrix(rows: &[UserRecord]) -> Tensor<f32> {
  let rows: Vec<_> = rows.iter().map(UserRecord::features).collect();
  Tensor::rows(&rows, FEATURES)
}

/// Stack the rating labels of `rows` into a `[rows, RATING_LEVELS]` matrix.

pub fn labels_matrix(rows: &[UserRecord]) -> Tensor<f32> {
  let rows: Vec<_> = rows.iter().map(|row| row.rating.clone() ).collect();
  Tensor::rows(&rows, RATING_LEVELS)
}


/// Provider of per-user rating histories.

pub trait DataSource {
  fn prepare(&mut self, num_users: usize, reviews_per_user: usize) -> Result<Vec<UserDataset>>;
}


pub fn one_hot(index: usize, size: usize) -> Vec<f32> {
  let mut hot = vec![0.0; size];
  hot[index] = 1.0;
  hot
}

/// Multi-hot label with the first `level` entries set.

pub fn multi_hot(level: usize, size: usize) -> Vec<f32> {
  (0..size).map(|i| if i < level { 1.0 } else { 0.0 }).collect()
}


#[derive(Debug, Clone)]
struct Movie {
  genre: usize,
  lang: usize,
  vote_avg: usize,
  vote_count: usize,
}


/// Generates users with a hidden taste for each genre and rates
/// randomly drawn movies from a fixed catalog accordingly.
///
/// Ratings are `1..=10`: a per-user base level, shifted by the user's
/// affinity for the movie's genre and by the movie's vote average
/// bucket, plus a little noise.

#[derive(Debug, Clone)]
pub struct SyntheticSource {
  rng: StdRng,
  catalog_size: usize,
}

impl SyntheticSource {
  pub fn new(seed: Option<u64>) -> Self {
    let rng = match seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    Self { rng, catalog_size: 1000 }
  }

  pub fn with_catalog_size(mut self, catalog_size: usize) -> Self {
    self.catalog_size = catalog_size.max(1);
    self
  }

  fn catalog(&mut self) -> Vec<Movie> {
    let rng = &mut self.rng;
    (0..self.catalog_size).map(|_| Movie {
      genre: rng.gen_range(0, GENRES),
      lang: rng.gen_range(0, LANGUAGES),
      vote_avg: rng.gen_range(0, VOTE_AVG_BUCKETS),
      vote_count: rng.gen_range(0, VOTE_COUNT_BUCKETS),
    }).collect()
  }

  fn user(&mut self, user_id: usize, reviews: usize, catalog: &[Movie]) -> Result<UserDataset> {
    let rng = &mut self.rng;
    let base: f32 = rng.gen_range(3.0, 8.0);
    let affinity: Vec<f32> = (0..GENRES).map(|_| rng.gen_range(-3.0, 3.0) ).collect();
    let records = (0..reviews).map(|_| {
      let movie_id = rng.gen_range(0, catalog.len());
      let movie = &catalog[movie_id];
      let noise: f32 = rng.gen_range(-1.0, 1.0);
      let score = base + affinity[movie.genre] + (movie.vote_avg as f32 - 1.0) + noise;
      let level = score.round().max(1.0).min(RATING_LEVELS as f32) as usize;
      UserRecord::new(
        user_id,
        movie_id,
        multi_hot(level, RATING_LEVELS),
        one_hot(movie.genre, GENRES),
        one_hot(movie.lang, LANGUAGES),
        one_hot(movie.vote_avg, VOTE_AVG_BUCKETS),
        one_hot(movie.vote_count, VOTE_COUNT_BUCKETS),
      )
    }).collect::<Result<Vec<_>>>()?;
    Ok(UserDataset::new(user_id, records))
  }
}

impl DataSource for SyntheticSource {
  fn prepare(&mut self, num_users: usize, reviews_per_user: usize) -> Result<Vec<UserDataset>> {
    let catalog = self.catalog();
    debug!(num_users, reviews_per_user, catalog = catalog.len(), "generating synthetic users");
    (0..num_users)
      .map(|user_id| self.user(user_id, reviews_per_user, &catalog) )
      .collect()
  }
}
