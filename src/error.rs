use thiserror::Error;


/// Errors produced while preparing data, training or aggregating results.

#[derive(Debug, Error)]
pub enum Error {
  #[error("{field} encoding has width {actual}, expected {expected}")]
  Encoding { field: &'static str, expected: usize, actual: usize },

  #[error("shape mismatch: {0}")]
  Shape(String),

  #[error("non-finite {0} encountered during training")]
  NonFinite(&'static str),

  #[error("parameter {0} has no gradient and cannot be optimized")]
  Untrainable(usize),

  #[error("cannot aggregate an empty set of results")]
  EmptyAggregate,

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
