//! Per-user recommendation benchmark.
//!
//! For every synthetic user, a tiny feed-forward network gets trained from
//! scratch on that user's rating history and evaluated on the user's most
//! recent ratings. Accuracy and wall-clock time are summarized over all users.
//!
//! The networks run on a small reverse-mode autodiff engine included in this
//! crate: [Tensor]s hold data, [Variable]s record the operations applied to
//! them, and an [Optimizer](optimize::Optimizer) updates trainable variables
//! using a [Strategy](optimize::Strategy) such as [Adam](optimize::Adam).
//!
//! # Examples
//!
//! Running the benchmark for a handful of users:
//! ```
//! use peruser::{ BenchmarkConfig, SyntheticSource, run_per_user };
//!
//! let config = BenchmarkConfig { seed: Some(42), ..Default::default() };
//! let mut source = SyntheticSource::new(config.seed);
//! let report = run_per_user(&mut source, 10, 20, &config).unwrap();
//! assert!((0.0..=1.0).contains(&report.accuracy));
//! ```
//!
//! Minimizing a function with the autodiff engine:
//! ```
//! use peruser::{ ops::*, Tensor, optimize::{ Optimizer, Adam } };
//!
//! let w = Tensor::vec(&[0.0f32, 4.0]).trained();
//! let mut optimizer = Optimizer::new(0.05, Adam::default());
//! for _ in 0..100 {
//!   let loss = ((&w - 1.0) * (&w - 1.0)).mean();
//!   optimizer.minimize(&loss, &loss.parameters()).unwrap();
//! }
//! ```
//!
//! # Optional features
//!
//! - `unsafe` *(default)*: accelerated matrix math using the [matrixmultiply] crate.

mod internal;
mod tensor;
mod variable;

pub mod aggregate;
pub mod benchmark;
pub mod config;
pub mod data;
pub mod error;
pub mod layer;
pub mod model;
pub mod ops;
pub mod optimize;
pub mod scalar;

pub use benchmark::{ BenchmarkReport, UserOutcome, run_per_user, run_user };
pub use config::BenchmarkConfig;
pub use data::{ DataSource, SyntheticSource, UserDataset, UserRecord };
pub use error::{ Error, Result };
pub use model::MovieModel;
pub use tensor::Tensor;
pub use variable::{ Variable, UnaryOp, BinaryOp };
