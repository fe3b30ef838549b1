use std::path::PathBuf;

use anyhow::{ Context, Result };
use clap::Parser;
use itertools::Itertools;
use tracing_subscriber::EnvFilter;

use peruser::{ BenchmarkConfig, BenchmarkReport, SyntheticSource, run_per_user };


/// Train one small network per synthetic user and report how well
/// they predict each user's held-out ratings.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// JSON file with benchmark settings; flags below override it
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Numbers of users to benchmark
  #[arg(short, long, value_delimiter = ',')]
  users: Option<Vec<usize>>,

  /// Numbers of reviews per user to benchmark
  #[arg(short, long, value_delimiter = ',')]
  reviews: Option<Vec<usize>>,

  /// Training epochs per user
  #[arg(long)]
  epochs: Option<usize>,

  #[arg(long)]
  learning_rate: Option<f32>,

  /// Fraction of each user's ratings used for training
  #[arg(long)]
  split: Option<f64>,

  /// Seed for data generation and weight initialization
  #[arg(long)]
  seed: Option<u64>,

  /// Print each result as a JSON line instead of text
  #[arg(long, default_value_t = false)]
  json: bool,
}

impl Args {
  fn into_config(self) -> Result<BenchmarkConfig> {
    let mut config = match &self.config {
      Some(path) => BenchmarkConfig::load(path)
        .with_context(|| format!("loading config from {}", path.display()))?,
      None => BenchmarkConfig::default(),
    };
    if let Some(users) = self.users { config.users = users }
    if let Some(reviews) = self.reviews { config.reviews = reviews }
    if let Some(epochs) = self.epochs { config.epochs = epochs }
    if let Some(rate) = self.learning_rate { config.learning_rate = rate }
    if let Some(split) = self.split { config.split = split }
    if self.seed.is_some() { config.seed = self.seed }
    config.validate().context("invalid settings")?;
    Ok(config)
  }
}


fn format_map(entries: &[(String, f64)]) -> String {
  let body = entries.iter()
    .map(|(label, value)| format!("'{label}': {value}") )
    .join(", ");
  format!("{{{body}}}")
}

fn print_report(report: &BenchmarkReport, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string(report)?);
  } else {
    println!(
      "accuracy for {} num users and {} reviews per user is {} and the median is {}",
      report.users, report.reviews_per_user, report.accuracy, report.median,
    );
    println!("time taken was {}", report.elapsed.as_secs_f64());
  }
  Ok(())
}


fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let json = args.json;
  let config = args.into_config()?;
  let mut source = SyntheticSource::new(config.seed);

  let mut accuracies = Vec::new();
  let mut times = Vec::new();
  for (users, reviews) in config.grid() {
    let report = run_per_user(&mut source, users, reviews, &config)
      .with_context(|| format!("benchmarking {users} users with {reviews} reviews each"))?;
    print_report(&report, json)?;
    accuracies.push((report.label(), report.accuracy));
    times.push((report.label(), report.elapsed.as_secs_f64()));
  }

  if !json {
    println!("{}", format_map(&accuracies));
    println!("{}", format_map(&times));
  }
  Ok(())
}
