use criterion::{ black_box, criterion_group, criterion_main, BenchmarkId, Criterion };
use rand::{ SeedableRng, rngs::StdRng };

use peruser::{ BenchmarkConfig, DataSource, SyntheticSource, run_user };


fn single_user(c: &mut Criterion) {
  let config = BenchmarkConfig::default();
  let mut group = c.benchmark_group("per_user");
  for reviews in [5, 25, 200] {
    let mut source = SyntheticSource::new(Some(reviews as u64));
    let users = source.prepare(1, reviews).expect("synthetic data");
    let user = &users[0];
    let mut rng = StdRng::seed_from_u64(0);
    group.bench_with_input(BenchmarkId::new("train_and_evaluate", reviews), user, |b, user| {
      b.iter(|| run_user(black_box(user), &config, &mut rng) )
    });
  }
  group.finish();
}

criterion_group!(benches, single_user);
criterion_main!(benches);
