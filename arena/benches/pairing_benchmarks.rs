use arena::{
    models::{Score, SquadId},
    pairing::{OpponentHistory, pair_ranked},
    standings::sort_standings,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use uuid::Uuid;

fn ranked_field(n: usize) -> Vec<SquadId> {
    (0..n).map(|i| Uuid::from_u128(i as u128 + 1)).collect()
}

/// History of a tournament after `rounds` rounds of adjacent pairings,
/// shifted by one seat each round
fn played_history(ranked: &[SquadId], rounds: usize) -> OpponentHistory {
    let mut history = OpponentHistory::new();
    let n = ranked.len();
    for round in 0..rounds {
        for table in (0..n).step_by(2) {
            let (a, b) = (ranked[(table + round) % n], ranked[(table + round + 1) % n]);
            history.entry(a).or_default().insert(b);
            history.entry(b).or_default().insert(a);
        }
    }
    history
}

/// Benchmark a first-round draw without history
fn bench_pair_fresh_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_fresh_field");

    for n in [8, 32, 128] {
        let ranked = ranked_field(n);
        let history = OpponentHistory::new();
        group.bench_with_input(BenchmarkId::from_parameter(n), &ranked, |b, ranked| {
            b.iter(|| pair_ranked(black_box(ranked), black_box(&history)));
        });
    }

    group.finish();
}

/// Benchmark a late-round draw where many neighbours already met
fn bench_pair_with_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_with_history");

    for n in [8, 32, 128] {
        let ranked = ranked_field(n);
        let history = played_history(&ranked, 5);
        group.bench_with_input(BenchmarkId::from_parameter(n), &ranked, |b, ranked| {
            b.iter(|| pair_ranked(black_box(ranked), black_box(&history)));
        });
    }

    group.finish();
}

/// Benchmark sorting a standings table
fn bench_sort_standings(c: &mut Criterion) {
    let scores: Vec<Score> = (0..256)
        .map(|i| Score::new(Uuid::from_u128(i + 1), (i % 13) as i32, vec![(i % 7) as i32, 0]))
        .collect();

    c.bench_function("sort_standings_256", |b| {
        b.iter(|| {
            let mut table = scores.clone();
            sort_standings(black_box(&mut table));
            table
        });
    });
}

criterion_group!(
    benches,
    bench_pair_fresh_field,
    bench_pair_with_history,
    bench_sort_standings
);
criterion_main!(benches);
