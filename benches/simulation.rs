//! Criterion benchmarks for numbersim.
//!
//! Run with:
//!   cargo bench
//!   cargo bench --features parallel
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use numbersim::prelude::*;
use numbersim::recorder;

fn english(trial_count: usize, seed: u64) -> Simulation {
    Simulation::new(
        RunConfig {
            trial_count,
            runs: 16,
            ..RunConfig::default()
        }
        .with_seed(seed),
    )
    .expect("valid config")
}

/// Trial synthesis at increasing sequence lengths.
fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_trials");

    for count in [100usize, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("ztnb", count), count, |b, &count| {
            let sim = english(count, 42);
            let mut rng = Prng::new(42);
            b.iter(|| black_box(sim.generate_trials(&mut rng).expect("trials").len()));
        });
    }

    group.finish();
}

/// Update rule alone vs. update plus snapshot recording.
fn bench_learning(c: &mut Criterion) {
    let mut group = c.benchmark_group("learning");
    let sim = english(1_000, 7);
    let trials = sim
        .generate_trials(&mut Prng::new(7))
        .expect("trials");
    group.throughput(Throughput::Elements(trials.len() as u64));

    group.bench_function("apply_trial", |b| {
        b.iter(|| {
            let mut state = sim.fresh_state();
            for t in &trials {
                state.apply_trial(t).expect("apply");
            }
            black_box(state.strength(0, 0))
        });
    });

    group.bench_function("record", |b| {
        b.iter(|| {
            let mut state = sim.fresh_state();
            black_box(recorder::run(&mut state, &trials).expect("run").rows.len())
        });
    });

    group.finish();
}

/// Whole sweep; compare with and without `--features parallel`.
fn bench_sweep(c: &mut Criterion) {
    let sim = english(2_000, 3);
    c.bench_function("sweep_16_runs", |b| {
        b.iter(|| black_box(sweep(&sim).expect("sweep").all_learned));
    });
}

criterion_group!(benches, bench_generate, bench_learning, bench_sweep);
criterion_main!(benches);
