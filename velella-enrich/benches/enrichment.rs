use criterion::{black_box, criterion_group, criterion_main, Criterion};
use velella_enrich::enrichment::{run_enrichment, EnrichmentConfig, FactorSelection, TestMode};
use velella_enrich::feature_sets::{build_index, FeatureSets, MembershipMatrix};
use velella_enrich::feature_stats::{feature_statistics, FeatureStatistic, Transform};
use velella_enrich::matrix::NamedMatrix;
use velella_enrich::permutation::permutation_test;
use velella_enrich::set_statistics::{set_statistics, SetStatistic};

fn random_f64(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

fn names(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn random_named(rows: usize, cols: usize, seed: u64, rp: &str, cp: &str) -> NamedMatrix {
    NamedMatrix::from_flat(random_f64(rows * cols, seed), names(rp, rows), names(cp, cols))
        .expect("shape matches names")
}

/// `n_sets` disjoint sets of `set_size` consecutive features each.
fn block_sets(n_features: usize, n_sets: usize, set_size: usize) -> FeatureSets {
    let rows: Vec<Vec<f64>> = (0..n_sets)
        .map(|s| {
            let mut row = vec![0.0; n_features];
            for m in 0..set_size {
                row[(s * set_size + m) % n_features] = 1.0;
            }
            row
        })
        .collect();
    FeatureSets::Matrix(
        MembershipMatrix::new(rows, names("set", n_sets), names("f", n_features))
            .expect("valid membership"),
    )
}

fn bench_feature_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_statistics");

    let data = random_named(2_000, 100, 42, "f", "s");
    let loadings = random_named(2_000, 5, 7, "f", "factor");
    let scores = random_named(100, 5, 11, "s", "factor");

    group.bench_function("cor_2k_features_5_factors", |b| {
        b.iter(|| {
            feature_statistics(
                black_box(&data),
                black_box(&loadings),
                black_box(&scores),
                FeatureStatistic::Cor,
                Transform::AbsValue,
            )
        })
    });

    group.finish();
}

fn bench_set_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_statistics");

    let feature_stats = random_named(2_000, 5, 13, "f", "factor");
    let sets = block_sets(2_000, 50, 30);
    let membership = sets.to_membership().expect("matrix form");
    let index = build_index(&membership, &names("f", 2_000), 10);

    group.bench_function("mean_diff_50_sets", |b| {
        b.iter(|| {
            set_statistics(
                black_box(&feature_stats),
                black_box(&index),
                SetStatistic::MeanDiff,
                false,
                None,
            )
        })
    });

    group.bench_function("rank_sum_50_sets", |b| {
        b.iter(|| {
            set_statistics(
                black_box(&feature_stats),
                black_box(&index),
                SetStatistic::RankSum,
                false,
                None,
            )
        })
    });

    group.finish();
}

fn bench_permutation(c: &mut Criterion) {
    let mut group = c.benchmark_group("permutation_test");
    group.sample_size(10);

    let feature_stats = random_named(1_000, 2, 17, "f", "factor");
    let sets = block_sets(1_000, 20, 25);
    let membership = sets.to_membership().expect("matrix form");
    let index = build_index(&membership, &names("f", 1_000), 10);

    group.bench_function("200_trials_20_sets", |b| {
        b.iter(|| {
            permutation_test(
                black_box(&feature_stats),
                black_box(&index),
                SetStatistic::MeanDiff,
                200,
                1,
                42,
            )
        })
    });

    group.finish();
}

fn bench_run_enrichment(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_enrichment");
    group.sample_size(10);

    let data = random_named(1_000, 50, 19, "f", "s");
    let loadings = random_named(1_000, 3, 23, "f", "factor");
    let scores = random_named(50, 3, 29, "s", "factor");
    let sets = block_sets(1_000, 25, 30);

    let parametric = EnrichmentConfig::default();
    group.bench_function("parametric_1k_features", |b| {
        b.iter(|| {
            run_enrichment(
                black_box(&data),
                black_box(&loadings),
                black_box(&scores),
                black_box(&sets),
                &FactorSelection::All,
                &parametric,
            )
        })
    });

    let permutation = EnrichmentConfig {
        test: TestMode::Permutation,
        n_permutations: 100,
        ..Default::default()
    };
    group.bench_function("permutation_100_trials", |b| {
        b.iter(|| {
            run_enrichment(
                black_box(&data),
                black_box(&loadings),
                black_box(&scores),
                black_box(&sets),
                &FactorSelection::All,
                &permutation,
            )
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_feature_statistics,
    bench_set_statistics,
    bench_permutation,
    bench_run_enrichment
);
criterion_main!(benches);
