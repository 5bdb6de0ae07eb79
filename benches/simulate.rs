use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Matrix2;
use popkin::prelude::*;
use std::hint::black_box;

fn example_population(n: usize) -> Population {
    Population::new(
        (0..n)
            .map(|id| {
                let weight = 10.0 + (id % 40) as f64 * 0.5;
                let sex = if id % 2 == 0 { Sex::Female } else { Sex::Male };
                Subject::new(id, weight, weight / 4.0, sex).unwrap()
            })
            .collect(),
    )
}

fn scenario() -> Scenario {
    let pk = PopulationPk {
        ka: 0.5,
        cl: 4.0,
        v: 10.0,
        clwt: 0.75,
        vwt: 1.0,
        wt_ref: 70.0,
    };
    Scenario::new(
        pk,
        DoseEvent::bolus(100.0).unwrap(),
        TimeGrid::new(0.0, 24.0, 0.25).unwrap(),
    )
    .with_seed(678_549)
    .with_bsv(BetweenSubjectVariability::Covariance(Matrix2::new(
        0.09, 0.01, 0.01, 0.04,
    )))
}

fn simulate_and_summarize(population: &Population) {
    let simulator = TrialSimulator::new(scenario()).unwrap();
    let batch = simulator.run(population).unwrap();
    let records = exposure_records(&batch.trajectories, population).unwrap();
    let standardized = standardize(&records, Grouping::Pooled).unwrap();
    let rows = effect_table(&standardized, 4, IntervalProbs::default()).unwrap();
    black_box(rows);
}

fn criterion_benchmark(c: &mut Criterion) {
    let population = example_population(500);
    c.bench_function("simulate 500 subjects", |b| {
        b.iter(|| simulate_and_summarize(black_box(&population)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
