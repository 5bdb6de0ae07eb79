//! End-to-end pipeline tests: sampling through effect-summary output.

use approx::assert_relative_eq;
use nalgebra::Matrix2;
use popkin::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

const GROWTH_TABLE: &str = "age_months,sex,m,s,l\n\
                            24,1,12.5,0.11,-0.4\n\
                            24,2,12.1,0.12,-0.5\n\
                            48,1,16.3,0.12,-0.5\n\
                            48,2,15.8,0.13,-0.6\n\
                            96,1,25.8,0.15,-0.9\n\
                            96,2,26.2,0.16,-1.0\n";

fn reference_pk() -> PopulationPk {
    PopulationPk {
        ka: 0.5,
        cl: 4.0,
        v: 10.0,
        clwt: 0.75,
        vwt: 1.0,
        wt_ref: 70.0,
    }
}

fn scenario(seed: u64) -> Scenario {
    Scenario::new(
        reference_pk(),
        DoseEvent::bolus(100.0).unwrap(),
        TimeGrid::new(0.0, 24.0, 0.5).unwrap(),
    )
    .with_seed(seed)
}

/// Run sampling, simulation, metrics, standardization, and summarization,
/// returning the serialized effect table.
fn run_pipeline(seed: u64) -> Vec<u8> {
    init_tracing();
    let table = read_growth_table(GROWTH_TABLE.as_bytes()).unwrap();
    let population = sample_population(&table, 25, seed).unwrap();

    let sigma = Matrix2::new(0.09, 0.01, 0.01, 0.04);
    let simulator = TrialSimulator::new(
        scenario(seed).with_bsv(BetweenSubjectVariability::Covariance(sigma)),
    )
    .unwrap();
    let batch = simulator.run(&population).unwrap();
    assert!(batch.failures.is_empty());

    let records = exposure_records(&batch.trajectories, &population).unwrap();
    let standardized = standardize(&records, Grouping::Pooled).unwrap();

    // Age has three grid levels in this table, so three equal-count strata
    let mut rows = effect_table(&standardized, 3, IntervalProbs::default()).unwrap();
    rows.extend(bsv_reference(&standardized, IntervalProbs::default()).unwrap());

    let mut buffer = Vec::new();
    write_effect_table(&mut buffer, &rows).unwrap();
    buffer
}

#[test]
fn pipeline_is_byte_reproducible() {
    let first = run_pipeline(678_549);
    let second = run_pipeline(678_549);
    assert_eq!(first, second);
}

#[test]
fn different_seeds_differ() {
    assert_ne!(run_pipeline(678_549), run_pipeline(678_550));
}

#[test]
fn fixed_seed_concentration_matches_closed_form_at_24h() {
    // seed 678549, WT 15.8 kg, zeroed variability, dose 100 into Gut at t=0
    let population = Population::new(vec![Subject::new(0, 15.8, 4.0, Sex::Female).unwrap()]);
    let simulator = TrialSimulator::new(scenario(678_549)).unwrap();
    let batch = simulator.run(&population).unwrap();

    let individual = reference_pk().individual(15.8, (0.0, 0.0));
    let ke = individual.ke();
    let expected = 100.0 * individual.ka / (individual.v * (individual.ka - ke))
        * ((-ke * 24.0f64).exp() - (-individual.ka * 24.0f64).exp());

    let trajectory = &batch.trajectories[0];
    let at_24 = trajectory
        .points()
        .find(|(t, _)| (*t - 24.0).abs() < 1e-9)
        .expect("grid should include t = 24")
        .1;
    assert_relative_eq!(at_24, expected, max_relative = 1e-6);
}

#[test]
fn effect_table_covers_all_strata_and_bsv() {
    let table = read_growth_table(GROWTH_TABLE.as_bytes()).unwrap();
    let population = sample_population(&table, 10, 7).unwrap();
    let simulator = TrialSimulator::new(scenario(7)).unwrap();
    let batch = simulator.run(&population).unwrap();

    let records = exposure_records(&batch.trajectories, &population).unwrap();
    let standardized = standardize(&records, Grouping::Pooled).unwrap();

    let mut rows = effect_table(&standardized, 3, IntervalProbs::default()).unwrap();
    rows.extend(bsv_reference(&standardized, IntervalProbs::default()).unwrap());

    // 2 metrics x (3 weight + 3 age + 2 sex) + 2 BSV rows
    assert_eq!(rows.len(), 18);
    for row in &rows {
        assert!(row.lower <= row.median && row.median <= row.upper);
        assert!(row.median.is_finite());
    }
    assert_eq!(
        rows.iter()
            .filter(|row| row.covariate == CovariateName::Bsv)
            .count(),
        2
    );
}

#[test]
fn standardized_medians_are_unity_per_metric() {
    let table = read_growth_table(GROWTH_TABLE.as_bytes()).unwrap();
    let population = sample_population(&table, 20, 11).unwrap();
    let simulator = TrialSimulator::new(scenario(11)).unwrap();
    let batch = simulator.run(&population).unwrap();

    let records = exposure_records(&batch.trajectories, &population).unwrap();
    let standardized = standardize(&records, Grouping::Pooled).unwrap();

    for metric in Metric::ALL {
        let folds: Vec<f64> = standardized
            .iter()
            .filter(|record| record.metric == metric)
            .map(|record| record.fold_change)
            .collect();
        assert_relative_eq!(median(&folds).unwrap(), 1.0, max_relative = 1e-12);
    }
}

#[test]
fn exposure_and_trajectory_tables_serialize() {
    let population = Population::new(vec![
        Subject::new(0, 15.8, 4.0, Sex::Female).unwrap(),
        Subject::new(1, 22.0, 7.0, Sex::Male).unwrap(),
    ]);
    let simulator = TrialSimulator::new(scenario(3)).unwrap();
    let batch = simulator.run(&population).unwrap();
    let records = exposure_records(&batch.trajectories, &population).unwrap();

    let mut trajectory_csv = Vec::new();
    write_trajectory_table(&mut trajectory_csv, &batch.trajectories, &population).unwrap();
    let text = String::from_utf8(trajectory_csv).unwrap();
    assert!(text.starts_with("subject_id,time_h,concentration,weight_kg,age_years,sex"));
    // 2 subjects x 49 grid points + header
    assert_eq!(text.lines().count(), 99);

    let mut exposure_csv = Vec::new();
    write_exposure_table(&mut exposure_csv, &records).unwrap();
    let text = String::from_utf8(exposure_csv).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert!(text.contains("Cmax"));
    assert!(text.contains("AUC"));
}

#[test]
fn bsv_intervals_are_wider_than_zeroed_variability() {
    let table = read_growth_table(GROWTH_TABLE.as_bytes()).unwrap();
    let population = sample_population(&table, 20, 5).unwrap();

    let run = |bsv: BetweenSubjectVariability| {
        let simulator = TrialSimulator::new(scenario(5).with_bsv(bsv)).unwrap();
        let batch = simulator.run(&population).unwrap();
        let records = exposure_records(&batch.trajectories, &population).unwrap();
        let standardized = standardize(&records, Grouping::Pooled).unwrap();
        bsv_reference(&standardized, IntervalProbs::default()).unwrap()
    };

    let zeroed = run(BetweenSubjectVariability::Zeroed);
    let with_bsv = run(BetweenSubjectVariability::Covariance(Matrix2::new(
        0.09, 0.01, 0.01, 0.04,
    )));

    for (z, b) in zeroed.iter().zip(with_bsv.iter()) {
        assert!(
            b.upper - b.lower > z.upper - z.lower,
            "{}: BSV interval should widen the covariate-only spread",
            b.metric
        );
    }
}
