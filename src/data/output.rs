//! Delimited output tables for the external reporting layer
//!
//! Three tables cross the process boundary: trajectories, exposure records,
//! and effect summaries. All writers are deterministic: identical inputs
//! produce byte-identical output, which downstream reproducibility checks
//! rely on.

use crate::analysis::EffectSummary;
use crate::data::{Population, Sex, Trajectory};
use crate::metrics::ExposureRecord;
use crate::PopkinError;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct TrajectoryRow {
    subject_id: usize,
    time_h: f64,
    concentration: f64,
    weight_kg: f64,
    age_years: f64,
    sex: Sex,
}

#[derive(Serialize)]
struct ExposureRow {
    subject_id: usize,
    weight_kg: f64,
    age_years: f64,
    sex: Sex,
    metric: String,
    value: f64,
}

#[derive(Serialize)]
struct EffectRow {
    metric: String,
    covariate: String,
    stratum: String,
    median: f64,
    lower: f64,
    upper: f64,
}

/// Write the trajectory table: one row per (subject, time point)
///
/// # Errors
///
/// Fails if a trajectory references a subject absent from the population,
/// or on any underlying write error.
pub fn write_trajectory_table<W: Write>(
    writer: W,
    trajectories: &[Trajectory],
    population: &Population,
) -> Result<(), PopkinError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for trajectory in trajectories {
        let subject = population
            .get_subject(trajectory.subject_id())
            .ok_or(crate::metrics::MetricsError::UnknownSubject {
                subject_id: trajectory.subject_id(),
            })?;
        for (time_h, concentration) in trajectory.points() {
            csv_writer.serialize(TrajectoryRow {
                subject_id: subject.id(),
                time_h,
                concentration,
                weight_kg: subject.weight_kg(),
                age_years: subject.age_years(),
                sex: subject.sex(),
            })?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the exposure table: one row per (subject, metric)
pub fn write_exposure_table<W: Write>(
    writer: W,
    records: &[ExposureRecord],
) -> Result<(), PopkinError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(ExposureRow {
            subject_id: record.subject_id,
            weight_kg: record.covariates.weight_kg,
            age_years: record.covariates.age_years,
            sex: record.covariates.sex,
            metric: record.metric.to_string(),
            value: record.value,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the effect-summary table: one row per (metric, covariate, stratum)
pub fn write_effect_table<W: Write>(
    writer: W,
    summaries: &[EffectSummary],
) -> Result<(), PopkinError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for summary in summaries {
        csv_writer.serialize(EffectRow {
            metric: summary.metric.to_string(),
            covariate: summary.covariate.to_string(),
            stratum: summary.stratum.clone(),
            median: summary.median,
            lower: summary.lower,
            upper: summary.upper,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CovariateName;
    use crate::data::Subject;
    use crate::metrics::Metric;

    #[test]
    fn trajectory_table_has_covariate_columns() {
        let population =
            Population::new(vec![Subject::new(0, 15.8, 4.0, Sex::Female).unwrap()]);
        let trajectories =
            vec![Trajectory::new(0, vec![0.0, 1.0], vec![0.0, 2.5]).unwrap()];

        let mut buffer = Vec::new();
        write_trajectory_table(&mut buffer, &trajectories, &population).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "subject_id,time_h,concentration,weight_kg,age_years,sex"
        );
        assert_eq!(lines.next().unwrap(), "0,0.0,0.0,15.8,4.0,Female");
    }

    #[test]
    fn effect_table_rows_match_input_order() {
        let summaries = vec![EffectSummary {
            metric: Metric::Auc,
            covariate: CovariateName::Weight,
            stratum: "1st quartile [10.00, 12.00)".to_string(),
            median: 1.0,
            lower: 0.8,
            upper: 1.3,
        }];
        let mut buffer = Vec::new();
        write_effect_table(&mut buffer, &summaries).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("AUC,Weight,\"1st quartile [10.00, 12.00)\",1.0,0.8,1.3"));
    }

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let population =
            Population::new(vec![Subject::new(0, 15.8, 4.0, Sex::Male).unwrap()]);
        let trajectories =
            vec![Trajectory::new(0, vec![0.0, 1.0, 2.0], vec![0.0, 3.1, 1.7]).unwrap()];

        let mut a = Vec::new();
        let mut b = Vec::new();
        write_trajectory_table(&mut a, &trajectories, &population).unwrap();
        write_trajectory_table(&mut b, &trajectories, &population).unwrap();
        assert_eq!(a, b);
    }
}
