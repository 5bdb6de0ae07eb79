//! Fold-change standardization of exposure metrics
//!
//! Re-expresses each metric value as `value / median(group)`, where groups
//! are formed per metric and (optionally) per categorical covariate. The
//! median follows the crate-wide quantile rule, so for even-sized groups it
//! is the average of the two middle order statistics. Output preserves
//! input order, and group medians are computed on sorted copies, so the
//! result is stable under permutation of the input.

use super::quantile::median;
use super::AnalysisError;
use crate::data::{CovariateSnapshot, Sex};
use crate::metrics::{ExposureRecord, Metric};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which groups share a standardization reference median
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Grouping {
    /// One reference per metric across the whole population
    #[default]
    Pooled,
    /// One reference per (metric, sex) cell
    BySex,
}

/// An exposure record re-expressed as a fold-change against its group median
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedRecord {
    pub subject_id: usize,
    pub covariates: CovariateSnapshot,
    pub metric: Metric,
    pub fold_change: f64,
}

/// Standardize exposure records to fold-changes against group medians
///
/// # Errors
///
/// [`AnalysisError::EmptyInput`] if `records` is empty, and
/// [`AnalysisError::DegenerateGroup`] if any group's median is zero or
/// non-finite (fold-changes would be meaningless).
pub fn standardize(
    records: &[ExposureRecord],
    grouping: Grouping,
) -> Result<Vec<StandardizedRecord>, AnalysisError> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let key = |record: &ExposureRecord| -> (Metric, Option<Sex>) {
        match grouping {
            Grouping::Pooled => (record.metric, None),
            Grouping::BySex => (record.metric, Some(record.covariates.sex)),
        }
    };

    let mut groups: BTreeMap<(Metric, Option<Sex>), Vec<f64>> = BTreeMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record.value);
    }

    let mut medians: BTreeMap<(Metric, Option<Sex>), f64> = BTreeMap::new();
    for (group_key, values) in &groups {
        let m = median(values)?;
        if !(m.is_finite() && m > 0.0) {
            return Err(AnalysisError::DegenerateGroup {
                metric: group_key.0,
                median: m,
            });
        }
        medians.insert(*group_key, m);
    }

    Ok(records
        .iter()
        .map(|record| StandardizedRecord {
            subject_id: record.subject_id,
            covariates: record.covariates,
            metric: record.metric,
            fold_change: record.value / medians[&key(record)],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(id: usize, sex: Sex, metric: Metric, value: f64) -> ExposureRecord {
        ExposureRecord {
            subject_id: id,
            covariates: CovariateSnapshot {
                weight_kg: 15.0,
                age_years: 4.0,
                sex,
            },
            metric,
            value,
        }
    }

    #[test]
    fn median_of_standardized_group_is_one() {
        let records: Vec<ExposureRecord> = [10.0, 12.0, 15.0, 18.0, 40.0]
            .iter()
            .enumerate()
            .map(|(id, &v)| record(id, Sex::Female, Metric::Auc, v))
            .collect();

        let standardized = standardize(&records, Grouping::Pooled).unwrap();
        let folds: Vec<f64> = standardized.iter().map(|r| r.fold_change).collect();
        assert_relative_eq!(median(&folds).unwrap(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn groups_are_split_by_sex_and_metric() {
        let records = vec![
            record(0, Sex::Female, Metric::Cmax, 10.0),
            record(1, Sex::Female, Metric::Cmax, 20.0),
            record(2, Sex::Male, Metric::Cmax, 100.0),
            record(3, Sex::Male, Metric::Cmax, 200.0),
        ];
        let standardized = standardize(&records, Grouping::BySex).unwrap();
        // Female median 15, male median 150
        assert_relative_eq!(standardized[0].fold_change, 10.0 / 15.0, max_relative = 1e-12);
        assert_relative_eq!(standardized[2].fold_change, 100.0 / 150.0, max_relative = 1e-12);
    }

    #[test]
    fn stable_under_input_permutation() {
        let records = vec![
            record(0, Sex::Female, Metric::Auc, 10.0),
            record(1, Sex::Female, Metric::Auc, 30.0),
            record(2, Sex::Female, Metric::Auc, 20.0),
        ];
        let mut shuffled = records.clone();
        shuffled.rotate_left(2);

        let a = standardize(&records, Grouping::Pooled).unwrap();
        let b = standardize(&shuffled, Grouping::Pooled).unwrap();

        for record_a in &a {
            let record_b = b
                .iter()
                .find(|r| r.subject_id == record_a.subject_id)
                .unwrap();
            assert_eq!(record_a.fold_change, record_b.fold_change);
        }
    }

    #[test]
    fn zero_median_group_is_degenerate() {
        let records = vec![
            record(0, Sex::Female, Metric::Auc, 0.0),
            record(1, Sex::Female, Metric::Auc, 0.0),
            record(2, Sex::Female, Metric::Auc, 0.0),
        ];
        assert!(matches!(
            standardize(&records, Grouping::Pooled),
            Err(AnalysisError::DegenerateGroup { .. })
        ));
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(
            standardize(&[], Grouping::Pooled),
            Err(AnalysisError::EmptyInput)
        );
    }
}
