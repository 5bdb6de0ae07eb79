//! Effect-size summaries per stratum
//!
//! For every (metric, covariate, stratum) triple the summarizer reports the
//! median fold-change and a configurable percentile interval. A separate
//! entry point computes between-subject-variability (BSV) reference
//! intervals from a variability-including run, reported under the
//! distinguished `BSV` pseudo-stratum.

use super::quantile::quantile;
use super::standardize::StandardizedRecord;
use super::stratify::{group_by_sex, stratify_continuous, CovariateName};
use super::AnalysisError;
use crate::metrics::Metric;
use serde::{Deserialize, Serialize};

/// Lower and upper interval probabilities
///
/// Must straddle the median: `0 < lower <= 0.5 <= upper < 1`, which keeps
/// `lower bound <= median <= upper bound` for every summary row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalProbs {
    lower: f64,
    upper: f64,
}

impl IntervalProbs {
    /// # Errors
    ///
    /// [`crate::error::ConfigError::InvalidIntervalProbs`] if the
    /// probabilities do not straddle the median or lie outside (0, 1).
    pub fn new(lower: f64, upper: f64) -> Result<Self, crate::error::ConfigError> {
        if !(lower > 0.0 && lower <= 0.5 && upper >= 0.5 && upper < 1.0) {
            return Err(crate::error::ConfigError::InvalidIntervalProbs { lower, upper });
        }
        Ok(IntervalProbs { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }
}

impl Default for IntervalProbs {
    /// The conventional 5th/95th percentile interval
    fn default() -> Self {
        IntervalProbs {
            lower: 0.05,
            upper: 0.95,
        }
    }
}

/// One row of the effect-summary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSummary {
    pub metric: Metric,
    pub covariate: CovariateName,
    pub stratum: String,
    pub median: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Summarize one stratum's fold-changes
///
/// # Errors
///
/// [`AnalysisError::EmptyStratum`] if no values matched the stratum; an
/// empty stratum is never silently emitted as a NaN row.
pub fn summarize_stratum(
    metric: Metric,
    covariate: CovariateName,
    stratum: String,
    values: &[f64],
    probs: IntervalProbs,
) -> Result<EffectSummary, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyStratum {
            covariate,
            label: stratum,
        });
    }
    Ok(EffectSummary {
        metric,
        covariate,
        stratum,
        median: quantile(values, 0.5)?,
        lower: quantile(values, probs.lower)?,
        upper: quantile(values, probs.upper)?,
    })
}

fn fold_changes(records: &[&StandardizedRecord]) -> Vec<f64> {
    records.iter().map(|record| record.fold_change).collect()
}

/// Build the full covariate-stratified effect table
///
/// For each metric: `k` equal-count strata over weight and age, plus the
/// observed sex groups. Rows appear in (metric, covariate, stratum-rank)
/// order.
///
/// # Errors
///
/// Propagates empty-stratum and binning failures from any cell.
pub fn effect_table(
    records: &[StandardizedRecord],
    strata_per_covariate: usize,
    probs: IntervalProbs,
) -> Result<Vec<EffectSummary>, AnalysisError> {
    let mut rows = Vec::new();

    for metric in Metric::ALL {
        let of_metric: Vec<StandardizedRecord> = records
            .iter()
            .filter(|record| record.metric == metric)
            .cloned()
            .collect();

        for covariate in CovariateName::CONTINUOUS {
            for (bin, members) in
                stratify_continuous(&of_metric, covariate, strata_per_covariate)?
            {
                rows.push(summarize_stratum(
                    metric,
                    covariate,
                    bin.label(),
                    &fold_changes(&members),
                    probs,
                )?);
            }
        }

        for (sex, members) in group_by_sex(&of_metric) {
            rows.push(summarize_stratum(
                metric,
                CovariateName::Sex,
                sex.to_string(),
                &fold_changes(&members),
                probs,
            )?);
        }
    }

    Ok(rows)
}

/// Between-subject-variability reference intervals
///
/// Computed over all standardized records of a variability-including
/// simulation (not the zeroed run), one row per metric under the `BSV`
/// pseudo-stratum.
pub fn bsv_reference(
    records: &[StandardizedRecord],
    probs: IntervalProbs,
) -> Result<Vec<EffectSummary>, AnalysisError> {
    Metric::ALL
        .into_iter()
        .map(|metric| {
            let values: Vec<f64> = records
                .iter()
                .filter(|record| record.metric == metric)
                .map(|record| record.fold_change)
                .collect();
            summarize_stratum(metric, CovariateName::Bsv, "BSV".to_string(), &values, probs)
        })
        .collect()
}
