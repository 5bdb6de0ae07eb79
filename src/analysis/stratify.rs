//! Covariate stratification
//!
//! Continuous covariates are cut into equal-count quantile bins ("eqcut"):
//! cut-points sit at the type-7 quantiles `i/k` for `i = 1..k-1`, bins are
//! half-open `[lower, upper)` except the last, which is closed. Labels
//! carry both the ordinal rank and the literal numeric bounds.

use super::quantile::quantile_sorted;
use super::standardize::StandardizedRecord;
use super::AnalysisError;
use crate::data::CovariateSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Covariates that strata can be formed over
///
/// `Bsv` is the distinguished pseudo-stratum for between-subject-variability
/// reference intervals, not a subject covariate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CovariateName {
    Weight,
    Age,
    Sex,
    Bsv,
}

impl CovariateName {
    /// The continuous covariates eligible for equal-count cutting
    pub const CONTINUOUS: [CovariateName; 2] = [CovariateName::Weight, CovariateName::Age];

    /// Extract this covariate's numeric value from a snapshot, if continuous
    pub fn value(&self, covariates: &CovariateSnapshot) -> Option<f64> {
        match self {
            CovariateName::Weight => Some(covariates.weight_kg),
            CovariateName::Age => Some(covariates.age_years),
            CovariateName::Sex | CovariateName::Bsv => None,
        }
    }
}

impl fmt::Display for CovariateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CovariateName::Weight => write!(f, "Weight"),
            CovariateName::Age => write!(f, "Age"),
            CovariateName::Sex => write!(f, "Sex"),
            CovariateName::Bsv => write!(f, "BSV"),
        }
    }
}

/// One equal-count bin: `[lower, upper)`, closed on the upper edge for the
/// last bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    /// 1-based ordinal rank
    pub rank: usize,
    /// Total number of bins in the cut
    pub k: usize,
    pub lower: f64,
    pub upper: f64,
    pub closed_upper: bool,
}

impl Bin {
    pub fn contains(&self, x: f64) -> bool {
        if x < self.lower {
            return false;
        }
        if self.closed_upper {
            x <= self.upper
        } else {
            x < self.upper
        }
    }

    /// Ordinal-plus-bounds label, e.g. `1st quartile [12.30, 15.60)`
    pub fn label(&self) -> String {
        let close = if self.closed_upper { ']' } else { ')' };
        match family(self.k) {
            Some(name) => format!(
                "{} {} [{:.2}, {:.2}{}",
                ordinal(self.rank),
                name,
                self.lower,
                self.upper,
                close
            ),
            None => format!(
                "bin {}/{} [{:.2}, {:.2}{}",
                self.rank, self.k, self.lower, self.upper, close
            ),
        }
    }
}

fn family(k: usize) -> Option<&'static str> {
    match k {
        2 => Some("half"),
        3 => Some("tertile"),
        4 => Some("quartile"),
        5 => Some("quintile"),
        10 => Some("decile"),
        _ => None,
    }
}

fn ordinal(rank: usize) -> String {
    let suffix = match (rank % 10, rank % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", rank, suffix)
}

/// Cut a numeric covariate into `k` equal-count quantile bins
///
/// Cut-points are the type-7 quantiles at `i/k`; together the bins cover
/// `[min, max]` exactly, with no gaps or overlaps. On distinct inputs the
/// bin populations differ in size by at most one.
///
/// # Errors
///
/// [`AnalysisError::EmptyInput`] for no values,
/// [`AnalysisError::InvalidBinCount`] unless `1 <= k <= n`.
pub fn equal_count_cut(values: &[f64], k: usize) -> Result<Vec<Bin>, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let n = values.len();
    if k == 0 || k > n {
        return Err(AnalysisError::InvalidBinCount { k, n });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut edges = Vec::with_capacity(k + 1);
    edges.push(sorted[0]);
    for i in 1..k {
        edges.push(quantile_sorted(&sorted, i as f64 / k as f64));
    }
    edges.push(sorted[n - 1]);

    Ok((1..=k)
        .map(|rank| Bin {
            rank,
            k,
            lower: edges[rank - 1],
            upper: edges[rank],
            closed_upper: rank == k,
        })
        .collect())
}

/// Partition records by the bins of a continuous covariate
///
/// The cut is computed from the covariate values of `records` themselves;
/// each returned entry pairs a bin with the records falling inside it, in
/// input order.
pub fn stratify_continuous<'a>(
    records: &'a [StandardizedRecord],
    covariate: CovariateName,
    k: usize,
) -> Result<Vec<(Bin, Vec<&'a StandardizedRecord>)>, AnalysisError> {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|record| covariate.value(&record.covariates))
        .collect();
    let bins = equal_count_cut(&values, k)?;

    Ok(bins
        .into_iter()
        .map(|bin| {
            let members: Vec<&StandardizedRecord> = records
                .iter()
                .filter(|record| {
                    covariate
                        .value(&record.covariates)
                        .is_some_and(|value| bin.contains(value))
                })
                .collect();
            (bin, members)
        })
        .collect())
}

/// Group records by sex, in enum order, keeping only observed groups
pub fn group_by_sex(
    records: &[StandardizedRecord],
) -> Vec<(crate::data::Sex, Vec<&StandardizedRecord>)> {
    use crate::data::Sex;
    [Sex::Female, Sex::Male]
        .into_iter()
        .filter_map(|sex| {
            let members: Vec<&StandardizedRecord> = records
                .iter()
                .filter(|record| record.covariates.sex == sex)
                .collect();
            (!members.is_empty()).then_some((sex, members))
        })
        .collect()
}
