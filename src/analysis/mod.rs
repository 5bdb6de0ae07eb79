//! Exposure analysis: standardization, stratification, and effect-size
//! summaries over the exposure table.
//!
//! Every quantile in this module — stratification cut-points, medians, and
//! interval percentiles — uses the same definition: linear interpolation
//! between order statistics at `h = (n - 1) * p` (R type-7). Mixing quantile
//! definitions would shift bin edges relative to interval bounds.

pub mod quantile;
pub mod standardize;
pub mod stratify;
pub mod summary;

pub use quantile::{median, quantile};
pub use standardize::{standardize, Grouping, StandardizedRecord};
pub use stratify::{equal_count_cut, Bin, CovariateName};
pub use summary::{bsv_reference, effect_table, EffectSummary, IntervalProbs};

use thiserror::Error;

/// Errors from exposure analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// A quantile or median was requested over no values
    #[error("Cannot compute a quantile of an empty sample")]
    EmptyInput,

    /// A probability outside [0, 1]
    #[error("Probability must lie in [0, 1], got {p}")]
    InvalidProbability { p: f64 },

    /// Equal-count binning needs 1 <= k <= n
    #[error("Cannot cut {n} values into {k} equal-count bins")]
    InvalidBinCount { k: usize, n: usize },

    /// No subjects matched a stratum; reported instead of a NaN row
    #[error("Empty stratum for {covariate}: {label}")]
    EmptyStratum {
        covariate: stratify::CovariateName,
        label: String,
    },

    /// A standardization group whose median is zero or non-finite cannot
    /// express fold-changes
    #[error("Degenerate standardization group for {metric}: median = {median}")]
    DegenerateGroup {
        metric: crate::metrics::Metric,
        median: f64,
    },
}
