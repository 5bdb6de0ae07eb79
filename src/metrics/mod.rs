//! Exposure metrics derived from simulated trajectories
//!
//! Two summary metrics per subject: Cmax (peak exposure) and AUC (total
//! exposure, linear trapezoidal rule over the sampled grid). AUC is
//! sensitive to grid spacing; the grid is a scenario input, never inferred
//! from the data.

use crate::data::{CovariateSnapshot, Population, Trajectory};
use crate::PopkinError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from exposure-metric computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// The trajectory has too few points for the requested metric
    #[error("Trajectory for subject {subject_id} has {points} points, {required} required")]
    InsufficientData {
        subject_id: usize,
        points: usize,
        required: usize,
    },

    /// A trajectory references a subject absent from the population
    #[error("Trajectory references unknown subject {subject_id}")]
    UnknownSubject { subject_id: usize },
}

/// The exposure metrics this crate derives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    Cmax,
    Auc,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Cmax, Metric::Auc];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cmax => write!(f, "Cmax"),
            Metric::Auc => write!(f, "AUC"),
        }
    }
}

/// One metric value for one subject, with a covariate snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureRecord {
    pub subject_id: usize,
    pub covariates: CovariateSnapshot,
    pub metric: Metric,
    pub value: f64,
}

/// Peak concentration and the time of its first occurrence
///
/// Ties resolve to the earliest sample, so a monotonically decreasing
/// trajectory peaks at its first point.
///
/// # Errors
///
/// [`MetricsError::InsufficientData`] for an empty trajectory.
pub fn cmax_point(trajectory: &Trajectory) -> Result<(f64, f64), MetricsError> {
    let mut best: Option<(f64, f64)> = None;
    for (time, conc) in trajectory.points() {
        match best {
            Some((_, c)) if conc <= c => {}
            _ => best = Some((time, conc)),
        }
    }
    best.ok_or(MetricsError::InsufficientData {
        subject_id: trajectory.subject_id(),
        points: 0,
        required: 1,
    })
}

/// Peak concentration over the trajectory
pub fn cmax(trajectory: &Trajectory) -> Result<f64, MetricsError> {
    cmax_point(trajectory).map(|(_, c)| c)
}

/// Linear trapezoidal AUC over the full sampled trajectory
///
/// `AUC = sum (t[k+1] - t[k]) * (C[k] + C[k+1]) / 2`
///
/// # Errors
///
/// [`MetricsError::InsufficientData`] if the trajectory has fewer than two
/// points.
pub fn auc(trajectory: &Trajectory) -> Result<f64, MetricsError> {
    let times = trajectory.times();
    let concentrations = trajectory.concentrations();
    if times.len() < 2 {
        return Err(MetricsError::InsufficientData {
            subject_id: trajectory.subject_id(),
            points: times.len(),
            required: 2,
        });
    }

    let mut total = 0.0;
    for k in 0..times.len() - 1 {
        total += (times[k + 1] - times[k]) * (concentrations[k] + concentrations[k + 1]) / 2.0;
    }
    Ok(total)
}

/// Derive the exposure table for a batch of trajectories
///
/// Emits one Cmax and one AUC record per trajectory, in trajectory order,
/// each carrying a by-value snapshot of the subject's covariates.
///
/// # Errors
///
/// Fails if a trajectory is too short for a metric or references a subject
/// that is not in the population.
pub fn exposure_records(
    trajectories: &[Trajectory],
    population: &Population,
) -> Result<Vec<ExposureRecord>, PopkinError> {
    let mut records = Vec::with_capacity(trajectories.len() * Metric::ALL.len());
    for trajectory in trajectories {
        let subject = population
            .get_subject(trajectory.subject_id())
            .ok_or(MetricsError::UnknownSubject {
                subject_id: trajectory.subject_id(),
            })?;
        let covariates = subject.snapshot();

        records.push(ExposureRecord {
            subject_id: subject.id(),
            covariates,
            metric: Metric::Cmax,
            value: cmax(trajectory)?,
        });
        records.push(ExposureRecord {
            subject_id: subject.id(),
            covariates,
            metric: Metric::Auc,
            value: auc(trajectory)?,
        });
    }
    Ok(records)
}
