use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// A simulated concentration-time profile for one subject
///
/// Times are strictly increasing, concentrations are finite and
/// non-negative, and the two sequences pair one-to-one; the invariants are
/// enforced at construction, so every `Trajectory` in circulation is safe
/// to integrate over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    subject_id: usize,
    times: Vec<f64>,
    concentrations: Vec<f64>,
}

impl Trajectory {
    /// Create a trajectory, enforcing the ordering and sign invariants
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LengthMismatch`] if the two sequences differ
    /// in length, [`ConfigError::NonIncreasingTimes`] if the time sequence
    /// is not strictly increasing, and [`ConfigError::InvalidConcentration`]
    /// if any concentration is negative, NaN, or infinite.
    pub fn new(
        subject_id: usize,
        times: Vec<f64>,
        concentrations: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        if times.len() != concentrations.len() {
            return Err(ConfigError::LengthMismatch {
                id: subject_id,
                times: times.len(),
                concentrations: concentrations.len(),
            });
        }
        for (index, window) in times.windows(2).enumerate() {
            if window[1] <= window[0] {
                return Err(ConfigError::NonIncreasingTimes {
                    id: subject_id,
                    index: index + 1,
                });
            }
        }
        for (index, &value) in concentrations.iter().enumerate() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::InvalidConcentration {
                    id: subject_id,
                    index,
                    value,
                });
            }
        }
        Ok(Trajectory {
            subject_id,
            times,
            concentrations,
        })
    }

    pub fn subject_id(&self) -> usize {
        self.subject_id
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn concentrations(&self) -> &[f64] {
        &self.concentrations
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterate over `(time, concentration)` pairs
    pub fn points(&'_ self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times
            .iter()
            .copied()
            .zip(self.concentrations.iter().copied())
    }
}
