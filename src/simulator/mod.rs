//! Trial simulation: per-subject parameter derivation and trajectory
//! generation across a virtual population.
//!
//! Subjects are independent once the scenario is fixed, so the population
//! loop is data-parallel (rayon). Randomness uses per-subject sub-streams
//! derived from the master seed and the subject id, which makes results
//! identical for any thread count.
//!
//! One subject failing does not abort the batch: failures are collected
//! alongside the succeeded trajectories, with a fail-fast flag to opt into
//! aborting instead. Cancellation is cooperative, checked before each
//! subject is started.

use crate::data::{Compartment, DoseEvent, Population, Subject, Trajectory};
use crate::error::ConfigError;
use crate::model::{draw_eta, BetweenSubjectVariability, PopulationPk, Solver};
use crate::sampler::{substream_rng, StreamDomain};
use crate::PopkinError;
use nalgebra::Matrix2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A uniform output time grid `[start, start + step, ..., <= end]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    start: f64,
    end: f64,
    step: f64,
}

impl TimeGrid {
    /// Create a grid, validating that it is non-empty and increasing
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTimeGrid`] if `start` is negative, `end` is not
    /// after `start`, or `step` is not strictly positive.
    pub fn new(start: f64, end: f64, step: f64) -> Result<Self, ConfigError> {
        if !(start.is_finite() && start >= 0.0) {
            return Err(ConfigError::InvalidTimeGrid {
                reason: format!("start must be non-negative, got {}", start),
            });
        }
        if !(end.is_finite() && end > start) {
            return Err(ConfigError::InvalidTimeGrid {
                reason: format!("end ({}) must be after start ({})", end, start),
            });
        }
        if !(step.is_finite() && step > 0.0) {
            return Err(ConfigError::InvalidTimeGrid {
                reason: format!("step must be positive, got {}", step),
            });
        }
        Ok(TimeGrid { start, end, step })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Materialize the grid as a strictly increasing time vector
    pub fn times(&self) -> Vec<f64> {
        let n = ((self.end - self.start) / self.step + 1e-9).floor() as usize;
        (0..=n).map(|i| self.start + i as f64 * self.step).collect()
    }
}

/// A complete, explicit simulation scenario
///
/// Every knob is spelled out here; there are no defaults hidden in the
/// simulation code itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub pk: PopulationPk,
    pub dose: DoseEvent,
    pub grid: TimeGrid,
    pub bsv: BetweenSubjectVariability,
    pub solver: Solver,
    pub seed: u64,
    /// Abort the batch on the first subject failure instead of collecting it
    pub fail_fast: bool,
}

impl Scenario {
    pub fn new(pk: PopulationPk, dose: DoseEvent, grid: TimeGrid) -> Self {
        Scenario {
            pk,
            dose,
            grid,
            bsv: BetweenSubjectVariability::Zeroed,
            solver: Solver::ClosedForm,
            seed: 0,
            fail_fast: false,
        }
    }

    pub fn with_bsv(mut self, bsv: BetweenSubjectVariability) -> Self {
        self.bsv = bsv;
        self
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Validate the scenario as a whole
    ///
    /// # Errors
    ///
    /// [`ConfigError`] for invalid PK parameters, a dose outside the
    /// supported single-bolus-at-zero scope, or a covariance matrix that is
    /// not positive-definite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pk.validate()?;
        if self.dose.time_h() != 0.0 || self.dose.compartment() != Compartment::Gut {
            return Err(ConfigError::MalformedDose {
                reason: "only a single bolus into Gut at t = 0 is supported".to_string(),
            });
        }
        self.bsv.cholesky_factor()?;
        Ok(())
    }

    /// Read a scenario from its JSON representation and validate it
    pub fn from_json<R: std::io::Read>(reader: R) -> Result<Self, PopkinError> {
        let scenario: Scenario = serde_json::from_reader(reader)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Serialize the scenario as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, PopkinError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A subject that failed to simulate, with the reason
#[derive(Debug)]
pub struct SubjectFailure {
    pub subject_id: usize,
    pub error: PopkinError,
}

/// The outcome of simulating a population
///
/// Succeeded and failed subjects are accounted for separately; `skipped`
/// counts subjects never started because the batch was cancelled.
#[derive(Debug, Default)]
pub struct SimulationBatch {
    pub trajectories: Vec<Trajectory>,
    pub failures: Vec<SubjectFailure>,
    pub skipped: usize,
}

/// Simulates a population under a fixed scenario
///
/// # Examples
///
/// ```
/// use popkin::data::{DoseEvent, Population, Sex, Subject};
/// use popkin::model::PopulationPk;
/// use popkin::simulator::{Scenario, TimeGrid, TrialSimulator};
///
/// let pk = PopulationPk { ka: 0.5, cl: 4.0, v: 10.0, clwt: 0.75, vwt: 1.0, wt_ref: 70.0 };
/// let scenario = Scenario::new(
///     pk,
///     DoseEvent::bolus(100.0).unwrap(),
///     TimeGrid::new(0.0, 24.0, 0.5).unwrap(),
/// );
/// let population = Population::new(vec![Subject::new(0, 15.8, 4.0, Sex::Female).unwrap()]);
///
/// let batch = TrialSimulator::new(scenario).unwrap().run(&population).unwrap();
/// assert_eq!(batch.trajectories.len(), 1);
/// ```
pub struct TrialSimulator {
    scenario: Scenario,
    eta_factor: Option<Matrix2<f64>>,
    cancel: Arc<AtomicBool>,
}

impl TrialSimulator {
    /// Create a simulator, validating the scenario eagerly
    pub fn new(scenario: Scenario) -> Result<Self, PopkinError> {
        scenario.validate()?;
        let eta_factor = scenario.bsv.cholesky_factor()?;
        Ok(TrialSimulator {
            scenario,
            eta_factor,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Handle for cooperative cancellation: setting it stops the batch from
    /// starting further subjects
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Simulate every subject in the population
    ///
    /// Subjects are processed in parallel but the batch preserves population
    /// order. With `fail_fast` set, the first failure (in population order)
    /// is returned as an error instead of being collected.
    pub fn run(&self, population: &Population) -> Result<SimulationBatch, PopkinError> {
        let times = self.scenario.grid.times();

        let outcomes: Vec<Option<Result<Trajectory, PopkinError>>> = population
            .subjects()
            .par_iter()
            .map(|subject| {
                if self.cancel.load(Ordering::Relaxed) {
                    return None;
                }
                Some(self.simulate_subject(subject, &times))
            })
            .collect();

        let mut batch = SimulationBatch::default();
        for (subject, outcome) in population.iter().zip(outcomes) {
            match outcome {
                None => batch.skipped += 1,
                Some(Ok(trajectory)) => batch.trajectories.push(trajectory),
                Some(Err(error)) => {
                    if self.scenario.fail_fast {
                        return Err(error);
                    }
                    batch.failures.push(SubjectFailure {
                        subject_id: subject.id(),
                        error,
                    });
                }
            }
        }

        debug!(
            subjects = population.len(),
            succeeded = batch.trajectories.len(),
            failed = batch.failures.len(),
            skipped = batch.skipped,
            "simulation batch finished"
        );
        if !batch.failures.is_empty() {
            warn!(failed = batch.failures.len(), "some subjects failed to simulate");
        }

        Ok(batch)
    }

    fn simulate_subject(&self, subject: &Subject, times: &[f64]) -> Result<Trajectory, PopkinError> {
        // Pre-specified etas win; otherwise draw from the subject's own
        // sub-stream, or fix at zero when variability is zeroed.
        let eta = match subject.eta() {
            Some(eta) => eta,
            None => match &self.eta_factor {
                Some(factor) => {
                    let mut rng = substream_rng(
                        self.scenario.seed,
                        StreamDomain::Etas,
                        subject.id() as u64,
                    );
                    draw_eta(factor, &mut rng)
                }
                None => (0.0, 0.0),
            },
        };

        let individual = self.scenario.pk.individual(subject.weight_kg(), eta);
        // A NaN or overflowed eta poisons the derived parameters; catch it
        // here so the subject fails typed instead of producing a NaN curve.
        if !(individual.cl.is_finite() && individual.cl > 0.0) {
            return Err(ConfigError::InvalidPkParameter {
                param: "cl_i",
                value: individual.cl,
            }
            .into());
        }
        if !(individual.v.is_finite() && individual.v > 0.0) {
            return Err(ConfigError::InvalidPkParameter {
                param: "v_i",
                value: individual.v,
            }
            .into());
        }
        let concentrations =
            individual.concentrations(self.scenario.dose.amount(), times, self.scenario.solver);

        Ok(Trajectory::new(subject.id(), times.to_vec(), concentrations)?)
    }
}
