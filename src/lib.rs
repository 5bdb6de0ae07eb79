//! popkin: virtual-population pharmacokinetic trial simulation
//!
//! The pipeline runs in five stages, each an explicit value passed to the
//! next — there is no hidden shared table state:
//!
//! 1. [`sampler`] draws (age, weight, sex) covariates from BCCG
//!    growth-chart parameters.
//! 2. [`simulator`] derives per-subject PK parameters (allometric scaling
//!    plus optional random effects, [`model`]) and produces one
//!    concentration-time [`data::Trajectory`] per subject.
//! 3. [`metrics`] reduces each trajectory to Cmax and AUC exposure records.
//! 4. [`analysis`] standardizes exposures to fold-changes, cuts covariates
//!    into equal-count strata, and summarizes each stratum as a median with
//!    a percentile interval.
//! 5. [`data::output`] serializes the three result tables as delimited
//!    text for the external reporting layer.
//!
//! Randomness is never global: every draw comes from a sub-stream derived
//! from the master seed and a subject or cell id, so a fixed seed gives
//! byte-identical results at any parallelism degree.

pub mod analysis;
pub mod data;
pub mod error;
pub mod metrics;
pub mod model;
pub mod sampler;
pub mod simulator;

pub use error::{ConfigError, PopkinError};

pub mod prelude {
    pub use crate::analysis::{
        bsv_reference, effect_table, median, quantile, standardize, CovariateName, EffectSummary,
        Grouping, IntervalProbs, StandardizedRecord,
    };
    pub use crate::data::output::{
        write_effect_table, write_exposure_table, write_trajectory_table,
    };
    pub use crate::data::{
        read_growth_table, Compartment, CovariateParams, CovariateSnapshot, DoseEvent,
        GrowthTable, Population, Sex, Subject, Trajectory,
    };
    pub use crate::metrics::{auc, cmax, exposure_records, ExposureRecord, Metric};
    pub use crate::model::{BetweenSubjectVariability, IndividualPk, PopulationPk, Solver};
    pub use crate::sampler::{sample_population, sample_weights};
    pub use crate::simulator::{Scenario, SimulationBatch, TimeGrid, TrialSimulator};
    pub use crate::{ConfigError, PopkinError};
}
