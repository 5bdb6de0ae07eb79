//! Core data structures: subjects, doses, trajectories, and the
//! growth-chart covariate grid they are sampled from.

pub mod covariate;
pub mod dose;
pub mod output;
pub mod subject;
pub mod trajectory;

pub use covariate::{read_growth_table, CovariateParams, GrowthTable};
pub use dose::{Compartment, DoseEvent};
pub use subject::{CovariateSnapshot, Population, Sex, Subject};
pub use trajectory::Trajectory;
