use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Biological sex, as used by the growth-chart reference tables
///
/// On the wire (growth-table CSV) sex is coded `1` = male, `2` = female;
/// see [`crate::data::covariate::read_growth_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Female => write!(f, "Female"),
            Sex::Male => write!(f, "Male"),
        }
    }
}

/// A virtual trial participant
///
/// Subjects are immutable once created. The optional `eta` pair holds
/// pre-specified random effects on (CL, V); when absent, the simulator
/// either draws them from the configured covariance or fixes them at zero
/// in zeroed-variability mode.
///
/// # Examples
///
/// ```
/// use popkin::data::{Sex, Subject};
///
/// let subject = Subject::new(1, 15.8, 4.0, Sex::Female).unwrap();
/// assert_eq!(subject.weight_kg(), 15.8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    id: usize,
    weight_kg: f64,
    age_years: f64,
    sex: Sex,
    eta: Option<(f64, f64)>,
}

impl Subject {
    /// Create a subject, validating its covariates
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositiveWeight`] if `weight_kg` is not a
    /// positive finite number, and [`ConfigError::NegativeAge`] if
    /// `age_years` is negative or not finite.
    pub fn new(id: usize, weight_kg: f64, age_years: f64, sex: Sex) -> Result<Self, ConfigError> {
        if !(weight_kg.is_finite() && weight_kg > 0.0) {
            return Err(ConfigError::NonPositiveWeight {
                id,
                weight: weight_kg,
            });
        }
        if !(age_years.is_finite() && age_years >= 0.0) {
            return Err(ConfigError::NegativeAge { id, age: age_years });
        }
        Ok(Subject {
            id,
            weight_kg,
            age_years,
            sex,
            eta: None,
        })
    }

    /// Fix the random effects on (CL, V) instead of drawing them
    pub fn with_eta(mut self, eta1: f64, eta2: f64) -> Self {
        self.eta = Some((eta1, eta2));
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn age_years(&self) -> f64 {
        self.age_years
    }

    pub fn sex(&self) -> Sex {
        self.sex
    }

    /// Pre-specified random effects, if any
    pub fn eta(&self) -> Option<(f64, f64)> {
        self.eta
    }

    /// A by-value copy of the covariates, for exposure records
    pub fn snapshot(&self) -> CovariateSnapshot {
        CovariateSnapshot {
            weight_kg: self.weight_kg,
            age_years: self.age_years,
            sex: self.sex,
        }
    }
}

/// By-value copy of a subject's covariates
///
/// Exposure records carry this snapshot rather than a reference, so that
/// downstream analysis never depends on the subject collection outliving it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CovariateSnapshot {
    pub weight_kg: f64,
    pub age_years: f64,
    pub sex: Sex,
}

/// The set of subjects entering a simulated trial
///
/// # Examples
///
/// ```
/// use popkin::data::{Population, Sex, Subject};
///
/// let mut population = Population::new(vec![
///     Subject::new(0, 12.0, 2.0, Sex::Male).unwrap(),
/// ]);
/// population.add_subject(Subject::new(1, 15.8, 4.0, Sex::Female).unwrap());
/// assert_eq!(population.len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Population {
    subjects: Vec<Subject>,
}

impl Population {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Population { subjects }
    }

    pub fn add_subject(&mut self, subject: Subject) {
        self.subjects.push(subject);
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Get a subject by its id
    pub fn get_subject(&self, id: usize) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.id() == id)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn iter(&'_ self) -> std::slice::Iter<'_, Subject> {
        self.subjects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_weight() {
        let err = Subject::new(7, 0.0, 4.0, Sex::Male).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveWeight { id: 7, .. }));

        let err = Subject::new(8, f64::NAN, 4.0, Sex::Male).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveWeight { id: 8, .. }));
    }

    #[test]
    fn rejects_negative_age() {
        let err = Subject::new(1, 10.0, -0.5, Sex::Female).unwrap_err();
        assert!(matches!(err, ConfigError::NegativeAge { id: 1, .. }));
    }

    #[test]
    fn snapshot_is_a_value_copy() {
        let subject = Subject::new(3, 20.0, 6.0, Sex::Female).unwrap();
        let snapshot = subject.snapshot();
        drop(subject);
        assert_eq!(snapshot.weight_kg, 20.0);
        assert_eq!(snapshot.sex, Sex::Female);
    }

    #[test]
    fn population_lookup_by_id() {
        let population = Population::new(vec![
            Subject::new(10, 12.0, 2.0, Sex::Male).unwrap(),
            Subject::new(11, 14.0, 3.0, Sex::Female).unwrap(),
        ]);
        assert_eq!(population.get_subject(11).unwrap().weight_kg(), 14.0);
        assert!(population.get_subject(99).is_none());
    }
}
