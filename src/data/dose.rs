use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Model compartment receiving a dose
///
/// Only extravascular dosing into the absorption (gut) compartment is
/// supported by the one-compartment model in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compartment {
    #[default]
    Gut,
}

/// A single dosing event
///
/// The scenario in scope is a single bolus into [`Compartment::Gut`] at
/// `t = 0`; the time field exists for schema fidelity with the consuming
/// reporting layer and is validated by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseEvent {
    time_h: f64,
    amount: f64,
    compartment: Compartment,
}

impl DoseEvent {
    /// Create a dose event, validating time and amount
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedDose`] if the time is negative or
    /// non-finite, or the amount is not strictly positive.
    pub fn new(time_h: f64, amount: f64, compartment: Compartment) -> Result<Self, ConfigError> {
        if !(time_h.is_finite() && time_h >= 0.0) {
            return Err(ConfigError::MalformedDose {
                reason: format!("dose time must be non-negative, got {}", time_h),
            });
        }
        if !(amount.is_finite() && amount > 0.0) {
            return Err(ConfigError::MalformedDose {
                reason: format!("dose amount must be positive, got {}", amount),
            });
        }
        Ok(DoseEvent {
            time_h,
            amount,
            compartment,
        })
    }

    /// A bolus into the gut compartment at `t = 0`
    pub fn bolus(amount: f64) -> Result<Self, ConfigError> {
        DoseEvent::new(0.0, amount, Compartment::Gut)
    }

    pub fn time_h(&self) -> f64 {
        self.time_h
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn compartment(&self) -> Compartment {
        self.compartment
    }
}
