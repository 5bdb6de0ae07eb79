use thiserror::Error;

/// Top-level error type, aggregating the module-specific errors
#[derive(Error, Debug)]
pub enum PopkinError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sampler(#[from] crate::sampler::SamplerError),

    #[error(transparent)]
    Metrics(#[from] crate::metrics::MetricsError),

    #[error(transparent)]
    Analysis(#[from] crate::analysis::AnalysisError),

    /// Failure while reading or writing a delimited table
    #[error("Table I/O failed: {0}")]
    Csv(#[from] csv::Error),

    /// Failure while reading or writing a JSON scenario
    #[error("Scenario JSON failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors arising from invalid scenario or subject configuration
///
/// All configuration is validated eagerly, before any simulation work starts,
/// so a malformed scenario never produces NaN concentrations or partial output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Subject weight must be strictly positive
    #[error("Subject {id}: weight must be positive, got {weight}")]
    NonPositiveWeight { id: usize, weight: f64 },

    /// Subject age must be non-negative and finite
    #[error("Subject {id}: age must be non-negative, got {age}")]
    NegativeAge { id: usize, age: f64 },

    /// Dose events must have non-negative time and positive amount
    #[error("Malformed dose: {reason}")]
    MalformedDose { reason: String },

    /// The output time grid must be strictly increasing
    #[error("Invalid time grid: {reason}")]
    InvalidTimeGrid { reason: String },

    /// A population PK parameter is outside its valid domain
    #[error("Invalid PK parameter: {param} = {value}")]
    InvalidPkParameter { param: &'static str, value: f64 },

    /// The random-effect covariance matrix is not positive-definite
    #[error("Random-effect covariance matrix is not positive-definite")]
    NonPositiveDefiniteCovariance,

    /// Trajectory times and concentrations must pair one-to-one
    #[error(
        "Trajectory for subject {id}: {times} times but {concentrations} concentrations"
    )]
    LengthMismatch {
        id: usize,
        times: usize,
        concentrations: usize,
    },

    /// Trajectory times must be strictly increasing
    #[error("Trajectory for subject {id}: times are not strictly increasing at index {index}")]
    NonIncreasingTimes { id: usize, index: usize },

    /// Trajectory concentrations must be finite and non-negative
    #[error("Trajectory for subject {id}: invalid concentration {value} at index {index}")]
    InvalidConcentration { id: usize, index: usize, value: f64 },

    /// Interval probabilities must satisfy 0 < lower <= 0.5 <= upper < 1
    #[error("Invalid interval probabilities: lower = {lower}, upper = {upper}")]
    InvalidIntervalProbs { lower: f64, upper: f64 },
}
