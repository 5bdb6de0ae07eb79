//! Covariate sampling from growth-chart distribution parameters
//!
//! Weights are drawn by a Box-Cox Cole-Green (BCCG) quantile transform of a
//! standard-normal deviate z:
//!
//! ```text
//! L != 0:  w = M * (1 + L*S*z)^(1/L)
//! L == 0:  w = M * exp(S*z)
//! ```
//!
//! The transform is undefined when `1 + L*S*z <= 0`; such draws are
//! resampled up to a bounded retry count and then reported as a typed
//! failure rather than silently producing NaN.
//!
//! All randomness flows through explicitly seeded generators. Sub-streams
//! are derived from a master seed with a SplitMix64 mix, tagged by
//! [`StreamDomain`] so weight and eta streams stay independent, making
//! sampling bit-reproducible and independent of parallelism degree.

use crate::data::{CovariateParams, GrowthTable, Population, Subject};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use thiserror::Error;

/// Draws whose transform argument is non-positive are retried this many
/// times before sampling fails.
const RESAMPLE_CAP: usize = 100;

/// Errors from BCCG covariate sampling
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplerError {
    /// `1 + L*S*z <= 0`, so the Box-Cox power is undefined for this deviate
    #[error("BCCG transform undefined for z = {z} (M = {m}, S = {s}, L = {l}): 1 + L*S*z <= 0")]
    UndefinedPower { m: f64, s: f64, l: f64, z: f64 },

    /// Location and scale must be strictly positive, skewness finite
    #[error("Invalid BCCG parameter: {param} = {value}")]
    InvalidParameter { param: &'static str, value: f64 },
}

/// Independent stream families derived from one master seed
///
/// The domain tag is mixed into the seed before sub-stream derivation, so
/// the weight stream for cell i and the eta stream for subject i never
/// share a deviate sequence even under the same master seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDomain {
    /// Covariate weight draws, one stream per growth-table cell
    Weights,
    /// Random-effect draws, one stream per subject
    Etas,
}

impl StreamDomain {
    fn tag(self) -> u64 {
        match self {
            StreamDomain::Weights => 0xA076_1D64_95B2_90E4,
            StreamDomain::Etas => 0xE703_7ED1_A0B4_28DB,
        }
    }
}

/// Derive a deterministic sub-stream seed from a master seed, a stream
/// domain, and a stream id
///
/// SplitMix64 finalizer over `master ^ tag ^ (id * golden gamma)`. Every
/// subject and every grid cell gets its own generator, so results do not
/// depend on which thread consumed which stream.
pub fn substream_seed(master: u64, domain: StreamDomain, id: u64) -> u64 {
    let mut z = master ^ domain.tag() ^ id.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generator for a named sub-stream of the master seed
pub fn substream_rng(master: u64, domain: StreamDomain, id: u64) -> StdRng {
    StdRng::seed_from_u64(substream_seed(master, domain, id))
}

/// Apply the BCCG quantile transform to a standard-normal deviate
///
/// # Errors
///
/// [`SamplerError::InvalidParameter`] if M or S is not strictly positive or
/// L is not finite, [`SamplerError::UndefinedPower`] if `1 + L*S*z <= 0`.
pub fn bccg_quantile(params: &CovariateParams, z: f64) -> Result<f64, SamplerError> {
    if !(params.m.is_finite() && params.m > 0.0) {
        return Err(SamplerError::InvalidParameter {
            param: "M",
            value: params.m,
        });
    }
    if !(params.s.is_finite() && params.s > 0.0) {
        return Err(SamplerError::InvalidParameter {
            param: "S",
            value: params.s,
        });
    }
    if !params.l.is_finite() {
        return Err(SamplerError::InvalidParameter {
            param: "L",
            value: params.l,
        });
    }

    if params.l == 0.0 {
        return Ok(params.m * (params.s * z).exp());
    }

    let base = 1.0 + params.l * params.s * z;
    if base <= 0.0 {
        return Err(SamplerError::UndefinedPower {
            m: params.m,
            s: params.s,
            l: params.l,
            z,
        });
    }
    Ok(params.m * base.powf(1.0 / params.l))
}

/// Draw one weight from a BCCG cell using the supplied generator
///
/// Deviates outside the distribution's support are resampled; once the
/// retry cap is exhausted the last [`SamplerError::UndefinedPower`] is
/// returned.
pub fn sample_weight(params: &CovariateParams, rng: &mut StdRng) -> Result<f64, SamplerError> {
    let mut last_err = None;
    for _ in 0..RESAMPLE_CAP {
        let z: f64 = StandardNormal.sample(rng);
        match bccg_quantile(params, z) {
            Ok(weight) => return Ok(weight),
            Err(err @ SamplerError::UndefinedPower { .. }) => last_err = Some(err),
            Err(err) => return Err(err),
        }
    }
    // The support always carries probability >= 1/2, so running out of
    // retries means last_err is populated.
    Err(last_err.unwrap_or(SamplerError::InvalidParameter {
        param: "L",
        value: params.l,
    }))
}

/// Draw `n` independent weights from one grid cell
///
/// The sequence is bit-identical for a fixed generator state and fixed
/// (M, S, L, n).
pub fn sample_weights(
    params: &CovariateParams,
    n: usize,
    rng: &mut StdRng,
) -> Result<Vec<f64>, SamplerError> {
    let mut weights = Vec::with_capacity(n);
    for _ in 0..n {
        weights.push(sample_weight(params, rng)?);
    }
    Ok(weights)
}

/// Build a virtual population from a growth table
///
/// Draws `n_per_cell` subjects from every (age, sex) grid cell. Each cell
/// consumes its own sub-stream of `seed`, indexed by position in the table,
/// and subject ids are assigned sequentially in table order.
pub fn sample_population(
    table: &GrowthTable,
    n_per_cell: usize,
    seed: u64,
) -> Result<Population, crate::PopkinError> {
    let mut population = Population::default();
    let mut next_id = 0usize;

    for (cell_index, cell) in table.cells().iter().enumerate() {
        let mut rng = substream_rng(seed, StreamDomain::Weights, cell_index as u64);
        let weights = sample_weights(cell, n_per_cell, &mut rng)?;
        for weight in weights {
            let subject = Subject::new(next_id, weight, cell.age_months / 12.0, cell.sex)?;
            population.add_subject(subject);
            next_id += 1;
        }
    }

    Ok(population)
}
