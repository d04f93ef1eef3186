//! Hidden Markov Model over the five gait states.
//!
//! # Model
//!
//! - Hidden states: stationary, walk, trot, canter, gallop
//! - Emissions: independent Gaussians per feature dimension; frequency
//!   dimensions come from breed priors, the rest from a fixed table
//! - Transitions: strongly diagonal, nonzero only between adjacent states
//! - Gating: states whose hard speed bounds exclude the GPS speed are
//!   attenuated, not zeroed
//!
//! # Example
//!
//! ```
//! use equine_gait::{Breed, AgeAdjustment, GaitConfig, GaitFeatureVector, GaitStateEstimator};
//!
//! let mut estimator = GaitStateEstimator::new(&GaitConfig::default())?;
//! estimator.configure(Breed::Warmblood, AgeAdjustment::NONE);
//!
//! let features = GaitFeatureVector::from_bounce(1.8, 0.1, 1.4);
//! estimator.update(&features);
//! let total: f64 = estimator.belief().iter().sum();
//! assert!((total - 1.0).abs() < 1e-9);
//! # Ok::<(), equine_gait::GaitError>(())
//! ```

use std::f64::consts::PI;

use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::breed::{AgeAdjustment, Breed, BreedPriors, Range};
use crate::config::GaitConfig;
use crate::error::{GaitError, Result};
use crate::features::{Feature, GaitFeatureVector, FEATURE_COUNT};
use crate::math::stats::gaussian_pdf;
use crate::types::GaitState;

const N: usize = GaitState::COUNT;

/// Probability vector over the gait states.
pub type Belief = [f64; N];

/// Deterministic start-of-session belief.
pub const STATIONARY_BELIEF: Belief = [1.0, 0.0, 0.0, 0.0, 0.0];

/// One Gaussian emission dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaussianEmission {
    pub mean: f64,
    pub variance: f64,
}

impl GaussianEmission {
    #[must_use]
    pub const fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    /// Mean at the range midpoint, standard deviation a quarter of the half-width.
    #[must_use]
    pub fn from_range((lo, hi): Range) -> Self {
        let mean = 0.5 * (lo + hi);
        let std_dev = 0.5 * (hi - lo) / 4.0;
        Self::new(mean, std_dev * std_dev)
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Density at `x`, floored at `floor` times the peak density.
    ///
    /// Zero variance is a point mass and is never floored.
    #[must_use]
    pub fn density(&self, x: f64, floor: f64, eps: f64) -> f64 {
        let p = gaussian_pdf(x, self.mean, self.variance, eps);
        if self.variance < eps {
            return p;
        }
        let peak = 1.0 / (2.0 * PI * self.variance).sqrt();
        p.max(floor * peak)
    }
}

/// Emission model of one gait state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmissionModel {
    pub features: [GaussianEmission; FEATURE_COUNT],
}

impl EmissionModel {
    /// Model for `state` with the given stride-frequency range.
    #[must_use]
    pub fn for_state(state: GaitState, frequency_range: Range) -> Self {
        let s = state.index();
        let frequency = GaussianEmission::from_range(frequency_range);
        let table = |means: [f64; N], vars: [f64; N]| GaussianEmission::new(means[s], vars[s]);

        let mut features = [GaussianEmission::new(0.0, 1.0); FEATURE_COUNT];
        features[Feature::StrideFrequency.index()] = frequency;
        // Harmonics and entropy separate gaits only loosely; stride
        // frequency must be able to outvote them.
        features[Feature::H2Ratio.index()] =
            table([0.3, 0.5, 0.25, 0.6, 0.45], [0.09; N]);
        features[Feature::H3Ratio.index()] =
            table([0.2, 0.3, 0.15, 0.45, 0.35], [0.09; N]);
        features[Feature::SpectralEntropy.index()] =
            table([0.85, 0.45, 0.3, 0.35, 0.4], [0.04; N]);
        features[Feature::XyCoherence.index()] =
            table([0.2, 0.5, 0.8, 0.35, 0.3], [0.02; N]);
        features[Feature::ZYawCoherence.index()] =
            table([0.2, 0.4, 0.3, 0.75, 0.7], [0.02; N]);
        features[Feature::VerticalRms.index()] = table(
            [0.02, 0.1, 0.3, 0.25, 0.4],
            [0.0004, 0.0025, 0.01, 0.01, 0.02],
        );
        features[Feature::YawRms.index()] = table(
            [0.05, 0.2, 0.35, 0.5, 0.7],
            [0.0025, 0.01, 0.02, 0.03, 0.05],
        );
        features[Feature::WristRms.index()] = table(
            [0.03, 0.12, 0.35, 0.25, 0.3],
            [0.0004, 0.0036, 0.0144, 0.01, 0.0144],
        );
        features[Feature::WristFrequency.index()] = frequency;

        Self { features }
    }

    /// Log of the joint emission density over the available features.
    ///
    /// Missing features are marginalized out.
    #[must_use]
    pub fn log_likelihood(&self, observation: &GaitFeatureVector, floor: f64, eps: f64) -> f64 {
        observation
            .values()
            .iter()
            .zip(self.features.iter())
            .filter_map(|(value, emission)| value.map(|x| emission.density(x, floor, eps).ln()))
            .sum()
    }
}

/// Row-stochastic transition matrix restricted to adjacent states.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitionMatrix(pub [[f64; N]; N]);

impl TransitionMatrix {
    /// Self-transition `p` with the remaining mass split over adjacent states.
    #[must_use]
    pub fn adjacent(p: f64) -> Self {
        let mut rows = [[0.0; N]; N];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = p;
            let neighbors: Vec<usize> = [i.checked_sub(1), (i + 1 < N).then_some(i + 1)]
                .into_iter()
                .flatten()
                .collect();
            let share = (1.0 - p) / neighbors.len() as f64;
            for j in neighbors {
                row[j] = share;
            }
        }
        Self(rows)
    }

    /// P(to | from).
    #[must_use]
    pub fn probability(&self, from: GaitState, to: GaitState) -> f64 {
        self.0[from.index()][to.index()]
    }

    /// Check rows sum to one and non-adjacent entries are zero.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated row.
    pub fn validate(&self) -> Result<()> {
        for (i, row) in self.0.iter().enumerate() {
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > 1e-9 {
                return Err(GaitError::invalid_config(format!(
                    "transition row {i} sums to {sum}"
                )));
            }
            for (j, &p) in row.iter().enumerate() {
                if i.abs_diff(j) > 1 && p != 0.0 {
                    return Err(GaitError::invalid_config(format!(
                        "transition {i}->{j} skips a gait"
                    )));
                }
                if p < 0.0 {
                    return Err(GaitError::invalid_config(format!(
                        "transition {i}->{j} is negative"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Forward-algorithm gait estimator.
#[derive(Debug, Clone)]
pub struct GaitStateEstimator {
    breed: Breed,
    age: AgeAdjustment,
    priors: BreedPriors,
    emissions: [EmissionModel; N],
    transitions: TransitionMatrix,
    belief: Belief,
    speed_gate_attenuation: f64,
    emission_floor: f64,
    eps: f64,
    updates: u64,
}

impl GaitStateEstimator {
    /// Create an estimator with warmblood priors and no age widening.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &GaitConfig) -> Result<Self> {
        config.validate()?;
        let transitions = TransitionMatrix::adjacent(config.self_transition);
        transitions.validate()?;

        let mut estimator = Self {
            breed: Breed::default(),
            age: AgeAdjustment::NONE,
            priors: BreedPriors::default(),
            emissions: [EmissionModel::for_state(GaitState::Stationary, (0.0, 1.0)); N],
            transitions,
            belief: STATIONARY_BELIEF,
            speed_gate_attenuation: config.speed_gate_attenuation,
            emission_floor: config.emission_floor,
            eps: config.numerical_eps,
            updates: 0,
        };
        estimator.configure(Breed::default(), AgeAdjustment::NONE);
        Ok(estimator)
    }

    /// Rebuild all emission models from breed priors widened by `age`.
    pub fn configure(&mut self, breed: Breed, age: AgeAdjustment) {
        self.breed = breed;
        self.age = age;
        self.priors = breed.priors();
        for state in GaitState::ALL {
            let range = self.priors.frequency_range(state, age);
            self.emissions[state.index()] = EmissionModel::for_state(state, range);
        }
        debug!(
            target: "equine_gait::estimator",
            breed = %breed,
            age_factor = age.factor(),
            "configured emission models"
        );
    }

    /// One forward step followed by speed gating. Returns the new belief.
    pub fn update(&mut self, features: &GaitFeatureVector) -> Belief {
        self.updates += 1;

        let mut log_emissions = [0.0; N];
        for (log_e, model) in log_emissions.iter_mut().zip(self.emissions.iter()) {
            *log_e = model.log_likelihood(features, self.emission_floor, self.eps);
        }
        // Scale by the best state; the common factor cancels on normalization.
        let max_log = log_emissions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let emissions: [f64; N] = if max_log.is_finite() {
            log_emissions.map(|l| (l - max_log).exp())
        } else {
            [0.0; N]
        };

        let mut next = [0.0; N];
        for (j, slot) in next.iter_mut().enumerate() {
            let predicted: f64 = (0..N)
                .map(|i| self.belief[i] * self.transitions.0[i][j])
                .sum();
            *slot = predicted * emissions[j];
        }

        let total: f64 = next.iter().sum();
        if !total.is_finite() || total < self.eps {
            warn!(
                target: "equine_gait::estimator",
                total,
                "forward step collapsed, keeping previous belief"
            );
            return self.belief;
        }
        for p in &mut next {
            *p /= total;
        }

        self.belief = self.gate_by_speed(next, features.gps_speed);
        self.belief
    }

    /// Attenuate states whose speed bounds exclude `speed`, then renormalize.
    fn gate_by_speed(&self, belief: Belief, speed: f64) -> Belief {
        if !speed.is_finite() {
            return belief;
        }
        let mut gated = belief;
        for state in GaitState::ALL {
            let (lo, hi) = self.priors.speed_bounds(state);
            if speed < lo || speed > hi {
                gated[state.index()] *= self.speed_gate_attenuation;
            }
        }
        let total: f64 = gated.iter().sum();
        if total < self.eps {
            return belief;
        }
        gated.map(|p| p / total)
    }

    /// Most probable state.
    #[must_use]
    pub fn current_state(&self) -> GaitState {
        let mut best = 0;
        for (i, &p) in self.belief.iter().enumerate().skip(1) {
            if p > self.belief[best] {
                best = i;
            }
        }
        GaitState::from_index(best).unwrap_or_default()
    }

    /// Probability of the most probable state.
    #[must_use]
    pub fn state_confidence(&self) -> f64 {
        self.belief.iter().copied().fold(0.0, f64::max)
    }

    #[must_use]
    pub const fn belief(&self) -> &Belief {
        &self.belief
    }

    /// Probability of `state`.
    #[must_use]
    pub const fn probability(&self, state: GaitState) -> f64 {
        self.belief[state.index()]
    }

    #[must_use]
    pub const fn breed(&self) -> Breed {
        self.breed
    }

    #[must_use]
    pub const fn age_adjustment(&self) -> AgeAdjustment {
        self.age
    }

    #[must_use]
    pub const fn transitions(&self) -> &TransitionMatrix {
        &self.transitions
    }

    #[must_use]
    pub const fn emission_model(&self, state: GaitState) -> &EmissionModel {
        &self.emissions[state.index()]
    }

    #[must_use]
    pub const fn update_count(&self) -> u64 {
        self.updates
    }

    /// Restore the stationary-certain belief.
    pub fn reset(&mut self) {
        self.belief = STATIONARY_BELIEF;
        self.updates = 0;
    }
}
