//! Configuration for gait analysis.
//!
//! [`GaitConfig`] centralizes every tunable parameter of the pipeline,
//! including the empirically tuned thresholds of the motion/speed decision
//! table in [`DecisionThresholds`].
//!
//! # Example
//!
//! ```
//! use equine_gait::GaitConfig;
//!
//! let config = GaitConfig::wearable().with_confirmation_threshold(4);
//! assert!(config.validate().is_ok());
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GaitError, Result};

/// Thresholds used by the motion classifier, the speed mapping and the
/// sanity rules that reconcile the two.
///
/// Frequencies are vertical bounce frequencies in Hz, amplitudes are RMS
/// vertical acceleration in g and speeds are in m/s.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecisionThresholds {
    // Motion-based classification
    /// Below this bounce amplitude the horse is considered standing.
    pub stationary_max_amplitude: f64,
    /// Upper bounce frequency for walk.
    pub walk_max_frequency: f64,
    /// Upper bounce amplitude for walk.
    pub walk_max_amplitude: f64,
    /// Lower bounce frequency of the canter band.
    pub canter_min_frequency: f64,
    /// Bounce frequencies at or above this are the double bounce of trot.
    pub trot_min_frequency: f64,
    /// Bounce amplitude separating canter from gallop.
    pub gallop_min_amplitude: f64,

    // Speed-based classification (upper bounds)
    /// Speeds below this are stationary.
    pub speed_stationary_max: f64,
    /// Speeds below this are walk.
    pub speed_walk_max: f64,
    /// Speeds below this are trot.
    pub speed_trot_max: f64,
    /// Speeds below this are canter, above is gallop.
    pub speed_canter_max: f64,

    // Sanity rules
    /// Motion-detected canter below this speed defers to speed.
    pub canter_min_speed: f64,
    /// Motion-detected gallop below this speed defers to speed.
    pub gallop_min_speed: f64,
    /// Motion-detected stationary above this speed defers to speed.
    pub moving_min_speed: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            stationary_max_amplitude: 0.04,
            walk_max_frequency: 2.0,
            walk_max_amplitude: 0.15,
            canter_min_frequency: 1.7,
            trot_min_frequency: 2.7,
            gallop_min_amplitude: 0.45,

            speed_stationary_max: 0.5,
            speed_walk_max: 1.8,
            speed_trot_max: 3.8,
            speed_canter_max: 7.0,

            canter_min_speed: 2.0,
            gallop_min_speed: 5.0,
            moving_min_speed: 1.0,
        }
    }
}

impl DecisionThresholds {
    /// Validate ordering constraints between thresholds.
    ///
    /// # Errors
    ///
    /// Returns an error if any band is empty or a threshold is negative.
    pub fn validate(&self) -> Result<()> {
        if self.stationary_max_amplitude < 0.0 {
            return Err(GaitError::invalid_config(
                "stationary_max_amplitude must be non-negative",
            ));
        }
        if self.canter_min_frequency >= self.trot_min_frequency {
            return Err(GaitError::invalid_config(
                "canter_min_frequency must be below trot_min_frequency",
            ));
        }
        if self.walk_max_amplitude <= self.stationary_max_amplitude {
            return Err(GaitError::invalid_config(
                "walk_max_amplitude must exceed stationary_max_amplitude",
            ));
        }
        let speeds = [
            self.speed_stationary_max,
            self.speed_walk_max,
            self.speed_trot_max,
            self.speed_canter_max,
        ];
        if speeds[0] < 0.0 || speeds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GaitError::invalid_config(
                "speed thresholds must be non-negative and strictly increasing",
            ));
        }
        Ok(())
    }
}

/// Configuration for the full gait pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GaitConfig {
    // Sampling
    /// Motion sample rate in Hz.
    pub motion_sample_rate: f64,
    /// FFT window size for spectral features (power of two).
    pub spectral_window_size: usize,
    /// Overlap between consecutive spectral windows, in `[0, 1)`.
    pub window_overlap: f64,
    /// Search band for the dominant stride frequency (Hz).
    pub frequency_band: (f64, f64),

    // Numerics
    /// Floor guarding divisions and probability totals.
    pub numerical_eps: f64,
    /// Per-feature emission floor, relative to the Gaussian peak.
    pub emission_floor: f64,

    // Estimator
    /// Self-transition probability of the HMM.
    pub self_transition: f64,
    /// Factor applied to states whose speed bounds exclude the GPS speed.
    pub speed_gate_attenuation: f64,

    // Tracker
    /// Number of GPS speeds averaged for smoothing.
    pub speed_window: usize,
    /// Length of the bounce ring buffer in seconds.
    pub bounce_window_seconds: f64,
    /// Samples required before bounce amplitude is computed.
    pub min_bounce_samples: usize,
    /// Samples required before the motion estimate is trusted.
    pub min_motion_samples: usize,
    /// Smoothed speed required before the motion estimate is trusted.
    pub min_motion_speed: f64,
    /// Consecutive agreeing evaluations before a gait change is committed.
    pub confirmation_threshold: usize,
    /// Estimator confidence above which it replaces the bounce classifier.
    pub estimator_min_confidence: f64,
    /// Subtract the stationary gyroscope bias before frame rotation.
    pub gyro_bias_correction: bool,

    // Session
    /// Commands a session queues before sample pushes fail with `QueueFull`.
    pub session_queue_capacity: usize,

    /// Decision-table thresholds.
    pub thresholds: DecisionThresholds,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            motion_sample_rate: 50.0,
            spectral_window_size: 128,
            window_overlap: 0.5,
            frequency_band: (0.5, 6.0),

            numerical_eps: 1e-10,
            emission_floor: 1e-3,

            self_transition: 0.95,
            speed_gate_attenuation: 0.1,

            speed_window: 5,
            bounce_window_seconds: 2.0,
            min_bounce_samples: 20,
            min_motion_samples: 50,
            min_motion_speed: 0.5,
            confirmation_threshold: 3,
            estimator_min_confidence: 0.6,
            gyro_bias_correction: false,

            session_queue_capacity: 1024,

            thresholds: DecisionThresholds::default(),
        }
    }
}

impl GaitConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for a wrist or saddle wearable streaming at 50 Hz.
    #[must_use]
    pub fn wearable() -> Self {
        Self::default()
    }

    /// Preset for a phone streaming at 100 Hz.
    #[must_use]
    pub fn phone() -> Self {
        Self {
            motion_sample_rate: 100.0,
            spectral_window_size: 256,
            min_motion_samples: 100,
            min_bounce_samples: 40,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.motion_sample_rate <= 0.0 {
            return Err(GaitError::invalid_config(
                "motion_sample_rate must be positive",
            ));
        }
        if self.spectral_window_size == 0 || !self.spectral_window_size.is_power_of_two() {
            return Err(GaitError::invalid_window_size(self.spectral_window_size));
        }
        if !(0.0..1.0).contains(&self.window_overlap) {
            return Err(GaitError::invalid_config("window_overlap must be in [0, 1)"));
        }
        let (lo, hi) = self.frequency_band;
        if lo < 0.0 || hi <= lo || hi > self.motion_sample_rate / 2.0 {
            return Err(GaitError::invalid_config(
                "frequency_band must be a non-empty band below Nyquist",
            ));
        }
        if self.numerical_eps <= 0.0 {
            return Err(GaitError::invalid_config("numerical_eps must be positive"));
        }
        if !(0.0..1.0).contains(&self.emission_floor) {
            return Err(GaitError::invalid_config("emission_floor must be in [0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.self_transition) {
            return Err(GaitError::invalid_config(
                "self_transition must be a probability",
            ));
        }
        if !(0.0..=1.0).contains(&self.speed_gate_attenuation) {
            return Err(GaitError::invalid_config(
                "speed_gate_attenuation must be in [0, 1]",
            ));
        }
        if self.speed_window == 0 {
            return Err(GaitError::invalid_config("speed_window must be at least 1"));
        }
        if self.bounce_window_seconds <= 0.0 {
            return Err(GaitError::invalid_config(
                "bounce_window_seconds must be positive",
            ));
        }
        if self.min_bounce_samples > self.bounce_capacity()
            || self.min_motion_samples > self.bounce_capacity()
        {
            return Err(GaitError::invalid_config(
                "bounce window is too short for the minimum sample counts",
            ));
        }
        if self.confirmation_threshold == 0 {
            return Err(GaitError::invalid_config(
                "confirmation_threshold must be at least 1",
            ));
        }
        if self.session_queue_capacity == 0 {
            return Err(GaitError::invalid_config(
                "session_queue_capacity must be at least 1",
            ));
        }
        self.thresholds.validate()
    }

    /// Capacity of the bounce ring buffer in samples.
    #[must_use]
    pub fn bounce_capacity(&self) -> usize {
        (self.bounce_window_seconds * self.motion_sample_rate).round() as usize
    }

    /// Set the confirmation threshold.
    #[must_use]
    pub const fn with_confirmation_threshold(mut self, n: usize) -> Self {
        self.confirmation_threshold = n;
        self
    }

    /// Set the spectral window size.
    #[must_use]
    pub const fn with_spectral_window_size(mut self, size: usize) -> Self {
        self.spectral_window_size = size;
        self
    }

    /// Set the motion sample rate.
    #[must_use]
    pub const fn with_motion_sample_rate(mut self, rate: f64) -> Self {
        self.motion_sample_rate = rate;
        self
    }

    /// Enable or disable gyroscope bias correction.
    #[must_use]
    pub const fn with_gyro_bias_correction(mut self, enabled: bool) -> Self {
        self.gyro_bias_correction = enabled;
        self
    }

    /// Set the session command queue capacity.
    #[must_use]
    pub const fn with_session_queue_capacity(mut self, capacity: usize) -> Self {
        self.session_queue_capacity = capacity;
        self
    }

    /// Replace the decision thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: DecisionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GaitConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.confirmation_threshold, 3);
        assert_eq!(config.bounce_capacity(), 100);
    }

    #[test]
    fn test_phone_preset() {
        let config = GaitConfig::phone();
        assert!(config.validate().is_ok());
        assert_eq!(config.spectral_window_size, 256);
        assert_eq!(config.bounce_capacity(), 200);
    }

    #[test]
    fn test_validation() {
        let mut config = GaitConfig::default();

        config.spectral_window_size = 100;
        assert_eq!(
            config.validate(),
            Err(GaitError::InvalidWindowSize { size: 100 })
        );

        config.spectral_window_size = 128;
        config.window_overlap = 1.0;
        assert!(config.validate().is_err());

        config.window_overlap = 0.5;
        config.frequency_band = (3.0, 1.0);
        assert!(config.validate().is_err());

        config.frequency_band = (0.5, 6.0);
        config.confirmation_threshold = 0;
        assert!(config.validate().is_err());

        config.confirmation_threshold = 3;
        config.session_queue_capacity = 0;
        assert!(config.validate().is_err());
        assert!(config.with_session_queue_capacity(8).validate().is_ok());
    }

    #[test]
    fn test_threshold_validation() {
        let mut thresholds = DecisionThresholds::default();
        assert!(thresholds.validate().is_ok());

        thresholds.speed_trot_max = 1.0;
        assert!(thresholds.validate().is_err());

        let mut thresholds = DecisionThresholds::default();
        thresholds.canter_min_frequency = 3.0;
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = GaitConfig::default()
            .with_confirmation_threshold(5)
            .with_gyro_bias_correction(true)
            .with_spectral_window_size(256);
        assert_eq!(config.confirmation_threshold, 5);
        assert!(config.gyro_bias_correction);
        assert_eq!(config.spectral_window_size, 256);
    }
}
