//! Equine Gait Library
//!
//! Real-time horse gait classification from a rider-mounted IMU and coarse
//! GPS speed.
//!
//! Raw motion samples are rotated into the horse frame, analyzed spectrally
//! (stride frequency, harmonics, entropy) and by Hilbert phase (left/right
//! coherence), then fed to a five-state Hidden Markov Model whose opinion is
//! reconciled with GPS speed and smoothed by a confirmation policy. The
//! output is a flicker-resistant gait label plus per-gait segments.
//!
//! # Features
//!
//! - **Frame rotation**: quaternion mount calibration, optional gyro bias removal
//! - **Spectral**: Hann-windowed FFT, interpolated dominant frequency, H2/H3, entropy
//! - **Phase**: analytic signal, circular phase statistics, phase locking
//! - **HMM**: breed/age priors, adjacent-only transitions, speed gating
//! - **Tracking**: decision table, hysteresis, segments with lead and rhythm
//! - **Sessions**: single-writer worker thread fed by any number of producers
//!
//! # Quick Start
//!
//! ```
//! use equine_gait::{
//!     AgeAdjustment, Attitude, Breed, GaitConfig, GaitSegmentTracker, GaitState,
//!     LocationSample, MotionSample,
//! };
//! use nalgebra::Vector3;
//!
//! let mut tracker = GaitSegmentTracker::new(GaitConfig::wearable())?;
//! tracker.configure(Breed::Warmblood, AgeAdjustment::for_age(9.0));
//! tracker.start_analyzing(0.0);
//!
//! // 1 s of 2.5 Hz vertical bounce at 0.3 g
//! for i in 0..50 {
//!     let t = f64::from(i) / 50.0;
//!     let z = 0.3 * (2.0 * std::f64::consts::PI * 2.5 * t).sin();
//!     let sample = MotionSample::new(t, Vector3::new(0.0, 0.0, z), Vector3::zeros(), Attitude::identity());
//!     tracker.process_motion(&sample)?;
//! }
//! for i in 1..=12 {
//!     tracker.process_location(&LocationSample::new(1.0 + f64::from(i), 4.0, 4.0))?;
//! }
//! assert_eq!(tracker.current_gait(), GaitState::Canter);
//!
//! let segments = tracker.stop_analyzing(14.0)?;
//! assert_eq!(segments.len(), 4);
//! # Ok::<(), equine_gait::GaitError>(())
//! ```
//!
//! # Presets
//!
//! ```
//! use equine_gait::GaitConfig;
//!
//! let wearable = GaitConfig::wearable();
//! let phone = GaitConfig::phone();
//! assert_eq!(phone.spectral_window_size, 256);
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod annotation;
pub mod breed;
pub mod config;
pub mod decision;
pub mod error;
pub mod estimator;
pub mod features;
pub mod frame;
pub mod math;
pub mod phase;
pub mod segment;
pub mod session;
pub mod spectral;
pub mod streaming;
pub mod tracker;
pub mod types;

// Re-exports for convenient access
pub use annotation::{LeadAnalyzer, LeadEstimate, RhythmAnalyzer};
pub use breed::{AgeAdjustment, Breed, BreedPriors};
pub use config::{DecisionThresholds, GaitConfig};
pub use decision::{classify_motion, classify_speed, resolve, Decision, DecisionRule};
pub use error::{GaitError, Result};
pub use estimator::{Belief, GaitStateEstimator, TransitionMatrix};
pub use features::{FeatureExtractor, GaitFeatureVector, HorseWindow};
pub use frame::{CalibrationState, FrameTransformer, GyroBiasEstimator};
pub use phase::PhaseCoherenceAnalyzer;
pub use segment::{GaitEvent, GaitSegment, GaitSummary, GaitTotals};
pub use session::{GaitSession, SessionHandle};
pub use spectral::{SpectralAnalyzer, SpectralFeatures};
pub use tracker::{EventCallback, GaitSegmentTracker, TrackerSnapshot};
pub use types::{
    euler_to_quaternion, Attitude, GaitState, HorseFrameRotation, HorseFrameVector, Lead,
    LocationSample, MotionSample,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of gait states.
pub const GAIT_STATE_COUNT: usize = GaitState::COUNT;
