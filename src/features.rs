//! Feature-vector assembly.
//!
//! Combines spectral, coherence, amplitude and rotation-energy features of
//! one horse-frame window into a [`GaitFeatureVector`] for the estimator.
//! Features that cannot be computed yet stay `None` and are left out of the
//! emission product.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GaitError, Result};
use crate::math::stats::{centered_rms, mean, rms};
use crate::phase::{PhaseCoherenceAnalyzer, SILENCE_FLOOR};
use crate::spectral::SpectralAnalyzer;

/// Number of emission dimensions.
pub const FEATURE_COUNT: usize = 10;

/// Emission feature dimensions, in [`GaitFeatureVector::values`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    StrideFrequency,
    H2Ratio,
    H3Ratio,
    SpectralEntropy,
    XyCoherence,
    ZYawCoherence,
    VerticalRms,
    YawRms,
    WristRms,
    WristFrequency,
}

impl Feature {
    /// All dimensions in vector order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::StrideFrequency,
        Feature::H2Ratio,
        Feature::H3Ratio,
        Feature::SpectralEntropy,
        Feature::XyCoherence,
        Feature::ZYawCoherence,
        Feature::VerticalRms,
        Feature::YawRms,
        Feature::WristRms,
        Feature::WristFrequency,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Features for one estimator update. Built once, consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaitFeatureVector {
    /// Dominant vertical bounce frequency (Hz).
    pub stride_frequency: f64,
    pub h2_ratio: Option<f64>,
    pub h3_ratio: Option<f64>,
    pub spectral_entropy: Option<f64>,
    /// Phase locking of lateral acceleration and yaw rate.
    pub xy_coherence: Option<f64>,
    /// Phase locking of vertical acceleration and yaw rate.
    pub z_yaw_coherence: Option<f64>,
    /// RMS vertical acceleration in g.
    pub vertical_rms: f64,
    /// RMS yaw rate in rad/s.
    pub yaw_rms: Option<f64>,
    /// Secondary (wrist) device RMS in g.
    pub wrist_rms: Option<f64>,
    /// Secondary (wrist) device dominant frequency in Hz.
    pub wrist_frequency: Option<f64>,
    /// Smoothed GPS speed in m/s, used for plausibility gating.
    pub gps_speed: f64,
}

impl GaitFeatureVector {
    /// Lightweight vector from the bounce ring buffer only.
    #[must_use]
    pub fn from_bounce(bounce_frequency: f64, bounce_amplitude: f64, gps_speed: f64) -> Self {
        Self {
            stride_frequency: bounce_frequency,
            vertical_rms: bounce_amplitude,
            gps_speed,
            ..Self::default()
        }
    }

    /// Emission features in [`Feature::ALL`] order; `None` when unavailable.
    #[must_use]
    pub fn values(&self) -> [Option<f64>; FEATURE_COUNT] {
        [
            Some(self.stride_frequency),
            self.h2_ratio,
            self.h3_ratio,
            self.spectral_entropy,
            self.xy_coherence,
            self.z_yaw_coherence,
            Some(self.vertical_rms),
            self.yaw_rms,
            self.wrist_rms,
            self.wrist_frequency,
        ]
    }

    /// Dense array with unavailable features set to zero.
    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        self.values().map(|v| v.unwrap_or(0.0))
    }

    /// Whether the spectral and coherence features are present.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.h2_ratio.is_some() && self.xy_coherence.is_some()
    }
}

/// One horse-frame analysis window.
#[derive(Debug, Clone, Copy)]
pub struct HorseWindow<'a> {
    pub vertical: &'a [f64],
    pub lateral: &'a [f64],
    pub yaw: &'a [f64],
}

impl<'a> HorseWindow<'a> {
    /// Bundle paired buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers differ in length.
    pub fn new(vertical: &'a [f64], lateral: &'a [f64], yaw: &'a [f64]) -> Result<Self> {
        if vertical.len() != lateral.len() {
            return Err(GaitError::length_mismatch(vertical.len(), lateral.len()));
        }
        if vertical.len() != yaw.len() {
            return Err(GaitError::length_mismatch(vertical.len(), yaw.len()));
        }
        Ok(Self {
            vertical,
            lateral,
            yaw,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertical.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty()
    }

    /// The most recent `n` samples of every buffer.
    #[must_use]
    pub fn tail(&self, n: usize) -> HorseWindow<'a> {
        let start = self.len().saturating_sub(n);
        HorseWindow {
            vertical: &self.vertical[start..],
            lateral: &self.lateral[start..],
            yaw: &self.yaw[start..],
        }
    }
}

/// Builds feature vectors from horse-frame windows.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    spectral: SpectralAnalyzer,
    phase: PhaseCoherenceAnalyzer,
    silence_floor: f64,
}

impl FeatureExtractor {
    /// # Errors
    ///
    /// Returns an error if the spectral or phase analyzer rejects its parameters.
    pub fn new(window_size: usize, sample_rate: f64, band: (f64, f64)) -> Result<Self> {
        Ok(Self {
            spectral: SpectralAnalyzer::with_band(window_size, sample_rate, band)?,
            phase: PhaseCoherenceAnalyzer::new(sample_rate)?,
            silence_floor: SILENCE_FLOOR,
        })
    }

    /// RMS below which a lateral or yaw channel counts as absent.
    #[must_use]
    pub fn with_silence_floor(mut self, floor: f64) -> Self {
        self.silence_floor = floor;
        self
    }

    #[must_use]
    pub const fn window_size(&self) -> usize {
        self.spectral.window_size()
    }

    #[must_use]
    pub const fn spectral(&self) -> &SpectralAnalyzer {
        &self.spectral
    }

    #[must_use]
    pub const fn phase(&self) -> &PhaseCoherenceAnalyzer {
        &self.phase
    }

    /// Full feature vector from the most recent window, or `None` when the
    /// window is shorter than the FFT size.
    ///
    /// A flat lateral or yaw channel (no sensor, or a horse that is not
    /// swaying) leaves the features that depend on it as `None`.
    #[must_use]
    pub fn extract(
        &self,
        window: &HorseWindow<'_>,
        wrist_vertical: Option<&[f64]>,
        gps_speed: f64,
    ) -> Option<GaitFeatureVector> {
        let size = self.window_size();
        if window.len() < size {
            return None;
        }
        let recent = window.tail(size);

        let spectral = self.spectral.process_window(recent.vertical);
        let live = |channel: &[f64]| centered_rms(channel) >= self.silence_floor;
        let (vertical_live, lateral_live, yaw_live) =
            (live(recent.vertical), live(recent.lateral), live(recent.yaw));

        // Buffers are equal length by construction, so these cannot fail.
        let xy = if lateral_live && yaw_live {
            self.phase.phase_locking_value(recent.lateral, recent.yaw).ok()
        } else {
            None
        };
        let z_yaw = if vertical_live && yaw_live {
            self.phase.phase_locking_value(recent.vertical, recent.yaw).ok()
        } else {
            None
        };

        let (wrist_rms, wrist_frequency) = match wrist_vertical {
            Some(w) if w.len() >= size => {
                let tail = &w[w.len() - size..];
                let features = self.spectral.process_window(tail);
                (Some(rms(tail)), Some(features.dominant_frequency))
            }
            _ => (None, None),
        };

        Some(GaitFeatureVector {
            stride_frequency: spectral.dominant_frequency,
            h2_ratio: Some(spectral.h2_ratio),
            h3_ratio: Some(spectral.h3_ratio),
            spectral_entropy: Some(spectral.spectral_entropy),
            xy_coherence: xy,
            z_yaw_coherence: z_yaw,
            vertical_rms: rms(recent.vertical),
            yaw_rms: yaw_live.then(|| rms(recent.yaw)),
            wrist_rms,
            wrist_frequency,
            gps_speed,
        })
    }
}

/// Times (s, from the first sample) of upward zero crossings of the
/// mean-removed signal, linearly interpolated between samples.
#[must_use]
pub fn upcrossing_times(samples: &[f64], sample_rate: f64) -> Vec<f64> {
    if samples.len() < 2 || sample_rate <= 0.0 {
        return Vec::new();
    }
    let dc = mean(samples);
    let dt = 1.0 / sample_rate;

    samples
        .windows(2)
        .enumerate()
        .filter_map(|(i, w)| {
            let (a, b) = (w[0] - dc, w[1] - dc);
            if a < 0.0 && b >= 0.0 {
                let frac = -a / (b - a);
                Some((i as f64 + frac) * dt)
            } else {
                None
            }
        })
        .collect()
}

/// Bounce frequency (Hz) from the spacing of upward zero crossings.
///
/// Returns 0 with fewer than two crossings.
#[must_use]
pub fn bounce_frequency(samples: &[f64], sample_rate: f64) -> f64 {
    let crossings = upcrossing_times(samples, sample_rate);
    match (crossings.first(), crossings.last()) {
        (Some(&first), Some(&last)) if crossings.len() >= 2 && last > first => {
            (crossings.len() - 1) as f64 / (last - first)
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn wave(freq: f64, n: usize, rate: f64, amplitude: f64, phase: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / rate + phase).sin())
            .collect()
    }

    #[test]
    fn test_bounce_frequency_exact() {
        let samples = wave(2.5, 50, 50.0, 0.3, 0.0);
        assert_relative_eq!(bounce_frequency(&samples, 50.0), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_bounce_frequency_flat_signal() {
        assert_eq!(bounce_frequency(&[0.0; 100], 50.0), 0.0);
        assert_eq!(bounce_frequency(&[], 50.0), 0.0);
    }

    #[test]
    fn test_upcrossings_are_one_period_apart() {
        let samples = wave(1.0, 200, 50.0, 1.0, 0.4);
        let times = upcrossing_times(&samples, 50.0);
        assert!(times.len() >= 3);
        for w in times.windows(2) {
            assert_relative_eq!(w[1] - w[0], 1.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_window_length_mismatch() {
        let a = [0.0; 4];
        let b = [0.0; 3];
        assert!(HorseWindow::new(&a, &a, &b).is_err());
        assert!(HorseWindow::new(&a, &b, &a).is_err());
        assert!(HorseWindow::new(&a, &a, &a).is_ok());
    }

    #[test]
    fn test_extract_requires_full_window() {
        let extractor = FeatureExtractor::new(128, 50.0, (0.5, 6.0)).unwrap();
        let short = vec![0.0; 100];
        let window = HorseWindow::new(&short, &short, &short).unwrap();
        assert!(extractor.extract(&window, None, 3.0).is_none());
    }

    #[test]
    fn test_extract_trot_like_window() {
        let extractor = FeatureExtractor::new(128, 50.0, (0.5, 6.0)).unwrap();
        let vertical = wave(3.0, 160, 50.0, 0.3, 0.0);
        let lateral = wave(1.5, 160, 50.0, 0.1, 0.0);
        let yaw = wave(1.5, 160, 50.0, 0.4, 0.2);
        let window = HorseWindow::new(&vertical, &lateral, &yaw).unwrap();

        let features = extractor.extract(&window, None, 3.0).unwrap();
        assert!((features.stride_frequency - 3.0).abs() < 0.2);
        assert!(features.is_complete());
        assert!(features.xy_coherence.unwrap() > 0.8);
        assert_relative_eq!(features.vertical_rms, 0.3 / 2f64.sqrt(), epsilon = 0.02);
        assert!(features.wrist_rms.is_none());
        assert_eq!(features.gps_speed, 3.0);
    }

    #[test]
    fn test_silent_channels_are_left_out() {
        let extractor = FeatureExtractor::new(128, 50.0, (0.5, 6.0)).unwrap();
        let vertical = wave(2.5, 128, 50.0, 0.3, 0.0);
        let silent = vec![0.0; 128];
        let window = HorseWindow::new(&vertical, &silent, &silent).unwrap();

        let features = extractor.extract(&window, None, 4.0).unwrap();
        assert!((features.stride_frequency - 2.5).abs() < 0.1);
        assert!(features.h2_ratio.is_some());
        assert_eq!(features.xy_coherence, None);
        assert_eq!(features.z_yaw_coherence, None);
        assert_eq!(features.yaw_rms, None);
        assert!(!features.is_complete());
    }

    #[test]
    fn test_silent_lateral_keeps_vertical_yaw_coupling() {
        let extractor = FeatureExtractor::new(128, 50.0, (0.5, 6.0)).unwrap();
        let vertical = wave(2.5, 128, 50.0, 0.3, 0.0);
        let yaw = wave(2.5, 128, 50.0, 0.4, 0.5);
        let silent = vec![0.0; 128];
        let window = HorseWindow::new(&vertical, &silent, &yaw).unwrap();

        let features = extractor.extract(&window, None, 4.0).unwrap();
        assert_eq!(features.xy_coherence, None);
        assert!(features.z_yaw_coherence.unwrap() > 0.9);
        assert!(features.yaw_rms.unwrap() > 0.2);
    }

    #[test]
    fn test_wrist_features_when_available() {
        let extractor = FeatureExtractor::new(64, 50.0, (0.5, 6.0)).unwrap();
        let v = wave(2.0, 64, 50.0, 0.2, 0.0);
        let wrist = wave(2.0, 80, 50.0, 0.5, 0.0);
        let window = HorseWindow::new(&v, &v, &v).unwrap();

        let features = extractor.extract(&window, Some(&wrist), 4.0).unwrap();
        assert!(features.wrist_rms.unwrap() > 0.3);
        assert!((features.wrist_frequency.unwrap() - 2.0).abs() < 0.3);
    }

    #[test]
    fn test_missing_features_render_as_zero() {
        let features = GaitFeatureVector::from_bounce(2.5, 0.2, 4.0);
        let array = features.to_array();
        assert_eq!(array[Feature::StrideFrequency.index()], 2.5);
        assert_eq!(array[Feature::VerticalRms.index()], 0.2);
        assert_eq!(array[Feature::H2Ratio.index()], 0.0);
        assert_eq!(array[Feature::WristRms.index()], 0.0);
        assert!(features.values()[Feature::XyCoherence.index()].is_none());
        assert!(!features.is_complete());
    }
}
