//! FFT-based stride analysis.
//!
//! [`SpectralAnalyzer`] windows a vertical or lateral acceleration stream,
//! computes a Hann-windowed power spectrum and extracts the dominant stride
//! frequency, harmonic ratios and spectral entropy.
//!
//! # Example
//!
//! ```
//! use equine_gait::SpectralAnalyzer;
//!
//! let analyzer = SpectralAnalyzer::new(256, 100.0)?;
//! let signal: Vec<f64> = (0..256)
//!     .map(|i| (2.0 * std::f64::consts::PI * 2.0 * i as f64 / 100.0).sin())
//!     .collect();
//! let features = analyzer.process_window(&signal);
//! assert!((features.dominant_frequency - 2.0).abs() < 0.2);
//! # Ok::<(), equine_gait::GaitError>(())
//! ```

use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GaitError, Result};
use crate::math::fft::{generate_window, power_spectrum, WindowFunction};

/// Floor below which spectral power is treated as zero.
pub const POWER_FLOOR: f64 = 1e-10;

/// Default FFT window size.
pub const DEFAULT_WINDOW_SIZE: usize = 256;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 100.0;

/// Default stride-frequency search band in Hz.
pub const GAIT_BAND: (f64, f64) = (0.5, 6.0);

/// Features of one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpectralFeatures {
    /// Interpolated dominant frequency (Hz), 0 when not found.
    pub dominant_frequency: f64,
    /// Power at the dominant bin.
    pub power_at_f0: f64,
    /// Power at 2·f0 relative to f0.
    pub h2_ratio: f64,
    /// Power at 3·f0 relative to f0.
    pub h3_ratio: f64,
    /// Normalized Shannon entropy of the power spectrum, in `[0, 1]`.
    pub spectral_entropy: f64,
    /// Bin width in Hz.
    pub frequency_resolution: f64,
}

/// Spectral analyzer for fixed-size power-of-two windows.
#[derive(Clone)]
pub struct SpectralAnalyzer {
    window_size: usize,
    sample_rate: f64,
    band: (f64, f64),
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("window_size", &self.window_size)
            .field("sample_rate", &self.sample_rate)
            .field("band", &self.band)
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    /// Create an analyzer searching the default gait band.
    ///
    /// # Errors
    ///
    /// Returns an error if `window_size` is not a non-zero power of two or
    /// `sample_rate` is not positive.
    pub fn new(window_size: usize, sample_rate: f64) -> Result<Self> {
        Self::with_band(window_size, sample_rate, GAIT_BAND)
    }

    /// Create an analyzer with an explicit frequency search band.
    ///
    /// # Errors
    ///
    /// Same as [`SpectralAnalyzer::new`], plus an empty or negative band.
    pub fn with_band(window_size: usize, sample_rate: f64, band: (f64, f64)) -> Result<Self> {
        if window_size < 2 || !window_size.is_power_of_two() {
            return Err(GaitError::invalid_window_size(window_size));
        }
        if sample_rate <= 0.0 || !sample_rate.is_finite() {
            return Err(GaitError::invalid_config("sample_rate must be positive"));
        }
        if band.0 < 0.0 || band.1 <= band.0 {
            return Err(GaitError::invalid_config("frequency band must be non-empty"));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);

        Ok(Self {
            window_size,
            sample_rate,
            band,
            window: generate_window(window_size, WindowFunction::Hann),
            fft,
        })
    }

    #[must_use]
    pub const fn window_size(&self) -> usize {
        self.window_size
    }

    #[must_use]
    pub const fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Bin width in Hz.
    #[must_use]
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / self.window_size as f64
    }

    /// Hann-windowed one-sided power spectrum of the most recent
    /// `window_size` samples, or `None` if fewer are supplied.
    #[must_use]
    pub fn power_spectrum(&self, samples: &[f64]) -> Option<Vec<f64>> {
        if samples.len() < self.window_size {
            return None;
        }
        let recent = &samples[samples.len() - self.window_size..];

        let mut buffer: Vec<Complex64> = recent
            .iter()
            .zip(self.window.iter())
            .map(|(&x, &w)| Complex64::new(x * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        Some(power_spectrum(&buffer))
    }

    /// Analyze the most recent `window_size` samples.
    ///
    /// Returns zeroed features (except the resolution) when fewer samples
    /// are supplied.
    #[must_use]
    pub fn process_window(&self, samples: &[f64]) -> SpectralFeatures {
        let resolution = self.frequency_resolution();
        let Some(power) = self.power_spectrum(samples) else {
            return SpectralFeatures {
                frequency_resolution: resolution,
                ..SpectralFeatures::default()
            };
        };

        let (dominant_frequency, power_at_f0) =
            dominant_frequency(&power, resolution, self.band.0, self.band.1);

        SpectralFeatures {
            dominant_frequency,
            power_at_f0,
            h2_ratio: harmonic_ratio(&power, dominant_frequency, 2, resolution),
            h3_ratio: harmonic_ratio(&power, dominant_frequency, 3, resolution),
            spectral_entropy: spectral_entropy(&power),
            frequency_resolution: resolution,
        }
    }

    /// Analyze a long buffer with overlapping windows.
    ///
    /// Windows step by `window_size × (1 − overlap)` samples.
    ///
    /// # Errors
    ///
    /// Returns an error if `overlap` is outside `[0, 1)`.
    pub fn process_overlapping(&self, buffer: &[f64], overlap: f64) -> Result<Vec<SpectralFeatures>> {
        if !(0.0..1.0).contains(&overlap) {
            return Err(GaitError::invalid_config("overlap must be in [0, 1)"));
        }
        let step = ((self.window_size as f64 * (1.0 - overlap)).round() as usize).max(1);

        let mut results = Vec::new();
        let mut start = 0;
        while start + self.window_size <= buffer.len() {
            results.push(self.process_window(&buffer[start..start + self.window_size]));
            start += step;
        }
        Ok(results)
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        let mut planner = FftPlanner::new();
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            band: GAIT_BAND,
            window: generate_window(DEFAULT_WINDOW_SIZE, WindowFunction::Hann),
            fft: planner.plan_fft_forward(DEFAULT_WINDOW_SIZE),
        }
    }
}

/// Peak frequency inside `[min_hz, max_hz]`, refined by quadratic
/// interpolation over the peak bin and its two neighbors.
///
/// Returns `(frequency, power_at_peak_bin)`, or `(0, 0)` if the band holds
/// no bins or no power.
#[must_use]
pub fn dominant_frequency(power: &[f64], resolution: f64, min_hz: f64, max_hz: f64) -> (f64, f64) {
    if power.is_empty() || resolution <= 0.0 {
        return (0.0, 0.0);
    }

    let lo = (min_hz / resolution).ceil().max(0.0) as usize;
    let hi = ((max_hz / resolution).floor() as usize).min(power.len() - 1);
    if lo > hi {
        return (0.0, 0.0);
    }

    let mut peak = lo;
    for k in lo..=hi {
        if power[k] > power[peak] {
            peak = k;
        }
    }
    if power[peak] < POWER_FLOOR {
        return (0.0, 0.0);
    }

    let mut offset = 0.0;
    if peak > 0 && peak + 1 < power.len() {
        let (a, b, c) = (power[peak - 1], power[peak], power[peak + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > POWER_FLOOR {
            offset = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
        }
    }

    ((peak as f64 + offset) * resolution, power[peak])
}

/// Ratio of power at the `n`-th harmonic bin to power at the f0 bin.
///
/// Exactly 0 when f0 is not positive, either bin is outside the spectrum,
/// or the f0 power is below [`POWER_FLOOR`].
#[must_use]
pub fn harmonic_ratio(power: &[f64], f0: f64, n: usize, resolution: f64) -> f64 {
    if f0 <= 0.0 || resolution <= 0.0 {
        return 0.0;
    }
    let f0_bin = (f0 / resolution).round() as usize;
    let hn_bin = (n as f64 * f0 / resolution).round() as usize;
    if f0_bin >= power.len() || hn_bin >= power.len() {
        return 0.0;
    }
    let p0 = power[f0_bin];
    if p0 < POWER_FLOOR {
        return 0.0;
    }
    power[hn_bin] / p0
}

/// Shannon entropy of the normalized spectrum divided by `log2(N)`.
///
/// 0 when total power is below [`POWER_FLOOR`].
#[must_use]
pub fn spectral_entropy(power: &[f64]) -> f64 {
    let total: f64 = power.iter().sum();
    if total < POWER_FLOOR || power.len() < 2 {
        return 0.0;
    }
    let entropy: f64 = power
        .iter()
        .map(|&p| p / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    (entropy / (power.len() as f64).log2()).clamp(0.0, 1.0)
}
