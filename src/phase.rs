//! Hilbert-transform phase analysis.
//!
//! [`PhaseCoherenceAnalyzer`] builds the analytic signal of a sensor stream
//! and derives instantaneous phase, envelope and frequency, plus the phase
//! relationship between paired streams. Trot moves lateral acceleration and
//! yaw rate in lock-step; canter and gallop instead couple vertical
//! acceleration with yaw.

use num_complex::Complex64;

use crate::error::{GaitError, Result};
use crate::math::fft::{inverse_fft, real_fft};
use crate::math::stats::{centered_rms, circular_mean, mean, resultant_length, wrap_angle};

use std::f64::consts::PI;

/// RMS below which a signal carries no phase information.
pub const SILENCE_FLOOR: f64 = 1e-10;

/// Analytic-signal phase analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseCoherenceAnalyzer {
    sample_rate: f64,
}

impl PhaseCoherenceAnalyzer {
    /// Create an analyzer for signals sampled at `sample_rate` Hz.
    ///
    /// # Errors
    ///
    /// Returns an error if `sample_rate` is not positive.
    pub fn new(sample_rate: f64) -> Result<Self> {
        if sample_rate <= 0.0 || !sample_rate.is_finite() {
            return Err(GaitError::invalid_config("sample_rate must be positive"));
        }
        Ok(Self { sample_rate })
    }

    #[must_use]
    pub const fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Analytic signal `x + i·H{x}` of the mean-removed input.
    ///
    /// The input is zero-padded to the next power of two and the result is
    /// truncated back to the original length.
    #[must_use]
    pub fn analytic_signal(&self, signal: &[f64]) -> Vec<Complex64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        // DC biases the phase
        let dc = mean(signal);
        let padded_len = n.next_power_of_two();
        let mut padded: Vec<f64> = signal.iter().map(|&x| x - dc).collect();
        padded.resize(padded_len, 0.0);

        let mut spectrum = real_fft(&padded);
        let half = padded_len / 2;
        for (k, c) in spectrum.iter_mut().enumerate() {
            if k == 0 || (padded_len > 1 && k == half) {
                continue;
            }
            if k < half {
                *c *= 2.0;
            } else {
                *c = Complex64::new(0.0, 0.0);
            }
        }

        let mut analytic = inverse_fft(spectrum);
        analytic.truncate(n);
        analytic
    }

    /// Instantaneous phase `atan2(imag, real)` per sample.
    #[must_use]
    pub fn instantaneous_phase(&self, signal: &[f64]) -> Vec<f64> {
        self.analytic_signal(signal).iter().map(|c| c.im.atan2(c.re)).collect()
    }

    /// Instantaneous phase with ±2π discontinuities removed.
    #[must_use]
    pub fn unwrapped_phase(&self, signal: &[f64]) -> Vec<f64> {
        unwrap_phase(&self.instantaneous_phase(signal))
    }

    /// Magnitude of the analytic signal.
    #[must_use]
    pub fn envelope(&self, signal: &[f64]) -> Vec<f64> {
        self.analytic_signal(signal).iter().map(|c| c.norm()).collect()
    }

    /// Instantaneous frequency in Hz, one value per consecutive sample pair.
    #[must_use]
    pub fn instantaneous_frequency(&self, signal: &[f64]) -> Vec<f64> {
        let scale = self.sample_rate / (2.0 * PI);
        self.unwrapped_phase(signal)
            .windows(2)
            .map(|w| (w[1] - w[0]) * scale)
            .collect()
    }

    /// Per-sample phase of `signal1` minus phase of `signal2`, wrapped to `(−π, π]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signals differ in length.
    pub fn phase_difference(&self, signal1: &[f64], signal2: &[f64]) -> Result<Vec<f64>> {
        if signal1.len() != signal2.len() {
            return Err(GaitError::length_mismatch(signal1.len(), signal2.len()));
        }
        let p1 = self.instantaneous_phase(signal1);
        let p2 = self.instantaneous_phase(signal2);
        Ok(p1.iter().zip(p2.iter()).map(|(a, b)| wrap_angle(a - b)).collect())
    }

    /// Circular mean of the phase difference.
    ///
    /// # Errors
    ///
    /// Returns an error if the signals differ in length.
    pub fn mean_phase_difference(&self, signal1: &[f64], signal2: &[f64]) -> Result<f64> {
        Ok(circular_mean(&self.phase_difference(signal1, signal2)?))
    }

    /// Phase-locking value `|mean(exp(iΔφ))|` in `[0, 1]`.
    ///
    /// 0 when either signal is flat: a silent channel has no phase, so it
    /// cannot be locked to anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the signals differ in length.
    pub fn phase_locking_value(&self, signal1: &[f64], signal2: &[f64]) -> Result<f64> {
        let diff = self.phase_difference(signal1, signal2)?;
        if centered_rms(signal1) < SILENCE_FLOOR || centered_rms(signal2) < SILENCE_FLOOR {
            return Ok(0.0);
        }
        Ok(resultant_length(&diff))
    }
}

/// Remove ±2π jumps by accumulating the shortest-path delta between samples.
#[must_use]
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phase.len());
    let Some(&first) = phase.first() else {
        return out;
    };
    out.push(first);
    let mut acc = first;
    for w in phase.windows(2) {
        acc += wrap_angle(w[1] - w[0]);
        out.push(acc);
    }
    out
}
