//! FFT helpers for spectral gait analysis.
//!
//! Thin wrappers over `rustfft` for real-valued sensor signals: window
//! generation, forward/inverse transforms and one-sided power spectra.

use std::f64::consts::PI;

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Window function applied before the FFT to reduce spectral leakage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowFunction {
    /// Rectangular window.
    None,
    /// Hann window, the default for stride-frequency estimation.
    #[default]
    Hann,
}

/// Generate window function coefficients.
#[must_use]
pub fn generate_window(n: usize, window: WindowFunction) -> Vec<f64> {
    match window {
        WindowFunction::None => vec![1.0; n],
        WindowFunction::Hann => (0..n)
            .map(|i| {
                let t = i as f64 / (n - 1).max(1) as f64;
                0.5 * (1.0 - (2.0 * PI * t).cos())
            })
            .collect(),
    }
}

/// Forward FFT of a real signal, returning the full complex spectrum.
#[must_use]
pub fn real_fft(signal: &[f64]) -> Vec<Complex64> {
    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    if buffer.is_empty() {
        return buffer;
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(buffer.len());
    fft.process(&mut buffer);
    buffer
}

/// Inverse FFT, normalized by `1/N` so that it undoes [`real_fft`].
#[must_use]
pub fn inverse_fft(mut spectrum: Vec<Complex64>) -> Vec<Complex64> {
    let n = spectrum.len();
    if n == 0 {
        return spectrum;
    }

    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(n);
    ifft.process(&mut spectrum);

    let scale = 1.0 / n as f64;
    for c in &mut spectrum {
        *c *= scale;
    }
    spectrum
}

/// One-sided power spectrum (`N/2 + 1` bins) scaled by `1/N²`.
#[must_use]
pub fn power_spectrum(spectrum: &[Complex64]) -> Vec<f64> {
    let n = spectrum.len();
    if n == 0 {
        return Vec::new();
    }
    let scale = 1.0 / (n as f64 * n as f64);
    spectrum
        .iter()
        .take(n / 2 + 1)
        .map(|c| c.norm_sqr() * scale)
        .collect()
}
