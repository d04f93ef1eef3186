//! Mathematical utilities for gait analysis.
//!
//! This module provides:
//! - [`fft`]: windowing, real FFT and power spectrum helpers
//! - [`stats`]: RMS, Gaussian densities and circular statistics

pub mod fft;
pub mod stats;

pub use fft::{generate_window, power_spectrum, real_fft, WindowFunction};
pub use stats::{centered_rms, circular_mean, gaussian_pdf, mean, rms, wrap_angle};
