//! Sliding windows over the incoming sensor streams.
//!
//! The tracker keeps three kinds of history:
//!
//! - [`BounceWindow`]: ~2 s of vertical acceleration for the lightweight
//!   bounce amplitude and zero-crossing frequency
//! - [`SpeedWindow`]: the last few GPS speeds, averaged for smoothing
//! - [`MotionHistory`]: horse-frame vertical, lateral and yaw buffers sized
//!   to one spectral window
//!
//! All buffers are fixed-capacity, so every push is bounded-time.
//!
//! # Example
//!
//! ```
//! use equine_gait::streaming::BounceWindow;
//!
//! let mut bounce = BounceWindow::new(100, 20);
//! for i in 0..50 {
//!     let t = i as f64 / 50.0;
//!     bounce.push((2.0 * std::f64::consts::PI * 2.5 * t).sin() * 0.3);
//! }
//! assert!(bounce.amplitude() > 0.2);
//! ```

use std::collections::VecDeque;

use crate::features::{bounce_frequency, HorseWindow};
use crate::math::stats::centered_rms;
use crate::types::{HorseFrameRotation, HorseFrameVector};

/// Fixed-capacity FIFO that evicts the oldest value on overflow.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    /// Create an empty window holding at most `capacity` values (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest when full.
    pub fn push(&mut self, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.values.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// Contents oldest-first as one slice.
    pub fn as_slice(&mut self) -> &[T] {
        self.values.make_contiguous()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Vertical-acceleration ring buffer with a cached RMS bounce amplitude.
#[derive(Debug, Clone)]
pub struct BounceWindow {
    samples: SlidingWindow<f64>,
    min_samples: usize,
    amplitude: f64,
}

impl BounceWindow {
    /// `capacity` samples retained; amplitude is computed once `min_samples` are present.
    #[must_use]
    pub fn new(capacity: usize, min_samples: usize) -> Self {
        Self {
            samples: SlidingWindow::new(capacity),
            min_samples,
            amplitude: 0.0,
        }
    }

    /// Append one vertical acceleration (g) and refresh the amplitude.
    pub fn push(&mut self, vertical: f64) {
        self.samples.push(vertical);
        if self.samples.len() >= self.min_samples {
            self.amplitude = centered_rms(self.samples.as_slice());
        }
    }

    /// RMS of the mean-removed buffer; 0 until enough samples arrived.
    #[must_use]
    pub const fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Zero-crossing bounce frequency (Hz) of the buffer.
    pub fn frequency(&mut self, sample_rate: f64) -> f64 {
        bounce_frequency(self.samples.as_slice(), sample_rate)
    }

    pub fn samples(&mut self) -> &[f64] {
        self.samples.as_slice()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.amplitude = 0.0;
    }
}

/// Moving average of recent GPS speeds.
#[derive(Debug, Clone)]
pub struct SpeedWindow {
    speeds: SlidingWindow<f64>,
}

impl SpeedWindow {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            speeds: SlidingWindow::new(size),
        }
    }

    /// Append a speed (m/s). Negative or non-finite readings are dropped.
    pub fn push(&mut self, speed: f64) {
        if speed.is_finite() && speed >= 0.0 {
            self.speeds.push(speed);
        }
    }

    /// Mean of the window, 0 when empty.
    #[must_use]
    pub fn smoothed(&self) -> f64 {
        if self.speeds.is_empty() {
            return 0.0;
        }
        self.speeds.iter().sum::<f64>() / self.speeds.len() as f64
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }

    pub fn clear(&mut self) {
        self.speeds.clear();
    }
}

/// Paired horse-frame buffers for spectral and phase analysis.
#[derive(Debug, Clone)]
pub struct MotionHistory {
    vertical: VecDeque<f64>,
    lateral: VecDeque<f64>,
    yaw: VecDeque<f64>,
    capacity: usize,
    last_timestamp: Option<f64>,
}

impl MotionHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            vertical: VecDeque::with_capacity(capacity),
            lateral: VecDeque::with_capacity(capacity),
            yaw: VecDeque::with_capacity(capacity),
            capacity,
            last_timestamp: None,
        }
    }

    /// Append one transformed sample. Returns `false` (and drops it) when
    /// the timestamp does not advance.
    pub fn push(
        &mut self,
        timestamp: f64,
        acceleration: &HorseFrameVector,
        rotation: &HorseFrameRotation,
    ) -> bool {
        if self.last_timestamp.is_some_and(|last| timestamp <= last) {
            return false;
        }
        self.last_timestamp = Some(timestamp);

        if self.vertical.len() == self.capacity {
            self.vertical.pop_front();
            self.lateral.pop_front();
            self.yaw.pop_front();
        }
        self.vertical.push_back(acceleration.vertical);
        self.lateral.push_back(acceleration.lateral);
        self.yaw.push_back(rotation.yaw);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertical.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.vertical.len() == self.capacity
    }

    /// The buffered window, or `None` until it is full.
    pub fn window(&mut self) -> Option<HorseWindow<'_>> {
        if !self.is_full() {
            return None;
        }
        self.vertical.make_contiguous();
        self.lateral.make_contiguous();
        self.yaw.make_contiguous();
        HorseWindow::new(
            self.vertical.as_slices().0,
            self.lateral.as_slices().0,
            self.yaw.as_slices().0,
        )
        .ok()
    }

    pub fn clear(&mut self) {
        self.vertical.clear();
        self.lateral.clear();
        self.yaw.clear();
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn sample(v: f64) -> (HorseFrameVector, HorseFrameRotation) {
        (
            HorseFrameVector {
                forward: 0.0,
                lateral: -v,
                vertical: v,
            },
            HorseFrameRotation {
                pitch: 0.0,
                roll: 0.0,
                yaw: 2.0 * v,
            },
        )
    }

    #[test]
    fn test_sliding_window_evicts_oldest() {
        let mut window = SlidingWindow::new(3);
        for i in 0..5 {
            window.push(i);
        }
        assert!(window.is_full());
        assert_eq!(window.as_slice(), &[2, 3, 4]);
        assert_eq!(window.latest(), Some(&4));
    }

    #[test]
    fn test_bounce_amplitude_waits_for_min_samples() {
        let mut bounce = BounceWindow::new(100, 20);
        for _ in 0..19 {
            bounce.push(0.5);
        }
        assert_eq!(bounce.amplitude(), 0.0);
        bounce.push(0.5);
        // Constant input has no bounce once the mean is removed.
        assert_relative_eq!(bounce.amplitude(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bounce_of_sine() {
        let rate = 50.0;
        let mut bounce = BounceWindow::new(100, 20);
        for i in 0..100 {
            bounce.push(0.3 * (2.0 * PI * 2.5 * i as f64 / rate).sin());
        }
        assert_relative_eq!(bounce.amplitude(), 0.3 / 2f64.sqrt(), epsilon = 1e-3);
        assert_relative_eq!(bounce.frequency(rate), 2.5, epsilon = 1e-6);
        assert_eq!(bounce.len(), 100);

        bounce.clear();
        assert!(bounce.is_empty());
        assert_eq!(bounce.amplitude(), 0.0);
    }

    #[test]
    fn test_speed_window_smooths() {
        let mut speeds = SpeedWindow::new(5);
        assert_eq!(speeds.smoothed(), 0.0);
        for s in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            speeds.push(s);
        }
        assert_relative_eq!(speeds.smoothed(), 4.0);
        speeds.push(f64::NAN);
        speeds.push(-1.0);
        assert_eq!(speeds.len(), 5);
    }

    #[test]
    fn test_motion_history_window() {
        let mut history = MotionHistory::new(8);
        for i in 0..12 {
            let (a, r) = sample(i as f64);
            assert!(history.push(i as f64 * 0.02, &a, &r));
            if i < 7 {
                assert!(history.window().is_none());
            }
        }
        let window = history.window().unwrap();
        assert_eq!(window.len(), 8);
        assert_eq!(window.vertical[0], 4.0);
        assert_eq!(window.lateral[7], -11.0);
        assert_eq!(window.yaw[7], 22.0);
    }

    #[test]
    fn test_motion_history_rejects_stale_timestamps() {
        let mut history = MotionHistory::new(8);
        let (a, r) = sample(1.0);
        assert!(history.push(1.0, &a, &r));
        assert!(!history.push(1.0, &a, &r));
        assert!(!history.push(0.5, &a, &r));
        assert_eq!(history.len(), 1);

        history.clear();
        assert!(history.is_empty());
        assert!(history.push(0.5, &a, &r));
    }
}
