//! Device-to-horse frame rotation.
//!
//! [`FrameTransformer`] composes the device attitude with a one-time mount
//! calibration and rotates sensor vectors into horse-relative axes. A
//! [`GyroBiasEstimator`] can optionally remove the stationary gyroscope
//! offset before rotation.

use std::collections::VecDeque;

use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use crate::types::{Attitude, HorseFrameRotation, HorseFrameVector};

/// Mount calibration: conjugate of the attitude captured at calibration time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationState {
    /// Always unit-norm.
    pub offset: UnitQuaternion<f64>,
    pub is_calibrated: bool,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            offset: UnitQuaternion::identity(),
            is_calibrated: false,
        }
    }
}

/// Rotates device-frame vectors into the horse frame.
#[derive(Debug, Clone, Default)]
pub struct FrameTransformer {
    calibration: CalibrationState,
    gyro_bias: Option<Vector3<f64>>,
}

impl FrameTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the inverse of the current attitude as the mount offset.
    pub fn calibrate(&mut self, attitude: &Attitude) {
        let q = attitude.to_unit_quaternion();
        self.calibration = CalibrationState {
            offset: q.conjugate(),
            is_calibrated: true,
        };
        debug!(target: "equine_gait::frame", "calibrated mount offset: {:?}", self.calibration.offset);
    }

    /// Restore the identity offset.
    pub fn reset_calibration(&mut self) {
        self.calibration = CalibrationState::default();
    }

    #[must_use]
    pub const fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated
    }

    /// Set (or clear) the gyroscope bias subtracted from rotation rates.
    pub fn set_gyro_bias(&mut self, bias: Option<Vector3<f64>>) {
        self.gyro_bias = bias;
    }

    /// Effective rotation: `q_cal * q_device` when calibrated.
    fn effective_rotation(&self, attitude: &Attitude) -> UnitQuaternion<f64> {
        let q_device = attitude.to_unit_quaternion();
        if self.calibration.is_calibrated {
            self.calibration.offset * q_device
        } else {
            q_device
        }
    }

    /// Rotate an acceleration into horse axes.
    #[must_use]
    pub fn acceleration_to_horse_frame(
        &self,
        acceleration: &Vector3<f64>,
        attitude: &Attitude,
    ) -> HorseFrameVector {
        // q * v * q⁻¹
        let v = self.effective_rotation(attitude).transform_vector(acceleration);
        HorseFrameVector {
            forward: v.y,
            lateral: v.x,
            vertical: v.z,
        }
    }

    /// Rotate a rotation rate into horse axes.
    #[must_use]
    pub fn rotation_to_horse_frame(
        &self,
        rotation_rate: &Vector3<f64>,
        attitude: &Attitude,
    ) -> HorseFrameRotation {
        let corrected = match self.gyro_bias {
            Some(bias) => rotation_rate - bias,
            None => *rotation_rate,
        };
        let v = self.effective_rotation(attitude).transform_vector(&corrected);
        HorseFrameRotation {
            pitch: v.x,
            roll: v.y,
            yaw: v.z,
        }
    }

    /// Convenience for callers holding Euler angles only.
    #[must_use]
    pub fn acceleration_from_euler(
        &self,
        acceleration: &Vector3<f64>,
        pitch: f64,
        roll: f64,
        yaw: f64,
    ) -> HorseFrameVector {
        self.acceleration_to_horse_frame(acceleration, &Attitude::Euler { pitch, roll, yaw })
    }
}

/// Default window for the bias average (10 s at 50 Hz).
const DEFAULT_BIAS_WINDOW: usize = 500;

/// Samples required before the estimate is used.
const MIN_SAMPLES_FOR_VALID_ESTIMATE: usize = 100;

/// Averages gyroscope readings taken while the horse stands still.
#[derive(Debug, Clone)]
pub struct GyroBiasEstimator {
    window: VecDeque<Vector3<f64>>,
    capacity: usize,
    sum: Vector3<f64>,
}

impl GyroBiasEstimator {
    /// Create an estimator averaging up to `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            sum: Vector3::zeros(),
        }
    }

    /// Ingest a rotation rate recorded during a stationary period.
    pub fn update(&mut self, rotation_rate: Vector3<f64>) {
        if self.window.len() == self.capacity {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        self.window.push_back(rotation_rate);
        self.sum += rotation_rate;
    }

    /// Current estimate, `None` until enough samples were seen.
    #[must_use]
    pub fn bias(&self) -> Option<Vector3<f64>> {
        if self.window.len() < MIN_SAMPLES_FOR_VALID_ESTIMATE.min(self.capacity) {
            return None;
        }
        Some(self.sum / self.window.len() as f64)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.sum = Vector3::zeros();
    }
}

impl Default for GyroBiasEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_BIAS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn yaw_attitude(yaw: f64) -> Attitude {
        Attitude::Euler {
            pitch: 0.0,
            roll: 0.0,
            yaw,
        }
    }

    #[test]
    fn test_identity_preserves_axes() {
        let transformer = FrameTransformer::new();
        let v = transformer.acceleration_to_horse_frame(
            &Vector3::new(0.1, 0.2, 0.3),
            &Attitude::identity(),
        );
        assert_relative_eq!(v.lateral, 0.1, epsilon = 1e-12);
        assert_relative_eq!(v.forward, 0.2, epsilon = 1e-12);
        assert_relative_eq!(v.vertical, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_uncalibrated_uses_device_attitude() {
        let transformer = FrameTransformer::new();
        // 90° yaw maps device x onto reference y.
        let v = transformer
            .acceleration_to_horse_frame(&Vector3::new(1.0, 0.0, 0.0), &yaw_attitude(FRAC_PI_2));
        assert_relative_eq!(v.forward, 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.lateral, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calibration_cancels_mount_attitude() {
        let mut transformer = FrameTransformer::new();
        let mount = Attitude::Euler {
            pitch: 0.3,
            roll: -0.2,
            yaw: 1.1,
        };
        transformer.calibrate(&mount);
        assert!(transformer.is_calibrated());

        let accel = Vector3::new(0.05, -0.1, 0.4);
        let v = transformer.acceleration_to_horse_frame(&accel, &mount);
        assert_relative_eq!(v.lateral, accel.x, epsilon = 1e-12);
        assert_relative_eq!(v.forward, accel.y, epsilon = 1e-12);
        assert_relative_eq!(v.vertical, accel.z, epsilon = 1e-12);
    }

    #[test]
    fn test_calibration_offset_is_unit() {
        let mut transformer = FrameTransformer::new();
        transformer.calibrate(&Attitude::Quaternion {
            w: 3.0,
            x: 1.0,
            y: 0.5,
            z: -2.0,
        });
        let norm = transformer.calibration().offset.quaternion().norm();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_calibration() {
        let mut transformer = FrameTransformer::new();
        transformer.calibrate(&yaw_attitude(0.7));
        transformer.reset_calibration();
        assert!(!transformer.is_calibrated());
        assert_eq!(transformer.calibration().offset, UnitQuaternion::identity());
    }

    #[test]
    fn test_rotation_shares_composition() {
        let transformer = FrameTransformer::new();
        let r = transformer
            .rotation_to_horse_frame(&Vector3::new(0.0, 0.0, 0.5), &yaw_attitude(0.4));
        // Rotation about z leaves the yaw rate untouched.
        assert_relative_eq!(r.yaw, 0.5, epsilon = 1e-12);
        assert_relative_eq!(r.pitch, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_euler_overload_matches_quaternion() {
        let transformer = FrameTransformer::new();
        let accel = Vector3::new(0.2, 0.1, -0.3);
        let a = transformer.acceleration_from_euler(&accel, 0.1, 0.2, 0.3);
        let q = crate::types::euler_to_quaternion(0.1, 0.2, 0.3);
        let b = transformer.acceleration_to_horse_frame(
            &accel,
            &Attitude::Quaternion {
                w: q.w,
                x: q.i,
                y: q.j,
                z: q.k,
            },
        );
        assert_relative_eq!(a.forward, b.forward, epsilon = 1e-12);
        assert_relative_eq!(a.lateral, b.lateral, epsilon = 1e-12);
        assert_relative_eq!(a.vertical, b.vertical, epsilon = 1e-12);
    }

    #[test]
    fn test_gyro_bias_estimate() {
        let mut estimator = GyroBiasEstimator::new(200);
        let bias = Vector3::new(0.01, -0.02, 0.005);
        for _ in 0..99 {
            estimator.update(bias);
        }
        assert!(estimator.bias().is_none());
        estimator.update(bias);
        let est = estimator.bias().unwrap();
        assert_relative_eq!(est, bias, epsilon = 1e-12);

        estimator.reset();
        assert!(estimator.is_empty());
    }

    #[test]
    fn test_gyro_bias_is_subtracted() {
        let mut transformer = FrameTransformer::new();
        let bias = Vector3::new(0.0, 0.0, 0.02);
        transformer.set_gyro_bias(Some(bias));
        let r = transformer.rotation_to_horse_frame(&bias, &Attitude::identity());
        assert_relative_eq!(r.yaw, 0.0, epsilon = 1e-12);
    }
}
