//! Core data types shared by the analysis pipeline.
//!
//! Samples flow in from sensor collaborators, get rotated into the horse
//! frame and end up as [`GaitState`] decisions.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GaitError, Result};

/// Horse gait, ordered by increasing locomotor intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GaitState {
    /// Standing still.
    #[default]
    Stationary,
    /// Four-beat walk.
    Walk,
    /// Two-beat diagonal trot.
    Trot,
    /// Three-beat canter.
    Canter,
    /// Four-beat gallop.
    Gallop,
}

impl GaitState {
    /// Number of gait states.
    pub const COUNT: usize = 5;

    /// All states in intensity order.
    pub const ALL: [GaitState; 5] = [
        GaitState::Stationary,
        GaitState::Walk,
        GaitState::Trot,
        GaitState::Canter,
        GaitState::Gallop,
    ];

    /// Index of this state in belief vectors and matrices.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            GaitState::Stationary => 0,
            GaitState::Walk => 1,
            GaitState::Trot => 2,
            GaitState::Canter => 3,
            GaitState::Gallop => 4,
        }
    }

    /// State for a belief-vector index.
    #[must_use]
    pub const fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(GaitState::Stationary),
            1 => Some(GaitState::Walk),
            2 => Some(GaitState::Trot),
            3 => Some(GaitState::Canter),
            4 => Some(GaitState::Gallop),
            _ => None,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            GaitState::Stationary => "stationary",
            GaitState::Walk => "walk",
            GaitState::Trot => "trot",
            GaitState::Canter => "canter",
            GaitState::Gallop => "gallop",
        }
    }

    /// True when `other` is exactly one intensity step away.
    #[must_use]
    pub const fn is_adjacent(self, other: GaitState) -> bool {
        self.index().abs_diff(other.index()) == 1
    }

    /// The next state one step from `self` in the direction of `target`.
    ///
    /// Returns `self` when already at the target.
    #[must_use]
    pub fn step_toward(self, target: GaitState) -> GaitState {
        let (from, to) = (self.index(), target.index());
        let next = match from.cmp(&to) {
            std::cmp::Ordering::Less => from + 1,
            std::cmp::Ordering::Greater => from - 1,
            std::cmp::Ordering::Equal => from,
        };
        GaitState::from_index(next).unwrap_or(self)
    }

    /// Whether a canter lead is meaningful for this gait.
    #[must_use]
    pub const fn is_lead_applicable(self) -> bool {
        matches!(self, GaitState::Canter | GaitState::Gallop)
    }

    /// Whether the horse is moving in this gait.
    #[must_use]
    pub const fn is_moving(self) -> bool {
        !matches!(self, GaitState::Stationary)
    }
}

impl fmt::Display for GaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GaitState {
    type Err = GaitError;

    fn from_str(s: &str) -> Result<Self> {
        GaitState::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GaitError::invalid_input(format!("unknown gait '{s}'")))
    }
}

/// Leading leg in canter or gallop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Lead {
    Left,
    Right,
}

/// Device attitude as reported by the sensor collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Attitude {
    /// Attitude quaternion (need not be exactly unit-norm).
    Quaternion { w: f64, x: f64, y: f64, z: f64 },
    /// Euler angles in radians: pitch about x, roll about y, yaw about z.
    Euler { pitch: f64, roll: f64, yaw: f64 },
}

impl Attitude {
    /// Identity attitude.
    #[must_use]
    pub const fn identity() -> Self {
        Attitude::Quaternion {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Convert to a unit quaternion.
    ///
    /// Euler angles go through the half-angle formula; raw quaternions are
    /// re-normalized, falling back to identity when degenerate.
    #[must_use]
    pub fn to_unit_quaternion(&self) -> UnitQuaternion<f64> {
        match *self {
            Attitude::Quaternion { w, x, y, z } => {
                UnitQuaternion::try_new(Quaternion::new(w, x, y, z), f64::EPSILON)
                    .unwrap_or_else(UnitQuaternion::identity)
            }
            Attitude::Euler { pitch, roll, yaw } => euler_to_quaternion(pitch, roll, yaw),
        }
    }
}

impl Default for Attitude {
    fn default() -> Self {
        Self::identity()
    }
}

/// Half-angle conversion of pitch (x), roll (y), yaw (z) to a quaternion.
///
/// Rotation order is yaw, then roll, then pitch (intrinsic z-y-x).
#[must_use]
pub fn euler_to_quaternion(pitch: f64, roll: f64, yaw: f64) -> UnitQuaternion<f64> {
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sr, cr) = (roll * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();

    let q = Quaternion::new(
        cp * cr * cy + sp * sr * sy,
        sp * cr * cy - cp * sr * sy,
        cp * sr * cy + sp * cr * sy,
        cp * cr * sy - sp * sr * cy,
    );
    UnitQuaternion::new_normalize(q)
}

/// One inertial sample in the device frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionSample {
    /// Time in seconds.
    pub timestamp: f64,
    /// User acceleration in g, gravity removed.
    pub acceleration: Vector3<f64>,
    /// Rotation rate in rad/s.
    pub rotation_rate: Vector3<f64>,
    /// Device attitude.
    pub attitude: Attitude,
}

impl MotionSample {
    #[must_use]
    pub fn new(
        timestamp: f64,
        acceleration: Vector3<f64>,
        rotation_rate: Vector3<f64>,
        attitude: Attitude,
    ) -> Self {
        Self {
            timestamp,
            acceleration,
            rotation_rate,
            attitude,
        }
    }
}

/// Pre-filtered GPS update, roughly once per second.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocationSample {
    /// Time in seconds.
    pub timestamp: f64,
    /// Smoothed ground speed in m/s.
    pub speed: f64,
    /// Distance travelled since the previous update, in meters.
    pub distance_delta: f64,
}

impl LocationSample {
    #[must_use]
    pub const fn new(timestamp: f64, speed: f64, distance_delta: f64) -> Self {
        Self {
            timestamp,
            speed,
            distance_delta,
        }
    }
}

/// Linear acceleration in horse-relative axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HorseFrameVector {
    pub forward: f64,
    pub lateral: f64,
    pub vertical: f64,
}

/// Rotation rate in horse-relative axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HorseFrameRotation {
    /// About the lateral axis.
    pub pitch: f64,
    /// About the forward axis.
    pub roll: f64,
    /// About the vertical axis.
    pub yaw: f64,
}
