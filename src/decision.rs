//! Motion-vs-speed decision table.
//!
//! Two independent opinions feed every re-evaluation: a motion-based gait
//! (from the estimator or the bounce classifier) and a speed-based gait.
//! [`resolve`] reconciles them with a fixed, ordered rule list so every
//! outcome can be traced to one named rule.
//!
//! | # | Condition                                         | Result |
//! |---|---------------------------------------------------|--------|
//! | 1 | no motion estimate                                | speed  |
//! | 2 | motion == speed                                   | motion |
//! | 3 | both in {trot, canter}                            | motion |
//! | 4 | motion canter, speed < `canter_min_speed`         | speed  |
//! | 5 | motion gallop, speed < `gallop_min_speed`         | speed  |
//! | 6 | motion stationary, speed > `moving_min_speed`     | speed  |
//! | 7 | motion walk, speed says trot                      | motion |
//! | 8 | motion walk, speed says canter or gallop          | speed  |
//! | 9 | otherwise: motion if adjacent to speed, else speed | either |

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::DecisionThresholds;
use crate::types::GaitState;

/// The rule of the decision table that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DecisionRule {
    NoMotionEstimate,
    Agreement,
    TrotCanterAmbiguity,
    CanterTooSlow,
    GallopTooSlow,
    StationaryButMoving,
    WalkWithTrotSpeed,
    WalkTooFast,
    AdjacentMotion,
    DistantMotion,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Decision {
    pub gait: GaitState,
    pub rule: DecisionRule,
}

impl Decision {
    const fn new(gait: GaitState, rule: DecisionRule) -> Self {
        Self { gait, rule }
    }
}

/// Classify bounce frequency (Hz) and RMS amplitude (g).
#[must_use]
pub fn classify_motion(t: &DecisionThresholds, frequency: f64, amplitude: f64) -> GaitState {
    if amplitude < t.stationary_max_amplitude {
        return GaitState::Stationary;
    }
    if frequency >= t.trot_min_frequency {
        return GaitState::Trot;
    }
    if frequency <= t.walk_max_frequency && amplitude < t.walk_max_amplitude {
        return GaitState::Walk;
    }
    if frequency >= t.canter_min_frequency && amplitude >= t.walk_max_amplitude {
        return if amplitude >= t.gallop_min_amplitude {
            GaitState::Gallop
        } else {
            GaitState::Canter
        };
    }
    GaitState::Walk
}

/// Direct speed (m/s) to gait mapping.
#[must_use]
pub fn classify_speed(t: &DecisionThresholds, speed: f64) -> GaitState {
    if speed < t.speed_stationary_max {
        GaitState::Stationary
    } else if speed < t.speed_walk_max {
        GaitState::Walk
    } else if speed < t.speed_trot_max {
        GaitState::Trot
    } else if speed < t.speed_canter_max {
        GaitState::Canter
    } else {
        GaitState::Gallop
    }
}

/// Reconcile the motion-based and speed-based opinions.
#[must_use]
pub fn resolve(
    t: &DecisionThresholds,
    motion: Option<GaitState>,
    speed_gait: GaitState,
    speed: f64,
) -> Decision {
    use DecisionRule as R;
    use GaitState::{Canter, Gallop, Stationary, Trot, Walk};

    let Some(motion) = motion else {
        return Decision::new(speed_gait, R::NoMotionEstimate);
    };
    if motion == speed_gait {
        return Decision::new(motion, R::Agreement);
    }
    match (motion, speed_gait) {
        (Trot | Canter, Trot | Canter) => Decision::new(motion, R::TrotCanterAmbiguity),
        (Canter, _) if speed < t.canter_min_speed => Decision::new(speed_gait, R::CanterTooSlow),
        (Gallop, _) if speed < t.gallop_min_speed => Decision::new(speed_gait, R::GallopTooSlow),
        (Stationary, _) if speed > t.moving_min_speed => {
            Decision::new(speed_gait, R::StationaryButMoving)
        }
        (Walk, Trot) => Decision::new(motion, R::WalkWithTrotSpeed),
        (Walk, Canter | Gallop) => Decision::new(speed_gait, R::WalkTooFast),
        _ if motion.is_adjacent(speed_gait) => Decision::new(motion, R::AdjacentMotion),
        _ => Decision::new(speed_gait, R::DistantMotion),
    }
}
