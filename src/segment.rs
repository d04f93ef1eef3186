//! Gait segments, tracker events and ride summaries.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{GaitState, Lead};

/// A contiguous stretch of one confirmed gait.
///
/// `end_time` is `None` while the segment is open; `lead` is `None` when no
/// lead was detected or the gait has none.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaitSegment {
    pub gait: GaitState,
    pub start_time: f64,
    pub end_time: Option<f64>,
    /// Metres accumulated from location updates.
    pub distance: f64,
    /// m/s, set when the segment closes with a positive duration.
    pub average_speed: f64,
    pub lead: Option<Lead>,
    pub lead_confidence: f64,
    /// Stride regularity in `[0, 1]`; 0 until scored.
    pub rhythm_score: f64,
}

impl GaitSegment {
    /// Open a segment for `gait` at `start_time`.
    #[must_use]
    pub const fn open(gait: GaitState, start_time: f64) -> Self {
        Self {
            gait,
            start_time,
            end_time: None,
            distance: 0.0,
            average_speed: 0.0,
            lead: None,
            lead_confidence: 0.0,
            rhythm_score: 0.0,
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn add_distance(&mut self, delta: f64) {
        if delta.is_finite() && delta > 0.0 {
            self.distance += delta;
        }
    }

    /// Close the segment at `end_time` and derive its average speed.
    ///
    /// A timestamp before the start is clamped so the duration is never negative.
    pub fn finalize(&mut self, end_time: f64) {
        let end = end_time.max(self.start_time);
        self.end_time = Some(end);
        let duration = end - self.start_time;
        self.average_speed = if duration > 0.0 {
            self.distance / duration
        } else {
            0.0
        };
    }

    /// Duration, measured to `now` while open.
    #[must_use]
    pub fn duration_at(&self, now: f64) -> f64 {
        (self.end_time.unwrap_or(now) - self.start_time).max(0.0)
    }

    /// Duration of a closed segment.
    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn set_lead(&mut self, lead: Lead, confidence: f64) {
        self.lead = Some(lead);
        self.lead_confidence = confidence.clamp(0.0, 1.0);
    }

    pub fn set_rhythm(&mut self, score: f64) {
        self.rhythm_score = score.clamp(0.0, 1.0);
    }
}

/// Notifications emitted by the tracker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum GaitEvent {
    /// A confirmed transition.
    GaitChanged {
        previous: GaitState,
        new: GaitState,
        timestamp: f64,
    },
    /// A segment was finalized.
    SegmentClosed(GaitSegment),
}

/// Totals for one gait across a ride.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaitTotals {
    pub duration: f64,
    pub distance: f64,
    pub segments: usize,
}

/// Per-gait aggregation of a ride's segments.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaitSummary {
    pub totals: BTreeMap<GaitState, GaitTotals>,
    pub total_duration: f64,
    pub total_distance: f64,
}

impl GaitSummary {
    /// Aggregate `segments`, measuring open ones to `now`.
    #[must_use]
    pub fn from_segments(segments: &[GaitSegment], now: f64) -> Self {
        let mut summary = Self::default();
        for segment in segments {
            let duration = segment.duration_at(now);
            let entry = summary.totals.entry(segment.gait).or_default();
            entry.duration += duration;
            entry.distance += segment.distance;
            entry.segments += 1;
            summary.total_duration += duration;
            summary.total_distance += segment.distance;
        }
        summary
    }

    /// Totals for `gait` (zero if it never occurred).
    #[must_use]
    pub fn get(&self, gait: GaitState) -> GaitTotals {
        self.totals.get(&gait).copied().unwrap_or_default()
    }

    /// Fraction of ride time spent in `gait`.
    #[must_use]
    pub fn share(&self, gait: GaitState) -> f64 {
        if self.total_duration <= 0.0 {
            return 0.0;
        }
        self.get(gait).duration / self.total_duration
    }
}
