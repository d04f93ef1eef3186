//! Segment annotations: canter lead and stride rhythm.

use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::features::upcrossing_times;
use crate::math::stats::{circular_mean, mean, resultant_length};
use crate::phase::PhaseCoherenceAnalyzer;
use crate::types::Lead;

/// Lead call with its supporting evidence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeadEstimate {
    pub lead: Lead,
    /// Phase-locking value of the two signals, in `[0, 1]`.
    pub confidence: f64,
    /// Circular mean of lateral minus yaw phase (rad).
    pub phase_difference: f64,
}

/// Determines the leading leg from lateral-acceleration / yaw-rate phase.
///
/// On the left lead the lateral sway runs ahead of the yaw rotation
/// (positive mean phase difference); on the right lead it trails.
#[derive(Debug, Clone, Copy)]
pub struct LeadAnalyzer {
    phase: PhaseCoherenceAnalyzer,
    min_phase: f64,
}

impl LeadAnalyzer {
    /// # Errors
    ///
    /// Returns an error if `sample_rate` is not positive.
    pub fn new(sample_rate: f64) -> Result<Self> {
        Ok(Self {
            phase: PhaseCoherenceAnalyzer::new(sample_rate)?,
            min_phase: 1e-6,
        })
    }

    /// Estimate the lead, `None` for empty input or an undecidable phase.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffers differ in length.
    pub fn analyze(&self, lateral: &[f64], yaw: &[f64]) -> Result<Option<LeadEstimate>> {
        let diffs = self.phase.phase_difference(lateral, yaw)?;
        if diffs.is_empty() {
            return Ok(None);
        }
        let phase_difference = circular_mean(&diffs);
        let confidence = resultant_length(&diffs);
        trace!(
            target: "equine_gait::annotation",
            phase_difference,
            confidence,
            "lead analysis"
        );

        if !phase_difference.is_finite() || phase_difference.abs() < self.min_phase {
            return Ok(None);
        }
        let lead = if phase_difference > 0.0 {
            Lead::Left
        } else {
            Lead::Right
        };
        Ok(Some(LeadEstimate {
            lead,
            confidence,
            phase_difference,
        }))
    }
}

/// Scores stride regularity from vertical-bounce up-crossing intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RhythmAnalyzer {
    sample_rate: f64,
}

impl RhythmAnalyzer {
    #[must_use]
    pub const fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }

    /// `1 / (1 + CV)` of the crossing intervals, in `(0, 1]`.
    ///
    /// `None` with fewer than two full intervals.
    #[must_use]
    pub fn score(&self, vertical: &[f64]) -> Option<f64> {
        let crossings = upcrossing_times(vertical, self.sample_rate);
        if crossings.len() < 3 {
            return None;
        }
        let intervals: Vec<f64> = crossings.windows(2).map(|w| w[1] - w[0]).collect();
        let mu = mean(&intervals);
        if mu <= 0.0 {
            return None;
        }
        let variance =
            intervals.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / intervals.len() as f64;
        let cv = variance.sqrt() / mu;
        Some(1.0 / (1.0 + cv))
    }
}
