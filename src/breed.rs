//! Breed-specific stride-frequency priors and age adjustment.
//!
//! Frequencies are the dominant vertical-bounce frequency of the rider's
//! seat in Hz. Symmetric gaits (walk, trot) bounce twice per stride, the
//! asymmetric ones (canter, gallop) once, so the bands overlap and must be
//! told apart by the remaining features.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{GaitError, Result};
use crate::types::GaitState;

/// Inclusive `(low, high)` range.
pub type Range = (f64, f64);

/// Supported breed families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Breed {
    #[default]
    Warmblood,
    Thoroughbred,
    Arabian,
    QuarterHorse,
    Pony,
    Draft,
    Icelandic,
}

impl Breed {
    /// All supported breeds.
    pub const ALL: [Breed; 7] = [
        Breed::Warmblood,
        Breed::Thoroughbred,
        Breed::Arabian,
        Breed::QuarterHorse,
        Breed::Pony,
        Breed::Draft,
        Breed::Icelandic,
    ];

    /// Canonical identifier.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Breed::Warmblood => "warmblood",
            Breed::Thoroughbred => "thoroughbred",
            Breed::Arabian => "arabian",
            Breed::QuarterHorse => "quarter_horse",
            Breed::Pony => "pony",
            Breed::Draft => "draft",
            Breed::Icelandic => "icelandic",
        }
    }

    /// Frequency and speed priors for this breed.
    #[must_use]
    pub const fn priors(self) -> BreedPriors {
        // Order: stationary, walk, trot, canter, gallop.
        match self {
            Breed::Warmblood => BreedPriors {
                frequency_ranges: [(0.0, 0.6), (1.4, 2.2), (2.6, 3.4), (1.8, 2.8), (2.2, 3.4)],
                speed_bounds: STANDARD_SPEEDS,
            },
            Breed::Thoroughbred => BreedPriors {
                frequency_ranges: [(0.0, 0.6), (1.5, 2.3), (2.7, 3.5), (1.9, 2.9), (2.3, 3.6)],
                speed_bounds: [(0.0, 0.8), (0.3, 2.6), (1.9, 5.8), (3.0, 8.5), (7.0, 20.0)],
            },
            Breed::Arabian => BreedPriors {
                frequency_ranges: [(0.0, 0.6), (1.5, 2.3), (2.7, 3.6), (2.0, 3.0), (2.3, 3.5)],
                speed_bounds: STANDARD_SPEEDS,
            },
            Breed::QuarterHorse => BreedPriors {
                frequency_ranges: [(0.0, 0.6), (1.5, 2.2), (2.5, 3.3), (1.9, 2.9), (2.4, 3.6)],
                speed_bounds: [(0.0, 0.8), (0.3, 2.4), (1.6, 5.0), (2.6, 8.0), (6.5, 21.0)],
            },
            Breed::Pony => BreedPriors {
                frequency_ranges: [(0.0, 0.6), (1.7, 2.5), (2.9, 3.9), (2.2, 3.2), (2.6, 3.8)],
                speed_bounds: PONY_SPEEDS,
            },
            Breed::Draft => BreedPriors {
                frequency_ranges: [(0.0, 0.6), (1.2, 2.0), (2.3, 3.1), (1.6, 2.5), (2.0, 3.0)],
                speed_bounds: [(0.0, 0.8), (0.3, 2.3), (1.6, 5.0), (2.8, 7.0), (5.5, 14.0)],
            },
            Breed::Icelandic => BreedPriors {
                frequency_ranges: [(0.0, 0.6), (1.6, 2.4), (2.8, 3.8), (2.0, 3.0), (2.4, 3.6)],
                speed_bounds: PONY_SPEEDS,
            },
        }
    }
}

const STANDARD_SPEEDS: [Range; 5] = [(0.0, 0.8), (0.3, 2.5), (1.8, 5.5), (3.0, 8.0), (6.5, 20.0)];
const PONY_SPEEDS: [Range; 5] = [(0.0, 0.8), (0.3, 2.2), (1.5, 4.5), (2.5, 6.5), (5.0, 15.0)];

impl fmt::Display for Breed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Breed {
    type Err = GaitError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        let breed = match key.as_str() {
            "warmblood" | "generic" => Breed::Warmblood,
            "thoroughbred" => Breed::Thoroughbred,
            "arabian" | "arab" => Breed::Arabian,
            "quarterhorse" => Breed::QuarterHorse,
            "pony" => Breed::Pony,
            "draft" | "draught" => Breed::Draft,
            "icelandic" => Breed::Icelandic,
            _ => return Err(GaitError::unknown_breed(s)),
        };
        Ok(breed)
    }
}

/// Per-gait frequency ranges and hard speed bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BreedPriors {
    /// Dominant bounce frequency range per gait (Hz), indexed by [`GaitState::index`].
    pub frequency_ranges: [Range; 5],
    /// Plausible GPS speed range per gait (m/s).
    pub speed_bounds: [Range; 5],
}

impl BreedPriors {
    /// Frequency range for `state`, widened by `age`.
    #[must_use]
    pub fn frequency_range(&self, state: GaitState, age: AgeAdjustment) -> Range {
        age.widen(self.frequency_ranges[state.index()])
    }

    /// Speed bounds for `state`.
    #[must_use]
    pub fn speed_bounds(&self, state: GaitState) -> Range {
        self.speed_bounds[state.index()]
    }
}

impl Default for BreedPriors {
    fn default() -> Self {
        Breed::default().priors()
    }
}

/// Symmetric widening factor for frequency ranges (>= 1).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AgeAdjustment(f64);

impl AgeAdjustment {
    /// No widening.
    pub const NONE: AgeAdjustment = AgeAdjustment(1.0);

    /// Create an adjustment from an explicit factor.
    ///
    /// # Errors
    ///
    /// Returns an error if `factor` is below 1 or not finite.
    pub fn new(factor: f64) -> Result<Self> {
        if !factor.is_finite() || factor < 1.0 {
            return Err(GaitError::invalid_config(format!(
                "age adjustment must be a finite factor >= 1, got {factor}"
            )));
        }
        Ok(Self(factor))
    }

    /// Typical adjustment for a horse of `years`; young and senior horses
    /// move less consistently.
    #[must_use]
    pub fn for_age(years: f64) -> Self {
        let factor = match years {
            y if y < 4.0 => 1.25,
            y if y < 6.0 => 1.1,
            y if y < 18.0 => 1.0,
            y if y <= 22.0 => 1.1,
            _ => 1.2,
        };
        Self(factor)
    }

    /// The raw factor.
    #[must_use]
    pub const fn factor(self) -> f64 {
        self.0
    }

    /// Widen `range` symmetrically around its center.
    #[must_use]
    pub fn widen(self, (lo, hi): Range) -> Range {
        let center = 0.5 * (lo + hi);
        let half = 0.5 * (hi - lo) * self.0;
        (center - half, center + half)
    }
}

impl Default for AgeAdjustment {
    fn default() -> Self {
        Self::NONE
    }
}
