//! Error types for gait analysis.
//!
//! Only programming errors and invalid configuration surface as errors.
//! Degraded sensor input (short windows, silent signals, collapsed beliefs)
//! is handled with well-defined fallback values instead.

use thiserror::Error;

/// Main error type for gait analysis operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GaitError {
    /// Input validation errors.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// FFT window size must be a non-zero power of two.
    #[error("Invalid window size {size}: must be a non-zero power of two")]
    InvalidWindowSize { size: usize },

    /// Paired buffers have different lengths.
    #[error("Length mismatch: {left} vs {right} samples")]
    LengthMismatch { left: usize, right: usize },

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Breed identifier not recognized.
    #[error("Unknown breed: {0}")]
    UnknownBreed(String),

    /// The session worker has shut down.
    #[error("Session is closed")]
    SessionClosed,

    /// The session command queue is at capacity.
    #[error("Session queue is full ({capacity} commands pending)")]
    QueueFull { capacity: usize },

    /// Operation requires an active analysis session.
    #[error("Tracker is not analyzing")]
    NotAnalyzing,
}

/// Result type alias for gait analysis operations.
pub type Result<T> = std::result::Result<T, GaitError>;

impl GaitError {
    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid window size error.
    #[must_use]
    pub const fn invalid_window_size(size: usize) -> Self {
        Self::InvalidWindowSize { size }
    }

    /// Create a length mismatch error.
    #[must_use]
    pub const fn length_mismatch(left: usize, right: usize) -> Self {
        Self::LengthMismatch { left, right }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an unknown breed error.
    #[must_use]
    pub fn unknown_breed(name: impl Into<String>) -> Self {
        Self::UnknownBreed(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GaitError::invalid_window_size(100);
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("power of two"));

        let err = GaitError::QueueFull { capacity: 16 };
        assert!(err.to_string().contains("16"));

        let err = GaitError::length_mismatch(64, 32);
        assert!(err.to_string().contains("64"));
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn test_error_constructors() {
        assert_eq!(
            GaitError::unknown_breed("zebra"),
            GaitError::UnknownBreed("zebra".to_string())
        );
        let _ = GaitError::invalid_input("empty signal");
        let _ = GaitError::invalid_config("overlap out of range");
    }
}
