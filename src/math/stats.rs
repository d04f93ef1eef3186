//! Scalar statistics used across the pipeline.

use std::f64::consts::PI;

/// Arithmetic mean, 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Root mean square, 0 for an empty slice.
#[must_use]
pub fn rms<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (sum_sq, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), &v| (s + v * v, n + 1));
    if n == 0 {
        return 0.0;
    }
    (sum_sq / n as f64).sqrt()
}

/// RMS about the mean, 0 for an empty slice.
#[must_use]
pub fn centered_rms(values: &[f64]) -> f64 {
    let dc = mean(values);
    let centered: Vec<f64> = values.iter().map(|x| x - dc).collect();
    rms(&centered)
}

/// Gaussian probability density.
///
/// A variance below `eps` degenerates to a point mass: 1 when `x` equals
/// the mean (within `eps`), 0 otherwise.
#[must_use]
pub fn gaussian_pdf(x: f64, mean: f64, variance: f64, eps: f64) -> f64 {
    if variance < eps {
        return if (x - mean).abs() < eps { 1.0 } else { 0.0 };
    }
    let diff = x - mean;
    (-0.5 * diff * diff / variance).exp() / (2.0 * PI * variance).sqrt()
}

/// Wrap an angle into `(-π, π]`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI {
        wrapped + 2.0 * PI
    } else {
        wrapped
    }
}

/// Circular mean of angles: `atan2(Σ sin, Σ cos)`.
///
/// Returns 0 for an empty slice.
#[must_use]
pub fn circular_mean(angles: &[f64]) -> f64 {
    let (s, c) = angles
        .iter()
        .fold((0.0, 0.0), |(s, c), a| (s + a.sin(), c + a.cos()));
    if s == 0.0 && c == 0.0 {
        return 0.0;
    }
    s.atan2(c)
}

/// Mean resultant length of angles, in `[0, 1]`.
#[must_use]
pub fn resultant_length(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }
    let (s, c) = angles
        .iter()
        .fold((0.0, 0.0), |(s, c), a| (s + a.sin(), c + a.cos()));
    (s * s + c * c).sqrt() / angles.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_rms() {
        assert_eq!(mean(&[]), 0.0);
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_relative_eq!(rms(&[3.0, -3.0]), 3.0);
        assert_eq!(rms(&Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn test_centered_rms_ignores_offset() {
        assert_relative_eq!(centered_rms(&[4.0, 2.0, 4.0, 2.0]), 1.0);
        assert_eq!(centered_rms(&[0.7; 16]), 0.0);
        assert_eq!(centered_rms(&[]), 0.0);
    }

    #[test]
    fn test_gaussian_pdf_peak() {
        let peak = gaussian_pdf(0.0, 0.0, 1.0, 1e-10);
        assert_relative_eq!(peak, 1.0 / (2.0 * PI).sqrt(), epsilon = 1e-12);
        assert!(gaussian_pdf(1.0, 0.0, 1.0, 1e-10) < peak);
    }

    #[test]
    fn test_gaussian_zero_variance_is_point_mass() {
        assert_eq!(gaussian_pdf(2.0, 2.0, 0.0, 1e-10), 1.0);
        assert_eq!(gaussian_pdf(2.1, 2.0, 0.0, 1e-10), 0.0);
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(2.0 * PI + 0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-2.0 * PI + 0.1), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_circular_mean_across_branch_cut() {
        // Arithmetic mean would give ~0; the circular mean stays near π.
        let angles = [PI - 0.1, -PI + 0.1];
        let m = circular_mean(&angles);
        assert_relative_eq!(m.abs(), PI, epsilon = 1e-9);
        assert!(mean(&angles).abs() < 1e-9);
    }

    #[test]
    fn test_resultant_length() {
        assert_relative_eq!(resultant_length(&[0.3, 0.3, 0.3]), 1.0, epsilon = 1e-12);
        assert!(resultant_length(&[0.0, PI]) < 1e-12);
        assert_eq!(resultant_length(&[]), 0.0);
    }
}
