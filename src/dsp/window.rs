//! Analysis window.

use std::f32::consts::PI;

/// Hann window coefficient for `index` in a window of `size` samples.
///
/// Symmetric form: zero at both ends, one at the centre.
pub fn hann_window(index: usize, size: usize) -> f32 {
    if size < 2 {
        return 1.0;
    }
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}

/// All `size` Hann coefficients.
pub fn hann(size: usize) -> Vec<f32> {
    (0..size).map(|i| hann_window(i, size)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let size = 1024;

        assert!((hann_window(0, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size - 1, size) - 0.0).abs() < 0.01);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 0.01);
    }

    #[test]
    fn hann_is_symmetric() {
        let w = hann(64);
        for i in 0..32 {
            assert!((w[i] - w[63 - i]).abs() < 1e-5);
        }
    }
}
