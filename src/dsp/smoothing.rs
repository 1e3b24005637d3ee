//! Asymmetric attack/release smoothing of band energies.
//!
//! Each band is an exponential moving average of its raw per-frame value.
//! A rising value is tracked with the `attack` coefficient, a falling one
//! with `release`:
//!
//! ```text
//! coeff    = if raw > smoothed { attack } else { release }
//! smoothed = smoothed + (raw - smoothed) * coeff
//! ```
//!
//! With both coefficients in `(0, 1]` the new value always lies between the
//! previous value and the raw input, so the meter never overshoots.

/// Per-band attack/release follower.
#[derive(Debug, Clone)]
pub struct BandSmoother {
    values: Vec<f32>,
    attack: f32,
    release: f32,
}

impl BandSmoother {
    /// `bands` followers starting at zero.
    pub fn new(bands: usize, attack: f32, release: f32) -> Self {
        Self {
            values: vec![0.0; bands],
            attack,
            release,
        }
    }

    /// Advance every band one frame towards `raw`.
    ///
    /// Extra entries on either side are ignored.
    pub fn update(&mut self, raw: &[f32]) {
        for (value, &target) in self.values.iter_mut().zip(raw) {
            let coeff = if target > *value {
                self.attack
            } else {
                self.release
            };
            *value += (target - *value) * coeff;
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_uses_attack_falling_uses_release() {
        let mut s = BandSmoother::new(1, 0.5, 0.1);
        s.update(&[1.0]);
        assert!((s.values()[0] - 0.5).abs() < 1e-6);
        s.update(&[0.0]);
        assert!((s.values()[0] - 0.45).abs() < 1e-6);
    }

    #[test]
    fn update_never_overshoots() {
        let mut s = BandSmoother::new(4, 0.8, 0.3);
        let inputs = [
            [0.9, 0.1, 0.5, 0.0],
            [0.2, 0.7, 0.5, 1.0],
            [0.0, 0.0, 2.0, 0.3],
            [1.5, 0.4, 0.1, 0.3],
        ];
        for raw in inputs {
            let before = s.values().to_vec();
            s.update(&raw);
            for ((&prev, &next), &target) in before.iter().zip(s.values()).zip(raw.iter()) {
                let (lo, hi) = if prev <= target { (prev, target) } else { (target, prev) };
                assert!(next >= lo - 1e-6 && next <= hi + 1e-6, "{prev} -> {next} (raw {target})");
            }
        }
    }

    #[test]
    fn unit_coefficients_track_exactly() {
        let mut s = BandSmoother::new(2, 1.0, 1.0);
        s.update(&[0.3, 0.6]);
        assert_eq!(s.values(), &[0.3, 0.6]);
        s.reset();
        assert_eq!(s.values(), &[0.0, 0.0]);
    }
}
