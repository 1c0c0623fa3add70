//! Bossak/Newmark integration coefficients.
//!
//! The free parameters are the Newmark pair (beta, gamma) and the spectral
//! shifting pair (alpha_f, alpha_m). Bossak sets alpha_f = 0; pure Newmark also
//! sets alpha_m = 0. The shifted parameters are
//!
//! - beta'  = (1 + alpha_f - alpha_m)² · beta
//! - gamma' = gamma + alpha_f - alpha_m
//!
//! and the system constants for a step of size Δt are
//!
//! | constant | value |
//! |---|---|
//! | c0 | 1 / (beta' Δt²) |
//! | c1 | gamma' / (beta' Δt) |
//! | c2 | 1 / (beta' Δt) |
//! | c3 | 1 / (2 beta') - 1 |
//! | c4 | gamma' / beta' - 1 |
//! | c5 | Δt (gamma' / (2 beta') - 1) |

use crate::error::{Error, Result};

/// Smallest time step accepted by [`IntegrationCoefficients::update_for_time_step`].
pub const DELTA_TIME_FLOOR: f64 = 1.0e-24;

/// Lower bound of the admissible Bossak alpha_m.
pub const ALPHA_M_MIN: f64 = -0.3;

/// Upper bound of the admissible Bossak alpha_m.
pub const ALPHA_M_MAX: f64 = 0.0;

/// Default Newmark beta (average acceleration).
pub const DEFAULT_BETA: f64 = 0.25;

/// Default Newmark gamma (average acceleration).
pub const DEFAULT_GAMMA: f64 = 0.5;

/// Check that alpha_m lies in [-0.3, 0.0].
pub fn validate_alpha_m(alpha_m: f64) -> Result<()> {
    if (ALPHA_M_MIN..=ALPHA_M_MAX).contains(&alpha_m) {
        Ok(())
    } else {
        Err(Error::AlphaOutOfRange(alpha_m))
    }
}

/// Integration parameters and the per-step constants derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationCoefficients {
    /// Hilber-Hughes-Taylor shift (zero for Bossak).
    pub alpha_f: f64,
    /// Bossak shift.
    pub alpha_m: f64,
    /// Shifted Newmark beta'.
    pub beta: f64,
    /// Shifted Newmark gamma'.
    pub gamma: f64,
    pub c0: f64,
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub c5: f64,
}

impl IntegrationCoefficients {
    /// Bossak coefficients for `alpha_m` with default beta and gamma.
    ///
    /// The c-constants stay zero until a time step is known.
    pub fn bossak(alpha_m: f64) -> Self {
        let mut coefficients = Self {
            alpha_f: 0.0,
            alpha_m,
            beta: 0.0,
            gamma: 0.0,
            c0: 0.0,
            c1: 0.0,
            c2: 0.0,
            c3: 0.0,
            c4: 0.0,
            c5: 0.0,
        };
        coefficients.calculate_newmark_coefficients(DEFAULT_BETA, DEFAULT_GAMMA);
        coefficients
    }

    /// Recompute beta' and gamma' from unshifted `beta` and `gamma`.
    pub fn calculate_newmark_coefficients(&mut self, beta: f64, gamma: f64) {
        let shift = 1.0 + self.alpha_f - self.alpha_m;
        self.beta = shift * shift * beta;
        self.gamma = gamma + self.alpha_f - self.alpha_m;
    }

    /// Recompute c0..c5 for a step of size `delta_time`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTimeStep`] if `delta_time` is below [`DELTA_TIME_FLOOR`]
    /// (or NaN): every constant would be singular.
    pub fn update_for_time_step(&mut self, delta_time: f64) -> Result<()> {
        if !(delta_time >= DELTA_TIME_FLOOR) {
            return Err(Error::InvalidTimeStep(delta_time));
        }
        let (beta, gamma) = (self.beta, self.gamma);
        self.c0 = 1.0 / (beta * delta_time * delta_time);
        self.c1 = gamma / (beta * delta_time);
        self.c2 = 1.0 / (beta * delta_time);
        self.c3 = 0.5 / beta - 1.0;
        self.c4 = gamma / beta - 1.0;
        self.c5 = delta_time * 0.5 * (gamma / beta - 2.0);
        Ok(())
    }

    /// True when every derived constant is finite.
    pub fn is_finite(&self) -> bool {
        [self.c0, self.c1, self.c2, self.c3, self.c4, self.c5]
            .iter()
            .all(|c| c.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_newmark_defaults() {
        let mut c = IntegrationCoefficients::bossak(0.0);
        assert_relative_eq!(c.beta, 0.25);
        assert_relative_eq!(c.gamma, 0.5);

        c.update_for_time_step(0.1).unwrap();
        assert_relative_eq!(c.c0, 400.0, epsilon = 1e-10);
        assert_relative_eq!(c.c1, 20.0, epsilon = 1e-12);
        assert_relative_eq!(c.c2, 40.0, epsilon = 1e-12);
        assert_relative_eq!(c.c3, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.c4, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.c5, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bossak_shift() {
        let c = IntegrationCoefficients::bossak(-0.1);
        assert_relative_eq!(c.beta, 1.1 * 1.1 * 0.25, epsilon = 1e-15);
        assert_relative_eq!(c.gamma, 0.6, epsilon = 1e-15);
    }

    #[test]
    fn test_c5_matches_closed_form() {
        let mut c = IntegrationCoefficients::bossak(-0.2);
        let dt = 0.03;
        c.update_for_time_step(dt).unwrap();
        assert_relative_eq!(c.c5, dt * (c.gamma / (2.0 * c.beta) - 1.0), epsilon = 1e-15);
    }

    #[test]
    fn test_finite_over_admissible_range() {
        for i in 0..=30 {
            let alpha_m = -0.01 * i as f64;
            for dt in [1e-6, 1e-3, 0.1, 1.0, 10.0] {
                let mut c = IntegrationCoefficients::bossak(alpha_m);
                c.update_for_time_step(dt).unwrap();
                assert!(c.is_finite(), "alpha_m={} dt={}", alpha_m, dt);
            }
        }
    }

    #[test]
    fn test_zero_time_step_is_fatal() {
        let mut c = IntegrationCoefficients::bossak(0.0);
        assert!(matches!(
            c.update_for_time_step(0.0),
            Err(Error::InvalidTimeStep(_))
        ));
        assert!(c.update_for_time_step(1e-30).is_err());
        assert!(c.update_for_time_step(-0.1).is_err());
        assert!(c.update_for_time_step(f64::NAN).is_err());
    }

    #[test]
    fn test_alpha_m_band() {
        assert!(validate_alpha_m(0.0).is_ok());
        assert!(validate_alpha_m(-0.3).is_ok());
        assert!(validate_alpha_m(0.05).is_err());
        assert!(validate_alpha_m(-0.31).is_err());
    }
}
