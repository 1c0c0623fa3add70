//! Scheme and strategy settings.
//!
//! Settings are plain serde structs with defaults for every field, so a JSON
//! document only needs the values it overrides:
//!
//! ```json
//! {
//!     "scheme": { "alpha_m": -0.1 },
//!     "strategy": { "max_iterations": 10, "solver": "dense" }
//! }
//! ```
//!
//! Unknown keys are rejected. Call `validate` before use; the `from_json`
//! constructors do so.

use crate::coefficients::{validate_alpha_m, DEFAULT_BETA, DEFAULT_GAMMA};
use crate::error::{Error, Result};
use crate::solver::SolverType;
use serde::Deserialize;

/// Time-integration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemeSettings {
    /// Bossak parameter in [-0.3, 0.0].
    pub alpha_m: f64,
    /// Newmark beta before the Bossak shift.
    pub beta: f64,
    /// Newmark gamma before the Bossak shift.
    pub gamma: f64,
}

impl Default for SchemeSettings {
    fn default() -> Self {
        Self {
            alpha_m: 0.0,
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
        }
    }
}

impl SchemeSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        validate_alpha_m(self.alpha_m)?;
        if !(self.beta > 0.0 && self.beta.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "beta must be positive, got {}",
                self.beta
            )));
        }
        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        Ok(())
    }
}

/// Newton-Raphson loop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategySettings {
    /// Iterations per step before giving up.
    pub max_iterations: usize,
    /// Absolute tolerance on the residual norm.
    pub residual_tolerance: f64,
    /// Tolerance on the increment norm relative to the displacement norm.
    pub increment_tolerance: f64,
    /// Linear solver backend.
    pub solver: SolverType,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            residual_tolerance: 1e-9,
            increment_tolerance: 1e-12,
            solver: SolverType::Direct,
        }
    }
}

impl StrategySettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig(
                "max_iterations must be >= 1".into(),
            ));
        }
        if !(self.residual_tolerance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "residual_tolerance must be positive, got {}",
                self.residual_tolerance
            )));
        }
        if !(self.increment_tolerance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "increment_tolerance must be positive, got {}",
                self.increment_tolerance
            )));
        }
        Ok(())
    }
}

/// Complete settings document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    pub scheme: SchemeSettings,
    pub strategy: StrategySettings,
}

impl AnalysisSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.scheme.validate()?;
        self.strategy.validate()
    }
}
