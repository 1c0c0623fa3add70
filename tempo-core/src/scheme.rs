//! Time-integration scheme interface.
//!
//! A scheme is driven by a nonlinear strategy through a fixed sequence of
//! phases per time step:
//!
//! 1. [`Scheme::initialize_solution_step`] - derive integration constants
//! 2. [`Scheme::predict`] - seed the trial state
//! 3. per Newton iteration: [`Scheme::initialize_non_linear_iteration`], then
//!    [`Scheme::calculate_system_contributions`] for every entity, an external
//!    linear solve, and [`Scheme::update`] with the solved increment
//!
//! Each phase is a blocking data-parallel loop that joins before the next one.
//!
//! # Submodules
//!
//! - [`bossak`] - Bossak (and pure Newmark) displacement scheme

use crate::dof::DofSet;
use crate::entity::Entity;
use crate::error::Result;
use crate::model::ModelPart;
use crate::node::Node;
use crate::process_info::ProcessInfo;
use crate::scratch::LocalScratch;
use crate::types::{LocalMatrix, LocalVector};
use rayon::prelude::*;

pub mod bossak;

pub use bossak::BossakScheme;

/// Local contribution of one entity to the global system.
#[derive(Debug, Clone)]
pub struct LocalSystem {
    pub lhs: LocalMatrix,
    pub rhs: LocalVector,
    pub equation_ids: Vec<usize>,
}

impl LocalSystem {
    pub fn new() -> Self {
        Self {
            lhs: LocalMatrix::zeros(0, 0),
            rhs: LocalVector::zeros(0),
            equation_ids: Vec::new(),
        }
    }
}

impl Default for LocalSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Implicit time-integration scheme.
///
/// Schemes must be thread-safe (Send + Sync): the contribution entry points
/// are called concurrently from assembly workers, each with its own scratch.
pub trait Scheme: Send + Sync {
    /// Scheme name for diagnostics.
    fn name(&self) -> &str;

    /// Validate the model against the scheme's requirements. Run once before
    /// stepping.
    fn check(&self, model: &ModelPart) -> Result<()>;

    /// Recompute the integration constants for the current step.
    fn initialize_solution_step(&mut self, model: &ModelPart) -> Result<()>;

    /// Produce a trial state for the new step.
    fn predict(&mut self, model: &mut ModelPart) -> Result<()>;

    /// Forward the start of a Newton iteration to every element and condition.
    fn initialize_non_linear_iteration(&mut self, model: &mut ModelPart) -> Result<()> {
        let nodes = &model.nodes;
        let info = &model.process_info;
        model
            .elements
            .par_iter_mut()
            .try_for_each(|e| e.initialize_non_linear_iteration(nodes, info))?;
        model
            .conditions
            .par_iter_mut()
            .try_for_each(|c| c.initialize_non_linear_iteration(nodes, info))
    }

    /// Compute the full (LHS and RHS) dynamic contribution of `entity`.
    fn calculate_system_contributions(
        &self,
        entity: &dyn Entity,
        nodes: &[Node],
        info: &ProcessInfo,
        local: &mut LocalSystem,
        scratch: &mut LocalScratch,
    ) -> Result<()>;

    /// Compute only the dynamic RHS contribution of `entity`.
    fn calculate_rhs_contribution(
        &self,
        entity: &dyn Entity,
        nodes: &[Node],
        info: &ProcessInfo,
        rhs: &mut LocalVector,
        equation_ids: &mut Vec<usize>,
        scratch: &mut LocalScratch,
    ) -> Result<()>;

    /// Apply the solved increment `dx` and rederive dependent state.
    fn update(&mut self, model: &mut ModelPart, dofs: &DofSet, dx: &[f64]) -> Result<()>;
}
