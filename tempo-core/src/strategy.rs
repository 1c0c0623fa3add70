//! Newton-Raphson time stepping.
//!
//! Drives a [`Scheme`] through one time step:
//!
//! 1. `initialize_solution_step` and `predict`
//! 2. until converged: assemble the effective system, solve for the
//!    increment, `update`
//!
//! Convergence is declared when the residual norm falls below the absolute
//! residual tolerance, or when the increment norm relative to the norm of the
//! free displacements falls below the increment tolerance.

use crate::assembly::build_and_assemble;
use crate::config::StrategySettings;
use crate::dof::DofSet;
use crate::error::Result;
use crate::model::ModelPart;
use crate::scheme::Scheme;
use crate::scratch::ScratchPool;
use crate::solver::{select_solver, Solver};
use nalgebra::DVectorView;
use tracing::{debug, info, warn};

/// Outcome of one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Step counter after the step was started.
    pub step: usize,
    /// Time at the end of the step.
    pub time: f64,
    /// Linear solves performed.
    pub iterations: usize,
    pub converged: bool,
    /// Residual norm of the last assembled system.
    pub residual_norm: f64,
    /// Norm of the last applied increment.
    pub increment_norm: f64,
}

fn norm(v: &[f64]) -> f64 {
    DVectorView::from_slice(v, v.len()).norm()
}

/// Norm of the current values of the free DOFs.
fn free_dof_norm(model: &ModelPart, dofs: &DofSet) -> Result<f64> {
    let mut sum = 0.0;
    for handle in dofs.iter().filter(|h| !h.fixed) {
        let value = model.node(handle.node)?.value(handle.variable.variable, 0)?;
        sum += value[handle.variable.component.index()].powi(2);
    }
    Ok(sum.sqrt())
}

/// Implicit dynamic solver with a Newton-Raphson loop per step.
pub struct NewtonRaphsonStrategy<S: Scheme> {
    scheme: S,
    solver: Box<dyn Solver>,
    settings: StrategySettings,
    dofs: DofSet,
    pool: ScratchPool,
    initialized: bool,
}

impl<S: Scheme> NewtonRaphsonStrategy<S> {
    /// Create a strategy with the solver named in `settings`.
    pub fn new(scheme: S, settings: StrategySettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            scheme,
            solver: select_solver(settings.solver),
            settings,
            dofs: DofSet::default(),
            pool: ScratchPool::new(),
            initialized: false,
        })
    }

    /// Replace the linear solver.
    pub fn with_solver(mut self, solver: Box<dyn Solver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    pub fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    pub fn dofs(&self) -> &DofSet {
        &self.dofs
    }

    /// Check the model and number its DOFs.
    ///
    /// Must be called again whenever DOFs are added or their fixity changes.
    /// [`solve_step`](Self::solve_step) calls it on first use.
    pub fn initialize(&mut self, model: &mut ModelPart) -> Result<()> {
        self.scheme.check(model)?;
        self.dofs = DofSet::setup(model.nodes_mut());
        self.initialized = true;
        info!(
            model = model.name(),
            scheme = self.scheme.name(),
            solver = self.solver.name(),
            dofs = self.dofs.len(),
            equations = self.dofs.equation_system_size(),
            "strategy initialized"
        );
        Ok(())
    }

    /// Start a new step of size `delta_time` and solve it.
    pub fn advance(&mut self, model: &mut ModelPart, delta_time: f64) -> Result<StepReport> {
        model.clone_time_step(delta_time);
        self.solve_step(model)
    }

    /// Solve the step already started on `model`.
    pub fn solve_step(&mut self, model: &mut ModelPart) -> Result<StepReport> {
        if !self.initialized {
            self.initialize(model)?;
        }

        self.scheme.initialize_solution_step(model)?;
        self.scheme.predict(model)?;

        let mut report = StepReport {
            step: model.process_info.time_steps,
            time: model.process_info.time,
            iterations: 0,
            converged: false,
            residual_norm: f64::INFINITY,
            increment_norm: f64::INFINITY,
        };

        while report.iterations < self.settings.max_iterations {
            self.scheme.initialize_non_linear_iteration(model)?;
            let system = build_and_assemble(&self.scheme, model, &self.dofs, &self.pool)?;
            report.residual_norm = norm(&system.rhs);
            if report.residual_norm <= self.settings.residual_tolerance {
                report.converged = true;
                break;
            }

            let dx = self.solver.solve(&system.lhs, &system.rhs)?;
            self.scheme.update(model, &self.dofs, &dx)?;
            report.iterations += 1;
            report.increment_norm = norm(&dx);

            let reference = free_dof_norm(model, &self.dofs)?.max(1.0);
            debug!(
                iteration = report.iterations,
                residual = report.residual_norm,
                increment = report.increment_norm,
                "newton iteration"
            );
            if report.increment_norm <= self.settings.increment_tolerance * reference {
                report.converged = true;
                break;
            }
        }

        if report.converged {
            info!(
                step = report.step,
                time = report.time,
                iterations = report.iterations,
                residual = report.residual_norm,
                "step converged"
            );
        } else {
            warn!(
                step = report.step,
                time = report.time,
                iterations = report.iterations,
                residual = report.residual_norm,
                "step did not converge"
            );
        }
        Ok(report)
    }
}
