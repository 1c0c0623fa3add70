//! Bossak displacement scheme.
//!
//! Implicit second-order scheme with numerical damping of the high-frequency
//! modes controlled by `alpha_m`. Displacement is the primary unknown; velocity
//! and acceleration are rederived from the displacement increment after every
//! prediction and every Newton update. With `alpha_m = 0` the scheme reduces
//! to the Newmark average acceleration method.
//!
//! # Effective system
//!
//! For every entity the static contribution `(K, f)` is extended to
//!
//! ```text
//! LHS = K + (1 - alpha_m) c0 M + (1 - alpha_f) c1 D
//! RHS = f - M ((1 - alpha_m) a_n+1 + alpha_m a_n) - D v_n+1
//! ```

use crate::coefficients::{validate_alpha_m, IntegrationCoefficients, DEFAULT_BETA, DEFAULT_GAMMA};
use crate::config::SchemeSettings;
use crate::dof::DofSet;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::model::ModelPart;
use crate::node::Node;
use crate::process_info::ProcessInfo;
use crate::scheme::{LocalSystem, Scheme};
use crate::scratch::LocalScratch;
use crate::types::{Component, LocalMatrix, LocalVector, Variable, VariableComponent, Vec3};
use rayon::prelude::*;
use tracing::debug;

/// Minimum number of buffered steps: current and previous.
const MIN_BUFFER_SIZE: usize = 2;

/// Buffer slots seeded with the volume acceleration on the first step.
const SEEDED_ACCELERATION_SLOTS: usize = 3;

/// Bossak time-integration scheme.
#[derive(Debug, Clone)]
pub struct BossakScheme {
    coefficients: IntegrationCoefficients,
    /// Unshifted Newmark beta used when the process info has no override.
    beta: f64,
    /// Unshifted Newmark gamma used when the process info has no override.
    gamma: f64,
}

impl BossakScheme {
    /// Create a Bossak scheme with default beta = 0.25, gamma = 0.5.
    ///
    /// `alpha_m` is only validated by [`Scheme::check`].
    pub fn new(alpha_m: f64) -> Self {
        Self {
            coefficients: IntegrationCoefficients::bossak(alpha_m),
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
        }
    }

    /// Pure Newmark average acceleration (alpha_m = 0).
    pub fn newmark() -> Self {
        Self::new(0.0)
    }

    /// Create a scheme from validated settings.
    pub fn from_settings(settings: &SchemeSettings) -> Result<Self> {
        settings.validate()?;
        let mut scheme = Self::new(settings.alpha_m);
        scheme.beta = settings.beta;
        scheme.gamma = settings.gamma;
        scheme
            .coefficients
            .calculate_newmark_coefficients(settings.beta, settings.gamma);
        Ok(scheme)
    }

    pub fn coefficients(&self) -> &IntegrationCoefficients {
        &self.coefficients
    }

    pub fn alpha_m(&self) -> f64 {
        self.coefficients.alpha_m
    }

    /// Add the inertia and damping terms to a local LHS.
    ///
    /// Empty matrices are skipped.
    pub fn add_dynamics_to_lhs(
        &self,
        entity_id: usize,
        lhs: &mut LocalMatrix,
        mass: &LocalMatrix,
        damping: &LocalMatrix,
    ) -> Result<()> {
        let c = &self.coefficients;
        if !mass.is_empty() {
            check_square(entity_id, "mass", mass, lhs.nrows())?;
            let factor = (1.0 - c.alpha_m) * c.c0;
            lhs.zip_apply(mass, |l, m| *l += factor * m);
        }
        if !damping.is_empty() {
            check_square(entity_id, "damping", damping, lhs.nrows())?;
            let factor = (1.0 - c.alpha_f) * c.c1;
            lhs.zip_apply(damping, |l, d| *l += factor * d);
        }
        Ok(())
    }

    /// Subtract the inertia and damping forces from a local RHS.
    ///
    /// Reads the mass and damping matrices already stored in `scratch` and
    /// gathers the nodal derivatives of `entity` into it.
    pub fn add_dynamics_to_rhs(
        &self,
        entity: &dyn Entity,
        nodes: &[Node],
        rhs: &mut LocalVector,
        scratch: &mut LocalScratch,
    ) -> Result<()> {
        let alpha_m = self.coefficients.alpha_m;
        let n = rhs.len();

        if !scratch.mass.is_empty() {
            check_square(entity.id(), "mass", &scratch.mass, n)?;
            entity.second_derivatives(&mut scratch.acceleration, nodes, 0)?;
            entity.second_derivatives(&mut scratch.previous_acceleration, nodes, 1)?;
            check_length(entity.id(), "acceleration", &scratch.acceleration, n)?;
            check_length(
                entity.id(),
                "previous acceleration",
                &scratch.previous_acceleration,
                n,
            )?;
            // a <- (1 - alpha_m) a_n+1 + alpha_m a_n
            scratch
                .acceleration
                .axpy(alpha_m, &scratch.previous_acceleration, 1.0 - alpha_m);
            rhs.gemv(-1.0, &scratch.mass, &scratch.acceleration, 1.0);
        }

        if !scratch.damping.is_empty() {
            check_square(entity.id(), "damping", &scratch.damping, n)?;
            entity.first_derivatives(&mut scratch.velocity, nodes, 0)?;
            check_length(entity.id(), "velocity", &scratch.velocity, n)?;
            rhs.gemv(-1.0, &scratch.damping, &scratch.velocity, 1.0);
        }
        Ok(())
    }

    /// Add the volume acceleration to the buffered accelerations of every
    /// component that is not acceleration-prescribed.
    pub(crate) fn initialize_acceleration(nodes: &mut [Node]) -> Result<()> {
        nodes.par_iter_mut().try_for_each(seed_acceleration)
    }
}

impl Default for BossakScheme {
    fn default() -> Self {
        Self::newmark()
    }
}

fn seed_acceleration(node: &mut Node) -> Result<()> {
    if !node.has(Variable::VolumeAcceleration) {
        return Ok(());
    }
    let g = node.value(Variable::VolumeAcceleration, 0)?;
    let free = Component::ALL.map(|c| !node.is_fixed(Variable::Acceleration.component(c)));
    let id = node.id();
    let history = node
        .history_mut(Variable::Acceleration)
        .ok_or(Error::VariableNotAllocated {
            variable: Variable::Acceleration.name(),
            node: id,
        })?;
    let slots = history.len().min(SEEDED_ACCELERATION_SLOTS);
    for step in 0..slots {
        if let Some(a) = history.get_mut(step) {
            for c in Component::ALL {
                if free[c.index()] {
                    a[c.index()] += g[c.index()];
                }
            }
        }
    }
    Ok(())
}

fn check_square(entity_id: usize, what: &str, m: &LocalMatrix, n: usize) -> Result<()> {
    if m.shape() != (n, n) {
        return Err(Error::entity(
            entity_id,
            format!(
                "{} matrix is {}x{}, local system has size {}",
                what,
                m.nrows(),
                m.ncols(),
                n
            ),
        ));
    }
    Ok(())
}

fn check_length(entity_id: usize, what: &str, v: &LocalVector, n: usize) -> Result<()> {
    if v.len() != n {
        return Err(Error::entity(
            entity_id,
            format!("{} vector has length {}, expected {}", what, v.len(), n),
        ));
    }
    Ok(())
}

/// Which displacement predictor applies to one component of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prediction {
    PrescribedAcceleration,
    PrescribedVelocity,
    Free,
    PrescribedDisplacement,
}

pub(crate) fn prediction_for(node: &Node, component: Component) -> Prediction {
    let acceleration = node.is_fixed(Variable::Acceleration.component(component));
    let velocity = node.is_fixed(Variable::Velocity.component(component));
    if acceleration && velocity {
        debug!(
            node = node.id(),
            component = ?component,
            "acceleration and velocity both prescribed; using acceleration"
        );
    }
    if acceleration {
        Prediction::PrescribedAcceleration
    } else if velocity {
        Prediction::PrescribedVelocity
    } else if !node.is_fixed(Variable::Displacement.component(component)) {
        Prediction::Free
    } else {
        Prediction::PrescribedDisplacement
    }
}

/// v_n+1 = c1 Δd - c4 v_n - c5 a_n
fn update_velocity(
    c: &IntegrationCoefficients,
    delta: &Vec3,
    v_prev: &Vec3,
    a_prev: &Vec3,
) -> Vec3 {
    delta * c.c1 - v_prev * c.c4 - a_prev * c.c5
}

/// a_n+1 = c0 Δd - c2 v_n - c3 a_n
fn update_acceleration(
    c: &IntegrationCoefficients,
    delta: &Vec3,
    v_prev: &Vec3,
    a_prev: &Vec3,
) -> Vec3 {
    delta * c.c0 - v_prev * c.c2 - a_prev * c.c3
}

/// Rederive the current velocity and acceleration of `node` from its
/// displacement increment over the step.
fn update_derivatives(c: &IntegrationCoefficients, node: &mut Node) -> Result<()> {
    let delta =
        node.value(Variable::Displacement, 0)? - node.value(Variable::Displacement, 1)?;
    let v_prev = node.value(Variable::Velocity, 1)?;
    let a_prev = node.value(Variable::Acceleration, 1)?;
    node.set_value(
        Variable::Velocity,
        0,
        update_velocity(c, &delta, &v_prev, &a_prev),
    )?;
    node.set_value(
        Variable::Acceleration,
        0,
        update_acceleration(c, &delta, &v_prev, &a_prev),
    )
}

fn predict_node(c: &IntegrationCoefficients, dt: f64, node: &mut Node) -> Result<()> {
    let d_prev = node.value(Variable::Displacement, 1)?;
    let v_prev = node.value(Variable::Velocity, 1)?;
    let a_prev = node.value(Variable::Acceleration, 1)?;
    let v_curr = node.value(Variable::Velocity, 0)?;
    let a_curr = node.value(Variable::Acceleration, 0)?;
    let mut d = node.value(Variable::Displacement, 0)?;
    let dt2 = dt * dt;

    for component in Component::ALL {
        if component == Component::Z && !node.has_dof_for(VariableComponent::DISPLACEMENT_Z) {
            continue;
        }
        let i = component.index();
        match prediction_for(node, component) {
            Prediction::PrescribedAcceleration => {
                d[i] = d_prev[i]
                    + dt * v_prev[i]
                    + dt2 * (0.5 * (1.0 - 2.0 * c.beta) * a_prev[i] + c.beta * a_curr[i]);
            }
            Prediction::PrescribedVelocity => {
                d[i] = d_prev[i] + 0.5 * dt * (v_prev[i] + v_curr[i]) + 0.5 * dt2 * a_prev[i];
            }
            Prediction::Free => {
                d[i] = d_prev[i] + dt * v_prev[i] + 0.5 * dt2 * a_prev[i];
            }
            Prediction::PrescribedDisplacement => {}
        }
    }

    node.set_value(Variable::Displacement, 0, d)?;
    update_derivatives(c, node)
}

impl Scheme for BossakScheme {
    fn name(&self) -> &str {
        "bossak"
    }

    fn check(&self, model: &ModelPart) -> Result<()> {
        let schema = model.schema();
        for variable in [
            Variable::Displacement,
            Variable::Velocity,
            Variable::Acceleration,
        ] {
            schema.require(variable)?;
        }

        for node in model.nodes() {
            for variable in [
                Variable::Displacement,
                Variable::Velocity,
                Variable::Acceleration,
            ] {
                if !node.has(variable) {
                    return Err(Error::VariableNotAllocated {
                        variable: variable.name(),
                        node: node.id(),
                    });
                }
            }
        }

        let dimension = model.dimension();
        for node in model.nodes() {
            for component in &Component::ALL[..dimension] {
                let dof = Variable::Displacement.component(*component);
                if !node.has_dof_for(dof) {
                    return Err(Error::MissingDof {
                        dof: dof.to_string(),
                        node: node.id(),
                    });
                }
            }
        }

        validate_alpha_m(self.coefficients.alpha_m)?;

        if model.buffer_size() < MIN_BUFFER_SIZE {
            return Err(Error::InsufficientBufferSize {
                required: MIN_BUFFER_SIZE,
                actual: model.buffer_size(),
            });
        }

        for entity in model.entities() {
            entity.check(model.nodes())?;
        }
        Ok(())
    }

    fn initialize_solution_step(&mut self, model: &ModelPart) -> Result<()> {
        let info = &model.process_info;
        let beta = info.newmark_beta.unwrap_or(self.beta);
        let gamma = info.newmark_gamma.unwrap_or(self.gamma);
        self.coefficients.calculate_newmark_coefficients(beta, gamma);
        self.coefficients.update_for_time_step(info.delta_time)?;

        let c = &self.coefficients;
        debug!(
            step = info.time_steps,
            delta_time = info.delta_time,
            alpha_m = c.alpha_m,
            beta = c.beta,
            gamma = c.gamma,
            c0 = c.c0,
            c1 = c.c1,
            c2 = c.c2,
            c3 = c.c3,
            c4 = c.c4,
            c5 = c.c5,
            "bossak coefficients"
        );
        Ok(())
    }

    fn predict(&mut self, model: &mut ModelPart) -> Result<()> {
        if model.process_info.is_first_step() {
            Self::initialize_acceleration(&mut model.nodes)?;
        }
        let dt = model.process_info.delta_time;
        let c = self.coefficients;
        model
            .nodes
            .par_iter_mut()
            .try_for_each(|node| predict_node(&c, dt, node))
    }

    fn calculate_system_contributions(
        &self,
        entity: &dyn Entity,
        nodes: &[Node],
        info: &ProcessInfo,
        local: &mut LocalSystem,
        scratch: &mut LocalScratch,
    ) -> Result<()> {
        entity.calculate_local_system(&mut local.lhs, &mut local.rhs, nodes, info)?;
        entity.equation_ids(nodes, &mut local.equation_ids)?;
        entity.calculate_mass_matrix(&mut scratch.mass, nodes, info)?;
        entity.calculate_damping_matrix(&mut scratch.damping, nodes, info)?;

        self.add_dynamics_to_lhs(entity.id(), &mut local.lhs, &scratch.mass, &scratch.damping)?;
        self.add_dynamics_to_rhs(entity, nodes, &mut local.rhs, scratch)
    }

    fn calculate_rhs_contribution(
        &self,
        entity: &dyn Entity,
        nodes: &[Node],
        info: &ProcessInfo,
        rhs: &mut LocalVector,
        equation_ids: &mut Vec<usize>,
        scratch: &mut LocalScratch,
    ) -> Result<()> {
        entity.calculate_right_hand_side(rhs, nodes, info)?;
        entity.equation_ids(nodes, equation_ids)?;
        entity.calculate_mass_matrix(&mut scratch.mass, nodes, info)?;
        entity.calculate_damping_matrix(&mut scratch.damping, nodes, info)?;

        self.add_dynamics_to_rhs(entity, nodes, rhs, scratch)
    }

    fn update(&mut self, model: &mut ModelPart, dofs: &DofSet, dx: &[f64]) -> Result<()> {
        dofs.apply_increment(&mut model.nodes, dx)?;
        let c = self.coefficients;
        model
            .nodes
            .par_iter_mut()
            .try_for_each(|node| update_derivatives(&c, node))
    }
}
