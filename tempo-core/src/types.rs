//! Core data types shared across the time-integration pipeline.
//!
//! This module defines:
//! - Dense local matrix/vector aliases used for entity contributions
//! - Nodal vector variables and their scalar components (`DISPLACEMENT_X`, ...)

use nalgebra::{DMatrix, DVector, Vector3};
use std::fmt;

/// A 3D nodal vector (displacement, velocity, acceleration, ...).
pub type Vec3 = Vector3<f64>;

/// Dense local (entity) matrix.
pub type LocalMatrix = DMatrix<f64>;

/// Dense local (entity) vector.
pub type LocalVector = DVector<f64>;

/// Spatial component of a nodal vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    X,
    Y,
    Z,
}

impl Component {
    /// All components in storage order.
    pub const ALL: [Component; 3] = [Component::X, Component::Y, Component::Z];

    /// Index into a [`Vec3`].
    pub fn index(self) -> usize {
        match self {
            Component::X => 0,
            Component::Y => 1,
            Component::Z => 2,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Component::X => "X",
            Component::Y => "Y",
            Component::Z => "Z",
        }
    }
}

/// Vector-valued nodal variables stored with history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variable {
    Displacement,
    Velocity,
    Acceleration,
    /// Body-force acceleration such as gravity.
    VolumeAcceleration,
}

impl Variable {
    /// Number of variables, used to size per-node tables.
    pub const COUNT: usize = 4;

    /// All variables in storage order.
    pub const ALL: [Variable; Variable::COUNT] = [
        Variable::Displacement,
        Variable::Velocity,
        Variable::Acceleration,
        Variable::VolumeAcceleration,
    ];

    /// Dense index of this variable.
    pub fn index(self) -> usize {
        match self {
            Variable::Displacement => 0,
            Variable::Velocity => 1,
            Variable::Acceleration => 2,
            Variable::VolumeAcceleration => 3,
        }
    }

    /// Upper-case name, e.g. `DISPLACEMENT`.
    pub fn name(self) -> &'static str {
        match self {
            Variable::Displacement => "DISPLACEMENT",
            Variable::Velocity => "VELOCITY",
            Variable::Acceleration => "ACCELERATION",
            Variable::VolumeAcceleration => "VOLUME_ACCELERATION",
        }
    }

    /// Scalar component of this variable.
    pub fn component(self, component: Component) -> VariableComponent {
        VariableComponent {
            variable: self,
            component,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar component of a nodal vector variable, e.g. `ACCELERATION_Y`.
///
/// Degrees of freedom and fixity flags are keyed by these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableComponent {
    pub variable: Variable,
    pub component: Component,
}

impl VariableComponent {
    pub const DISPLACEMENT_X: Self = Self::new(Variable::Displacement, Component::X);
    pub const DISPLACEMENT_Y: Self = Self::new(Variable::Displacement, Component::Y);
    pub const DISPLACEMENT_Z: Self = Self::new(Variable::Displacement, Component::Z);
    pub const VELOCITY_X: Self = Self::new(Variable::Velocity, Component::X);
    pub const VELOCITY_Y: Self = Self::new(Variable::Velocity, Component::Y);
    pub const VELOCITY_Z: Self = Self::new(Variable::Velocity, Component::Z);
    pub const ACCELERATION_X: Self = Self::new(Variable::Acceleration, Component::X);
    pub const ACCELERATION_Y: Self = Self::new(Variable::Acceleration, Component::Y);
    pub const ACCELERATION_Z: Self = Self::new(Variable::Acceleration, Component::Z);

    pub const fn new(variable: Variable, component: Component) -> Self {
        Self {
            variable,
            component,
        }
    }

    /// Bit position used by per-node fixity masks.
    pub(crate) fn bit(self) -> u16 {
        1 << (self.variable.index() * 3 + self.component.index())
    }
}

impl fmt::Display for VariableComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.variable.name(), self.component.suffix())
    }
}
