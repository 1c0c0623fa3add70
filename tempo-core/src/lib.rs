//! Tempo Core - implicit structural dynamics time integration
//!
//! Advances a finite element model in time with the Bossak (alpha) method:
//! - Buffered nodal state (displacement, velocity, acceleration histories)
//! - Displacement prediction and Newmark-style derivative updates
//! - Effective dynamic system assembly in parallel using Rayon
//! - Sparse direct solution with faer inside a Newton-Raphson loop
//!
//! # Architecture
//!
//! The solver is designed around these core abstractions:
//!
//! - [`ModelPart`]: Nodes, elements, conditions and time-step state
//! - [`Entity`] trait: Local static contributions, mass and damping
//! - [`Scheme`] trait: Prediction, update and dynamic contributions
//! - [`Solver`] trait: Linear system solution strategies
//! - [`NewtonRaphsonStrategy`]: Per-step nonlinear loop
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tempo_core::{BossakScheme, ModelPart, ModelSchema, NewtonRaphsonStrategy};
//!
//! let schema = Arc::new(ModelSchema::structural(3, 2)?);
//! let mut model = ModelPart::new("structure", schema);
//! // Add nodes, DOFs, elements and conditions...
//!
//! let mut strategy = NewtonRaphsonStrategy::new(BossakScheme::new(-0.1), Default::default())?;
//! for _ in 0..100 {
//!     strategy.advance(&mut model, 0.01)?;
//! }
//! ```

pub mod assembly;
pub mod coefficients;
pub mod config;
pub mod dof;
pub mod entity;
pub mod error;
pub mod history;
pub mod model;
pub mod node;
pub mod process_info;
pub mod schema;
pub mod scheme;
pub mod scratch;
pub mod solver;
pub mod sparse;
pub mod strategy;
pub mod types;

pub use coefficients::IntegrationCoefficients;
pub use config::{AnalysisSettings, SchemeSettings, StrategySettings};
pub use dof::{Dof, DofSet};
pub use entity::Entity;
pub use error::{Error, Result};
pub use model::ModelPart;
pub use node::Node;
pub use process_info::ProcessInfo;
pub use schema::ModelSchema;
pub use scheme::{BossakScheme, Scheme};
pub use solver::Solver;
pub use sparse::CsrMatrix;
pub use strategy::{NewtonRaphsonStrategy, StepReport};
pub use types::{Component, Variable, VariableComponent, Vec3};
