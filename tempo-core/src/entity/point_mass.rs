//! Lumped nodal mass.
//!
//! A single-node element carrying translational inertia `m·I` and optional
//! viscous damping `c·I`. Body forces from the node's `VOLUME_ACCELERATION`
//! enter the right-hand side as `m·g`.

use crate::entity::{check_dimension, entity_node, reset_local_system, Entity};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::process_info::ProcessInfo;
use crate::types::{LocalMatrix, LocalVector, Variable};

#[derive(Debug, Clone)]
pub struct PointMass {
    id: usize,
    nodes: [usize; 1],
    dimension: usize,
    mass: f64,
    damping: f64,
}

impl PointMass {
    /// Create a point mass on node index `node`.
    ///
    /// # Errors
    ///
    /// Returns error if the mass is not positive or `dimension` is not 2 or 3.
    pub fn new(id: usize, node: usize, mass: f64, dimension: usize) -> Result<Self> {
        check_dimension(id, dimension)?;
        if mass <= 0.0 || !mass.is_finite() {
            return Err(Error::entity(id, "mass must be positive"));
        }
        Ok(Self {
            id,
            nodes: [node],
            dimension,
            mass,
            damping: 0.0,
        })
    }

    /// Attach a viscous damping coefficient.
    pub fn with_damping(mut self, damping: f64) -> Result<Self> {
        if damping < 0.0 || !damping.is_finite() {
            return Err(Error::entity(self.id, "damping must be non-negative"));
        }
        self.damping = damping;
        Ok(self)
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }
}

impl Entity for PointMass {
    fn id(&self) -> usize {
        self.id
    }

    fn node_indices(&self) -> &[usize] {
        &self.nodes
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn calculate_local_system(
        &self,
        lhs: &mut LocalMatrix,
        rhs: &mut LocalVector,
        nodes: &[Node],
        _info: &ProcessInfo,
    ) -> Result<()> {
        reset_local_system(lhs, rhs, self.dimension);
        let node = entity_node(self.id, nodes, self.nodes[0])?;
        if node.has(Variable::VolumeAcceleration) {
            let g = node.value(Variable::VolumeAcceleration, 0)?;
            for c in 0..self.dimension {
                rhs[c] = self.mass * g[c];
            }
        }
        Ok(())
    }

    fn calculate_mass_matrix(
        &self,
        mass: &mut LocalMatrix,
        _nodes: &[Node],
        _info: &ProcessInfo,
    ) -> Result<()> {
        mass.resize_mut(self.dimension, self.dimension, 0.0);
        mass.fill_with_identity();
        *mass *= self.mass;
        Ok(())
    }

    fn calculate_damping_matrix(
        &self,
        damping: &mut LocalMatrix,
        _nodes: &[Node],
        _info: &ProcessInfo,
    ) -> Result<()> {
        if self.damping == 0.0 {
            damping.resize_mut(0, 0, 0.0);
        } else {
            damping.resize_mut(self.dimension, self.dimension, 0.0);
            damping.fill_with_identity();
            *damping *= self.damping;
        }
        Ok(())
    }
}
