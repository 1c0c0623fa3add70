//! Entity (element/condition) capability interface.
//!
//! The scheme never computes physics itself. Any element or condition that
//! can produce local static contributions, mass/damping matrices, equation ids
//! and nodal derivative vectors can be assembled by it.
//!
//! # Submodules
//!
//! - [`point_mass`] - Lumped nodal mass with optional viscous damping
//! - [`spring`] - Linear two-node spring
//! - [`point_load`] - Constant nodal force condition

use crate::error::{Error, Result};
use crate::node::Node;
use crate::process_info::ProcessInfo;
use crate::types::{Component, LocalMatrix, LocalVector, Variable};

pub mod point_load;
pub mod point_mass;
pub mod spring;

pub use point_load::PointLoad;
pub use point_mass::PointMass;
pub use spring::LinearSpring;

/// Finite element entity interface.
///
/// Elements and conditions both implement this trait. Local vectors are laid
/// out node by node, `dimension()` displacement components per node, matching
/// the order of [`Entity::equation_ids`].
///
/// Entities must be thread-safe (Send + Sync) to enable parallel assembly.
/// Contributions are computed while the worker's scratch buffers are borrowed,
/// so an entity that spawns rayon work of its own may see assembly fail with
/// [`Error::Assembly`].
pub trait Entity: Send + Sync {
    /// Entity id used in diagnostics.
    fn id(&self) -> usize;

    /// Indices of the nodes this entity connects, into the model's node list.
    fn node_indices(&self) -> &[usize];

    /// Displacement components per node (2 or 3).
    fn dimension(&self) -> usize;

    /// Total local degrees of freedom.
    fn n_dofs(&self) -> usize {
        self.node_indices().len() * self.dimension()
    }

    /// Compute the local left-hand side (tangent) and right-hand side
    /// (residual, external minus internal forces).
    ///
    /// Implementations resize both outputs to `n_dofs()`.
    fn calculate_local_system(
        &self,
        lhs: &mut LocalMatrix,
        rhs: &mut LocalVector,
        nodes: &[Node],
        info: &ProcessInfo,
    ) -> Result<()>;

    /// Compute only the local right-hand side.
    fn calculate_right_hand_side(
        &self,
        rhs: &mut LocalVector,
        nodes: &[Node],
        info: &ProcessInfo,
    ) -> Result<()> {
        let mut lhs = LocalMatrix::zeros(0, 0);
        self.calculate_local_system(&mut lhs, rhs, nodes, info)
    }

    /// Compute the local mass matrix. An entity without inertia leaves it empty.
    fn calculate_mass_matrix(
        &self,
        mass: &mut LocalMatrix,
        _nodes: &[Node],
        _info: &ProcessInfo,
    ) -> Result<()> {
        mass.resize_mut(0, 0, 0.0);
        Ok(())
    }

    /// Compute the local damping matrix. An entity without damping leaves it empty.
    fn calculate_damping_matrix(
        &self,
        damping: &mut LocalMatrix,
        _nodes: &[Node],
        _info: &ProcessInfo,
    ) -> Result<()> {
        damping.resize_mut(0, 0, 0.0);
        Ok(())
    }

    /// Global equation ids of the local DOFs.
    fn equation_ids(&self, nodes: &[Node], ids: &mut Vec<usize>) -> Result<()> {
        ids.clear();
        let components = spatial_components(self.id(), self.dimension())?;
        for &node_idx in self.node_indices() {
            let node = entity_node(self.id(), nodes, node_idx)?;
            for component in components {
                let variable = Variable::Displacement.component(*component);
                let dof = node.dof(variable).ok_or_else(|| Error::MissingDof {
                    dof: variable.to_string(),
                    node: node.id(),
                })?;
                let id = dof.equation_id().ok_or_else(|| {
                    Error::entity(
                        self.id(),
                        format!("{} on node {} has no equation id", variable, node.id()),
                    )
                })?;
                ids.push(id);
            }
        }
        Ok(())
    }

    /// Nodal displacements `step` steps back.
    fn values(&self, out: &mut LocalVector, nodes: &[Node], step: usize) -> Result<()> {
        gather_nodal_values(self, Variable::Displacement, step, nodes, out)
    }

    /// Nodal velocities `step` steps back.
    fn first_derivatives(&self, out: &mut LocalVector, nodes: &[Node], step: usize) -> Result<()> {
        gather_nodal_values(self, Variable::Velocity, step, nodes, out)
    }

    /// Nodal accelerations `step` steps back.
    fn second_derivatives(
        &self,
        out: &mut LocalVector,
        nodes: &[Node],
        step: usize,
    ) -> Result<()> {
        gather_nodal_values(self, Variable::Acceleration, step, nodes, out)
    }

    /// Hook called once per Newton iteration before assembly.
    fn initialize_non_linear_iteration(
        &mut self,
        _nodes: &[Node],
        _info: &ProcessInfo,
    ) -> Result<()> {
        Ok(())
    }

    /// Verify the entity can be assembled against `nodes`.
    fn check(&self, nodes: &[Node]) -> Result<()> {
        let components = spatial_components(self.id(), self.dimension())?;
        for &node_idx in self.node_indices() {
            let node = entity_node(self.id(), nodes, node_idx)?;
            for component in components {
                let variable = Variable::Displacement.component(*component);
                if !node.has_dof_for(variable) {
                    return Err(Error::MissingDof {
                        dof: variable.to_string(),
                        node: node.id(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Displacement components of an entity with `dimension` components per node.
pub(crate) fn spatial_components(
    entity_id: usize,
    dimension: usize,
) -> Result<&'static [Component]> {
    Component::ALL.get(..dimension).ok_or_else(|| {
        Error::entity(
            entity_id,
            format!("dimension {} exceeds 3 spatial components", dimension),
        )
    })
}

/// Reject dimensions other than 2 or 3.
pub(crate) fn check_dimension(entity_id: usize, dimension: usize) -> Result<()> {
    if !(2..=3).contains(&dimension) {
        return Err(Error::entity(
            entity_id,
            format!("dimension must be 2 or 3, got {}", dimension),
        ));
    }
    Ok(())
}

pub(crate) fn entity_node(entity_id: usize, nodes: &[Node], node_idx: usize) -> Result<&Node> {
    nodes.get(node_idx).ok_or_else(|| {
        Error::entity(
            entity_id,
            format!("node index {} out of bounds ({} nodes)", node_idx, nodes.len()),
        )
    })
}

/// Gather `variable` at `step` for every node of `entity` into `out`.
pub fn gather_nodal_values<E: Entity + ?Sized>(
    entity: &E,
    variable: Variable,
    step: usize,
    nodes: &[Node],
    out: &mut LocalVector,
) -> Result<()> {
    let dimension = entity.dimension();
    spatial_components(entity.id(), dimension)?;
    let indices = entity.node_indices();
    out.resize_vertically_mut(indices.len() * dimension, 0.0);
    for (i, &node_idx) in indices.iter().enumerate() {
        let value = entity_node(entity.id(), nodes, node_idx)?.value(variable, step)?;
        for c in 0..dimension {
            out[i * dimension + c] = value[c];
        }
    }
    Ok(())
}

/// Resize `lhs` and `rhs` to `n` and zero them.
pub(crate) fn reset_local_system(lhs: &mut LocalMatrix, rhs: &mut LocalVector, n: usize) {
    lhs.resize_mut(n, n, 0.0);
    lhs.fill(0.0);
    rhs.resize_vertically_mut(n, 0.0);
    rhs.fill(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelSchema;
    use crate::types::Vec3;

    /// User entity reporting more components than a node carries.
    struct Hyper {
        nodes: [usize; 1],
    }

    impl Entity for Hyper {
        fn id(&self) -> usize {
            9
        }

        fn node_indices(&self) -> &[usize] {
            &self.nodes
        }

        fn dimension(&self) -> usize {
            4
        }

        fn calculate_local_system(
            &self,
            lhs: &mut LocalMatrix,
            rhs: &mut LocalVector,
            _nodes: &[Node],
            _info: &ProcessInfo,
        ) -> Result<()> {
            reset_local_system(lhs, rhs, self.n_dofs());
            Ok(())
        }
    }

    #[test]
    fn test_oversized_dimension_is_an_error() {
        let schema = ModelSchema::structural(3, 2).unwrap();
        let nodes = vec![Node::new(1, Vec3::zeros(), &schema)];
        let entity = Hyper { nodes: [0] };

        assert!(matches!(entity.check(&nodes), Err(Error::Entity { id: 9, .. })));
        let mut ids = Vec::new();
        assert!(matches!(
            entity.equation_ids(&nodes, &mut ids),
            Err(Error::Entity { id: 9, .. })
        ));
        let mut out = LocalVector::zeros(0);
        assert!(entity.first_derivatives(&mut out, &nodes, 0).is_err());
    }

    #[test]
    fn test_dimension_band() {
        assert!(check_dimension(1, 2).is_ok());
        assert!(check_dimension(1, 3).is_ok());
        assert!(check_dimension(1, 1).is_err());
        assert!(check_dimension(1, 4).is_err());
        assert_eq!(spatial_components(1, 2).unwrap(), &Component::ALL[..2]);
    }
}
