//! Nodal point load condition.

use crate::entity::{reset_local_system, Entity};
use crate::error::Result;
use crate::node::Node;
use crate::process_info::ProcessInfo;
use crate::types::{LocalMatrix, LocalVector, Vec3};

/// Constant external force applied at one node.
#[derive(Debug, Clone)]
pub struct PointLoad {
    id: usize,
    nodes: [usize; 1],
    dimension: usize,
    force: Vec3,
}

impl PointLoad {
    /// Create a 3D point load on node index `node`.
    pub fn new(id: usize, node: usize, force: Vec3) -> Self {
        Self {
            id,
            nodes: [node],
            dimension: 3,
            force,
        }
    }

    /// Restrict the load to the first `dimension` components.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension.clamp(1, 3);
        self
    }

    pub fn force(&self) -> &Vec3 {
        &self.force
    }

    pub fn set_force(&mut self, force: Vec3) {
        self.force = force;
    }
}

impl Entity for PointLoad {
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
        _nodes: &[Node],
        _info: &ProcessInfo,
    ) -> Result<()> {
        reset_local_system(lhs, rhs, self.dimension);
        for c in 0..self.dimension {
            rhs[c] = self.force[c];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelSchema;
    use crate::types::VariableComponent;

    #[test]
    fn test_load_vector() {
        let schema = ModelSchema::structural(2, 2).unwrap();
        let nodes = vec![Node::new(1, Vec3::zeros(), &schema)];
        let mut load = PointLoad::new(1, 0, Vec3::new(1.0, -2.0, 3.0)).with_dimension(2);

        let mut lhs = LocalMatrix::zeros(0, 0);
        let mut rhs = LocalVector::zeros(0);
        load.calculate_local_system(&mut lhs, &mut rhs, &nodes, &ProcessInfo::new())
            .unwrap();
        assert_eq!(lhs, LocalMatrix::zeros(2, 2));
        assert_eq!(rhs.as_slice(), &[1.0, -2.0]);

        load.set_force(Vec3::new(0.5, 0.0, 0.0));
        load.calculate_right_hand_side(&mut rhs, &nodes, &ProcessInfo::new())
            .unwrap();
        assert_eq!(rhs.as_slice(), &[0.5, 0.0]);
    }

    #[test]
    fn test_check_requires_displacement_dofs() {
        let schema = ModelSchema::structural(3, 2).unwrap();
        let mut nodes = vec![Node::new(4, Vec3::zeros(), &schema)];
        let load = PointLoad::new(1, 0, Vec3::zeros());
        assert!(load.check(&nodes).is_err());

        for vc in [
            VariableComponent::DISPLACEMENT_X,
            VariableComponent::DISPLACEMENT_Y,
            VariableComponent::DISPLACEMENT_Z,
        ] {
            nodes[0].add_dof(vc);
        }
        load.check(&nodes).unwrap();
    }
}
