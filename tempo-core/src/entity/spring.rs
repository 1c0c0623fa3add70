//! Linear two-node spring.
//!
//! Couples every displacement component of two nodes with the same stiffness:
//! `K = k·[I -I; -I I]`. The residual is `-K·u`, so the element is linear and a
//! single Newton iteration converges.

use crate::entity::{check_dimension, reset_local_system, Entity};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::process_info::ProcessInfo;
use crate::types::{LocalMatrix, LocalVector};

#[derive(Debug, Clone)]
pub struct LinearSpring {
    id: usize,
    nodes: [usize; 2],
    dimension: usize,
    stiffness: f64,
}

impl LinearSpring {
    /// Create a spring between node indices `a` and `b`.
    pub fn new(id: usize, a: usize, b: usize, stiffness: f64, dimension: usize) -> Result<Self> {
        check_dimension(id, dimension)?;
        if stiffness <= 0.0 || !stiffness.is_finite() {
            return Err(Error::entity(id, "spring stiffness must be positive"));
        }
        if a == b {
            return Err(Error::entity(id, "spring must connect two distinct nodes"));
        }
        Ok(Self {
            id,
            nodes: [a, b],
            dimension,
            stiffness,
        })
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    fn fill_stiffness(&self, k: &mut LocalMatrix) {
        let d = self.dimension;
        for c in 0..d {
            k[(c, c)] = self.stiffness;
            k[(d + c, d + c)] = self.stiffness;
            k[(c, d + c)] = -self.stiffness;
            k[(d + c, c)] = -self.stiffness;
        }
    }
}

impl Entity for LinearSpring {
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
        reset_local_system(lhs, rhs, self.n_dofs());
        self.fill_stiffness(lhs);

        let mut u = LocalVector::zeros(0);
        self.values(&mut u, nodes, 0)?;
        rhs.gemv(-1.0, &*lhs, &u, 0.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelSchema;
    use crate::types::{Variable, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_spring_residual() {
        let schema = ModelSchema::structural(2, 2).unwrap();
        let mut nodes = vec![
            Node::new(1, Vec3::zeros(), &schema),
            Node::new(2, Vec3::new(1.0, 0.0, 0.0), &schema),
        ];
        nodes[1]
            .set_value(Variable::Displacement, 0, Vec3::new(0.1, -0.2, 0.0))
            .unwrap();

        let spring = LinearSpring::new(1, 0, 1, 100.0, 2).unwrap();
        let mut lhs = LocalMatrix::zeros(0, 0);
        let mut rhs = LocalVector::zeros(0);
        spring
            .calculate_local_system(&mut lhs, &mut rhs, &nodes, &ProcessInfo::new())
            .unwrap();

        assert_eq!(lhs.shape(), (4, 4));
        assert_relative_eq!(lhs[(0, 2)], -100.0);
        // Internal force pulls node 2 back toward node 1.
        assert_relative_eq!(rhs[2], -10.0, epsilon = 1e-12);
        assert_relative_eq!(rhs[3], 20.0, epsilon = 1e-12);
        assert_relative_eq!(rhs[0], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_spring() {
        assert!(LinearSpring::new(1, 0, 1, -5.0, 3).is_err());
        assert!(LinearSpring::new(1, 2, 2, 5.0, 3).is_err());
        assert!(matches!(
            LinearSpring::new(1, 0, 1, 5.0, 4),
            Err(Error::Entity { id: 1, .. })
        ));
    }
}
