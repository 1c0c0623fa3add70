//! Degrees of freedom and the ordered DOF set.
//!
//! Each [`Dof`] lives on its node and designates one scalar component of a
//! buffered nodal variable. A [`DofSet`] enumerates every DOF of a model part
//! and assigns equation indices: free DOFs first (`0..n_free`), fixed DOFs after.
//! Only free DOFs take part in the global system.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::types::VariableComponent;
use rayon::prelude::*;

/// One scalar unknown of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Dof {
    variable: VariableComponent,
    equation_id: Option<usize>,
    fixed: bool,
}

impl Dof {
    pub fn new(variable: VariableComponent) -> Self {
        Self {
            variable,
            equation_id: None,
            fixed: false,
        }
    }

    /// Variable component this DOF solves for.
    pub fn variable(&self) -> VariableComponent {
        self.variable
    }

    /// Equation index, `None` until a [`DofSet`] has been set up.
    pub fn equation_id(&self) -> Option<usize> {
        self.equation_id
    }

    pub fn is_free(&self) -> bool {
        !self.fixed
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub(crate) fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    pub(crate) fn set_equation_id(&mut self, id: usize) {
        self.equation_id = Some(id);
    }
}

/// Location of a DOF: owning node index and variable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DofHandle {
    pub node: usize,
    pub variable: VariableComponent,
    pub equation_id: usize,
    pub fixed: bool,
}

/// Ordered set of all DOFs of a model part.
#[derive(Debug, Clone, Default)]
pub struct DofSet {
    handles: Vec<DofHandle>,
    n_free: usize,
}

impl DofSet {
    /// Enumerate the DOFs of `nodes` and assign equation indices.
    ///
    /// Free DOFs are numbered `0..n_free` in node order, fixed DOFs follow.
    pub fn setup(nodes: &mut [Node]) -> Self {
        let n_free = nodes
            .iter()
            .flat_map(|n| n.dofs())
            .filter(|d| d.is_free())
            .count();

        let mut handles = Vec::new();
        let mut next_free = 0;
        let mut next_fixed = n_free;
        for (node_idx, node) in nodes.iter_mut().enumerate() {
            for dof in node.dofs_mut() {
                let id = if dof.is_free() {
                    next_free += 1;
                    next_free - 1
                } else {
                    next_fixed += 1;
                    next_fixed - 1
                };
                dof.set_equation_id(id);
                handles.push(DofHandle {
                    node: node_idx,
                    variable: dof.variable(),
                    equation_id: id,
                    fixed: dof.is_fixed(),
                });
            }
        }
        handles.sort_by_key(|h| h.equation_id);

        Self { handles, n_free }
    }

    /// Total number of DOFs, fixed included.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Size of the global system (number of free DOFs).
    pub fn equation_system_size(&self) -> usize {
        self.n_free
    }

    /// DOF handles ordered by equation index.
    pub fn iter(&self) -> impl Iterator<Item = &DofHandle> {
        self.handles.iter()
    }

    /// Add `dx[equation_id]` to the value of every free DOF.
    ///
    /// Fixed DOFs are left untouched. Work is split by node, so each thread
    /// writes only the DOFs of the nodes it owns.
    pub fn apply_increment(&self, nodes: &mut [Node], dx: &[f64]) -> Result<()> {
        if dx.len() != self.n_free {
            return Err(Error::DimensionMismatch {
                expected: self.n_free,
                actual: dx.len(),
            });
        }
        nodes
            .par_iter_mut()
            .try_for_each(|node| node.apply_increment(dx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelSchema;
    use crate::types::{Variable, Vec3};
    use approx::assert_relative_eq;

    fn nodes() -> Vec<Node> {
        let schema = ModelSchema::structural(2, 2).unwrap();
        let mut nodes: Vec<Node> = (0..3)
            .map(|i| Node::new(i + 1, Vec3::new(i as f64, 0.0, 0.0), &schema))
            .collect();
        for node in &mut nodes {
            node.add_dof(VariableComponent::DISPLACEMENT_X);
            node.add_dof(VariableComponent::DISPLACEMENT_Y);
        }
        nodes[0].fix(VariableComponent::DISPLACEMENT_X);
        nodes[0].fix(VariableComponent::DISPLACEMENT_Y);
        nodes[2].fix(VariableComponent::DISPLACEMENT_Y);
        nodes
    }

    #[test]
    fn test_free_dofs_numbered_first() {
        let mut nodes = nodes();
        let dofs = DofSet::setup(&mut nodes);
        assert_eq!(dofs.len(), 6);
        assert_eq!(dofs.equation_system_size(), 3);
        for h in dofs.iter() {
            assert_eq!(h.fixed, h.equation_id >= 3);
        }
        let ids: Vec<usize> = dofs.iter().map(|h| h.equation_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_increment_skips_fixed_dofs() {
        let mut nodes = nodes();
        nodes[0]
            .set_value(Variable::Displacement, 0, Vec3::new(0.25, -0.5, 0.0))
            .unwrap();
        nodes[2]
            .set_value(Variable::Displacement, 0, Vec3::new(1.0, 2.0, 0.0))
            .unwrap();
        let dofs = DofSet::setup(&mut nodes);

        let dx = [0.1, 0.2, 0.3];
        dofs.apply_increment(&mut nodes, &dx).unwrap();

        // Fixed values keep their prescribed values.
        let d0 = nodes[0].value(Variable::Displacement, 0).unwrap();
        assert_relative_eq!(d0.x, 0.25);
        assert_relative_eq!(d0.y, -0.5);
        let d2 = nodes[2].value(Variable::Displacement, 0).unwrap();
        assert_relative_eq!(d2.y, 2.0);

        // Free DOFs move by exactly dx[equation_id].
        for node in &nodes {
            for dof in node.dofs().iter().filter(|d| d.is_free()) {
                let eq = dof.equation_id().unwrap();
                let c = dof.variable().component.index();
                let before = if node.id() == 3 { 1.0 } else { 0.0 };
                let after = node.value(Variable::Displacement, 0).unwrap()[c];
                assert_relative_eq!(after - before, dx[eq], epsilon = 1e-15);
            }
        }
    }

    #[test]
    fn test_increment_length_mismatch() {
        let mut nodes = nodes();
        let dofs = DofSet::setup(&mut nodes);
        let err = dofs.apply_increment(&mut nodes, &[0.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                actual: 5
            }
        ));
    }
}
