//! Mesh node with buffered nodal state, DOFs and fixity flags.

use crate::dof::Dof;
use crate::error::{Error, Result};
use crate::history::HistoryBuffer;
use crate::schema::ModelSchema;
use crate::types::{Variable, VariableComponent, Vec3};

/// A node of a model part.
///
/// Historical storage is allocated for every variable registered in the
/// schema at construction. Fixity is tracked per variable component; for a
/// component that is also a DOF the DOF's free/fixed flag mirrors it.
#[derive(Debug, Clone)]
pub struct Node {
    id: usize,
    coordinates: Vec3,
    histories: [Option<HistoryBuffer>; Variable::COUNT],
    dofs: Vec<Dof>,
    fixity: u16,
}

impl Node {
    /// Create a node with storage for every variable in `schema`.
    pub fn new(id: usize, coordinates: Vec3, schema: &ModelSchema) -> Self {
        let mut histories: [Option<HistoryBuffer>; Variable::COUNT] = Default::default();
        for variable in schema.variables() {
            histories[variable.index()] = Some(HistoryBuffer::new(schema.buffer_size()));
        }
        Self {
            id,
            coordinates,
            histories,
            dofs: Vec::new(),
            fixity: 0,
        }
    }

    /// User-facing node id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Reference coordinates.
    pub fn coordinates(&self) -> &Vec3 {
        &self.coordinates
    }

    /// Whether the node carries historical storage for `variable`.
    pub fn has(&self, variable: Variable) -> bool {
        self.histories[variable.index()].is_some()
    }

    /// Allocate storage for a variable the schema did not register up front.
    pub fn allocate(&mut self, variable: Variable, buffer_size: usize) {
        self.histories[variable.index()].get_or_insert_with(|| HistoryBuffer::new(buffer_size));
    }

    /// Drop the storage of a variable.
    pub fn deallocate(&mut self, variable: Variable) {
        self.histories[variable.index()] = None;
    }

    pub fn history(&self, variable: Variable) -> Option<&HistoryBuffer> {
        self.histories[variable.index()].as_ref()
    }

    pub fn history_mut(&mut self, variable: Variable) -> Option<&mut HistoryBuffer> {
        self.histories[variable.index()].as_mut()
    }

    fn not_allocated(&self, variable: Variable) -> Error {
        Error::VariableNotAllocated {
            variable: variable.name(),
            node: self.id,
        }
    }

    fn out_of_buffer(&self, variable: Variable, step: usize) -> Error {
        Error::Model(format!(
            "{} step {} is beyond the buffer of node {}",
            variable, step, self.id
        ))
    }

    /// Value of `variable`, `step` time steps back.
    pub fn value(&self, variable: Variable, step: usize) -> Result<Vec3> {
        let history = self
            .history(variable)
            .ok_or_else(|| self.not_allocated(variable))?;
        history
            .get(step)
            .copied()
            .ok_or_else(|| self.out_of_buffer(variable, step))
    }

    /// Mutable value of `variable`, `step` time steps back.
    pub fn value_mut(&mut self, variable: Variable, step: usize) -> Result<&mut Vec3> {
        let id = self.id;
        match self.histories[variable.index()].as_mut() {
            None => Err(Error::VariableNotAllocated {
                variable: variable.name(),
                node: id,
            }),
            Some(history) => history.get_mut(step).ok_or_else(|| {
                Error::Model(format!(
                    "{} step {} is beyond the buffer of node {}",
                    variable, step, id
                ))
            }),
        }
    }

    pub fn set_value(&mut self, variable: Variable, step: usize, value: Vec3) -> Result<()> {
        *self.value_mut(variable, step)? = value;
        Ok(())
    }

    /// Register a DOF for `variable`. Adding an existing DOF is a no-op.
    pub fn add_dof(&mut self, variable: VariableComponent) -> &mut Dof {
        let idx = match self.dofs.iter().position(|d| d.variable() == variable) {
            Some(idx) => idx,
            None => {
                let mut dof = Dof::new(variable);
                dof.set_fixed(self.fixity & variable.bit() != 0);
                self.dofs.push(dof);
                self.dofs.len() - 1
            }
        };
        &mut self.dofs[idx]
    }

    pub fn has_dof_for(&self, variable: VariableComponent) -> bool {
        self.dof(variable).is_some()
    }

    pub fn dof(&self, variable: VariableComponent) -> Option<&Dof> {
        self.dofs.iter().find(|d| d.variable() == variable)
    }

    pub fn dofs(&self) -> &[Dof] {
        &self.dofs
    }

    pub(crate) fn dofs_mut(&mut self) -> &mut [Dof] {
        &mut self.dofs
    }

    /// Mark a component as prescribed.
    pub fn fix(&mut self, variable: VariableComponent) {
        self.set_fixity(variable, true);
    }

    /// Release a prescribed component.
    pub fn free(&mut self, variable: VariableComponent) {
        self.set_fixity(variable, false);
    }

    fn set_fixity(&mut self, variable: VariableComponent, fixed: bool) {
        if fixed {
            self.fixity |= variable.bit();
        } else {
            self.fixity &= !variable.bit();
        }
        if let Some(dof) = self.dofs.iter_mut().find(|d| d.variable() == variable) {
            dof.set_fixed(fixed);
        }
    }

    pub fn is_fixed(&self, variable: VariableComponent) -> bool {
        self.fixity & variable.bit() != 0
    }

    /// Add `dx[equation_id]` to the current value of every free DOF.
    pub(crate) fn apply_increment(&mut self, dx: &[f64]) -> Result<()> {
        let Self {
            id,
            histories,
            dofs,
            ..
        } = self;
        for dof in dofs.iter().filter(|d| d.is_free()) {
            let variable = dof.variable();
            let eq = dof.equation_id().ok_or_else(|| {
                Error::Model(format!(
                    "{} on node {} has no equation id (set up the DOF set first)",
                    variable, id
                ))
            })?;
            let delta = dx.get(eq).copied().ok_or(Error::DimensionMismatch {
                expected: eq + 1,
                actual: dx.len(),
            })?;
            let history = histories[variable.variable.index()].as_mut().ok_or(
                Error::VariableNotAllocated {
                    variable: variable.variable.name(),
                    node: *id,
                },
            )?;
            history.current_mut()[variable.component.index()] += delta;
        }
        Ok(())
    }

    /// Start a new time step for every buffered variable.
    pub fn advance_history(&mut self) {
        self.histories
            .iter_mut()
            .flatten()
            .for_each(HistoryBuffer::advance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        let schema = ModelSchema::structural(3, 3).unwrap();
        Node::new(7, Vec3::new(1.0, 2.0, 3.0), &schema)
    }

    #[test]
    fn test_storage_follows_schema() {
        let mut schema = ModelSchema::new(3, 2).unwrap();
        schema.register(Variable::Displacement).unwrap();
        let n = Node::new(1, Vec3::zeros(), &schema);
        assert!(n.has(Variable::Displacement));
        assert!(!n.has(Variable::Velocity));
        let err = n.value(Variable::Velocity, 0).unwrap_err();
        assert_eq!(err.to_string(), "VELOCITY variable is not allocated for node 1");
    }

    #[test]
    fn test_fix_before_and_after_dof() {
        let mut n = node();
        n.fix(VariableComponent::DISPLACEMENT_X);
        n.add_dof(VariableComponent::DISPLACEMENT_X);
        n.add_dof(VariableComponent::DISPLACEMENT_Y);
        assert!(n.dof(VariableComponent::DISPLACEMENT_X).unwrap().is_fixed());
        assert!(n.dof(VariableComponent::DISPLACEMENT_Y).unwrap().is_free());

        n.fix(VariableComponent::DISPLACEMENT_Y);
        assert!(n.dof(VariableComponent::DISPLACEMENT_Y).unwrap().is_fixed());
        n.free(VariableComponent::DISPLACEMENT_X);
        assert!(n.dof(VariableComponent::DISPLACEMENT_X).unwrap().is_free());
    }

    #[test]
    fn test_fixity_without_dof() {
        let mut n = node();
        n.fix(VariableComponent::ACCELERATION_Y);
        assert!(n.is_fixed(VariableComponent::ACCELERATION_Y));
        assert!(!n.is_fixed(VariableComponent::ACCELERATION_X));
        assert!(!n.has_dof_for(VariableComponent::ACCELERATION_Y));
    }

    #[test]
    fn test_advance_history() {
        let mut n = node();
        n.set_value(Variable::Velocity, 0, Vec3::new(1.0, 0.0, 0.0))
            .unwrap();
        n.advance_history();
        assert_eq!(n.value(Variable::Velocity, 1).unwrap().x, 1.0);
        assert_eq!(n.value(Variable::Velocity, 0).unwrap().x, 1.0);
        assert!(n.value(Variable::Velocity, 3).is_err());
    }
}
