//! Model part: nodes, elements, conditions and step state.
//!
//! Entities reference nodes by index into [`ModelPart::nodes`]. User-facing
//! node ids are kept separately and only used for lookup and diagnostics.

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::process_info::ProcessInfo;
use crate::schema::ModelSchema;
use crate::types::{Component, Variable, VariableComponent, Vec3};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// A set of nodes and entities advanced together in time.
pub struct ModelPart {
    name: String,
    schema: Arc<ModelSchema>,
    pub(crate) nodes: Vec<Node>,
    node_index: HashMap<usize, usize>,
    pub(crate) elements: Vec<Box<dyn Entity>>,
    pub(crate) conditions: Vec<Box<dyn Entity>>,
    /// Time stepping state.
    pub process_info: ProcessInfo,
}

impl ModelPart {
    /// Create an empty model part over `schema`.
    pub fn new(name: impl Into<String>, schema: Arc<ModelSchema>) -> Self {
        Self {
            name: name.into(),
            schema,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            elements: Vec::new(),
            conditions: Vec::new(),
            process_info: ProcessInfo::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Historical steps stored per variable.
    pub fn buffer_size(&self) -> usize {
        self.schema.buffer_size()
    }

    /// Spatial dimension (2 or 3).
    pub fn dimension(&self) -> usize {
        self.schema.dimension()
    }

    /// Add a node, returning its index.
    pub fn add_node(&mut self, id: usize, coordinates: Vec3) -> Result<usize> {
        if self.node_index.contains_key(&id) {
            return Err(Error::Model(format!("node id {} already exists", id)));
        }
        let idx = self.nodes.len();
        self.nodes.push(Node::new(id, coordinates, &self.schema));
        self.node_index.insert(id, idx);
        Ok(idx)
    }

    /// Add the displacement DOFs of the model's dimension to a node.
    pub fn add_displacement_dofs(&mut self, node_idx: usize) -> Result<()> {
        let dimension = self.dimension();
        let node = self.node_mut(node_idx)?;
        for component in &Component::ALL[..dimension] {
            node.add_dof(Variable::Displacement.component(*component));
        }
        Ok(())
    }

    /// Mark a component of a node as prescribed.
    pub fn fix(&mut self, node_idx: usize, variable: VariableComponent) -> Result<()> {
        self.node_mut(node_idx)?.fix(variable);
        Ok(())
    }

    /// Add an element after validating its node indices.
    pub fn add_element(&mut self, element: Box<dyn Entity>) -> Result<usize> {
        self.validate_entity(element.as_ref())?;
        self.elements.push(element);
        Ok(self.elements.len() - 1)
    }

    /// Add a condition after validating its node indices.
    pub fn add_condition(&mut self, condition: Box<dyn Entity>) -> Result<usize> {
        self.validate_entity(condition.as_ref())?;
        self.conditions.push(condition);
        Ok(self.conditions.len() - 1)
    }

    fn validate_entity(&self, entity: &dyn Entity) -> Result<()> {
        for &node_idx in entity.node_indices() {
            if node_idx >= self.nodes.len() {
                return Err(Error::Model(format!(
                    "entity {} references node index {} out of bounds (model has {} nodes)",
                    entity.id(),
                    node_idx,
                    self.nodes.len()
                )));
            }
        }
        Ok(())
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn node(&self, idx: usize) -> Result<&Node> {
        self.nodes
            .get(idx)
            .ok_or_else(|| Error::Model(format!("node index {} out of bounds", idx)))
    }

    pub fn node_mut(&mut self, idx: usize) -> Result<&mut Node> {
        self.nodes
            .get_mut(idx)
            .ok_or_else(|| Error::Model(format!("node index {} out of bounds", idx)))
    }

    /// Index of the node with user id `id`.
    pub fn node_index(&self, id: usize) -> Option<usize> {
        self.node_index.get(&id).copied()
    }

    pub fn node_by_id(&self, id: usize) -> Option<&Node> {
        self.node_index(id).map(|idx| &self.nodes[idx])
    }

    pub fn elements(&self) -> &[Box<dyn Entity>] {
        &self.elements
    }

    pub fn conditions(&self) -> &[Box<dyn Entity>] {
        &self.conditions
    }

    /// Elements followed by conditions.
    pub fn entities(&self) -> impl Iterator<Item = &dyn Entity> {
        self.elements
            .iter()
            .chain(self.conditions.iter())
            .map(|e| e.as_ref())
    }

    /// Start a new time step of size `delta_time`.
    ///
    /// Shifts every nodal history back by one step (the new current values
    /// start as copies of the previous ones) and advances the process info.
    pub fn clone_time_step(&mut self, delta_time: f64) {
        self.nodes.par_iter_mut().for_each(Node::advance_history);
        self.process_info.time += delta_time;
        self.process_info.delta_time = delta_time;
        self.process_info.time_steps += 1;
    }
}
