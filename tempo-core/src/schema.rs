//! Model schema: registered nodal variables, history length and dimension.
//!
//! A schema is built once before stepping and shared read-only by the model
//! part. Nodes allocate historical storage for every registered variable.

use crate::error::{Error, Result};
use crate::types::Variable;
use std::num::NonZeroU32;

/// Identity key of a registered variable. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableKey(NonZeroU32);

impl VariableKey {
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Registered variables and storage layout for a model part.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    dimension: usize,
    buffer_size: usize,
    keys: [Option<VariableKey>; Variable::COUNT],
    next_key: u32,
}

impl ModelSchema {
    /// Create an empty schema.
    ///
    /// # Errors
    ///
    /// `dimension` must be 2 or 3 and `buffer_size` at least 1.
    pub fn new(dimension: usize, buffer_size: usize) -> Result<Self> {
        if dimension != 2 && dimension != 3 {
            return Err(Error::Model(format!(
                "dimension must be 2 or 3, got {}",
                dimension
            )));
        }
        if buffer_size == 0 {
            return Err(Error::InsufficientBufferSize {
                required: 1,
                actual: 0,
            });
        }
        Ok(Self {
            dimension,
            buffer_size,
            keys: [None; Variable::COUNT],
            next_key: 1,
        })
    }

    /// Schema with every variable a structural dynamics scheme reads.
    pub fn structural(dimension: usize, buffer_size: usize) -> Result<Self> {
        let mut schema = Self::new(dimension, buffer_size)?;
        for variable in Variable::ALL {
            schema.register(variable)?;
        }
        Ok(schema)
    }

    /// Register a variable, returning its key. Registering twice is a no-op.
    pub fn register(&mut self, variable: Variable) -> Result<VariableKey> {
        if let Some(key) = self.keys[variable.index()] {
            return Ok(key);
        }
        let key = NonZeroU32::new(self.next_key)
            .map(VariableKey)
            .ok_or_else(|| Error::Model(format!("no key left for {}", variable.name())))?;
        self.next_key = self.next_key.wrapping_add(1);
        self.keys[variable.index()] = Some(key);
        Ok(key)
    }

    /// Key of a variable, `None` if it was never registered.
    pub fn key(&self, variable: Variable) -> Option<VariableKey> {
        self.keys[variable.index()]
    }

    /// Key of a variable or [`Error::UnregisteredVariable`].
    pub fn require(&self, variable: Variable) -> Result<VariableKey> {
        self.key(variable)
            .ok_or(Error::UnregisteredVariable(variable.name()))
    }

    pub fn is_registered(&self, variable: Variable) -> bool {
        self.key(variable).is_some()
    }

    /// Registered variables in storage order.
    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        Variable::ALL
            .into_iter()
            .filter(move |v| self.is_registered(*v))
    }

    /// Number of historical steps stored per variable (current included).
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Spatial dimension of the model (2 or 3).
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_nonzero_and_stable() {
        let mut schema = ModelSchema::new(3, 2).unwrap();
        let d = schema.register(Variable::Displacement).unwrap();
        let v = schema.register(Variable::Velocity).unwrap();
        assert_ne!(d, v);
        assert!(d.get() > 0 && v.get() > 0);
        assert_eq!(schema.register(Variable::Displacement).unwrap(), d);
        assert!(schema.key(Variable::Acceleration).is_none());
    }

    #[test]
    fn test_exhausted_keys_are_an_error() {
        let mut schema = ModelSchema::new(3, 2).unwrap();
        schema.next_key = u32::MAX;
        let last = schema.register(Variable::Displacement).unwrap();
        assert_eq!(last.get(), u32::MAX);
        let err = schema.register(Variable::Velocity).unwrap_err();
        assert!(matches!(err, Error::Model(_)));
        assert!(!schema.is_registered(Variable::Velocity));
    }

    #[test]
    fn test_require_unregistered() {
        let schema = ModelSchema::new(2, 2).unwrap();
        let err = schema.require(Variable::Acceleration).unwrap_err();
        assert!(matches!(err, Error::UnregisteredVariable("ACCELERATION")));
    }

    #[test]
    fn test_invalid_layout() {
        assert!(ModelSchema::new(1, 2).is_err());
        assert!(ModelSchema::new(3, 0).is_err());
    }

    #[test]
    fn test_structural_registers_everything() {
        let schema = ModelSchema::structural(3, 3).unwrap();
        assert_eq!(schema.variables().count(), Variable::COUNT);
        assert_eq!(schema.buffer_size(), 3);
    }
}
