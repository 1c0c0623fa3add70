//! Fixed-length ring buffer of nodal vector values.
//!
//! Step 0 is the current value, step k is the value k time steps back.
//! [`HistoryBuffer::advance`] rotates the ring so the old current value becomes
//! step 1 and the new current slot starts as a copy of it.

use crate::types::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    slots: Vec<Vec3>,
    head: usize,
}

impl HistoryBuffer {
    /// Create a zero-filled buffer with `len` steps.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![Vec3::zeros(); len.max(1)],
            head: 0,
        }
    }

    /// Number of stored steps, current included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, step: usize) -> usize {
        (self.head + step) % self.slots.len()
    }

    /// Value `step` steps back, `None` if beyond the buffer.
    pub fn get(&self, step: usize) -> Option<&Vec3> {
        if step < self.slots.len() {
            Some(&self.slots[self.slot(step)])
        } else {
            None
        }
    }

    /// Mutable value `step` steps back, `None` if beyond the buffer.
    pub fn get_mut(&mut self, step: usize) -> Option<&mut Vec3> {
        if step < self.slots.len() {
            let idx = self.slot(step);
            Some(&mut self.slots[idx])
        } else {
            None
        }
    }

    /// Current value (step 0).
    pub fn current(&self) -> &Vec3 {
        &self.slots[self.head]
    }

    pub fn current_mut(&mut self) -> &mut Vec3 {
        &mut self.slots[self.head]
    }

    /// Start a new step: shift history back by one and copy the old current
    /// value into the new current slot. The oldest value is discarded.
    pub fn advance(&mut self) {
        let n = self.slots.len();
        let current = self.slots[self.head];
        self.head = (self.head + n - 1) % n;
        self.slots[self.head] = current;
    }
}
