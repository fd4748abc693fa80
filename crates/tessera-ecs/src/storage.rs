//! Per-type sparse-set columns.
//!
//! Each registered type owns one [`Column`]: a dense `Vec` of values, a
//! parallel `Vec` of owning entities, and an entity → row map. Iteration walks
//! the dense rows in order, which is the world's enumeration order for that
//! type. Removal swaps the last row into the hole.

use std::any::Any;
use std::collections::HashMap;

use crate::entity::EntityId;

/// Type-erased view of a column, so the world can drop an entity's values
/// from every column on despawn without knowing their types.
pub(crate) trait ErasedColumn: Send + Sync {
    fn remove_entity(&mut self, entity: EntityId) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[derive(Debug)]
pub(crate) struct Column<T> {
    values: Vec<T>,
    owners: Vec<EntityId>,
    rows: HashMap<EntityId, usize>,
}

impl<T> Column<T> {
    pub(crate) fn new() -> Self {
        Self {
            values: Vec::new(),
            owners: Vec::new(),
            rows: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, entity: EntityId) -> Option<&T> {
        self.rows.get(&entity).map(|&row| &self.values[row])
    }

    pub(crate) fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.rows.get(&entity).map(|&row| &mut self.values[row])
    }

    pub(crate) fn contains(&self, entity: EntityId) -> bool {
        self.rows.contains_key(&entity)
    }

    /// Insert or overwrite. Returns the previous value, if any.
    pub(crate) fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        if let Some(&row) = self.rows.get(&entity) {
            return Some(std::mem::replace(&mut self.values[row], value));
        }
        self.rows.insert(entity, self.values.len());
        self.values.push(value);
        self.owners.push(entity);
        None
    }

    pub(crate) fn remove(&mut self, entity: EntityId) -> Option<T> {
        let row = self.rows.remove(&entity)?;
        let value = self.values.swap_remove(row);
        self.owners.swap_remove(row);
        if let Some(&moved) = self.owners.get(row) {
            self.rows.insert(moved, row);
        }
        Some(value)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.owners.iter().copied().zip(self.values.iter())
    }

    pub(crate) fn entities(&self) -> &[EntityId] {
        &self.owners
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }
}

impl<T: Send + Sync + 'static> ErasedColumn for Column<T> {
    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
