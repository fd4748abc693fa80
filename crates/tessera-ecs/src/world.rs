//! The [`World`] is the entity store: it owns the entity allocator, the
//! registry, and one column per registered component or array type.
//!
//! Systems only ever see `&World` while they scan. Structural changes go
//! through the [`MutationBuffer`](crate::command::MutationBuffer) and reach the
//! world after the scan has finished.

use std::any::type_name;

use crate::component::{Component, ComponentRegistry, ComponentTypeId, StorageKind};
use crate::entity::{EntityAllocator, EntityId};
use crate::storage::{Column, ErasedColumn};
use crate::EcsError;

/// The top-level entity store.
pub struct World {
    entities: EntityAllocator,
    registry: ComponentRegistry,
    /// Indexed by `ComponentTypeId`.
    columns: Vec<Box<dyn ErasedColumn>>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entity_count())
            .field("registered", &self.registry.registered_names())
            .finish()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: EntityAllocator::new(),
            registry: ComponentRegistry::new(),
            columns: Vec::new(),
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // -- registration -------------------------------------------------------

    /// Register `T` as a single-value component.
    pub fn register_component<T: Component>(&mut self, name: &str) -> ComponentTypeId {
        let id = self.registry.register::<T>(name, StorageKind::Component);
        self.ensure_column::<T>(id);
        id
    }

    /// Register `T` as the element type of a per-entity array.
    pub fn register_array<T: Component>(&mut self, name: &str) -> ComponentTypeId {
        let id = self.registry.register::<T>(name, StorageKind::Array);
        self.ensure_column::<Vec<T>>(id);
        id
    }

    fn ensure_column<V: Send + Sync + 'static>(&mut self, id: ComponentTypeId) {
        if id.index() == self.columns.len() {
            self.columns.push(Box::new(Column::<V>::new()));
        }
    }

    // -- entity lifecycle ---------------------------------------------------

    pub fn spawn(&mut self) -> EntityId {
        self.entities.allocate()
    }

    /// Spawn an entity carrying a single component.
    pub fn spawn_with<T: Component>(&mut self, value: T) -> Result<EntityId, EcsError> {
        let entity = self.spawn();
        if let Err(e) = self.insert_component(entity, value) {
            self.entities.deallocate(entity);
            return Err(e);
        }
        Ok(entity)
    }

    /// Destroy an entity and everything stored on it.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        if !self.entities.deallocate(entity) {
            return Err(EcsError::StaleEntity { entity });
        }
        for column in &mut self.columns {
            column.remove_entity(entity);
        }
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    // -- components ---------------------------------------------------------

    pub fn get_component<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        self.component_column::<T>()?.get(entity)
    }

    pub fn get_component_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        let id = self.registry.lookup::<T>(StorageKind::Component)?;
        self.column_mut::<T>(id).ok()?.get_mut(entity)
    }

    pub fn has_component<T: 'static>(&self, entity: EntityId) -> bool {
        self.component_column::<T>()
            .is_some_and(|column| column.contains(entity))
    }

    /// Add `value` to `entity`, overwriting any existing `T`.
    pub fn insert_component<T: Component>(
        &mut self,
        entity: EntityId,
        value: T,
    ) -> Result<(), EcsError> {
        self.check_alive(entity)?;
        let id = self.require::<T>(StorageKind::Component)?;
        self.column_mut::<T>(id)?.insert(entity, value);
        Ok(())
    }

    /// Remove `T` from `entity`, returning it if it was present.
    pub fn remove_component<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<Option<T>, EcsError> {
        self.check_alive(entity)?;
        let id = self.require::<T>(StorageKind::Component)?;
        Ok(self.column_mut::<T>(id)?.remove(entity))
    }

    /// Every `(entity, &T)` pair, in the column's enumeration order.
    ///
    /// An unregistered `T` yields nothing.
    pub fn query<T: 'static>(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.component_column::<T>()
            .into_iter()
            .flat_map(|column| column.iter())
    }

    /// Entities carrying `T`, in enumeration order.
    pub fn entities_with<T: 'static>(&self) -> Vec<EntityId> {
        self.component_column::<T>()
            .map(|column| column.entities().to_vec())
            .unwrap_or_default()
    }

    /// How many entities carry `T`.
    pub fn component_count<T: 'static>(&self) -> usize {
        self.component_column::<T>().map_or(0, Column::len)
    }

    // -- arrays -------------------------------------------------------------

    pub fn has_array<T: 'static>(&self, entity: EntityId) -> bool {
        self.array_column::<T>()
            .is_some_and(|column| column.contains(entity))
    }

    pub fn get_array<T: 'static>(&self, entity: EntityId) -> Option<&[T]> {
        self.array_column::<T>()?
            .get(entity)
            .map(Vec::as_slice)
    }

    /// Create a new array on `entity`. Fails if one already exists.
    pub fn create_array<T: Component>(
        &mut self,
        entity: EntityId,
        values: Vec<T>,
    ) -> Result<(), EcsError> {
        self.check_alive(entity)?;
        let id = self.require::<T>(StorageKind::Array)?;
        if self.has_array::<T>(entity) {
            return Err(EcsError::ArrayExists {
                entity,
                name: self.registry.name_of::<T>(StorageKind::Array),
            });
        }
        self.column_mut::<Vec<T>>(id)?.insert(entity, values);
        Ok(())
    }

    /// Resize the existing array on `entity`, filling new slots with
    /// `T::default()`.
    pub fn resize_array<T: Component + Default>(
        &mut self,
        entity: EntityId,
        len: usize,
    ) -> Result<(), EcsError> {
        self.existing_array_mut::<T>(entity)?
            .resize(len, T::default());
        Ok(())
    }

    /// Overwrite `values.len()` elements starting at `offset`.
    pub fn write_array<T: Component>(
        &mut self,
        entity: EntityId,
        offset: usize,
        values: &[T],
    ) -> Result<(), EcsError> {
        let array_len = self.existing_array_mut::<T>(entity)?.len();
        let end = match offset.checked_add(values.len()) {
            Some(end) if end <= array_len => end,
            _ => {
                return Err(EcsError::RangeOutOfBounds {
                    entity,
                    name: self.registry.name_of::<T>(StorageKind::Array),
                    offset,
                    len: values.len(),
                    array_len,
                })
            }
        };
        self.existing_array_mut::<T>(entity)?[offset..end].clone_from_slice(values);
        Ok(())
    }

    /// Create the array if missing, otherwise resize it to `values.len()`
    /// and overwrite every element.
    pub fn create_or_overwrite_array<T: Component>(
        &mut self,
        entity: EntityId,
        values: &[T],
    ) -> Result<(), EcsError> {
        self.check_alive(entity)?;
        let id = self.require::<T>(StorageKind::Array)?;
        let column = self.column_mut::<Vec<T>>(id)?;
        match column.get_mut(entity) {
            Some(array) => {
                array.clear();
                array.extend_from_slice(values);
            }
            None => {
                column.insert(entity, values.to_vec());
            }
        }
        Ok(())
    }

    // -- internals ----------------------------------------------------------

    fn check_alive(&self, entity: EntityId) -> Result<(), EcsError> {
        if self.entities.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::StaleEntity { entity })
        }
    }

    /// Id of `T` for `kind`, or an error listing what is registered.
    fn require<T: 'static>(&self, kind: StorageKind) -> Result<ComponentTypeId, EcsError> {
        self.registry
            .lookup::<T>(kind)
            .ok_or_else(|| EcsError::UnknownComponent {
                name: match kind {
                    StorageKind::Component => type_name::<T>().to_owned(),
                    StorageKind::Array => format!("[{}]", type_name::<T>()),
                },
                registered: self.registry.registered_names().join(", "),
            })
    }

    fn existing_array_mut<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> Result<&mut Vec<T>, EcsError> {
        self.check_alive(entity)?;
        let id = self.require::<T>(StorageKind::Array)?;
        if !self.has_array::<T>(entity) {
            return Err(EcsError::MissingArray {
                entity,
                name: self.registry.name_of::<T>(StorageKind::Array),
            });
        }
        self.column_mut::<Vec<T>>(id)?
            .get_mut(entity)
            .ok_or(EcsError::StaleEntity { entity })
    }

    fn column<V: 'static>(&self, id: ComponentTypeId) -> Option<&Column<V>> {
        self.columns.get(id.index())?.as_any().downcast_ref()
    }

    fn column_mut<V: 'static>(&mut self, id: ComponentTypeId) -> Result<&mut Column<V>, EcsError> {
        self.columns
            .get_mut(id.index())
            .and_then(|column| column.as_any_mut().downcast_mut())
            .ok_or_else(|| EcsError::UnknownComponent {
                name: type_name::<V>().to_owned(),
                registered: String::new(),
            })
    }

    fn component_column<T: 'static>(&self) -> Option<&Column<T>> {
        self.column(self.registry.lookup::<T>(StorageKind::Component)?)
    }

    fn array_column<T: 'static>(&self) -> Option<&Column<Vec<T>>> {
        self.column(self.registry.lookup::<T>(StorageKind::Array)?)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
