//! Component and array type registration.
//!
//! Every type stored in a [`World`](crate::world::World) is registered once in
//! the [`ComponentRegistry`] under a human-readable name. A type may be
//! registered as a plain *component* (one value per entity) or as an *array*
//! element (one growable `Vec<T>` per entity, e.g. a pixel buffer). The two
//! storage kinds are tracked separately, so the same Rust type can be both.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// Anything that can live in world storage.
pub trait Component: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Component for T {}

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque identifier for a registered storage type. Doubles as the index of
/// the type's column inside the world.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

/// How a registered type is stored per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// A single value.
    Component,
    /// A variable-length sequence of values.
    Array,
}

/// Metadata about a registered type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentTypeId,
    /// Name supplied at registration; used in logs and errors.
    pub name: String,
    pub kind: StorageKind,
    pub type_id: TypeId,
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Maps Rust types to [`ComponentTypeId`]s.
///
/// Registering the same type with the same [`StorageKind`] twice returns the
/// existing id and ignores the second name.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<(TypeId, StorageKind), ComponentTypeId>,
    by_name: HashMap<String, ComponentTypeId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name` with the given storage kind.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already taken by a different type or kind.
    pub fn register<T: Component>(&mut self, name: &str, kind: StorageKind) -> ComponentTypeId {
        let key = (TypeId::of::<T>(), kind);
        if let Some(&existing) = self.by_type.get(&key) {
            return existing;
        }
        assert!(
            !self.by_name.contains_key(name),
            "storage name '{name}' is already registered for a different type"
        );

        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo {
            id,
            name: name.to_owned(),
            kind,
            type_id: key.0,
        });
        self.by_type.insert(key, id);
        self.by_name.insert(name.to_owned(), id);
        id
    }

    pub fn lookup<T: 'static>(&self, kind: StorageKind) -> Option<ComponentTypeId> {
        self.by_type.get(&(TypeId::of::<T>(), kind)).copied()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn get_info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Registered name of `T`, or its Rust type name when unregistered.
    pub fn name_of<T: 'static>(&self, kind: StorageKind) -> String {
        self.lookup::<T>(kind)
            .and_then(|id| self.get_info(id))
            .map(|info| info.name.clone())
            .unwrap_or_else(|| std::any::type_name::<T>().to_owned())
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Names of all registered types, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
