//! Tessera ECS -- a small sparse-set entity store with deferred mutation.
//!
//! Entities carry typed *components* (one value each) and typed *arrays*
//! (one `Vec<T>` each, used for pixel data). Generational [`EntityId`]s let a
//! deferred mutation detect that its target was destroyed in the meantime.
//!
//! Systems implement [`System`](system::System): they read a `&World` and
//! describe their writes in a [`MutationBuffer`](command::MutationBuffer),
//! which the driver flushes once every system has scanned.
//!
//! # Quick Start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Label(&'static str);
//!
//! let mut world = World::new();
//! world.register_component::<Label>("label");
//!
//! let entity = world.spawn_with(Label("first")).unwrap();
//! assert_eq!(world.get_component::<Label>(entity), Some(&Label("first")));
//! ```
//!
//! [`EntityId`]: entity::EntityId

#![deny(unsafe_code)]

pub mod command;
pub mod component;
pub mod entity;
mod storage;
pub mod system;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A type was used that has not been registered for that storage kind.
    #[error("type '{name}' not registered. Registered: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    /// The entity has no array of the requested element type.
    #[error("entity {entity:?} has no '{name}' array")]
    MissingArray {
        entity: entity::EntityId,
        name: String,
    },

    /// `create_array` on an entity that already has one.
    #[error("entity {entity:?} already has a '{name}' array")]
    ArrayExists {
        entity: entity::EntityId,
        name: String,
    },

    /// An array write that does not fit inside the existing array.
    #[error("write of {len} at offset {offset} overruns '{name}' ({array_len} long) on {entity:?}")]
    RangeOutOfBounds {
        entity: entity::EntityId,
        name: String,
        offset: usize,
        len: usize,
        array_len: usize,
    },

    /// A mutation was recorded before any entity was selected.
    #[error("mutation recorded before any entity was selected")]
    NoSelection,
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::command::{ApplyReport, Mutation, MutationBuffer, OpKind};
    pub use crate::component::{
        Component, ComponentInfo, ComponentRegistry, ComponentTypeId, StorageKind,
    };
    pub use crate::entity::EntityId;
    pub use crate::system::System;
    pub use crate::world::World;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
