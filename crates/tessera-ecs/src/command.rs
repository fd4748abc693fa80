//! Deferred mutation buffer.
//!
//! Systems scan the [`World`] through a shared reference and describe what
//! should change by appending [`Mutation`]s to a [`MutationBuffer`]. Nothing
//! touches the store until [`MutationBuffer::flush`], which replays the
//! recorded mutations in insertion order once the scan is over. Structural
//! changes (adding a component, growing an array) therefore never interleave
//! with an iteration that is still reading the store.
//!
//! Mutations are grouped: [`select`](MutationBuffer::select) opens a group
//! targeting one entity and every following op applies to it until the next
//! select. Groups are applied best-effort: a failing op is logged, the rest of
//! its group is skipped, and later groups still run.
//!
//! # Example
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Size(u32);
//!
//! let mut world = World::new();
//! world.register_component::<Size>("size");
//! world.register_array::<u8>("bytes");
//! let entity = world.spawn();
//!
//! let mut buffer = MutationBuffer::new();
//! buffer
//!     .select(entity)
//!     .set_or_add_component(Size(3))
//!     .create_or_resize_array::<u8>(vec![1, 2, 3]);
//!
//! let report = buffer.flush(&mut world);
//! assert_eq!(report.groups_applied, 1);
//! assert_eq!(world.get_component::<Size>(entity), Some(&Size(3)));
//! assert_eq!(world.get_array::<u8>(entity), Some(&[1u8, 2, 3][..]));
//! assert!(buffer.is_empty());
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::component::Component;
use crate::entity::EntityId;
use crate::world::World;
use crate::EcsError;

type ApplyFn = Box<dyn FnOnce(&mut World, EntityId) -> Result<(), EcsError> + Send>;

// ---------------------------------------------------------------------------
// OpKind
// ---------------------------------------------------------------------------

/// Which store primitive an op will call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Insert or overwrite a component.
    SetComponent,
    /// Create an array that must not exist yet.
    CreateArray,
    /// Resize an existing array.
    ResizeArray,
    /// Overwrite a range of an existing array.
    WriteArrayRange,
    /// Create the array, or resize it and overwrite all of it.
    CreateOrResizeArray,
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

/// One recorded step of a [`MutationBuffer`].
pub enum Mutation {
    /// Start a group targeting this entity.
    Select(EntityId),
    /// A typed store operation on the currently selected entity.
    Op {
        kind: OpKind,
        type_name: &'static str,
        apply: ApplyFn,
    },
}

impl Mutation {
    /// The op kind, or `None` for a select.
    pub fn op_kind(&self) -> Option<OpKind> {
        match self {
            Mutation::Select(_) => None,
            Mutation::Op { kind, .. } => Some(*kind),
        }
    }
}

impl fmt::Debug for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Select(entity) => f.debug_tuple("Select").field(entity).finish(),
            Mutation::Op {
                kind, type_name, ..
            } => f
                .debug_struct("Op")
                .field("kind", kind)
                .field("type_name", type_name)
                .finish_non_exhaustive(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApplyReport
// ---------------------------------------------------------------------------

/// Summary of one [`MutationBuffer::flush`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Groups whose every op succeeded.
    pub groups_applied: usize,
    /// Groups that hit an error (including ops recorded before any select).
    pub groups_failed: usize,
    /// Ops that ran successfully.
    pub ops_applied: usize,
    /// Ops skipped because an earlier op in their group failed.
    pub ops_skipped: usize,
}

// ---------------------------------------------------------------------------
// MutationBuffer
// ---------------------------------------------------------------------------

/// Ordered list of pending mutations, applied in one pass by
/// [`flush`](Self::flush).
#[derive(Debug, Default)]
pub struct MutationBuffer {
    mutations: Vec<Mutation>,
    groups: usize,
    last_report: ApplyReport,
}

impl MutationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new group targeting `entity`.
    pub fn select(&mut self, entity: EntityId) -> &mut Self {
        self.groups += 1;
        self.mutations.push(Mutation::Select(entity));
        self
    }

    /// Upsert `value` on the selected entity.
    pub fn set_or_add_component<T: Component>(&mut self, value: T) -> &mut Self {
        self.push::<T>(OpKind::SetComponent, move |world, entity| {
            world.insert_component(entity, value)
        })
    }

    /// Create an array initialised to `values`. Fails at flush if the entity
    /// already has one.
    pub fn create_array<T: Component>(&mut self, values: Vec<T>) -> &mut Self {
        self.push::<T>(OpKind::CreateArray, move |world, entity| {
            world.create_array(entity, values)
        })
    }

    /// Resize the selected entity's existing array to `len`.
    pub fn resize_array<T: Component + Default>(&mut self, len: usize) -> &mut Self {
        self.push::<T>(OpKind::ResizeArray, move |world, entity| {
            world.resize_array::<T>(entity, len)
        })
    }

    /// Overwrite elements `offset..offset + values.len()` of the existing array.
    pub fn write_array_range<T: Component>(
        &mut self,
        offset: usize,
        values: impl Into<Arc<[T]>>,
    ) -> &mut Self {
        let values = values.into();
        self.push::<T>(OpKind::WriteArrayRange, move |world, entity| {
            world.write_array(entity, offset, &values)
        })
    }

    /// Create the array sized to `values`, or resize the existing one to
    /// `values.len()` and overwrite its whole contents.
    ///
    /// Takes anything convertible to `Arc<[T]>` so a cached buffer shared by
    /// many entities is only copied when it is written into each store.
    pub fn create_or_resize_array<T: Component>(
        &mut self,
        values: impl Into<Arc<[T]>>,
    ) -> &mut Self {
        let values = values.into();
        self.push::<T>(OpKind::CreateOrResizeArray, move |world, entity| {
            world.create_or_overwrite_array(entity, &values)
        })
    }

    /// All recorded mutations in insertion order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Number of recorded mutations (selects included).
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Number of groups opened since the last flush.
    pub fn group_count(&self) -> usize {
        self.groups
    }

    /// Report from the most recent flush.
    pub fn last_report(&self) -> &ApplyReport {
        &self.last_report
    }

    /// Drop every pending mutation without applying it.
    pub fn clear(&mut self) {
        self.mutations.clear();
        self.groups = 0;
    }

    /// Apply every pending mutation to `world` in insertion order, then clear
    /// the buffer. Calling this on an empty buffer is a no-op.
    pub fn flush(&mut self, world: &mut World) -> ApplyReport {
        let mut report = ApplyReport::default();
        if self.mutations.is_empty() {
            self.last_report = report.clone();
            return report;
        }

        let mutations = std::mem::take(&mut self.mutations);
        self.groups = 0;

        // `None` until the first select; `Some((entity, failed))` afterwards.
        let mut group: Option<(EntityId, bool)> = None;
        let mut orphan_failed = false;

        for mutation in mutations {
            match mutation {
                Mutation::Select(entity) => {
                    close_group(group.take(), &mut report);
                    group = Some((entity, false));
                }
                Mutation::Op {
                    kind,
                    type_name,
                    apply,
                } => match group.as_mut() {
                    None => {
                        if !orphan_failed {
                            orphan_failed = true;
                            report.groups_failed += 1;
                        }
                        warn!(
                            op = ?kind,
                            component = type_name,
                            error = %EcsError::NoSelection,
                            "mutation group failed"
                        );
                        report.ops_skipped += 1;
                    }
                    Some((_, true)) => report.ops_skipped += 1,
                    Some((entity, failed)) => match apply(world, *entity) {
                        Ok(()) => report.ops_applied += 1,
                        Err(e) => {
                            *failed = true;
                            warn!(
                                entity = %entity,
                                op = ?kind,
                                component = type_name,
                                error = %e,
                                "mutation group failed, skipping its remaining ops"
                            );
                        }
                    },
                },
            }
        }
        close_group(group, &mut report);

        self.last_report = report.clone();
        report
    }

    fn push<T: 'static>(
        &mut self,
        kind: OpKind,
        apply: impl FnOnce(&mut World, EntityId) -> Result<(), EcsError> + Send + 'static,
    ) -> &mut Self {
        self.mutations.push(Mutation::Op {
            kind,
            type_name: type_name::<T>(),
            apply: Box::new(apply),
        });
        self
    }
}

fn close_group(group: Option<(EntityId, bool)>, report: &mut ApplyReport) {
    match group {
        Some((_, false)) => report.groups_applied += 1,
        Some((_, true)) => report.groups_failed += 1,
        None => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
