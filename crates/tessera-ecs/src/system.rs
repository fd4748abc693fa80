//! The per-tick system interface.

use crate::command::MutationBuffer;
use crate::world::World;

/// Work that runs once per tick.
///
/// A system reads the world through a shared reference and records every
/// change it wants in the [`MutationBuffer`]. The driver flushes the buffer
/// after all systems have run, so a system never observes its own writes
/// within the same tick.
///
/// Closures of the form `FnMut(&World, &mut MutationBuffer, f64)` are systems.
pub trait System {
    /// Run one tick. `dt` is the elapsed simulation time in seconds.
    fn run(&mut self, world: &World, mutations: &mut MutationBuffer, dt: f64);
}

impl<F> System for F
where
    F: FnMut(&World, &mut MutationBuffer, f64),
{
    fn run(&mut self, world: &World, mutations: &mut MutationBuffer, dt: f64) {
        self(world, mutations, dt)
    }
}
