//! Tessera Engine -- the tick loop that drives `tessera-ecs` systems.
//!
//! A [`TickLoop`](tick::TickLoop) owns the world and one shared
//! [`MutationBuffer`](tessera_ecs::command::MutationBuffer). Every tick it
//! runs the registered systems in order and then flushes the buffer, so all
//! writes a tick produces land together after the scan.
//!
//! # Quick Start
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let mut world = World::new();
//! world.register_component::<u32>("score");
//! let entity = world.spawn_with(0u32).unwrap();
//!
//! let mut tick_loop = TickLoop::new(world, TickConfig::default());
//! tick_loop.add_system("score", |world: &World, mutations: &mut MutationBuffer, _dt: f64| {
//!     for (entity, score) in world.query::<u32>() {
//!         mutations.select(entity).set_or_add_component(score + 1);
//!     }
//! });
//!
//! tick_loop.run_ticks(100);
//! assert_eq!(tick_loop.world().get_component::<u32>(entity), Some(&100));
//! ```

#![deny(unsafe_code)]

pub mod tick;

/// Re-export the ECS crate for convenience.
pub use tessera_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tessera_ecs::prelude::*;

    pub use crate::tick::{TickConfig, TickDiagnostics, TickLoop};
}
