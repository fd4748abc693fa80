//! Tick loop driving systems over a shared world.
//!
//! Each [`TickLoop::tick`]:
//!
//! 1. Runs every registered [`System`] in registration order, each receiving
//!    a shared reference to the [`World`], the shared [`MutationBuffer`] and
//!    the tick's `dt`.
//! 2. Flushes the mutation buffer into the world.
//! 3. Advances the tick counter and simulation time.
//!
//! Systems never see each other's writes within the tick they were recorded
//! in; everything lands together in step 2.
//!
//! # Example
//!
//! ```
//! use tessera_engine::tick::{TickConfig, TickLoop};
//! use tessera_ecs::prelude::*;
//!
//! let mut tick_loop = TickLoop::new(World::new(), TickConfig { fixed_dt: 1.0 / 60.0 });
//!
//! tick_loop.add_system("noop", |_world: &World, _mutations: &mut MutationBuffer, _dt: f64| {});
//! tick_loop.run_ticks(10);
//!
//! assert_eq!(tick_loop.tick_count(), 10);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tessera_ecs::prelude::*;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TickConfig {
    /// Seconds per [`tick`](TickLoop::tick). Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for TickConfig {
    /// 60 Hz.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing and apply results for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    /// Systems plus flush.
    pub total_time: Duration,
    pub flush_time: Duration,
    pub report: ApplyReport,
}

// ---------------------------------------------------------------------------
// TickLoop
// ---------------------------------------------------------------------------

struct RegisteredSystem {
    name: String,
    system: Box<dyn System>,
}

/// Owns the world, the systems and the mutation buffer they share.
pub struct TickLoop {
    world: World,
    mutations: MutationBuffer,
    systems: Vec<RegisteredSystem>,
    tick_counter: u64,
    fixed_dt: f64,
    /// Time advanced by [`tick_with`](Self::tick_with) on top of fixed ticks.
    variable_time: f64,
    last_diagnostics: TickDiagnostics,
}

impl TickLoop {
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(world: World, config: TickConfig) -> Self {
        assert!(
            config.fixed_dt > 0.0 && config.fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        Self {
            world,
            mutations: MutationBuffer::new(),
            systems: Vec::new(),
            tick_counter: 0,
            fixed_dt: config.fixed_dt,
            variable_time: 0.0,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    /// Register a system to run each tick, after those already registered.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, name: &str, system: impl System + 'static) {
        assert!(
            !self.systems.iter().any(|s| s.name == name),
            "duplicate system name: {name:?}"
        );
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            system: Box::new(system),
        });
    }

    /// Run one tick of `fixed_dt` seconds.
    pub fn tick(&mut self) -> ApplyReport {
        self.step(self.fixed_dt)
    }

    /// Run one tick of `dt` seconds instead of the fixed step. A non-positive
    /// or non-finite `dt` runs the systems with zero elapsed time.
    pub fn tick_with(&mut self, dt: f64) -> ApplyReport {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        self.variable_time += dt - self.fixed_dt;
        self.step(dt)
    }

    /// Run `count` fixed ticks. Returns the number of mutation groups that
    /// applied across all of them.
    pub fn run_ticks(&mut self, count: u64) -> usize {
        (0..count).map(|_| self.tick().groups_applied).sum()
    }

    fn step(&mut self, dt: f64) -> ApplyReport {
        let tick_start = Instant::now();
        let mut system_times = Vec::with_capacity(self.systems.len());

        for registered in &mut self.systems {
            let start = Instant::now();
            registered.system.run(&self.world, &mut self.mutations, dt);
            let elapsed = start.elapsed();
            trace!(system = %registered.name, ?elapsed, "system ran");
            system_times.push((registered.name.clone(), elapsed));
        }

        let flush_start = Instant::now();
        let report = self.mutations.flush(&mut self.world);
        let flush_time = flush_start.elapsed();

        self.tick_counter += 1;
        if report.groups_failed > 0 {
            debug!(
                tick = self.tick_counter,
                applied = report.groups_applied,
                failed = report.groups_failed,
                "tick flushed with failed groups"
            );
        }

        self.last_diagnostics = TickDiagnostics {
            system_times,
            total_time: tick_start.elapsed(),
            flush_time,
            report: report.clone(),
        };
        report
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulation time in seconds. Fixed ticks contribute
    /// `tick_count * fixed_dt` rather than a running sum.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt + self.variable_time
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access, for setup and tests. Systems go through the
    /// mutation buffer.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Names of registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
