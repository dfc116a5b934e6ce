//! Time-stepping strategies
//!
//! A [`Looper`] decides how integration ticks reach a
//! [`SpringSystem`](crate::system::SpringSystem):
//!
//! - [`AnimationLooper`]: cooperative, asks the host to schedule a frame
//!   and the host calls `tick(now)` when it fires
//! - [`SimulationLooper`]: blocking, resolves the whole animation on the
//!   calling thread with a fixed timestep
//! - [`SteppingSimulationLooper`]: external, the host clocks every tick
//!   explicitly, for tests and offline rendering
//!
//! The system owns its looper and takes it out of its slot while the
//! looper runs, so a tick triggered from inside a looper can never
//! re-enter it.

use crate::system::SpringSystem;

/// One 60 fps frame, in milliseconds.
pub const DEFAULT_TIMESTEP_MILLIS: f64 = 16.667;

/// Scheduling strategy driving a [`SpringSystem`]'s integration ticks.
pub trait Looper: Send {
    /// The system has active springs; drive or schedule the next tick.
    fn run(&mut self, system: &mut SpringSystem);

    /// Advance the system by one externally clocked tick of
    /// `delta_millis`. Only [`SteppingSimulationLooper`] supports this;
    /// calling it on any other looper is a programmer error.
    fn step(&mut self, _system: &mut SpringSystem, _delta_millis: f64) {
        panic!("this looper is not externally stepped; install a SteppingSimulationLooper");
    }
}

/// Cooperative looper bound to a host frame scheduler.
///
/// `run` only requests a frame from the host; the host is responsible for
/// calling [`SpringSystem::tick`] with its clock when the frame fires,
/// and the system requests the next frame itself while springs remain
/// active. Never blocks.
pub struct AnimationLooper {
    request_frame: Box<dyn FnMut() + Send>,
}

impl AnimationLooper {
    pub fn new(request_frame: impl FnMut() + Send + 'static) -> Self {
        Self {
            request_frame: Box::new(request_frame),
        }
    }
}

impl Looper for AnimationLooper {
    fn run(&mut self, _system: &mut SpringSystem) {
        (self.request_frame)();
    }
}

/// Blocking looper that resolves the whole animation synchronously.
///
/// `run` ticks the system with a fixed timestep until it reports idle,
/// without consulting a wall clock. Activating a spring on an idle system
/// therefore blocks the caller until every spring has settled; do not use
/// it on a thread that must stay responsive.
pub struct SimulationLooper {
    timestep_millis: f64,
    time_millis: f64,
    running: bool,
}

impl SimulationLooper {
    pub fn new() -> Self {
        Self::with_timestep(DEFAULT_TIMESTEP_MILLIS)
    }

    pub fn with_timestep(timestep_millis: f64) -> Self {
        Self {
            timestep_millis,
            time_millis: 0.0,
            running: false,
        }
    }
}

impl Default for SimulationLooper {
    fn default() -> Self {
        Self::new()
    }
}

impl Looper for SimulationLooper {
    fn run(&mut self, system: &mut SpringSystem) {
        if self.running {
            return;
        }
        self.running = true;
        while !system.is_idle() {
            self.time_millis += self.timestep_millis;
            system.tick(self.time_millis);
        }
        self.running = false;
    }
}

/// Externally clocked looper for deterministic advancement.
///
/// `run` is a no-op: nothing happens until the host calls
/// [`SpringSystem::step`], which lands here and ticks exactly once. A
/// fixed sequence of steps therefore reproduces the same trajectory
/// regardless of wall-clock timing.
pub struct SteppingSimulationLooper {
    time_millis: f64,
}

impl SteppingSimulationLooper {
    pub fn new() -> Self {
        Self { time_millis: 0.0 }
    }
}

impl Default for SteppingSimulationLooper {
    fn default() -> Self {
        Self::new()
    }
}

impl Looper for SteppingSimulationLooper {
    fn run(&mut self, _system: &mut SpringSystem) {
        // The host clocks the system through `step`.
    }

    fn step(&mut self, system: &mut SpringSystem, delta_millis: f64) {
        self.time_millis += delta_millis;
        system.tick(self.time_millis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpringConfig;

    #[test]
    fn test_simulation_looper_blocks_until_rest() {
        let mut system = SpringSystem::with_looper(Box::new(SimulationLooper::new()));
        let id = system.create_spring_with_config(SpringConfig::new(194.0, 25.0));

        // Activation drives the whole animation before returning.
        system.spring(id).unwrap().set_end_value(100.0);

        assert!(system.is_idle());
        assert_eq!(system.get_spring(id).unwrap().current_value(), 100.0);
    }

    #[test]
    fn test_simulation_looper_reentrant_run_is_noop() {
        let mut system = SpringSystem::new();
        let id = system.create_spring();
        system.spring(id).unwrap().set_end_value(1.0);

        let mut looper = SimulationLooper::new();
        looper.running = true;
        looper.run(&mut system);

        assert!(
            !system.is_idle(),
            "a looper that believes it is already running must not tick"
        );
        assert_eq!(system.get_spring(id).unwrap().current_value(), 0.0);
    }

    #[test]
    fn test_stepping_looper_only_advances_on_step() {
        let mut system = SpringSystem::new();
        let id = system.create_spring();
        system.spring(id).unwrap().set_end_value(1.0);

        // Activation alone must not move anything.
        assert_eq!(system.get_spring(id).unwrap().current_value(), 0.0);
        assert!(!system.is_idle());

        system.step(DEFAULT_TIMESTEP_MILLIS);
        assert!(system.get_spring(id).unwrap().current_value() > 0.0);
    }

    #[test]
    fn test_stepping_looper_is_deterministic() {
        let run = || {
            let mut system = SpringSystem::new();
            let id = system.create_spring_with_config(SpringConfig::new(194.0, 25.0));
            system.spring(id).unwrap().set_end_value(42.0);
            let mut trajectory = Vec::new();
            for _ in 0..50 {
                system.step(DEFAULT_TIMESTEP_MILLIS);
                trajectory.push(system.get_spring(id).unwrap().current_value());
            }
            trajectory
        };

        assert_eq!(run(), run(), "same step sequence must yield the same trajectory");
    }

    #[test]
    #[should_panic(expected = "not externally stepped")]
    fn test_step_on_simulation_looper_panics() {
        let mut system = SpringSystem::with_looper(Box::new(SimulationLooper::new()));
        system.step(DEFAULT_TIMESTEP_MILLIS);
    }

    #[test]
    fn test_animation_looper_requests_frames_from_host() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();
        let mut system = SpringSystem::with_looper(Box::new(AnimationLooper::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        let id = system.create_spring();
        system.spring(id).unwrap().set_end_value(1.0);
        assert_eq!(
            requests.load(Ordering::SeqCst),
            1,
            "activating an idle system must request a frame"
        );

        // Host frame fires: tick once; the system requests the next frame.
        system.tick(16.667);
        assert!(requests.load(Ordering::SeqCst) >= 2);
    }
}
