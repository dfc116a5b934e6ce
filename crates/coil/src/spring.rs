//! The damped harmonic oscillator
//!
//! One `Spring` integrates `acceleration = tension * (end - position) -
//! friction * velocity` with classic RK4 over a fixed solver timestep,
//! accumulating whatever real frame time the host hands it and
//! interpolating the sub-step remainder so output stays smooth at frame
//! rates that are not a multiple of the solver step.

use crate::config::SpringConfig;
use crate::listener::{ListenerId, ListenerRegistry};
use crate::system::SpringId;

/// Fixed integration step, in seconds.
pub const SOLVER_TIMESTEP_SEC: f64 = 0.001;

/// Upper bound on the real time consumed by one `advance` call, in
/// seconds. Long host pauses (a backgrounded tab, a debugger break) would
/// otherwise accumulate thousands of solver steps and amplify integrator
/// error.
pub const MAX_DELTA_TIME_SEC: f64 = 0.064;

/// Default threshold under which velocity counts as stopped.
pub const DEFAULT_REST_SPEED_THRESHOLD: f64 = 0.001;

/// Default threshold under which displacement from the end value counts
/// as arrived.
pub const DEFAULT_REST_DISPLACEMENT_THRESHOLD: f64 = 0.001;

/// Position/velocity pair. Pure data; mutated only during integration.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhysicsState {
    pub position: f64,
    pub velocity: f64,
}

/// Callbacks observing one spring's lifecycle.
///
/// All methods default to no-ops; implement only what you need. The
/// spring passes itself mutably so a callback can read values or adjust
/// the spring it is observing.
pub trait SpringListener: Send {
    /// The spring left rest and will start moving.
    fn on_spring_activate(&mut self, _spring: &mut Spring) {}
    /// Fired on every `advance` call, whether or not the value moved.
    fn on_spring_update(&mut self, _spring: &mut Spring) {}
    /// The spring reached rest and emitted its exact end value.
    fn on_spring_at_rest(&mut self, _spring: &mut Spring) {}
    /// The spring was given a new end value.
    fn on_spring_end_state_change(&mut self, _spring: &mut Spring) {}
}

/// One damped harmonic oscillator.
///
/// Springs are created and owned by a [`SpringSystem`]; operations that
/// must wake the system's scheduler (`set_end_value`, `set_velocity`,
/// `destroy`) live on [`SpringRef`]. Everything else is available here.
///
/// [`SpringSystem`]: crate::system::SpringSystem
/// [`SpringRef`]: crate::system::SpringRef
pub struct Spring {
    id: SpringId,
    config: SpringConfig,
    current: PhysicsState,
    previous: PhysicsState,
    /// Scratch state for RK4 stage evaluation.
    temp: PhysicsState,
    start_value: f64,
    end_value: f64,
    time_accumulator: f64,
    rest_speed_threshold: f64,
    rest_displacement_threshold: f64,
    overshoot_clamping_enabled: bool,
    was_at_rest: bool,
    listeners: ListenerRegistry<dyn SpringListener>,
}

impl Spring {
    pub(crate) fn new(id: SpringId, config: SpringConfig) -> Self {
        Self {
            id,
            config,
            current: PhysicsState::default(),
            previous: PhysicsState::default(),
            temp: PhysicsState::default(),
            start_value: 0.0,
            end_value: 0.0,
            time_accumulator: 0.0,
            rest_speed_threshold: DEFAULT_REST_SPEED_THRESHOLD,
            rest_displacement_threshold: DEFAULT_REST_DISPLACEMENT_THRESHOLD,
            overshoot_clamping_enabled: false,
            was_at_rest: true,
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn id(&self) -> SpringId {
        self.id
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SpringConfig) {
        self.config = config;
    }

    pub fn current_value(&self) -> f64 {
        self.current.position
    }

    pub fn start_value(&self) -> f64 {
        self.start_value
    }

    pub fn end_value(&self) -> f64 {
        self.end_value
    }

    pub fn velocity(&self) -> f64 {
        self.current.velocity
    }

    pub fn rest_speed_threshold(&self) -> f64 {
        self.rest_speed_threshold
    }

    pub fn set_rest_speed_threshold(&mut self, threshold: f64) {
        self.rest_speed_threshold = threshold;
    }

    pub fn rest_displacement_threshold(&self) -> f64 {
        self.rest_displacement_threshold
    }

    pub fn set_rest_displacement_threshold(&mut self, threshold: f64) {
        self.rest_displacement_threshold = threshold;
    }

    pub fn is_overshoot_clamping_enabled(&self) -> bool {
        self.overshoot_clamping_enabled
    }

    /// When enabled, a spring arriving with excess velocity is pinned to
    /// its end value the moment it crosses it instead of oscillating.
    pub fn set_overshoot_clamping_enabled(&mut self, enabled: bool) {
        self.overshoot_clamping_enabled = enabled;
    }

    /// Distance of the current position from the end value.
    pub fn current_displacement_distance(&self) -> f64 {
        (self.end_value - self.current.position).abs()
    }

    /// Whether the current value is within the rest displacement
    /// threshold of `value`.
    pub fn current_value_is_approximately(&self, value: f64) -> bool {
        (self.current.position - value).abs() <= self.rest_displacement_threshold
    }

    /// Teleport the spring: start value and position become `value`, the
    /// spring is put at rest, and update listeners fire synchronously.
    /// Never activates the scheduler.
    pub fn set_current_value(&mut self, value: f64) {
        self.start_value = value;
        self.current.position = value;
        self.set_at_rest();
        self.notify_position_updated(false, false);
    }

    /// Like [`set_current_value`](Self::set_current_value) but keeps the
    /// end value and velocity, so a mid-flight spring keeps moving toward
    /// its previous target from the new position.
    pub fn set_current_value_skip_at_rest(&mut self, value: f64) {
        self.start_value = value;
        self.current.position = value;
        self.notify_position_updated(false, false);
    }

    /// Pin the end value to the current position and stop all motion.
    pub fn set_at_rest(&mut self) {
        self.end_value = self.current.position;
        self.temp.position = self.current.position;
        self.current.velocity = 0.0;
    }

    /// Velocity below the speed threshold, and either displacement below
    /// the displacement threshold or no restoring force at all.
    pub fn is_at_rest(&self) -> bool {
        self.current.velocity.abs() < self.rest_speed_threshold
            && (self.current_displacement_distance() <= self.rest_displacement_threshold
                || self.config.tension == 0.0)
    }

    /// Whether the current value has crossed the end value, relative to
    /// the direction the animation started in. Meaningless for coasting
    /// springs, which have no target to cross.
    pub fn is_overshooting(&self) -> bool {
        self.config.tension > 0.0
            && ((self.start_value < self.end_value && self.current.position > self.end_value)
                || (self.start_value > self.end_value && self.current.position < self.end_value))
    }

    /// Whether the owning system should keep ticking this spring. True
    /// for one extra tick after the spring crosses into rest, so the
    /// exact end value is emitted once.
    pub fn system_should_advance(&self) -> bool {
        !self.is_at_rest() || !self.was_at_rest
    }

    /// Integrate `real_delta_time_sec` of host time.
    ///
    /// Consumes whole solver steps from the accumulated time, then
    /// interpolates the fractional remainder between the last two solver
    /// states so the displayed value does not stutter at frame rates that
    /// do not divide evenly into the solver step.
    pub fn advance(&mut self, real_delta_time_sec: f64) {
        let adjusted_delta = real_delta_time_sec.min(MAX_DELTA_TIME_SEC);
        self.time_accumulator += adjusted_delta;

        let tension = self.config.tension;
        let friction = self.config.friction;
        let mut position = self.current.position;
        let mut velocity = self.current.velocity;
        let mut integrated = false;

        while self.time_accumulator >= SOLVER_TIMESTEP_SEC {
            self.time_accumulator -= SOLVER_TIMESTEP_SEC;
            integrated = true;

            // The step that empties the accumulator below one timestep
            // donates its pre-step state to remainder interpolation.
            if self.time_accumulator < SOLVER_TIMESTEP_SEC {
                self.previous = PhysicsState { position, velocity };
            }

            // Classic RK4 over x' = v, v' = tension*(end - x) - friction*v
            let a_velocity = velocity;
            let a_acceleration = tension * (self.end_value - position) - friction * velocity;

            self.temp.position = position + a_velocity * SOLVER_TIMESTEP_SEC * 0.5;
            self.temp.velocity = velocity + a_acceleration * SOLVER_TIMESTEP_SEC * 0.5;
            let b_velocity = self.temp.velocity;
            let b_acceleration =
                tension * (self.end_value - self.temp.position) - friction * self.temp.velocity;

            self.temp.position = position + b_velocity * SOLVER_TIMESTEP_SEC * 0.5;
            self.temp.velocity = velocity + b_acceleration * SOLVER_TIMESTEP_SEC * 0.5;
            let c_velocity = self.temp.velocity;
            let c_acceleration =
                tension * (self.end_value - self.temp.position) - friction * self.temp.velocity;

            self.temp.position = position + c_velocity * SOLVER_TIMESTEP_SEC;
            self.temp.velocity = velocity + c_acceleration * SOLVER_TIMESTEP_SEC;
            let d_velocity = self.temp.velocity;
            let d_acceleration =
                tension * (self.end_value - self.temp.position) - friction * self.temp.velocity;

            let dxdt = (a_velocity + 2.0 * (b_velocity + c_velocity) + d_velocity) / 6.0;
            let dvdt =
                (a_acceleration + 2.0 * (b_acceleration + c_acceleration) + d_acceleration) / 6.0;

            position += dxdt * SOLVER_TIMESTEP_SEC;
            velocity += dvdt * SOLVER_TIMESTEP_SEC;
        }

        self.current.position = position;
        self.current.velocity = velocity;

        if integrated && self.time_accumulator > 0.0 {
            let alpha = self.time_accumulator / SOLVER_TIMESTEP_SEC;
            self.current.position = position * alpha + self.previous.position * (1.0 - alpha);
            self.current.velocity = velocity * alpha + self.previous.velocity * (1.0 - alpha);
        }

        let mut now_at_rest = self.is_at_rest();
        if now_at_rest || (self.overshoot_clamping_enabled && self.is_overshooting()) {
            if self.config.tension > 0.0 {
                // Emit the exact end value, not the integrator's
                // within-threshold approximation of it.
                self.start_value = self.end_value;
                self.current.position = self.end_value;
            } else {
                // A coasting spring stops wherever friction left it.
                self.end_value = self.current.position;
                self.start_value = self.end_value;
            }
            self.current.velocity = 0.0;
            now_at_rest = true;
        }

        let notify_activate = self.was_at_rest && !now_at_rest;
        let notify_at_rest = !self.was_at_rest && now_at_rest;
        self.was_at_rest = now_at_rest;
        self.notify_position_updated(notify_activate, notify_at_rest);
    }

    /// Record a new end value; returns whether anything changed. The
    /// owning system activates the spring and fires
    /// `on_spring_end_state_change` afterward.
    pub(crate) fn record_end_value(&mut self, value: f64) -> bool {
        if self.end_value == value && self.is_at_rest() {
            return false;
        }
        self.start_value = self.current.position;
        self.end_value = value;
        true
    }

    /// Overwrite velocity; returns whether anything changed.
    pub(crate) fn apply_velocity(&mut self, velocity: f64) -> bool {
        if velocity == self.current.velocity {
            return false;
        }
        self.current.velocity = velocity;
        true
    }

    pub fn add_listener(&mut self, listener: Box<dyn SpringListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Remove one listener; unknown ids are a silent no-op.
    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(id);
    }

    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    fn notify_position_updated(&mut self, notify_activate: bool, notify_at_rest: bool) {
        let Some(mut listeners) = self.listeners.begin_dispatch() else {
            return;
        };
        for (_, listener) in listeners.iter_mut() {
            if notify_activate {
                listener.on_spring_activate(self);
            }
            listener.on_spring_update(self);
            if notify_at_rest {
                listener.on_spring_at_rest(self);
            }
        }
        self.listeners.end_dispatch(listeners);
    }

    pub(crate) fn notify_end_state_change(&mut self) {
        let Some(mut listeners) = self.listeners.begin_dispatch() else {
            return;
        };
        for (_, listener) in listeners.iter_mut() {
            listener.on_spring_end_state_change(self);
        }
        self.listeners.end_dispatch(listeners);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn test_spring(config: SpringConfig) -> Spring {
        Spring::new(SpringId::default(), config)
    }

    /// Log of listener callback names, shared with the test body.
    struct EventLog(Arc<Mutex<Vec<&'static str>>>);

    impl SpringListener for EventLog {
        fn on_spring_activate(&mut self, _spring: &mut Spring) {
            self.0.lock().unwrap().push("activate");
        }
        fn on_spring_update(&mut self, _spring: &mut Spring) {
            self.0.lock().unwrap().push("update");
        }
        fn on_spring_at_rest(&mut self, _spring: &mut Spring) {
            self.0.lock().unwrap().push("at_rest");
        }
        fn on_spring_end_state_change(&mut self, _spring: &mut Spring) {
            self.0.lock().unwrap().push("end_state_change");
        }
    }

    fn drive_to_rest(spring: &mut Spring, max_ticks: usize) -> usize {
        for tick in 0..max_ticks {
            if !spring.system_should_advance() {
                return tick;
            }
            spring.advance(16.667 / 1000.0);
        }
        panic!("spring did not settle within {} ticks", max_ticks);
    }

    #[test]
    fn test_spring_settles_to_exact_end_value() {
        let mut spring = test_spring(SpringConfig::new(194.0, 25.0));
        spring.record_end_value(100.0);

        drive_to_rest(&mut spring, 200);

        assert_eq!(
            spring.current_value(),
            100.0,
            "rest must emit the exact end value, not an approximation"
        );
        assert_eq!(spring.velocity(), 0.0);
        assert_eq!(spring.start_value(), 100.0);
    }

    #[test]
    fn test_underdamped_spring_overshoots() {
        let mut spring = test_spring(SpringConfig::new(230.2, 10.0));
        spring.record_end_value(1.0);

        let mut max_position = 0.0f64;
        for _ in 0..400 {
            spring.advance(16.667 / 1000.0);
            max_position = max_position.max(spring.current_value());
        }

        assert!(
            max_position > 1.0,
            "lightly damped spring should overshoot, max was {}",
            max_position
        );
    }

    #[test]
    fn test_overshoot_clamping_pins_to_end_value() {
        let mut spring = test_spring(SpringConfig::new(230.2, 10.0));
        spring.set_overshoot_clamping_enabled(true);
        spring.record_end_value(1.0);

        for _ in 0..400 {
            spring.advance(16.667 / 1000.0);
            assert!(
                spring.current_value() <= 1.0 + 1e-9,
                "clamped spring exceeded its target: {}",
                spring.current_value()
            );
        }
        assert!(spring.is_at_rest());
        assert_eq!(spring.current_value(), 1.0);
    }

    #[test]
    fn test_coasting_spring_rests_where_friction_stops_it() {
        let mut spring = test_spring(SpringConfig::coasting_with_origami_friction(7.0));
        spring.apply_velocity(100.0);

        drive_to_rest(&mut spring, 200);

        let stopped_at = spring.current_value();
        assert!(stopped_at > 0.0, "coasting spring never moved");
        assert_eq!(
            spring.end_value(),
            stopped_at,
            "coasting rest must pin the end value to wherever the spring stopped"
        );
        assert_eq!(spring.start_value(), stopped_at);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn test_set_current_value_puts_spring_at_rest() {
        let mut spring = test_spring(SpringConfig::default());
        spring.record_end_value(50.0);
        spring.advance(16.667 / 1000.0);

        spring.set_current_value(10.0);

        assert_eq!(spring.current_value(), 10.0);
        assert_eq!(spring.end_value(), 10.0);
        assert_eq!(spring.velocity(), 0.0);
        assert!(spring.is_at_rest());
    }

    #[test]
    fn test_set_current_value_skip_at_rest_keeps_target() {
        let mut spring = test_spring(SpringConfig::default());
        spring.record_end_value(50.0);

        spring.set_current_value_skip_at_rest(10.0);

        assert_eq!(spring.current_value(), 10.0);
        assert_eq!(spring.end_value(), 50.0, "target must survive the teleport");
        assert!(!spring.is_at_rest());
    }

    #[test]
    fn test_rest_edges_fire_once() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut spring = test_spring(SpringConfig::new(194.0, 25.0));
        spring.add_listener(Box::new(EventLog(events.clone())));
        spring.record_end_value(1.0);

        drive_to_rest(&mut spring, 200);

        let events = events.lock().unwrap();
        let activations = events.iter().filter(|e| **e == "activate").count();
        let rests = events.iter().filter(|e| **e == "at_rest").count();
        assert_eq!(activations, 1, "activate must fire on the rest->active edge only");
        assert_eq!(rests, 1, "at_rest must fire on the active->rest edge only");
        assert_eq!(events[0], "activate", "activate precedes the first update");
        assert_eq!(
            events[events.len() - 1],
            "at_rest",
            "at_rest follows the final update"
        );
    }

    #[test]
    fn test_update_fires_on_every_advance() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut spring = test_spring(SpringConfig::default());
        spring.add_listener(Box::new(EventLog(events.clone())));

        // Already at rest: advancing must still report the value.
        spring.advance(16.667 / 1000.0);
        spring.advance(16.667 / 1000.0);

        let events = events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == "update").count(), 2);
        assert_eq!(events.iter().filter(|e| **e == "at_rest").count(), 0);
    }

    #[test]
    fn test_is_overshooting_tracks_travel_direction() {
        // Upward travel: overshoot means passing above the target.
        let mut spring = test_spring(SpringConfig::new(230.2, 10.0));
        spring.record_end_value(1.0);
        let mut saw_overshoot = false;
        for _ in 0..60 {
            spring.advance(16.667 / 1000.0);
            if spring.current_value() > 1.0 {
                assert!(spring.is_overshooting());
                saw_overshoot = true;
                break;
            }
            assert!(!spring.is_overshooting());
        }
        assert!(saw_overshoot, "lightly damped spring never crossed its target");

        // Downward travel: overshoot means passing below the target.
        let mut spring = test_spring(SpringConfig::new(230.2, 10.0));
        spring.set_current_value(2.0);
        spring.record_end_value(1.0);
        let mut saw_overshoot = false;
        for _ in 0..60 {
            spring.advance(16.667 / 1000.0);
            if spring.current_value() < 1.0 {
                assert!(spring.is_overshooting());
                saw_overshoot = true;
                break;
            }
        }
        assert!(saw_overshoot, "lightly damped spring never crossed its target");
    }

    #[test]
    fn test_coasting_spring_never_overshoots() {
        let mut spring = test_spring(SpringConfig::new(0.0, 22.0));
        spring.apply_velocity(50.0);
        spring.advance(16.667 / 1000.0);
        assert!(!spring.is_overshooting());
    }

    #[test]
    fn test_current_value_is_approximately_uses_rest_threshold() {
        let mut spring = test_spring(SpringConfig::default());
        spring.set_current_value(10.0);

        assert!(spring.current_value_is_approximately(10.0));
        assert!(spring.current_value_is_approximately(10.0005));
        assert!(!spring.current_value_is_approximately(10.1));

        spring.set_rest_displacement_threshold(0.5);
        assert!(spring.current_value_is_approximately(10.1));
    }

    #[test]
    fn test_listener_removal_by_id() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut spring = test_spring(SpringConfig::default());
        let id = spring.add_listener(Box::new(EventLog(events.clone())));
        spring.remove_listener(id);
        spring.remove_listener(id); // second removal is a silent no-op

        spring.advance(16.667 / 1000.0);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_time_accumulator_stays_below_one_step() {
        let mut spring = test_spring(SpringConfig::default());
        spring.record_end_value(1.0);
        for _ in 0..50 {
            spring.advance(16.667 / 1000.0);
            assert!(
                spring.time_accumulator >= 0.0 && spring.time_accumulator < SOLVER_TIMESTEP_SEC,
                "accumulator out of range: {}",
                spring.time_accumulator
            );
        }
    }

    #[test]
    fn test_large_delta_is_clamped() {
        let mut fast = test_spring(SpringConfig::default());
        let mut slow = test_spring(SpringConfig::default());
        fast.record_end_value(1.0);
        slow.record_end_value(1.0);

        // Ten simulated seconds in one call must integrate no further
        // than the clamp allows.
        fast.advance(10.0);
        slow.advance(MAX_DELTA_TIME_SEC);

        assert!((fast.current_value() - slow.current_value()).abs() < 1e-12);
    }
}
