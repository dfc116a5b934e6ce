//! Spring registry and tick scheduling
//!
//! A [`SpringSystem`] owns every spring created through it in a slotmap
//! arena, tracks which ones are currently moving, and advances all of
//! them by one integration tick per [`tick`](SpringSystem::tick) call.
//! When the last spring settles the system goes idle; displacing any
//! spring wakes it back up through its [`Looper`].

use slotmap::{new_key_type, SlotMap};

use crate::config::SpringConfig;
use crate::listener::{ListenerId, ListenerRegistry};
use crate::looper::{Looper, SteppingSimulationLooper};
use crate::spring::Spring;

new_key_type! {
    /// Stable handle for a spring registered with a [`SpringSystem`].
    ///
    /// Ids carry a generation, so a handle kept across
    /// [`SpringRef::destroy`] goes stale instead of aliasing a later
    /// spring that happens to reuse the slot.
    pub struct SpringId;
}

/// Callbacks observing a system's integration ticks.
///
/// Both methods receive the system mutably, so a listener can chain
/// animations by displacing other springs between ticks.
pub trait SystemListener: Send {
    fn on_before_integrate(&mut self, _system: &mut SpringSystem) {}
    fn on_after_integrate(&mut self, _system: &mut SpringSystem) {}
}

/// Marker for "no previous tick time recorded".
const TIME_UNSET: f64 = -1.0;

/// Owns springs, schedules their integration, and tracks idleness.
pub struct SpringSystem {
    springs: SlotMap<SpringId, Spring>,
    /// Springs currently integrating, in activation order.
    active: Vec<SpringId>,
    listeners: ListenerRegistry<dyn SystemListener>,
    /// Taken out of the slot while the looper runs; a tick triggered from
    /// inside the looper finds the slot empty and skips re-entry.
    looper: Option<Box<dyn Looper>>,
    last_time_millis: f64,
    idle: bool,
}

impl SpringSystem {
    /// A system clocked externally through [`tick`](Self::tick) /
    /// [`step`](Self::step). Hosts with a real frame callback should
    /// install an [`AnimationLooper`](crate::looper::AnimationLooper)
    /// via [`with_looper`](Self::with_looper) instead.
    pub fn new() -> Self {
        Self::with_looper(Box::new(SteppingSimulationLooper::new()))
    }

    pub fn with_looper(looper: Box<dyn Looper>) -> Self {
        Self {
            springs: SlotMap::with_key(),
            active: Vec::new(),
            listeners: ListenerRegistry::new(),
            looper: Some(looper),
            last_time_millis: TIME_UNSET,
            idle: true,
        }
    }

    /// Replace the scheduling strategy. Ignored if called while the
    /// current looper is mid-run.
    pub fn set_looper(&mut self, looper: Box<dyn Looper>) {
        if self.looper.is_some() {
            self.looper = Some(looper);
        }
    }

    /// Create a spring with the default Origami (40, 7) config.
    pub fn create_spring(&mut self) -> SpringId {
        self.create_spring_with_config(SpringConfig::default())
    }

    /// Create a spring from Origami tension/friction dial values.
    pub fn create_spring_with_origami_tension_and_friction(
        &mut self,
        o_tension: f64,
        o_friction: f64,
    ) -> SpringId {
        self.create_spring_with_config(SpringConfig::from_origami_tension_and_friction(
            o_tension, o_friction,
        ))
    }

    /// Create a spring from bounciness/speed dial values.
    pub fn create_spring_with_bounciness_and_speed(
        &mut self,
        bounciness: f64,
        speed: f64,
    ) -> SpringId {
        self.create_spring_with_config(SpringConfig::from_bounciness_and_speed(bounciness, speed))
    }

    /// Create and register a spring in one step.
    pub fn create_spring_with_config(&mut self, config: SpringConfig) -> SpringId {
        let id = self.springs.insert_with_key(|id| Spring::new(id, config));
        tracing::debug!(
            "spring created: {:?} (tension {}, friction {})",
            id,
            config.tension,
            config.friction
        );
        id
    }

    /// Activation-aware handle to one spring, or `None` if the id is
    /// stale.
    pub fn spring(&mut self, id: SpringId) -> Option<SpringRef<'_>> {
        if self.springs.contains_key(id) {
            Some(SpringRef { system: self, id })
        } else {
            None
        }
    }

    /// Read-only access to one spring; `None` if the id is stale.
    pub fn get_spring(&self, id: SpringId) -> Option<&Spring> {
        self.springs.get(id)
    }

    /// Mutable access to one spring without activation semantics; value
    /// and velocity changes made here do not wake an idle system.
    pub fn get_spring_mut(&mut self, id: SpringId) -> Option<&mut Spring> {
        self.springs.get_mut(id)
    }

    /// Iterate over all registered springs.
    pub fn all_springs(&self) -> impl Iterator<Item = (SpringId, &Spring)> {
        self.springs.iter()
    }

    /// Number of springs in the registry.
    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Remove a spring from the active set and the registry. Unknown ids
    /// are a silent no-op.
    pub fn deregister_spring(&mut self, id: SpringId) {
        self.active.retain(|&active_id| active_id != id);
        if self.springs.remove(id).is_some() {
            tracing::debug!("spring destroyed: {:?}", id);
        }
    }

    /// Mark a spring as moving. Idempotent; wakes the looper when the
    /// system was idle. Stale ids are a silent no-op.
    pub fn activate_spring(&mut self, id: SpringId) {
        if !self.springs.contains_key(id) {
            return;
        }
        if !self.active.contains(&id) {
            self.active.push(id);
            tracing::trace!("spring activated: {:?}", id);
        }
        if self.idle {
            self.idle = false;
            self.run_looper();
        }
    }

    /// One integration tick, driven by the host or a looper.
    ///
    /// `current_time_millis` is the host clock. The first tick after
    /// idleness seeds the previous-tick time one millisecond back so
    /// elapsed time is well-defined.
    pub fn tick(&mut self, current_time_millis: f64) {
        if self.last_time_millis == TIME_UNSET {
            self.last_time_millis = current_time_millis - 1.0;
        }
        let elapsed_millis = current_time_millis - self.last_time_millis;
        self.last_time_millis = current_time_millis;

        self.notify_before_integrate();
        self.advance_active(elapsed_millis);
        if self.active.is_empty() {
            self.idle = true;
            self.last_time_millis = TIME_UNSET;
            tracing::trace!("spring system idle");
        }
        self.notify_after_integrate();

        if !self.idle {
            self.run_looper();
        }
    }

    /// Forward one externally clocked tick to the installed looper.
    ///
    /// Panics unless the looper supports external stepping (only
    /// [`SteppingSimulationLooper`] does).
    pub fn step(&mut self, delta_millis: f64) {
        let mut looper = self
            .looper
            .take()
            .expect("cannot step the spring system from inside its own looper");
        looper.step(self, delta_millis);
        if self.looper.is_none() {
            self.looper = Some(looper);
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn SystemListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Remove one listener; unknown ids are a silent no-op.
    pub fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(id);
    }

    /// Advance every active spring by `delta_millis`, retiring the ones
    /// that finished settling on a previous tick.
    ///
    /// Retirement is a single stable filter pass: the next active list is
    /// rebuilt excluding retired ids, never mutated in place while
    /// iterating.
    fn advance_active(&mut self, delta_millis: f64) {
        let active = std::mem::take(&mut self.active);
        let mut still_active = Vec::with_capacity(active.len());
        for id in active {
            let Some(spring) = self.springs.get_mut(id) else {
                // Destroyed since the last tick.
                continue;
            };
            if spring.system_should_advance() {
                spring.advance(delta_millis / 1000.0);
                still_active.push(id);
            } else {
                tracing::trace!("spring retired: {:?}", id);
            }
        }
        self.active = still_active;
    }

    fn run_looper(&mut self) {
        if let Some(mut looper) = self.looper.take() {
            looper.run(self);
            if self.looper.is_none() {
                self.looper = Some(looper);
            }
        }
    }

    fn notify_before_integrate(&mut self) {
        let Some(mut listeners) = self.listeners.begin_dispatch() else {
            return;
        };
        for (_, listener) in listeners.iter_mut() {
            listener.on_before_integrate(self);
        }
        self.listeners.end_dispatch(listeners);
    }

    fn notify_after_integrate(&mut self) {
        let Some(mut listeners) = self.listeners.begin_dispatch() else {
            return;
        };
        for (_, listener) in listeners.iter_mut() {
            listener.on_after_integrate(self);
        }
        self.listeners.end_dispatch(listeners);
    }
}

impl Default for SpringSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable handle to one spring that knows its owning system.
///
/// Dereferences to [`Spring`] for everything that does not touch the
/// scheduler, and adds the operations that do: displacing the target or
/// velocity (re)activates the spring, and destruction deregisters it.
pub struct SpringRef<'a> {
    system: &'a mut SpringSystem,
    id: SpringId,
}

impl std::ops::Deref for SpringRef<'_> {
    type Target = Spring;

    fn deref(&self) -> &Spring {
        &self.system.springs[self.id]
    }
}

impl std::ops::DerefMut for SpringRef<'_> {
    fn deref_mut(&mut self) -> &mut Spring {
        &mut self.system.springs[self.id]
    }
}

impl SpringRef<'_> {
    /// Retarget the spring and wake the scheduler.
    ///
    /// A no-op when the spring is already resting at `value`. Otherwise
    /// the current position becomes the new start value, the spring is
    /// activated (restarting the looper if the system was idle), and
    /// `on_spring_end_state_change` fires.
    pub fn set_end_value(&mut self, value: f64) -> &mut Self {
        let spring = &mut self.system.springs[self.id];
        if !spring.record_end_value(value) {
            return self;
        }
        self.system.activate_spring(self.id);
        // A blocking looper may have resolved the whole animation inside
        // activate_spring; a system listener may even have destroyed the
        // spring meanwhile.
        if let Some(spring) = self.system.springs.get_mut(self.id) {
            spring.notify_end_state_change();
        }
        self
    }

    /// Overwrite the spring's velocity and wake the scheduler. A no-op
    /// when the velocity is unchanged.
    pub fn set_velocity(&mut self, velocity: f64) -> &mut Self {
        let spring = &mut self.system.springs[self.id];
        if !spring.apply_velocity(velocity) {
            return self;
        }
        self.system.activate_spring(self.id);
        self
    }

    /// Clear the spring's listeners and remove it from the system. No
    /// callbacks for this spring fire after this returns.
    pub fn destroy(self) {
        let spring = &mut self.system.springs[self.id];
        spring.remove_all_listeners();
        self.system.deregister_spring(self.id);
    }
}
