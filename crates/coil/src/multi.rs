//! Vector-valued springs
//!
//! A [`MultiSpring<N>`] animates an N-component property (a translation,
//! a color, a transform) with N co-configured springs. Component springs
//! are created lazily the first time their slot is written, all sharing
//! one [`SpringConfig`].

use crate::config::SpringConfig;
use crate::system::{SpringId, SpringSystem};

/// Fixed-length tuple of co-configured springs.
///
/// The multi-spring stores ids, not springs, so every operation takes the
/// owning [`SpringSystem`]. Slots that have never been written read back
/// as `0.0`.
pub struct MultiSpring<const N: usize> {
    config: SpringConfig,
    springs: [Option<SpringId>; N],
}

impl<const N: usize> MultiSpring<N> {
    pub fn new(config: SpringConfig) -> Self {
        Self {
            config,
            springs: [None; N],
        }
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    /// Component spring ids; `None` for slots never written.
    pub fn spring_ids(&self) -> [Option<SpringId>; N] {
        self.springs
    }

    /// The slot's spring, created against the shared config on first use.
    /// Recreates the slot if its spring was destroyed out from under us.
    fn ensure_slot(&mut self, system: &mut SpringSystem, index: usize) -> SpringId {
        if let Some(id) = self.springs[index] {
            if system.get_spring(id).is_some() {
                return id;
            }
        }
        let id = system.create_spring_with_config(self.config);
        self.springs[index] = Some(id);
        id
    }

    pub fn current_values(&self, system: &SpringSystem) -> [f64; N] {
        self.read(|id| system.get_spring(id).map_or(0.0, |s| s.current_value()))
    }

    /// Teleport all components; readable back immediately, no activation.
    pub fn set_current_values(&mut self, system: &mut SpringSystem, values: [f64; N]) {
        for (index, value) in values.into_iter().enumerate() {
            let id = self.ensure_slot(system, index);
            if let Some(spring) = system.get_spring_mut(id) {
                spring.set_current_value(value);
            }
        }
    }

    pub fn end_values(&self, system: &SpringSystem) -> [f64; N] {
        self.read(|id| system.get_spring(id).map_or(0.0, |s| s.end_value()))
    }

    /// Retarget all components, activating each.
    pub fn set_end_values(&mut self, system: &mut SpringSystem, values: [f64; N]) {
        for (index, value) in values.into_iter().enumerate() {
            let id = self.ensure_slot(system, index);
            if let Some(mut spring) = system.spring(id) {
                spring.set_end_value(value);
            }
        }
    }

    /// Give every component the same velocity, activating each.
    pub fn set_velocity(&mut self, system: &mut SpringSystem, velocity: f64) {
        for index in 0..N {
            let id = self.ensure_slot(system, index);
            if let Some(mut spring) = system.spring(id) {
                spring.set_velocity(velocity);
            }
        }
    }

    /// Put every already-created component at rest.
    pub fn set_at_rest(&mut self, system: &mut SpringSystem) {
        for id in self.springs.into_iter().flatten() {
            if let Some(spring) = system.get_spring_mut(id) {
                spring.set_at_rest();
            }
        }
    }

    /// Destroy every component spring and empty the slots.
    pub fn destroy(&mut self, system: &mut SpringSystem) {
        for slot in &mut self.springs {
            if let Some(id) = slot.take() {
                if let Some(spring) = system.spring(id) {
                    spring.destroy();
                }
            }
        }
    }

    fn read(&self, get: impl Fn(SpringId) -> f64) -> [f64; N] {
        let mut out = [0.0; N];
        for (index, slot) in self.springs.iter().enumerate() {
            if let Some(id) = *slot {
                out[index] = get(id);
            }
        }
        out
    }
}
