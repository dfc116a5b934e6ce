//! Coil Spring Physics Engine
//!
//! A damped-harmonic-oscillator simulator for driving animations from
//! physics instead of duration curves.
//!
//! # Features
//!
//! - **Springs**: RK4-integrated oscillators over a fixed solver
//!   timestep, with exact end-value emission at rest
//! - **Spring systems**: arena-backed registry with active/idle
//!   bookkeeping, one integration tick per call
//! - **Loopers**: pluggable time-stepping strategies (host frame
//!   callback, blocking resolve, or externally stepped)
//! - **Designer parameters**: Origami and bounciness/speed
//!   parameterizations with exact legacy conversion constants
//! - **Multi springs**: co-configured spring tuples for vector-valued
//!   properties
//!
//! # Example
//!
//! ```rust
//! use coil::{SimulationLooper, SpringSystem};
//!
//! let mut system = SpringSystem::with_looper(Box::new(SimulationLooper::new()));
//! let id = system.create_spring();
//!
//! // The blocking looper resolves the whole animation synchronously.
//! system.spring(id).unwrap().set_end_value(100.0);
//!
//! assert!(system.is_idle());
//! assert_eq!(system.get_spring(id).unwrap().current_value(), 100.0);
//! ```
//!
//! The core never queries a clock itself: hosts with a real frame
//! callback install an [`AnimationLooper`] and call
//! [`SpringSystem::tick`] with their own timestamps each frame.

pub mod config;
pub mod listener;
pub mod looper;
pub mod math;
pub mod multi;
pub mod spring;
pub mod system;

pub use config::{BouncyConversion, SpringConfig};
pub use listener::ListenerId;
pub use looper::{
    AnimationLooper, Looper, SimulationLooper, SteppingSimulationLooper, DEFAULT_TIMESTEP_MILLIS,
};
pub use multi::MultiSpring;
pub use spring::{
    PhysicsState, Spring, SpringListener, MAX_DELTA_TIME_SEC, SOLVER_TIMESTEP_SEC,
};
pub use system::{SpringId, SpringRef, SpringSystem, SystemListener};
