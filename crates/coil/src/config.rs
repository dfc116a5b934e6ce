//! Spring configuration and designer-facing parameter conversions
//!
//! A spring is driven by a raw `(tension, friction)` pair, but designers
//! usually author animations in one of two friendlier parameterizations:
//!
//! - **Origami**: the tension/friction dials from Quartz Composer
//!   patches, mapped affinely onto the raw range.
//! - **Bounciness/Speed**: perceptual dials projected through a piecewise
//!   cubic "no bounce" friction curve.
//!
//! Both conversions reproduce the legacy constants exactly so previously
//! authored animations keep their feel.

/// Origami tension dial value used when no parameters are given.
pub const DEFAULT_ORIGAMI_TENSION: f64 = 40.0;
/// Origami friction dial value used when no parameters are given.
pub const DEFAULT_ORIGAMI_FRICTION: f64 = 7.0;

/// Tension/friction pair driving the oscillator ODE
/// `acceleration = tension * (end - position) - friction * velocity`.
///
/// Zero tension is a supported "coasting" mode: the spring has no
/// restoring force and is decelerated by friction alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub tension: f64,
    pub friction: f64,
}

impl SpringConfig {
    /// Create a config from raw tension and friction.
    pub fn new(tension: f64, friction: f64) -> Self {
        Self { tension, friction }
    }

    /// Convert Origami dial values into a raw config.
    pub fn from_origami_tension_and_friction(o_tension: f64, o_friction: f64) -> Self {
        Self::new(
            origami::tension_from_origami_value(o_tension),
            origami::friction_from_origami_value(o_friction),
        )
    }

    /// Convert bounciness/speed dial values into a raw config.
    pub fn from_bounciness_and_speed(bounciness: f64, speed: f64) -> Self {
        let conversion = BouncyConversion::new(bounciness, speed);
        Self::from_origami_tension_and_friction(
            conversion.bouncy_tension,
            conversion.bouncy_friction,
        )
    }

    /// A coasting config: zero tension, friction from an Origami dial.
    pub fn coasting_with_origami_friction(o_friction: f64) -> Self {
        Self::new(0.0, origami::friction_from_origami_value(o_friction))
    }
}

impl Default for SpringConfig {
    /// The Origami (40, 7) config.
    fn default() -> Self {
        Self::from_origami_tension_and_friction(DEFAULT_ORIGAMI_TENSION, DEFAULT_ORIGAMI_FRICTION)
    }
}

/// Affine mappings between Origami dial values and raw tension/friction.
///
/// Forward and inverse mappings are exact inverses of each other.
pub mod origami {
    pub fn tension_from_origami_value(o_value: f64) -> f64 {
        (o_value - 30.0) * 3.62 + 194.0
    }

    pub fn origami_value_from_tension(tension: f64) -> f64 {
        (tension - 194.0) / 3.62 + 30.0
    }

    pub fn friction_from_origami_value(o_value: f64) -> f64 {
        (o_value - 8.0) * 3.0 + 25.0
    }

    pub fn origami_value_from_friction(friction: f64) -> f64 {
        (friction - 25.0) / 3.0 + 8.0
    }
}

/// Projection of bounciness/speed dials onto Origami tension/friction.
///
/// Bounciness and speed are normalized into [0, 1], projected onto their
/// target ranges, and friction is derived by quadratic-out interpolation
/// between the "no bounce" friction for the projected tension and a
/// near-zero floor.
#[derive(Clone, Copy, Debug)]
pub struct BouncyConversion {
    pub bounciness: f64,
    pub speed: f64,
    /// Origami tension dial projected from the speed value.
    pub bouncy_tension: f64,
    /// Origami friction dial derived from bounciness and tension.
    pub bouncy_friction: f64,
}

impl BouncyConversion {
    pub fn new(bounciness: f64, speed: f64) -> Self {
        let b = normalize(bounciness / 1.7, 0.0, 20.0);
        let b = project_normal(b, 0.0, 0.8);
        let s = normalize(speed / 1.7, 0.0, 20.0);
        let bouncy_tension = project_normal(s, 0.5, 200.0);
        let bouncy_friction =
            quadratic_out_interpolation(b, b3_nobounce(bouncy_tension), 0.01);
        Self {
            bounciness,
            speed,
            bouncy_tension,
            bouncy_friction,
        }
    }
}

fn normalize(value: f64, start_value: f64, end_value: f64) -> f64 {
    (value - start_value) / (end_value - start_value)
}

fn project_normal(n: f64, start: f64, end: f64) -> f64 {
    start + n * (end - start)
}

fn linear_interpolation(t: f64, start: f64, end: f64) -> f64 {
    t * end + (1.0 - t) * start
}

fn quadratic_out_interpolation(t: f64, start: f64, end: f64) -> f64 {
    linear_interpolation(2.0 * t - t * t, start, end)
}

fn b3_friction_1(x: f64) -> f64 {
    0.0007 * x.powi(3) - 0.031 * x.powi(2) + 0.64 * x + 1.28
}

fn b3_friction_2(x: f64) -> f64 {
    0.000044 * x.powi(3) - 0.006 * x.powi(2) + 0.36 * x + 2.0
}

fn b3_friction_3(x: f64) -> f64 {
    0.00000045 * x.powi(3) - 0.000332 * x.powi(2) + 0.1078 * x + 5.84
}

/// Friction that produces no visible bounce for a given tension, selected
/// from three polynomial regimes by tension thresholds.
fn b3_nobounce(tension: f64) -> f64 {
    if tension <= 18.0 {
        b3_friction_1(tension)
    } else if tension <= 44.0 {
        b3_friction_2(tension)
    } else {
        b3_friction_3(tension)
    }
}
