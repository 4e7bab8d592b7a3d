// Joystick shaping: raw axes in [-1, 1] to chassis velocity under the active
// kinematic limits.
//
// Translation uses a radial deadband on the (forward, strafe) vector so
// diagonals are treated like the axes. Rotation uses a scalar deadband and
// only gets a fraction of the angular limit.

use serde::Deserialize;

use crate::swerve::{ChassisSpeeds, KinematicLimits};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ShaperConfig {
    /// Stick magnitude treated as zero, in [0, 1)
    pub deadband: f64,
    /// Share of the angular limit the rotation stick can command
    #[serde(default = "default_turn_fraction")]
    pub max_turn_fraction: f64,
}

fn default_turn_fraction() -> f64 {
    0.75
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            deadband: 0.1,
            max_turn_fraction: default_turn_fraction(),
        }
    }
}

/// NaN and infinities read as a centered stick; values are kept within [-1, 1]
fn sanitize(axis: f64) -> f64 {
    if axis.is_finite() { axis.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Rescale `|value|` from [deadband, 1] onto [0, 1], keeping the sign
pub fn scalar_deadband(value: f64, deadband: f64) -> f64 {
    let value = sanitize(value);
    if value.abs() <= deadband {
        return 0.0;
    }
    value.signum() * (value.abs() - deadband) / (1.0 - deadband)
}

/// Radial deadband on a 2-D stick. Returns a vector of magnitude in [0, 1]
/// pointing along the input.
pub fn vector_deadband(x: f64, y: f64, deadband: f64) -> (f64, f64) {
    let (x, y) = (sanitize(x), sanitize(y));
    let magnitude = x.hypot(y);
    if magnitude <= deadband {
        return (0.0, 0.0);
    }
    // corners of the square stick range reach past 1
    let scaled = (magnitude.min(1.0) - deadband) / (1.0 - deadband);
    (x / magnitude * scaled, y / magnitude * scaled)
}

/// Robot-frame chassis velocity from raw stick axes.
pub fn compute_chassis_velocity(
    forward: f64,
    strafe: f64,
    rotation: f64,
    limits: &KinematicLimits,
    config: &ShaperConfig,
) -> ChassisSpeeds {
    let (x, y) = vector_deadband(forward, strafe, config.deadband);
    let omega = scalar_deadband(rotation, config.deadband)
        * config.max_turn_fraction
        * limits.max_angular_velocity;
    ChassisSpeeds::new(
        x * limits.max_linear_velocity,
        y * limits.max_linear_velocity,
        omega,
    )
}
