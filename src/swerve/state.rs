// Value types shared by the module controller, the kinematics and odometry.
//
// Angles are radians, wrapped into [-PI, PI). Speeds are m/s, distances m.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Wrap an angle into [-PI, PI).
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid may round up to TAU for tiny negative inputs
    if wrapped >= PI { wrapped - TAU } else { wrapped }
}

/// Shortest signed rotation from `from` to `to`, in [-PI, PI).
pub fn angle_between(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

/// Desired or measured velocity and heading of one module.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleState {
    pub speed: f64,
    pub angle: f64,
}

impl ModuleState {
    pub fn new(speed: f64, angle: f64) -> Self {
        Self {
            speed,
            angle: wrap_angle(angle),
        }
    }

    /// Wheel contact velocity as (x, y) in the robot frame.
    pub fn velocity_vector(&self) -> (f64, f64) {
        (self.speed * self.angle.cos(), self.speed * self.angle.sin())
    }

    /// Same physical motion, wheel pointed the other way.
    pub fn flipped(&self) -> Self {
        Self::new(-self.speed, self.angle + PI)
    }
}

/// Demands the module controller hands to its actuators.
///
/// Owned by exactly one controller and recomputed every control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ModuleSetpoint {
    pub drive_demand: f64,
    pub turn_demand: f64,
}

/// Accumulated wheel distance plus module heading, for odometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModulePosition {
    pub distance: f64,
    pub angle: f64,
}

/// Driving profile in effect.
///
/// Swapped as a whole value, never mutated field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicLimits {
    /// m/s
    pub max_linear_velocity: f64,
    /// rad/s
    pub max_angular_velocity: f64,
}

impl Default for KinematicLimits {
    fn default() -> Self {
        Self {
            max_linear_velocity: 4.5,
            max_angular_velocity: 2.0 * PI,
        }
    }
}

/// Robot-frame chassis velocity command.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChassisSpeeds {
    /// Forward, m/s
    pub vx: f64,
    /// Left, m/s
    pub vy: f64,
    /// Counter-clockwise, rad/s
    pub omega: f64,
}

impl ChassisSpeeds {
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    /// Convert a field-relative command into the robot frame given the robot heading.
    pub fn from_field_relative(vx: f64, vy: f64, omega: f64, heading: f64) -> Self {
        let (sin, cos) = heading.sin_cos();
        Self {
            vx: vx * cos + vy * sin,
            vy: -vx * sin + vy * cos,
            omega,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.omega == 0.0
    }
}

/// Planar pose, used as the starting pose of an autonomous routine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}
