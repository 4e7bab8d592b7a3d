// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::auto::RoutineStatus;
use crate::looper::LooperStats;
use crate::swerve::{KinematicLimits, ModuleState};

// Operator input from teleop -> runtime
// Axes are raw stick values in [-1, 1]; buttons are level, not edge, signals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverInput {
    pub forward: f64,
    pub strafe: f64,
    pub rotation: f64,
    pub x_brake: bool,
    pub demo_toggle: bool,
    pub servos: Vec<ServoInput>,
}

// Operator input for one servo-style mechanism
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoInput {
    pub name: String,
    // Manual mode: voltage axis
    pub axis: f64,
    // Nominal mode: index into the configured presets
    pub preset: Option<usize>,
    // Brake switch released (mechanism can be moved by hand)
    pub coast: bool,
}

/// Robot mode, set by whoever owns the enable signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotMode {
    #[default]
    Disabled,
    Teleop,
    Autonomous,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeCommand {
    pub mode: RobotMode,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    InputStale,
    Disabled,
}

// Status from runtime -> telemetry, once per tick
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    pub timestamp: f64,
    pub mode: RobotMode,
    pub health: RuntimeHealth,
    pub limits: KinematicLimits,
    pub demo_limits: bool,
    pub module_states: Vec<ModuleState>,
    pub odometry_samples: u64,
    pub stale_reads: u64,
    pub loop_faults: u64,
    pub looper: LooperStats,
    pub routine: Option<RoutineStatus>,
}
