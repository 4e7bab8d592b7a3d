// Swerve drive control core
//
// Provides:
// - Module state types and angle wrapping
// - Actuator port capability and a simulated actuator
// - Per-module closed-loop controller with setpoint optimization
// - Swerve inverse kinematics and the drive subsystem

pub mod actuator;
pub mod drive;
pub mod kinematics;
pub mod module;
pub mod sim;
pub mod state;

pub use actuator::{ActuatorError, ActuatorPort, CharacterizationMode, SensorSnapshot};
pub use drive::{Drive, DriveError, DriveRequest, DriveSettings};
pub use kinematics::{desaturate, SwerveKinematics};
pub use module::{optimize, ModuleConstants, ModuleController, ModuleInputs};
pub use sim::SimActuator;
pub use state::{
    wrap_angle, ChassisSpeeds, KinematicLimits, ModulePosition, ModuleSetpoint, ModuleState,
    Pose2d,
};
