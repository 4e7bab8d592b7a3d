// Operator input layer
//
// Provides:
// - Command shaping (vector deadband, turn authority) under kinematic limits
// - Control board mapping with explicit manual/climber mode flags

pub mod control_board;
pub mod shaper;

pub use control_board::{
    ControlBoard, ControlBoardConfig, DriveIntent, LimitProfiles, OperatorIntent, ServoAction,
    ServoCommand, CLIMBER,
};
pub use shaper::{compute_chassis_velocity, ShaperConfig};
