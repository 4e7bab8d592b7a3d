// Operator mapping: turns one driver input message into drive and mechanism
// intent. Stateful only for edge detection (demo toggle, preset selection,
// brake switches).

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, info};

use super::shaper::{compute_chassis_velocity, scalar_deadband, ShaperConfig};
use crate::messages::{DriverInput, ServoInput};
use crate::subsystems::ServoConfig;
use crate::swerve::{ChassisSpeeds, KinematicLimits};

/// Servo whose commands are gated by `climber_enabled`
pub const CLIMBER: &str = "climber";

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ControlBoardConfig {
    /// Mechanisms follow raw voltage axes instead of presets
    #[serde(default)]
    pub manual_mode: bool,
    #[serde(default)]
    pub climber_enabled: bool,
    /// Treat stick axes as field-relative when a heading is available
    #[serde(default)]
    pub field_relative: bool,
}

/// Driving profiles selectable from the controller
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LimitProfiles {
    pub uncapped: KinematicLimits,
    pub demo: KinematicLimits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveIntent {
    XBrake,
    Drive(ChassisSpeeds),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoAction {
    Voltage(f64),
    Position(f64),
    Brake(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServoCommand {
    pub name: String,
    pub action: ServoAction,
}

/// Everything the operator asked for in one tick
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorIntent {
    pub limits: KinematicLimits,
    pub demo_limits: bool,
    pub drive: DriveIntent,
    pub servos: Vec<ServoCommand>,
}

pub struct ControlBoard {
    config: ControlBoardConfig,
    shaper: ShaperConfig,
    profiles: LimitProfiles,
    servos: BTreeMap<String, ServoConfig>,
    demo: bool,
    // the toggle only arms after the button has been seen released
    demo_released: bool,
    presets: BTreeMap<String, usize>,
    coast: BTreeMap<String, bool>,
}

impl ControlBoard {
    pub fn new(
        config: ControlBoardConfig,
        shaper: ShaperConfig,
        profiles: LimitProfiles,
        servos: &[ServoConfig],
    ) -> Self {
        info!(
            "Control board: manual_mode={}, climber_enabled={}",
            config.manual_mode, config.climber_enabled
        );
        Self {
            config,
            shaper,
            profiles,
            servos: servos
                .iter()
                .map(|servo| (servo.name.clone(), servo.clone()))
                .collect(),
            demo: false,
            demo_released: false,
            presets: BTreeMap::new(),
            coast: BTreeMap::new(),
        }
    }

    pub fn demo_limits(&self) -> bool {
        self.demo
    }

    /// Map one input message. `heading` enables field-relative driving.
    pub fn update(&mut self, input: &DriverInput, heading: Option<f64>) -> OperatorIntent {
        let demo_limits = self.update_demo_toggle(input.demo_toggle);
        let limits = if demo_limits {
            self.profiles.demo
        } else {
            self.profiles.uncapped
        };

        let drive = if input.x_brake {
            DriveIntent::XBrake
        } else {
            let speeds = compute_chassis_velocity(
                input.forward,
                input.strafe,
                input.rotation,
                &limits,
                &self.shaper,
            );
            match heading {
                Some(heading) if self.config.field_relative => DriveIntent::Drive(
                    ChassisSpeeds::from_field_relative(speeds.vx, speeds.vy, speeds.omega, heading),
                ),
                _ => DriveIntent::Drive(speeds),
            }
        };

        let mut servos = Vec::new();
        for servo_input in &input.servos {
            self.map_servo(servo_input, &mut servos);
        }

        OperatorIntent {
            limits,
            demo_limits,
            drive,
            servos,
        }
    }

    fn update_demo_toggle(&mut self, pressed: bool) -> bool {
        if !pressed {
            self.demo_released = true;
        } else if self.demo_released {
            self.demo_released = false;
            self.demo = !self.demo;
            info!("Demo limits {}", if self.demo { "on" } else { "off" });
        }
        self.demo
    }

    fn map_servo(&mut self, input: &ServoInput, commands: &mut Vec<ServoCommand>) {
        if input.name == CLIMBER && !self.config.climber_enabled {
            return;
        }
        let Some(servo) = self.servos.get(&input.name) else {
            debug!("Ignoring input for unknown servo {}", input.name);
            return;
        };
        let mut push = |action| {
            commands.push(ServoCommand {
                name: input.name.clone(),
                action,
            })
        };

        let was_coast = self.coast.insert(input.name.clone(), input.coast).unwrap_or(false);
        if was_coast != input.coast {
            push(ServoAction::Brake(!input.coast));
        }

        if self.config.manual_mode {
            let axis = scalar_deadband(input.axis, self.shaper.deadband);
            push(ServoAction::Voltage(axis * servo.manual_voltage_scale));
            return;
        }

        match input.preset {
            Some(index) if index < servo.presets.len() => {
                let previous = self.presets.insert(input.name.clone(), index);
                if previous != Some(index) {
                    push(ServoAction::Position(servo.presets[index]));
                }
            }
            Some(index) => debug!("{} has no preset {}", input.name, index),
            None => {
                self.presets.remove(&input.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const UNCAPPED: KinematicLimits = KinematicLimits {
        max_linear_velocity: 4.0,
        max_angular_velocity: 6.0,
    };
    const DEMO: KinematicLimits = KinematicLimits {
        max_linear_velocity: 1.0,
        max_angular_velocity: 1.0,
    };

    fn servo_config(name: &str) -> ServoConfig {
        ServoConfig {
            name: name.to_string(),
            min_position: 0.0,
            max_position: 2.0,
            tolerance: 0.02,
            manual_voltage_scale: 6.0,
            max_voltage: 12.0,
            presets: vec![0.1, 1.2],
            settle_timeout: 1.0,
        }
    }

    fn board(config: ControlBoardConfig) -> ControlBoard {
        ControlBoard::new(
            config,
            ShaperConfig::default(),
            LimitProfiles {
                uncapped: UNCAPPED,
                demo: DEMO,
            },
            &[servo_config("fourbar"), servo_config(CLIMBER)],
        )
    }

    fn servo_input(name: &str, axis: f64, preset: Option<usize>) -> ServoInput {
        ServoInput {
            name: name.to_string(),
            axis,
            preset,
            coast: false,
        }
    }

    #[test]
    fn test_demo_toggle_on_rising_edge_only() {
        let mut board = board(ControlBoardConfig::default());
        let pressed = DriverInput {
            demo_toggle: true,
            ..Default::default()
        };
        let released = DriverInput::default();

        // held since start-up: not armed yet
        assert!(!board.update(&pressed, None).demo_limits);
        assert!(!board.update(&released, None).demo_limits);

        let intent = board.update(&pressed, None);
        assert!(intent.demo_limits);
        assert_eq!(intent.limits, DEMO);
        // holding does not toggle back
        assert!(board.update(&pressed, None).demo_limits);

        board.update(&released, None);
        let intent = board.update(&pressed, None);
        assert!(!intent.demo_limits);
        assert_eq!(intent.limits, UNCAPPED);
    }

    #[test]
    fn test_drive_scaled_by_selected_profile() {
        let mut board = board(ControlBoardConfig::default());
        let input = DriverInput {
            forward: 1.0,
            ..Default::default()
        };
        match board.update(&input, None).drive {
            DriveIntent::Drive(speeds) => assert_relative_eq!(speeds.vx, 4.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_x_brake_overrides_sticks() {
        let mut board = board(ControlBoardConfig::default());
        let input = DriverInput {
            forward: 1.0,
            x_brake: true,
            ..Default::default()
        };
        assert_eq!(board.update(&input, None).drive, DriveIntent::XBrake);
    }

    #[test]
    fn test_field_relative_uses_heading() {
        let mut board = board(ControlBoardConfig {
            field_relative: true,
            ..Default::default()
        });
        let input = DriverInput {
            forward: 1.0,
            ..Default::default()
        };
        // robot facing +90 deg: field forward is robot right
        match board.update(&input, Some(std::f64::consts::FRAC_PI_2)).drive {
            DriveIntent::Drive(speeds) => {
                assert_relative_eq!(speeds.vx, 0.0, epsilon = 1e-9);
                assert_relative_eq!(speeds.vy, -4.0, epsilon = 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
        // without a heading the command stays robot-relative
        match board.update(&input, None).drive {
            DriveIntent::Drive(speeds) => assert_relative_eq!(speeds.vx, 4.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_manual_mode_maps_axes_to_voltage() {
        let mut board = board(ControlBoardConfig {
            manual_mode: true,
            ..Default::default()
        });
        let input = DriverInput {
            servos: vec![servo_input("fourbar", 1.0, Some(1))],
            ..Default::default()
        };
        let intent = board.update(&input, None);
        assert_eq!(
            intent.servos,
            vec![ServoCommand {
                name: "fourbar".to_string(),
                action: ServoAction::Voltage(6.0)
            }]
        );
    }

    #[test]
    fn test_nominal_mode_sends_preset_once_per_selection() {
        let mut board = board(ControlBoardConfig::default());
        let select = DriverInput {
            servos: vec![servo_input("fourbar", 0.0, Some(1))],
            ..Default::default()
        };
        let first = board.update(&select, None);
        assert_eq!(first.servos[0].action, ServoAction::Position(1.2));
        assert!(board.update(&select, None).servos.is_empty());

        let idle = DriverInput {
            servos: vec![servo_input("fourbar", 0.0, None)],
            ..Default::default()
        };
        board.update(&idle, None);
        assert_eq!(board.update(&select, None).servos.len(), 1);

        let missing = DriverInput {
            servos: vec![servo_input("fourbar", 0.0, Some(7))],
            ..Default::default()
        };
        assert!(board.update(&missing, None).servos.is_empty());
    }

    #[test]
    fn test_climber_gated_by_flag() {
        let input = DriverInput {
            servos: vec![servo_input(CLIMBER, 1.0, None)],
            ..Default::default()
        };
        let mut disabled = board(ControlBoardConfig {
            manual_mode: true,
            ..Default::default()
        });
        assert!(disabled.update(&input, None).servos.is_empty());

        let mut enabled = board(ControlBoardConfig {
            manual_mode: true,
            climber_enabled: true,
            ..Default::default()
        });
        assert_eq!(enabled.update(&input, None).servos.len(), 1);
    }

    #[test]
    fn test_coast_switch_edges() {
        let mut board = board(ControlBoardConfig::default());
        let mut servo = servo_input("fourbar", 0.0, None);
        servo.coast = true;
        let coast = DriverInput {
            servos: vec![servo],
            ..Default::default()
        };
        let brake = DriverInput {
            servos: vec![servo_input("fourbar", 0.0, None)],
            ..Default::default()
        };

        assert_eq!(
            board.update(&coast, None).servos[0].action,
            ServoAction::Brake(false)
        );
        assert!(board.update(&coast, None).servos.is_empty());
        assert_eq!(
            board.update(&brake, None).servos[0].action,
            ServoAction::Brake(true)
        );
    }

    #[test]
    fn test_unknown_servo_ignored() {
        let mut board = board(ControlBoardConfig {
            manual_mode: true,
            ..Default::default()
        });
        let input = DriverInput {
            servos: vec![servo_input("elevator", 1.0, None)],
            ..Default::default()
        };
        assert!(board.update(&input, None).servos.is_empty());
    }
}
