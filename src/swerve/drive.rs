// Drive subsystem: owns the swerve modules and turns chassis-level intent
// into per-module setpoints once per control cycle.

use std::sync::Arc;

use tracing::{debug, info};

use super::kinematics::{desaturate, SwerveKinematics};
use super::module::ModuleController;
use super::state::{ChassisSpeeds, KinematicLimits, ModulePosition, ModuleState};
use crate::looper::LoopError;
use crate::snapshot::SnapshotCell;
use crate::subsystems::Subsystem;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DriveError {
    #[error("Kinematics describe {locations} modules but {modules} were supplied")]
    ModuleCountMismatch { locations: usize, modules: usize },

    #[error("Drive needs at least one module")]
    NoModules,
}

/// What the drive is asked to do this cycle
#[derive(Debug, Clone, PartialEq)]
pub enum DriveRequest {
    Idle,
    Chassis { speeds: ChassisSpeeds, open_loop: bool },
    ModuleStates { states: Vec<ModuleState>, open_loop: bool },
    XBrake,
    Characterization { input: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct DriveSettings {
    /// Wheel speed cap used for desaturation (m/s)
    pub max_module_speed: f64,
    /// Teleop commands go out as a fraction of nominal voltage
    pub open_loop_teleop: bool,
}

pub struct Drive {
    modules: Vec<ModuleController>,
    kinematics: SwerveKinematics,
    limits: Arc<SnapshotCell<KinematicLimits>>,
    settings: DriveSettings,
    request: DriveRequest,
}

impl Drive {
    pub fn new(
        modules: Vec<ModuleController>,
        kinematics: SwerveKinematics,
        limits: Arc<SnapshotCell<KinematicLimits>>,
        settings: DriveSettings,
    ) -> Result<Self, DriveError> {
        if modules.is_empty() {
            return Err(DriveError::NoModules);
        }
        if modules.len() != kinematics.module_count() {
            return Err(DriveError::ModuleCountMismatch {
                locations: kinematics.module_count(),
                modules: modules.len(),
            });
        }
        Ok(Self {
            modules,
            kinematics,
            limits,
            settings,
            request: DriveRequest::Idle,
        })
    }

    /// Operator command, robot frame
    pub fn teleop_drive(&mut self, speeds: ChassisSpeeds) {
        self.request = DriveRequest::Chassis {
            speeds,
            open_loop: self.settings.open_loop_teleop,
        };
    }

    /// Closed-loop chassis command, used by autonomous steps
    pub fn drive_chassis(&mut self, speeds: ChassisSpeeds) {
        self.request = DriveRequest::Chassis {
            speeds,
            open_loop: false,
        };
    }

    pub fn set_module_states(&mut self, states: Vec<ModuleState>, open_loop: bool) {
        self.request = DriveRequest::ModuleStates { states, open_loop };
    }

    /// Point every wheel at the center so the robot resists being pushed
    pub fn set_x(&mut self) {
        if self.request != DriveRequest::XBrake {
            debug!("Drive x-brake");
        }
        self.request = DriveRequest::XBrake;
    }

    /// Raw drive input with all modules facing forward
    pub fn run_characterization(&mut self, input: f64) {
        self.request = DriveRequest::Characterization { input };
    }

    pub fn request(&self) -> &DriveRequest {
        &self.request
    }

    /// Replace the active profile as a whole value
    pub fn set_kinematic_limits(&self, limits: KinematicLimits) {
        if self.limits.get() != limits {
            info!(
                "Kinematic limits: {:.2} m/s, {:.2} rad/s",
                limits.max_linear_velocity, limits.max_angular_velocity
            );
            self.limits.store(limits);
        }
    }

    pub fn kinematic_limits(&self) -> KinematicLimits {
        self.limits.get()
    }

    pub fn set_brake_mode(&mut self, enabled: bool) {
        for module in &mut self.modules {
            module.set_brake_mode(enabled);
        }
    }

    /// Odometry samples per module, each drained since the previous call
    pub fn module_positions(&mut self) -> Vec<Vec<ModulePosition>> {
        self.modules
            .iter_mut()
            .map(ModuleController::drain_positions)
            .collect()
    }

    /// Measured module states, offsets removed
    pub fn module_states(&self) -> Vec<ModuleState> {
        self.modules.iter().map(ModuleController::state).collect()
    }

    pub fn modules(&self) -> &[ModuleController] {
        &self.modules
    }

    /// Mean drive velocity across modules during a characterization sweep
    pub fn characterization_velocity(&self) -> f64 {
        let sum: f64 = self
            .modules
            .iter()
            .map(ModuleController::characterization_velocity)
            .sum();
        sum / self.modules.len() as f64
    }

    /// Failed or non-finite reads across every module
    pub fn stale_reads(&self) -> u64 {
        self.modules.iter().map(ModuleController::stale_reads).sum()
    }

    /// Clamp a chassis command into the active profile. NaN components become zero.
    fn limit_speeds(&self, speeds: ChassisSpeeds) -> ChassisSpeeds {
        let limits = self.limits.get();
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        let (vx, vy) = (finite(speeds.vx), finite(speeds.vy));
        let linear = vx.hypot(vy);
        let scale = if linear > limits.max_linear_velocity {
            limits.max_linear_velocity / linear
        } else {
            1.0
        };
        let omega = finite(speeds.omega)
            .clamp(-limits.max_angular_velocity, limits.max_angular_velocity);
        ChassisSpeeds::new(vx * scale, vy * scale, omega)
    }

    fn apply_states(&mut self, mut states: Vec<ModuleState>, open_loop: bool) {
        desaturate(&mut states, self.settings.max_module_speed);
        for (module, state) in self.modules.iter_mut().zip(states) {
            module.set_desired_state(state, open_loop);
        }
    }
}

impl Subsystem for Drive {
    fn name(&self) -> &str {
        "drive"
    }

    fn on_start(&mut self, _timestamp: f64) {
        self.set_brake_mode(true);
        self.request = DriveRequest::Idle;
        for module in &mut self.modules {
            module.stop();
        }
    }

    fn read_inputs(&mut self, timestamp: f64) {
        for module in &mut self.modules {
            module.read_inputs(timestamp);
        }
    }

    fn on_loop(&mut self, _timestamp: f64) -> Result<(), LoopError> {
        match self.request.clone() {
            DriveRequest::Idle => {
                for module in &mut self.modules {
                    module.stop();
                }
            }
            DriveRequest::Chassis { speeds, open_loop } => {
                let speeds = self.limit_speeds(speeds);
                let states = self
                    .kinematics
                    .to_module_states(speeds, &self.module_states());
                self.apply_states(states, open_loop);
            }
            DriveRequest::ModuleStates { states, open_loop } => {
                if states.len() != self.modules.len() {
                    return Err(LoopError::Fault(format!(
                        "expected {} module states, got {}",
                        self.modules.len(),
                        states.len()
                    )));
                }
                self.apply_states(states, open_loop);
            }
            DriveRequest::XBrake => {
                // open loop so the zero speed still turns the wheels
                let states = self.kinematics.x_brake_states();
                self.apply_states(states, true);
            }
            DriveRequest::Characterization { input } => {
                debug!("Characterization input {}", input);
                for module in &mut self.modules {
                    module.run_characterization(0.0, input);
                }
            }
        }
        Ok(())
    }

    fn write_outputs(&mut self) {
        for module in &mut self.modules {
            module.write_outputs();
        }
    }

    fn stop(&mut self) {
        self.request = DriveRequest::Idle;
        for module in &mut self.modules {
            module.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swerve::actuator::testing::{Command, RecordingActuator};
    use crate::swerve::actuator::CharacterizationMode;
    use crate::swerve::module::ModuleConstants;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    struct Rig {
        drive: Drive,
        drives: Vec<RecordingActuator>,
        turns: Vec<RecordingActuator>,
        limits: Arc<SnapshotCell<KinematicLimits>>,
    }

    fn rig() -> Rig {
        rig_with(ModuleConstants::default())
    }

    fn rig_with(constants: ModuleConstants) -> Rig {
        let names = ["front_left", "front_right", "back_left", "back_right"];
        let mut drives = Vec::new();
        let mut turns = Vec::new();
        let modules = names
            .iter()
            .map(|name| {
                let drive = RecordingActuator::new();
                let turn = RecordingActuator::new();
                drives.push(drive.clone());
                turns.push(turn.clone());
                ModuleController::new(
                    *name,
                    constants,
                    Box::new(drive),
                    Box::new(turn),
                )
            })
            .collect();
        let limits = Arc::new(SnapshotCell::new(KinematicLimits::default()));
        let drive = Drive::new(
            modules,
            SwerveKinematics::rectangular(0.6, 0.6),
            Arc::clone(&limits),
            DriveSettings {
                max_module_speed: 4.8,
                open_loop_teleop: false,
            },
        )
        .unwrap();
        Rig {
            drive,
            drives,
            turns,
            limits,
        }
    }

    fn cycle(drive: &mut Drive, timestamp: f64) {
        drive.read_inputs(timestamp);
        drive.on_loop(timestamp).unwrap();
        drive.write_outputs();
    }

    #[test]
    fn test_module_count_must_match_kinematics() {
        let limits = Arc::new(SnapshotCell::default());
        let settings = DriveSettings {
            max_module_speed: 4.8,
            open_loop_teleop: false,
        };
        let err = Drive::new(
            vec![ModuleController::new(
                "only",
                ModuleConstants::default(),
                Box::new(RecordingActuator::new()),
                Box::new(RecordingActuator::new()),
            )],
            SwerveKinematics::rectangular(0.6, 0.6),
            Arc::clone(&limits),
            settings,
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            DriveError::ModuleCountMismatch {
                locations: 4,
                modules: 1
            }
        );
        assert_eq!(
            Drive::new(Vec::new(), SwerveKinematics::new(Vec::new()), limits, settings).err(),
            Some(DriveError::NoModules)
        );
    }

    #[test]
    fn test_forward_drive_commands_every_module() {
        let mut rig = rig();
        rig.drive.teleop_drive(ChassisSpeeds::new(1.0, 0.0, 0.0));
        cycle(&mut rig.drive, 0.0);

        for (drive, turn) in rig.drives.iter().zip(&rig.turns) {
            assert!(matches!(drive.last(), Some(Command::Velocity(v, _)) if v == 1.0));
            assert_eq!(turn.last(), Some(Command::Position(0.0)));
        }
    }

    #[test]
    fn test_commands_clamped_to_active_limits() {
        let mut rig = rig();
        rig.drive.set_kinematic_limits(KinematicLimits {
            max_linear_velocity: 1.0,
            max_angular_velocity: 1.0,
        });
        rig.drive.teleop_drive(ChassisSpeeds::new(3.0, 4.0, 0.0));
        cycle(&mut rig.drive, 0.0);

        for module in rig.drive.modules() {
            assert_relative_eq!(module.setpoint().drive_demand.abs(), 1.0, epsilon = 1e-9);
        }
        // the shared cell sees the same profile
        assert_eq!(rig.limits.get().max_linear_velocity, 1.0);
    }

    #[test]
    fn test_nan_command_sends_nothing_invalid() {
        let mut rig = rig();
        rig.drive
            .teleop_drive(ChassisSpeeds::new(f64::NAN, f64::INFINITY, f64::NAN));
        cycle(&mut rig.drive, 0.0);
        for module in rig.drive.modules() {
            let setpoint = module.setpoint();
            assert!(setpoint.drive_demand.is_finite());
            assert!(setpoint.turn_demand.is_finite());
        }
    }

    #[test]
    fn test_wheel_speeds_desaturated() {
        let mut rig = rig();
        rig.drive.set_kinematic_limits(KinematicLimits {
            max_linear_velocity: 10.0,
            max_angular_velocity: 100.0,
        });
        rig.drive
            .set_module_states(vec![ModuleState::new(9.6, 0.0), ModuleState::new(4.8, 0.0),
                ModuleState::new(2.4, 0.0), ModuleState::new(0.0, 0.0)], false);
        cycle(&mut rig.drive, 0.0);

        let demands: Vec<f64> = rig
            .drive
            .modules()
            .iter()
            .map(|m| m.setpoint().drive_demand)
            .collect();
        assert_relative_eq!(demands[0], 4.8);
        assert_relative_eq!(demands[1], 2.4);
        assert_relative_eq!(demands[2], 1.2);
        assert_relative_eq!(demands[3], 0.0);
    }

    #[test]
    fn test_wrong_state_count_is_loop_fault() {
        let mut rig = rig();
        rig.drive
            .set_module_states(vec![ModuleState::new(1.0, 0.0)], false);
        assert!(rig.drive.on_loop(0.0).is_err());
    }

    #[test]
    fn test_x_brake_points_at_center() {
        let mut rig = rig();
        rig.drive.set_x();
        cycle(&mut rig.drive, 0.0);

        let expected = [FRAC_PI_4, -FRAC_PI_4, 3.0 * FRAC_PI_4, -3.0 * FRAC_PI_4];
        for (module, angle) in rig.drive.modules().iter().zip(expected) {
            // optimization may flip the wheel, the axis stays the same
            let turn = module.setpoint().turn_demand;
            let error = crate::swerve::state::angle_between(angle, turn).abs();
            assert!(error < 1e-9 || (error - std::f64::consts::PI).abs() < 1e-9);
            assert_eq!(module.setpoint().drive_demand, 0.0);
        }
    }

    #[test]
    fn test_idle_parks_modules_at_measured_angle() {
        let mut rig = rig();
        for turn in &rig.turns {
            turn.set_sensor(FRAC_PI_2, 0.0);
        }
        rig.drive.read_inputs(0.0);
        rig.drive.stop();
        rig.drive.on_loop(0.0).unwrap();
        for module in rig.drive.modules() {
            assert_eq!(module.setpoint().drive_demand, 0.0);
            assert_eq!(module.setpoint().turn_demand, FRAC_PI_2);
        }
    }

    #[test]
    fn test_on_start_enables_brake_mode() {
        let mut rig = rig();
        rig.drive.on_start(0.0);
        for drive in &rig.drives {
            assert!(drive.commands().contains(&Command::Brake(true)));
        }
    }

    #[test]
    fn test_characterization_sends_raw_input() {
        let mut rig = rig();
        rig.drive.run_characterization(3.0);
        cycle(&mut rig.drive, 0.0);
        for drive in &rig.drives {
            assert_eq!(drive.last(), Some(Command::Characterization(3.0)));
        }
    }

    #[test]
    fn test_characterization_mode_selects_input_unit() {
        let mut voltage = rig();
        let mut current = rig_with(ModuleConstants {
            characterization: CharacterizationMode::Current,
            ..Default::default()
        });
        voltage.drive.run_characterization(3.0);
        current.drive.run_characterization(3.0);
        cycle(&mut voltage.drive, 0.0);
        cycle(&mut current.drive, 0.0);
        for (v, c) in voltage.drives.iter().zip(&current.drives) {
            assert_eq!(v.last(), Some(Command::Characterization(3.0)));
            assert_eq!(c.last(), Some(Command::Current(3.0)));
        }
    }

    #[test]
    fn test_module_positions_drain_per_module() {
        let mut rig = rig();
        for (i, drive) in rig.drives.iter().enumerate() {
            drive.set_sensor(i as f64, 0.0);
        }
        rig.drive.read_inputs(0.0);
        rig.drive.read_inputs(0.004);

        let positions = rig.drive.module_positions();
        assert_eq!(positions.len(), 4);
        assert!(positions.iter().all(|samples| samples.len() == 2));
        assert_eq!(positions[3][1].distance, 3.0);
        assert!(rig.drive.module_positions().iter().all(Vec::is_empty));
    }

    #[test]
    fn test_stale_reads_summed() {
        let mut rig = rig();
        rig.drives[0].set_failing(true);
        rig.turns[2].set_failing(true);
        rig.drive.read_inputs(0.0);
        assert_eq!(rig.drive.stale_reads(), 2);
    }
}
