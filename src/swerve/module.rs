// Closed-loop controller for one swerve module (drive + steering actuator).
//
// Inputs and outputs are separated: `read_inputs` replaces the sensor
// snapshot and may run faster than `write_outputs`, which emits the stored
// setpoint.

use std::collections::VecDeque;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::actuator::{ActuatorPort, CharacterizationMode, SensorSnapshot};
use super::state::{angle_between, wrap_angle, ModulePosition, ModuleSetpoint, ModuleState};

/// Nominal battery voltage used to scale open-loop drive demands
pub const NOMINAL_VOLTAGE: f64 = 12.0;

/// Odometry samples kept between two drains (oldest dropped first)
const ODOMETRY_QUEUE_CAPACITY: usize = 64;

/// Flip the module if that keeps the steering travel within a quarter turn.
///
/// The result always describes the same wheel contact velocity as `desired`.
/// A distance of exactly 90 degrees is not flipped.
pub fn optimize(desired: ModuleState, current_angle: f64) -> ModuleState {
    let delta = angle_between(current_angle, desired.angle);
    if delta.abs() > FRAC_PI_2 {
        desired.flipped()
    } else {
        ModuleState::new(desired.speed, desired.angle)
    }
}

/// Per-module constants, loaded once at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleConstants {
    /// Mechanical steering offset (rad), added to every desired angle
    pub offset: f64,
    /// m/s
    pub max_speed: f64,
    /// Below this speed a closed-loop request parks the module (m/s)
    pub stop_epsilon: f64,
    /// Static friction feedforward (V)
    pub drive_ks: f64,
    /// Velocity feedforward (V per m/s)
    pub drive_kv: f64,
    /// Unit of the raw drive input during characterization
    pub characterization: CharacterizationMode,
}

impl Default for ModuleConstants {
    fn default() -> Self {
        Self {
            offset: 0.0,
            max_speed: 4.8,
            stop_epsilon: 0.001,
            drive_ks: 0.0,
            drive_kv: 0.0,
            characterization: CharacterizationMode::Voltage,
        }
    }
}

/// Sensor snapshot of one module, replaced as a whole on every read
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ModuleInputs {
    pub timestamp: f64,
    /// m
    pub drive_position: f64,
    /// m/s
    pub drive_velocity: f64,
    /// Raw steering angle, offset included (rad)
    pub turn_position: f64,
    /// rad/s
    pub turn_velocity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputMode {
    ClosedLoop,
    OpenLoop,
    Characterization(f64),
    Stopped,
}

pub struct ModuleController {
    name: String,
    constants: ModuleConstants,
    drive: Box<dyn ActuatorPort>,
    turn: Box<dyn ActuatorPort>,
    inputs: Arc<ModuleInputs>,
    setpoint: ModuleSetpoint,
    output: OutputMode,
    odometry: VecDeque<ModulePosition>,
    stale_reads: u64,
    stale: bool,
}

impl ModuleController {
    pub fn new(
        name: impl Into<String>,
        constants: ModuleConstants,
        drive: Box<dyn ActuatorPort>,
        turn: Box<dyn ActuatorPort>,
    ) -> Self {
        Self {
            name: name.into(),
            constants,
            drive,
            turn,
            inputs: Arc::new(ModuleInputs::default()),
            setpoint: ModuleSetpoint::default(),
            output: OutputMode::Stopped,
            odometry: VecDeque::with_capacity(ODOMETRY_QUEUE_CAPACITY),
            stale_reads: 0,
            stale: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compute a new setpoint from a desired module state.
    ///
    /// Nothing is sent to the actuators until `write_outputs`, except when a
    /// closed-loop request is below the stop threshold: then the module stops.
    pub fn set_desired_state(&mut self, state: ModuleState, open_loop: bool) {
        let speed = if state.speed.is_nan() { 0.0 } else { state.speed };

        if !open_loop && speed.abs() < self.constants.stop_epsilon {
            self.stop();
            return;
        }

        let current = self.inputs.turn_position;
        let angle = if state.angle.is_finite() {
            wrap_angle(state.angle + self.constants.offset)
        } else {
            current
        };
        let max = self.constants.max_speed;
        let corrected = ModuleState::new(speed.clamp(-max, max), angle);
        let optimized = optimize(corrected, current);

        self.setpoint = ModuleSetpoint {
            drive_demand: optimized.speed,
            turn_demand: optimized.angle,
        };
        self.output = if open_loop {
            OutputMode::OpenLoop
        } else {
            OutputMode::ClosedLoop
        };
    }

    /// Drive the steering to `turn_angle` while the drive actuator gets a raw input.
    pub fn run_characterization(&mut self, turn_angle: f64, input: f64) {
        let turn_angle = if turn_angle.is_finite() {
            wrap_angle(turn_angle + self.constants.offset)
        } else {
            self.inputs.turn_position
        };
        let input = if input.is_finite() { input } else { 0.0 };
        self.setpoint = ModuleSetpoint {
            drive_demand: 0.0,
            turn_demand: turn_angle,
        };
        self.output = OutputMode::Characterization(input);
    }

    /// Park the module: zero drive demand, hold the measured angle, zero output.
    pub fn stop(&mut self) {
        self.setpoint = ModuleSetpoint {
            drive_demand: 0.0,
            turn_demand: self.inputs.turn_position,
        };
        self.output = OutputMode::Stopped;
        self.drive.stop();
        self.turn.stop();
    }

    pub fn set_brake_mode(&mut self, enabled: bool) {
        self.drive.set_brake_mode(enabled);
        self.turn.set_brake_mode(enabled);
    }

    /// Capture the actuator readings into a fresh snapshot.
    ///
    /// On a failed read the previous snapshot stays authoritative and the
    /// staleness counter is bumped.
    pub fn read_inputs(&mut self, timestamp: f64) {
        let drive = self.drive.update_inputs();
        let turn = self.turn.update_inputs();
        match (drive, turn) {
            (Ok(drive), Ok(turn)) if drive.is_finite() && turn.is_finite() => {
                if self.stale {
                    info!("{} sensor data recovered", self.name);
                    self.stale = false;
                }
                self.replace_inputs(timestamp, drive, turn);
            }
            (drive, turn) => {
                self.stale_reads += 1;
                if !self.stale {
                    let reason = match (drive, turn) {
                        (Err(e), _) | (_, Err(e)) => e.to_string(),
                        _ => "non-finite reading".to_string(),
                    };
                    warn!("{} sensor data stale: {}", self.name, reason);
                    self.stale = true;
                }
            }
        }
    }

    fn replace_inputs(&mut self, timestamp: f64, drive: SensorSnapshot, turn: SensorSnapshot) {
        self.inputs = Arc::new(ModuleInputs {
            timestamp,
            drive_position: drive.position,
            drive_velocity: drive.velocity,
            turn_position: wrap_angle(turn.position),
            turn_velocity: turn.velocity,
        });
        if self.odometry.len() == ODOMETRY_QUEUE_CAPACITY {
            self.odometry.pop_front();
        }
        self.odometry.push_back(self.position());
    }

    /// Send the stored setpoint to the actuators.
    pub fn write_outputs(&mut self) {
        let ModuleSetpoint {
            drive_demand,
            turn_demand,
        } = self.setpoint;
        match self.output {
            OutputMode::ClosedLoop => {
                let feedforward = self.feedforward(drive_demand);
                self.drive.run_velocity_setpoint(drive_demand, feedforward);
                self.turn.run_position_setpoint(turn_demand);
            }
            OutputMode::OpenLoop => {
                let volts = drive_demand / self.constants.max_speed * NOMINAL_VOLTAGE;
                self.drive.run_characterization(volts);
                self.turn.run_position_setpoint(turn_demand);
            }
            OutputMode::Characterization(input) => {
                self.turn.run_position_setpoint(turn_demand);
                match self.constants.characterization {
                    CharacterizationMode::Voltage => self.drive.run_characterization(input),
                    CharacterizationMode::Current => self.drive.run_current(input),
                }
            }
            OutputMode::Stopped => {}
        }
        debug!(
            "{} drive={:.3} turn={:.3}",
            self.name, drive_demand, turn_demand
        );
    }

    fn feedforward(&self, velocity: f64) -> f64 {
        if velocity == 0.0 {
            return 0.0;
        }
        self.constants.drive_ks * velocity.signum() + self.constants.drive_kv * velocity
    }

    /// Latest complete sensor snapshot
    pub fn inputs(&self) -> Arc<ModuleInputs> {
        Arc::clone(&self.inputs)
    }

    /// Raw steering angle, offset included
    pub fn measured_turn_angle(&self) -> f64 {
        self.inputs.turn_position
    }

    pub fn setpoint(&self) -> ModuleSetpoint {
        self.setpoint
    }

    /// Measured velocity and heading, offset removed
    pub fn state(&self) -> ModuleState {
        ModuleState::new(
            self.inputs.drive_velocity,
            self.inputs.turn_position - self.constants.offset,
        )
    }

    /// Measured distance and heading, offset removed
    pub fn position(&self) -> ModulePosition {
        ModulePosition {
            distance: self.inputs.drive_position,
            angle: wrap_angle(self.inputs.turn_position - self.constants.offset),
        }
    }

    /// Drive velocity for characterization sweeps
    pub fn characterization_velocity(&self) -> f64 {
        self.inputs.drive_velocity
    }

    /// Every position sampled since the previous call, oldest first
    pub fn drain_positions(&mut self) -> Vec<ModulePosition> {
        self.odometry.drain(..).collect()
    }

    pub fn stale_reads(&self) -> u64 {
        self.stale_reads
    }
}
