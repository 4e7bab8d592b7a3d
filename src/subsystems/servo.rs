// Single-actuator mechanism held at a position or driven by a raw voltage
// (four-bar arms, climbers and the like).

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::{Shared, Subsystem};
use crate::request::{InstantRequest, Request, SequenceRequest, WaitUntilRequest};
use crate::swerve::actuator::{ActuatorPort, SensorSnapshot};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServoConfig {
    pub name: String,
    /// Soft limits in mechanism units
    pub min_position: f64,
    pub max_position: f64,
    /// Distance at which a position request counts as settled
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Volts per unit of manual axis input
    #[serde(default = "default_manual_scale")]
    pub manual_voltage_scale: f64,
    #[serde(default = "default_max_voltage")]
    pub max_voltage: f64,
    /// Named positions selected by index from the operator
    #[serde(default)]
    pub presets: Vec<f64>,
    /// Upper bound on a settle request (s)
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout: f64,
}

fn default_tolerance() -> f64 {
    0.02
}

fn default_manual_scale() -> f64 {
    6.0
}

fn default_max_voltage() -> f64 {
    12.0
}

fn default_settle_timeout() -> f64 {
    3.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoDemand {
    Voltage(f64),
    Position(f64),
}

pub struct ServoSubsystem {
    config: ServoConfig,
    actuator: Box<dyn ActuatorPort>,
    inputs: Arc<SensorSnapshot>,
    demand: ServoDemand,
    stale: bool,
    stale_reads: u64,
}

impl ServoSubsystem {
    pub fn new(config: ServoConfig, actuator: Box<dyn ActuatorPort>) -> Self {
        Self {
            config,
            actuator,
            inputs: Arc::new(SensorSnapshot::default()),
            demand: ServoDemand::Voltage(0.0),
            stale: false,
            stale_reads: 0,
        }
    }

    pub fn config(&self) -> &ServoConfig {
        &self.config
    }

    pub fn set_voltage(&mut self, volts: f64) {
        let max = self.config.max_voltage;
        let volts = if volts.is_finite() { volts.clamp(-max, max) } else { 0.0 };
        self.demand = ServoDemand::Voltage(volts);
    }

    /// Hold a position, clamped to the soft limits. NaN holds the current position.
    pub fn set_position(&mut self, position: f64) {
        let position = if position.is_finite() {
            position.clamp(self.config.min_position, self.config.max_position)
        } else {
            warn!("{}: ignoring non-finite position", self.config.name);
            self.inputs.position
        };
        self.demand = ServoDemand::Position(position);
    }

    pub fn demand(&self) -> ServoDemand {
        self.demand
    }

    pub fn set_brake_mode(&mut self, enabled: bool) {
        self.actuator.set_brake_mode(enabled);
    }

    pub fn position(&self) -> f64 {
        self.inputs.position
    }

    pub fn velocity(&self) -> f64 {
        self.inputs.velocity
    }

    /// Within `tolerance` of `target`
    pub fn at_position(&self, target: f64, tolerance: f64) -> bool {
        (self.inputs.position - target).abs() <= tolerance
    }

    pub fn stale_reads(&self) -> u64 {
        self.stale_reads
    }
}

impl Subsystem for ServoSubsystem {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn on_start(&mut self, _timestamp: f64) {
        self.set_voltage(0.0);
        self.set_brake_mode(true);
    }

    fn read_inputs(&mut self, _timestamp: f64) {
        match self.actuator.update_inputs() {
            Ok(snapshot) if snapshot.is_finite() => {
                if self.stale {
                    info!("{} sensor data recovered", self.config.name);
                    self.stale = false;
                }
                self.inputs = Arc::new(snapshot);
            }
            other => {
                self.stale_reads += 1;
                if !self.stale {
                    match other {
                        Err(e) => warn!("{} sensor data stale: {}", self.config.name, e),
                        Ok(_) => warn!("{} sensor data stale: non-finite reading", self.config.name),
                    }
                    self.stale = true;
                }
            }
        }
    }

    fn write_outputs(&mut self) {
        match self.demand {
            ServoDemand::Voltage(volts) => self.actuator.run_characterization(volts),
            ServoDemand::Position(position) => self.actuator.run_position_setpoint(position),
        }
    }

    fn stop(&mut self) {
        self.demand = ServoDemand::Voltage(0.0);
        self.actuator.stop();
    }
}

/// Set a position target; finished as soon as it is applied.
pub fn position_request(servo: &Shared<ServoSubsystem>, position: f64) -> Box<dyn Request> {
    let servo = Arc::clone(servo);
    let name = format!("{}_position", servo.lock().config.name);
    Box::new(InstantRequest::new(name, move || {
        servo.lock().set_position(position);
    }))
}

/// Set a position target and wait until the mechanism is within tolerance,
/// or the configured settle timeout has passed.
pub fn settle_request(servo: &Shared<ServoSubsystem>, position: f64) -> Box<dyn Request> {
    let (name, tolerance, timeout, target) = {
        let guard = servo.lock();
        let config = guard.config();
        (
            config.name.clone(),
            config.tolerance,
            config.settle_timeout,
            position.clamp(config.min_position, config.max_position),
        )
    };
    let watched = Arc::clone(servo);
    let settled: Box<dyn Request> = Box::new(
        WaitUntilRequest::new(format!("{name}_settled"), move || {
            watched.lock().at_position(target, tolerance)
        })
        .with_timeout(timeout),
    );
    Box::new(SequenceRequest::new(
        format!("{name}_settle"),
        vec![position_request(servo, position), settled],
    ))
}
