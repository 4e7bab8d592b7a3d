// Actuator port: the boundary between the control core and motor-controller drivers.
//
// Commands are fire-and-forget. A failing controller shows up as a failed or
// disconnected read, which the caller treats as stale data.

use serde::{Deserialize, Serialize};

/// Error types for actuator reads
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActuatorError {
    #[error("Actuator {name} did not respond")]
    Timeout { name: String },

    #[error("Actuator {name} reported fault: {reason}")]
    Fault { name: String, reason: String },

    #[error("Actuator {name} is disconnected")]
    Disconnected { name: String },
}

/// What an actuator reports back on each read.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SensorSnapshot {
    /// Mechanism units after conversion (m for drive, rad for turn)
    pub position: f64,
    /// Mechanism units per second
    pub velocity: f64,
}

impl SensorSnapshot {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// Unit of a raw open-loop input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterizationMode {
    #[default]
    Voltage,
    Current,
}

/// Capability a module or servo subsystem uses to command one actuator.
pub trait ActuatorPort: Send {
    /// Read the latest position and velocity
    fn update_inputs(&mut self) -> Result<SensorSnapshot, ActuatorError>;

    /// Closed-loop velocity with an additive feedforward (volts)
    fn run_velocity_setpoint(&mut self, velocity: f64, feedforward: f64);

    /// Closed-loop position
    fn run_position_setpoint(&mut self, position: f64);

    /// Raw open-loop input, volts or amps depending on the controller configuration
    fn run_characterization(&mut self, input: f64);

    /// Raw open-loop torque-current input (amps)
    fn run_current(&mut self, amps: f64);

    fn set_brake_mode(&mut self, enabled: bool);

    /// Zero output
    fn stop(&mut self);
}
