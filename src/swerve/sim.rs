// Simulated actuator used when no motor-controller driver is wired in.
//
// First-order response toward the commanded velocity or position, integrated
// by a fixed step on every read.

use tracing::debug;

use super::actuator::{ActuatorError, ActuatorPort, SensorSnapshot};

/// Time constant of the simulated velocity response (s)
const VELOCITY_TIME_CONSTANT: f64 = 0.05;

/// Volts per (mechanism unit / s) for open-loop inputs
const VOLTS_PER_UNIT: f64 = 12.0 / 5.0;

/// Amps per (mechanism unit / s) for current inputs
const AMPS_PER_UNIT: f64 = 40.0 / 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Control {
    Idle,
    Velocity(f64),
    Position(f64),
    OpenLoop(f64),
    Current(f64),
}

#[derive(Debug)]
pub struct SimActuator {
    name: String,
    dt: f64,
    max_velocity: f64,
    position: f64,
    velocity: f64,
    control: Control,
    brake: bool,
}

impl SimActuator {
    /// `dt` is the step integrated per read, `max_velocity` caps the response.
    pub fn new(name: impl Into<String>, dt: f64, max_velocity: f64) -> Self {
        Self {
            name: name.into(),
            dt,
            max_velocity,
            position: 0.0,
            velocity: 0.0,
            control: Control::Idle,
            brake: true,
        }
    }

    fn target_velocity(&self) -> f64 {
        let target = match self.control {
            Control::Idle => {
                if self.brake {
                    0.0
                } else {
                    self.velocity
                }
            }
            Control::Velocity(v) => v,
            // proportional position loop, saturated below
            Control::Position(p) => (p - self.position) / (2.0 * VELOCITY_TIME_CONSTANT),
            Control::OpenLoop(volts) => volts / VOLTS_PER_UNIT,
            Control::Current(amps) => amps / AMPS_PER_UNIT,
        };
        target.clamp(-self.max_velocity, self.max_velocity)
    }
}

impl ActuatorPort for SimActuator {
    fn update_inputs(&mut self) -> Result<SensorSnapshot, ActuatorError> {
        let target = self.target_velocity();
        let alpha = (self.dt / VELOCITY_TIME_CONSTANT).min(1.0);
        self.velocity += (target - self.velocity) * alpha;
        self.position += self.velocity * self.dt;
        Ok(SensorSnapshot {
            position: self.position,
            velocity: self.velocity,
        })
    }

    fn run_velocity_setpoint(&mut self, velocity: f64, _feedforward: f64) {
        self.control = Control::Velocity(velocity);
    }

    fn run_position_setpoint(&mut self, position: f64) {
        self.control = Control::Position(position);
    }

    fn run_characterization(&mut self, input: f64) {
        self.control = Control::OpenLoop(input);
    }

    fn run_current(&mut self, amps: f64) {
        self.control = Control::Current(amps);
    }

    fn set_brake_mode(&mut self, enabled: bool) {
        debug!("{} brake mode {}", self.name, enabled);
        self.brake = enabled;
    }

    fn stop(&mut self) {
        self.control = Control::Idle;
    }
}
