// Periodic-IO capability shared by every subsystem the looper drives.
//
// Subsystems are owned by the composition root and handed out as `Shared`
// handles; loops, requests and the sampling task all go through the handle.

pub mod servo;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::looper::LoopError;

pub use servo::{ServoConfig, ServoSubsystem};

/// Handle to a subsystem shared between loops and requests
pub type Shared<T> = Arc<Mutex<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// One control cycle is `read_inputs`, `on_loop`, `write_outputs`.
pub trait Subsystem: Send {
    fn name(&self) -> &str;

    /// Called once when the looper starts
    fn on_start(&mut self, _timestamp: f64) {}

    /// Capture sensor state
    fn read_inputs(&mut self, timestamp: f64);

    /// Decide new setpoints from the latest inputs
    fn on_loop(&mut self, _timestamp: f64) -> Result<(), LoopError> {
        Ok(())
    }

    /// Emit setpoints to the actuators
    fn write_outputs(&mut self);

    /// Zero every output
    fn stop(&mut self);
}
