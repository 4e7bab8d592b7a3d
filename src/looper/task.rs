// Lifecycle-bound periodic callbacks and the adapters that turn subsystems
// and closures into them.

use tracing::debug;

use crate::subsystems::{Shared, Subsystem};
use crate::swerve::actuator::ActuatorError;

/// Fault reported by a task's `on_loop`. Counted and logged, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("{0}")]
    Fault(String),

    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Task panicked: {0}")]
    Panicked(String),
}

/// A periodic callback bound to the looper's start/stop lifecycle.
///
/// `on_loop` is only ever called between a matching `on_start` and `on_stop`.
pub trait LoopTask: Send {
    fn name(&self) -> &str;

    fn on_start(&mut self, timestamp: f64);

    fn on_loop(&mut self, timestamp: f64) -> Result<(), LoopError>;

    fn on_stop(&mut self, timestamp: f64);
}

/// Runs one subsystem's read / loop / write cycle every tick.
pub struct SubsystemLoop<S: Subsystem> {
    name: String,
    subsystem: Shared<S>,
    read_inputs: bool,
}

impl<S: Subsystem> SubsystemLoop<S> {
    pub fn new(subsystem: Shared<S>) -> Self {
        let name = subsystem.lock().name().to_string();
        Self {
            name,
            subsystem,
            read_inputs: true,
        }
    }

    /// Leave input capture to another path (e.g. a faster sampling task)
    pub fn without_input_capture(mut self) -> Self {
        self.read_inputs = false;
        self
    }
}

impl<S: Subsystem> LoopTask for SubsystemLoop<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_start(&mut self, timestamp: f64) {
        debug!("{} loop starting", self.name);
        self.subsystem.lock().on_start(timestamp);
    }

    fn on_loop(&mut self, timestamp: f64) -> Result<(), LoopError> {
        let mut subsystem = self.subsystem.lock();
        if self.read_inputs {
            subsystem.read_inputs(timestamp);
        }
        let result = subsystem.on_loop(timestamp);
        // outputs go out even when the decision step faulted
        subsystem.write_outputs();
        result
    }

    fn on_stop(&mut self, _timestamp: f64) {
        debug!("{} loop stopping", self.name);
        self.subsystem.lock().stop();
    }
}

/// Loop task built from closures, with the captured state spelled out by the caller.
pub struct FnLoop<S, F>
where
    F: FnMut(&mut S, f64) -> Result<(), LoopError>,
{
    name: String,
    state: S,
    on_loop: F,
}

impl<S, F> FnLoop<S, F>
where
    S: Send,
    F: FnMut(&mut S, f64) -> Result<(), LoopError> + Send,
{
    pub fn new(name: impl Into<String>, state: S, on_loop: F) -> Self {
        Self {
            name: name.into(),
            state,
            on_loop,
        }
    }
}

impl<S, F> LoopTask for FnLoop<S, F>
where
    S: Send,
    F: FnMut(&mut S, f64) -> Result<(), LoopError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_start(&mut self, _timestamp: f64) {}

    fn on_loop(&mut self, timestamp: f64) -> Result<(), LoopError> {
        (self.on_loop)(&mut self.state, timestamp)
    }

    fn on_stop(&mut self, _timestamp: f64) {}
}
