// Autonomous sequencer
//
// Steps through an ordered list of requests, one poll per control tick,
// under an external "autonomous still active" signal. Cancellation is an
// outcome of `tick`, not an error.

use serde::Serialize;
use tracing::{info, warn};

use crate::request::Request;

/// Outcome of one sequencer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineStatus {
    Running,
    Completed,
    Cancelled,
}

pub struct AutoSequencer {
    name: String,
    steps: Vec<Box<dyn Request>>,
    index: usize,
    /// Current step has been acted
    started: bool,
    status: RoutineStatus,
}

impl AutoSequencer {
    pub fn new(name: impl Into<String>, steps: Vec<Box<dyn Request>>) -> Self {
        Self {
            name: name.into(),
            steps,
            index: 0,
            started: false,
            status: RoutineStatus::Running,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> RoutineStatus {
        self.status
    }

    /// Index of the step being run (equals the step count once completed)
    pub fn current_step(&self) -> usize {
        self.index
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Advance the routine by one poll.
    ///
    /// The first tick acts the first step. Later ticks update the current
    /// step and, once it is finished, act the next one in the same tick.
    /// When `active` is false the routine is cancelled and no further step
    /// is ever acted. Completed and cancelled are terminal.
    pub fn tick(&mut self, timestamp: f64, active: bool) -> RoutineStatus {
        if self.status != RoutineStatus::Running {
            return self.status;
        }
        if self.index >= self.steps.len() {
            return self.finish(RoutineStatus::Completed);
        }
        if !active {
            warn!(
                "{}: cancelled at step {}/{}",
                self.name,
                self.index + 1,
                self.steps.len()
            );
            return self.finish(RoutineStatus::Cancelled);
        }

        let step = &mut self.steps[self.index];
        if !self.started {
            info!("{}: step {} {}", self.name, self.index + 1, step.name());
            step.act(timestamp);
            self.started = true;
            return RoutineStatus::Running;
        }

        step.update(timestamp);
        if !step.is_finished(timestamp) {
            return RoutineStatus::Running;
        }

        self.index += 1;
        self.started = false;
        match self.steps.get_mut(self.index) {
            Some(next) => {
                info!("{}: step {} {}", self.name, self.index + 1, next.name());
                next.act(timestamp);
                self.started = true;
                RoutineStatus::Running
            }
            None => self.finish(RoutineStatus::Completed),
        }
    }

    fn finish(&mut self, status: RoutineStatus) -> RoutineStatus {
        if status == RoutineStatus::Completed {
            info!("{}: completed", self.name);
        }
        self.status = status;
        status
    }
}
