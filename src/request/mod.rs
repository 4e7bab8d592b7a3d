// Poll-to-completion units of work.
//
// A request is started with `act` exactly once, then advanced with `update`
// and checked with `is_finished` on every later poll until it reports done.
// Once finished it is never polled again.

mod queue;
mod sequence;

pub use queue::{RequestLoop, RequestQueue};
pub use sequence::{ParallelRequest, SequenceRequest};

pub trait Request: Send {
    fn name(&self) -> &str {
        "request"
    }

    /// Apply the side effect. Called once, on the poll that starts the request.
    fn act(&mut self, timestamp: f64);

    /// Advance internal progress. Called on every poll after `act`.
    fn update(&mut self, _timestamp: f64) {}

    /// Completion check, free of side effects
    fn is_finished(&self, timestamp: f64) -> bool;
}

/// Applies a side effect once and is finished right away.
pub struct InstantRequest<F: FnMut() + Send> {
    name: String,
    action: F,
    acted: bool,
}

impl<F: FnMut() + Send> InstantRequest<F> {
    pub fn new(name: impl Into<String>, action: F) -> Self {
        Self {
            name: name.into(),
            action,
            acted: false,
        }
    }
}

impl<F: FnMut() + Send> Request for InstantRequest<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&mut self, _timestamp: f64) {
        if !self.acted {
            (self.action)();
            self.acted = true;
        }
    }

    fn is_finished(&self, _timestamp: f64) -> bool {
        self.acted
    }
}

/// Finishes once `duration` seconds have passed since its own `act`.
#[derive(Debug, Clone)]
pub struct WaitRequest {
    duration: f64,
    started_at: Option<f64>,
}

impl WaitRequest {
    pub fn new(duration: f64) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        Self {
            duration,
            started_at: None,
        }
    }
}

impl Request for WaitRequest {
    fn name(&self) -> &str {
        "wait"
    }

    fn act(&mut self, timestamp: f64) {
        self.started_at = Some(timestamp);
    }

    fn is_finished(&self, timestamp: f64) -> bool {
        self.started_at
            .is_some_and(|started| timestamp - started >= self.duration)
    }
}

/// Finishes once a condition holds, or after an optional timeout.
pub struct WaitUntilRequest<P: Fn() -> bool + Send> {
    name: String,
    condition: P,
    timeout: Option<f64>,
    started_at: Option<f64>,
}

impl<P: Fn() -> bool + Send> WaitUntilRequest<P> {
    pub fn new(name: impl Into<String>, condition: P) -> Self {
        Self {
            name: name.into(),
            condition,
            timeout: None,
            started_at: None,
        }
    }

    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<P: Fn() -> bool + Send> Request for WaitUntilRequest<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&mut self, timestamp: f64) {
        self.started_at = Some(timestamp);
    }

    fn is_finished(&self, timestamp: f64) -> bool {
        let Some(started) = self.started_at else {
            return false;
        };
        let timed_out = self
            .timeout
            .is_some_and(|timeout| timestamp - started >= timeout);
        timed_out || (self.condition)()
    }
}
