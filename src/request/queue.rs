// FIFO of requests driven one at a time from the looper.

use std::collections::VecDeque;

use tracing::{debug, info};

use super::Request;
use crate::looper::{LoopError, LoopTask};
use crate::subsystems::Shared;

#[derive(Default)]
pub struct RequestQueue {
    active: Option<Box<dyn Request>>,
    pending: VecDeque<Box<dyn Request>>,
    completed: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: Box<dyn Request>) {
        debug!("Queued {}", request.name());
        self.pending.push_back(request);
    }

    /// Drop everything queued or running and start `request` next.
    pub fn replace(&mut self, request: Box<dyn Request>) {
        self.clear();
        self.push(request);
    }

    pub fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            info!("Dropping active request {}", active.name());
        }
        self.pending.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none() && self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len() + usize::from(self.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.is_idle()
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Poll the active request, then start the next one if it finished.
    pub fn update(&mut self, timestamp: f64) {
        if let Some(active) = self.active.as_mut() {
            active.update(timestamp);
            if active.is_finished(timestamp) {
                debug!("{} finished", active.name());
                self.active = None;
                self.completed += 1;
            }
        }

        if self.active.is_some() {
            return;
        }
        if let Some(mut next) = self.pending.pop_front() {
            next.act(timestamp);
            self.active = Some(next);
        }
    }
}

/// Drives a shared `RequestQueue` from the looper.
///
/// Requests run while the queue lock is held and must not touch the queue.
pub struct RequestLoop {
    queue: Shared<RequestQueue>,
}

impl RequestLoop {
    pub fn new(queue: Shared<RequestQueue>) -> Self {
        Self { queue }
    }
}

impl LoopTask for RequestLoop {
    fn name(&self) -> &str {
        "requests"
    }

    fn on_start(&mut self, _timestamp: f64) {}

    fn on_loop(&mut self, timestamp: f64) -> Result<(), LoopError> {
        self.queue.lock().update(timestamp);
        Ok(())
    }

    fn on_stop(&mut self, _timestamp: f64) {
        self.queue.lock().clear();
    }
}
