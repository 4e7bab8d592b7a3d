// Composite requests: strict sequences and parallel groups.

use tracing::debug;

use super::Request;

/// Runs its children strictly in order.
///
/// Child `i + 1` is started on the poll that observes child `i` finished,
/// so every child spends at least one poll between `act` and completion.
pub struct SequenceRequest {
    name: String,
    children: Vec<Box<dyn Request>>,
    index: usize,
}

impl SequenceRequest {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Request>>) -> Self {
        Self {
            name: name.into(),
            children,
            index: 0,
        }
    }

    /// Index of the child currently running
    pub fn current_index(&self) -> usize {
        self.index
    }
}

impl Request for SequenceRequest {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&mut self, timestamp: f64) {
        if let Some(first) = self.children.first_mut() {
            first.act(timestamp);
        }
    }

    fn update(&mut self, timestamp: f64) {
        let Some(child) = self.children.get_mut(self.index) else {
            return;
        };
        child.update(timestamp);
        if !child.is_finished(timestamp) {
            return;
        }
        debug!("{}: {} finished", self.name, child.name());
        self.index += 1;
        if let Some(next) = self.children.get_mut(self.index) {
            next.act(timestamp);
        }
    }

    fn is_finished(&self, _timestamp: f64) -> bool {
        self.index >= self.children.len()
    }
}

/// Starts every child together and finishes when all of them have.
pub struct ParallelRequest {
    name: String,
    children: Vec<Box<dyn Request>>,
    done: Vec<bool>,
}

impl ParallelRequest {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Request>>) -> Self {
        let done = vec![false; children.len()];
        Self {
            name: name.into(),
            children,
            done,
        }
    }
}

impl Request for ParallelRequest {
    fn name(&self) -> &str {
        &self.name
    }

    fn act(&mut self, timestamp: f64) {
        for child in &mut self.children {
            child.act(timestamp);
        }
    }

    fn update(&mut self, timestamp: f64) {
        for (child, done) in self.children.iter_mut().zip(self.done.iter_mut()) {
            if *done {
                continue;
            }
            child.update(timestamp);
            *done = child.is_finished(timestamp);
        }
    }

    fn is_finished(&self, _timestamp: f64) -> bool {
        self.done.iter().all(|done| *done)
    }
}
