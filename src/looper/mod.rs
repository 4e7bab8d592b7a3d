// Fixed-rate cooperative scheduler for subsystem control loops.
//
// Tasks are registered while the looper is stopped, started together in
// registration order, ticked in registration order and stopped together.
// A fault in one task's `on_loop` is isolated: it is logged and counted and
// the remaining tasks still run in the same tick.

mod task;

pub use task::{FnLoop, LoopError, LoopTask, SubsystemLoop};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};

/// Faults isolated by every looper in the process
static LOOP_FAULTS: AtomicU64 = AtomicU64::new(0);

/// Process-wide count of faults raised by loop tasks
pub fn total_loop_faults() -> u64 {
    LOOP_FAULTS.load(Ordering::Relaxed)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LooperError {
    #[error("Cannot register {task} while looper {looper} is running")]
    RegisterWhileRunning { looper: String, task: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Stopped,
    Started,
    Running,
}

/// Tick timing statistics
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LooperStats {
    pub ticks: u64,
    pub faults: u64,
    /// Ticks whose execution took longer than the period
    pub overruns: u64,
    pub last_execution_us: u64,
    pub max_execution_us: u64,
    /// Time between the last two tick timestamps (s)
    pub last_dt: f64,
}

struct Slot {
    task: Box<dyn LoopTask>,
    state: TaskState,
}

pub struct Looper {
    name: String,
    period: Duration,
    slots: Vec<Slot>,
    running: bool,
    last_timestamp: Option<f64>,
    stats: LooperStats,
}

impl Looper {
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            period,
            slots: Vec::new(),
            running: false,
            last_timestamp: None,
            stats: LooperStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Add a task. Only allowed while the looper is stopped.
    pub fn register(&mut self, task: Box<dyn LoopTask>) -> Result<(), LooperError> {
        if self.running {
            return Err(LooperError::RegisterWhileRunning {
                looper: self.name.clone(),
                task: task.name().to_string(),
            });
        }
        info!("{}: registered {}", self.name, task.name());
        self.slots.push(Slot {
            task,
            state: TaskState::Stopped,
        });
        Ok(())
    }

    /// Call every task's `on_start` once, in registration order.
    pub fn start(&mut self, timestamp: f64) {
        if self.running {
            warn!("{} already running", self.name);
            return;
        }
        info!("Starting {} ({} tasks)", self.name, self.slots.len());
        for slot in &mut self.slots {
            slot.task.on_start(timestamp);
            slot.state = TaskState::Started;
        }
        self.last_timestamp = None;
        self.running = true;
    }

    /// Run one tick. Returns the number of tasks that faulted in it.
    pub fn tick(&mut self, timestamp: f64) -> usize {
        if !self.running {
            return 0;
        }
        let began = Instant::now();
        let mut faults = 0;

        for slot in &mut self.slots {
            let task = &mut slot.task;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.on_loop(timestamp)))
                .unwrap_or_else(|payload| Err(LoopError::Panicked(panic_message(payload))));
            if let Err(e) = outcome {
                faults += 1;
                LOOP_FAULTS.fetch_add(1, Ordering::Relaxed);
                error!("{}: {} faulted: {}", self.name, slot.task.name(), e);
            }
            slot.state = TaskState::Running;
        }

        let elapsed = began.elapsed();
        self.record(timestamp, elapsed, faults);
        faults
    }

    fn record(&mut self, timestamp: f64, elapsed: Duration, faults: usize) {
        let stats = &mut self.stats;
        stats.ticks += 1;
        stats.faults += faults as u64;
        stats.last_execution_us = elapsed.as_micros() as u64;
        stats.max_execution_us = stats.max_execution_us.max(stats.last_execution_us);
        if elapsed > self.period {
            stats.overruns += 1;
        }
        if let Some(last) = self.last_timestamp {
            stats.last_dt = timestamp - last;
        }
        self.last_timestamp = Some(timestamp);
    }

    /// Call every task's `on_stop` once, in registration order.
    pub fn stop(&mut self, timestamp: f64) {
        if !self.running {
            return;
        }
        info!("Stopping {}", self.name);
        for slot in &mut self.slots {
            slot.task.on_stop(timestamp);
            slot.state = TaskState::Stopped;
        }
        self.running = false;
    }

    pub fn task_states(&self) -> Vec<(String, TaskState)> {
        self.slots
            .iter()
            .map(|slot| (slot.task.name().to_string(), slot.state))
            .collect()
    }

    pub fn stats(&self) -> LooperStats {
        self.stats
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
