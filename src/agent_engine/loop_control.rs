use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable flag that asks a running agent to stop before its next step.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Step budget and stop flag for one run.
pub struct LoopController {
    max_steps: u32,
    steps: u32,
    stop: StopHandle,
}

impl LoopController {
    pub fn new(max_steps: u32) -> Self {
        Self::with_stop_handle(max_steps, StopHandle::new())
    }

    pub fn with_stop_handle(max_steps: u32, stop: StopHandle) -> Self {
        Self {
            max_steps,
            steps: 0,
            stop,
        }
    }

    /// Counts a step and returns its 1-based number.
    pub fn begin_step(&mut self) -> u32 {
        self.steps += 1;
        self.steps
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn is_first_step(&self) -> bool {
        self.steps == 0
    }

    pub fn budget_exhausted(&self) -> bool {
        self.steps >= self.max_steps
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Zeroes the counter and re-arms the stop flag.
    pub fn reset(&mut self) {
        self.steps = 0;
        self.stop.clear();
    }
}
