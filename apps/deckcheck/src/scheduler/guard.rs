use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

/// Per-job busy flags. A job that is still running when its next trigger
/// fires is skipped. Different job names never block each other.
#[derive(Clone, Default)]
pub struct OverlapGuard {
    running: Arc<Mutex<HashMap<String, bool>>>,
}

/// Clears the busy flag when dropped, so a job that errors, panics or is
/// cancelled still frees its slot.
struct RunningSlot {
    running: Arc<Mutex<HashMap<String, bool>>>,
    name: String,
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            running.insert(self.name.clone(), false);
        }
        debug!(job = %self.name, "Job slot released");
    }
}

impl OverlapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_acquire(&self, name: &str) -> Option<RunningSlot> {
        let mut running = self.running.lock().ok()?;
        let busy = running.entry(name.to_string()).or_insert(false);
        if *busy {
            return None;
        }
        *busy = true;
        Some(RunningSlot {
            running: self.running.clone(),
            name: name.to_string(),
        })
    }

    /// Runs `job` unless a previous run of `name` is still in flight.
    /// Returns `None` when the run was skipped.
    pub async fn run<F, Fut, T>(&self, name: &str, job: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let Some(_slot) = self.try_acquire(name) else {
            info!(job = name, "Previous run still in progress, skipping");
            return None;
        };
        Some(job().await)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running
            .lock()
            .map(|running| running.get(name).copied().unwrap_or(false))
            .unwrap_or(false)
    }
}
