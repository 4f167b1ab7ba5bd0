//! Fixed-interval scheduler for the polling actors.
//!
//! Every job fires on its own interval or when its wake handle is notified.
//! Each trigger spawns a guarded run, so a slow run makes later triggers skip
//! instead of queueing. Jobs are never awaited on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::actors::{Actor, RunOutcome};

mod guard;
pub mod uploads;

pub use guard::OverlapGuard;

struct ScheduledJob {
    actor: Arc<dyn Actor>,
    period: Duration,
    wake: Arc<Notify>,
}

pub struct Scheduler {
    guard: OverlapGuard,
    jobs: Vec<ScheduledJob>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            guard: OverlapGuard::new(),
            jobs: Vec::new(),
        }
    }

    /// Registers `actor` to run every `period`, plus whenever `wake` is notified.
    pub fn register(&mut self, actor: Arc<dyn Actor>, period: Duration, wake: Arc<Notify>) {
        info!(
            job = actor.name(),
            period_secs = period.as_secs_f64(),
            "Registered scheduled job"
        );
        self.jobs.push(ScheduledJob {
            actor,
            period,
            wake,
        });
    }

    /// Starts one timer task per job. The tasks run until aborted.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        let guard = self.guard;
        self.jobs
            .into_iter()
            .map(|job| tokio::spawn(run_job_timer(guard.clone(), job)))
            .collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job_timer(guard: OverlapGuard, job: ScheduledJob) {
    let mut ticker = tokio::time::interval(job.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = job.wake.notified() => debug!(job = job.actor.name(), "Woken early"),
        }

        let name = job.actor.name();
        if guard.is_running(name) {
            debug!(job = name, "Trigger skipped, previous run still in progress");
            continue;
        }

        let guard = guard.clone();
        let actor = job.actor.clone();
        tokio::spawn(async move {
            if let Some(outcome) = guard.run(name, || actor.run()).await {
                log_outcome(name, outcome);
            }
        });
    }
}

fn log_outcome(name: &str, outcome: RunOutcome) {
    match outcome {
        RunOutcome::Completed => info!(job = name, "Run completed"),
        RunOutcome::NoItemsFound => debug!(job = name, "Run found no work"),
        RunOutcome::Failed => info!(job = name, "Run failed, see automation log"),
    }
}
