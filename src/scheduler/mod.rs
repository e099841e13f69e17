// src/scheduler/mod.rs
//! Cron-driven background jobs, one tokio task per job.

pub mod cron;
pub mod jobs;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use metrics::counter;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::metrics::{ensure_described, JOB_RUNS};

pub use cron::{CronError, CronExpr};
pub use jobs::{
    DailyPickJob, EnrichmentReport, HealthProbeJob, Job, ProbeReport, WeeklyEnrichmentJob,
};

struct Entry {
    cron: CronExpr,
    job: Arc<dyn Job>,
}

pub struct Scheduler {
    tz: Tz,
    clock: Arc<dyn Clock>,
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new(tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            tz,
            clock,
            entries: Vec::new(),
        }
    }

    /// Register `job` under a 5-field cron expression evaluated in this scheduler's timezone.
    pub fn register(&mut self, expr: &str, job: Arc<dyn Job>) -> Result<(), CronError> {
        let cron = CronExpr::parse(expr)?;
        tracing::info!(target: "scheduler", job = job.name(), cron = expr, tz = %self.tz, "job registered");
        self.entries.push(Entry { cron, job });
        Ok(())
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.job.name()).collect()
    }

    /// Start every registered job on its own task.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        ensure_described();
        let tz = self.tz;
        self.entries
            .into_iter()
            .map(|entry| {
                let clock = Arc::clone(&self.clock);
                tokio::spawn(run_loop(entry, tz, clock))
            })
            .collect()
    }
}

async fn run_loop(entry: Entry, tz: Tz, clock: Arc<dyn Clock>) {
    let name = entry.job.name();
    let mut last: Option<DateTime<Utc>> = None;
    loop {
        let now = clock.now();
        // Never fire the same slot twice if we woke before the wall clock caught up.
        let base = last.map_or(now, |l| l.max(now));
        let next = match entry.cron.next_after(base, tz) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(target: "scheduler", job = name, error = %e, "job stopped");
                return;
            }
        };
        let wait = (next - base).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        last = Some(next);

        match entry.job.run(next).await {
            Ok(()) => {
                counter!(JOB_RUNS, "job" => name, "outcome" => "ok").increment(1);
            }
            Err(e) => {
                tracing::warn!(target: "scheduler", job = name, error = %e, "job failed");
                counter!(JOB_RUNS, "job" => name, "outcome" => "error").increment(1);
            }
        }
    }
}
