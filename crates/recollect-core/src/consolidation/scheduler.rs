//! Daily consolidation trigger

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::sleep::ConsolidationSweep;
use crate::storage::MemoryStore;

/// Wait used when the next run time cannot be resolved
const FALLBACK_WAIT: StdDuration = StdDuration::from_secs(60);

/// First occurrence of the local wall-clock time `at` strictly after `now`.
///
/// A time skipped by a DST jump on one day moves to the next day.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    now.clone() + Duration::days(1)
}

/// Runs a [`ConsolidationSweep`] once a day at its configured local time
pub struct ConsolidationScheduler<S> {
    sweep: Arc<ConsolidationSweep<S>>,
}

impl<S: MemoryStore + 'static> ConsolidationScheduler<S> {
    pub fn new(sweep: ConsolidationSweep<S>) -> Self {
        Self {
            sweep: Arc::new(sweep),
        }
    }

    /// Run the sweep immediately on a blocking thread
    pub async fn run_now(&self) -> Option<super::ConsolidationReport> {
        let sweep = Arc::clone(&self.sweep);
        match tokio::task::spawn_blocking(move || sweep.run(Utc::now())).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Consolidation task failed");
                None
            }
        }
    }

    /// Loop until `cancel` fires. A sweep already in progress finishes first.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let run_at = self.sweep.config().run_at;
            loop {
                let now = Local::now();
                let next = next_run_after(&now, run_at);
                let wait = (next.clone() - now).to_std().unwrap_or(FALLBACK_WAIT);
                info!(next_run = %next.to_rfc3339(), "Consolidation scheduled");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                self.run_now().await;
            }
            info!("Consolidation scheduler stopped");
        })
    }
}
