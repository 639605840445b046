//! Background loops sharing one store

use std::sync::Arc;

use recollect_core::{
    ConsolidationScheduler, ConsolidationSweep, MemoryStore, Messenger, ReviewCalculator,
    ReviewDispatcher,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DaemonConfig;

/// Running dispatch and consolidation loops
pub struct BackgroundService {
    cancel: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundService {
    /// Spawn both loops. Must be called inside a Tokio runtime.
    pub fn start<S, M>(store: S, messenger: M, config: &DaemonConfig) -> Self
    where
        S: MemoryStore + Clone + 'static,
        M: Messenger + 'static,
    {
        let cancel = CancellationToken::new();
        let calculator = ReviewCalculator::with_config(config.review_schedule.clone());

        let dispatcher = Arc::new(
            ReviewDispatcher::new(store.clone(), messenger, calculator)
                .with_config(config.dispatch.clone()),
        );
        let scheduler = ConsolidationScheduler::new(
            ConsolidationSweep::new(store).with_config(config.consolidation.clone()),
        );

        let handles = vec![
            ("dispatch", dispatcher.spawn(cancel.child_token())),
            ("consolidation", scheduler.spawn(cancel.child_token())),
        ];
        info!(
            dispatch_period_secs = config.dispatch.period.as_secs(),
            consolidation_at = %config.consolidation.run_at,
            "Background loops started"
        );

        Self { cancel, handles }
    }

    /// Token that stops every loop when cancelled
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal both loops and wait for them. Work already in progress finishes.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Background task ended abnormally");
            }
        }
        info!("Background loops stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::ConsoleMessenger;
    use chrono::{Duration, Utc};
    use recollect_core::{SaveInput, Storage};
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn test_start_delivers_due_memories_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Storage::new(Some(dir.path().join("service.db"))).unwrap());
        let memory = storage
            .save_at(
                SaveInput::new(1, 1, "renew passport"),
                &(Utc::now() - Duration::days(3)),
            )
            .unwrap();

        let mut config = DaemonConfig::default();
        config.dispatch.delivery_delay = StdDuration::ZERO;

        let messenger = Arc::new(ConsoleMessenger::new(Vec::new()));
        let service = BackgroundService::start(storage.clone(), messenger.clone(), &config);

        // The first dispatch tick fires immediately
        let mut reviewed = false;
        for _ in 0..100 {
            if storage.get(&memory.id).unwrap().unwrap().review_count == 1 {
                reviewed = true;
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
        service.shutdown().await;

        assert!(reviewed);
        let messenger = Arc::try_unwrap(messenger).ok().unwrap();
        let text = String::from_utf8(messenger.into_inner()).unwrap();
        assert!(text.contains("renew passport"));
    }

    #[tokio::test]
    async fn test_shutdown_is_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Storage::new(Some(dir.path().join("service.db"))).unwrap());
        let service = BackgroundService::start(
            storage,
            Arc::new(ConsoleMessenger::new(Vec::new())),
            &DaemonConfig::default(),
        );

        tokio::time::timeout(StdDuration::from_secs(5), service.shutdown())
            .await
            .unwrap();
    }
}
