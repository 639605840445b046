//! Review dispatch
//!
//! A periodic job that pulls due memories, groups them by owner and sends
//! each owner a short review session through the [`Messenger`]. A memory is
//! only marked reviewed after its delivery succeeded, so a failed send
//! leaves it due for the next tick.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::memory::Memory;
use crate::neuroscience::EmotionCategory;
use crate::storage::MemoryStore;

use super::interval::ReviewCalculator;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Review dispatch loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Time between ticks
    pub period: Duration,
    /// Most memories delivered to one owner per tick
    pub session_size: usize,
    /// Pause between two deliveries
    pub delivery_delay: Duration,
    /// Most due memories fetched per tick across all owners
    pub batch_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60 * 60),
            session_size: 5,
            delivery_delay: Duration::from_millis(500),
            batch_limit: 50,
        }
    }
}

// ============================================================================
// MESSAGING
// ============================================================================

/// What the messenger is asked to show for one due memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub memory: Memory,
    /// Forgetting-curve retention at delivery time
    pub retention: f64,
    pub urgent: bool,
    pub emotion: EmotionCategory,
    /// When the memory comes back after this review ("in 3 days")
    pub next_review: String,
}

impl ReviewCard {
    pub fn new(calculator: &ReviewCalculator, memory: Memory, now: DateTime<Utc>) -> Self {
        let after_review = calculator.mark_reviewed(&memory, now);
        Self {
            retention: calculator.retention(&memory, now),
            urgent: calculator.needs_urgent_review(&memory, now),
            emotion: EmotionCategory::from_weight(memory.emotional_weight),
            next_review: calculator.describe_next_review(&after_review, now),
            memory,
        }
    }
}

/// One message of a review session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Delivery {
    /// Session header with the owner's due count
    SessionStarted { owner_id: i64, due: usize },
    Review(ReviewCard),
    /// Due memories held back for a later tick
    Remaining { owner_id: i64, count: usize },
    SessionFinished { owner_id: i64, delivered: usize },
}

/// Messenger failure
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Channel {0} is unreachable")]
    Unreachable(i64),
    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Outbound messaging collaborator
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver one message to a channel.
    ///
    /// Formatting, chunking and retries are the implementation's concern.
    async fn deliver(&self, channel_id: i64, delivery: &Delivery) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T: Messenger + ?Sized> Messenger for Arc<T> {
    async fn deliver(&self, channel_id: i64, delivery: &Delivery) -> Result<(), DeliveryError> {
        (**self).deliver(channel_id, delivery).await
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Outcome of one dispatch tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub owners: usize,
    pub delivered: usize,
    /// Due but beyond an owner's session size
    pub deferred: usize,
    /// Delivery or bookkeeping failed; still due
    pub failed: usize,
    pub duration_ms: i64,
}

/// Sends due memories to their owners on a fixed period
pub struct ReviewDispatcher<S, M> {
    store: S,
    messenger: M,
    calculator: ReviewCalculator,
    config: DispatchConfig,
}

impl<S, M> ReviewDispatcher<S, M>
where
    S: MemoryStore + 'static,
    M: Messenger + 'static,
{
    pub fn new(store: S, messenger: M, calculator: ReviewCalculator) -> Self {
        Self {
            store,
            messenger,
            calculator,
            config: DispatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run one tick at `now`.
    ///
    /// Never fails: store and messenger errors are logged and counted.
    pub async fn run_once(&self, now: DateTime<Utc>) -> DispatchReport {
        let started = Instant::now();
        let mut report = DispatchReport::default();

        let due = match self
            .store
            .due_for_review(&self.calculator, now, self.config.batch_limit)
        {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "Failed to load due memories");
                return report;
            }
        };

        let mut by_owner: BTreeMap<i64, Vec<Memory>> = BTreeMap::new();
        for memory in due {
            by_owner.entry(memory.owner_id).or_default().push(memory);
        }

        for (owner_id, memories) in by_owner {
            report.owners += 1;
            self.run_session(owner_id, memories, now, &mut report).await;
        }

        report.duration_ms = started.elapsed().as_millis() as i64;
        report
    }

    async fn run_session(
        &self,
        owner_id: i64,
        mut memories: Vec<Memory>,
        now: DateTime<Utc>,
        report: &mut DispatchReport,
    ) {
        let Some(channel_id) = memories.first().map(|m| m.channel_id) else {
            return;
        };
        let due = memories.len();
        let held_back = due.saturating_sub(self.config.session_size);
        memories.truncate(self.config.session_size);

        let header = Delivery::SessionStarted { owner_id, due };
        if let Err(e) = self.messenger.deliver(channel_id, &header).await {
            warn!(owner_id, error = %e, "Review session could not start");
            report.failed += memories.len();
            report.deferred += held_back;
            return;
        }

        let mut delivered = 0;
        for (i, memory) in memories.into_iter().enumerate() {
            if i > 0 && !self.config.delivery_delay.is_zero() {
                tokio::time::sleep(self.config.delivery_delay).await;
            }

            let memory_id = memory.id.clone();
            let destination = memory.channel_id;
            let card = ReviewCard::new(&self.calculator, memory, now);
            let reviewed = self.calculator.mark_reviewed(&card.memory, now);

            if let Err(e) = self
                .messenger
                .deliver(destination, &Delivery::Review(card))
                .await
            {
                warn!(owner_id, memory_id = %memory_id, error = %e, "Review delivery failed");
                report.failed += 1;
                continue;
            }

            match self.store.record_review(&reviewed) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(owner_id, memory_id = %memory_id, error = %e, "Failed to record review");
                    report.failed += 1;
                }
            }
        }
        report.delivered += delivered;

        if held_back > 0 {
            report.deferred += held_back;
            let remaining = Delivery::Remaining {
                owner_id,
                count: held_back,
            };
            if let Err(e) = self.messenger.deliver(channel_id, &remaining).await {
                debug!(owner_id, error = %e, "Remaining count not delivered");
            }
        }

        let footer = Delivery::SessionFinished {
            owner_id,
            delivered,
        };
        if let Err(e) = self.messenger.deliver(channel_id, &footer).await {
            debug!(owner_id, error = %e, "Session footer not delivered");
        }
    }

    /// Start the periodic loop.
    ///
    /// The first tick runs immediately. Cancellation is only observed
    /// between ticks, so a session in progress always finishes.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.config.period.max(Duration::from_secs(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(period_secs = period.as_secs(), "Review dispatcher started");
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let report = self.run_once(Utc::now()).await;
                info!(
                    owners = report.owners,
                    delivered = report.delivered,
                    deferred = report.deferred,
                    failed = report.failed,
                    duration_ms = report.duration_ms,
                    "Review dispatch tick"
                );
            }
            info!("Review dispatcher stopped");
        })
    }
}
