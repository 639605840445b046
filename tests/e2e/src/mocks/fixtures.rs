//! Collaborator fakes for journey tests
//!
//! - `RecordingMessenger` keeps every delivery and can refuse channels
//! - `FailingIndex` fails every query

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use recollect_core::{
    Delivery, DeliveryError, FullTextIndex, IndexHit, IndexQuery, Messenger, StorageError,
};

/// Messenger that records deliveries in memory
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(i64, Delivery)>>,
    unreachable: HashSet<i64>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every delivery to `channel_id`
    pub fn with_unreachable(mut self, channel_id: i64) -> Self {
        self.unreachable.insert(channel_id);
        self
    }

    /// Everything delivered so far, in order
    pub fn sent(&self) -> Vec<(i64, Delivery)> {
        self.sent.lock().unwrap().clone()
    }

    /// Ids of memories delivered as review cards
    pub fn reviewed_ids(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|(_, delivery)| match delivery {
                Delivery::Review(card) => Some(card.memory.id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn deliver(&self, channel_id: i64, delivery: &Delivery) -> Result<(), DeliveryError> {
        if self.unreachable.contains(&channel_id) {
            return Err(DeliveryError::Unreachable(channel_id));
        }
        self.sent.lock().unwrap().push((channel_id, delivery.clone()));
        Ok(())
    }
}

/// Index whose every query fails
#[derive(Default)]
pub struct FailingIndex {
    calls: Mutex<Vec<IndexQuery>>,
}

impl FailingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries received so far
    pub fn calls(&self) -> Vec<IndexQuery> {
        self.calls.lock().unwrap().clone()
    }
}

impl FullTextIndex for FailingIndex {
    fn query(&self, query: &IndexQuery) -> recollect_core::Result<Vec<IndexHit>> {
        self.calls.lock().unwrap().push(query.clone());
        Err(StorageError::Init("index unavailable".to_string()))
    }
}
