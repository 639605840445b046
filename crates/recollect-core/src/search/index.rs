//! Full-text index seam
//!
//! The cascade only talks to the index through [`FullTextIndex`], so any
//! engine with prefix, AND, OR, phrase and NEAR support can back it.

use serde::{Deserialize, Serialize};

use crate::memory::Memory;
use crate::neuroscience::ContextCue;
use crate::storage::Result;

/// One query against the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuery {
    pub owner_id: i64,
    /// FTS5 match expression. Empty with a context filter means
    /// "every memory in that context".
    pub term: String,
    /// Equality filter on the stored encoding context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextCue>,
    pub limit: usize,
    pub offset: usize,
}

/// A matching memory with the engine's relevance score.
///
/// `native_score` is higher-is-better; implementations whose engine scores
/// lower-is-better must flip the sign before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub memory: Memory,
    pub native_score: f64,
}

/// Full-text index over stored memories
pub trait FullTextIndex: Send + Sync {
    fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>>;
}

impl<T: FullTextIndex + ?Sized> FullTextIndex for std::sync::Arc<T> {
    fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>> {
        (**self).query(query)
    }
}
