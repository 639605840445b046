//! Search module
//!
//! - Keyword term construction (escaping, wildcards, operators)
//! - The full-text index seam
//! - Relevance ranking on top of index scores
//! - The cascade that tries progressively looser query shapes

pub mod cascade;
pub mod index;
pub mod keyword;
pub mod ranker;

pub use cascade::{
    CASCADE, CascadeOutcome, CascadeSearch, DEFAULT_CANDIDATE_POOL, DEFAULT_SEARCH_LIMIT,
    SearchPage, SearchQuery, Strategy, plan,
};
pub use index::{FullTextIndex, IndexHit, IndexQuery};
pub use keyword::{exact_phrase, normalize_term};
pub use ranker::{RankedMemory, RankingWeights, RelevanceRanker};
