//! Cascade search
//!
//! A loose query is tried against the index as a series of increasingly
//! permissive shapes, narrowest first, stopping at the first shape that
//! matches anything. The shapes live in one ordered table ([`CASCADE`]) of
//! pure term builders so the order itself is data.
//!
//! Search never fails: an index error on one attempt is logged and treated
//! as zero hits, and exhausting the table yields an empty result.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::memory::Memory;
use crate::neuroscience::{ContextCue, extract_context, strip_context_words};

use super::index::{FullTextIndex, IndexQuery};
use super::keyword::{
    PROXIMITY_DISTANCE, all_words_term, any_word_term, normalize_term, proximity_term,
    query_words, wildcard_word,
};
use super::ranker::{RankedMemory, RelevanceRanker};

/// Candidates pulled from the index per attempt before re-ranking
pub const DEFAULT_CANDIDATE_POOL: usize = 100;

/// Page size when the caller does not pick one
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Minimum word length for prefix and per-word fallbacks
const MIN_PARTIAL_LEN: usize = 3;

// ============================================================================
// QUERY TYPES
// ============================================================================

/// A search request from one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub owner_id: i64,
    pub keyword: String,
    pub limit: usize,
    pub offset: usize,
}

impl SearchQuery {
    pub fn new(owner_id: i64, keyword: impl Into<String>) -> Self {
        Self {
            owner_id,
            keyword: keyword.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Query shapes, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// `#tag` lookup on the tags column
    HashtagExact,
    /// Keyword filtered by the encoding context named in the query
    Contextual,
    /// Every word as a prefix, implicit AND
    PrimaryWildcard,
    /// First three letters of a single word
    FuzzyPrefix,
    /// Every word as a prefix, explicit AND
    StrictAnd,
    /// Each word on its own
    PerWordPartial,
    /// Any word
    AnyWord,
    /// All words within a few tokens of each other
    Proximity,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HashtagExact => "hashtag_exact",
            Self::Contextual => "contextual",
            Self::PrimaryWildcard => "primary_wildcard",
            Self::FuzzyPrefix => "fuzzy_prefix",
            Self::StrictAnd => "strict_and",
            Self::PerWordPartial => "per_word_partial",
            Self::AnyWord => "any_word",
            Self::Proximity => "proximity",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed view of a keyword shared by every term builder
#[derive(Debug, Clone)]
pub struct QueryShape<'a> {
    /// Trimmed keyword
    pub raw: &'a str,
    /// Words that can produce index tokens
    pub words: Vec<&'a str>,
    pub cue: Option<ContextCue>,
}

impl<'a> QueryShape<'a> {
    pub fn parse<Tz: TimeZone>(keyword: &'a str, now: &DateTime<Tz>) -> Self {
        let raw = keyword.trim();
        Self {
            raw,
            words: query_words(raw),
            cue: extract_context(raw, now),
        }
    }

    pub fn is_hashtag(&self) -> bool {
        self.raw.starts_with('#')
    }
}

/// One index call: a match term and an optional context filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub term: String,
    pub context: Option<ContextCue>,
}

impl Attempt {
    fn term(term: String) -> Self {
        Self {
            term,
            context: None,
        }
    }
}

// ============================================================================
// STRATEGY TABLE
// ============================================================================

type TermBuilder = fn(&QueryShape<'_>) -> Vec<Attempt>;

/// The cascade, narrowest first
pub const CASCADE: &[(Strategy, TermBuilder)] = &[
    (Strategy::HashtagExact, hashtag_exact),
    (Strategy::Contextual, contextual),
    (Strategy::PrimaryWildcard, primary_wildcard),
    (Strategy::FuzzyPrefix, fuzzy_prefix),
    (Strategy::StrictAnd, strict_and),
    (Strategy::PerWordPartial, per_word_partial),
    (Strategy::AnyWord, any_word),
    (Strategy::Proximity, proximity),
];

fn non_empty(term: String) -> Vec<Attempt> {
    if term.is_empty() {
        Vec::new()
    } else {
        vec![Attempt::term(term)]
    }
}

fn hashtag_exact(shape: &QueryShape<'_>) -> Vec<Attempt> {
    if shape.is_hashtag() {
        vec![Attempt::term(shape.raw.to_string())]
    } else {
        Vec::new()
    }
}

/// The whole keyword under the cue filter, then the keyword without its cue
/// words when any text remains.
fn contextual(shape: &QueryShape<'_>) -> Vec<Attempt> {
    let Some(cue) = shape.cue else {
        return Vec::new();
    };
    let filtered = |term: String| Attempt {
        term,
        context: Some(cue),
    };

    let whole = normalize_term(shape.raw);
    let remainder = normalize_term(&strip_context_words(shape.raw).join(" "));

    let mut attempts = Vec::with_capacity(2);
    if !whole.is_empty() {
        attempts.push(filtered(whole.clone()));
    }
    if !remainder.is_empty() && remainder != whole {
        attempts.push(filtered(remainder));
    }
    attempts
}

fn primary_wildcard(shape: &QueryShape<'_>) -> Vec<Attempt> {
    non_empty(normalize_term(shape.raw))
}

fn fuzzy_prefix(shape: &QueryShape<'_>) -> Vec<Attempt> {
    match shape.words.as_slice() {
        [word] if word.chars().count() >= MIN_PARTIAL_LEN => {
            let prefix: String = word.chars().take(MIN_PARTIAL_LEN).collect();
            non_empty(wildcard_word(&prefix))
        }
        _ => Vec::new(),
    }
}

fn strict_and(shape: &QueryShape<'_>) -> Vec<Attempt> {
    non_empty(all_words_term(&shape.words))
}

fn per_word_partial(shape: &QueryShape<'_>) -> Vec<Attempt> {
    shape
        .words
        .iter()
        .filter(|w| w.chars().count() >= MIN_PARTIAL_LEN)
        .map(|w| wildcard_word(w))
        .filter(|t| !t.is_empty())
        .map(Attempt::term)
        .collect()
}

fn any_word(shape: &QueryShape<'_>) -> Vec<Attempt> {
    if shape.words.len() < 2 {
        return Vec::new();
    }
    non_empty(any_word_term(&shape.words))
}

fn proximity(shape: &QueryShape<'_>) -> Vec<Attempt> {
    if shape.words.len() < 2 {
        return Vec::new();
    }
    non_empty(proximity_term(&shape.words, PROXIMITY_DISTANCE))
}

/// Every attempt the cascade would make for `keyword`, in order, with
/// duplicates of earlier attempts removed
pub fn plan<Tz: TimeZone>(keyword: &str, now: &DateTime<Tz>) -> Vec<(Strategy, Attempt)> {
    let shape = QueryShape::parse(keyword, now);
    if shape.raw.is_empty() {
        return Vec::new();
    }

    let mut planned: Vec<(Strategy, Attempt)> = Vec::new();
    for (strategy, build) in CASCADE {
        for attempt in build(&shape) {
            if planned.iter().any(|(_, seen)| *seen == attempt) {
                continue;
            }
            planned.push((*strategy, attempt));
        }
    }
    planned
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// Result of one cascade run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeOutcome {
    pub results: Vec<RankedMemory>,
    /// Strategy that produced the results, `None` when nothing matched
    pub strategy: Option<Strategy>,
}

impl CascadeOutcome {
    pub fn memories(&self) -> Vec<Memory> {
        self.results.iter().map(|r| r.memory.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub results: Vec<RankedMemory>,
    pub has_more: bool,
    pub strategy: Option<Strategy>,
}

/// Drives the cascade against a full-text index
pub struct CascadeSearch<I> {
    index: I,
    ranker: RelevanceRanker,
    candidate_pool: usize,
}

impl<I: FullTextIndex> CascadeSearch<I> {
    pub fn new(index: I) -> Self {
        Self {
            index,
            ranker: RelevanceRanker::default(),
            candidate_pool: DEFAULT_CANDIDATE_POOL,
        }
    }

    pub fn with_ranker(mut self, ranker: RelevanceRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_candidate_pool(mut self, pool: usize) -> Self {
        self.candidate_pool = pool.max(1);
        self
    }

    /// Search relative to the current local time
    pub fn search(&self, query: &SearchQuery) -> CascadeOutcome {
        self.search_at(query, &Local::now())
    }

    /// Search with an explicit clock.
    ///
    /// Relative cues ("yesterday") resolve in `now`'s time zone. Each attempt
    /// pulls a candidate pool from the index, re-ranks it, then slices out
    /// the requested page, so pages stay consistent with the combined order.
    pub fn search_at<Tz: TimeZone>(&self, query: &SearchQuery, now: &DateTime<Tz>) -> CascadeOutcome {
        let now_utc = now.with_timezone(&Utc);
        let pool = query.offset.saturating_add(query.limit).max(self.candidate_pool);

        for (strategy, attempt) in plan(&query.keyword, now) {
            let index_query = IndexQuery {
                owner_id: query.owner_id,
                term: attempt.term,
                context: attempt.context,
                limit: pool,
                offset: 0,
            };

            let hits = match self.index.query(&index_query) {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(
                        owner_id = query.owner_id,
                        strategy = %strategy,
                        term = %index_query.term,
                        error = %e,
                        "Index query failed, trying next strategy"
                    );
                    continue;
                }
            };

            debug!(
                owner_id = query.owner_id,
                strategy = %strategy,
                term = %index_query.term,
                hits = hits.len(),
                "Cascade attempt"
            );
            if hits.is_empty() {
                continue;
            }

            let results: Vec<RankedMemory> = self
                .ranker
                .rank(hits, now_utc)
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .collect();

            info!(
                owner_id = query.owner_id,
                strategy = %strategy,
                hits = results.len(),
                "Search matched"
            );
            return CascadeOutcome {
                results,
                strategy: Some(strategy),
            };
        }

        debug!(owner_id = query.owner_id, "Search exhausted every strategy");
        CascadeOutcome::default()
    }

    /// One page plus whether another page exists
    pub fn search_page(&self, query: &SearchQuery) -> SearchPage {
        self.search_page_at(query, &Local::now())
    }

    pub fn search_page_at<Tz: TimeZone>(&self, query: &SearchQuery, now: &DateTime<Tz>) -> SearchPage {
        let probe = query.clone().with_limit(query.limit.saturating_add(1));
        let mut outcome = self.search_at(&probe, now);
        let has_more = outcome.results.len() > query.limit;
        outcome.results.truncate(query.limit);

        SearchPage {
            results: outcome.results,
            has_more,
            strategy: outcome.strategy,
        }
    }
}
