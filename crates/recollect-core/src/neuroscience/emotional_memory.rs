//! # Emotional Weighting
//!
//! Scores how emotionally salient a note is at save time. The weight feeds
//! search ranking (salient memories outrank neutral ones) and review
//! scheduling (salient memories are reviewed less often and forgotten more
//! slowly).
//!
//! Scoring is a plain lexicon lookup: two fixed tables of positive and
//! negative words, each mapped to an intensity. Polarity is not kept; only
//! intensity matters for recall.
//!
//! ## Usage
//!
//! ```rust
//! use recollect_core::neuroscience::{EmotionCategory, SentimentScorer};
//!
//! let scorer = SentimentScorer::new();
//! let weight = scorer.score("Amazing day at work! #win");
//! assert!(weight >= 0.7);
//! assert!(EmotionCategory::from_weight(weight) >= EmotionCategory::Strong);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Characters trimmed from each token before lookup
const TOKEN_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Weight for content that is present but matched nothing
const BASELINE_WEIGHT: f64 = 0.1;

/// Long unmatched entries are presumed significant
const LONG_ENTRY_TOKENS: usize = 50;
const LONG_ENTRY_WEIGHT: f64 = 0.3;

/// Unmatched entries with repeated exclamation marks
const EXCLAMATION_THRESHOLD: usize = 2;
const EXCLAMATION_WEIGHT: f64 = 0.5;

/// More than this many matches compounds the average
const COMPOUND_MATCHES: usize = 2;
const COMPOUND_BOOST: f64 = 1.2;

const POSITIVE_LEXICON: &[(&str, f64)] = &[
    ("amazing", 0.9),
    ("excellent", 0.8),
    ("wonderful", 0.8),
    ("great", 0.7),
    ("love", 0.8),
    ("happy", 0.7),
    ("excited", 0.8),
    ("success", 0.7),
    ("achievement", 0.8),
    ("proud", 0.7),
    ("fantastic", 0.9),
    ("brilliant", 0.8),
    ("perfect", 0.8),
    ("awesome", 0.8),
    ("incredible", 0.9),
    ("beautiful", 0.7),
    ("joy", 0.8),
    ("celebrate", 0.7),
    ("win", 0.7),
    ("victory", 0.8),
];

const NEGATIVE_LEXICON: &[(&str, f64)] = &[
    ("terrible", 0.9),
    ("horrible", 0.9),
    ("awful", 0.8),
    ("bad", 0.6),
    ("hate", 0.8),
    ("angry", 0.7),
    ("sad", 0.7),
    ("failure", 0.8),
    ("disappointed", 0.7),
    ("frustrated", 0.7),
    ("crisis", 0.9),
    ("disaster", 0.9),
    ("worried", 0.7),
    ("anxious", 0.7),
    ("stress", 0.7),
    ("fear", 0.8),
    ("panic", 0.8),
    ("upset", 0.7),
    ("miserable", 0.8),
    ("devastating", 0.9),
];

// ============================================================================
// TYPES
// ============================================================================

/// Display bucket for an emotional weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionCategory {
    Neutral,
    Moderate,
    Strong,
    Intense,
}

impl EmotionCategory {
    pub fn from_weight(weight: f64) -> Self {
        if weight < 0.3 {
            Self::Neutral
        } else if weight < 0.6 {
            Self::Moderate
        } else if weight < 0.8 {
            Self::Strong
        } else {
            Self::Intense
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "Neutral",
            Self::Moderate => "Moderate",
            Self::Strong => "Strong",
            Self::Intense => "Intense",
        }
    }
}

impl std::fmt::Display for EmotionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SCORER
// ============================================================================

/// Lexicon-based emotional weight scorer
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    lexicon: HashMap<&'static str, f64>,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer {
    /// Create a scorer over the built-in positive and negative lexicons
    pub fn new() -> Self {
        let lexicon = POSITIVE_LEXICON
            .iter()
            .chain(NEGATIVE_LEXICON)
            .copied()
            .collect();
        Self { lexicon }
    }

    /// Emotional weight of `content`, always in [0, 1].
    ///
    /// Empty content scores exactly 0.0, distinct from the 0.1 baseline of
    /// plain text.
    pub fn score(&self, content: &str) -> f64 {
        if content.is_empty() {
            return 0.0;
        }

        let mut total = 0.0;
        let mut matches = 0usize;
        let mut tokens = 0usize;

        for raw in content.split_whitespace() {
            tokens += 1;
            let token = raw.trim_matches(TOKEN_PUNCTUATION).to_lowercase();
            if let Some(intensity) = self.lexicon.get(token.as_str()) {
                total += intensity;
                matches += 1;
            }
        }

        if matches == 0 {
            if tokens > LONG_ENTRY_TOKENS {
                return LONG_ENTRY_WEIGHT;
            }
            if content.matches('!').count() >= EXCLAMATION_THRESHOLD {
                return EXCLAMATION_WEIGHT;
            }
            return BASELINE_WEIGHT;
        }

        let mut weight = total / matches as f64;
        if matches > COMPOUND_MATCHES {
            weight *= COMPOUND_BOOST;
        }
        weight.clamp(0.0, 1.0)
    }

    /// Score and bucket in one call
    pub fn categorize(&self, content: &str) -> (f64, EmotionCategory) {
        let weight = self.score(content);
        (weight, EmotionCategory::from_weight(weight))
    }
}

// ============================================================================
// TESTS
// ============================================================================
