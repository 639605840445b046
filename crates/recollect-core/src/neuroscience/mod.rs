//! Encoding-time signals
//!
//! - Emotional weight scored from a fixed lexicon
//! - Encoding context (part of day, weekday) and query cues that refer to it

pub mod context;
pub mod emotional_memory;

pub use context::{
    ContextCue, EncodingContext, TimeOfDay, extract_context, parse_weekday, strip_context_words,
    weekday_name,
};
pub use emotional_memory::{EmotionCategory, SentimentScorer};
