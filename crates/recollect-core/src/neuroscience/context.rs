//! Encoding context
//!
//! Every memory records the part of day and weekday it was saved in. Queries
//! may name those cues ("monday morning", "yesterday") to narrow a search to
//! memories encoded in the same context.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// ============================================================================
// TIME OF DAY
// ============================================================================

/// Coarse part of the day a memory was encoded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    /// 05:00 - 11:59
    Morning,
    /// 12:00 - 16:59
    Afternoon,
    /// 17:00 - 20:59
    Evening,
    /// 21:00 - 04:59
    Night,
}

impl TimeOfDay {
    /// Query keywords, in match precedence order
    const KEYWORDS: [(&'static str, TimeOfDay); 4] = [
        ("morning", TimeOfDay::Morning),
        ("afternoon", TimeOfDay::Afternoon),
        ("evening", TimeOfDay::Evening),
        ("night", TimeOfDay::Night),
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=20 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Evening => "Evening",
            Self::Night => "Night",
        }
    }

    pub fn parse_name(s: &str) -> Option<Self> {
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| keyword.eq_ignore_ascii_case(s))
            .map(|(_, time)| *time)
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title-cased weekday name ("Monday")
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a full weekday name, case-insensitively
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    WEEKDAYS
        .into_iter()
        .find(|day| weekday_name(*day).eq_ignore_ascii_case(s))
}

// ============================================================================
// ENCODING CONTEXT
// ============================================================================

/// Context captured when a memory is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingContext {
    pub time_of_day: TimeOfDay,
    pub day_of_week: Weekday,
}

impl EncodingContext {
    /// Capture the context of `at`, read in its own time zone
    pub fn capture<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self {
            time_of_day: TimeOfDay::from_hour(at.hour()),
            day_of_week: at.weekday(),
        }
    }

    /// "Monday Morning"
    pub fn describe(&self) -> String {
        format!("{} {}", weekday_name(self.day_of_week), self.time_of_day)
    }
}

// ============================================================================
// QUERY CUES
// ============================================================================

/// Temporal cue found in a search query.
///
/// Either field may be absent; a cue is only produced when at least one is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextCue {
    pub time_of_day: Option<TimeOfDay>,
    pub day_of_week: Option<Weekday>,
}

impl ContextCue {
    pub fn is_empty(&self) -> bool {
        self.time_of_day.is_none() && self.day_of_week.is_none()
    }

    /// Whether a memory encoded in `context` satisfies this cue
    pub fn matches(&self, context: &EncodingContext) -> bool {
        self.time_of_day.is_none_or(|t| t == context.time_of_day)
            && self.day_of_week.is_none_or(|d| d == context.day_of_week)
    }

    /// "Friday Evening", "Monday", or "Unknown context"
    pub fn describe(&self) -> String {
        let parts: Vec<&str> = [
            self.day_of_week.map(weekday_name),
            self.time_of_day.as_ref().map(TimeOfDay::as_str),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            "Unknown context".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Detect temporal cues in `query`.
///
/// Matching is on lower-cased substrings. Part of day takes the first of
/// morning, afternoon, evening, night that appears. A weekday takes the first
/// name found in Monday-to-Sunday order. "yesterday" (or, failing that,
/// "last week") replaces any literal weekday with the weekday of `now` minus
/// one day (or seven days).
pub fn extract_context<Tz: TimeZone>(query: &str, now: &DateTime<Tz>) -> Option<ContextCue> {
    let lowered = query.to_lowercase();

    let time_of_day = TimeOfDay::KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, time)| *time);

    let mut day_of_week = WEEKDAYS
        .into_iter()
        .find(|day| lowered.contains(&weekday_name(*day).to_lowercase()));

    if lowered.contains("yesterday") {
        day_of_week = Some((now.clone() - Duration::days(1)).weekday());
    } else if lowered.contains("last week") {
        day_of_week = Some((now.clone() - Duration::days(7)).weekday());
    }

    let cue = ContextCue {
        time_of_day,
        day_of_week,
    };
    (!cue.is_empty()).then_some(cue)
}

/// Words of `query` that are not themselves temporal cues.
///
/// Used to build the text part of a context-filtered search, so "monday
/// meeting" searches for "meeting" among Monday memories.
pub fn strip_context_words(query: &str) -> Vec<&str> {
    let words: Vec<&str> = query.split_whitespace().collect();
    let bare = |w: &str| {
        w.trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase()
    };

    let mut kept = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        let word = bare(words[i]);
        if word == "last" && words.get(i + 1).is_some_and(|next| bare(next) == "week") {
            i += 2;
            continue;
        }
        let is_cue = word == "yesterday"
            || TimeOfDay::parse_name(&word).is_some()
            || parse_weekday(&word).is_some();
        if !is_cue {
            kept.push(words[i]);
        }
        i += 1;
    }
    kept
}
