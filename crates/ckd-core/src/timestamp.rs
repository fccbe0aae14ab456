//! Canonical "order placed at" timestamps and the ordered parse chain that produces them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `YYYY-MM-DD HH:MM:SS`, no timezone.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedFormat {
    pub name: &'static str,
    pub pattern: &'static str,
}

/// Explicit formats tried in order; the first one that consumes the whole string wins.
pub const ORDER_PLACED_AT_FORMATS: [NamedFormat; 4] = [
    NamedFormat {
        name: "primary",
        pattern: "%I:%M %p, %B %d %Y",
    },
    NamedFormat {
        name: "primary-comma",
        pattern: "%I:%M %p, %B %d, %Y",
    },
    NamedFormat {
        name: "iso-seconds",
        pattern: "%Y-%m-%d %H:%M:%S",
    },
    NamedFormat {
        name: "day-first-dashed",
        pattern: "%d-%m-%Y %H:%M:%S",
    },
];

/// Layouts of the terminal best-effort step. Tried only after every named format fails.
const BEST_EFFORT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%B %d %Y %I:%M %p",
    "%B %d, %Y %I:%M %p",
    "%I:%M %p %B %d %Y",
];

const BEST_EFFORT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

/// Which step of the chain produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Format(&'static str),
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalTimestamp(NaiveDateTime);

impl CanonicalTimestamp {
    pub fn new(value: NaiveDateTime) -> Self {
        Self(value)
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Strict parse of the canonical text form only.
    pub fn parse_canonical(input: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(input.trim(), CANONICAL_FORMAT)
            .ok()
            .map(Self)
    }

    /// Re-run the rendered value through the full chain. Used right before values leave the process.
    pub fn renormalized(&self) -> Option<Self> {
        normalize_order_placed_at(&self.to_string())
    }
}

impl fmt::Display for CanonicalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}

impl FromStr for CanonicalTimestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_order_placed_at(s).ok_or_else(|| format!("unrecognised timestamp: {s}"))
    }
}

impl Serialize for CanonicalTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CanonicalTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Run the full chain and report which step matched. `None` means unknown.
pub fn parse_order_placed_at(raw: &str) -> Option<(CanonicalTimestamp, MatchedBy)> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for format in ORDER_PLACED_AT_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(s, format.pattern) {
            return Some((CanonicalTimestamp(value), MatchedBy::Format(format.name)));
        }
    }

    best_effort_parse(s).map(|value| (CanonicalTimestamp(value), MatchedBy::BestEffort))
}

pub fn normalize_order_placed_at(raw: &str) -> Option<CanonicalTimestamp> {
    parse_order_placed_at(raw).map(|(value, _)| value)
}

/// Terminal fallback. Offset-bearing input is converted to UTC wall time.
pub fn best_effort_parse(s: &str) -> Option<NaiveDateTime> {
    if let Ok(value) = DateTime::parse_from_rfc3339(s) {
        return Some(value.naive_utc());
    }
    if let Ok(value) = DateTime::parse_from_rfc2822(s) {
        return Some(value.naive_utc());
    }
    if let Some(value) = BEST_EFFORT_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(value);
    }
    BEST_EFFORT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
