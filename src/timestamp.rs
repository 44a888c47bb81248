//! Author and committer timestamps.
//!
//! A git timestamp is an absolute instant (seconds since the epoch) plus the
//! UTC offset the author's clock showed at that moment. The offset is part of
//! the hashed commit bytes, so it is kept exactly as recorded, `-0000`
//! included, rather than being recomputed from the local timezone.
//!
//! The human-readable form used for directory names and `commit-time.txt` is
//! a fixed-width local date-time in the commit's own offset followed by the
//! offset itself:
//!
//! ```text
//! 2021-03-04_05-06-07+0100
//! ```
//!
//! Parsing that text recovers the instant and the offset exactly, so a
//! disassemble/assemble cycle reproduces the original bytes.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDateTime};
use regex::Regex;

/// `strftime` pattern for the date-time part of the text form.
const LOCAL_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Number of bytes in the text form (`YYYY-MM-DD_HH-MM-SS±hhmm`).
pub const TEXT_WIDTH: usize = 24;

fn text_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2})([+-]\d{4})")
            .expect("timestamp pattern is valid")
    })
}

/// A UTC offset as written in a commit header, e.g. `+0530`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Offset {
    negative: bool,
    hours: u32,
    minutes: u32,
}

impl Offset {
    /// The `+0000` offset.
    pub const UTC: Offset = Offset {
        negative: false,
        hours: 0,
        minutes: 0,
    };

    /// Offset east of UTC in seconds.
    pub fn seconds_east(&self) -> i64 {
        let magnitude = i64::from(self.hours) * 3600 + i64::from(self.minutes) * 60;
        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

impl FromStr for Offset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 || !bytes[1..].iter().all(u8::is_ascii_digit) {
            return Err(format!("invalid UTC offset '{}'", s));
        }
        let negative = match bytes[0] {
            b'+' => false,
            b'-' => true,
            _ => return Err(format!("invalid UTC offset '{}'", s)),
        };
        let hours = s[1..3].parse().map_err(|_| format!("invalid UTC offset '{}'", s))?;
        let minutes = s[3..5].parse().map_err(|_| format!("invalid UTC offset '{}'", s))?;
        Ok(Offset {
            negative,
            hours,
            minutes,
        })
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { '-' } else { '+' };
        write!(f, "{}{:02}{:02}", sign, self.hours, self.minutes)
    }
}

/// An instant with the offset it was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub seconds: i64,
    pub offset: Offset,
}

impl Timestamp {
    pub fn new(seconds: i64, offset: Offset) -> Self {
        Self { seconds, offset }
    }

    /// Parse the two header tokens `<seconds> <offset>`.
    pub fn from_raw(seconds: &str, offset: &str) -> Result<Self, String> {
        let seconds = seconds
            .parse::<i64>()
            .map_err(|_| format!("invalid timestamp '{}'", seconds))?;
        Ok(Self::new(seconds, offset.parse()?))
    }

    /// Render as the header tokens `<seconds> <offset>`.
    pub fn to_raw(&self) -> String {
        format!("{} {}", self.seconds, self.offset)
    }

    /// Render as `YYYY-MM-DD_HH-MM-SS±hhmm` in the recorded offset.
    ///
    /// Returns `None` when the local year does not fit in four digits, since
    /// the text would not parse back.
    pub fn to_text(&self) -> Option<String> {
        let local = DateTime::from_timestamp(self.seconds.checked_add(self.offset.seconds_east())?, 0)?;
        if !(0..=9999).contains(&local.year()) {
            return None;
        }
        Some(format!("{}{}", local.naive_utc().format(LOCAL_FORMAT), self.offset))
    }

    /// Parse the text form from the start of `text`.
    ///
    /// Anything after the 24-byte prefix is ignored, which lets callers pass
    /// a whole directory name.
    pub fn parse_text_prefix(text: &str) -> Option<Self> {
        let captures = text_pattern().captures(text)?;
        let local = NaiveDateTime::parse_from_str(&captures[1], LOCAL_FORMAT).ok()?;
        let offset: Offset = captures[2].parse().ok()?;
        let seconds = local.and_utc().timestamp() - offset.seconds_east();
        Some(Self::new(seconds, offset))
    }

    /// Parse a string that must be exactly the text form.
    pub fn parse_text(text: &str) -> Option<Self> {
        if text.len() != TEXT_WIDTH {
            return None;
        }
        Self::parse_text_prefix(text)
    }
}
