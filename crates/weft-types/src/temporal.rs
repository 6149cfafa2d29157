use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// UTC calendar day used to shard the global timeline.
///
/// Buckets exist only to bound how much data a timeline query touches; they
/// play no part in a post's identity. Rendered as `YYYY-MM-DD`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayBucket(NaiveDate);

impl DayBucket {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The bucket containing a millisecond timestamp.
    pub fn from_timestamp_ms(ms: i64) -> Result<Self, TypeError> {
        DateTime::<Utc>::from_timestamp_millis(ms)
            .map(|dt| Self(dt.date_naive()))
            .ok_or(TypeError::InvalidTimestamp(ms))
    }

    /// Today's bucket.
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    /// Parse `YYYY-MM-DD`.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| TypeError::Serialization(format!("invalid day {s:?}: {e}")))
    }

    /// The bucket one day earlier. Saturates at the earliest representable day.
    pub fn previous(&self) -> Self {
        Self(self.0.checked_sub_days(Days::new(1)).unwrap_or(self.0))
    }

    /// `count` consecutive buckets ending at (and including) `self`, newest first.
    pub fn window(&self, count: usize) -> Vec<Self> {
        let mut days = Vec::with_capacity(count);
        let mut day = *self;
        for _ in 0..count {
            days.push(day);
            day = day.previous();
        }
        days.dedup();
        days
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Debug for DayBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DayBucket({})", self.0.format("%Y-%m-%d"))
    }
}

impl fmt::Display for DayBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_from_timestamp() {
        let day = DayBucket::from_timestamp_ms(0).unwrap();
        assert_eq!(day.to_string(), "1970-01-01");
    }

    #[test]
    fn last_millisecond_of_day_stays_in_bucket() {
        let ms = 86_400_000 - 1;
        assert_eq!(DayBucket::from_timestamp_ms(ms).unwrap().to_string(), "1970-01-01");
        assert_eq!(
            DayBucket::from_timestamp_ms(ms + 1).unwrap().to_string(),
            "1970-01-02"
        );
    }

    #[test]
    fn out_of_range_timestamp() {
        assert_eq!(
            DayBucket::from_timestamp_ms(i64::MAX),
            Err(TypeError::InvalidTimestamp(i64::MAX))
        );
    }

    #[test]
    fn parse_and_display_roundtrip() {
        let day = DayBucket::parse("2024-02-29").unwrap();
        assert_eq!(day.to_string(), "2024-02-29");
        assert!(DayBucket::parse("2023-02-29").is_err());
    }

    #[test]
    fn window_is_newest_first() {
        let day = DayBucket::parse("2024-03-01").unwrap();
        let window: Vec<String> = day.window(3).iter().map(|d| d.to_string()).collect();
        assert_eq!(window, vec!["2024-03-01", "2024-02-29", "2024-02-28"]);
    }

    #[test]
    fn ordering_follows_dates() {
        let a = DayBucket::parse("2024-01-01").unwrap();
        let b = DayBucket::parse("2024-01-02").unwrap();
        assert!(a < b);
        assert_eq!(b.previous(), a);
    }
}
