use chrono::{DateTime, Duration, Utc};
use pulse_types::{Sentiment, SentimentRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Minute,
    Hour,
    Day,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity {0:?} (expected minute, hour or day)")]
pub struct ParseGranularityError(String);

impl Granularity {
    pub fn step_seconds(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    pub fn step(self) -> Duration {
        Duration::seconds(self.step_seconds())
    }

    /// Floor `ts` to the enclosing UTC boundary.
    pub fn truncate(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.step_seconds();
        let floored = ts.timestamp().div_euclid(step) * step;
        DateTime::<Utc>::from_timestamp(floored, 0).unwrap_or(ts)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    // Also accepts the single-letter aliases T, H and D.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" | "min" | "t" => Ok(Self::Minute),
            "hour" | "h" => Ok(Self::Hour),
            "day" | "d" => Ok(Self::Day),
            _ => Err(ParseGranularityError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct SentimentCounts {
    pub negative: u64,
    pub neutral: u64,
    pub positive: u64,
}

impl SentimentCounts {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a SentimentRecord>,
    {
        let mut counts = Self::default();
        for record in records {
            counts.record(record.sentiment);
        }
        counts
    }

    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Positive => self.positive += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.negative + self.neutral + self.positive
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub bucket_start: DateTime<Utc>,
    pub counts: SentimentCounts,
    pub total: u64,
    /// Smoothed index; 0.0 until [`crate::rsi::apply_rsi`] fills it in.
    pub rsi: f64,
}

impl Bucket {
    pub fn new(bucket_start: DateTime<Utc>, counts: SentimentCounts) -> Self {
        Self {
            bucket_start,
            total: counts.total(),
            counts,
            rsi: 0.0,
        }
    }
}

pub type BucketSeries = Vec<Bucket>;

/// [`bucket_at`] anchored on the wall clock.
pub fn bucket(records: &[SentimentRecord], granularity: Granularity) -> BucketSeries {
    bucket_at(records, granularity, Utc::now())
}

/// Count records per sentiment in contiguous `granularity`-wide buckets.
///
/// Every bucket between the earliest and latest observed one is present, gaps
/// zero-filled. With no records the series is a single zero bucket at `now`.
///
/// Length is proportional to the span between the earliest and latest record.
/// Ingested timestamps are bounded to years
/// [`EARLIEST_YEAR`](pulse_types::record::EARLIEST_YEAR)..[`LATEST_YEAR`](pulse_types::record::LATEST_YEAR),
/// so the worst case is a dense minute series over that window.
pub fn bucket_at(
    records: &[SentimentRecord],
    granularity: Granularity,
    now: DateTime<Utc>,
) -> BucketSeries {
    let mut grouped: BTreeMap<DateTime<Utc>, SentimentCounts> = BTreeMap::new();
    for record in records {
        grouped
            .entry(granularity.truncate(record.timestamp))
            .or_default()
            .record(record.sentiment);
    }

    let (Some((&first, _)), Some((&last, _))) = (grouped.first_key_value(), grouped.last_key_value())
    else {
        return vec![Bucket::new(granularity.truncate(now), SentimentCounts::default())];
    };

    let step = granularity.step();
    let span = (last - first).num_seconds() / granularity.step_seconds();
    let mut series = Vec::with_capacity(usize::try_from(span).unwrap_or(0) + 1);

    let mut cursor = first;
    while cursor <= last {
        let counts = grouped.get(&cursor).copied().unwrap_or_default();
        series.push(Bucket::new(cursor, counts));
        match cursor.checked_add_signed(step) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    series
}
