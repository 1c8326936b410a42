use crate::tokens::{extract_hashtags, extract_mentions, normalize_tokens};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Accepted timestamp years, half-open. Bucket series span from the earliest
/// to the latest record, so one stray far-future stamp would otherwise
/// allocate millions of empty buckets.
pub const EARLIEST_YEAR: i32 = 1970;
pub const LATEST_YEAR: i32 = 2100;

/// Ingestion-time data-quality faults. Everything downstream of a valid
/// [`SentimentRecord`] is total and never produces one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("unknown sentiment label: {0:?}")]
    UnknownSentiment(String),
    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("timestamp {0} outside years 1970..2100")]
    TimestampOutOfRange(String),
    #[error("{0} missing or empty")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// Map a classifier label onto the closed enumeration.
    ///
    /// Accepts full names in any case, `POS`/`NEU`/`NEG`, and the positional
    /// `LABEL_0..=2` ids (negative, neutral, positive).
    pub fn from_label(label: &str) -> Result<Self, RecordError> {
        let upper = label.trim().to_uppercase();
        match upper.as_str() {
            "POSITIVE" | "POS" | "LABEL_2" => Ok(Self::Positive),
            "NEUTRAL" | "NEU" | "LABEL_1" => Ok(Self::Neutral),
            "NEGATIVE" | "NEG" | "LABEL_0" => Ok(Self::Negative),
            _ => Err(RecordError::UnknownSentiment(label.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Neutral => "NEUTRAL",
            Self::Negative => "NEGATIVE",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

/// One classified item. Built once at ingestion and only read afterwards.
///
/// Deserializing goes through [`RawRecord`], so it applies the same
/// validation as file ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct SentimentRecord {
    pub timestamp: DateTime<Utc>,
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub text: String,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
}

impl SentimentRecord {
    /// Build a record, extracting hashtags and mentions from `text`.
    pub fn new(
        timestamp: DateTime<Utc>,
        sentiment: Sentiment,
        confidence: Option<f64>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        Self {
            timestamp,
            sentiment,
            confidence,
            hashtags: extract_hashtags(&text),
            mentions: extract_mentions(&text),
            text,
        }
    }

    /// Confidence with the unknown case folded to 0.0.
    pub fn confidence(&self) -> f64 {
        self.confidence.unwrap_or(0.0)
    }
}

/// A row as it arrives from a file or a classifier, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "label")]
    pub sentiment: Option<String>,
    #[serde(default, alias = "score")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub hashtags: Option<Vec<String>>,
    #[serde(default)]
    pub mentions: Option<Vec<String>>,
}

impl RawRecord {
    pub fn into_record(self) -> Result<SentimentRecord, RecordError> {
        let timestamp = self
            .timestamp
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::MissingField("timestamp"))
            .and_then(parse_timestamp)?;
        let label = self
            .sentiment
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::MissingField("sentiment"))?;
        let sentiment = Sentiment::from_label(label)?;
        let confidence = validate_confidence(self.confidence)?;

        let mut record =
            SentimentRecord::new(timestamp, sentiment, confidence, self.text.unwrap_or_default());
        if let Some(hashtags) = self.hashtags {
            record.hashtags = normalize_tokens(hashtags);
        }
        if let Some(mentions) = self.mentions {
            record.mentions = normalize_tokens(mentions);
        }
        Ok(record)
    }
}

impl TryFrom<RawRecord> for SentimentRecord {
    type Error = RecordError;

    fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
        raw.into_record()
    }
}

fn validate_confidence(confidence: Option<f64>) -> Result<Option<f64>, RecordError> {
    match confidence {
        Some(c) if !(0.0..=1.0).contains(&c) => Err(RecordError::ConfidenceOutOfRange(c)),
        other => Ok(other),
    }
}

/// RFC 3339 with any offset, or a naive `YYYY-MM-DD[ T]HH:MM:SS[.f]` taken as UTC.
///
/// The year must fall in `EARLIEST_YEAR..LATEST_YEAR`.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, RecordError> {
    let input = input.trim();
    let parsed = DateTime::parse_from_rfc3339(input)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .into_iter()
                .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
                .map(|naive| naive.and_utc())
        })
        .ok_or_else(|| RecordError::InvalidTimestamp(input.to_string()))?;

    if !(EARLIEST_YEAR..LATEST_YEAR).contains(&parsed.year()) {
        return Err(RecordError::TimestampOutOfRange(input.to_string()));
    }
    Ok(parsed)
}
