//! One-shot dashboard state: filter, then derive every panel from the survivors.

use crate::bucket::{bucket_at, BucketSeries, Granularity, SentimentCounts};
use crate::filter::{filter, FilterConfig};
use crate::ranking::{top_tokens, TokenField, TokenRanking, TOP_K};
use crate::rsi::{apply_rsi, raw_index};
use crate::words::word_frequencies;
use chrono::{DateTime, Utc};
use pulse_types::SentimentRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const RECENT_LIMIT: usize = 100;
pub const WORD_LIMIT: usize = 100;

/// Share of each sentiment in percent; all zero when nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct SentimentShares {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
}

impl SentimentShares {
    pub fn from_counts(counts: &SentimentCounts) -> Self {
        let total = counts.total();
        let pct = |n: u64| {
            if total == 0 {
                0.0
            } else {
                n as f64 * 100.0 / total as f64
            }
        };
        Self {
            negative: pct(counts.negative),
            neutral: pct(counts.neutral),
            positive: pct(counts.positive),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
    pub hour_start: DateTime<Utc>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total: u64,
    pub per_sentiment_counts: SentimentCounts,
    pub per_sentiment_percent: SentimentShares,
    pub average_confidence: f64,
    /// Raw index over the whole filtered set.
    pub current_index: f64,
    pub bucket_series: BucketSeries,
    pub hourly_counts: Vec<HourCount>,
    pub hashtag_ranking: TokenRanking,
    pub mention_ranking: TokenRanking,
    pub word_frequencies: TokenRanking,
    /// Newest first, at most [`RECENT_LIMIT`].
    pub recent_records: Vec<SentimentRecord>,
}

/// [`recompute_at`] anchored on the wall clock.
pub fn recompute(
    records: &[SentimentRecord],
    config: &FilterConfig,
    granularity: Granularity,
) -> Metrics {
    recompute_at(records, config, granularity, Utc::now())
}

/// Filter `records` and build every metric from the result.
///
/// `now` only matters when nothing survives the filter: it anchors the single
/// zero bucket of the series.
pub fn recompute_at(
    records: &[SentimentRecord],
    config: &FilterConfig,
    granularity: Granularity,
    now: DateTime<Utc>,
) -> Metrics {
    let filtered = filter(records, config);

    let counts = SentimentCounts::from_records(&filtered);
    let total = counts.total();
    let average_confidence = if filtered.is_empty() {
        0.0
    } else {
        filtered.iter().map(SentimentRecord::confidence).sum::<f64>() / filtered.len() as f64
    };

    let bucket_series = apply_rsi(bucket_at(&filtered, granularity, now));

    let metrics = Metrics {
        total,
        per_sentiment_counts: counts,
        per_sentiment_percent: SentimentShares::from_counts(&counts),
        average_confidence,
        current_index: raw_index(&counts),
        bucket_series,
        hourly_counts: hourly_counts(&filtered),
        hashtag_ranking: top_tokens(&filtered, TokenField::Hashtags, TOP_K),
        mention_ranking: top_tokens(&filtered, TokenField::Mentions, TOP_K),
        word_frequencies: word_frequencies(&filtered, WORD_LIMIT),
        recent_records: recent(filtered, RECENT_LIMIT),
    };

    debug!(
        input = records.len(),
        total = metrics.total,
        buckets = metrics.bucket_series.len(),
        granularity = %granularity,
        "recomputed metrics"
    );
    metrics
}

fn hourly_counts(records: &[SentimentRecord]) -> Vec<HourCount> {
    let mut hours: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
    for record in records {
        *hours.entry(Granularity::Hour.truncate(record.timestamp)).or_default() += 1;
    }
    hours
        .into_iter()
        .map(|(hour_start, count)| HourCount { hour_start, count })
        .collect()
}

fn recent(mut records: Vec<SentimentRecord>, limit: usize) -> Vec<SentimentRecord> {
    // stable, so equal timestamps keep input order
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(limit);
    records
}
