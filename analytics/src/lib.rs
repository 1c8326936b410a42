//! Aggregation engine behind the Pulse dashboard.
//!
//! Every entry point is a pure read over a caller-owned snapshot of
//! [`SentimentRecord`]s; nothing here holds state between calls.

pub mod bucket;
pub mod filter;
pub mod metrics;
pub mod ranking;
pub mod rsi;
pub mod words;

pub use bucket::{
    bucket, bucket_at, Bucket, BucketSeries, Granularity, ParseGranularityError, SentimentCounts,
};
pub use filter::{filter, FilterConfig};
pub use metrics::{recompute, recompute_at, HourCount, Metrics, SentimentShares};
pub use pulse_types::{Sentiment, SentimentRecord};
pub use ranking::{top_tokens, TokenCount, TokenField, TokenRanking, TOP_K};
pub use rsi::{apply_rsi, raw_index, window_for};
