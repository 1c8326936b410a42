//! Rolling sentiment index.
//!
//! Each bucket gets a raw balance `(positive - negative) / total`, then a
//! trailing mean over an adaptive window. The mean only looks backwards, but
//! the window size is derived from the whole series length, so appending
//! buckets can change earlier values whenever it moves the window to a new
//! size (first at 16 buckets, where it grows from 3 to 4).

use crate::bucket::{BucketSeries, SentimentCounts};

const MIN_WINDOW: usize = 3;
const MAX_WINDOW: usize = 30;
const WINDOW_FRACTION: f64 = 0.2;

/// `(positive - negative) / total`, or 0.0 for an empty bucket.
pub fn raw_index(counts: &SentimentCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }
    (counts.positive as f64 - counts.negative as f64) / total as f64
}

/// `ceil(0.2 * bucket_count)` clamped to `3..=30`.
pub fn window_for(bucket_count: usize) -> usize {
    let scaled = (bucket_count as f64 * WINDOW_FRACTION).ceil() as usize;
    scaled.clamp(MIN_WINDOW, MAX_WINDOW)
}

/// Fill every bucket's `rsi` with the trailing mean of raw indices.
///
/// The first `window - 1` buckets average over however many buckets exist so
/// far, so no bucket is left without a value.
pub fn apply_rsi(mut series: BucketSeries) -> BucketSeries {
    let window = window_for(series.len());
    let raw: Vec<f64> = series.iter().map(|b| raw_index(&b.counts)).collect();

    for (idx, bucket) in series.iter_mut().enumerate() {
        let start = (idx + 1).saturating_sub(window);
        let trailing = &raw[start..=idx];
        let mean = trailing.iter().sum::<f64>() / trailing.len() as f64;
        bucket.rsi = mean.clamp(-1.0, 1.0);
    }
    series
}
