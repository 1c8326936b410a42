//! Conjunctive record filtering.
//!
//! Each [`FilterConfig`] field that is set turns into one [`Predicate`]; a
//! record survives when every predicate holds. Predicates are independent of
//! one another, so the order they run in never changes the result.

use chrono::{DateTime, Days, NaiveDate, Utc};
use pulse_types::SentimentRecord;
use serde::{Deserialize, Serialize};

/// Filter settings. All fields are optional; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub hashtag: Option<String>,
    pub search: Option<String>,
    pub min_confidence: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `timestamp >= bound` (start of the start date, UTC).
    Since(DateTime<Utc>),
    /// `timestamp < bound` (start of the day after the end date, UTC).
    Before(DateTime<Utc>),
    MinConfidence(f64),
    /// Lowercased tag that must appear as a standalone token in the text.
    Hashtag(String),
    /// Lowercased substring of the text.
    Search(String),
}

impl Predicate {
    pub fn matches(&self, record: &SentimentRecord) -> bool {
        match self {
            Self::Since(bound) => record.timestamp >= *bound,
            Self::Before(bound) => record.timestamp < *bound,
            Self::MinConfidence(floor) => record.confidence() >= *floor,
            Self::Hashtag(tag) => contains_whole_token(&record.text.to_lowercase(), tag),
            Self::Search(needle) => record.text.to_lowercase().contains(needle.as_str()),
        }
    }
}

impl FilterConfig {
    /// Compile the set fields into predicates. Blank strings and a
    /// non-positive confidence floor impose no constraint.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();

        if let Some(start) = self.start_date {
            predicates.push(Predicate::Since(start_of_day(start)));
        }
        if let Some(end) = self.end_date
            && let Some(next) = end.checked_add_days(Days::new(1))
        {
            predicates.push(Predicate::Before(start_of_day(next)));
        }

        let floor = if self.min_confidence.is_nan() {
            0.0
        } else {
            self.min_confidence.clamp(0.0, 1.0)
        };
        if floor > 0.0 {
            predicates.push(Predicate::MinConfidence(floor));
        }

        if let Some(tag) = normalized_needle(self.hashtag.as_deref()) {
            predicates.push(Predicate::Hashtag(tag));
        }
        if let Some(needle) = normalized_needle(self.search.as_deref()) {
            predicates.push(Predicate::Search(needle));
        }

        predicates
    }
}

/// Records of `records` that satisfy every predicate of `config`, in input order.
pub fn filter(records: &[SentimentRecord], config: &FilterConfig) -> Vec<SentimentRecord> {
    let predicates = config.predicates();
    records
        .iter()
        .filter(|record| predicates.iter().all(|p| p.matches(record)))
        .cloned()
        .collect()
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn normalized_needle(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `needle` occurs in `haystack` with no word character directly before or after it.
///
/// Every start position is tried, including ones inside an earlier match.
fn contains_whole_token(haystack: &str, needle: &str) -> bool {
    let Some(first) = needle.chars().next() else {
        return false;
    };
    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let start = from + offset;
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        if !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char) {
            return true;
        }
        from = start + first.len_utf8();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pulse_types::Sentiment;

    fn record(day: u32, hour: u32, confidence: Option<f64>, text: &str) -> SentimentRecord {
        SentimentRecord::new(
            Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap(),
            Sentiment::Neutral,
            confidence,
            text,
        )
    }

    fn sample() -> Vec<SentimentRecord> {
        vec![
            record(1, 9, Some(0.9), "#go rocks"),
            record(1, 23, Some(0.4), "#golang is different"),
            record(2, 0, None, "Price drop on #GO launch"),
            record(3, 12, Some(0.7), "nothing tagged here"),
            record(4, 8, Some(0.55), "bug in the launch build #go"),
        ]
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, day).unwrap()
    }

    #[test]
    fn empty_config_keeps_everything() {
        let records = sample();
        assert_eq!(filter(&records, &FilterConfig::default()), records);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let config = FilterConfig {
            hashtag: Some("#go".into()),
            min_confidence: 0.5,
            ..Default::default()
        };
        assert!(filter(&[], &config).is_empty());
    }

    #[test]
    fn hashtag_requires_whole_token() {
        assert!(contains_whole_token("#go rocks", "#go"));
        assert!(!contains_whole_token("#golang", "#go"));
        assert!(contains_whole_token("launch build #go", "#go"));
        assert!(contains_whole_token("love it (#go).", "#go"));
        assert!(!contains_whole_token("x#go", "#go"));
        assert!(!contains_whole_token("#go_fast", "#go"));
    }

    #[test]
    fn hashtag_found_at_overlapping_position() {
        // the first occurrence is followed by a word char, the overlapping second is not
        assert!(contains_whole_token("#a##a##", "#a##"));
        assert!(contains_whole_token("#a#a #a", "#a"));
        assert!(!contains_whole_token("#a#ab", "#a#a"));
    }

    #[test]
    fn hashtag_filter_is_case_insensitive_on_raw_text() {
        let config = FilterConfig {
            hashtag: Some("  #Go ".into()),
            ..Default::default()
        };
        let texts: Vec<_> = filter(&sample(), &config)
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(
            texts,
            vec!["#go rocks", "Price drop on #GO launch", "bug in the launch build #go"]
        );
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let config = FilterConfig {
            search: Some("LAUNCH".into()),
            ..Default::default()
        };
        assert_eq!(filter(&sample(), &config).len(), 2);
    }

    #[test]
    fn blank_strings_are_unset() {
        let config = FilterConfig {
            hashtag: Some("   ".into()),
            search: Some(String::new()),
            ..Default::default()
        };
        assert!(config.predicates().is_empty());
    }

    #[test]
    fn confidence_floor_excludes_missing_confidence() {
        let config = FilterConfig {
            min_confidence: 0.5,
            ..Default::default()
        };
        let kept: Vec<_> = filter(&sample(), &config)
            .into_iter()
            .map(|r| r.confidence())
            .collect();
        assert_eq!(kept, vec![0.9, 0.7, 0.55]);
    }

    #[test]
    fn zero_floor_keeps_missing_confidence() {
        let config = FilterConfig {
            min_confidence: 0.0,
            ..Default::default()
        };
        assert_eq!(filter(&sample(), &config).len(), 5);
    }

    #[test]
    fn scenario_floor_of_point_six() {
        let records = vec![
            record(1, 1, Some(0.9), "a"),
            record(1, 2, Some(0.8), "b"),
            record(1, 3, Some(0.5), "c"),
        ];
        let config = FilterConfig {
            min_confidence: 0.6,
            ..Default::default()
        };
        let kept = filter(&records, &config);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.text != "c"));
    }

    #[test]
    fn date_range_is_start_inclusive_end_exclusive_next_day() {
        let config = FilterConfig {
            start_date: Some(date(2)),
            end_date: Some(date(3)),
            ..Default::default()
        };
        let kept: Vec<_> = filter(&sample(), &config)
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(kept, vec!["Price drop on #GO launch", "nothing tagged here"]);

        let midnight_after = SentimentRecord::new(
            Utc.with_ymd_and_hms(2025, 5, 4, 0, 0, 0).unwrap(),
            Sentiment::Positive,
            Some(1.0),
            "edge",
        );
        assert!(filter(&[midnight_after], &config).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let configs = [
            FilterConfig::default(),
            FilterConfig {
                hashtag: Some("#go".into()),
                min_confidence: 0.5,
                ..Default::default()
            },
            FilterConfig {
                search: Some("launch".into()),
                start_date: Some(date(2)),
                end_date: Some(date(4)),
                ..Default::default()
            },
        ];
        for config in &configs {
            let once = filter(&sample(), config);
            let twice = filter(&once, config);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn predicate_order_does_not_matter() {
        let config = FilterConfig {
            hashtag: Some("#go".into()),
            search: Some("launch".into()),
            min_confidence: 0.1,
            start_date: Some(date(1)),
            end_date: Some(date(4)),
        };
        let predicates = config.predicates();
        assert_eq!(predicates.len(), 5);

        let expected = filter(&sample(), &config);
        let orders: [[usize; 5]; 4] = [
            [0, 1, 2, 3, 4],
            [4, 3, 2, 1, 0],
            [2, 4, 0, 3, 1],
            [3, 0, 4, 1, 2],
        ];
        for order in orders {
            let mut current = sample();
            for idx in order {
                current.retain(|r| predicates[idx].matches(r));
            }
            assert_eq!(current, expected);
        }
    }

    #[test]
    fn nan_and_out_of_range_floors_are_clamped() {
        let nan = FilterConfig {
            min_confidence: f64::NAN,
            ..Default::default()
        };
        assert!(nan.predicates().is_empty());

        let high = FilterConfig {
            min_confidence: 3.0,
            ..Default::default()
        };
        assert_eq!(high.predicates(), vec![Predicate::MinConfidence(1.0)]);
    }
}
