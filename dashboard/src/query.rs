use analytics::{FilterConfig, Granularity};
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use ingest::PulseConfig;
use serde::Deserialize;

/// Raw `/api/metrics` query parameters. Kept as strings so bad values are
/// reported with the parameter name instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub hashtag: Option<String>,
    pub search: Option<String>,
    pub min_confidence: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub granularity: Option<String>,
}

impl MetricsQuery {
    /// Layer the query over the configured defaults.
    ///
    /// An absent date keeps the default; a present but blank one clears it.
    pub fn resolve(
        &self,
        config: &PulseConfig,
        today: NaiveDate,
    ) -> Result<(FilterConfig, Granularity)> {
        let mut filter = config.default_filter(today);
        filter.hashtag = self.hashtag.clone();
        filter.search = self.search.clone();

        if let Some(raw) = self.min_confidence.as_deref().map(str::trim)
            && !raw.is_empty()
        {
            filter.min_confidence = parse_confidence(raw)?;
        }
        if let Some(raw) = self.start.as_deref() {
            filter.start_date = parse_day(raw, "start")?;
        }
        if let Some(raw) = self.end.as_deref() {
            filter.end_date = parse_day(raw, "end")?;
        }

        let granularity = match self.granularity.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse::<Granularity>()?,
            _ => config.granularity,
        };
        Ok((filter, granularity))
    }
}

fn parse_confidence(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .with_context(|| format!("invalid min_confidence {raw:?}"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("min_confidence {value} outside [0, 1]"));
    }
    Ok(value)
}

fn parse_day(raw: &str, param: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid {param} param: {e}"))?;
    Ok(Some(day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config(lookback: Option<&str>) -> PulseConfig {
        PulseConfig::from_lookup(
            |key| match key {
                "PULSE_LOOKBACK_DAYS" => lookback.map(str::to_string),
                "PULSE_GRANULARITY" => Some("hour".to_string()),
                _ => None,
            },
            Path::new("/home/tester"),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
    }

    #[test]
    fn empty_query_uses_config_defaults() {
        let (filter, granularity) = MetricsQuery::default()
            .resolve(&config(Some("2")), today())
            .unwrap();
        assert_eq!(granularity, Granularity::Hour);
        assert_eq!(filter.min_confidence, 0.5);
        assert_eq!(filter.start_date, NaiveDate::from_ymd_opt(2025, 6, 18));
        assert_eq!(filter.hashtag, None);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let query = MetricsQuery {
            hashtag: Some("#go".into()),
            search: Some("launch".into()),
            min_confidence: Some("0.75".into()),
            start: Some("".into()),
            end: Some("2025-06-19".into()),
            granularity: Some("D".into()),
        };
        let (filter, granularity) = query.resolve(&config(Some("2")), today()).unwrap();
        assert_eq!(granularity, Granularity::Day);
        assert_eq!(filter.min_confidence, 0.75);
        assert_eq!(filter.start_date, None);
        assert_eq!(filter.end_date, NaiveDate::from_ymd_opt(2025, 6, 19));
        assert_eq!(filter.hashtag.as_deref(), Some("#go"));
        assert_eq!(filter.search.as_deref(), Some("launch"));
    }

    #[test]
    fn bad_values_are_rejected() {
        let cases = [
            MetricsQuery {
                min_confidence: Some("lots".into()),
                ..Default::default()
            },
            MetricsQuery {
                min_confidence: Some("1.5".into()),
                ..Default::default()
            },
            MetricsQuery {
                start: Some("20/06/2025".into()),
                ..Default::default()
            },
            MetricsQuery {
                granularity: Some("week".into()),
                ..Default::default()
            },
        ];
        for query in cases {
            assert!(query.resolve(&config(None), today()).is_err(), "{query:?}");
        }
    }
}
