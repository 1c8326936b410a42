use analytics::{FilterConfig, Granularity};
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

// ── Defaults ────────────────────────────────────────────────────────────

/// Record snapshot relative to home.
const DEFAULT_RECORDS_REL: &str = ".pulse/data/records.jsonl";

const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;
const DEFAULT_REFRESH_SECS: u64 = 10;
const MIN_REFRESH_SECS: u64 = 5;
const MAX_REFRESH_SECS: u64 = 60;
const DEFAULT_DASHBOARD_BIND: &str = "127.0.0.1:8050";

// ── Config struct ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct PulseConfig {
    pub records_path: PathBuf,
    pub min_confidence: f64,
    pub granularity: Granularity,
    /// Always within `5..=60`.
    pub refresh_secs: u64,
    pub lookback_days: Option<u64>,
    pub dashboard_bind: String,
}

impl PulseConfig {
    pub fn from_env() -> Result<Self> {
        let home = dirs::home_dir().context("could not resolve home directory")?;
        Ok(Self::from_lookup(|key| env::var(key).ok(), &home))
    }

    /// Build from an arbitrary key lookup; `home` anchors the default path and `~/`.
    pub fn from_lookup<F>(lookup: F, home: &Path) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            records_path: env_path(
                &lookup,
                "PULSE_RECORDS_PATH",
                home.join(DEFAULT_RECORDS_REL),
                home,
            ),
            min_confidence: env_f64(&lookup, "PULSE_MIN_CONFIDENCE", DEFAULT_MIN_CONFIDENCE)
                .clamp(0.0, 1.0),
            granularity: env_granularity(&lookup, "PULSE_GRANULARITY"),
            refresh_secs: env_u64(&lookup, "PULSE_REFRESH_SECS", DEFAULT_REFRESH_SECS)
                .clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS),
            lookback_days: env_opt_u64(&lookup, "PULSE_LOOKBACK_DAYS"),
            dashboard_bind: lookup("PULSE_DASHBOARD_BIND")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DASHBOARD_BIND.to_string()),
        }
    }

    /// Filter a caller starts from before applying its own overrides.
    pub fn default_filter(&self, today: NaiveDate) -> FilterConfig {
        FilterConfig {
            min_confidence: self.min_confidence,
            start_date: self
                .lookback_days
                .and_then(|days| today.checked_sub_days(Days::new(days))),
            ..Default::default()
        }
    }
}

fn env_path<F>(lookup: &F, key: &str, default: PathBuf, home: &Path) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) if !val.trim().is_empty() => expand_tilde(val.trim(), home),
        _ => default,
    }
}

fn env_f64<F>(lookup: &F, key: &str, default: f64) -> f64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => match val.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                warn!(key, value = %val, "ignoring invalid number");
                default
            }
        },
        None => default,
    }
}

fn env_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    env_opt_u64(lookup, key).unwrap_or(default)
}

fn env_opt_u64<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(key)?;
    match val.trim().parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %val, "ignoring invalid integer");
            None
        }
    }
}

fn env_granularity<F>(lookup: &F, key: &str) -> Granularity
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => val.parse().unwrap_or_else(|err| {
            warn!(key, %err, "falling back to default granularity");
            Granularity::default()
        }),
        None => Granularity::default(),
    }
}

fn expand_tilde(input: &str, home: &Path) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(input)
}
