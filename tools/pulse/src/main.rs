mod commands;

use analytics::{FilterConfig, Granularity};
use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ingest::PulseConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pulse",
    about = "Sentiment pulse: aggregate classified records into dashboard metrics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute metrics once and print them as pretty JSON.
    Report {
        #[command(flatten)]
        filters: FilterArgs,

        /// Records file (JSONL, or CSV by extension). Defaults to PULSE_RECORDS_PATH.
        #[arg(long)]
        records: Option<PathBuf>,

        /// Write the JSON here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Fail on the first invalid row instead of skipping it.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Reload and recompute on a timer, printing one summary line per tick.
    ///
    /// A failed reload is logged and retried on the next tick. Stops after
    /// --iterations ticks, or on Ctrl-C.
    Watch {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long)]
        records: Option<PathBuf>,

        /// Seconds between ticks. Defaults to PULSE_REFRESH_SECS.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        every: Option<u64>,

        #[arg(long)]
        iterations: Option<u64>,
    },

    /// Check a records file and list the rows that would be skipped.
    Validate {
        #[arg(long)]
        records: Option<PathBuf>,

        /// How many issues to print.
        #[arg(long, default_value_t = 10)]
        show: usize,
    },
}

/// Filter flags shared by `report` and `watch`; unset flags keep the configured defaults.
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Keep records whose text contains this tag as a whole token (e.g. "#launch").
    #[arg(long)]
    hashtag: Option<String>,

    /// Case-insensitive substring of the text.
    #[arg(long)]
    search: Option<String>,

    #[arg(long, value_parser = parse_confidence)]
    min_confidence: Option<f64>,

    /// First day to include (YYYY-MM-DD, UTC).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD, UTC).
    #[arg(long)]
    end: Option<NaiveDate>,

    /// minute, hour or day (also T, H, D).
    #[arg(long)]
    granularity: Option<Granularity>,
}

impl FilterArgs {
    fn resolve(&self, config: &PulseConfig, today: NaiveDate) -> (FilterConfig, Granularity) {
        let mut filter = config.default_filter(today);
        filter.hashtag = self.hashtag.clone();
        filter.search = self.search.clone();
        if let Some(floor) = self.min_confidence {
            filter.min_confidence = floor;
        }
        if self.start.is_some() {
            filter.start_date = self.start;
        }
        if self.end.is_some() {
            filter.end_date = self.end;
        }
        (filter, self.granularity.unwrap_or(config.granularity))
    }
}

fn parse_confidence(raw: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("not a number: {e}"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{value} is outside [0, 1]"));
    }
    Ok(value)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PulseConfig::from_env()?;

    match cli.command {
        Commands::Report {
            filters,
            records,
            out,
            strict,
        } => commands::run_report(&config, &filters, records, out, strict),
        Commands::Watch {
            filters,
            records,
            every,
            iterations,
        } => commands::run_watch(&config, &filters, records, every, iterations),
        Commands::Validate { records, show } => commands::run_validate(&config, records, show),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> PulseConfig {
        PulseConfig::from_lookup(|_| None, Path::new("/home/tester"))
    }

    #[test]
    fn report_accepts_filters_and_output() {
        let cli = Cli::try_parse_from([
            "pulse",
            "report",
            "--hashtag",
            "#go",
            "--min-confidence",
            "0.7",
            "--start",
            "2025-01-02",
            "--granularity",
            "H",
            "--out",
            "metrics.json",
            "--strict",
        ])
        .unwrap();
        let Commands::Report {
            filters,
            out,
            strict,
            records,
        } = cli.command
        else {
            panic!("expected report");
        };
        assert_eq!(filters.hashtag.as_deref(), Some("#go"));
        assert_eq!(filters.min_confidence, Some(0.7));
        assert_eq!(filters.start, NaiveDate::from_ymd_opt(2025, 1, 2));
        assert_eq!(filters.granularity, Some(Granularity::Hour));
        assert_eq!(out, Some(PathBuf::from("metrics.json")));
        assert!(strict);
        assert_eq!(records, None);
    }

    #[test]
    fn rejects_bad_flag_values() {
        for args in [
            vec!["pulse", "report", "--min-confidence", "1.2"],
            vec!["pulse", "report", "--min-confidence", "high"],
            vec!["pulse", "report", "--end", "yesterday"],
            vec!["pulse", "watch", "--granularity", "week"],
            vec!["pulse", "watch", "--every", "0"],
        ] {
            assert!(Cli::try_parse_from(args.iter().copied()).is_err(), "{args:?}");
        }
    }

    #[test]
    fn validate_defaults() {
        let cli = Cli::try_parse_from(["pulse", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Validate {
                records: None,
                show: 10
            }
        ));
    }

    #[test]
    fn watch_parses_timer_flags() {
        let cli =
            Cli::try_parse_from(["pulse", "watch", "--every", "15", "--iterations", "3"]).unwrap();
        let Commands::Watch {
            every, iterations, ..
        } = cli.command
        else {
            panic!("expected watch");
        };
        assert_eq!(every, Some(15));
        assert_eq!(iterations, Some(3));
    }

    #[test]
    fn unset_flags_keep_config_defaults() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let (filter, granularity) = FilterArgs::default().resolve(&config(), today);
        assert_eq!(filter.min_confidence, 0.5);
        assert_eq!(filter.start_date, None);
        assert_eq!(granularity, Granularity::Minute);

        let args = FilterArgs {
            min_confidence: Some(0.0),
            end: NaiveDate::from_ymd_opt(2025, 1, 9),
            granularity: Some(Granularity::Day),
            ..Default::default()
        };
        let (filter, granularity) = args.resolve(&config(), today);
        assert_eq!(filter.min_confidence, 0.0);
        assert_eq!(filter.end_date, NaiveDate::from_ymd_opt(2025, 1, 9));
        assert_eq!(granularity, Granularity::Day);
    }
}
