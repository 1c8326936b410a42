use crate::FilterArgs;
use analytics::{Metrics, recompute};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use ingest::{LoadMode, PulseConfig, load_or_empty, load_records};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub fn run_report(
    config: &PulseConfig,
    filters: &FilterArgs,
    records: Option<PathBuf>,
    out: Option<PathBuf>,
    strict: bool,
) -> Result<()> {
    let path = records.unwrap_or_else(|| config.records_path.clone());
    let mode = if strict {
        LoadMode::Strict
    } else {
        LoadMode::Lenient
    };
    let report = load_records(&path, mode)?;

    let (filter, granularity) = filters.resolve(config, Utc::now().date_naive());
    let metrics = recompute(&report.records, &filter, granularity);
    let json = serde_json::to_string_pretty(&metrics)?;

    match out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&out, json).with_context(|| format!("write {}", out.display()))?;
            println!(
                "Wrote metrics for {} of {} records to {} (errors={})",
                metrics.total,
                report.stats.loaded,
                out.display(),
                report.stats.errors,
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn run_watch(
    config: &PulseConfig,
    filters: &FilterArgs,
    records: Option<PathBuf>,
    every: Option<u64>,
    iterations: Option<u64>,
) -> Result<()> {
    let path = records.unwrap_or_else(|| config.records_path.clone());
    let period = Duration::from_secs(every.unwrap_or(config.refresh_secs));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    runtime.block_on(async {
        let mut ticker = tokio::time::interval(period);
        let mut ticks = 0u64;
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        info!(path = %path.display(), every = period.as_secs(), "watching records");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    info!("interrupted");
                    break;
                }
            }

            let load_path = path.clone();
            let load = tokio::task::spawn_blocking(move || {
                load_or_empty(&load_path, LoadMode::Lenient)
            });
            let loaded = tokio::select! {
                joined = load => joined,
                _ = &mut shutdown => {
                    info!("interrupted");
                    break;
                }
            };

            match loaded {
                Ok(Ok(report)) => {
                    let now = Utc::now();
                    let (filter, granularity) = filters.resolve(config, now.date_naive());
                    let metrics = recompute(&report.records, &filter, granularity);
                    println!("{}", kpi_line(&metrics, now));
                }
                Ok(Err(err)) => warn!(error = %format!("{err:#}"), "reload failed; retrying next tick"),
                Err(err) => warn!(error = %err, "record loader task failed"),
            }

            ticks += 1;
            if iterations.is_some_and(|limit| ticks >= limit) {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

pub fn run_validate(config: &PulseConfig, records: Option<PathBuf>, show: usize) -> Result<()> {
    let path = records.unwrap_or_else(|| config.records_path.clone());
    let report = load_records(&path, LoadMode::Lenient)?;
    let stats = report.stats;

    println!(
        "{}: loaded={} skipped={} errors={}",
        path.display(),
        stats.loaded,
        stats.skipped,
        stats.errors
    );
    for issue in report.issues.iter().take(show) {
        println!("  line {}: {}", issue.line, issue.message);
    }
    if report.issues.len() > show {
        println!("  ... {} more", report.issues.len() - show);
    }

    if stats.errors > 0 {
        bail!("{} invalid record(s) in {}", stats.errors, path.display());
    }
    Ok(())
}

/// One-line KPI summary printed per watch tick.
fn kpi_line(metrics: &Metrics, now: DateTime<Utc>) -> String {
    let shares = &metrics.per_sentiment_percent;
    let top = metrics
        .hashtag_ranking
        .first()
        .map(|t| format!("#{}", t.token))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} total={} pos={:.1}% neu={:.1}% neg={:.1}% conf={:.2} index={:+.2} top={}",
        now.format("%H:%M:%S"),
        metrics.total,
        shares.positive,
        shares.neutral,
        shares.negative,
        metrics.average_confidence,
        metrics.current_index,
        top,
    )
}
