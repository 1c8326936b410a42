//! Record snapshot loading.
//!
//! `.csv` files are read with headers; every other file is JSONL, one record
//! per line. Invalid rows are either collected as [`RecordIssue`]s
//! ([`LoadMode::Lenient`]) or abort the load ([`LoadMode::Strict`]).

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use pulse_types::tokens::split_token_list;
use pulse_types::{RawRecord, SentimentRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

// ── Public types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub loaded: usize,
    /// Blank lines.
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordIssue {
    /// 1-based line in the source file.
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<SentimentRecord>,
    pub stats: LoadStats,
    pub issues: Vec<RecordIssue>,
}

/// A CSV row before validation; tag cells are delimited strings.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default, alias = "label")]
    sentiment: Option<String>,
    #[serde(default, alias = "score")]
    confidence: Option<f64>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    hashtags: Option<String>,
    #[serde(default)]
    mentions: Option<String>,
}

impl From<CsvRow> for RawRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            timestamp: row.timestamp,
            sentiment: row.sentiment,
            confidence: row.confidence,
            text: row.text,
            hashtags: row.hashtags.as_deref().map(split_token_list),
            mentions: row.mentions.as_deref().map(split_token_list),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────────

/// Load every record in `path`, choosing the format from the extension.
pub fn load_records(path: &Path, mode: LoadMode) -> Result<LoadReport> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let report = if is_csv {
        load_csv(path, mode)?
    } else {
        load_jsonl(path, mode)?
    };

    info!(
        path = %path.display(),
        loaded = report.stats.loaded,
        skipped = report.stats.skipped,
        errors = report.stats.errors,
        "loaded records"
    );
    Ok(report)
}

/// Like [`load_records`], but a missing file is an empty snapshot.
pub fn load_or_empty(path: &Path, mode: LoadMode) -> Result<LoadReport> {
    if !path.exists() {
        warn!(path = %path.display(), "records file not found; using empty snapshot");
        return Ok(LoadReport::default());
    }
    load_records(path, mode)
}

fn load_jsonl(path: &Path, mode: LoadMode) -> Result<LoadReport> {
    let file =
        File::open(path).with_context(|| format!("open records at {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut report = LoadReport::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("read {}:{line_no}", path.display()))?;
        match parse_json_line(&line) {
            Ok(Some(record)) => report.accept(record),
            Ok(None) => report.stats.skipped += 1,
            Err(message) => report.reject(path, line_no, message, mode)?,
        }
    }
    Ok(report)
}

fn parse_json_line(line: &str) -> std::result::Result<Option<SentimentRecord>, String> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let raw: RawRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
    raw.into_record().map(Some).map_err(|e| e.to_string())
}

fn load_csv(path: &Path, mode: LoadMode) -> Result<LoadReport> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("open records at {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("read CSV header of {}", path.display()))?
        .clone();
    let mut report = LoadReport::default();

    for (idx, row) in reader.records().enumerate() {
        // header is line 1
        let fallback_line = idx + 2;
        let parsed = row.map_err(|e| (fallback_line, e.to_string())).and_then(|row| {
            let line_no = row
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(fallback_line);
            if row.iter().all(str::is_empty) {
                return Ok(None);
            }
            row.deserialize::<CsvRow>(Some(&headers))
                .map_err(|e| e.to_string())
                .and_then(|csv_row| RawRecord::from(csv_row).into_record().map_err(|e| e.to_string()))
                .map(Some)
                .map_err(|message| (line_no, message))
        });
        match parsed {
            Ok(Some(record)) => report.accept(record),
            Ok(None) => report.stats.skipped += 1,
            Err((line_no, message)) => report.reject(path, line_no, message, mode)?,
        }
    }
    Ok(report)
}

impl LoadReport {
    fn accept(&mut self, record: SentimentRecord) {
        self.records.push(record);
        self.stats.loaded += 1;
    }

    fn reject(&mut self, path: &Path, line: usize, message: String, mode: LoadMode) -> Result<()> {
        if mode == LoadMode::Strict {
            bail!("{}:{line}: {message}", path.display());
        }
        warn!(path = %path.display(), line, %message, "skipping invalid record");
        self.stats.errors += 1;
        self.issues.push(RecordIssue { line, message });
        Ok(())
    }
}
