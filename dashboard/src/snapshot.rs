use anyhow::{Context, Result};
use ingest::{LoadMode, load_or_empty};
use pulse_types::SentimentRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
struct Snapshot {
    records: Arc<Vec<SentimentRecord>>,
    /// `None` when the file was missing at load time.
    modified: Option<SystemTime>,
    loaded: bool,
}

/// The current record set, reloaded whenever the source file's mtime moves.
///
/// Readers get a cheap `Arc` clone; a reload swaps in a fresh vector and never
/// touches one a request is still aggregating over.
pub struct SnapshotStore {
    path: PathBuf,
    current: RwLock<Snapshot>,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            current: RwLock::new(Snapshot::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn records(&self) -> Result<Arc<Vec<SentimentRecord>>> {
        let modified = modified_time(&self.path).await;
        {
            let guard = self.current.read().await;
            if guard.loaded && guard.modified == modified {
                return Ok(guard.records.clone());
            }
        }

        let path = self.path.clone();
        let report = tokio::task::spawn_blocking(move || load_or_empty(&path, LoadMode::Lenient))
            .await
            .context("record loader task")?
            .with_context(|| format!("reload {}", self.path.display()))?;
        info!(
            records = report.stats.loaded,
            errors = report.stats.errors,
            "snapshot refreshed"
        );

        let records = Arc::new(report.records);
        let mut guard = self.current.write().await;
        *guard = Snapshot {
            records: records.clone(),
            modified,
            loaded: true,
        };
        Ok(records)
    }
}

async fn modified_time(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|meta| meta.modified().ok())
}
