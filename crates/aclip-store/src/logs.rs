//! Per-project pipeline log.
//!
//! Each project keeps a plain-text log under `logs/pipeline.log`; the API
//! tails it for UI consumption. Appends are best-effort and never fail the
//! pipeline.

use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use tracing::warn;

/// Append-only handle on a project's log file.
#[derive(Debug, Clone)]
pub struct ProjectLog {
    path: PathBuf,
}

impl ProjectLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one timestamped line.
    pub fn append(&self, line: impl AsRef<str>) {
        let stamped = format!("{} {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"), line.as_ref());
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(stamped.as_bytes()));
        if let Err(e) = result {
            warn!(path = %self.path.display(), "failed to append project log: {}", e);
        }
    }

    /// Last `lines` lines of the log, oldest first. An absent file reads as
    /// empty.
    pub async fn tail(&self, lines: usize) -> Vec<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let all: Vec<&str> = content.lines().collect();
                let start = all.len().saturating_sub(lines);
                all[start..].iter().map(|s| s.to_string()).collect()
            }
            Err(_) => Vec::new(),
        }
    }
}
