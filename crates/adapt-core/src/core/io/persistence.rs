use crate::core::models::ids::CampaignId;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Record for campaign '{campaign}' was already stored")]
    AlreadyStored { campaign: String },
    #[error("Record store rejected campaign '{campaign}': {reason}")]
    Rejected { campaign: String, reason: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for the one final record of each campaign.
///
/// Stores are write-once per campaign id: storing a second record under the
/// same id is an error.
pub trait RecordSink {
    fn store(&self, campaign: &CampaignId, record: &Value) -> Result<(), PersistenceError>;
}

/// Stores each record as `<dir>/<campaign-id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    dir: PathBuf,
}

impl JsonDirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn record_path(&self, campaign: &CampaignId) -> PathBuf {
        record_path(&self.dir, campaign)
    }
}

impl RecordSink for JsonDirectorySink {
    fn store(&self, campaign: &CampaignId, record: &Value) -> Result<(), PersistenceError> {
        write_record(&self.record_path(campaign), campaign, record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Stored,
    FallbackFile(PathBuf),
}

pub fn record_path(dir: &Path, campaign: &CampaignId) -> PathBuf {
    dir.join(format!("{}.json", campaign.file_stem()))
}

fn write_record(
    path: &Path,
    campaign: &CampaignId,
    record: &Value,
) -> Result<(), PersistenceError> {
    let io_error = |e: std::io::Error| PersistenceError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file: File = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => PersistenceError::AlreadyStored {
                campaign: campaign.to_string(),
            },
            _ => io_error(e),
        })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}

/// Hands `record` to `sink`, writing it to `<fallback_dir>/<campaign-id>.json`
/// when the sink fails.
pub fn persist_with_fallback(
    sink: &dyn RecordSink,
    campaign: &CampaignId,
    record: &Value,
    fallback_dir: &Path,
) -> Result<PersistOutcome, PersistenceError> {
    match sink.store(campaign, record) {
        Ok(()) => Ok(PersistOutcome::Stored),
        Err(e) => {
            let path = record_path(fallback_dir, campaign);
            warn!(
                campaign = %campaign,
                error = %e,
                fallback = %path.display(),
                "Record store failed; writing local fallback file."
            );
            write_record(&path, campaign, record)?;
            Ok(PersistOutcome::FallbackFile(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    struct RejectingSink;

    impl RecordSink for RejectingSink {
        fn store(&self, campaign: &CampaignId, _record: &Value) -> Result<(), PersistenceError> {
            Err(PersistenceError::Rejected {
                campaign: campaign.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    #[test]
    fn directory_sink_writes_pretty_json() {
        let dir = tempdir().unwrap();
        let sink = JsonDirectorySink::new(dir.path());
        let campaign = CampaignId::new("co-on-pt");

        let outcome =
            persist_with_fallback(&sink, &campaign, &json!({"rounds": 2}), dir.path()).unwrap();
        assert_eq!(outcome, PersistOutcome::Stored);

        let content = fs::read_to_string(sink.record_path(&campaign)).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["rounds"], 2);
    }

    #[test]
    fn directory_sink_is_write_once() {
        let dir = tempdir().unwrap();
        let sink = JsonDirectorySink::new(dir.path());
        let campaign = CampaignId::new("c");

        sink.store(&campaign, &json!({})).unwrap();
        let err = sink.store(&campaign, &json!({})).unwrap_err();
        assert!(matches!(err, PersistenceError::AlreadyStored { .. }));
    }

    #[test]
    fn failing_sink_falls_back_to_local_file() {
        let dir = tempdir().unwrap();
        let fallback = dir.path().join("fallback");
        let campaign = CampaignId::new("c/1");

        let outcome =
            persist_with_fallback(&RejectingSink, &campaign, &json!({"ok": true}), &fallback)
                .unwrap();

        let expected = fallback.join("c_1.json");
        assert_eq!(outcome, PersistOutcome::FallbackFile(expected.clone()));
        assert!(expected.exists());
    }
}
