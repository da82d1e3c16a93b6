//! Upload batch types and event payloads

use crate::local::LocalFile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UploadStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "error")]
    Error,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Completed | UploadStatus::Error)
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Completed => write!(f, "completed"),
            UploadStatus::Error => write!(f, "error"),
        }
    }
}

/// How a name conflict is settled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Resolution {
    #[serde(rename = "skip")]
    Skip,
    #[serde(rename = "rename")]
    Rename,
    #[serde(rename = "replace")]
    Replace,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Skip => write!(f, "skip"),
            Resolution::Rename => write!(f, "rename"),
            Resolution::Replace => write!(f, "replace"),
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" | "s" => Ok(Resolution::Skip),
            "rename" | "r" => Ok(Resolution::Rename),
            "replace" | "o" | "overwrite" => Ok(Resolution::Replace),
            other => Err(format!("unknown resolution: {}", other)),
        }
    }
}

/// A submitted file whose key already exists in the listing
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConflictRecord {
    /// Position of the file in the submitted selection
    pub file_index: usize,
    pub original_name: String,
    /// Target prefix + original name
    pub full_path: String,
    /// `None` until the user has decided
    pub resolution: Option<Resolution>,
}

/// One file of a batch and its lifecycle state
#[derive(Debug, Clone, Serialize)]
pub struct PendingUpload {
    #[serde(skip)]
    pub file: LocalFile,
    pub original_name: String,
    /// Name under the target prefix after any rename
    pub target_name: String,
    pub full_path: String,
    pub size_bytes: u64,
    pub replace: bool,
    pub status: UploadStatus,
    pub progress_percent: u32,
    pub error: Option<String>,
}

impl PendingUpload {
    pub(crate) fn new(file: LocalFile, prefix: &str, target_name: String, replace: bool) -> Self {
        PendingUpload {
            original_name: file.name.clone(),
            full_path: format!("{}{}", prefix, target_name),
            size_bytes: file.size,
            file,
            target_name,
            replace,
            status: UploadStatus::Pending,
            progress_percent: 0,
            error: None,
        }
    }

    pub fn was_renamed(&self) -> bool {
        self.original_name != self.target_name
    }
}

/// Progress event payload for one batch item
#[derive(Debug, Clone, Serialize)]
pub struct UploadProgress {
    pub batch_id: String,
    pub index: usize,
    pub percent: u32,
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    pub speed: f64, // bytes per second
}

/// Terminal summary of a batch: one entry per planned upload
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub items: Vec<PendingUpload>,
    /// Listing prefixes touched by completed uploads
    pub affected_prefixes: Vec<String>,
}

impl BatchReport {
    pub fn statuses(&self) -> Vec<UploadStatus> {
        self.items.iter().map(|item| item.status).collect()
    }

    pub fn completed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == UploadStatus::Completed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == UploadStatus::Error)
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Observer events for a progress view
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadEvent {
    BatchStarted {
        batch_id: String,
        items: Vec<PendingUpload>,
    },
    StatusChanged {
        batch_id: String,
        index: usize,
        status: UploadStatus,
        error: Option<String>,
    },
    Progress(UploadProgress),
    BatchSettled(BatchReport),
}

/// Whole-number percentage, 100 only once everything was acknowledged
pub(crate) fn percent_of(done: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done.min(total) as f64 / total as f64) * 100.0).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_status_display_matches_expected_strings() {
        assert_eq!(UploadStatus::Pending.to_string(), "pending");
        assert_eq!(UploadStatus::Uploading.to_string(), "uploading");
        assert_eq!(UploadStatus::Completed.to_string(), "completed");
        assert_eq!(UploadStatus::Error.to_string(), "error");
    }

    #[test]
    fn upload_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UploadStatus::Uploading).unwrap(),
            "\"uploading\""
        );
        assert!(UploadStatus::Error.is_terminal());
        assert!(!UploadStatus::Pending.is_terminal());
    }

    #[test]
    fn resolution_parses_short_forms() {
        assert_eq!("s".parse::<Resolution>().unwrap(), Resolution::Skip);
        assert_eq!("Rename".parse::<Resolution>().unwrap(), Resolution::Rename);
        assert_eq!("o".parse::<Resolution>().unwrap(), Resolution::Replace);
        assert!("later".parse::<Resolution>().is_err());
    }

    #[test]
    fn percent_of_floors_and_clamps() {
        assert_eq!(percent_of(0, 0), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(999, 1000), 99);
        assert_eq!(percent_of(2000, 1000), 100);
    }

    #[test]
    fn pending_upload_tracks_rename() {
        let file = LocalFile::from_bytes("a.txt", vec![0; 4]);
        let item = PendingUpload::new(file, "docs/", "a (1).txt".to_string(), false);
        assert_eq!(item.full_path, "docs/a (1).txt");
        assert_eq!(item.size_bytes, 4);
        assert!(item.was_renamed());
    }
}
