//! Local file handles submitted for upload

use crate::error::{StoreError, StoreResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the bytes of a pending upload come from
#[derive(Debug, Clone)]
pub enum UploadSource {
    File(PathBuf),
    Memory(Arc<Vec<u8>>),
}

/// A local file selected for upload. `name` is relative to the target
/// prefix and may contain `/` when a folder was expanded.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub source: UploadSource,
    pub name: String,
    pub size: u64,
}

impl LocalFile {
    /// Stat a file on disk and use its file name as the upload name
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.is_dir() {
            return Err(StoreError::InvalidName(format!(
                "{} is a directory",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StoreError::InvalidName(format!("{} has no usable file name", path.display()))
            })?
            .to_string();

        Ok(LocalFile {
            source: UploadSource::File(path.to_path_buf()),
            name,
            size: metadata.len(),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        LocalFile {
            source: UploadSource::Memory(Arc::new(data)),
            name: name.into(),
            size,
        }
    }

    /// Same content under a different upload name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        LocalFile {
            source: self.source.clone(),
            name: name.into(),
            size: self.size,
        }
    }
}

/// Recursively collect all files under `root` (stack-based walk).
///
/// Hidden entries are skipped; names are `/`-joined paths relative to `root`
/// and the result is sorted by name.
pub async fn collect_folder_files(root: impl AsRef<Path>) -> StoreResult<Vec<LocalFile>> {
    let root = root.as_ref().to_path_buf();
    if !tokio::fs::metadata(&root).await?.is_dir() {
        return Err(StoreError::InvalidName(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    continue;
                }
            }

            let metadata = tokio::fs::metadata(&path).await?;
            if metadata.is_file() {
                let relative = path.strip_prefix(&root).map_err(|e| {
                    StoreError::InvalidName(format!("Failed to get relative path: {}", e))
                })?;
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");

                files.push(LocalFile {
                    source: UploadSource::File(path.clone()),
                    name,
                    size: metadata.len(),
                });
            } else if metadata.is_dir() {
                stack.push(path);
            }
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(files)
}
