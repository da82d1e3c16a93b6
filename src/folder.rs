//! Folder operations: create prefix markers and move objects into folders

use crate::error::{StoreError, StoreResult};
use crate::object::{join_key, move_destination_key, normalize_folder_path, ObjectEntry};
use crate::transport::{FolderCreator, ObjectMover};
use log::info;

/// Trimmed folder name if it only uses letters, digits, spaces, `_` and `-`
pub fn validate_folder_name(name: &str) -> StoreResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidName(
            "Please enter a folder name".to_string(),
        ));
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' ');
    if !valid {
        return Err(StoreError::InvalidName(format!(
            "{:?}: folder names can only contain letters, numbers, spaces, underscores, and hyphens",
            trimmed
        )));
    }
    Ok(trimmed)
}

/// Marker key for `name` created inside `current_prefix`
pub fn folder_key(current_prefix: &str, name: &str) -> String {
    normalize_folder_path(&join_key(current_prefix, name))
}

/// Create a folder marker under `current_prefix`.
///
/// The existence check runs against the full candidate key in the listing
/// snapshot the caller already holds; returns the created key.
pub async fn create_folder(
    store: &dyn FolderCreator,
    current_prefix: &str,
    name: &str,
    existing: &[ObjectEntry],
) -> StoreResult<String> {
    let name = validate_folder_name(name)?;
    let key = folder_key(current_prefix, name);

    if existing.iter().any(|entry| entry.name == key) {
        return Err(StoreError::AlreadyExists(key));
    }

    store.create_folder(&key).await?;
    info!("folder_created: {}", key);
    Ok(key)
}

/// Move `source_key` into `folder`, keeping its basename; returns the
/// destination key. Moving onto the same key is a no-op.
pub async fn move_to_folder(
    store: &dyn ObjectMover,
    source_key: &str,
    folder: &str,
) -> StoreResult<String> {
    if source_key.is_empty() || source_key.ends_with('/') {
        return Err(StoreError::InvalidName(format!(
            "{:?} is a folder; only objects can be moved",
            source_key
        )));
    }
    if folder.is_empty() {
        return Err(StoreError::InvalidName(
            "destination folder is empty".to_string(),
        ));
    }

    let destination = move_destination_key(source_key, folder);
    if destination == source_key {
        info!("move_skipped: {} already in {}", source_key, folder);
        return Ok(destination);
    }

    store.move_object(source_key, &destination).await?;
    info!("move_done: {} -> {}", source_key, destination);
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        created: Mutex<Vec<String>>,
        moved: Mutex<Vec<(String, String)>>,
        missing: bool,
    }

    #[async_trait]
    impl FolderCreator for RecordingStore {
        async fn create_folder(&self, key: &str) -> StoreResult<()> {
            self.created.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl ObjectMover for RecordingStore {
        async fn move_object(&self, source_key: &str, destination_key: &str) -> StoreResult<()> {
            if self.missing {
                return Err(StoreError::NotFound(source_key.to_string()));
            }
            self.moved
                .lock()
                .unwrap()
                .push((source_key.to_string(), destination_key.to_string()));
            Ok(())
        }
    }

    #[test]
    fn folder_names_are_validated() {
        assert_eq!(validate_folder_name("  My Folder_1 ").unwrap(), "My Folder_1");
        assert!(validate_folder_name("   ").is_err());
        assert!(validate_folder_name("a/b").is_err());
        assert!(validate_folder_name("dots.not.allowed").is_err());
    }

    #[test]
    fn folder_key_joins_prefix() {
        assert_eq!(folder_key("", "new"), "new/");
        assert_eq!(folder_key("docs/", "new"), "docs/new/");
        assert_eq!(folder_key("docs", "new"), "docs/new/");
    }

    #[tokio::test]
    async fn create_folder_checks_full_key() {
        let store = RecordingStore::default();
        // "new/" exists at the root, but we are inside "docs/"
        let existing = vec![ObjectEntry::folder("new/")];

        let key = create_folder(&store, "docs/", "new", &existing).await.unwrap();
        assert_eq!(key, "docs/new/");
        assert_eq!(*store.created.lock().unwrap(), vec!["docs/new/".to_string()]);
    }

    #[tokio::test]
    async fn create_folder_rejects_existing_marker() {
        let store = RecordingStore::default();
        let existing = vec![ObjectEntry::folder("docs/new/")];

        let err = create_folder(&store, "docs/", "new", &existing)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref k) if k == "docs/new/"));
        assert!(store.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn move_into_unnormalized_folder() {
        let store = RecordingStore::default();
        let destination = move_to_folder(&store, "photo.png", "images").await.unwrap();

        assert_eq!(destination, "images/photo.png");
        assert_eq!(
            *store.moved.lock().unwrap(),
            vec![("photo.png".to_string(), "images/photo.png".to_string())]
        );
    }

    #[tokio::test]
    async fn move_onto_same_key_is_noop() {
        let store = RecordingStore::default();
        let destination = move_to_folder(&store, "images/photo.png", "images/")
            .await
            .unwrap();

        assert_eq!(destination, "images/photo.png");
        assert!(store.moved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn move_rejects_folders_and_reports_store_errors() {
        let store = RecordingStore::default();
        assert!(matches!(
            move_to_folder(&store, "docs/", "images").await,
            Err(StoreError::InvalidName(_))
        ));

        let store = RecordingStore {
            missing: true,
            ..Default::default()
        };
        assert!(matches!(
            move_to_folder(&store, "gone.txt", "images").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
