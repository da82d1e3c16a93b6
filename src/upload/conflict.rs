//! Conflict detection and the one-at-a-time resolution handoff

use super::naming::generate_unique_name_with;
use super::types::{ConflictRecord, PendingUpload, Resolution};
use crate::error::StoreResult;
use crate::local::LocalFile;
use crate::object::{ancestor_prefixes, normalize_prefix, ObjectEntry};
use crate::transport::ObjectLister;
use futures_util::future::join_all;
use log::{debug, info, warn};
use std::collections::HashSet;
use tokio::sync::{mpsc, oneshot};

/// A conflict waiting for a user decision.
///
/// Answer with [`ConflictPrompt::respond`]. Dropping the prompt, or calling
/// [`ConflictPrompt::dismiss`], closes the dialog: this conflict and every
/// later one in the batch are skipped.
#[derive(Debug)]
pub struct ConflictPrompt {
    pub conflict: ConflictRecord,
    /// 1-based position among the batch's conflicts
    pub position: usize,
    pub total: usize,
    respond: oneshot::Sender<Resolution>,
}

impl ConflictPrompt {
    pub fn respond(self, resolution: Resolution) {
        let _ = self.respond.send(resolution);
    }

    pub fn dismiss(self) {}
}

/// Listing snapshot for conflict detection.
///
/// Listings stop at the next `/`, so names carrying sub-paths (folder
/// uploads) also need the listing of each folder they land in. Every such
/// folder under `prefix` is listed and the entries merged by key.
pub async fn listing_snapshot(
    lister: &dyn ObjectLister,
    prefix: &str,
    files: &[LocalFile],
) -> StoreResult<Vec<ObjectEntry>> {
    let prefix = normalize_prefix(prefix);
    let keys: Vec<String> = files
        .iter()
        .map(|f| format!("{}{}", prefix, f.name))
        .collect();

    let mut folders: Vec<String> = ancestor_prefixes(&keys)
        .into_iter()
        .filter(|p| p.starts_with(&prefix))
        .collect();
    if !folders.contains(&prefix) {
        folders.insert(0, prefix.clone());
    }
    debug!("listing_snapshot: {:?}", folders);

    let listings = join_all(folders.iter().map(|folder| {
        let scope = if folder.is_empty() {
            None
        } else {
            Some(folder.as_str())
        };
        lister.list_objects(scope)
    }))
    .await;

    let mut seen = HashSet::new();
    let mut snapshot = Vec::new();
    for listing in listings {
        for entry in listing? {
            if seen.insert(entry.name.clone()) {
                snapshot.push(entry);
            }
        }
    }
    Ok(snapshot)
}

/// Files whose `prefix + name` exactly matches an existing key, in
/// selection order
pub fn detect_conflicts(
    files: &[LocalFile],
    prefix: &str,
    existing: &[ObjectEntry],
) -> Vec<ConflictRecord> {
    let existing_names: HashSet<&str> = existing.iter().map(|e| e.name.as_str()).collect();

    files
        .iter()
        .enumerate()
        .filter_map(|(file_index, file)| {
            let full_path = format!("{}{}", prefix, file.name);
            if existing_names.contains(full_path.as_str()) {
                Some(ConflictRecord {
                    file_index,
                    original_name: file.name.clone(),
                    full_path,
                    resolution: None,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Present conflicts one at a time and record each decision before moving on.
///
/// A closed prompt channel or a dropped prompt ends the dialog; whatever is
/// still unresolved becomes `Skip`.
pub async fn resolve_conflicts(
    prompts: &mpsc::Sender<ConflictPrompt>,
    conflicts: &mut [ConflictRecord],
) {
    let total = conflicts.len();
    let mut dismissed = false;

    for (idx, conflict) in conflicts.iter_mut().enumerate() {
        if dismissed {
            conflict.resolution = Some(Resolution::Skip);
            continue;
        }

        let (respond, decision) = oneshot::channel();
        let prompt = ConflictPrompt {
            conflict: conflict.clone(),
            position: idx + 1,
            total,
            respond,
        };

        if prompts.send(prompt).await.is_err() {
            warn!("conflict_dialog: no listener, skipping {} conflicts", total - idx);
            dismissed = true;
            conflict.resolution = Some(Resolution::Skip);
            continue;
        }

        match decision.await {
            Ok(resolution) => {
                info!("conflict_resolved: {} -> {}", conflict.full_path, resolution);
                conflict.resolution = Some(resolution);
            }
            Err(_) => {
                info!(
                    "conflict_dialog: dismissed at {} ({} of {})",
                    conflict.full_path,
                    idx + 1,
                    total
                );
                dismissed = true;
                conflict.resolution = Some(Resolution::Skip);
            }
        }
    }
}

/// Build the final upload set in selection order.
///
/// Non-conflicting files keep their names; conflicting files follow their
/// resolution. Renamed targets avoid every existing key and every key
/// already claimed by this batch.
pub fn plan_uploads(
    files: Vec<LocalFile>,
    prefix: &str,
    existing: &[ObjectEntry],
    conflicts: &[ConflictRecord],
) -> Vec<PendingUpload> {
    let resolution_for = |index: usize| {
        conflicts
            .iter()
            .find(|c| c.file_index == index)
            .map(|c| c.resolution.unwrap_or(Resolution::Skip))
    };

    let mut taken: HashSet<String> = existing.iter().map(|e| e.name.clone()).collect();
    for (index, file) in files.iter().enumerate() {
        if resolution_for(index).is_none() {
            taken.insert(format!("{}{}", prefix, file.name));
        }
    }

    let mut plan = Vec::with_capacity(files.len());
    for (index, file) in files.into_iter().enumerate() {
        match resolution_for(index) {
            None => {
                let name = file.name.clone();
                plan.push(PendingUpload::new(file, prefix, name, false));
            }
            Some(Resolution::Skip) => {}
            Some(Resolution::Replace) => {
                let name = file.name.clone();
                plan.push(PendingUpload::new(file, prefix, name, true));
            }
            Some(Resolution::Rename) => {
                let name = generate_unique_name_with(&file.name, |candidate| {
                    taken.contains(&format!("{}{}", prefix, candidate))
                });
                taken.insert(format!("{}{}", prefix, name));
                plan.push(PendingUpload::new(file, prefix, name, false));
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> LocalFile {
        LocalFile::from_bytes(name, name.as_bytes().to_vec())
    }

    fn listing(names: &[&str]) -> Vec<ObjectEntry> {
        names
            .iter()
            .map(|n| ObjectEntry::file(*n, 10, "2024-01-01T00:00:00Z"))
            .collect()
    }

    /// One-level listings keyed by prefix, like the store returns them
    struct FolderListings {
        folders: Vec<(&'static str, Vec<ObjectEntry>)>,
        asked: std::sync::Mutex<Vec<Option<String>>>,
    }

    #[async_trait::async_trait]
    impl ObjectLister for FolderListings {
        async fn list_objects(&self, prefix: Option<&str>) -> StoreResult<Vec<ObjectEntry>> {
            self.asked
                .lock()
                .unwrap()
                .push(prefix.map(str::to_string));
            let wanted = prefix.unwrap_or("");
            Ok(self
                .folders
                .iter()
                .find(|(p, _)| *p == wanted)
                .map(|(_, entries)| entries.clone())
                .unwrap_or_default())
        }
    }

    #[test]
    fn detection_is_exact_and_case_sensitive() {
        let files = vec![file("a.txt"), file("B.txt"), file("c.txt")];
        let existing = listing(&["docs/a.txt", "docs/b.txt", "c.txt"]);

        let conflicts = detect_conflicts(&files, "docs/", &existing);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].file_index, 0);
        assert_eq!(conflicts[0].full_path, "docs/a.txt");
        assert_eq!(conflicts[0].resolution, None);
    }

    #[test]
    fn detection_preserves_selection_order() {
        let files = vec![file("b.txt"), file("x.txt"), file("a.txt")];
        let existing = listing(&["a.txt", "b.txt"]);

        let order: Vec<String> = detect_conflicts(&files, "", &existing)
            .into_iter()
            .map(|c| c.original_name)
            .collect();
        assert_eq!(order, vec!["b.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn prompts_arrive_one_at_a_time_in_order() {
        let files = vec![file("a.txt"), file("b.txt")];
        let existing = listing(&["a.txt", "b.txt"]);
        let mut conflicts = detect_conflicts(&files, "", &existing);

        let (tx, mut rx) = mpsc::channel::<ConflictPrompt>(1);
        let ui = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(prompt) = rx.recv().await {
                seen.push((prompt.conflict.original_name.clone(), prompt.position, prompt.total));
                prompt.respond(Resolution::Rename);
            }
            seen
        });

        resolve_conflicts(&tx, &mut conflicts).await;
        drop(tx);

        let seen = ui.await.unwrap();
        assert_eq!(
            seen,
            vec![("a.txt".to_string(), 1, 2), ("b.txt".to_string(), 2, 2)]
        );
        assert!(conflicts
            .iter()
            .all(|c| c.resolution == Some(Resolution::Rename)));
    }

    #[tokio::test]
    async fn dismissal_skips_current_and_remaining() {
        let files = vec![file("a.txt"), file("b.txt"), file("c.txt")];
        let existing = listing(&["a.txt", "b.txt", "c.txt"]);
        let mut conflicts = detect_conflicts(&files, "", &existing);

        let (tx, mut rx) = mpsc::channel::<ConflictPrompt>(1);
        let ui = tokio::spawn(async move {
            let mut shown = 0;
            while let Some(prompt) = rx.recv().await {
                shown += 1;
                if prompt.position == 1 {
                    prompt.respond(Resolution::Replace);
                } else {
                    prompt.dismiss();
                }
            }
            shown
        });

        resolve_conflicts(&tx, &mut conflicts).await;
        drop(tx);

        assert_eq!(ui.await.unwrap(), 2);
        let resolutions: Vec<_> = conflicts.iter().map(|c| c.resolution).collect();
        assert_eq!(
            resolutions,
            vec![
                Some(Resolution::Replace),
                Some(Resolution::Skip),
                Some(Resolution::Skip)
            ]
        );
    }

    #[tokio::test]
    async fn closed_channel_skips_everything() {
        let files = vec![file("a.txt")];
        let existing = listing(&["a.txt"]);
        let mut conflicts = detect_conflicts(&files, "", &existing);

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        resolve_conflicts(&tx, &mut conflicts).await;

        assert_eq!(conflicts[0].resolution, Some(Resolution::Skip));
    }

    #[test]
    fn plan_renames_past_existing_keys() {
        let files = vec![file("report.txt")];
        let existing = listing(&["docs/report.txt", "docs/report (1).txt"]);
        let mut conflicts = detect_conflicts(&files, "docs/", &existing);
        conflicts[0].resolution = Some(Resolution::Rename);

        let plan = plan_uploads(files, "docs/", &existing, &conflicts);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].target_name, "report (2).txt");
        assert_eq!(plan[0].full_path, "docs/report (2).txt");
        assert!(!plan[0].replace);
    }

    #[test]
    fn plan_avoids_names_claimed_within_the_batch() {
        let files = vec![file("a.txt"), file("a (1).txt")];
        let existing = listing(&["a.txt"]);
        let mut conflicts = detect_conflicts(&files, "", &existing);
        conflicts[0].resolution = Some(Resolution::Rename);

        let plan = plan_uploads(files, "", &existing, &conflicts);
        let targets: Vec<&str> = plan.iter().map(|p| p.full_path.as_str()).collect();
        assert_eq!(targets, vec!["a (2).txt", "a (1).txt"]);
    }

    #[test]
    fn plan_drops_skips_and_flags_replacements() {
        let files = vec![file("keep.txt"), file("skip.txt"), file("swap.txt")];
        let existing = listing(&["skip.txt", "swap.txt"]);
        let mut conflicts = detect_conflicts(&files, "", &existing);
        conflicts[0].resolution = Some(Resolution::Skip);
        conflicts[1].resolution = Some(Resolution::Replace);

        let plan = plan_uploads(files, "", &existing, &conflicts);
        let summary: Vec<(&str, bool)> = plan
            .iter()
            .map(|p| (p.target_name.as_str(), p.replace))
            .collect();
        assert_eq!(summary, vec![("keep.txt", false), ("swap.txt", true)]);
    }

    #[test]
    fn unresolved_conflicts_are_skipped() {
        let files = vec![file("a.txt")];
        let existing = listing(&["a.txt"]);
        let conflicts = detect_conflicts(&files, "", &existing);

        assert!(plan_uploads(files, "", &existing, &conflicts).is_empty());
    }

    #[tokio::test]
    async fn snapshot_covers_nested_folders_of_a_folder_upload() {
        let lister = FolderListings {
            folders: vec![
                (
                    "backup/",
                    vec![
                        ObjectEntry::folder("backup/album/"),
                        ObjectEntry::file("backup/x.txt", 1, "t"),
                    ],
                ),
                ("backup/album/", listing(&["backup/album/cover.jpg"])),
            ],
            asked: std::sync::Mutex::new(Vec::new()),
        };
        let files = vec![file("album/cover.jpg"), file("album/raw/1.cr2"), file("x.txt")];

        let snapshot = listing_snapshot(&lister, "backup", &files).await.unwrap();
        let mut asked = lister.asked.lock().unwrap().clone();
        asked.sort();
        assert_eq!(
            asked,
            vec![
                Some("backup/".to_string()),
                Some("backup/album/".to_string()),
                Some("backup/album/raw/".to_string()),
            ]
        );

        let conflicts = detect_conflicts(&files, "backup/", &snapshot);
        let paths: Vec<&str> = conflicts.iter().map(|c| c.full_path.as_str()).collect();
        assert_eq!(paths, vec!["backup/album/cover.jpg", "backup/x.txt"]);
    }

    #[tokio::test]
    async fn snapshot_at_root_lists_bucket_once() {
        let lister = FolderListings {
            folders: vec![("", listing(&["a.txt"]))],
            asked: std::sync::Mutex::new(Vec::new()),
        };

        let snapshot = listing_snapshot(&lister, "", &[file("a.txt")]).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(*lister.asked.lock().unwrap(), vec![None]);
    }
}
