/// Restore operations for quarantined backup files.
///
/// All variants load the persisted index, move quarantined files back to
/// their original paths, prune now-empty quarantine directories upward, and
/// rewrite the index with the restored entries removed. Every per-item
/// condition (lookup miss, missing quarantined copy, move failure) is
/// recovered locally so batch operations never abort partway.
use crate::index::{BackupIndex, OrganizeError, OrganizeResult};
use crate::organizer::canonical_root;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of restoring a single index entry.
enum ItemOutcome {
    Restored,
    /// The quarantined copy was not found on disk.
    QuarantineMissing(PathBuf),
    Failed(PathBuf, String),
}

/// Summary of a restore operation.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Number of files moved back to their original paths.
    pub restored_files: usize,
    /// Entries skipped with the reason (lookup miss, quarantined copy absent).
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Entries whose move back failed, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
}

impl RestoreReport {
    /// Returns true if nothing was skipped and nothing failed.
    pub fn is_complete_success(&self) -> bool {
        self.skipped_files.is_empty() && self.failed_restores.is_empty()
    }
}

/// Moves quarantined files back to their original locations.
pub struct RestoreManager;

impl RestoreManager {
    /// Restores the first index entry keyed by `name` (pre-order).
    ///
    /// Reports "not found in index" when no entry matches and "not found in
    /// delete folder" when the quarantined copy is absent on disk; neither
    /// is an error.
    pub fn restore_file(root: &Path, name: &str) -> OrganizeResult<RestoreReport> {
        Self::restore_single(root, PathBuf::from(name), |index| {
            index.find_by_name(name).map(Path::to_path_buf)
        })
    }

    /// Restores the first index entry whose original path equals
    /// `original_path`.
    ///
    /// The query is normalized first: relative paths resolve against the
    /// root, and the parent directory is canonicalized when it still
    /// exists, so alternate spellings of the same file (a symlinked
    /// prefix, `..` components) match the paths the index stores.
    pub fn restore_file_by_path(
        root: &Path,
        original_path: &Path,
    ) -> OrganizeResult<RestoreReport> {
        let query = normalize_query(&canonical_root(root)?, original_path);
        Self::restore_single(root, query.clone(), |index| {
            index.find_by_original_path(&query).map(Path::to_path_buf)
        })
    }

    fn restore_single(
        root: &Path,
        query: PathBuf,
        find: impl FnOnce(&BackupIndex) -> Option<PathBuf>,
    ) -> OrganizeResult<RestoreReport> {
        let root = canonical_root(root)?;
        let mut index = Self::load_index(&root)?;
        let mut report = RestoreReport::default();

        match find(&index) {
            Some(original_path) => {
                Self::restore_entry(&root, &original_path, &mut index, &mut report);
                Self::persist_index(&root, index)?;
            }
            None => {
                report
                    .skipped_files
                    .push((query, "not found in index".to_string()));
            }
        }

        Ok(report)
    }

    /// Restores every file recorded in the index, depth-first.
    pub fn restore_all(root: &Path) -> OrganizeResult<RestoreReport> {
        Self::restore_all_with(root, |_| {})
    }

    /// Restores every file recorded in the index, invoking `observer` after
    /// each processed entry (restored or not) for progress reporting.
    pub fn restore_all_with(
        root: &Path,
        mut observer: impl FnMut(&Path),
    ) -> OrganizeResult<RestoreReport> {
        let root = canonical_root(root)?;
        let mut index = Self::load_index(&root)?;
        let mut report = RestoreReport::default();

        for original_path in index.file_entries() {
            Self::restore_entry(&root, &original_path, &mut index, &mut report);
            observer(&original_path);
        }

        Self::persist_index(&root, index)?;
        Ok(report)
    }

    /// Restores every file whose original path falls under `folder`.
    ///
    /// The folder is resolved against the index's folder-node chain;
    /// a missing segment reports "folder not found" and nothing is moved.
    /// Files in sibling folders stay quarantined.
    pub fn restore_folder(root: &Path, folder: &Path) -> OrganizeResult<RestoreReport> {
        let root = canonical_root(root)?;
        let mut index = Self::load_index(&root)?;
        let mut report = RestoreReport::default();

        let absolute = if folder.is_absolute() {
            folder.to_path_buf()
        } else {
            root.join(folder)
        };

        let entries = paths::relative_components(&absolute, &root)
            .and_then(|components| index.file_entries_under(&components));

        match entries {
            Some(entries) => {
                for original_path in entries {
                    Self::restore_entry(&root, &original_path, &mut index, &mut report);
                }
                Self::persist_index(&root, index)?;
            }
            None => {
                report
                    .skipped_files
                    .push((absolute, "folder not found in index".to_string()));
            }
        }

        Ok(report)
    }

    fn load_index(root: &Path) -> OrganizeResult<BackupIndex> {
        BackupIndex::load(root)?.ok_or_else(|| OrganizeError::MissingIndex {
            root: root.to_path_buf(),
        })
    }

    /// Restores one entry, updating the index and the report in place.
    ///
    /// The index entry is removed only when the file actually moved back;
    /// entries whose quarantined copy is missing stay listed for inspection.
    fn restore_entry(
        root: &Path,
        original_path: &Path,
        index: &mut BackupIndex,
        report: &mut RestoreReport,
    ) {
        match Self::move_back(root, original_path) {
            ItemOutcome::Restored => {
                report.restored_files += 1;
                index.remove_by_original_path(original_path);
            }
            ItemOutcome::QuarantineMissing(path) => {
                report
                    .skipped_files
                    .push((path, "not found in delete folder".to_string()));
            }
            ItemOutcome::Failed(path, reason) => {
                report.failed_restores.push((path, reason));
            }
        }
    }

    fn move_back(root: &Path, original_path: &Path) -> ItemOutcome {
        let Some(quarantine_path) = paths::quarantine_path(root, original_path) else {
            return ItemOutcome::Failed(
                original_path.to_path_buf(),
                "original path is not under the root".to_string(),
            );
        };

        if !quarantine_path.exists() {
            return ItemOutcome::QuarantineMissing(quarantine_path);
        }

        if let Some(parent) = original_path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            return ItemOutcome::Failed(
                original_path.to_path_buf(),
                format!("could not recreate original directory: {}", e),
            );
        }

        if let Err(e) = fs::rename(&quarantine_path, original_path) {
            return ItemOutcome::Failed(
                quarantine_path,
                format!("failed to move file back: {}", e),
            );
        }

        if let Some(parent) = quarantine_path.parent() {
            prune_empty_dirs(parent, root);
        }

        ItemOutcome::Restored
    }

    /// Rewrites the index after a restore, dropping folder nodes left with
    /// no file entries. An index that emptied out is deleted from disk.
    fn persist_index(root: &Path, mut index: BackupIndex) -> OrganizeResult<()> {
        index.compact();
        if index.is_empty() {
            BackupIndex::delete(root)
        } else {
            index.save(root)
        }
    }
}

/// Normalizes a user-supplied original path for index lookup.
///
/// The index stores paths built from the canonicalized root, so the
/// query's parent is canonicalized too when that directory exists. A
/// parent that no longer resolves leaves the path as given.
fn normalize_query(root: &Path, path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => parent.join(name),
            Err(_) => absolute,
        },
        _ => absolute,
    }
}

/// Walks upward from `start` toward `root`, deleting empty directories.
///
/// Stops at the first non-empty directory, at the root, or when a directory
/// no longer exists. The quarantine subtree itself is removed when empty;
/// the root never is.
fn prune_empty_dirs(start: &Path, root: &Path) {
    let mut dir = start.to_path_buf();
    loop {
        if dir == root || !dir.exists() {
            break;
        }
        match fs::read_dir(&dir) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    break;
                }
            }
            Err(_) => break,
        }
        if fs::remove_dir(&dir).is_err() {
            break;
        }
        match dir.parent() {
            Some(parent) => dir = parent.to_path_buf(),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::index::INDEX_FILE_NAME;
    use crate::organizer::Organizer;
    use tempfile::TempDir;

    fn organize(root: &Path) {
        let filters = FilterConfig::default().compile().expect("Default filters");
        Organizer::organize(root, &filters).expect("Organize failed");
    }

    #[test]
    fn test_restore_missing_index() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = RestoreManager::restore_all(temp_dir.path());
        assert!(matches!(result, Err(OrganizeError::MissingIndex { .. })));
    }

    #[test]
    fn test_restore_file_by_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::create_dir(root.join("A")).expect("Failed to create subdir");
        fs::write(root.join("A/house.0001.rvt"), "backup").expect("write");
        organize(root);

        let report =
            RestoreManager::restore_file(root, "house.0001.rvt").expect("Restore failed");

        assert_eq!(report.restored_files, 1);
        assert!(report.is_complete_success());
        assert!(root.join("A/house.0001.rvt").exists());
        assert!(!root.join("to delete").exists());
    }

    #[test]
    fn test_restore_file_by_original_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().canonicalize().expect("canonicalize");

        fs::create_dir(root.join("A")).expect("Failed to create subdir");
        fs::write(root.join("A/house.0001.rvt"), "backup").expect("write");
        organize(&root);

        let report =
            RestoreManager::restore_file_by_path(&root, &root.join("A/house.0001.rvt"))
                .expect("Restore failed");

        assert_eq!(report.restored_files, 1);
        assert!(root.join("A/house.0001.rvt").exists());
    }

    #[test]
    fn test_restore_by_path_accepts_alternate_spellings() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::create_dir_all(root.join("A/B")).expect("Failed to create subdirs");
        fs::write(root.join("A/house.0001.rvt"), "backup").expect("write");
        fs::write(root.join("A/B/tower.0001.rvt"), "backup").expect("write");
        organize(root);

        // Uncanonicalized root plus a `..` hop, not the spelling the
        // index stores.
        let report = RestoreManager::restore_file_by_path(
            root,
            &root.join("A/B/../house.0001.rvt"),
        )
        .expect("Restore failed");
        assert_eq!(report.restored_files, 1);
        assert!(root.join("A/house.0001.rvt").exists());

        // Relative paths resolve against the root.
        let report =
            RestoreManager::restore_file_by_path(root, Path::new("A/B/tower.0001.rvt"))
                .expect("Restore failed");
        assert_eq!(report.restored_files, 1);
        assert!(root.join("A/B/tower.0001.rvt").exists());
    }

    #[test]
    fn test_restore_unknown_name_reports_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::write(root.join("house.0001.rvt"), "backup").expect("write");
        organize(root);

        let report = RestoreManager::restore_file(root, "other.0001.rvt")
            .expect("Restore should not error");

        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(report.skipped_files[0].1.contains("not found in index"));
    }

    #[test]
    fn test_restore_same_file_twice_is_noop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::write(root.join("house.0001.rvt"), "backup").expect("write");
        fs::write(root.join("house.0002.rvt"), "backup").expect("write");
        organize(root);

        let first = RestoreManager::restore_file(root, "house.0001.rvt").expect("Restore failed");
        assert_eq!(first.restored_files, 1);

        // The entry was removed on restore, so the second attempt is a
        // plain lookup miss.
        let second = RestoreManager::restore_file(root, "house.0001.rvt")
            .expect("Second restore should not error");
        assert_eq!(second.restored_files, 0);
        assert_eq!(second.skipped_files.len(), 1);
        assert!(second.skipped_files[0].1.contains("not found in index"));
        assert!(root.join("house.0001.rvt").exists());

        // Once the last entry is restored the index file itself goes away.
        RestoreManager::restore_file(root, "house.0002.rvt").expect("Restore failed");
        let third = RestoreManager::restore_file(root, "house.0002.rvt");
        assert!(matches!(third, Err(OrganizeError::MissingIndex { .. })));
    }

    #[test]
    fn test_restore_missing_quarantine_copy_is_skipped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::write(root.join("house.0001.rvt"), "backup").expect("write");
        organize(root);

        fs::remove_file(root.join("to delete/house.0001.rvt")).expect("remove quarantined copy");

        let report = RestoreManager::restore_file(root, "house.0001.rvt")
            .expect("Restore should not error");

        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(report.skipped_files[0].1.contains("not found in delete folder"));
        // The stale entry stays listed for inspection.
        let index = BackupIndex::load(root)
            .expect("Load failed")
            .expect("Index should still exist");
        assert!(index.find_by_name("house.0001.rvt").is_some());
    }

    #[test]
    fn test_restore_all_round_trip() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::create_dir_all(root.join("A/B")).expect("Failed to create subdirs");
        fs::write(root.join("A/house.rvt"), "primary").expect("write");
        fs::write(root.join("A/house.0001.rvt"), "backup1").expect("write");
        fs::write(root.join("A/B/tower.0002.rvt"), "backup2").expect("write");
        organize(root);

        let report = RestoreManager::restore_all(root).expect("Restore failed");

        assert_eq!(report.restored_files, 2);
        assert!(report.is_complete_success());
        assert!(root.join("A/house.0001.rvt").exists());
        assert!(root.join("A/B/tower.0002.rvt").exists());
        assert!(!root.join("to delete").exists());
        assert!(!root.join(INDEX_FILE_NAME).exists());
    }

    #[test]
    fn test_restore_folder_leaves_siblings_quarantined() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::create_dir_all(root.join("A")).expect("Failed to create subdirs");
        fs::create_dir_all(root.join("B")).expect("Failed to create subdirs");
        fs::write(root.join("A/house.0001.rvt"), "backup").expect("write");
        fs::write(root.join("B/tower.0001.rvt"), "backup").expect("write");
        organize(root);

        let report = RestoreManager::restore_folder(root, Path::new("A")).expect("Restore failed");

        assert_eq!(report.restored_files, 1);
        assert!(root.join("A/house.0001.rvt").exists());
        assert!(root.join("to delete/B/tower.0001.rvt").exists());
        assert!(!root.join("B/tower.0001.rvt").exists());

        // The remaining entry is still in the rewritten index.
        let index = BackupIndex::load(root)
            .expect("Load failed")
            .expect("Index should exist");
        assert!(index.find_by_name("tower.0001.rvt").is_some());
        assert!(index.find_by_name("house.0001.rvt").is_none());
    }

    #[test]
    fn test_restore_folder_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::write(root.join("house.0001.rvt"), "backup").expect("write");
        organize(root);

        let report = RestoreManager::restore_folder(root, Path::new("Missing"))
            .expect("Restore should not error");

        assert_eq!(report.restored_files, 0);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(report.skipped_files[0].1.contains("folder not found"));
    }

    #[test]
    fn test_prune_collapses_deep_empty_chain() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::create_dir_all(root.join("A/B/C/D")).expect("Failed to create subdirs");
        fs::write(root.join("A/B/C/D/deep.0001.rvt"), "backup").expect("write");
        organize(root);

        assert!(root.join("to delete/A/B/C/D/deep.0001.rvt").exists());

        let report = RestoreManager::restore_file(root, "deep.0001.rvt").expect("Restore failed");

        assert_eq!(report.restored_files, 1);
        assert!(root.join("A/B/C/D/deep.0001.rvt").exists());
        assert!(!root.join("to delete").exists());
    }

    #[test]
    fn test_prune_stops_at_non_empty_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::create_dir_all(root.join("A/B")).expect("Failed to create subdirs");
        fs::write(root.join("A/keepme.0001.rvt"), "backup").expect("write");
        fs::write(root.join("A/B/deep.0001.rvt"), "backup").expect("write");
        organize(root);

        RestoreManager::restore_file(root, "deep.0001.rvt").expect("Restore failed");

        // "to delete/A" still holds keepme, so pruning must stop there.
        assert!(!root.join("to delete/A/B").exists());
        assert!(root.join("to delete/A/keepme.0001.rvt").exists());
    }

    #[test]
    fn test_restore_recreates_missing_original_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        fs::create_dir(root.join("A")).expect("Failed to create subdir");
        fs::write(root.join("A/house.0001.rvt"), "backup").expect("write");
        organize(root);

        fs::remove_dir(root.join("A")).expect("remove original directory");

        let report = RestoreManager::restore_file(root, "house.0001.rvt").expect("Restore failed");

        assert_eq!(report.restored_files, 1);
        assert!(root.join("A/house.0001.rvt").exists());
    }
}
