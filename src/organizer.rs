/// Build phase of the quarantine workflow.
///
/// Walks the original folder hierarchy, mirrors its structure under the
/// "to delete" subtree, moves backup files into the mirrored locations and
/// records every move in the in-memory index, which is persisted once at
/// the end of the run. Also hosts the read-only discovery helpers used for
/// dry-run reporting.
use crate::classifier;
use crate::config::CompiledFilters;
use crate::index::{BackupIndex, Node, OrganizeError, OrganizeResult};
use crate::paths;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Outcome of a single quarantine move.
///
/// A vanished source is an expected per-item condition, not an error, so
/// callers can aggregate outcomes for batch reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The file was moved into the quarantine tree.
    Moved {
        original_path: PathBuf,
        quarantine_path: PathBuf,
    },
    /// The source file no longer existed at move time.
    SourceMissing { path: PathBuf },
}

/// Summary of an organize run.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Every relocated file as (original path, quarantine path).
    pub moved: Vec<(PathBuf, PathBuf)>,
    /// Files that could not be moved, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

impl OrganizeReport {
    /// Number of files relocated during the run.
    pub fn moved_files(&self) -> usize {
        self.moved.len()
    }
}

/// Relocates backup files into the quarantine tree and builds the index.
pub struct Organizer;

impl Organizer {
    /// Organizes a project folder.
    ///
    /// Recursively visits every directory under `root` (skipping the
    /// quarantine subtree), materializes the corresponding folder-node
    /// chain in the index, and relocates every backup file that passes the
    /// filter rules. The index is serialized to `to_delete_files.json` at
    /// the root once the walk completes, overwriting any prior index.
    ///
    /// A move whose source vanished is reported in the returned
    /// `OrganizeReport` and does not abort the scan.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::InvalidRoot` when `root` is not a directory;
    /// directory read/create and index write failures propagate.
    pub fn organize(root: &Path, filters: &CompiledFilters) -> OrganizeResult<OrganizeReport> {
        let root = canonical_root(root)?;

        let mut index = BackupIndex::new();
        let mut report = OrganizeReport::default();
        Self::scan_dir(&root, &root, &mut index.entries, filters, &mut report)?;

        index.save(&root)?;
        Ok(report)
    }

    fn scan_dir(
        root: &Path,
        dir: &Path,
        contents: &mut BTreeMap<String, Node>,
        filters: &CompiledFilters,
        report: &mut OrganizeReport,
    ) -> OrganizeResult<()> {
        let entries = fs::read_dir(dir).map_err(|e| OrganizeError::DirectoryReadFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();

            if path.is_dir() {
                // The quarantine subtree is never itself scanned.
                if name == paths::QUARANTINE_DIR_NAME {
                    continue;
                }
                let child = contents.entry(name).or_insert_with(Node::empty_folder);
                if let Node::Folder {
                    contents: child_contents,
                } = child
                {
                    Self::scan_dir(root, &path, child_contents, filters, report)?;
                }
            } else if path.is_file()
                && classifier::is_backup(&name)
                && filters.should_include(&path)
            {
                match Self::move_to_quarantine(root, &path)? {
                    MoveOutcome::Moved {
                        original_path,
                        quarantine_path,
                    } => {
                        contents.insert(
                            name,
                            Node::File {
                                original_path: original_path.clone(),
                            },
                        );
                        report.moved.push((original_path, quarantine_path));
                    }
                    MoveOutcome::SourceMissing { path } => {
                        report
                            .skipped
                            .push((path, "source file vanished before move".to_string()));
                    }
                }
            }
        }

        Ok(())
    }

    /// Moves a single file into its mirrored quarantine location.
    ///
    /// The mirrored directory is created if absent. A source that no longer
    /// exists yields `MoveOutcome::SourceMissing` rather than an error.
    pub fn move_to_quarantine(root: &Path, file_path: &Path) -> OrganizeResult<MoveOutcome> {
        let quarantine_path = paths::quarantine_path(root, file_path).ok_or_else(|| {
            OrganizeError::FileMoveFailure {
                source: file_path.to_path_buf(),
                destination: root.join(paths::QUARANTINE_DIR_NAME),
                source_error: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "file is not under the scanned root",
                ),
            }
        })?;

        if let Some(parent) = quarantine_path.parent() {
            fs::create_dir_all(parent).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        match fs::rename(file_path, &quarantine_path) {
            Ok(()) => Ok(MoveOutcome::Moved {
                original_path: file_path.to_path_buf(),
                quarantine_path,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(MoveOutcome::SourceMissing {
                path: file_path.to_path_buf(),
            }),
            Err(e) => Err(OrganizeError::FileMoveFailure {
                source: file_path.to_path_buf(),
                destination: quarantine_path,
                source_error: e,
            }),
        }
    }

    /// Lists the absolute paths of all primary `.rvt` files under `root`.
    ///
    /// A read-only query over the filesystem, independent of the index.
    pub fn find_primary_files(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| classifier::is_primary(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.into_path())
            .collect()
    }

    /// Finds, for each primary file, every backup anywhere under `root`
    /// whose name starts with the primary's base name and carries a 4-digit
    /// version segment. Deduplicated by absolute path across primaries.
    pub fn find_matching_backups(root: &Path, primaries: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut backups = Vec::new();

        for primary in primaries {
            let Some(base_name) = primary.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if name.starts_with(base_name)
                    && classifier::is_backup(&name)
                    && seen.insert(entry.path().to_path_buf())
                {
                    backups.push(entry.into_path());
                }
            }
        }

        backups
    }
}

/// Validates and canonicalizes the scanned root.
pub(crate) fn canonical_root(root: &Path) -> OrganizeResult<PathBuf> {
    if !root.is_dir() {
        return Err(OrganizeError::InvalidRoot {
            path: root.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "path is not a directory",
            ),
        });
    }
    root.canonicalize().map_err(|e| OrganizeError::InvalidRoot {
        path: root.to_path_buf(),
        source: e,
    })
}
