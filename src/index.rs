/// The persisted backup index: a JSON tree mirroring the original folder
/// hierarchy and mapping every quarantined file back to its original path.
///
/// Each folder node keys its children by filesystem basename; each file
/// node carries the absolute path the file occupied before relocation.
/// The tree is written once at the end of an organize run and rewritten
/// (compacted) after restore operations.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the index file persisted at the scanned root.
pub const INDEX_FILE_NAME: &str = "to_delete_files.json";

/// A node in the backup index tree.
///
/// Serializes as a tagged object: `{"type": "folder", "contents": {..}}`
/// or `{"type": "file", "original_path": "<absolute path>"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    /// A directory in the original hierarchy, with children keyed by basename.
    Folder { contents: BTreeMap<String, Node> },
    /// A relocated file and the absolute path it was moved away from.
    File { original_path: PathBuf },
}

impl Node {
    /// Creates an empty folder node.
    pub fn empty_folder() -> Self {
        Node::Folder {
            contents: BTreeMap::new(),
        }
    }

    /// Returns the node's folder contents, converting a file node into an
    /// empty folder first. Basenames are unique within a folder, so a file
    /// node squatting on a directory name is replaced.
    fn folder_mut(&mut self) -> &mut BTreeMap<String, Node> {
        if matches!(self, Node::File { .. }) {
            *self = Node::empty_folder();
        }
        match self {
            Node::Folder { contents } => contents,
            Node::File { .. } => unreachable!("file nodes were just replaced"),
        }
    }
}

/// The root of the backup index, persisted as `to_delete_files.json`.
///
/// Serializes transparently as the root folder's contents object, so the
/// on-disk JSON is a plain nested object tree with no wrapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupIndex {
    pub entries: BTreeMap<String, Node>,
}

impl BackupIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path of the index file for a given root.
    pub fn index_file_path(root: &Path) -> PathBuf {
        root.join(INDEX_FILE_NAME)
    }

    /// Returns true if the index records no files and no folders.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Walks or creates the folder-node chain for a directory, returning a
    /// mutable handle on that folder's contents.
    ///
    /// An empty component list addresses the root's own contents.
    pub fn folder_contents_mut(
        &mut self,
        components: &[String],
    ) -> &mut BTreeMap<String, Node> {
        let mut current = &mut self.entries;
        for part in components {
            current = current
                .entry(part.clone())
                .or_insert_with(Node::empty_folder)
                .folder_mut();
        }
        current
    }

    /// Descends the folder-node chain, returning the contents of the
    /// addressed folder or `None` when any segment is missing.
    pub fn folder_contents(&self, components: &[String]) -> Option<&BTreeMap<String, Node>> {
        let mut current = &self.entries;
        for part in components {
            match current.get(part) {
                Some(Node::Folder { contents }) => current = contents,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Finds the first file node keyed by `name`, pre-order.
    pub fn find_by_name(&self, name: &str) -> Option<&Path> {
        Self::find_in(&self.entries, &|key, _| key == name)
    }

    /// Finds the first file node whose original path equals `target`.
    pub fn find_by_original_path(&self, target: &Path) -> Option<&Path> {
        Self::find_in(&self.entries, &|_, original| original == target)
    }

    fn find_in<'a>(
        contents: &'a BTreeMap<String, Node>,
        matches: &dyn Fn(&str, &Path) -> bool,
    ) -> Option<&'a Path> {
        for (key, node) in contents {
            match node {
                Node::File { original_path } => {
                    if matches(key, original_path) {
                        return Some(original_path);
                    }
                }
                Node::Folder { contents: children } => {
                    if let Some(found) = Self::find_in(children, matches) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// Collects the original paths of every file node, depth-first.
    pub fn file_entries(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        Self::collect_files(&self.entries, &mut paths);
        paths
    }

    /// Collects the original paths of every file node under a folder chain.
    ///
    /// Returns `None` when the folder chain does not resolve.
    pub fn file_entries_under(&self, components: &[String]) -> Option<Vec<PathBuf>> {
        let contents = self.folder_contents(components)?;
        let mut paths = Vec::new();
        Self::collect_files(contents, &mut paths);
        Some(paths)
    }

    fn collect_files(contents: &BTreeMap<String, Node>, paths: &mut Vec<PathBuf>) {
        for node in contents.values() {
            match node {
                Node::File { original_path } => paths.push(original_path.clone()),
                Node::Folder { contents: children } => Self::collect_files(children, paths),
            }
        }
    }

    /// Removes the first file node whose original path equals `target`.
    ///
    /// Returns true if an entry was removed.
    pub fn remove_by_original_path(&mut self, target: &Path) -> bool {
        Self::remove_from(&mut self.entries, target)
    }

    fn remove_from(contents: &mut BTreeMap<String, Node>, target: &Path) -> bool {
        let mut matched_key = None;
        for (key, node) in contents.iter_mut() {
            match node {
                Node::File { original_path } if original_path.as_path() == target => {
                    matched_key = Some(key.clone());
                    break;
                }
                Node::Folder { contents: children } => {
                    if Self::remove_from(children, target) {
                        return true;
                    }
                }
                Node::File { .. } => {}
            }
        }
        match matched_key {
            Some(key) => {
                contents.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Drops every folder node with no remaining file entries beneath it.
    pub fn compact(&mut self) {
        Self::compact_contents(&mut self.entries);
    }

    fn compact_contents(contents: &mut BTreeMap<String, Node>) {
        contents.retain(|_, node| match node {
            Node::File { .. } => true,
            Node::Folder { contents: children } => {
                Self::compact_contents(children);
                !children.is_empty()
            }
        });
    }

    /// Writes the index as 4-space-indented JSON, overwriting any prior file.
    pub fn save(&self, root: &Path) -> OrganizeResult<()> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .map_err(|e| OrganizeError::IndexWriteFailed {
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("JSON serialization failed: {}", e),
                ),
            })?;

        fs::write(Self::index_file_path(root), buffer)
            .map_err(|e| OrganizeError::IndexWriteFailed { source: e })
    }

    /// Loads the index from disk, or `None` when no index file exists.
    pub fn load(root: &Path) -> OrganizeResult<Option<Self>> {
        let index_path = Self::index_file_path(root);

        if !index_path.exists() {
            return Ok(None);
        }

        let json_string = fs::read_to_string(&index_path)
            .map_err(|e| OrganizeError::IndexReadFailed { source: e })?;

        let index = serde_json::from_str(&json_string).map_err(|e| {
            OrganizeError::InvalidIndexFormat {
                reason: format!("JSON parse error: {}", e),
            }
        })?;

        Ok(Some(index))
    }

    /// Deletes the index file for a given root, if present.
    pub fn delete(root: &Path) -> OrganizeResult<()> {
        let index_path = Self::index_file_path(root);
        if index_path.exists() {
            fs::remove_file(&index_path)
                .map_err(|e| OrganizeError::IndexWriteFailed { source: e })?;
        }
        Ok(())
    }
}

/// Errors that can occur during organize and restore operations.
#[derive(Debug)]
pub enum OrganizeError {
    /// The supplied root path is not a directory.
    InvalidRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read a directory during the scan.
    DirectoryReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to create a mirrored quarantine directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file between the original and quarantine trees.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
    /// A restore was requested but no index file exists at the root.
    MissingIndex { root: PathBuf },
    /// Failed to write the index file.
    IndexWriteFailed { source: std::io::Error },
    /// Failed to read the index file.
    IndexReadFailed { source: std::io::Error },
    /// The index file has an invalid format.
    InvalidIndexFormat { reason: String },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoot { path, source } => {
                write!(f, "Invalid root path {}: {}", path.display(), source)
            }
            Self::DirectoryReadFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::MissingIndex { root } => {
                write!(f, "No index file found at {}", root.display())
            }
            Self::IndexWriteFailed { source } => {
                write!(f, "Failed to write index file: {}", source)
            }
            Self::IndexReadFailed { source } => {
                write!(f, "Failed to read index file: {}", source)
            }
            Self::InvalidIndexFormat { reason } => {
                write!(f, "Invalid index file format: {}", reason)
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

/// Result type for organize and restore operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
