//! Path normalization helpers shared by the scan and restore logic.
//!
//! All translation between the original hierarchy and the quarantine
//! hierarchy happens here, so the tree-walk and restore code never touch
//! OS path separators directly.

use std::path::{Component, Path, PathBuf};

/// Name of the quarantine subtree created under the scanned root.
pub const QUARANTINE_DIR_NAME: &str = "to delete";

/// Splits `path` into its plain components relative to `root`.
///
/// Returns an empty vector for the root itself and `None` when `path`
/// does not live under `root`.
pub fn relative_components(path: &Path, root: &Path) -> Option<Vec<String>> {
    let relative = path.strip_prefix(root).ok()?;
    Some(
        relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect(),
    )
}

/// Derives the quarantine location of a file from its original path.
///
/// The layout is `<root>/to delete/<relative parent dir>/<basename>`,
/// mirroring the file's original parent directory under the quarantine
/// subtree. Returns `None` when the original path is not under `root` or
/// has no filename component.
pub fn quarantine_path(root: &Path, original: &Path) -> Option<PathBuf> {
    let parent = original.parent()?;
    let relative_dir = parent.strip_prefix(root).ok()?;
    let name = original.file_name()?;
    Some(root.join(QUARANTINE_DIR_NAME).join(relative_dir).join(name))
}

/// Returns true if `path` lies inside the quarantine subtree of `root`.
pub fn under_quarantine(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root.join(QUARANTINE_DIR_NAME)).is_ok()
}
