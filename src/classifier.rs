/// Filename classification for Revit project files.
///
/// Revit keeps the working file as `<name>.rvt` and writes rolling backups
/// as `<name>.NNNN.rvt` with a 4-digit, zero-padded version number. This
/// module decides from the filename alone which side of that split a file
/// falls on. Both predicates are pure and never touch the filesystem.
///
/// # Examples
///
/// ```
/// use revtidy::classifier::{is_backup, is_primary};
///
/// assert!(is_primary("Tower.rvt"));
/// assert!(is_backup("Tower.0007.rvt"));
/// assert!(!is_backup("Tower.007.rvt"));
/// ```

const EXTENSION: &str = ".rvt";
const VERSION_DIGITS: usize = 4;

/// Returns true if the name is a primary (in-use) Revit file.
///
/// A name is primary when it ends with `.rvt` and does NOT carry a
/// `.DDDD` version suffix immediately before the extension. Names too
/// short to hold a version suffix are always primary.
pub fn is_primary(name: &str) -> bool {
    name.ends_with(EXTENSION) && !has_version_suffix(name.as_bytes())
}

/// Returns true if the name is a disposable Revit backup file.
///
/// A name is a backup when it ends with `.rvt` and the five bytes
/// before the extension are a `.` followed by exactly 4 ASCII digits.
/// Every `.rvt` name satisfies exactly one of the two predicates.
pub fn is_backup(name: &str) -> bool {
    name.ends_with(EXTENSION) && has_version_suffix(name.as_bytes())
}

fn has_version_suffix(bytes: &[u8]) -> bool {
    // Shortest possible backup name is ".0000.rvt" (9 bytes).
    if bytes.len() < EXTENSION.len() + VERSION_DIGITS + 1 {
        return false;
    }

    let version_start = bytes.len() - EXTENSION.len() - VERSION_DIGITS;
    let version = &bytes[version_start..bytes.len() - EXTENSION.len()];
    version.iter().all(u8::is_ascii_digit) && bytes[version_start - 1] == b'.'
}
