use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// File holding the persisted history inside a working directory.
pub const HISTORY_FILE_NAME: &str = "session.dat";

/// Retained entries when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 20;

#[must_use]
pub fn history_file(dir: &Path) -> PathBuf {
    dir.join(HISTORY_FILE_NAME)
}

/// Sibling path a save is staged at before being renamed over `path`.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(HISTORY_FILE_NAME));
    name.push(".tmp");
    path.with_file_name(name)
}
