use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

/// Create `path` if missing, and clear out anything already in it.
/// Errors out rather than running on top of state it could not remove.
pub fn ensure_exists_and_empty(path: &Path) -> std::io::Result<PathBuf> {
    if path.exists() {
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        debug!(path = %path.display(), "cleared pre-existing working directory");
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

pub fn create_parent_dir_if_not_exist(path: &Path) -> std::io::Result<()> {
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    Ok(())
}

pub fn open_file_for_append(path: PathBuf) -> std::io::Result<File> {
    create_parent_dir_if_not_exist(&path)?;
    OpenOptions::new().append(true).create(true).open(&path)
}
