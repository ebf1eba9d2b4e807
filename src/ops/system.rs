// src/ops/system.rs

use std::fs;
use std::io;
use std::path::Path;
use std::thread;

use tracing::debug;

/// The orchestrator only knows how to drive Linux toolchains.
pub fn is_supported_os() -> bool {
    if cfg!(target_os = "linux") {
        return true;
    }
    println!("Unsupported OS: {}", std::env::consts::OS);
    false
}

pub fn cpu_count() -> usize {
    thread::available_parallelism().map(usize::from).unwrap_or(1)
}

/// Remove a directory tree if it exists. Removal errors are logged, not
/// surfaced: a half-removed build tree will fail loudly at the next step.
pub fn remove_dir(path: &Path) {
    if path.is_dir()
        && let Err(err) = fs::remove_dir_all(path)
    {
        debug!(path = %path.display(), error = %err, "failed to remove directory");
    }
}

/// Create a directory and any missing parents. Fails if the path exists but
/// is not a directory.
pub fn create_dir(path: &Path) -> bool {
    if path.exists() && !path.is_dir() {
        return false;
    }
    fs::create_dir_all(path).is_ok()
}

/// Copy a directory tree, merging into an existing destination.
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> io::Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
