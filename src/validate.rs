//! Checks on the directory handed to the CLI before anything is scanned.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Validates that `root` names an existing directory and returns its
/// canonical form.
///
/// The canonical path matters for the artist/album guess: `.` or a trailing
/// slash would otherwise leave no directory name to parse.
pub fn validate_root_directory(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        bail!("Root directory '{}' does not exist", root.display());
    }
    if !root.is_dir() {
        bail!("Root directory '{}' is not a directory", root.display());
    }
    root.canonicalize()
        .with_context(|| format!("Failed to resolve '{}'", root.display()))
}

/// Final path component as text, or an error for paths like `/`.
pub fn directory_name(root: &Path) -> Result<String> {
    match root.file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => bail!(
            "Cannot guess an album from '{}'; pass --album",
            root.display()
        ),
    }
}
