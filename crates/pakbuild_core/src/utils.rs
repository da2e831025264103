//! Filesystem helpers shared by the cook and staging stages.
//!
//! Everything here works on UTF-8 paths. Entries whose names are not valid
//! UTF-8 surface as [`Error::NonUtf8Path`] instead of being skipped silently.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Convert a std path produced by the OS into a UTF-8 path.
pub fn to_utf8(path: PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(Error::NonUtf8Path)
}

/// Normalize separators to `/` and strip leading and trailing separators.
///
/// - `_Mods\Weapons\` -> `_Mods/Weapons`
/// - `/Game/` -> `Game`
pub fn normalize_rel(path: &str) -> String {
    path.trim()
        .replace('\\', "/")
        .trim_matches('/')
        .to_string()
}

/// All regular files beneath `dir`, recursively, in sorted order.
///
/// Returns an empty list when `dir` does not exist.
pub fn files_under(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(to_utf8(entry.into_path())?);
        }
    }
    Ok(files)
}

/// Names of the immediate subdirectories of `dir`, sorted.
pub fn subdirectories(dir: &Utf8Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Remove `dir` and everything in it. A missing directory is not an error.
pub fn clean_directory(dir: &Utf8Path) -> Result<()> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

/// Copy a single file, creating the destination's parent directories.
pub fn copy_file(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}

/// Merge the tree at `source` into `target`, overwriting existing files.
///
/// Returns the number of files copied.
pub fn copy_tree(source: &Utf8Path, target: &Utf8Path) -> Result<usize> {
    let files = files_under(source)?;
    for file in &files {
        // `files_under` only yields paths below `source`
        let rel = file.strip_prefix(source).unwrap_or(file);
        copy_file(file, &target.join(rel))?;
    }
    Ok(files.len())
}

/// Move a directory, falling back to copy-and-delete across filesystems.
pub fn move_dir(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    copy_tree(from, to)?;
    fs::remove_dir_all(from)?;
    Ok(())
}

/// Move a file, replacing `to` if it exists.
pub fn move_file(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    if to.is_file() {
        fs::remove_file(to)?;
    }
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}
