//! Asset pattern resolution.
//!
//! A pattern names files relative to a search root and falls into one of
//! three classes, tested in this order:
//!
//! 1. **Bare name** (`WPN_Rifle`): no glob metacharacters, separators or dots.
//!    Matches every file named `WPN_Rifle.<ext>` anywhere under the root.
//! 2. **Directory** (`_Mods/Weapons/`): trailing separator. Matches every
//!    file beneath that directory.
//! 3. **Glob** (`_Mods/*/Icons/*.uasset`): anything else. Matched
//!    directories expand to every file beneath them.
//!
//! Results are always sets of files, ordered, so resolving the same pattern
//! twice against the same tree yields identical output.

use crate::error::{Error, Result};
use crate::utils::{files_under, normalize_rel, to_utf8};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use walkdir::WalkDir;

const BARE_NAME_EXCLUDED: [char; 6] = ['*', '?', '[', '/', '\\', '.'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternClass {
    BareName,
    Directory,
    Glob,
}

pub fn classify(pattern: &str) -> PatternClass {
    if !pattern.contains(BARE_NAME_EXCLUDED) {
        PatternClass::BareName
    } else if pattern.ends_with(['/', '\\']) {
        PatternClass::Directory
    } else {
        PatternClass::Glob
    }
}

/// Resolve a single pattern to the files it names under `root`.
pub fn resolve(pattern: &str, root: &Utf8Path) -> Result<BTreeSet<Utf8PathBuf>> {
    match classify(pattern) {
        PatternClass::BareName => resolve_bare_name(pattern, root),
        PatternClass::Directory => {
            let dir = root.join(normalize_rel(pattern));
            Ok(files_under(&dir)?.into_iter().collect())
        }
        PatternClass::Glob => {
            let mut files = BTreeSet::new();
            for path in glob_matches(pattern, root)? {
                if path.is_file() {
                    files.insert(path);
                } else if path.is_dir() {
                    files.extend(files_under(&path)?);
                }
            }
            Ok(files)
        }
    }
}

fn resolve_bare_name(name: &str, root: &Utf8Path) -> Result<BTreeSet<Utf8PathBuf>> {
    let mut files = BTreeSet::new();
    if !root.is_dir() {
        return Ok(files);
    }

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches_stem = entry
            .file_name()
            .to_str()
            .and_then(|file_name| file_name.strip_prefix(name))
            .is_some_and(|rest| rest.starts_with('.'));
        if matches_stem {
            files.insert(to_utf8(entry.into_path())?);
        }
    }

    Ok(files)
}

fn glob_matches(pattern: &str, root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(root.as_str()),
        pattern.replace('\\', "/")
    );
    let paths = glob::glob(&full).map_err(|source| Error::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })?;

    // Unreadable entries are skipped like the rest of the tree walk would
    paths
        .filter_map(std::result::Result::ok)
        .map(to_utf8)
        .collect()
}

/// Whether anything at all (file or directory) exists for `pattern`.
fn exists_on_disk(pattern: &str, root: &Utf8Path) -> Result<bool> {
    match classify(pattern) {
        PatternClass::BareName | PatternClass::Directory => {
            Ok(root.join(normalize_rel(pattern)).exists())
        }
        PatternClass::Glob => Ok(!glob_matches(pattern, root)?.is_empty()),
    }
}

/// Files per pattern plus the patterns that named nothing.
#[derive(Debug, Default, Clone)]
pub struct PatternResolution {
    pub per_pattern: BTreeMap<String, BTreeSet<Utf8PathBuf>>,
    pub unresolved: Vec<String>,
}

impl PatternResolution {
    /// Union of every pattern's files.
    pub fn files(&self) -> BTreeSet<Utf8PathBuf> {
        self.per_pattern.values().flatten().cloned().collect()
    }
}

/// Resolve a batch of patterns, collecting every unresolved one.
///
/// A pattern is unresolved when it yields no files and nothing on disk
/// matches it either. An existing but empty directory is therefore resolved.
pub fn resolve_patterns<'a, I>(patterns: I, root: &Utf8Path) -> Result<PatternResolution>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut resolution = PatternResolution::default();
    for pattern in patterns {
        if resolution.per_pattern.contains_key(pattern) {
            continue;
        }

        let files = resolve(pattern, root)?;
        if files.is_empty() && !exists_on_disk(pattern, root)? {
            resolution.unresolved.push(pattern.clone());
        }
        resolution.per_pattern.insert(pattern.clone(), files);
    }

    resolution.unresolved.sort();
    Ok(resolution)
}
