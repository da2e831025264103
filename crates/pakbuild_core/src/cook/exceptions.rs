//! Flattening "never cook X, except X/Y" into the plain directory list the cooker accepts.

use crate::error::Result;
use crate::utils::{normalize_rel, subdirectories};
use camino::Utf8Path;
use std::collections::BTreeSet;

/// `path` equals `ancestor` or lies beneath it, compared segment-wise.
fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn depth(path: &str) -> usize {
    path.split('/').count()
}

/// Builds the never-cook directory list that excludes everything in
/// `never_cook` except the `to_cook` subtrees.
///
/// Each exception removes its most specific never-cook ancestor and re-adds,
/// level by level, every sibling directory that is not on the way to an
/// exception. Siblings are read from `content_root`; a level missing on disk
/// ends the walk for that exception. The result is sorted.
pub fn build_never_cook_set(
    never_cook: &BTreeSet<String>,
    to_cook: &BTreeSet<String>,
    content_root: &Utf8Path,
) -> Result<Vec<String>> {
    let never_cook: BTreeSet<String> = never_cook
        .iter()
        .map(|p| normalize_rel(p))
        .filter(|p| !p.is_empty())
        .collect();
    let exceptions: BTreeSet<String> = to_cook
        .iter()
        .map(|p| normalize_rel(p))
        .filter(|p| !p.is_empty())
        .collect();
    // An exception inside another exception is already cooked
    let exceptions: Vec<&String> = exceptions
        .iter()
        .filter(|e| !exceptions.iter().any(|o| o != *e && is_within(e, o)))
        .collect();

    let mut result = never_cook.clone();
    if exceptions.is_empty() {
        return Ok(result.into_iter().collect());
    }

    tracing::info!("Processing 'directories_to_cook' exceptions...");
    for exception in &exceptions {
        let Some(ancestor) = never_cook
            .iter()
            .filter(|n| is_within(exception, n))
            .max_by_key(|n| depth(n))
        else {
            tracing::warn!(
                "'to_cook' path '{}' does not fall under any 'never_cook' directory. Rule has no effect.",
                exception
            );
            continue;
        };

        result.remove(ancestor);
        if *exception == ancestor {
            continue;
        }

        let mut current = ancestor.clone();
        for part in exception[ancestor.len() + 1..].split('/') {
            let dir = content_root.join(&current);
            if !dir.is_dir() {
                break;
            }

            for sibling in subdirectories(&dir)? {
                if sibling == part {
                    continue;
                }
                let candidate = format!("{}/{}", current, sibling);
                if !exceptions.iter().any(|e| is_within(e, &candidate)) {
                    result.insert(candidate);
                }
            }
            current = format!("{}/{}", current, part);
        }
    }

    for exception in &exceptions {
        if let Some(cover) = result.iter().find(|n| is_within(exception, n)) {
            tracing::warn!(
                "'to_cook' path '{}' is still excluded by never-cook entry '{}'",
                exception,
                cover
            );
        }
    }

    tracing::info!(
        "Final 'never_cook' list contains {} specific paths after processing exceptions.",
        result.len()
    );
    Ok(result.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::tempdir;

    fn content_tree(dirs: &[&str]) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for d in dirs {
            fs::create_dir_all(root.join(d)).unwrap();
        }
        (dir, root)
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_exception_keeps_siblings() {
        let (_dir, root) = content_tree(&["X/Y", "X/Z"]);

        let result = build_never_cook_set(&set(&["X"]), &set(&["X/Y"]), &root).unwrap();
        assert_eq!(result, ["X/Z"]);
    }

    #[test]
    fn test_deep_exception_walks_every_level() {
        let (_dir, root) = content_tree(&["_Mods/A/Keep", "_Mods/A/Other", "_Mods/B", "_Mods/C"]);

        let result =
            build_never_cook_set(&set(&["_Mods/"]), &set(&["_Mods/A/Keep"]), &root).unwrap();
        assert_eq!(result, ["_Mods/A/Other", "_Mods/B", "_Mods/C"]);
    }

    #[test]
    fn test_sibling_exceptions_do_not_exclude_each_other() {
        let (_dir, root) = content_tree(&["X/Y", "X/W", "X/Z"]);

        let result = build_never_cook_set(&set(&["X"]), &set(&["X/Y", "X/W"]), &root).unwrap();
        assert_eq!(result, ["X/Z"]);
    }

    #[test]
    fn test_exception_without_ancestor_has_no_effect() {
        let (_dir, root) = content_tree(&["X/Y", "Other"]);

        let result = build_never_cook_set(&set(&["X"]), &set(&["Other/Y"]), &root).unwrap();
        assert_eq!(result, ["X"]);
    }

    #[test]
    fn test_missing_level_stops_walk() {
        let (_dir, root) = content_tree(&["X/Z"]);

        let result = build_never_cook_set(&set(&["X"]), &set(&["X/Gone/Deep"]), &root).unwrap();
        assert_eq!(result, ["X/Z"]);
    }

    #[test]
    fn test_most_specific_ancestor_is_split() {
        let (_dir, root) = content_tree(&["X/Y/A", "X/Y/B", "X/Q"]);

        let result =
            build_never_cook_set(&set(&["X", "X/Y"]), &set(&["X/Y/A"]), &root).unwrap();
        // `X` still covers the exception; only the inner entry is split
        assert_eq!(result, ["X", "X/Y/B"]);
    }

    #[test]
    fn test_separators_normalized_and_sorted() {
        let (_dir, root) = content_tree(&["b", "a"]);

        let result = build_never_cook_set(&set(&["b\\", "a/"]), &BTreeSet::new(), &root).unwrap();
        assert_eq!(result, ["a", "b"]);
    }

    #[test]
    fn test_exception_equal_to_entry_removes_it() {
        let (_dir, root) = content_tree(&["X", "Y"]);

        let result = build_never_cook_set(&set(&["X", "Y"]), &set(&["X"]), &root).unwrap();
        assert_eq!(result, ["Y"]);
    }
}
