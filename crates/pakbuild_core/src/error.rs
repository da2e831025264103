//! Error types for the build pipeline.
//!
//! All fallible functions in this crate return [`Result<T>`]. Resolution
//! errors are batched: a single [`Error`] value carries every offending
//! pattern, file or preset of its kind so a configuration author can fix them
//! in one pass.

use crate::ownership::OwnershipConflict;
use crate::stage::AccessViolation;
use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while cooking, resolving or packing.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Filesystem I/O failed (copying, moving, listing directories).
    #[error("IO error: {0}")]
    #[diagnostic(code(io::operation_failed))]
    Io(#[from] std::io::Error),

    /// Walking a directory tree failed.
    #[error("Failed to walk directory: {0}")]
    #[diagnostic(code(io::walk_failed))]
    Walk(#[from] walkdir::Error),

    /// A path on disk is not valid UTF-8.
    #[error("Path is not valid UTF-8: {}", .0.display())]
    #[diagnostic(code(io::non_utf8_path))]
    NonUtf8Path(PathBuf),

    /// A glob pattern could not be compiled.
    #[error("Invalid glob pattern '{pattern}': {source}")]
    #[diagnostic(
        code(pattern::invalid_glob),
        help("Glob patterns support `*`, `?`, `**` and `[...]` character classes")
    )]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Variable or alias expansion went deeper than allowed.
    #[error("Expansion depth exceeded while expanding '{value}'")]
    #[diagnostic(
        code(expand::recursion_limit),
        help("Check for circular references between variables or aliases")
    )]
    RecursionLimitExceeded { value: String },

    /// Asset patterns of a preset that matched nothing.
    #[error(
        "Could not find the following assets for preset '{preset}' (searched in: {root}):\n{}",
        bullets(.patterns)
    )]
    #[diagnostic(
        code(assets::unresolved),
        help("Bare names match any extension, `dir/` matches a folder recursively, anything else is a glob relative to the cooked Content folder")
    )]
    UnresolvedPatterns {
        preset: String,
        root: Utf8PathBuf,
        patterns: Vec<String>,
    },

    /// Files claimed by `include` in more than one preset.
    #[error("Asset ownership conflict detected:\n{}", bullets(.0))]
    #[diagnostic(
        code(assets::ownership_conflict),
        help("A file may be included by only one preset; use `shared` with `friends` to let other presets consume it")
    )]
    OwnershipConflicts(Vec<OwnershipConflict>),

    /// Shared files consumed by presets that are not friends of their owners.
    #[error("Asset access violations found:\n{}", bullets(.0))]
    #[diagnostic(
        code(assets::access_violation),
        help("Add the preset to the owner's `friends` list, or stop referencing the file")
    )]
    AccessViolations(Vec<AccessViolation>),

    /// Resolved files that are not present in the cook output.
    #[error(
        "The following assets are missing from the cook source '{source_dir}':\n{}",
        bullets(.missing)
    )]
    #[diagnostic(
        code(stage::missing_files),
        help("Re-run the cook for this preset; the staged content is out of date")
    )]
    MissingStagedFiles {
        source_dir: Utf8PathBuf,
        missing: Vec<Utf8PathBuf>,
    },

    /// Neither a dedicated nor the default cook exists for a preset.
    #[error("No cooked assets found for '{preset}'. Expected either:\n{}", bullets(.expected))]
    #[diagnostic(code(stage::no_cooked_content))]
    NoCookedContent {
        preset: String,
        expected: Vec<Utf8PathBuf>,
    },

    /// Packing requires the default cook.
    #[error("Default staged content not found at '{0}'")]
    #[diagnostic(
        code(stage::no_default_cook),
        help("Run `pakbuild cook` (without preset names) at least once before packing")
    )]
    NoDefaultCook(Utf8PathBuf),

    /// A requested preset name is not in the configuration.
    #[error(
        "Preset '{name}' not found in the configuration (available: {})",
        .available.join(", ")
    )]
    #[diagnostic(code(config::unknown_preset))]
    UnknownPreset {
        name: String,
        available: Vec<String>,
    },

    /// The cooker exited successfully but left no output folder.
    #[error("Cooker output folder not found at '{0}'")]
    #[diagnostic(
        code(cook::output_missing),
        help("Check `target_platform` and `game_dir_name` in the configuration")
    )]
    CookOutputMissing(Utf8PathBuf),

    /// An external tool executable does not exist.
    #[error("{tool} not found at: {path}")]
    #[diagnostic(code(tool::not_found))]
    ToolNotFound { tool: String, path: Utf8PathBuf },

    /// An external tool could not be started.
    #[error("Failed to start {step}: {source}")]
    #[diagnostic(code(tool::spawn_failed))]
    ToolSpawn {
        step: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited with a non-zero status.
    #[error("Error during {step} (Code: {code})")]
    #[diagnostic(code(tool::failed))]
    ExternalToolFailed { step: String, code: i32 },

    /// The packer finished without writing the expected archive.
    #[error("Packer did not generate an archive at '{0}'")]
    #[diagnostic(code(tool::missing_archive))]
    MissingArchive(Utf8PathBuf),
}

fn bullets<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_lists_every_pattern() {
        let err = Error::UnresolvedPatterns {
            preset: "alpha".to_string(),
            root: Utf8PathBuf::from("/staging/Content"),
            patterns: vec!["Foo".to_string(), "Bar/".to_string()],
        };

        let message = err.to_string();
        assert!(message.contains("'alpha'"));
        assert!(message.contains("/staging/Content"));
        assert!(message.contains("  - Foo\n  - Bar/"));
    }

    #[test]
    fn test_tool_failure_message() {
        let err = Error::ExternalToolFailed {
            step: "UE4 Cooker".to_string(),
            code: 3,
        };
        assert_eq!(err.to_string(), "Error during UE4 Cooker (Code: 3)");
    }
}
