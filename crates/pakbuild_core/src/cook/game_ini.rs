//! Temporary never-cook directives in the project's coalesced `Game.ini`.

use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

pub const PACKAGING_SECTION: &str = "[/Script/UnrealEd.ProjectPackagingSettings]";
const NEVER_COOK_KEY: &str = "DirectoriesToNeverCook=";

fn directive_lines(entries: &[String], newline: &str) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}(Path=\"/Game/{}\"){}",
                NEVER_COOK_KEY,
                entry.replace('\\', "/"),
                newline
            )
        })
        .collect()
}

/// Replace every `DirectoriesToNeverCook=` line of the packaging section with `entries`.
///
/// The new lines go at the end of the section. A file without the section
/// gets one appended. Everything outside the section is left byte-for-byte.
pub fn rewrite_never_cook_section(ini: &str, entries: &[String]) -> String {
    let newline = if ini.contains("\r\n") { "\r\n" } else { "\n" };
    let directives = directive_lines(entries, newline);

    let mut output = String::with_capacity(ini.len() + directives.len());
    let mut in_section = false;
    let mut written = false;

    for line in ini.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed == PACKAGING_SECTION {
            in_section = true;
        } else if in_section && trimmed.starts_with('[') {
            if !written {
                output.push_str(&directives);
                written = true;
            }
            in_section = false;
        } else if in_section && trimmed.starts_with(NEVER_COOK_KEY) {
            continue;
        }
        output.push_str(line);
    }

    if written {
        return output;
    }

    if !output.is_empty() && !output.ends_with('\n') {
        output.push_str(newline);
    }
    if !in_section {
        output.push_str(PACKAGING_SECTION);
        output.push_str(newline);
    }
    output.push_str(&directives);
    output
}

/// Rewritten `Game.ini` with a backup next to it.
///
/// The original file is restored when the guard is dropped, so the cooker's
/// configuration is put back on success, on error and on unwinding.
#[derive(Debug)]
pub struct IniBackup {
    ini_path: Utf8PathBuf,
    backup_path: Utf8PathBuf,
    restored: bool,
}

impl IniBackup {
    /// Back up `ini_path` and write `entries` into it.
    ///
    /// Returns `None` (and touches nothing) when there is nothing to write or
    /// the file does not exist yet.
    pub fn apply(ini_path: &Utf8Path, entries: &[String]) -> Result<Option<Self>> {
        if entries.is_empty() {
            return Ok(None);
        }
        if !ini_path.is_file() {
            tracing::warn!(
                "'{}' not found, cooking without a never-cook list",
                ini_path
            );
            return Ok(None);
        }

        let backup_path = Utf8PathBuf::from(format!("{}.bak", ini_path));
        fs::copy(ini_path, &backup_path)?;
        let guard = Self {
            ini_path: ini_path.to_owned(),
            backup_path,
            restored: false,
        };
        tracing::info!(
            "Backed up '{}' to '{}'",
            guard.ini_path.file_name().unwrap_or_default(),
            guard.backup_path.file_name().unwrap_or_default()
        );

        let original = fs::read_to_string(ini_path)?;
        fs::write(ini_path, rewrite_never_cook_section(&original, entries))?;
        tracing::info!(
            "Updated 'DirectoriesToNeverCook' with {} entries",
            entries.len()
        );

        Ok(Some(guard))
    }

    pub fn backup_path(&self) -> &Utf8Path {
        &self.backup_path
    }

    /// Restore now and report failures instead of logging them.
    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.move_back()
    }

    fn move_back(&self) -> Result<()> {
        if self.backup_path.is_file() {
            fs::rename(&self.backup_path, &self.ini_path)?;
            tracing::info!("Restored '{}' from backup", self.ini_path);
        }
        Ok(())
    }
}

impl Drop for IniBackup {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.move_back() {
            tracing::error!("Failed to restore '{}': {}", self.ini_path, e);
        }
    }
}
