use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::process::{run_external_tool, OutputStyle, RunOptions, ToolCommand};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

pub const MANIFEST_FILE_NAME: &str = "autogen.txt";

/// Turns a staged game directory into a single archive.
pub trait Packer {
    /// Pack `game_dir` and return the path of the archive written.
    ///
    /// The archive may be anywhere; the caller moves it into the package directory.
    fn pack(&self, game_dir: &Utf8Path, preset: &str) -> Result<Utf8PathBuf>;
}

/// Packs with UnrealPak through a generated response file.
#[derive(Debug, Clone)]
pub struct UnrealPak {
    exe: Utf8PathBuf,
    game_dir_name: String,
}

impl UnrealPak {
    pub fn new(exe: Utf8PathBuf, game_dir_name: impl Into<String>) -> Self {
        Self {
            exe,
            game_dir_name: game_dir_name.into(),
        }
    }

    pub fn from_context(ctx: &BuildContext) -> Self {
        Self::new(ctx.unrealpak.clone(), ctx.game_dir_name.clone())
    }
}

/// Response file line mapping everything in `game_dir` to the game's mount point.
pub fn manifest_line(game_dir: &Utf8Path, game_dir_name: &str) -> String {
    format!(
        "\"{}\\*.*\" \"..\\..\\..\\{}\\*.*\"\n",
        game_dir, game_dir_name
    )
}

impl Packer for UnrealPak {
    fn pack(&self, game_dir: &Utf8Path, preset: &str) -> Result<Utf8PathBuf> {
        if !self.exe.is_file() {
            return Err(Error::ToolNotFound {
                tool: "UnrealPak".to_string(),
                path: self.exe.clone(),
            });
        }

        let work_dir = game_dir.parent().unwrap_or(game_dir);
        let manifest = work_dir.join(MANIFEST_FILE_NAME);
        fs::write(&manifest, manifest_line(game_dir, &self.game_dir_name))?;

        let archive = game_dir.with_extension("pak");
        tracing::info!("Creating {}.pak with UnrealPak...", preset);
        let command = ToolCommand::new(&self.exe)
            .arg(&archive)
            .arg("-platform=Windows")
            .arg(format!("-create={}", manifest))
            .arg("-compress")
            .dir(work_dir);
        run_external_tool(
            &command,
            "UnrealPak",
            RunOptions {
                style: OutputStyle::Packer,
                ..RunOptions::default()
            },
        )?;

        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::utf8_tempdir;

    #[test]
    fn test_manifest_line() {
        assert_eq!(
            manifest_line(Utf8Path::new("C:/mods/build_alpha/FSD"), "FSD"),
            "\"C:/mods/build_alpha/FSD\\*.*\" \"..\\..\\..\\FSD\\*.*\"\n"
        );
    }

    #[test]
    fn test_missing_executable() {
        let (_dir, root) = utf8_tempdir();
        let packer = UnrealPak::new(root.join("UnrealPak.exe"), "FSD");

        let err = packer.pack(&root.join("build/FSD"), "alpha").unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    /// A shell script standing in for UnrealPak writes the archive it is asked for.
    #[cfg(unix)]
    #[test]
    fn test_pack_with_script() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, root) = utf8_tempdir();
        let exe = root.join("UnrealPak.sh");
        fs::write(
            &exe,
            "#!/bin/sh\necho \"LogPakFile: Display: Added 1 files\"\necho pak > \"$1\"\n",
        )
        .unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        fs::create_dir_all(root.join("build/FSD/Content")).unwrap();

        let archive = UnrealPak::new(exe, "FSD")
            .pack(&root.join("build/FSD"), "alpha")
            .unwrap();

        assert_eq!(archive, root.join("build/FSD.pak"));
        assert!(archive.is_file());
        let manifest = fs::read_to_string(root.join("build/autogen.txt")).unwrap();
        assert!(manifest.ends_with("\"..\\..\\..\\FSD\\*.*\"\n"));
    }
}
