//! Locating and loading the presets file for a command.

use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use pakbuild_core::BuildContext;
use pakbuild_presets::{find_config, load_config, BuildConfig};

/// A loaded presets file and the run context derived from it.
#[derive(Debug)]
pub struct LoadedProject {
    pub config_path: Utf8PathBuf,
    pub config: BuildConfig,
    pub ctx: BuildContext,
}

pub fn current_dir() -> Result<Utf8PathBuf, CliError> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|_| CliError::NonUtf8WorkingDir)
}

/// Uses the explicit `--config` path, or searches `working_dir` for a presets file.
pub fn resolve_config_path(
    config_path: Option<&str>,
    working_dir: &Utf8Path,
) -> Result<Utf8PathBuf, CliError> {
    match config_path {
        Some(path) => {
            let path = working_dir.join(path);
            if path.is_file() {
                Ok(path)
            } else {
                Err(CliError::config_not_found(path))
            }
        }
        None => find_config(working_dir)
            .ok_or_else(|| CliError::config_not_found(working_dir.to_owned())),
    }
}

/// Loads the presets file. Relative paths in it are anchored at `working_dir`.
pub fn load_project(
    config_path: Option<&str>,
    working_dir: &Utf8Path,
) -> Result<LoadedProject, CliError> {
    let config_path = resolve_config_path(config_path, working_dir)?;
    tracing::debug!("Loading presets from {}", config_path);

    let config = load_config(&config_path)?;
    let ctx = BuildContext::new(&config, working_dir.to_owned());
    Ok(LoadedProject {
        config_path,
        config,
        ctx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MINIMAL_CONFIG: &str = r#"
uproject_path: project/FSD.uproject
ue4_cmd_path: engine/UE4Editor-Cmd.exe
staging_dir: staging
package_dir: packages
presets:
  alpha:
    assets:
      include: [_Mods/Alpha/]
"#;

    fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_finds_config_in_working_dir() {
        let (_dir, root) = utf8_tempdir();
        fs::write(root.join("build_presets.yaml"), MINIMAL_CONFIG).unwrap();

        let project = load_project(None, &root).unwrap();
        assert_eq!(project.config_path, root.join("build_presets.yaml"));
        assert_eq!(project.ctx.uproject_path, root.join("project/FSD.uproject"));
        assert_eq!(project.ctx.staging_dir, root.join("staging"));
    }

    #[test]
    fn test_explicit_config_path() {
        let (_dir, root) = utf8_tempdir();
        fs::create_dir_all(root.join("conf")).unwrap();
        fs::write(root.join("conf/mine.yml"), MINIMAL_CONFIG).unwrap();

        let project = load_project(Some("conf/mine.yml"), &root).unwrap();
        assert_eq!(project.config_path, root.join("conf/mine.yml"));
        assert!(project.config.presets.get("alpha").is_some());
    }

    #[test]
    fn test_missing_config() {
        let (_dir, root) = utf8_tempdir();

        let err = load_project(None, &root).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));

        let err = load_project(Some("nope.yaml"), &root).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { search_path } if search_path == root.join("nope.yaml")));
    }

    #[test]
    fn test_invalid_config() {
        let (_dir, root) = utf8_tempdir();
        fs::write(root.join("build_presets.yaml"), "presets: [unclosed").unwrap();

        let err = load_project(None, &root).unwrap_err();
        assert!(matches!(err, CliError::ConfigLoad(_)));
    }
}
