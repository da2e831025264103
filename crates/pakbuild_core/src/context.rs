use crate::expand::Expander;
use camino::{Utf8Path, Utf8PathBuf};
use pakbuild_presets::{BuildConfig, OutputFilter, OverrideSource};

/// Staging subdirectory that receives the default cook.
pub const DEFAULT_STAGING_NAME: &str = "__DEFAULT__";

/// Location of UnrealPak relative to the working directory when none is configured.
pub const DEFAULT_UNREALPAK_PATH: &str = "UnrealPak/Engine/Binaries/Win64/UnrealPak.exe";

/// Run-wide paths and settings, derived once from the configuration.
///
/// Every stage receives this by reference. Relative configuration paths are
/// anchored at `working_dir` here, so nothing downstream consults the
/// process's current directory.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub working_dir: Utf8PathBuf,
    pub uproject_path: Utf8PathBuf,
    pub project_dir: Utf8PathBuf,
    pub staging_dir: Utf8PathBuf,
    pub package_dir: Utf8PathBuf,
    /// Parent of the transient `build_<preset>` directories.
    pub build_root: Utf8PathBuf,
    pub cooker: Utf8PathBuf,
    pub unrealpak: Utf8PathBuf,
    pub game_dir_name: String,
    pub target_platform: String,
    pub expander: Expander,
    pub global_overrides: Vec<OverrideSource>,
    pub cook_output_filters: Vec<OutputFilter>,
}

impl BuildContext {
    pub fn new(config: &BuildConfig, working_dir: Utf8PathBuf) -> Self {
        let mut config = config.clone();
        config.resolve_paths(&working_dir);

        let project_dir = config
            .uproject_path
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| working_dir.clone());
        let unrealpak = config
            .unrealpak_path
            .unwrap_or_else(|| working_dir.join(DEFAULT_UNREALPAK_PATH));
        let build_root = config.build_dir.unwrap_or_else(|| working_dir.clone());

        Self {
            expander: Expander::new(config.variables, config.nocook_aliases),
            uproject_path: config.uproject_path,
            staging_dir: config.staging_dir,
            package_dir: config.package_dir,
            cooker: config.ue4_cmd_path,
            game_dir_name: config.game_dir_name,
            target_platform: config.target_platform,
            global_overrides: config.global_overrides,
            cook_output_filters: config.cook_output_filters,
            project_dir,
            unrealpak,
            build_root,
            working_dir,
        }
    }

    /// Anchor a configuration path at the working directory.
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.working_dir.join(path)
    }

    /// Uncooked project content, the root for cook exceptions.
    pub fn content_root(&self) -> Utf8PathBuf {
        self.project_dir.join("Content")
    }

    /// `<staging>/<output>/<game>`
    pub fn staged_game_dir(&self, output: &str) -> Utf8PathBuf {
        self.staging_dir.join(output).join(&self.game_dir_name)
    }

    /// `<staging>/<output>/<game>/Content`
    pub fn staged_content_dir(&self, output: &str) -> Utf8PathBuf {
        self.staged_game_dir(output).join("Content")
    }

    pub fn default_content_dir(&self) -> Utf8PathBuf {
        self.staged_content_dir(DEFAULT_STAGING_NAME)
    }

    pub fn build_dir_for(&self, preset: &str) -> Utf8PathBuf {
        self.build_root.join(format!("build_{}", preset))
    }

    pub fn package_dir_for(&self, preset: &str) -> Utf8PathBuf {
        self.package_dir.join(preset)
    }

    /// Where the cooker leaves its output for this project and platform.
    pub fn cooked_output_dir(&self) -> Utf8PathBuf {
        self.project_dir
            .join("Saved")
            .join("Cooked")
            .join(&self.target_platform)
            .join(&self.game_dir_name)
    }

    /// Coalesced config the cooker reads its never-cook list from.
    pub fn game_ini_path(&self) -> Utf8PathBuf {
        self.project_dir
            .join("Intermediate")
            .join("Config")
            .join("CoalescedSourceConfigs")
            .join("Game.ini")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_config;

    #[test]
    fn test_paths_anchor_at_working_dir() {
        let mut config = test_config();
        config.package_dir = Utf8PathBuf::from("/out/packages");
        let ctx = BuildContext::new(&config, Utf8PathBuf::from("/work"));

        assert_eq!(ctx.project_dir, Utf8PathBuf::from("/work/project"));
        assert_eq!(ctx.package_dir, Utf8PathBuf::from("/out/packages"));
        assert_eq!(
            ctx.unrealpak,
            Utf8PathBuf::from("/work/UnrealPak/Engine/Binaries/Win64/UnrealPak.exe")
        );
        assert_eq!(
            ctx.global_overrides[0].source,
            Utf8PathBuf::from("/work/overrides/global")
        );
        assert_eq!(ctx.cooker, Utf8PathBuf::from("UE4Editor-Cmd.exe"));
    }

    #[test]
    fn test_cooker_with_directory_anchors_at_working_dir() {
        let mut config = test_config();
        config.ue4_cmd_path = Utf8PathBuf::from("engine/Binaries/UE4Editor-Cmd");
        let ctx = BuildContext::new(&config, Utf8PathBuf::from("/work"));

        // The cooker runs from the project dir, so a relative path would resolve there
        assert_eq!(ctx.cooker, Utf8PathBuf::from("/work/engine/Binaries/UE4Editor-Cmd"));
        assert_ne!(ctx.project_dir, ctx.working_dir);
    }

    #[test]
    fn test_derived_directories() {
        let ctx = BuildContext::new(&test_config(), Utf8PathBuf::from("/work"));

        assert_eq!(
            ctx.default_content_dir(),
            Utf8PathBuf::from("/work/staging/__DEFAULT__/FSD/Content")
        );
        assert_eq!(ctx.build_dir_for("alpha"), Utf8PathBuf::from("/work/build_alpha"));
        assert_eq!(
            ctx.cooked_output_dir(),
            Utf8PathBuf::from("/work/project/Saved/Cooked/WindowsNoEditor/FSD")
        );
        assert_eq!(
            ctx.game_ini_path(),
            Utf8PathBuf::from("/work/project/Intermediate/Config/CoalescedSourceConfigs/Game.ini")
        );
    }
}
