//! Cooking: temporary never-cook settings, the cooker run, and staging of its output.

pub mod exceptions;
pub mod game_ini;

pub use exceptions::build_never_cook_set;
pub use game_ini::{rewrite_never_cook_section, IniBackup};

use crate::context::{BuildContext, DEFAULT_STAGING_NAME};
use crate::error::{Error, Result};
use crate::pipeline::select_presets;
use crate::process::{run_external_tool, RunOptions, ToolCommand};
use crate::utils::{clean_directory, move_dir};
use camino::{Utf8Path, Utf8PathBuf};
use pakbuild_presets::{BuildConfig, CookSettings, OutputFilter};
use std::fs;

pub const COOK_STEP: &str = "UE4 Cooker";

/// Entries kept in a staged cook; everything else the cooker writes is pruned.
const STAGED_ENTRIES: [&str; 2] = ["content", "assetregistry.bin"];

/// Cooker noise hidden from the console on every cook.
pub fn default_cook_filters() -> Vec<OutputFilter> {
    vec![
        OutputFilter::starts_with("LogPython"),
        OutputFilter::starts_with("LogPluginManager"),
        OutputFilter::starts_with("LogGameplayTags"),
        OutputFilter::contains("Display: Loaded TargetPlatform"),
        OutputFilter::contains("is not initialized properly"),
        OutputFilter::contains("but it was never saved as an export"),
        OutputFilter::contains("has been saved with empty engine version"),
        OutputFilter::contains("when exposed to Python."),
        OutputFilter::contains(": Can't find file."),
    ]
}

/// Full, unversioned cook of the project for the configured platform.
pub fn cooker_command(ctx: &BuildContext) -> ToolCommand {
    ToolCommand::new(&ctx.cooker)
        .arg(&ctx.uproject_path)
        .arg("-run=Cook")
        .arg(format!("-TargetPlatform={}", ctx.target_platform))
        .args([
            "-ddc=InstalledDerivedDataBackendGraph",
            "-unversioned",
            "-fileopenlog",
            "-stdout",
            "-CrashForUAT",
            "-unattended",
            "-NoLogTimes",
            "-UTF8Output",
        ])
        .dir(&ctx.project_dir)
}

/// Never-cook list for `settings`, with aliases, variables and exceptions applied.
pub fn resolve_never_cook(ctx: &BuildContext, settings: &CookSettings) -> Result<Vec<String>> {
    tracing::info!("Resolving cook/nocook lists from config...");
    let never_cook = ctx.expander.resolve_list(&settings.directories_to_never_cook)?;
    let to_cook = ctx.expander.resolve_list(&settings.directories_to_cook)?;
    build_never_cook_set(&never_cook, &to_cook, &ctx.content_root())
}

/// Cook the project with `settings` and stage the result under `<staging>/<output_name>`.
///
/// Returns the staged game directory.
pub fn run_single_cook(
    ctx: &BuildContext,
    output_name: &str,
    settings: &CookSettings,
) -> Result<Utf8PathBuf> {
    tracing::info!("Starting cook for: '{}'", output_name);
    let never_cook = resolve_never_cook(ctx, settings)?;

    let backup = IniBackup::apply(&ctx.game_ini_path(), &never_cook)?;

    let mut filters = default_cook_filters();
    filters.extend(ctx.cook_output_filters.iter().cloned());
    run_external_tool(
        &cooker_command(ctx),
        COOK_STEP,
        RunOptions {
            filters: &filters,
            collect_errors: true,
            ..RunOptions::default()
        },
    )?;

    let target = ctx.staged_game_dir(output_name);
    relocate_cook_output(&ctx.cooked_output_dir(), &target)?;

    if let Some(backup) = backup {
        backup.restore()?;
    }
    tracing::info!("Cook complete for '{}'", output_name);
    Ok(target)
}

/// Move the cooker's output to `target`, replacing earlier output, and prune it.
pub fn relocate_cook_output(cooked: &Utf8Path, target: &Utf8Path) -> Result<()> {
    if !cooked.is_dir() {
        return Err(Error::CookOutputMissing(cooked.to_owned()));
    }

    tracing::info!("Moving cooked folder to staging area: {}", target);
    if let Some(parent) = target.parent() {
        clean_directory(parent)?;
    }
    move_dir(cooked, target)?;

    tracing::info!("Performing asset cleanup...");
    for entry in target.read_dir_utf8()? {
        let entry = entry?;
        let name = entry.file_name().to_ascii_lowercase();
        if STAGED_ENTRIES.contains(&name.as_str()) {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Run the cooks needed for `requested` presets, or the default cook when none are named.
///
/// Presets with a `cook_override` get their own cook; all others share the
/// default cook, which runs at most once. Returns the staged directories.
pub fn cook_all(
    ctx: &BuildContext,
    config: &BuildConfig,
    requested: &[String],
) -> Result<Vec<Utf8PathBuf>> {
    if requested.is_empty() {
        tracing::info!("No specific presets requested. Running DEFAULT cook.");
        return Ok(vec![run_single_cook(
            ctx,
            DEFAULT_STAGING_NAME,
            &config.cook_settings,
        )?]);
    }

    let selection = select_presets(&config.presets, requested)?;
    let mut staged = Vec::new();
    let mut default_cooked = false;
    for (name, preset) in selection.presets {
        match &preset.cook_override {
            Some(settings) => {
                tracing::info!("Preset '{}' has a cook override.", name);
                staged.push(run_single_cook(ctx, name, settings)?);
            }
            None if default_cooked => {
                tracing::info!("Preset '{}' uses the default cook, already done.", name);
            }
            None => {
                tracing::info!("Preset '{}' uses default cook settings.", name);
                staged.push(run_single_cook(
                    ctx,
                    DEFAULT_STAGING_NAME,
                    &config.cook_settings,
                )?);
                default_cooked = true;
            }
        }
    }
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{utf8_tempdir, write_files};

    #[test]
    fn test_cooker_command_flags() {
        let ctx = BuildContext::new(&crate::test_support::test_config(), "/work".into());
        let command = cooker_command(&ctx);

        assert_eq!(command.program(), Utf8Path::new("UE4Editor-Cmd.exe"));
        let args = command.get_args();
        assert_eq!(args[0], "/work/project/FSD.uproject");
        assert_eq!(args[1], "-run=Cook");
        assert_eq!(args[2], "-TargetPlatform=WindowsNoEditor");
        assert!(args.iter().any(|a| a == "-unversioned"));
    }

    #[test]
    fn test_relocate_prunes_to_content_and_registry() {
        let (_dir, root) = utf8_tempdir();
        write_files(
            &root,
            &[
                "cooked/FSD/Content/A.uasset",
                "cooked/FSD/AssetRegistry.bin",
                "cooked/FSD/Metadata/dev.txt",
                "cooked/FSD/Cooked.log",
                "staging/out/FSD/Content/Stale.uasset",
                "staging/out/leftover.txt",
            ],
        );

        let target = root.join("staging/out/FSD");
        relocate_cook_output(&root.join("cooked/FSD"), &target).unwrap();

        assert!(target.join("Content/A.uasset").is_file());
        assert!(target.join("AssetRegistry.bin").is_file());
        assert!(!target.join("Metadata").exists());
        assert!(!target.join("Cooked.log").exists());
        assert!(!target.join("Content/Stale.uasset").exists());
        assert!(!root.join("staging/out/leftover.txt").exists());
        assert!(!root.join("cooked/FSD").exists());
    }

    #[test]
    fn test_relocate_missing_output() {
        let (_dir, root) = utf8_tempdir();

        let err = relocate_cook_output(&root.join("nope"), &root.join("staging/x/FSD")).unwrap_err();
        assert!(matches!(err, Error::CookOutputMissing(_)));
    }

    #[test]
    fn test_resolve_never_cook_uses_aliases() {
        let (_dir, root) = utf8_tempdir();
        write_files(
            &root,
            &[
                "project/Content/_Mods/Hud/a.uasset",
                "project/Content/_Mods/Weapons/b.uasset",
            ],
        );
        let mut config = crate::test_support::test_config();
        config.variables.insert("mods".into(), "_Mods".into());
        config
            .nocook_aliases
            .insert("all_mods".into(), vec!["{mods}/".into()]);
        let ctx = BuildContext::new(&config, root.clone());

        let settings = CookSettings {
            directories_to_never_cook: vec!["@all_mods".into()],
            directories_to_cook: vec!["{mods}/Hud".into()],
        };
        assert_eq!(resolve_never_cook(&ctx, &settings).unwrap(), ["_Mods/Weapons"]);
    }

    /// The cooker is replaced by a shell script that checks the temporary
    /// `Game.ini` and fakes the cooker's output tree.
    #[cfg(unix)]
    #[test]
    fn test_single_cook_with_script_cooker() {
        let (_dir, root) = utf8_tempdir();
        let ini_original = "[/Script/UnrealEd.ProjectPackagingSettings]\nA=1\n";
        write_files(
            &root,
            &[
                "project/Content/X/Y/a.uasset",
                "project/Content/X/Z/b.uasset",
            ],
        );
        let ini = root.join("project/Intermediate/Config/CoalescedSourceConfigs/Game.ini");
        fs::create_dir_all(ini.parent().unwrap()).unwrap();
        fs::write(&ini, ini_original).unwrap();
        // The cooker is run as `<cooker> <uproject> -run=Cook ...`
        fs::write(
            root.join("project/FSD.uproject"),
            "cp Intermediate/Config/CoalescedSourceConfigs/Game.ini seen.ini\n\
             mkdir -p Saved/Cooked/WindowsNoEditor/FSD/Content/X/Y Saved/Cooked/WindowsNoEditor/FSD/Metadata\n\
             echo cooked > Saved/Cooked/WindowsNoEditor/FSD/Content/X/Y/a.uasset\n\
             echo registry > Saved/Cooked/WindowsNoEditor/FSD/AssetRegistry.bin\n\
             echo 'LogCook: Error: shader compile failed'\n",
        )
        .unwrap();

        let mut config = crate::test_support::test_config();
        config.ue4_cmd_path = "sh".into();
        let ctx = BuildContext::new(&config, root.clone());
        let settings = CookSettings {
            directories_to_never_cook: vec!["X".into()],
            directories_to_cook: vec!["X/Y".into()],
        };

        let staged = run_single_cook(&ctx, "alpha", &settings).unwrap();

        assert_eq!(staged, root.join("staging/alpha/FSD"));
        assert!(staged.join("Content/X/Y/a.uasset").is_file());
        assert!(staged.join("AssetRegistry.bin").is_file());
        assert!(!staged.join("Metadata").exists());
        let seen = fs::read_to_string(root.join("project/seen.ini")).unwrap();
        assert!(seen.contains("DirectoriesToNeverCook=(Path=\"/Game/X/Z\")"));
        assert_eq!(fs::read_to_string(&ini).unwrap(), ini_original);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_cook_restores_ini() {
        let (_dir, root) = utf8_tempdir();
        write_files(&root, &["project/Content/X/a.uasset"]);
        let ini = root.join("project/Intermediate/Config/CoalescedSourceConfigs/Game.ini");
        fs::create_dir_all(ini.parent().unwrap()).unwrap();
        fs::write(&ini, "original").unwrap();
        fs::write(root.join("project/FSD.uproject"), "exit 2\n").unwrap();

        let mut config = crate::test_support::test_config();
        config.ue4_cmd_path = "sh".into();
        let ctx = BuildContext::new(&config, root.clone());
        let settings = CookSettings {
            directories_to_never_cook: vec!["X".into()],
            directories_to_cook: vec![],
        };

        let err = run_single_cook(&ctx, DEFAULT_STAGING_NAME, &settings).unwrap_err();

        assert!(matches!(err, Error::ExternalToolFailed { code: 2, .. }));
        assert_eq!(fs::read_to_string(&ini).unwrap(), "original");
    }

    #[test]
    fn test_cook_all_rejects_unknown_preset() {
        let (_dir, root) = utf8_tempdir();
        let config = crate::test_support::test_config();
        let ctx = BuildContext::new(&config, root);

        let err = cook_all(&ctx, &config, &["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, Error::UnknownPreset { .. }));
    }
}
