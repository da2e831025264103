//! Per-preset staging: access checks, build directory, overrides and packing.

use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::ownership::{OwnershipResolution, ResolvedAssets, RuleKind};
use crate::packer::Packer;
use crate::utils::{clean_directory, copy_file, copy_tree, move_file};
use camino::{Utf8Path, Utf8PathBuf};
use pakbuild_presets::OverrideSource;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;

pub const ASSET_REGISTRY_FILE_NAME: &str = "AssetRegistry.bin";

/// A shared file used by a preset that is neither its owner nor a friend of the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessViolation {
    pub path: Utf8PathBuf,
    pub owner: String,
    pub preset: String,
}

impl fmt::Display for AccessViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot use asset '{}' owned by '{}', as '{}' is not a friend.",
            self.path, self.owner, self.preset
        )
    }
}

/// Split `assets` into the files `preset` may package and the access violations.
///
/// Included files need `preset` to be their owner. Shared files are usable
/// when they have no owner, when `preset` owns them, or when `preset` is a
/// friend of the owner.
pub fn partition_entitled(
    preset: &str,
    assets: &ResolvedAssets,
    resolution: &OwnershipResolution,
) -> (BTreeSet<Utf8PathBuf>, Vec<AccessViolation>) {
    let mut entitled = BTreeSet::new();
    let mut violations = Vec::new();

    for (path, kind) in assets {
        let owner = resolution.owner_of(path);
        match (kind, owner) {
            (RuleKind::Include, Some(owner)) if owner == preset => {
                entitled.insert(path.clone());
            }
            (RuleKind::Include, _) | (RuleKind::Exclude, _) => {}
            (RuleKind::Shared, None) => {
                entitled.insert(path.clone());
            }
            (RuleKind::Shared, Some(owner)) => {
                if owner == preset || resolution.is_friend(owner, preset) {
                    entitled.insert(path.clone());
                } else {
                    violations.push(AccessViolation {
                        path: path.clone(),
                        owner: owner.to_string(),
                        preset: preset.to_string(),
                    });
                }
            }
        }
    }

    (entitled, violations)
}

/// Files of `assets` that `preset` may package; any violation is an
/// [`Error::AccessViolations`] listing all of them.
pub fn select_entitled_files(
    preset: &str,
    assets: &ResolvedAssets,
    resolution: &OwnershipResolution,
) -> Result<BTreeSet<Utf8PathBuf>> {
    let (entitled, violations) = partition_entitled(preset, assets, resolution);
    if !violations.is_empty() {
        return Err(Error::AccessViolations(violations));
    }
    Ok(entitled)
}

/// The cooked `Content` directory a preset packs from.
///
/// A dedicated cook under the preset's name wins over the default cook.
pub fn cooked_source_dir(ctx: &BuildContext, preset: &str) -> Result<Utf8PathBuf> {
    let dedicated = ctx.staged_content_dir(preset);
    if dedicated.is_dir() {
        tracing::info!("Using dedicated cook from: {}", dedicated);
        return Ok(dedicated);
    }

    let default = ctx.default_content_dir();
    if default.is_dir() {
        tracing::info!("Using default cook from: {}", default);
        return Ok(default);
    }

    Err(Error::NoCookedContent {
        preset: preset.to_string(),
        expected: vec![dedicated, default],
    })
}

/// A transient build directory, removed when dropped.
#[derive(Debug)]
pub struct StagedBuild {
    root: Utf8PathBuf,
}

impl StagedBuild {
    /// Create `root` empty, discarding leftovers from an interrupted run.
    pub fn create(root: Utf8PathBuf) -> Result<Self> {
        clean_directory(&root)?;
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.root
    }
}

impl Drop for StagedBuild {
    fn drop(&mut self) {
        if let Err(e) = clean_directory(&self.root) {
            tracing::warn!("Failed to remove build directory '{}': {}", self.root, e);
        }
    }
}

/// Result of staging one preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackOutcome {
    Packed {
        preset: String,
        archive: Utf8PathBuf,
        files: usize,
    },
    /// Nothing was left to package.
    Skipped { preset: String },
}

impl PackOutcome {
    pub fn preset(&self) -> &str {
        match self {
            PackOutcome::Packed { preset, .. } | PackOutcome::Skipped { preset } => preset,
        }
    }
}

fn apply_override(
    ctx: &BuildContext,
    source: &OverrideSource,
    target: &Utf8Path,
    scope: &str,
) -> Result<()> {
    let path = ctx.resolve(&source.source);
    if !path.is_dir() {
        tracing::warn!("Skipping override for '{}': {} not found", scope, path);
        return Ok(());
    }

    tracing::info!("Applying override: {}", source.label());
    let count = copy_tree(&path, target)?;
    tracing::info!(
        "Merged {} file(s) from {}/",
        count,
        path.file_name().unwrap_or(path.as_str())
    );
    Ok(())
}

/// Stage `preset`'s entitled files and pack them into `<package_dir>/<preset>/<preset>.pak`.
///
/// Global overrides are merged first, then `preset_overrides`; later files
/// overwrite earlier ones. The build directory is removed on every path out.
pub fn stage_and_pack(
    ctx: &BuildContext,
    preset: &str,
    preset_overrides: &[OverrideSource],
    resolution: &OwnershipResolution,
    packer: &dyn Packer,
) -> Result<PackOutcome> {
    tracing::info!("Processing preset: '{}'", preset);
    let source_dir = cooked_source_dir(ctx, preset)?;

    let empty = ResolvedAssets::new();
    let assets = resolution.assets_for(preset).unwrap_or(&empty);
    let entitled = select_entitled_files(preset, assets, resolution)?;
    if entitled.is_empty() {
        tracing::warn!("Skipping preset '{}': No assets to package.", preset);
        return Ok(PackOutcome::Skipped {
            preset: preset.to_string(),
        });
    }

    let missing: Vec<Utf8PathBuf> = entitled
        .iter()
        .filter(|rel| !source_dir.join(rel).is_file())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingStagedFiles { source_dir, missing });
    }

    let build = StagedBuild::create(ctx.build_dir_for(preset))?;
    let game_dir = build.path().join(&ctx.game_dir_name);
    let content_dir = game_dir.join("Content");
    fs::create_dir_all(&content_dir)?;

    if let Some(cooked_game_dir) = source_dir.parent() {
        let registry = cooked_game_dir.join(ASSET_REGISTRY_FILE_NAME);
        if registry.is_file() {
            copy_file(&registry, &game_dir.join(ASSET_REGISTRY_FILE_NAME))?;
        }
    }

    tracing::info!("Staging {} assets...", entitled.len());
    for rel in &entitled {
        copy_file(&source_dir.join(rel), &content_dir.join(rel))?;
    }

    for source in &ctx.global_overrides {
        apply_override(ctx, source, &game_dir, "global")?;
    }
    for source in preset_overrides {
        apply_override(ctx, source, &game_dir, preset)?;
    }

    tracing::info!("Packing '{}'...", preset);
    let produced = packer.pack(&game_dir, preset)?;
    if !produced.is_file() {
        return Err(Error::MissingArchive(produced));
    }

    let archive = ctx
        .package_dir_for(preset)
        .join(format!("{}.pak", preset));
    move_file(&produced, &archive)?;
    drop(build);

    tracing::info!("Packed '{}' into {}", preset, archive);
    Ok(PackOutcome::Packed {
        preset: preset.to_string(),
        archive,
        files: entitled.len(),
    })
}
