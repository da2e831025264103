//! Top-level drivers tying resolution, staging and packing together.

use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::ownership::{resolve_ownership, resolve_preset_assets, OwnershipResolution, RuleKind};
use crate::packer::Packer;
use crate::stage::{
    cooked_source_dir, partition_entitled, select_entitled_files, stage_and_pack, PackOutcome,
};
use crate::utils::subdirectories;
use camino::{Utf8Path, Utf8PathBuf};
use pakbuild_presets::{BuildConfig, Preset, Presets};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

/// Presets chosen for a run, in processing order.
#[derive(Debug, Clone)]
pub struct PresetSelection<'a> {
    pub presets: Vec<(&'a str, &'a Preset)>,
    /// Whether the caller named presets explicitly.
    pub explicit: bool,
}

/// Pick the presets to process.
///
/// With no names, every enabled preset in configuration order. Otherwise the
/// named presets in the given order: an unknown name fails the whole
/// selection, a disabled one is skipped with a warning.
pub fn select_presets<'a>(presets: &'a Presets, requested: &[String]) -> Result<PresetSelection<'a>> {
    if requested.is_empty() {
        return Ok(PresetSelection {
            presets: presets.enabled().collect(),
            explicit: false,
        });
    }

    if let Some(unknown) = requested.iter().find(|name| !presets.contains(name)) {
        return Err(Error::UnknownPreset {
            name: unknown.clone(),
            available: presets.names().map(str::to_string).collect(),
        });
    }

    let mut selected: Vec<(&str, &Preset)> = Vec::new();
    for name in requested {
        let Some((name, preset)) = presets.iter().find(|(n, _)| *n == name.as_str()) else {
            continue;
        };
        if selected.iter().any(|(n, _)| *n == name) {
            continue;
        }
        if !preset.enabled {
            tracing::warn!("Skipping '{}': Preset is disabled in config.", name);
            continue;
        }
        selected.push((name, preset));
    }

    Ok(PresetSelection {
        presets: selected,
        explicit: true,
    })
}

/// Outcomes of a pack run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackSummary {
    pub outcomes: Vec<PackOutcome>,
}

impl PackSummary {
    /// `(preset, archive)` for every preset that produced an archive.
    pub fn packed(&self) -> impl Iterator<Item = (&str, &Utf8Path)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PackOutcome::Packed { preset, archive, .. } => Some((preset.as_str(), archive.as_path())),
            PackOutcome::Skipped { .. } => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            PackOutcome::Skipped { preset } => Some(preset.as_str()),
            PackOutcome::Packed { .. } => None,
        })
    }
}

/// Resolve ownership across every enabled preset of `config`.
///
/// Owners and friends always come from the whole configuration, so naming a
/// subset of presets cannot hand one of them a file another preset owns.
pub fn resolve_enabled_ownership(
    ctx: &BuildContext,
    config: &BuildConfig,
    search_root: &Utf8Path,
) -> Result<OwnershipResolution> {
    let enabled: Vec<(&str, &Preset)> = config.presets.enabled().collect();
    resolve_ownership(&enabled, search_root, &ctx.expander)
}

/// Access-check every selected preset, failing with all violations at once.
pub fn check_access(
    selection: &[(&str, &Preset)],
    resolution: &OwnershipResolution,
) -> Result<()> {
    let mut violations = Vec::new();
    for (name, _) in selection {
        if let Some(assets) = resolution.assets_for(name) {
            violations.extend(partition_entitled(name, assets, resolution).1);
        }
    }

    if !violations.is_empty() {
        return Err(Error::AccessViolations(violations));
    }
    Ok(())
}

/// Pack the requested presets, or every enabled preset when none are named.
///
/// Requires the default cook. Ownership is resolved across every enabled
/// preset and access is checked for the whole selection before anything is
/// staged, so a conflict or violation aborts the run before any archive is
/// written. With `package_unlisted_assets` and no named
/// presets, top-level content folders no preset references are packed on
/// their own afterwards.
pub fn pack_all(
    ctx: &BuildContext,
    config: &BuildConfig,
    requested: &[String],
    packer: &dyn Packer,
) -> Result<PackSummary> {
    let default_content = ctx.default_content_dir();
    if !default_content.is_dir() {
        return Err(Error::NoDefaultCook(default_content));
    }
    fs::create_dir_all(&ctx.package_dir)?;

    let selection = select_presets(&config.presets, requested)?;
    let mut summary = PackSummary::default();
    if selection.presets.is_empty() {
        tracing::warn!("No enabled presets found to pack.");
        return Ok(summary);
    }

    let resolution = resolve_enabled_ownership(ctx, config, &default_content)?;
    check_access(&selection.presets, &resolution)?;
    for (name, preset) in &selection.presets {
        let outcome = stage_and_pack(ctx, name, &preset.overrides, &resolution, packer)?;
        summary.outcomes.push(outcome);
    }

    if config.package_unlisted_assets && !selection.explicit {
        tracing::info!("Checking for unlisted assets in the DEFAULT cook to auto-package...");
        let unlisted = unlisted_directories(ctx, &config.presets, &default_content)?;
        if unlisted.is_empty() {
            tracing::info!("No unlisted asset folders found to package.");
        }
        for folder in unlisted {
            tracing::info!("Auto-packaging: {}", folder);
            let synthetic = Preset::owning_directory(&folder);
            let resolution =
                resolve_ownership(&[(folder.as_str(), &synthetic)], &default_content, &ctx.expander)?;
            summary
                .outcomes
                .push(stage_and_pack(ctx, &folder, &[], &resolution, packer)?);
        }
    }

    Ok(summary)
}

/// Top-level folders of `content_dir` that no preset, enabled or not, resolves a file in.
pub fn unlisted_directories(
    ctx: &BuildContext,
    presets: &Presets,
    content_dir: &Utf8Path,
) -> Result<Vec<String>> {
    let mut referenced = BTreeSet::new();
    for (name, preset) in presets.iter() {
        let assets = resolve_preset_assets(name, preset, content_dir, &ctx.expander)?;
        for path in assets.keys() {
            if let Some(top) = path.components().next() {
                referenced.insert(top.as_str().to_string());
            }
        }
    }

    Ok(subdirectories(content_dir)?
        .into_iter()
        .filter(|dir| !referenced.contains(dir))
        .collect())
}

/// What a pack run would put into one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetPlan {
    pub preset: String,
    pub source_dir: Utf8PathBuf,
    pub files: BTreeMap<Utf8PathBuf, RuleKind>,
}

/// Resolve and access-check the selection without staging anything.
pub fn plan(ctx: &BuildContext, config: &BuildConfig, requested: &[String]) -> Result<Vec<PresetPlan>> {
    let default_content = ctx.default_content_dir();
    if !default_content.is_dir() {
        return Err(Error::NoDefaultCook(default_content));
    }

    let selection = select_presets(&config.presets, requested)?;
    let resolution = resolve_enabled_ownership(ctx, config, &default_content)?;
    check_access(&selection.presets, &resolution)?;

    let mut plans = Vec::new();
    for (name, _) in &selection.presets {
        let Some(assets) = resolution.assets_for(name) else {
            continue;
        };
        let entitled = select_entitled_files(name, assets, &resolution)?;
        plans.push(PresetPlan {
            preset: name.to_string(),
            source_dir: cooked_source_dir(ctx, name)?,
            files: entitled
                .into_iter()
                .filter_map(|path| assets.get(&path).map(|kind| (path, *kind)))
                .collect(),
        });
    }
    Ok(plans)
}
