//! Asset ownership across presets.
//!
//! Every preset claims files with three rule kinds:
//!
//! - `include`: exclusive ownership. At most one preset may include a file.
//! - `shared`: non-exclusive. Usable by the owner (if any) and its friends.
//! - `exclude`: drops a file unless a stronger rule of the same preset keeps it.
//!
//! Within a preset, a file matched by several rules goes to the rule with the
//! highest `(kind rank, pattern length)`: the kind decides across kinds, the
//! longer pattern string decides within a kind.

use crate::error::{Error, Result};
use crate::expand::Expander;
use crate::pattern::{resolve_patterns, PatternResolution};
use camino::{Utf8Path, Utf8PathBuf};
use pakbuild_presets::Preset;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Rule kinds, ordered by rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKind {
    Exclude,
    Shared,
    Include,
}

impl RuleKind {
    pub fn rank(self) -> u8 {
        match self {
            RuleKind::Exclude => 0,
            RuleKind::Shared => 1,
            RuleKind::Include => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Exclude => "exclude",
            RuleKind::Shared => "shared",
            RuleKind::Include => "include",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Files a preset keeps, relative to the search root, with their winning rule kind.
pub type ResolvedAssets = BTreeMap<Utf8PathBuf, RuleKind>;

/// The pattern of one rule kind that matched a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub kind: RuleKind,
    pub pattern: String,
}

impl RuleMatch {
    pub fn new(kind: RuleKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
        }
    }

    fn precedence(&self) -> (u8, usize) {
        (self.kind.rank(), self.pattern.chars().count())
    }
}

/// The match that decides a file's fate.
///
/// Rule kind decides first and pattern length only breaks ties within a
/// kind. An `exclude` therefore never wins against an `include` or `shared`
/// match of the same preset, however specific it is: it cannot carve a
/// subtree out of a broader include, and only drops files nothing else
/// matched.
pub fn pick_winner(matches: &[RuleMatch]) -> Option<&RuleMatch> {
    matches.iter().max_by_key(|m| m.precedence())
}

/// Per file, the longest of `patterns` that matched it.
fn longest_matches(
    patterns: &BTreeSet<String>,
    resolution: &PatternResolution,
    root: &Utf8Path,
) -> BTreeMap<Utf8PathBuf, String> {
    let mut longest: BTreeMap<Utf8PathBuf, String> = BTreeMap::new();
    for pattern in patterns {
        let Some(files) = resolution.per_pattern.get(pattern) else {
            continue;
        };
        for file in files {
            let rel = file.strip_prefix(root).unwrap_or(file).to_owned();
            match longest.get(&rel) {
                Some(current) if current.chars().count() >= pattern.chars().count() => {}
                _ => {
                    longest.insert(rel, pattern.clone());
                }
            }
        }
    }
    longest
}

/// Resolve one preset's rules against `root`.
///
/// Fails with [`Error::UnresolvedPatterns`] listing every pattern that named
/// nothing. Inclusions that override an exclusion are reported as warnings.
pub fn resolve_preset_assets(
    name: &str,
    preset: &Preset,
    root: &Utf8Path,
    expander: &Expander,
) -> Result<ResolvedAssets> {
    let include = expander.resolve_list(&preset.assets.include)?;
    let shared = expander.resolve_list(&preset.assets.shared)?;
    let exclude = expander.resolve_list(&preset.assets.exclude)?;

    let resolution = resolve_patterns(include.iter().chain(&shared).chain(&exclude), root)?;
    if !resolution.unresolved.is_empty() {
        return Err(Error::UnresolvedPatterns {
            preset: name.to_string(),
            root: root.to_owned(),
            patterns: resolution.unresolved,
        });
    }

    let by_kind = [
        (RuleKind::Include, longest_matches(&include, &resolution, root)),
        (RuleKind::Shared, longest_matches(&shared, &resolution, root)),
        (RuleKind::Exclude, longest_matches(&exclude, &resolution, root)),
    ];
    let files: BTreeSet<&Utf8PathBuf> = by_kind.iter().flat_map(|(_, m)| m.keys()).collect();

    let mut assets = ResolvedAssets::new();
    let mut overlaps = Vec::new();
    for file in files {
        let matches: Vec<RuleMatch> = by_kind
            .iter()
            .filter_map(|(kind, m)| m.get(file).map(|p| RuleMatch::new(*kind, p.as_str())))
            .collect();
        let Some(winner) = pick_winner(&matches) else {
            continue;
        };
        if winner.kind == RuleKind::Exclude {
            continue;
        }

        assets.insert(file.clone(), winner.kind);
        if let Some(excluded) = matches.iter().find(|m| m.kind == RuleKind::Exclude) {
            overlaps.push(format!(
                "'{}' {} by '{}' overriding exclude '{}'",
                file, winner.kind, winner.pattern, excluded.pattern
            ));
        }
    }

    if !overlaps.is_empty() {
        tracing::warn!("Overlap warnings for '{}':", name);
        for overlap in &overlaps {
            tracing::warn!("  - {}", overlap);
        }
    }

    Ok(assets)
}

/// A file included by more than one preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipConflict {
    pub path: Utf8PathBuf,
    pub claimants: Vec<String>,
}

impl fmt::Display for OwnershipConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Asset '{}' is exclusively claimed by multiple presets: {}",
            self.path,
            self.claimants.join(", ")
        )
    }
}

/// Ownership, friendships and per-preset files for one set of presets.
#[derive(Debug, Clone, Default)]
pub struct OwnershipResolution {
    /// Directory the relative asset paths are anchored at.
    pub search_root: Utf8PathBuf,
    /// Exclusive owner of every included file.
    pub owners: BTreeMap<Utf8PathBuf, String>,
    /// Presets allowed to use each preset's shared files.
    pub friends: HashMap<String, Vec<String>>,
    pub assets: BTreeMap<String, ResolvedAssets>,
}

impl OwnershipResolution {
    pub fn owner_of(&self, path: &Utf8Path) -> Option<&str> {
        self.owners.get(path).map(String::as_str)
    }

    /// Whether `preset` appears in `owner`'s friend list.
    pub fn is_friend(&self, owner: &str, preset: &str) -> bool {
        self.friends
            .get(owner)
            .is_some_and(|friends| friends.iter().any(|f| f == preset))
    }

    pub fn assets_for(&self, preset: &str) -> Option<&ResolvedAssets> {
        self.assets.get(preset)
    }
}

/// Resolve every preset and assign exclusive owners.
///
/// Fails with [`Error::OwnershipConflicts`] listing every file claimed by
/// `include` in more than one preset, with all its claimants.
pub fn resolve_ownership(
    presets: &[(&str, &Preset)],
    search_root: &Utf8Path,
    expander: &Expander,
) -> Result<OwnershipResolution> {
    tracing::info!("Resolving asset ownership and friendships...");

    let mut resolution = OwnershipResolution {
        search_root: search_root.to_owned(),
        ..OwnershipResolution::default()
    };
    for (name, preset) in presets {
        resolution
            .friends
            .insert(name.to_string(), preset.friends.clone());
        let assets = resolve_preset_assets(name, preset, search_root, expander)?;
        resolution.assets.insert(name.to_string(), assets);
    }

    let mut claimants: BTreeMap<Utf8PathBuf, Vec<String>> = BTreeMap::new();
    for (name, _) in presets {
        let Some(assets) = resolution.assets.get(*name) else {
            continue;
        };
        for (path, kind) in assets {
            if *kind == RuleKind::Include {
                claimants
                    .entry(path.clone())
                    .or_default()
                    .push(name.to_string());
            }
        }
    }

    let conflicts: Vec<OwnershipConflict> = claimants
        .iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(path, names)| OwnershipConflict {
            path: path.clone(),
            claimants: names.clone(),
        })
        .collect();
    if !conflicts.is_empty() {
        return Err(Error::OwnershipConflicts(conflicts));
    }

    resolution.owners = claimants
        .into_iter()
        .filter_map(|(path, mut names)| names.pop().map(|owner| (path, owner)))
        .collect();
    Ok(resolution)
}
