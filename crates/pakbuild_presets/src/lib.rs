//! Configuration model for pakbuild preset files.
//!
//! A preset file describes the cooker/packer tooling, the variables and
//! aliases used by path lists, and an ordered collection of [`Preset`]s.
//! It can be written as YAML, TOML or JSON; [`load_config`] picks the parser
//! from the file extension.

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

mod loader;

pub use loader::{find_config, load_config, ConfigError, CONFIG_FILE_NAMES};

fn default_true() -> bool {
    true
}

fn default_game_dir_name() -> String {
    "FSD".to_string()
}

fn default_target_platform() -> String {
    "WindowsNoEditor".to_string()
}

/// Describes a build presets configuration file
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct BuildConfig {
    /// Path to the `.uproject` file of the game project being cooked.
    pub uproject_path: Utf8PathBuf,

    /// Path to the editor commandlet executable used for cooking.
    pub ue4_cmd_path: Utf8PathBuf,

    /// Path to the UnrealPak executable.
    /// If not specified, `UnrealPak/Engine/Binaries/Win64/UnrealPak.exe` under
    /// the working directory is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unrealpak_path: Option<Utf8PathBuf>,

    /// Root of the cooked staging area (`<staging_dir>/<preset-or-default>/`).
    pub staging_dir: Utf8PathBuf,

    /// Root of the final packages (`<package_dir>/<preset>/<preset>.pak`).
    pub package_dir: Utf8PathBuf,

    /// Parent directory of the transient `build_<preset>` directories.
    /// Defaults to the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<Utf8PathBuf>,

    /// Name of the game folder inside cooked output, e.g. `FSD`.
    #[serde(default = "default_game_dir_name")]
    pub game_dir_name: String,

    /// Cooker target platform, e.g. `WindowsNoEditor`.
    #[serde(default = "default_target_platform")]
    pub target_platform: String,

    /// Automatically package top-level content folders that no preset references.
    #[serde(default)]
    pub package_unlisted_assets: bool,

    /// Values substituted for `{name}` placeholders in cook path lists.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, String>,

    /// Named path lists referenced as `@name` from path lists.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub nocook_aliases: HashMap<String, Vec<String>>,

    /// Cook directives used by the default cook.
    #[serde(default)]
    pub cook_settings: CookSettings,

    /// Extra cooker output lines to hide, on top of the built-in filters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cook_output_filters: Vec<OutputFilter>,

    /// Overrides merged into every package before presets' own overrides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_overrides: Vec<OverrideSource>,

    /// Package definitions, in configuration order.
    #[serde(default)]
    pub presets: Presets,
}

/// Directory lists handed to the cooker.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct CookSettings {
    /// Content-relative directories that must not be cooked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directories_to_never_cook: Vec<String>,

    /// Exceptions: directories inside a never-cook directory that are cooked anyway.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directories_to_cook: Vec<String>,
}

/// A single package definition.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Preset {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub assets: AssetRules,

    /// Presets allowed to consume this preset's shared files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub friends: Vec<String>,

    /// Dedicated cook directives; when set the preset gets its own cook output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_override: Option<CookSettings>,

    /// Directories merged into this preset's package after the global overrides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideSource>,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            enabled: true,
            assets: AssetRules::default(),
            friends: Vec::new(),
            cook_override: None,
            overrides: Vec::new(),
        }
    }
}

impl Preset {
    /// A preset that exclusively owns everything under `dir`.
    pub fn owning_directory(dir: &str) -> Self {
        Self {
            assets: AssetRules {
                include: vec![format!("{}/", dir.trim_end_matches(['/', '\\']))],
                ..AssetRules::default()
            },
            ..Self::default()
        }
    }
}

/// Pattern lists of a preset.
///
/// Written either as a table with `include`, `shared` and `exclude` lists or
/// as a flat list, which is read as `shared`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(from = "RawAssetRules")]
pub struct AssetRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAssetRules {
    Flat(Vec<String>),
    Rules {
        #[serde(default)]
        include: Vec<String>,
        #[serde(default)]
        shared: Vec<String>,
        #[serde(default)]
        exclude: Vec<String>,
    },
}

impl From<RawAssetRules> for AssetRules {
    fn from(raw: RawAssetRules) -> Self {
        match raw {
            RawAssetRules::Flat(shared) => Self {
                shared,
                ..Self::default()
            },
            RawAssetRules::Rules {
                include,
                shared,
                exclude,
            } => Self {
                include,
                shared,
                exclude,
            },
        }
    }
}

/// A directory tree merged into a package's build directory.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct OverrideSource {
    pub source: Utf8PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OverrideSource {
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or("Override files")
    }
}

/// Hides a line of external tool output from the console.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "snake_case")]
pub enum OutputFilter {
    /// Matches when the trimmed line starts with the prefix.
    StartsWith(String),
    /// Matches when the line contains the needle anywhere.
    Contains(String),
}

impl OutputFilter {
    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Self::StartsWith(prefix.into())
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into())
    }

    pub fn matches(&self, line: &str) -> bool {
        match self {
            OutputFilter::StartsWith(prefix) => line.trim().starts_with(prefix.as_str()),
            OutputFilter::Contains(needle) => line.contains(needle.as_str()),
        }
    }
}

/// Presets keyed by name, kept in configuration order.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Presets(Vec<(String, Preset)>);

impl Presets {
    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Preset)> {
        self.0.iter().map(|(n, p)| (n.as_str(), p))
    }

    /// Enabled presets in configuration order.
    pub fn enabled(&self) -> impl Iterator<Item = (&str, &Preset)> {
        self.iter().filter(|(_, p)| p.enabled)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inserts or replaces a preset, keeping the position of an existing entry.
    pub fn insert(&mut self, name: impl Into<String>, preset: Preset) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = preset,
            None => self.0.push((name, preset)),
        }
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Preset> {
        self.0.iter_mut().map(|(_, p)| p)
    }
}

impl FromIterator<(String, Preset)> for Presets {
    fn from_iter<I: IntoIterator<Item = (String, Preset)>>(iter: I) -> Self {
        let mut presets = Presets::default();
        for (name, preset) in iter {
            presets.insert(name, preset);
        }
        presets
    }
}

impl Serialize for Presets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, preset) in &self.0 {
            map.serialize_entry(name, preset)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Presets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PresetsVisitor;

        impl<'de> Visitor<'de> for PresetsVisitor {
            type Value = Presets;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of preset names to preset definitions")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Presets, E> {
                Ok(Presets::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Presets, E> {
                Ok(Presets::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Presets, A::Error> {
                let mut entries: Vec<(String, Preset)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, preset)) = access.next_entry::<String, Preset>()? {
                    if entries.iter().any(|(n, _)| *n == name) {
                        return Err(de::Error::custom(format!(
                            "duplicate preset name `{}`",
                            name
                        )));
                    }
                    entries.push((name, preset));
                }
                Ok(Presets(entries))
            }
        }

        deserializer.deserialize_any(PresetsVisitor)
    }
}

fn absolutize(base: &Utf8Path, path: &mut Utf8PathBuf) {
    if path.is_relative() {
        *path = base.join(path.as_path());
    }
}

/// Like [`absolutize`], but a bare program name is kept for `PATH` lookup.
fn absolutize_program(base: &Utf8Path, path: &mut Utf8PathBuf) {
    if path.as_str().contains(['/', '\\']) {
        absolutize(base, path);
    }
}

impl BuildConfig {
    /// Rewrites every relative path in the configuration against `base`.
    ///
    /// A cooker given as a bare name is left alone so it can be looked up on
    /// `PATH`; one with a directory part is anchored like every other path.
    pub fn resolve_paths(&mut self, base: &Utf8Path) {
        absolutize(base, &mut self.uproject_path);
        absolutize_program(base, &mut self.ue4_cmd_path);
        absolutize(base, &mut self.staging_dir);
        absolutize(base, &mut self.package_dir);
        if let Some(path) = self.unrealpak_path.as_mut() {
            absolutize(base, path);
        }
        if let Some(path) = self.build_dir.as_mut() {
            absolutize(base, path);
        }
        for source in &mut self.global_overrides {
            absolutize(base, &mut source.source);
        }
        for preset in self.presets.iter_mut() {
            for source in &mut preset.overrides {
                absolutize(base, &mut source.source);
            }
        }
    }
}
