use crate::BuildConfig;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// File names probed by [`find_config`], in order.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "build_presets.yaml",
    "build_presets.yml",
    "build_presets.toml",
    "build_presets.json",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config file {path}: {source}")]
    Yaml {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to parse TOML config file {path}: {source}")]
    Toml {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to parse JSON config file {path}: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported config file extension: {0} (expected .yaml, .yml, .toml or .json)")]
    UnsupportedExtension(Utf8PathBuf),
}

/// Returns the first preset file that exists in `dir`.
pub fn find_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Reads and parses a preset file, choosing the format from its extension.
///
/// Paths inside the file are returned as written; call
/// [`BuildConfig::resolve_paths`] to anchor them.
pub fn load_config(path: &Utf8Path) -> Result<BuildConfig, ConfigError> {
    let parse = match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("yaml") | Some("yml") => Format::Yaml,
        Some("toml") => Format::Toml,
        Some("json") => Format::Json,
        _ => return Err(ConfigError::UnsupportedExtension(path.to_owned())),
    };

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;

    match parse {
        Format::Yaml => serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_owned(),
            source,
        }),
        Format::Toml => toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_owned(),
            source,
        }),
        Format::Json => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        }),
    }
}

enum Format {
    Yaml,
    Toml,
    Json,
}
