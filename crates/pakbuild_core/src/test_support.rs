//! Fixtures shared by the unit tests.

use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::packer::Packer;
use crate::utils::files_under;
use camino::{Utf8Path, Utf8PathBuf};
use pakbuild_presets::{AssetRules, BuildConfig, CookSettings, OverrideSource, Preset, Presets};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use tempfile::TempDir;

/// Route `tracing` output through the test harness; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

/// Create each file under `root`; its content is its own absolute path.
pub fn write_files(root: &Utf8Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, path.as_str()).unwrap();
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn preset(include: &[&str], shared: &[&str], exclude: &[&str], friends: &[&str]) -> Preset {
    Preset {
        assets: AssetRules {
            include: strings(include),
            shared: strings(shared),
            exclude: strings(exclude),
        },
        friends: strings(friends),
        ..Preset::default()
    }
}

/// Relative paths, for anchoring at a test's working directory.
pub fn test_config() -> BuildConfig {
    BuildConfig {
        uproject_path: Utf8PathBuf::from("project/FSD.uproject"),
        ue4_cmd_path: Utf8PathBuf::from("UE4Editor-Cmd.exe"),
        unrealpak_path: None,
        staging_dir: Utf8PathBuf::from("staging"),
        package_dir: Utf8PathBuf::from("packages"),
        build_dir: None,
        game_dir_name: "FSD".to_string(),
        target_platform: "WindowsNoEditor".to_string(),
        package_unlisted_assets: false,
        variables: HashMap::new(),
        nocook_aliases: HashMap::new(),
        cook_settings: CookSettings::default(),
        cook_output_filters: vec![],
        global_overrides: vec![OverrideSource {
            source: Utf8PathBuf::from("overrides/global"),
            description: None,
        }],
        presets: Presets::default(),
    }
}

/// A configuration and its context rooted in a temporary working directory.
pub struct StagingFixture {
    pub config: BuildConfig,
    pub ctx: BuildContext,
}

impl StagingFixture {
    pub fn new(root: &Utf8Path) -> Self {
        init_tracing();
        let config = test_config();
        let ctx = BuildContext::new(&config, root.to_owned());
        Self { config, ctx }
    }
}

/// Packer that records what it was given instead of running UnrealPak.
#[derive(Default)]
pub struct RecordingPacker {
    fail: bool,
    /// Per preset, relative path to file content.
    packed: RefCell<BTreeMap<String, BTreeMap<String, String>>>,
}

impl RecordingPacker {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn packed(&self, preset: &str) -> BTreeMap<String, String> {
        self.packed.borrow().get(preset).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.packed.borrow().keys().cloned().collect()
    }
}

impl Packer for RecordingPacker {
    fn pack(&self, game_dir: &Utf8Path, preset: &str) -> Result<Utf8PathBuf> {
        if self.fail {
            return Err(Error::ExternalToolFailed {
                step: "UnrealPak".to_string(),
                code: 1,
            });
        }

        let mut contents = BTreeMap::new();
        for file in files_under(game_dir)? {
            let rel = file.strip_prefix(game_dir).unwrap().as_str().replace('\\', "/");
            contents.insert(rel, fs::read_to_string(&file)?);
        }
        self.packed
            .borrow_mut()
            .insert(preset.to_string(), contents);

        let archive = game_dir.with_extension("pak");
        fs::write(&archive, preset)?;
        Ok(archive)
    }
}
