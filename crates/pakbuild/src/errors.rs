use camino::Utf8PathBuf;
use miette::Diagnostic;
use pakbuild_presets::ConfigError;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found in {search_path}")]
    #[diagnostic(
        code(config::not_found),
        help("Create a build_presets.yaml, build_presets.toml or build_presets.json file in your project directory, or pass --config")
    )]
    ConfigNotFound { search_path: Utf8PathBuf },

    #[error("Configuration file error")]
    #[diagnostic(
        code(config::parse_error),
        help("Check your presets file for syntax errors")
    )]
    ConfigLoad(#[from] ConfigError),

    #[error("Current directory is not valid UTF-8")]
    #[diagnostic(code(io::non_utf8_cwd))]
    NonUtf8WorkingDir,

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to open {path} in an editor")]
    #[diagnostic(
        code(edit::launch_failed),
        help("Open the file manually or check that a default editor is associated with it")
    )]
    EditorLaunch {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(search_path: Utf8PathBuf) -> Self {
        Self::ConfigNotFound { search_path }
    }

    pub fn editor_launch(path: Utf8PathBuf, source: std::io::Error) -> Self {
        Self::EditorLaunch { path, source }
    }
}
