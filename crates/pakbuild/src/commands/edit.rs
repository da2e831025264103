use crate::errors::CliError;
use crate::utils::config::{current_dir, resolve_config_path};
use camino::Utf8Path;
use colored::Colorize;
use miette::Result;
use std::process::Command;

pub fn edit_config(config_path: Option<&str>) -> Result<()> {
    let path = resolve_config_path(config_path, &current_dir()?)?;

    println!(
        "{} {}",
        "📝 Opening:".bright_blue().bold(),
        path.as_str().bright_cyan()
    );
    open_in_editor(&path)
        .map_err(|source| CliError::editor_launch(path.clone(), source))?;

    Ok(())
}

fn open_in_editor(path: &Utf8Path) -> std::io::Result<()> {
    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/C", "start", ""])
            .arg(path)
            .spawn()?;
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(path).spawn()?;
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Command::new("xdg-open").arg(path).spawn()?;
    }

    Ok(())
}
