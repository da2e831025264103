use crate::println_pad;
use crate::utils::config::{current_dir, load_project};
use colored::Colorize;
use miette::Result;
use pakbuild_core::cook_all;

pub fn cook_presets(config_path: Option<&str>, presets: &[String]) -> Result<()> {
    let project = load_project(config_path, &current_dir()?)?;

    println!(
        "{} {}",
        "🍳 Cooking content for:".bright_blue().bold(),
        project.ctx.uproject_path.as_str().bright_cyan().bold()
    );

    let outputs = cook_all(&project.ctx, &project.config, presets)?;

    println!("{}", "✅ Cooking finished.".bright_green().bold());
    for output in &outputs {
        println_pad!("{} {}", "•".bright_cyan(), output.as_str().bright_white());
    }

    Ok(())
}
