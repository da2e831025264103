use crate::println_pad;
use crate::utils::config::{current_dir, load_project};
use crate::utils::print_ansi_boxed_lines;
use colored::Colorize;
use miette::Result;
use pakbuild_core::{pack_all, PackSummary, UnrealPak};

pub fn pack_presets(config_path: Option<&str>, presets: &[String]) -> Result<()> {
    let project = load_project(config_path, &current_dir()?)?;

    println!(
        "{} {}",
        "📦 Packing presets from:".bright_blue().bold(),
        project.config_path.as_str().bright_cyan().bold()
    );

    let packer = UnrealPak::from_context(&project.ctx);
    let summary = pack_all(&project.ctx, &project.config, presets, &packer)?;

    print_summary(&summary);
    Ok(())
}

fn summary_lines(summary: &PackSummary) -> Vec<String> {
    let mut lines = Vec::new();
    for (preset, archive) in summary.packed() {
        lines.push(format!(
            "{} {} {}",
            "✔".bright_green(),
            preset.bright_cyan().bold(),
            archive.as_str().bright_white()
        ));
    }
    for preset in summary.skipped() {
        lines.push(format!(
            "{} {} {}",
            "-".dimmed(),
            preset.bright_cyan(),
            "(nothing to package)".dimmed()
        ));
    }
    lines
}

fn print_summary(summary: &PackSummary) {
    let lines = summary_lines(summary);
    if lines.is_empty() {
        println!("{}", "Nothing was packed.".bright_yellow());
        return;
    }

    println!("{}", "✅ Packaging finished!".bright_green().bold());
    print_ansi_boxed_lines(&lines);
    println_pad!(
        "{} {}",
        "📍 Packages:".bright_green(),
        summary.packed().count().to_string().bright_white().bold()
    );
}
