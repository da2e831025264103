use crate::println_pad;
use crate::utils::config::{current_dir, load_project};
use colored::Colorize;
use miette::Result;
use pakbuild_core::{plan, RuleKind};

pub fn plan_presets(config_path: Option<&str>, presets: &[String]) -> Result<()> {
    let project = load_project(config_path, &current_dir()?)?;
    let plans = plan(&project.ctx, &project.config, presets)?;

    if plans.is_empty() {
        println!("{}", "No enabled presets to plan.".bright_yellow());
        return Ok(());
    }

    for preset_plan in &plans {
        println!(
            "{} {} {}",
            "📋 Preset:".bright_blue().bold(),
            preset_plan.preset.bright_cyan().bold(),
            format!("({} files from {})", preset_plan.files.len(), preset_plan.source_dir).dimmed()
        );
        for (path, kind) in &preset_plan.files {
            println_pad!("{} {}", kind_label(*kind), path.as_str().bright_white());
        }
    }

    Ok(())
}

fn kind_label(kind: RuleKind) -> String {
    let label = format!("[{:<7}]", kind.as_str());
    match kind {
        RuleKind::Include => label.bright_green().to_string(),
        RuleKind::Shared => label.bright_yellow().to_string(),
        RuleKind::Exclude => label.dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::strip_ansi;

    #[test]
    fn kind_labels_are_aligned() {
        assert_eq!(strip_ansi(&kind_label(RuleKind::Include)), "[include]");
        assert_eq!(strip_ansi(&kind_label(RuleKind::Shared)), "[shared ]");
        assert_eq!(strip_ansi(&kind_label(RuleKind::Exclude)), "[exclude]");
    }
}
