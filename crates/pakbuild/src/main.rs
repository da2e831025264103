use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{cook_presets, edit_config, pack_presets, plan_presets};
use miette::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The path to the presets file (defaults to build_presets.yaml, .yml, .toml or .json in the current directory)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cook the default content, then every preset with its own cook settings
    Cook {
        /// Presets to cook (all enabled presets when omitted)
        presets: Vec<String>,
    },
    /// Stage and pack presets into .pak archives
    Pack {
        /// Presets to pack (all enabled presets when omitted)
        presets: Vec<String>,
    },
    /// Resolve ownership and show what each preset would pack
    Plan {
        /// Presets to plan (all enabled presets when omitted)
        presets: Vec<String>,
    },
    /// Open the presets file in the system editor
    Edit,
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    }
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pakbuild=info,pakbuild_core=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let args = parse_args();
    let config = args.config.as_deref();

    match args.command {
        Commands::Cook { presets } => cook_presets(config, &presets),
        Commands::Pack { presets } => pack_presets(config, &presets),
        Commands::Plan { presets } => plan_presets(config, &presets),
        Commands::Edit => edit_config(config),
    }
}
