//! External tool execution with streamed, filtered output.
//!
//! Tools run with piped stdout and stderr. Two reader threads forward lines
//! to the calling thread, which filters and echoes them and feeds them to an
//! [`ErrorCollector`]. Nothing else in the pipeline runs until the tool has
//! exited and its status has been checked.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use pakbuild_presets::OutputFilter;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};

/// Line after which the cooker only repeats errors it already reported.
pub const SUMMARY_MARKER: &str = "LogInit: Display: Warning/Error Summary";

/// Bucket for error lines not attributable to a single asset.
pub const GENERAL_ERRORS: &str = "General/System Errors";

const ERROR_SIGNATURE: &str = ": Error:";

fn blueprint_error_regex() -> &'static Regex {
    static BLUEPRINT_ERROR: OnceLock<Regex> = OnceLock::new();
    BLUEPRINT_ERROR.get_or_init(|| {
        Regex::new(
            r"(?i)LogBlueprint:\s+Error:\s+\[AssetLog\]\s+(.*?\.uasset):\s+(.*?)(?:\s+from\s+Source:.*)?$",
        )
        .unwrap()
    })
}

/// Groups unique error lines by the asset they concern.
///
/// Built as a reducer so a whole log can be classified with
/// `lines.fold(ErrorCollector::new(true), ErrorCollector::step)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCollector {
    collecting: bool,
    errors: BTreeMap<String, BTreeSet<String>>,
}

impl ErrorCollector {
    pub fn new(collecting: bool) -> Self {
        Self {
            collecting,
            errors: BTreeMap::new(),
        }
    }

    pub fn step(mut self, line: &str) -> Self {
        if !self.collecting {
            return self;
        }
        if line.contains(SUMMARY_MARKER) {
            self.collecting = false;
            return self;
        }
        if !line.contains(ERROR_SIGNATURE) {
            return self;
        }

        let trimmed = line.trim();
        let (file, message) = match blueprint_error_regex().captures(trimmed) {
            Some(captures) => (captures[1].to_string(), captures[2].to_string()),
            None => (GENERAL_ERRORS.to_string(), trimmed.to_string()),
        };
        self.errors.entry(file).or_default().insert(message);
        self
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Unique messages keyed by file, both sorted.
    pub fn errors(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.errors
    }

    /// Print the consolidated summary. Prints nothing when no errors were seen.
    pub fn print_summary(&self) {
        if self.errors.is_empty() {
            return;
        }

        let rule = "=".repeat(60);
        println!("\n{}", rule.yellow().bold());
        println!("{}", "--- Summary of Unique Compilation Errors ---".yellow().bold());
        println!("{}", rule.yellow().bold());

        for (file, messages) in &self.errors {
            if file == GENERAL_ERRORS {
                println!("\n{}", "[ General / System Errors ]".red().bold());
            } else {
                println!("\n{}", format!("File: {}", file).cyan().bold());
            }
            for message in messages {
                match message.strip_prefix("[Compiler]") {
                    Some(rest) => {
                        println!("{}{}{}", "  -> ".red(), "[Compiler]".magenta(), rest.red())
                    }
                    None => println!("{}", format!("  -> {}", message).red()),
                }
            }
        }

        println!("{}", rule.yellow().bold());
    }
}

/// Classify a complete log in one go.
pub fn collect_errors<'a, I>(lines: I) -> ErrorCollector
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .fold(ErrorCollector::new(true), ErrorCollector::step)
}

/// How echoed lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputStyle {
    /// Lines are echoed unchanged.
    #[default]
    Plain,
    /// UnrealPak output: indented, colored by kind, verbose lines dropped.
    Packer,
}

/// Kinds of UnrealPak output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackerLine {
    Warning,
    Error,
    Added,
    Timing,
    CompressionSummary,
    CompressionFormat,
    Display,
    Other,
}

const VERBOSE_DISPLAY: [&str; 6] = [
    "Loading",
    "Using command",
    "Latency",
    "PrimaryIndex",
    "PathHashIndex",
    "FullDirectoryIndex",
];

/// `None` means the line is not worth showing.
pub fn classify_packer_line(line: &str) -> Option<PackerLine> {
    let kind = if line.contains("Warning:") {
        PackerLine::Warning
    } else if line.contains("Error:") {
        PackerLine::Error
    } else if line.contains("Added") && line.contains("files") {
        PackerLine::Added
    } else if line.contains("executed in") {
        PackerLine::Timing
    } else if line.contains("Compression summary:") {
        PackerLine::CompressionSummary
    } else if line.contains("CompressionFormat") {
        PackerLine::CompressionFormat
    } else if line.contains("Display:") {
        if VERBOSE_DISPLAY.iter().any(|skip| line.contains(skip)) {
            return None;
        }
        PackerLine::Display
    } else if line.trim().is_empty() {
        return None;
    } else {
        PackerLine::Other
    };
    Some(kind)
}

fn echo(line: &str, style: OutputStyle) {
    if style == OutputStyle::Plain {
        println!("{}", line);
        return;
    }

    let Some(kind) = classify_packer_line(line) else {
        return;
    };
    let text = format!("    {}", line);
    match kind {
        PackerLine::Warning => println!("{}", text.yellow()),
        PackerLine::Error => println!("{}", text.red()),
        PackerLine::Added => println!("{}", text.green().bold()),
        PackerLine::Timing => println!("{}", text.green()),
        PackerLine::CompressionSummary => println!("{}", text.cyan().bold()),
        PackerLine::CompressionFormat => println!("{}", text.magenta()),
        PackerLine::Display => println!("{}", text.cyan()),
        PackerLine::Other => println!("{}", text),
    }
}

/// An external program invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: Utf8PathBuf,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<Utf8Path>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Utf8Path) -> Self {
        self.current_dir = Some(dir.to_owned());
        self
    }

    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }
}

/// Options for [`run_external_tool`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions<'a> {
    /// Matching lines are not echoed.
    pub filters: &'a [OutputFilter],
    /// Collect error lines until [`SUMMARY_MARKER`] and print them after exit.
    pub collect_errors: bool,
    pub style: OutputStyle,
}

fn spawn_reader<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        for chunk in BufReader::new(stream).split(b'\n') {
            let Ok(bytes) = chunk else {
                break;
            };
            let line = String::from_utf8_lossy(&bytes);
            if tx.send(line.trim_end_matches('\r').to_string()).is_err() {
                break;
            }
        }
    })
}

/// Run `command` to completion, streaming its output.
///
/// Returns the exit code. A non-zero exit is [`Error::ExternalToolFailed`].
pub fn run_external_tool(command: &ToolCommand, step: &str, options: RunOptions) -> Result<i32> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &command.current_dir {
        cmd.current_dir(dir);
        tracing::info!("Running {} from: {}", step, dir);
    } else {
        tracing::info!("Running {}", step);
    }
    if !options.filters.is_empty() {
        tracing::info!(
            "(Applying {} output filter(s) for this step)",
            options.filters.len()
        );
    }

    let mut child = cmd.spawn().map_err(|source| Error::ToolSpawn {
        step: step.to_string(),
        source,
    })?;

    let (tx, rx) = mpsc::channel();
    let readers = [
        child.stdout.take().map(|s| spawn_reader(s, tx.clone())),
        child.stderr.take().map(|s| spawn_reader(s, tx.clone())),
    ];
    drop(tx);

    let mut collector = ErrorCollector::new(options.collect_errors);
    for line in rx {
        collector = collector.step(&line);
        if !options.filters.iter().any(|f| f.matches(&line)) {
            echo(&line, options.style);
        }
    }

    for reader in readers.into_iter().flatten() {
        let _ = reader.join();
    }
    let status = child.wait()?;
    collector.print_summary();

    let code = status.code().unwrap_or(-1);
    if !status.success() {
        return Err(Error::ExternalToolFailed {
            step: step.to_string(),
            code,
        });
    }

    Ok(code)
}
