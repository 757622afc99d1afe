#![deny(unsafe_code)]

//! mmpost CLI: reads a gcode file, rewrites its tool changes, and writes the
//! result next to it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use mmpost_config::AppConfig;
use mmpost_core::{Postprocessed, Postprocessor, postprocessed_path};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// mmpost: schedules nozzle temperatures and wipes for multi-material gcode.
#[derive(Parser)]
#[command(
    name = "mmpost",
    version,
    about,
    long_about = None,
    args_conflicts_with_subcommands = true,
    arg_required_else_help = true
)]
struct Cli {
    /// Gcode file to postprocess.
    input: Option<PathBuf>,

    /// Write the result here instead of next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Summary format printed on success.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,

    /// Path to configuration file.
    #[arg(short, long, global = true, default_value = "mmpost.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, found) = load_config(&cli.config)?;

    // RUST_LOG wins, then -v, then the config file.
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    if found {
        debug!(path = %cli.config.display(), tools = config.tools.len(), "Using configuration");
    } else {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    match (cli.command, cli.input) {
        (Some(Commands::Config { show }), _) => cmd_config(&cli.config, &config, show)?,
        (None, Some(input)) => cmd_process(&config, &input, cli.output, cli.report)?,
        (None, None) => bail!("no input file given"),
    }

    Ok(())
}

fn cmd_process(
    config: &AppConfig,
    input: &Path,
    output: Option<PathBuf>,
    report: ReportFormat,
) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read '{}'", input.display()))?;

    let output = output.unwrap_or_else(|| postprocessed_path(input, &config.output.suffix));
    if output == input {
        bail!("output path '{}' is the input file", output.display());
    }

    info!(input = %input.display(), "Postprocessing");
    let result = Postprocessor::new(config)
        .run(&text)
        .with_context(|| format!("failed to postprocess '{}'", input.display()))?;

    fs::write(&output, &result.text)
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    info!(output = %output.display(), "Wrote postprocessed program");

    match report {
        ReportFormat::Text => print!("{}", text_report(&output, &result)),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&result).context("failed to encode report")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn text_report(output: &Path, result: &Postprocessed) -> String {
    let summary = &result.summary;
    let mut report = format!(
        "Wrote {} ({} lines, {} in)\n\
         regions: {}, temperature ramps: {}, wipes: {}, idle ramp-downs: {}\n",
        output.display(),
        summary.lines_out,
        summary.lines_in,
        summary.regions,
        summary.temperature_ramps,
        summary.wipes,
        summary.idle_ramps,
    );
    if summary.dropped_temperature_commands > 0 {
        report.push_str(&format!(
            "dropped redundant temperature commands: {}\n",
            summary.dropped_temperature_commands
        ));
    }
    if summary.cooldown_commands > 0 {
        report.push_str(&format!("cooldown commands: {}\n", summary.cooldown_commands));
    }
    if !result.diagnostics.is_empty() {
        report.push_str(&format!("warnings ({}):\n", result.diagnostics.len()));
        for diagnostic in result.diagnostics.iter() {
            report.push_str(&format!("  {diagnostic}\n"));
        }
    }
    report
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to encode configuration")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Load the config file, falling back to defaults when it does not exist.
/// The flag tells whether the file was found.
fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        let config = AppConfig::load(path)
            .with_context(|| format!("invalid configuration '{}'", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}
