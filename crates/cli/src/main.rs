mod commands;
mod config;
mod input;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use dayroll_interchange::Format;

use crate::commands::{cmd_downtime, cmd_rebuild, cmd_summary, cmd_transitions};
use crate::input::{FilterArgs, InputArgs};
use crate::logging::{init_logging, LogFormat};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Daily action sheets to consistent history, status views and downtime.
#[derive(Parser)]
#[command(
    name = "dayroll",
    version,
    about = "Daily action sheets to consistent history, status views and downtime"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log format on stderr (level from RUST_LOG, default warn)
    #[arg(long, global = true, default_value = "pretty", value_enum)]
    log_format: LogFormat,

    /// Path to a dayroll.toml configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild every view and write a report bundle
    Rebuild {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Bundle directory (default: [export] out, then ./dayroll-report)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Export format, repeatable (default: [export] formats, then csv)
        #[arg(long = "format", value_parser = parse_format)]
        formats: Vec<Format>,
    },

    /// Row counts, completion rate and where open actions concentrate
    Summary {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Zones and tags listed under open actions
        #[arg(long, default_value_t = 3, value_name = "N")]
        top: usize,
    },

    /// Equipment downtime intervals
    Downtime {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Day-over-day status changes
    Transitions {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

fn parse_format(value: &str) -> Result<Format, String> {
    value.parse()
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.quiet);

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Rebuild {
            input,
            filter,
            out,
            formats,
        } => cmd_rebuild(&input, &filter, out, formats, &config, cli.output, cli.quiet),
        Commands::Summary { input, filter, top } => {
            cmd_summary(&input, &filter, top, &config, cli.output, cli.quiet)
        }
        Commands::Downtime { input, filter } => {
            cmd_downtime(&input, &filter, &config, cli.output, cli.quiet)
        }
        Commands::Transitions { input, filter } => {
            cmd_transitions(&input, &filter, &config, cli.output, cli.quiet)
        }
    };

    if let Err(msg) = result {
        report_error(&msg, cli.output, cli.quiet);
        process::exit(1);
    }
}

/// Report an error in the requested output format. Silent under `--quiet`.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
