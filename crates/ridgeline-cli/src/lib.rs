// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod content_commands;

use clap::{error::ErrorKind, ArgAction, Parser, Subcommand, ValueEnum};
use ridgeline_core::{resolve_content_root, resolve_db_path, MachineError};
use ridgeline_model::Collection;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

const RIDGELINE_HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}
{after-help}";

#[derive(Parser)]
#[command(name = "ridgeline")]
#[command(version)]
#[command(about = "Ridgeline content operations CLI")]
#[command(help_template = RIDGELINE_HELP_TEMPLATE)]
#[command(
    after_help = "Environment:\n  RIDGELINE_CONTENT_ROOT  Default content mirror directory\n  RIDGELINE_DB_PATH       Default document database file"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every file of a content mirror against the content model.
    Validate {
        #[arg(long)]
        content: Option<PathBuf>,
    },
    /// Compare the document database with the content mirror.
    Drift {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        content: Option<PathBuf>,
        /// Comma separated collections; empty means all.
        #[arg(long, default_value = "")]
        collections: String,
    },
    /// Copy documents from one store into the other.
    Sync {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        content: Option<PathBuf>,
        #[arg(long, value_enum)]
        direction: SyncDirection,
        #[arg(long, default_value_t = false)]
        force: bool,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value = "")]
        collections: String,
    },
    /// Write the database contents as a fresh content mirror.
    Export {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "")]
        collections: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum SyncDirection {
    DbToFiles,
    FilesToDb,
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    pub(crate) json: bool,
}

impl OutputMode {
    /// JSON goes out compact under `--json`, pretty otherwise.
    pub(crate) fn emit(self, payload: &Value, human: &str) -> Result<(), CliError> {
        if self.json {
            let encoded = serde_json::to_string(payload)
                .map_err(|e| CliError::internal(e.to_string()))?;
            println!("{encoded}");
        } else {
            println!("{human}");
        }
        Ok(())
    }
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ridgeline_core::ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError {
                    exit_code: ridgeline_core::ExitCode::Usage,
                    machine: MachineError::new("usage_error", "invalid command line arguments")
                        .with_detail("error", &err.to_string()),
                });
            }
        },
    };
    init_logging(cli.quiet, cli.verbose);
    let output = OutputMode { json: cli.json };
    let command = cli.command.ok_or_else(|| CliError {
        exit_code: ridgeline_core::ExitCode::Usage,
        machine: MachineError::new("usage_error", "missing command; see --help"),
    })?;

    match command {
        Commands::Validate { content } => content_commands::validate(
            &content.unwrap_or_else(resolve_content_root),
            output,
        ),
        Commands::Drift {
            db,
            content,
            collections,
        } => content_commands::drift(
            &db.unwrap_or_else(resolve_db_path),
            &content.unwrap_or_else(resolve_content_root),
            &parse_collections(&collections)?,
            output,
        ),
        Commands::Sync {
            db,
            content,
            direction,
            force,
            dry_run,
            collections,
        } => content_commands::sync(
            content_commands::SyncArgs {
                db: db.unwrap_or_else(resolve_db_path),
                content: content.unwrap_or_else(resolve_content_root),
                direction,
                force,
                dry_run,
                collections: parse_collections(&collections)?,
            },
            output,
        ),
        Commands::Export {
            db,
            out,
            collections,
        } => content_commands::export(
            &db.unwrap_or_else(resolve_db_path),
            &out,
            &parse_collections(&collections)?,
            output,
        ),
    }
}

/// Logs go to stderr so stdout stays machine readable.
fn init_logging(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("RIDGELINE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

fn parse_collections(raw: &str) -> Result<Vec<Collection>, CliError> {
    Collection::parse_list(raw).map_err(|e| CliError {
        exit_code: ridgeline_core::ExitCode::Usage,
        machine: MachineError::new("usage_error", &e.to_string()).with_detail("collections", raw),
    })
}

#[derive(Debug)]
pub(crate) struct CliError {
    pub(crate) exit_code: ridgeline_core::ExitCode,
    pub(crate) machine: MachineError,
}

impl CliError {
    pub(crate) fn internal(message: String) -> Self {
        Self {
            exit_code: ridgeline_core::ExitCode::Internal,
            machine: MachineError::new("internal_error", &message),
        }
    }

    pub(crate) fn dependency(message: String) -> Self {
        Self {
            exit_code: ridgeline_core::ExitCode::DependencyFailure,
            machine: MachineError::new("dependency_failure", &message),
        }
    }

    pub(crate) fn validation(code: &str, message: &str) -> Self {
        Self {
            exit_code: ridgeline_core::ExitCode::Validation,
            machine: MachineError::new(code, message),
        }
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match serde_json::to_string(&error.machine) {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
        for (key, value) in &error.machine.details {
            eprintln!("  {key}: {value}");
        }
    }
}
