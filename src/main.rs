//! # gitvend
//!
//! **gitvend** keeps vendored plugins of a host project in sync with their
//! upstream repositories.
//!
//! Features:
//! - `gitvend add <locations>` registers local git repositories as plugins
//! - `gitvend list` shows every plugin with its status and local head
//! - `gitvend update [names]` clones or pulls plugins
//! - `gitvend push [names]` publishes local plugin commits upstream
//! - `gitvend command [names]:"<cmd>"` runs a command inside plugin copies
//! - `gitvend externals <path>` mirrors svn:externals entries with `git svn`
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use gitvend::{
    BatchReport, Settings, cmd_add, cmd_command, cmd_externals, cmd_list, cmd_push, cmd_update,
    parse_command_spec, split_list, timeout_from_secs,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "gitvend",
    version,
    about = "gitvend - keep vendored plugin mirrors in sync with upstream"
)]
struct Cli {
    /// Host project root (contains vendor/plugins and .plugins)
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Per-command timeout in seconds, 0 disables (overrides GITVEND_TIMEOUT)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Cmd {
    /// Add plugins from local git repositories (comma separated)
    Add { locations: String },
    /// List plugins with their status and local head
    List,
    /// Update all plugins, or the comma separated ones given
    Update { plugins: Option<String> },
    /// Push all plugins, or the comma separated ones given
    Push { plugins: Option<String> },
    /// Execute a command: [PLUGINS]:"COMMAND" (trusted input, run by the shell)
    Command {
        #[arg(allow_hyphen_values = true)]
        spec: String,
    },
    /// Clone all svn:externals entries referenced at EXTERN_PATH
    Externals { extern_path: String },
}

fn init_logger(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Exit status for a batch: failure only when every attempted plugin failed.
fn batch_exit(report: &BatchReport) -> ExitCode {
    if report.all_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli, cmd: Cmd) -> Result<ExitCode> {
    let mut settings = Settings::from_env()?;
    if let Some(secs) = cli.timeout {
        settings.timeout = timeout_from_secs(secs);
    }
    let project = cli.project.as_path();

    let report = match cmd {
        Cmd::Add { locations } => {
            cmd_add(project, &settings, &split_list(Some(locations.as_str())))?
        }
        Cmd::List => {
            cmd_list(project, &settings)?;
            return Ok(ExitCode::SUCCESS);
        }
        Cmd::Update { plugins } => cmd_update(project, &settings, &split_list(plugins.as_deref()))?,
        Cmd::Push { plugins } => cmd_push(project, &settings, &split_list(plugins.as_deref()))?,
        Cmd::Command { spec } => cmd_command(project, &settings, &parse_command_spec(&spec)?)?,
        Cmd::Externals { extern_path } => cmd_externals(project, &settings, &extern_path)?,
    };
    Ok(batch_exit(&report))
}

/// CLI entry point.
///
/// Without a subcommand the usage is printed and the process exits
/// successfully. Registry-level errors exit non-zero.
fn main() -> ExitCode {
    let mut cli = Cli::parse();
    init_logger(cli.verbose);

    let Some(cmd) = cli.cmd.take() else {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    match run(cli, cmd) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
