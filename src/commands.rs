//! Command entry points used by the `gitvend` binary.
//!
//! Each `cmd_*` opens the registry of one host project, runs a single
//! registry operation with spinner progress, and prints a summary.
//! Registry-level failures are returned as errors; per-plugin failures are
//! part of the returned [`BatchReport`].

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::CommandSpec;
use crate::git::Invoker;
use crate::progress::SpinnerObserver;
use crate::registry::{BatchReport, Disposition, Registry};
use crate::settings::Settings;

fn open(project: &Path, settings: &Settings) -> Result<Registry> {
    Registry::open(project, Invoker::new(settings)).with_context(|| {
        format!(
            "cannot open plugin registry in {} (run from the project root)",
            project.display()
        )
    })
}

fn summarize(report: &BatchReport) {
    for f in report.failures() {
        eprintln!("{}", f);
    }
    if report.failures().next().is_some() {
        eprintln!(
            "{}: {} succeeded, {} failed",
            report.operation,
            report.succeeded(),
            report.outcomes.len() - report.succeeded()
        );
    }
}

fn finish(reg: &Registry, report: BatchReport) -> BatchReport {
    if reg.is_empty() {
        println!("No plugins yet.");
    }
    summarize(&report);
    report
}

/// Register comma-separated source locations as direct clones.
pub fn cmd_add(project: &Path, settings: &Settings, locations: &[String]) -> Result<BatchReport> {
    let mut reg = open(project, settings)?;
    let obs = SpinnerObserver::new();
    let report = reg.add(locations, &obs).context("add")?;
    summarize(&report);
    Ok(report)
}

/// Print `<name> - <status> - <local head>` for every plugin.
pub fn cmd_list(project: &Path, settings: &Settings) -> Result<()> {
    let reg = open(project, settings)?;
    if reg.is_empty() {
        println!("No plugins yet.");
    }
    for line in reg.list() {
        println!("{}", line);
    }
    Ok(())
}

pub fn cmd_update(project: &Path, settings: &Settings, names: &[String]) -> Result<BatchReport> {
    let mut reg = open(project, settings)?;
    let obs = SpinnerObserver::new();
    let report = reg.update(names, &obs).context("update")?;
    Ok(finish(&reg, report))
}

pub fn cmd_push(project: &Path, settings: &Settings, names: &[String]) -> Result<BatchReport> {
    let mut reg = open(project, settings)?;
    let obs = SpinnerObserver::new();
    let report = reg.push(names, &obs).context("push")?;
    Ok(finish(&reg, report))
}

/// Run a user-supplied command in the selected plugins' local copies and
/// print each plugin's output.
pub fn cmd_command(project: &Path, settings: &Settings, spec: &CommandSpec) -> Result<BatchReport> {
    let mut reg = open(project, settings)?;
    let obs = SpinnerObserver::new();
    let report = reg
        .command(&spec.command, &spec.plugins, &obs)
        .context("command")?;
    for o in &report.outcomes {
        if let Ok(Disposition::Executed(out)) = &o.result {
            println!("executed '{}' on {}", spec.command, o.plugin);
            print!("{}", out);
        }
    }
    Ok(finish(&reg, report))
}

/// Clone every entry of the svn:externals property at `extern_path`.
pub fn cmd_externals(
    project: &Path,
    settings: &Settings,
    extern_path: &str,
) -> Result<BatchReport> {
    let mut reg = open(project, settings)?;
    let obs = SpinnerObserver::new();
    let report = reg
        .externals(extern_path, &obs)
        .with_context(|| format!("externals {}", extern_path))?;
    summarize(&report);
    Ok(report)
}
