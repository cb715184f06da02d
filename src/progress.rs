use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

use crate::registry::{BatchObserver, Disposition, Operation, Outcome};

/// Style of the line for the plugin a batch is currently working on,
/// e.g. "updating repoA".
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap()
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

/// Style a plugin's line is switched to once its operation succeeded.
pub fn ok_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[32m✔\x1b[0m {wide_msg}").unwrap()
}

/// Style for a plugin whose operation failed; the line keeps the error.
pub fn err_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[31m✘\x1b[0m {wide_msg}").unwrap()
}

fn running_verb(op: Operation) -> &'static str {
    match op {
        Operation::Add => "adding",
        Operation::Update => "updating",
        Operation::Push => "pushing",
        Operation::Command => "executing in",
        Operation::Clone => "cloning",
    }
}

/// Renders one spinner per plugin while a batch runs.
///
/// Plugins are processed one after another, so at most one spinner ticks
/// at a time; finished lines stay on screen with a check or a cross.
pub struct SpinnerObserver {
    mp: MultiProgress,
    current: RefCell<Option<ProgressBar>>,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            current: RefCell::new(None),
        }
    }
}

impl Default for SpinnerObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchObserver for SpinnerObserver {
    fn started(&self, plugin: &str, operation: Operation) {
        let pb = self.mp.add(ProgressBar::new_spinner());
        pb.set_style(spinner_style());
        pb.set_message(format!("{} {}", running_verb(operation), plugin));
        pb.enable_steady_tick(Duration::from_millis(80));
        *self.current.borrow_mut() = Some(pb);
    }

    fn finished(&self, outcome: &Outcome) {
        let Some(pb) = self.current.borrow_mut().take() else {
            return;
        };
        match &outcome.result {
            Ok(d) => {
                pb.set_style(ok_style());
                let msg = match d {
                    Disposition::Added => format!("plugin {} added", outcome.plugin),
                    Disposition::Updated => format!("plugin {} updated", outcome.plugin),
                    Disposition::Synced | Disposition::Executed(_) => outcome.plugin.clone(),
                };
                pb.finish_with_message(msg);
            }
            Err(f) => {
                pb.set_style(err_style());
                pb.finish_with_message(format!("{} (error: {})", outcome.plugin, f.error));
            }
        }
    }
}
