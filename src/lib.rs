//! Crate entry point for **gitvend**.
//!
//! gitvend keeps vendored plugin mirrors inside a host project in sync with
//! their upstream repositories. Each submodule encapsulates one
//! responsibility (commit parsing, process invocation, plugin lifecycle,
//! registry persistence, ...). The `pub use` re-exports make the core types
//! and the `cmd_*` entry points available from the crate root.

mod cli;
mod commands;
mod commit;
mod error;
mod git;
mod paths;
mod plugin;
mod progress;
mod registry;
mod settings;

pub use cli::{CommandSpec, parse_command_spec, split_list};
pub use commands::{cmd_add, cmd_command, cmd_externals, cmd_list, cmd_push, cmd_update};
pub use commit::{CommitInfo, LATEST_COMMIT_ARGS, parse_commit};
pub use error::{GitvendError, Result};
pub use git::{CancelToken, Captured, Invoker, Tool, default_branch};
pub use paths::{Paths, paths};
pub use plugin::{Plugin, PluginSpec, SourceKind, Status, check_name, name_from_location};
pub use progress::SpinnerObserver;
pub use registry::{
    BatchObserver, BatchReport, Disposition, ExternalEntry, Failure, Operation, Outcome, Registry,
    Silent, StoreFile, StoredPlugin, parse_externals, read_store, write_store,
};
pub use settings::{Settings, timeout_from_secs};
