//! The plugin registry of one host project.
//!
//! A [`Registry`] owns every [`Plugin`] known to the project, loads and
//! saves the persisted store, and runs batch operations over a selected
//! subset of plugins. Batches are strictly sequential: one plugin finishes
//! before the next starts. A failing plugin is recorded in the
//! [`BatchReport`] and the batch moves on; the store is saved once at the
//! end reflecting whatever succeeded.

mod batch;
mod externals;
mod store;

use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::error::{GitvendError, Result};
use crate::git::{Invoker, Tool};
use crate::paths::paths;
use crate::plugin::{Plugin, PluginSpec, check_name};

pub use batch::{BatchObserver, BatchReport, Disposition, Failure, Operation, Outcome, Silent};
pub use externals::{ExternalEntry, parse_externals};
pub use store::{StoreFile, StoredPlugin, read_store, write_store};

pub struct Registry {
    root_path: PathBuf,
    store_path: PathBuf,
    plugins: Vec<Plugin>,
    invoker: Invoker,
}

impl Registry {
    /// Open the registry of the project at `project`
    /// (`vendor/plugins` + `.plugins`).
    pub fn open(project: &Path, invoker: Invoker) -> Result<Self> {
        let p = paths(project);
        Self::with_paths(&p.vendor, &p.store, invoker)
    }

    /// Open a registry with explicit locations and load its store.
    ///
    /// # Errors
    /// - [`GitvendError::Directory`] if `root_path` is not a directory.
    /// - [`GitvendError::Storage`] if the store exists but is malformed.
    pub fn with_paths(root_path: &Path, store_path: &Path, invoker: Invoker) -> Result<Self> {
        if !root_path.is_dir() {
            return Err(GitvendError::Directory {
                path: root_path.to_path_buf(),
            });
        }
        let root_path = root_path
            .canonicalize()
            .map_err(|_| GitvendError::Directory {
                path: root_path.to_path_buf(),
            })?;

        let mut reg = Self {
            root_path,
            store_path: store_path.to_path_buf(),
            plugins: Vec::new(),
            invoker,
        };
        reg.load()?;
        Ok(reg)
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name == name)
    }

    /// Replace the in-memory plugin set with the contents of the store.
    ///
    /// # Errors
    /// Returns [`GitvendError::Storage`] when the store is malformed or names
    /// a plugin whose local copy would not live directly under the root.
    pub fn load(&mut self) -> Result<()> {
        let store = read_store(&self.store_path)?;
        self.plugins.clear();
        for sp in store.plugins {
            check_name(&sp.name).map_err(|e| GitvendError::storage(&self.store_path, e))?;
            let plugin = self.from_stored(sp);
            self.insert(plugin);
        }
        Ok(())
    }

    /// Write the full plugin set to the store.
    pub fn save(&self) -> Result<()> {
        let store = StoreFile {
            plugins: self.plugins.iter().map(to_stored).collect(),
        };
        write_store(&self.store_path, &store)
    }

    /// Insert `plugin`, replacing one with the same name in place.
    /// Returns `true` when a plugin was replaced.
    pub fn insert(&mut self, plugin: Plugin) -> bool {
        match self.plugins.iter_mut().find(|p| p.name == plugin.name) {
            Some(slot) => {
                *slot = plugin;
                true
            }
            None => {
                self.plugins.push(plugin);
                false
            }
        }
    }

    /// Register each location as a direct clone and bring its local copy
    /// up to date. Saves once after all locations were processed.
    pub fn add(&mut self, locations: &[String], obs: &dyn BatchObserver) -> Result<BatchReport> {
        let mut report = BatchReport::new(Operation::Add);
        for location in locations.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            let outcome = self.register(PluginSpec::direct_clone(location), Operation::Add, obs);
            report.outcomes.push(outcome);
        }
        self.save()?;
        Ok(report)
    }

    /// One line per plugin: `<name> - <status> - <local head>`.
    pub fn list(&self) -> Vec<String> {
        self.plugins
            .iter()
            .map(|p| format!("{} - {} - {}", p.name, p.status(), p.local_head().unwrap_or("")))
            .collect()
    }

    pub fn update(&mut self, selection: &[String], obs: &dyn BatchObserver) -> Result<BatchReport> {
        let invoker = self.invoker.clone();
        self.run_batch(Operation::Update, selection, obs, |p| {
            p.update(&invoker).map(|_| Disposition::Synced)
        })
    }

    pub fn push(&mut self, selection: &[String], obs: &dyn BatchObserver) -> Result<BatchReport> {
        let invoker = self.invoker.clone();
        self.run_batch(Operation::Push, selection, obs, |p| {
            p.push(&invoker).map(|_| Disposition::Synced)
        })
    }

    /// Run a trusted, user-supplied command in each selected plugin's local copy.
    pub fn command(
        &mut self,
        command: &str,
        selection: &[String],
        obs: &dyn BatchObserver,
    ) -> Result<BatchReport> {
        let invoker = self.invoker.clone();
        self.run_batch(Operation::Command, selection, obs, |p| {
            p.execute(command, &invoker).map(Disposition::Executed)
        })
    }

    /// Clone every entry of the `svn:externals` property at `extern_path`
    /// as an external-reference plugin.
    ///
    /// # Errors
    /// Returns [`GitvendError::Validation`] when the property cannot be read
    /// or lists nothing; per-entry failures are recorded in the report.
    pub fn externals(&mut self, extern_path: &str, obs: &dyn BatchObserver) -> Result<BatchReport> {
        let cwd = std::env::current_dir().map_err(|_| GitvendError::Directory {
            path: PathBuf::from("."),
        })?;
        let props = match self
            .invoker
            .run(Tool::Svn, ["propget", "svn:externals", extern_path], &cwd)
        {
            Ok(out) => out,
            Err(GitvendError::Execution { reason, .. }) if externals::reports_missing(&reason) => {
                return Err(GitvendError::validation(extern_path, reason));
            }
            Err(e) => return Err(e),
        };
        if externals::reports_missing(&props) {
            return Err(GitvendError::validation(extern_path, props.trim()));
        }
        let entries = parse_externals(&props);
        if entries.is_empty() {
            return Err(GitvendError::validation(extern_path, "no svn:externals found"));
        }

        let mut report = BatchReport::new(Operation::Clone);
        for entry in entries {
            let spec = PluginSpec::external_reference(&entry.name, &entry.url);
            let outcome = self.register(spec, Operation::Clone, obs);
            report.outcomes.push(outcome);
        }
        self.save()?;
        Ok(report)
    }

    /// Create a plugin from `spec`, bring its local copy up to date and
    /// insert it. The outcome names the plugin as it was registered.
    fn register(
        &mut self,
        spec: PluginSpec,
        operation: Operation,
        obs: &dyn BatchObserver,
    ) -> Outcome {
        let requested = spec.name.clone();
        obs.started(&requested, operation);

        let result = Plugin::create(spec, &self.root_path, &self.invoker).and_then(|mut plugin| {
            plugin.clone_repo(&self.invoker)?;
            Ok(plugin)
        });
        let outcome = match result {
            Ok(plugin) => {
                let name = plugin.name.clone();
                let replaced = self.insert(plugin);
                info!("plugin {} {}", name, if replaced { "updated" } else { "added" });
                Outcome {
                    plugin: name,
                    result: Ok(if replaced {
                        Disposition::Updated
                    } else {
                        Disposition::Added
                    }),
                }
            }
            Err(error) => failed(requested, operation, error),
        };
        obs.finished(&outcome);
        outcome
    }

    /// Indices of the plugins a batch should touch, in registry order.
    ///
    /// An empty selection means every plugin; unknown names are skipped.
    fn select(&self, selection: &[String]) -> Vec<usize> {
        for name in selection {
            if self.get(name).is_none() {
                warn!("no plugin named {}, skipping", name);
            }
        }
        self.plugins
            .iter()
            .enumerate()
            .filter(|(_, p)| selection.is_empty() || selection.iter().any(|s| s == &p.name))
            .map(|(i, _)| i)
            .collect()
    }

    fn run_batch<F>(
        &mut self,
        operation: Operation,
        selection: &[String],
        obs: &dyn BatchObserver,
        mut op: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&mut Plugin) -> Result<Disposition>,
    {
        let mut report = BatchReport::new(operation);
        for idx in self.select(selection) {
            let plugin = &mut self.plugins[idx];
            let name = plugin.name.clone();
            obs.started(&name, operation);

            let outcome = match op(plugin) {
                Ok(d) => Outcome {
                    plugin: name,
                    result: Ok(d),
                },
                Err(error) => failed(name, operation, error),
            };
            obs.finished(&outcome);
            report.outcomes.push(outcome);
        }
        self.save()?;
        Ok(report)
    }

    fn from_stored(&self, sp: StoredPlugin) -> Plugin {
        let local_path = self.root_path.join(&sp.name);
        if sp.local_path != local_path {
            warn!(
                "{}: stored path {} differs from {}, using the latter",
                sp.name,
                sp.local_path.display(),
                local_path.display()
            );
        }
        Plugin {
            name: sp.name,
            source_location: sp.source_location,
            local_path,
            source_kind: sp.source_kind,
            remote_commit: sp.remote_commit,
            local_commit: sp.local_commit,
        }
    }
}

fn to_stored(p: &Plugin) -> StoredPlugin {
    StoredPlugin {
        name: p.name.clone(),
        source_location: p.source_location.clone(),
        source_kind: p.source_kind,
        local_path: p.local_path.clone(),
        remote_commit: p.remote_commit.clone(),
        local_commit: p.local_commit.clone(),
    }
}

fn failed(plugin: String, operation: Operation, error: GitvendError) -> Outcome {
    warn!("{} {} failed: {}", operation, plugin, error);
    Outcome {
        plugin: plugin.clone(),
        result: Err(Failure {
            plugin,
            operation,
            error,
        }),
    }
}
