use log::info;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::commit::{CommitInfo, LATEST_COMMIT_ARGS, parse_commit};
use crate::error::{GitvendError, Result};
use crate::git::{Invoker, Tool, default_branch};

/// How a plugin's upstream is mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Cloned directly from a peer git repository.
    DirectClone,
    /// Discovered through an svn:externals property and mirrored with `git svn`.
    ExternalReference,
}

impl SourceKind {
    fn clone_args<'a>(self, source: &'a str, dest: &'a Path) -> Vec<&'a OsStr> {
        let mut args = match self {
            SourceKind::DirectClone => vec![OsStr::new("clone")],
            SourceKind::ExternalReference => vec![OsStr::new("svn"), OsStr::new("clone")],
        };
        args.push(OsStr::new(source));
        args.push(dest.as_os_str());
        args
    }

    fn pull_args(self) -> &'static [&'static str] {
        match self {
            SourceKind::DirectClone => &["pull"],
            SourceKind::ExternalReference => &["svn", "rebase"],
        }
    }

    fn push_args(self) -> &'static [&'static str] {
        match self {
            SourceKind::DirectClone => &["push"],
            SourceKind::ExternalReference => &["svn", "dcommit"],
        }
    }
}

/// Synchronisation state of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No local copy exists yet.
    Uninitialized,
    NeedsUpdate,
    UpToDate,
    /// Local copy exists but the source kind offers no cheap comparison.
    UnknownKind,
}

impl Status {
    pub fn description(self) -> &'static str {
        match self {
            Status::Uninitialized => "un-initialised",
            Status::NeedsUpdate => "needs update",
            Status::UpToDate => "up-to-date",
            Status::UnknownKind => "external reference - cannot determine status",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// What is needed to create a plugin, independent of its source kind.
#[derive(Debug, Clone)]
pub struct PluginSpec {
    pub kind: SourceKind,
    pub name: String,
    pub source_location: String,
}

impl PluginSpec {
    /// A peer repository; the name is the basename of `location`.
    pub fn direct_clone(location: &str) -> Self {
        let location = location.trim();
        Self {
            kind: SourceKind::DirectClone,
            name: name_from_location(location),
            source_location: location.to_string(),
        }
    }

    pub fn external_reference(name: &str, url: &str) -> Self {
        Self {
            kind: SourceKind::ExternalReference,
            name: name.trim().to_string(),
            source_location: url.trim().to_string(),
        }
    }
}

/// Derive a plugin name from the last component of a path or URL.
pub fn name_from_location(location: &str) -> String {
    let trimmed = location.trim().trim_end_matches('/');
    Path::new(trimmed)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Check that `name` is a single normal path component, so that the
/// plugin's local copy stays directly under the registry root.
///
/// # Errors
/// Returns [`GitvendError::Validation`] for empty, absolute, `.`/`..` or
/// multi-component names.
pub fn check_name(name: &str) -> Result<()> {
    let mut parts = Path::new(name).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(()),
        _ => Err(GitvendError::validation(
            name,
            "plugin name must be a single directory name",
        )),
    }
}

/// One mirrored repository living under the registry root.
#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub name: String,
    pub source_location: String,
    pub local_path: PathBuf,
    pub source_kind: SourceKind,
    pub remote_commit: Option<CommitInfo>,
    pub local_commit: Option<CommitInfo>,
}

impl Plugin {
    /// Build a plugin without touching the filesystem.
    pub fn new(spec: PluginSpec, root: &Path) -> Self {
        Self {
            local_path: root.join(&spec.name),
            name: spec.name,
            source_location: spec.source_location,
            source_kind: spec.kind,
            remote_commit: None,
            local_commit: None,
        }
    }

    /// Create a plugin from `spec`, performing the kind-specific setup.
    ///
    /// - `DirectClone`: the source is validated and resolved to an absolute
    ///   path, the name is taken from that path, and its latest commit is
    ///   captured together with the local head if a copy already exists.
    /// - `ExternalReference`: no upfront validation of the source.
    ///
    /// Either way the name must be a single directory name (see [`check_name`]).
    ///
    /// # Errors
    /// Returns [`GitvendError::Validation`] for an unusable source or name,
    /// or any error raised while reading commit state.
    pub fn create(spec: PluginSpec, root: &Path, invoker: &Invoker) -> Result<Self> {
        let mut plugin = Self::new(spec, root);
        if plugin.source_kind == SourceKind::DirectClone {
            plugin.validate_source()?;
            let abs = Path::new(&plugin.source_location)
                .canonicalize()
                .map_err(|e| GitvendError::validation(&plugin.source_location, e.to_string()))?;
            plugin.source_location = abs.to_string_lossy().into_owned();
            plugin.name = name_from_location(&plugin.source_location);
            plugin.local_path = root.join(&plugin.name);
        }
        check_name(&plugin.name)?;
        if plugin.source_kind == SourceKind::DirectClone {
            plugin.refresh_remote_commit(invoker)?;
            plugin.refresh_local_commit(invoker)?;
        }
        Ok(plugin)
    }

    /// True when `local_path` holds a git working copy.
    pub fn has_local_copy(&self) -> bool {
        self.local_path.join(".git").is_dir()
    }

    pub fn status(&self) -> Status {
        if !self.has_local_copy() {
            return Status::Uninitialized;
        }
        match self.source_kind {
            SourceKind::ExternalReference => Status::UnknownKind,
            SourceKind::DirectClone => {
                let local = self.local_commit.as_ref().map(|c| c.id.as_str());
                let remote = self.remote_commit.as_ref().map(|c| c.id.as_str());
                if local.is_some() && local == remote {
                    Status::UpToDate
                } else {
                    Status::NeedsUpdate
                }
            }
        }
    }

    pub fn local_head(&self) -> Option<&str> {
        self.local_commit.as_ref().map(|c| c.id.as_str())
    }

    /// Shallow check that a direct source is a directory with a `.git` directory.
    pub fn validate_source(&self) -> Result<()> {
        let path = Path::new(&self.source_location);
        if !path.is_dir() {
            return Err(GitvendError::validation(path, "not a directory"));
        }
        if !path.join(".git").is_dir() {
            return Err(GitvendError::validation(path, "not a git repository"));
        }
        Ok(())
    }

    /// Clone into `local_path`, or pull if a local copy is already there.
    pub fn clone_repo(&mut self, invoker: &Invoker) -> Result<()> {
        if self.has_local_copy() {
            info!(
                "{}: local copy exists in {}, pulling instead",
                self.name,
                self.local_path.display()
            );
            return self.pull(invoker);
        }

        info!("{}: cloning {}", self.name, self.source_location);
        let parent = self
            .local_path
            .parent()
            .ok_or_else(|| GitvendError::Directory {
                path: self.local_path.clone(),
            })?;
        let args = self.source_kind.clone_args(&self.source_location, &self.local_path);
        invoker.run(Tool::Git, args, parent)?;
        self.refresh_local_commit(invoker)
    }

    /// Switch to the default branch and integrate upstream changes.
    pub fn pull(&mut self, invoker: &Invoker) -> Result<()> {
        self.require_local_copy()?;
        info!("{}: pulling", self.name);

        let branch = default_branch(&self.local_path)
            .map_err(|e| GitvendError::execution("resolve default branch", format!("{:#}", e)))?;
        invoker.run(Tool::Git, ["checkout", branch.as_str()], &self.local_path)?;
        invoker.run(Tool::Git, self.source_kind.pull_args(), &self.local_path)?;
        self.refresh_local_commit(invoker)
    }

    /// Publish local commits upstream.
    pub fn push(&mut self, invoker: &Invoker) -> Result<()> {
        self.require_local_copy()?;
        info!("{}: pushing to {}", self.name, self.source_location);

        invoker.run(Tool::Git, self.source_kind.push_args(), &self.local_path)?;
        if self.source_kind == SourceKind::DirectClone {
            self.refresh_remote_commit(invoker)?;
        }
        self.refresh_local_commit(invoker)
    }

    /// Bring the local copy in line with upstream, cloning it if needed.
    ///
    /// For direct clones the upstream head is re-read first so that the
    /// recorded state reflects the source as it is now.
    pub fn update(&mut self, invoker: &Invoker) -> Result<()> {
        if self.source_kind == SourceKind::DirectClone {
            self.refresh_remote_commit(invoker)?;
        }
        if self.has_local_copy() {
            self.pull(invoker)
        } else {
            self.clone_repo(invoker)
        }
    }

    /// Run a user-supplied command line inside `local_path` and return its output.
    ///
    /// The command goes through the shell and must come from a trusted user.
    pub fn execute(&mut self, command: &str, invoker: &Invoker) -> Result<String> {
        info!("{}: executing '{}' in {}", self.name, command, self.local_path.display());
        let output = invoker.run_shell(command, &self.local_path)?;
        self.refresh_local_commit(invoker)?;
        if self.source_kind == SourceKind::DirectClone {
            self.refresh_remote_commit(invoker)?;
        }
        Ok(output)
    }

    /// Re-read the latest commit of the upstream source.
    pub fn refresh_remote_commit(&mut self, invoker: &Invoker) -> Result<()> {
        self.remote_commit = Some(latest_commit(invoker, Path::new(&self.source_location))?);
        Ok(())
    }

    /// Re-read the head of the local copy; clears it when there is no copy.
    pub fn refresh_local_commit(&mut self, invoker: &Invoker) -> Result<()> {
        if !self.has_local_copy() {
            self.local_commit = None;
            return Ok(());
        }
        self.local_commit = Some(latest_commit(invoker, &self.local_path)?);
        Ok(())
    }

    fn require_local_copy(&self) -> Result<()> {
        if self.has_local_copy() {
            Ok(())
        } else {
            Err(GitvendError::Directory {
                path: self.local_path.join(".git"),
            })
        }
    }
}

/// Read the latest commit of the repository at `dir`.
///
/// A `git log` that exits unsuccessfully (an empty repository, a directory
/// that is not a repository) yields no commit record and is reported as a
/// parse failure carrying whatever git printed.
fn latest_commit(invoker: &Invoker, dir: &Path) -> Result<CommitInfo> {
    let out = invoker.capture(Tool::Git, LATEST_COMMIT_ARGS, dir)?;
    if !out.status.success() {
        return Err(GitvendError::Parse {
            reason: format!("git log {}", out.status),
            output: format!("{}{}", out.stdout, out.stderr).trim().to_string(),
        });
    }
    parse_commit(&out.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::fs;
    use tempfile::tempdir;

    fn commit(id: &str) -> CommitInfo {
        CommitInfo {
            id: id.into(),
            author: "A <a@example.com>".into(),
            date: "today".into(),
            message: "msg".into(),
        }
    }

    fn with_local_copy(kind: SourceKind, root: &Path) -> Plugin {
        let spec = PluginSpec {
            kind,
            name: "demo".into(),
            source_location: "/upstream/demo".into(),
        };
        let p = Plugin::new(spec, root);
        fs::create_dir_all(p.local_path.join(".git")).unwrap();
        p
    }

    #[test]
    fn name_is_basename_of_location() {
        assert_eq!(name_from_location("/local/repoA"), "repoA");
        assert_eq!(name_from_location("/local/repoA/"), "repoA");
        assert_eq!(name_from_location(" ../x/plug "), "plug");
        assert_eq!(name_from_location("git@host:team/lib"), "lib");
    }

    #[test]
    fn local_path_is_root_joined_with_name() {
        let root = Path::new("/proj/vendor/plugins");
        let p = Plugin::new(PluginSpec::direct_clone("/src/widgets"), root);
        assert_eq!(p.name, "widgets");
        assert_eq!(p.local_path, PathBuf::from("/proj/vendor/plugins/widgets"));
    }

    #[test]
    fn status_without_local_copy_is_uninitialized() {
        let td = tempdir().unwrap();
        let p = Plugin::new(PluginSpec::direct_clone("/src/widgets"), td.path());
        assert_eq!(p.status(), Status::Uninitialized);
        assert_eq!(p.status().description(), "un-initialised");
    }

    #[test]
    fn status_compares_heads_for_direct_clone() {
        let td = tempdir().unwrap();
        let mut p = with_local_copy(SourceKind::DirectClone, td.path());
        p.remote_commit = Some(commit("aaa"));
        p.local_commit = Some(commit("bbb"));
        assert_eq!(p.status(), Status::NeedsUpdate);
        p.local_commit = Some(commit("aaa"));
        assert_eq!(p.status(), Status::UpToDate);
        p.local_commit = None;
        assert_eq!(p.status(), Status::NeedsUpdate);
    }

    #[test]
    fn status_of_external_reference_is_unknown() {
        let td = tempdir().unwrap();
        let mut p = with_local_copy(SourceKind::ExternalReference, td.path());
        p.remote_commit = Some(commit("aaa"));
        p.local_commit = Some(commit("aaa"));
        assert_eq!(p.status(), Status::UnknownKind);
    }

    #[test]
    fn validate_rejects_missing_and_plain_directories() {
        let td = tempdir().unwrap();
        let missing = Plugin::new(
            PluginSpec::direct_clone(&td.path().join("nope").to_string_lossy()),
            td.path(),
        );
        assert!(matches!(
            missing.validate_source(),
            Err(GitvendError::Validation { .. })
        ));

        let plain_dir = td.path().join("plain");
        fs::create_dir(&plain_dir).unwrap();
        let plain = Plugin::new(PluginSpec::direct_clone(&plain_dir.to_string_lossy()), td.path());
        let err = plain.validate_source().unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
    }

    #[test]
    fn create_direct_clone_fails_validation_before_running_git() {
        let td = tempdir().unwrap();
        let invoker = Invoker::new(&Settings {
            git_dir: td.path().join("no-git-here"),
            ..Settings::default()
        });
        let spec = PluginSpec::direct_clone(&td.path().join("absent").to_string_lossy());
        let err = Plugin::create(spec, td.path(), &invoker).unwrap_err();
        assert!(matches!(err, GitvendError::Validation { .. }));
    }

    #[test]
    fn create_external_reference_skips_validation() {
        let td = tempdir().unwrap();
        let invoker = Invoker::new(&Settings::default());
        let spec = PluginSpec::external_reference("legacy", "svn://example.org/legacy/trunk");
        let p = Plugin::create(spec, td.path(), &invoker).unwrap();
        assert_eq!(p.source_kind, SourceKind::ExternalReference);
        assert_eq!(p.status(), Status::Uninitialized);
        assert!(p.remote_commit.is_none());
    }

    #[test]
    fn names_must_be_a_single_directory_name() {
        for good in ["repoA", "my.plugin", "..hidden"] {
            assert!(check_name(good).is_ok(), "{}", good);
        }
        for bad in ["", ".", "..", "../../escaped", "/abs", "a/b", "a/", "a\\b"] {
            assert!(
                matches!(check_name(bad), Err(GitvendError::Validation { .. })),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn create_rejects_external_reference_escaping_root() {
        let td = tempdir().unwrap();
        let invoker = Invoker::new(&Settings::default());
        for name in ["../../escaped", "/tmp/elsewhere", ".."] {
            let spec = PluginSpec::external_reference(name, "svn://example.org/x/trunk");
            let err = Plugin::create(spec, td.path(), &invoker).unwrap_err();
            assert!(matches!(err, GitvendError::Validation { .. }), "{}", name);
        }
    }

    #[test]
    fn pull_without_local_copy_is_directory_error() {
        let td = tempdir().unwrap();
        let invoker = Invoker::new(&Settings::default());
        let mut p = Plugin::new(PluginSpec::direct_clone("/src/widgets"), td.path());
        assert!(matches!(
            p.pull(&invoker),
            Err(GitvendError::Directory { .. })
        ));
        assert!(matches!(
            p.push(&invoker),
            Err(GitvendError::Directory { .. })
        ));
    }

    #[test]
    fn execute_in_missing_directory_is_directory_error() {
        let td = tempdir().unwrap();
        let invoker = Invoker::new(&Settings::default());
        let mut p = Plugin::new(PluginSpec::direct_clone("/src/widgets"), td.path());
        assert!(matches!(
            p.execute("true", &invoker),
            Err(GitvendError::Directory { .. })
        ));
    }
}
