#![allow(dead_code)]

use gitvend::{Invoker, Registry, Settings};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Directory on `PATH` that contains a `git` executable.
pub fn git_dir() -> PathBuf {
    let path = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&path)
        .find(|d| d.join("git").is_file())
        .expect("git must be installed to run these tests")
}

pub fn settings() -> Settings {
    Settings {
        git_dir: git_dir(),
        ..Settings::default()
    }
}

/// Run git with a fixed identity and fail the test on error.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .current_dir(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "Test User")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test User")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

pub fn head(dir: &Path) -> String {
    git(dir, &["rev-parse", "HEAD"]).trim().to_string()
}

/// Add a file and commit it.
pub fn commit_file(dir: &Path, file: &str, contents: &str, message: &str) -> String {
    fs::write(dir.join(file), contents).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-m", message]);
    head(dir)
}

/// A host project with `vendor/plugins` plus a place for upstream repos.
pub struct Fixture {
    pub td: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let td = tempfile::tempdir().unwrap();
        fs::create_dir_all(td.path().join("project/vendor/plugins")).unwrap();
        fs::create_dir_all(td.path().join("upstream")).unwrap();
        Self { td }
    }

    pub fn project(&self) -> PathBuf {
        self.td.path().join("project")
    }

    /// Create a non-bare upstream repository with one commit that accepts
    /// pushes to its checked-out branch.
    pub fn upstream(&self, name: &str) -> PathBuf {
        let dir = self.td.path().join("upstream").join(name);
        fs::create_dir_all(&dir).unwrap();
        git(&dir, &["init", "-q"]);
        git(&dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&dir, &["config", "receive.denyCurrentBranch", "updateInstead"]);
        commit_file(&dir, "README", name, "initial import");
        dir
    }

    pub fn registry(&self) -> Registry {
        Registry::open(&self.project(), Invoker::new(&settings())).unwrap()
    }

    pub fn local(&self, name: &str) -> PathBuf {
        self.project().join("vendor/plugins").join(name)
    }
}

pub fn loc(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}
