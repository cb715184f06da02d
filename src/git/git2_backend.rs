use anyhow::{Context, Result, anyhow};
use git2::{BranchType, Repository};
use std::path::Path;

/// Resolve the branch a local working copy should sit on before it
/// integrates upstream changes.
///
/// Resolution order:
/// 1. The symbolic target of `refs/remotes/origin/HEAD`
/// 2. `origin/main`, then `origin/master`
/// 3. A local `main` or `master` branch (clones without an `origin`
///    remote, such as svn-tracking clones)
///
/// Only refs are inspected; nothing in the repository is modified.
///
/// # Errors
/// Returns an error if the repository cannot be opened or none of the
/// candidates exist.
pub fn default_branch(path: &Path) -> Result<String> {
    let repo = Repository::open(path).with_context(|| format!("open {}", path.display()))?;

    if let Ok(origin_head) = repo.find_reference("refs/remotes/origin/HEAD") {
        let target = origin_head
            .symbolic_target()
            .ok_or_else(|| anyhow!("origin/HEAD has no symbolic target"))?;
        let branch = target
            .strip_prefix("refs/remotes/origin/")
            .ok_or_else(|| anyhow!("unexpected remote ref: {}", target))?;
        return Ok(branch.to_string());
    }

    for name in ["main", "master"] {
        if repo.find_reference(&format!("refs/remotes/origin/{}", name)).is_ok() {
            return Ok(name.to_string());
        }
    }

    for name in ["main", "master"] {
        if repo.find_branch(name, BranchType::Local).is_ok() {
            return Ok(name.to_string());
        }
    }

    Err(anyhow!(
        "could not determine default branch (missing origin/HEAD, origin/main, origin/master, main, master)"
    ))
}
