use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::commit::CommitInfo;
use crate::error::{GitvendError, Result};
use crate::plugin::SourceKind;

/// On-disk form of the registry (`.plugins`, TOML).
///
/// Example:
/// ```toml
/// [[plugins]]
/// name = "repoA"
/// source_location = "/local/repoA"
/// source_kind = "direct-clone"
/// local_path = "/project/vendor/plugins/repoA"
///
/// [plugins.remote_commit]
/// id = "3f2a9c0d1e"
/// author = "Jane Doe <jane@example.com>"
/// date = "Mon Mar 3 10:00:00 2025 +0100"
/// message = "Fix loader path"
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default)]
    pub plugins: Vec<StoredPlugin>,
}

/// Plain-data record of one plugin; decoupled from [`crate::Plugin`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPlugin {
    pub name: String,
    pub source_location: String,
    pub source_kind: SourceKind,
    pub local_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_commit: Option<CommitInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_commit: Option<CommitInfo>,
}

/// Read the store; a missing file yields an empty store.
///
/// # Errors
/// Returns [`GitvendError::Storage`] if the file exists but cannot be read
/// or does not parse.
pub fn read_store(path: &Path) -> Result<StoreFile> {
    let txt = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(StoreFile::default()),
        Err(e) => return Err(GitvendError::storage(path, e)),
    };
    toml::from_str(&txt)
        .map_err(|e| GitvendError::storage(path, format!("malformed content: {}", e)))
}

/// Replace the store atomically: write a temp file beside it, then rename.
///
/// An existing store keeps its permissions; a new one is created
/// world-readable like any other project file.
pub fn write_store(path: &Path, store: &StoreFile) -> Result<()> {
    let txt = toml::to_string(store).map_err(|e| GitvendError::storage(path, e))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| GitvendError::storage(path, e))?;
    tmp.write_all(txt.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| GitvendError::storage(path, e))?;
    if let Some(perms) = store_permissions(path) {
        tmp.as_file()
            .set_permissions(perms)
            .map_err(|e| GitvendError::storage(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| GitvendError::storage(path, e.error))?;
    Ok(())
}

fn store_permissions(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        #[cfg(unix)]
        Err(_) => {
            use std::os::unix::fs::PermissionsExt;
            Some(fs::Permissions::from_mode(0o644))
        }
        #[cfg(not(unix))]
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> StoredPlugin {
        StoredPlugin {
            name: "repoA".into(),
            source_location: "/local/repoA".into(),
            source_kind: SourceKind::DirectClone,
            local_path: "/p/vendor/plugins/repoA".into(),
            remote_commit: Some(CommitInfo {
                id: "abc".into(),
                author: "A <a@example.com>".into(),
                date: "today".into(),
                message: "first".into(),
            }),
            local_commit: None,
        }
    }

    #[test]
    fn missing_store_is_empty() {
        let td = tempdir().unwrap();
        let s = read_store(&td.path().join(".plugins")).unwrap();
        assert!(s.plugins.is_empty());
    }

    #[test]
    fn malformed_store_is_storage_error() {
        let td = tempdir().unwrap();
        let path = td.path().join(".plugins");
        fs::write(&path, "[[plugins]]\nname = 3\n").unwrap();
        let err = read_store(&path).unwrap_err();
        assert!(matches!(err, GitvendError::Storage { .. }));
    }

    #[test]
    fn written_store_reads_back() {
        let td = tempdir().unwrap();
        let path = td.path().join(".plugins");
        let store = StoreFile {
            plugins: vec![sample()],
        };
        write_store(&path, &store).unwrap();

        let txt = fs::read_to_string(&path).unwrap();
        assert!(txt.contains("source_kind = \"direct-clone\""));
        assert!(!txt.contains("local_commit"));

        let back = read_store(&path).unwrap();
        assert_eq!(back.plugins, vec![sample()]);
    }

    #[test]
    fn write_replaces_existing_content() {
        let td = tempdir().unwrap();
        let path = td.path().join(".plugins");
        fs::write(&path, "garbage that would not parse [[").unwrap();
        write_store(&path, &StoreFile::default()).unwrap();
        assert!(read_store(&path).unwrap().plugins.is_empty());
        let leftovers = fs::read_dir(td.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let td = tempdir().unwrap();
        let path = td.path().join(".plugins");
        write_store(&path, &StoreFile::default()).unwrap();
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), 0o644);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();
        write_store(&path, &StoreFile::default()).unwrap();
        assert_eq!(mode(&path), 0o664);
    }
}
