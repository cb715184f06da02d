use anyhow::{Context, Result};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

pub const GIT_PATH_VAR: &str = "GITVEND_GIT_PATH";
pub const SVN_PATH_VAR: &str = "GITVEND_SVN_PATH";
pub const TIMEOUT_VAR: &str = "GITVEND_TIMEOUT";

const DEFAULT_BIN_DIR: &str = "/usr/bin";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Runtime configuration taken from the environment.
///
/// - `GITVEND_GIT_PATH`: directory containing `git` (default `/usr/bin`)
/// - `GITVEND_SVN_PATH`: directory containing `svn` (default `/usr/bin`)
/// - `GITVEND_TIMEOUT`: per-command timeout in seconds, `0` disables it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub git_dir: PathBuf,
    pub svn_dir: PathBuf,
    pub timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            git_dir: PathBuf::from(DEFAULT_BIN_DIR),
            svn_dir: PathBuf::from(DEFAULT_BIN_DIR),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns an error if `GITVEND_TIMEOUT` is set but not a whole number.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var_os(key))
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let defaults = Self::default();
        let dir = |key: &str, fallback: PathBuf| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(fallback)
        };

        let timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => {
                let raw = raw.to_string_lossy().trim().to_string();
                let secs: u64 = raw.parse().with_context(|| {
                    format!("{} must be a number of seconds, got {:?}", TIMEOUT_VAR, raw)
                })?;
                timeout_from_secs(secs)
            }
            None => defaults.timeout,
        };

        Ok(Self {
            git_dir: dir(GIT_PATH_VAR, defaults.git_dir),
            svn_dir: dir(SVN_PATH_VAR, defaults.svn_dir),
            timeout,
        })
    }
}

/// `0` means "no timeout".
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let s = Settings::from_vars(lookup(&[])).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.git_dir, PathBuf::from("/usr/bin"));
    }

    #[test]
    fn overrides_are_independent() {
        let s = Settings::from_vars(lookup(&[(GIT_PATH_VAR, "/opt/git/bin")])).unwrap();
        assert_eq!(s.git_dir, PathBuf::from("/opt/git/bin"));
        assert_eq!(s.svn_dir, PathBuf::from("/usr/bin"));
    }

    #[test]
    fn zero_timeout_disables() {
        let s = Settings::from_vars(lookup(&[(TIMEOUT_VAR, "0")])).unwrap();
        assert_eq!(s.timeout, None);
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        assert!(Settings::from_vars(lookup(&[(TIMEOUT_VAR, "soon")])).is_err());
    }

    #[test]
    #[serial]
    fn reads_process_environment() {
        unsafe { env::set_var(SVN_PATH_VAR, "/opt/svn/bin") };
        let s = Settings::from_env();
        unsafe { env::remove_var(SVN_PATH_VAR) };
        assert_eq!(s.unwrap().svn_dir, PathBuf::from("/opt/svn/bin"));
    }
}
