use std::path::{Path, PathBuf};

/// Locations inside a host project.
#[derive(Debug, Clone)]
pub struct Paths {
    pub project: PathBuf,
    /// Directory the mirrors are cloned into (`vendor/plugins`).
    pub vendor: PathBuf,
    /// Persisted registry state (`.plugins`).
    pub store: PathBuf,
}

pub fn paths(project: &Path) -> Paths {
    Paths {
        project: project.to_path_buf(),
        vendor: project.join("vendor").join("plugins"),
        store: project.join(".plugins"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_relative_to_project() {
        let p = paths(Path::new("/srv/app"));
        assert_eq!(p.vendor, PathBuf::from("/srv/app/vendor/plugins"));
        assert_eq!(p.store, PathBuf::from("/srv/app/.plugins"));
    }
}
