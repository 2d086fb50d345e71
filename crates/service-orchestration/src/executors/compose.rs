//! Compose file discovery.

use crate::error::ContainerError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// All files under `root` whose name starts with `prefix` and ends in `.yml`
///
/// Shallower files come first, then lexicographic order, so the first entry
/// is stable across runs.
pub fn find_compose_files(root: &Path, prefix: &str) -> Result<Vec<PathBuf>, ContainerError> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| ContainerError::Scan {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let matches = {
            let name = entry.file_name().to_string_lossy();
            name.starts_with(prefix) && name.ends_with(".yml")
        };
        if matches {
            found.push(entry.into_path());
        }
    }

    found.sort_by_cached_key(|path| (path.components().count(), path.clone()));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_matches_prefix_and_yml_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "services: {}").unwrap();
        fs::write(dir.path().join("docker-compose.yaml"), "services: {}").unwrap();
        fs::write(dir.path().join("other.yml"), "services: {}").unwrap();
        fs::create_dir(dir.path().join("deploy")).unwrap();
        fs::write(dir.path().join("deploy/docker-compose.dev.yml"), "").unwrap();

        let found = find_compose_files(dir.path(), "docker-compose").unwrap();

        assert_eq!(
            found,
            vec![
                dir.path().join("docker-compose.yml"),
                dir.path().join("deploy/docker-compose.dev.yml"),
            ]
        );
    }

    #[test]
    fn test_missing_root_is_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_compose_files(&dir.path().join("absent"), "docker-compose").unwrap_err();
        assert!(matches!(err, ContainerError::Scan { .. }));
    }
}
