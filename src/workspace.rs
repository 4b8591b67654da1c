//! Node directory checks and served-file resolution

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::config::{NodeConfig, expand_home};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("required directory {0} does not exist")]
    MissingDirectory(PathBuf),

    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("served file {0:?} must be a relative path inside the node root")]
    OutsideRoot(String),
}

/// A credential file exposed through the tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedFile {
    /// Path relative to the node root, with `/` separators; doubles as the URL path.
    pub relative: String,
    pub absolute: PathBuf,
    pub present: bool,
}

impl ServedFile {
    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }
}

/// Node root as configured, with `~` expanded.
pub fn node_root(node: &NodeConfig) -> PathBuf {
    expand_home(&node.root)
}

/// Ensure the node root and every required sub-directory exist.
pub fn verify(node: &NodeConfig) -> Result<PathBuf, WorkspaceError> {
    let root = node_root(node);
    require_dir(&root)?;
    for dir in &node.required_dirs {
        require_dir(&root.join(dir))?;
    }
    Ok(root)
}

fn require_dir(path: &Path) -> Result<(), WorkspaceError> {
    if !path.exists() {
        return Err(WorkspaceError::MissingDirectory(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(WorkspaceError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Resolve the configured served files against `root`.
pub fn served_files(node: &NodeConfig, root: &Path) -> Result<Vec<ServedFile>, WorkspaceError> {
    node.served_files
        .iter()
        .map(|rel| {
            let path = Path::new(rel);
            let escapes = path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes || rel.is_empty() {
                return Err(WorkspaceError::OutsideRoot(rel.clone()));
            }

            let absolute = root.join(path);
            Ok(ServedFile {
                relative: rel.trim_start_matches("./").replace('\\', "/"),
                present: absolute.is_file(),
                absolute,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(root: &Path) -> NodeConfig {
        NodeConfig {
            root: root.display().to_string(),
            ..NodeConfig::default()
        }
    }

    #[test]
    fn missing_required_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify(&node_at(dir.path())).unwrap_err();
        assert!(matches!(err, WorkspaceError::MissingDirectory(p) if p.ends_with("config")));
    }

    #[test]
    fn missing_root_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let err = verify(&node_at(&gone)).unwrap_err();
        assert!(matches!(err, WorkspaceError::MissingDirectory(p) if p == gone));
    }

    #[test]
    fn file_in_place_of_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config"), b"").unwrap();
        assert!(matches!(
            verify(&node_at(dir.path())),
            Err(WorkspaceError::NotADirectory(_))
        ));
    }

    #[test]
    fn served_files_report_presence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join("config/node_key.json"), b"{}").unwrap();

        let node = node_at(dir.path());
        let root = verify(&node).unwrap();
        let files = served_files(&node, &root).unwrap();

        assert_eq!(files.len(), 3);
        let node_key = files.iter().find(|f| f.relative == "config/node_key.json").unwrap();
        assert!(node_key.present);
        assert_eq!(node_key.file_name(), "node_key.json");
        assert!(files.iter().filter(|f| !f.present).count() == 2);
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["../secret.json", "/etc/passwd", "config/../../x"] {
            let node = NodeConfig {
                served_files: vec![bad.to_string()],
                ..node_at(dir.path())
            };
            assert!(
                matches!(served_files(&node, dir.path()), Err(WorkspaceError::OutsideRoot(_))),
                "{bad} should be rejected"
            );
        }
    }
}
