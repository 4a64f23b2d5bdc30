//! Marker file scanner.
//!
//! Walks a build tree and returns the marker files left by ikos-scan,
//! skipping build-system intermediate directories.

use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for marker scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File name suffix identifying a marker file (e.g. ".ikosbin")
    pub marker_extension: String,
    /// Directory names whose contents are never targets (e.g. "CMakeFiles")
    pub excluded_dirs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            marker_extension: config.marker_extension.clone(),
            excluded_dirs: config.excluded_dirs.clone(),
        }
    }
}

/// Scanner for marker files below a root directory.
pub struct MarkerScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl MarkerScanner {
    /// Create a new marker scanner.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Return every marker file below the root, sorted by path.
    ///
    /// The order is stable for an unchanged tree; the aggregate reports
    /// list targets in this order.
    pub fn scan(&self) -> Vec<PathBuf> {
        if !self.root.is_dir() {
            warn!("Scan directory does not exist: {}", self.root.display());
            return Vec::new();
        }

        let mut markers: Vec<PathBuf> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            // Directory links are not descended into; links to files count
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.is_marker(path))
            .filter(|path| !self.is_excluded(path))
            .collect();

        markers.sort();
        debug!(
            "Found {} marker files under {}",
            markers.len(),
            self.root.display()
        );
        markers
    }

    /// Check if a file name carries the marker extension.
    fn is_marker(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| name.ends_with(&self.config.marker_extension))
            .unwrap_or(false)
    }

    /// Check if a path lies beneath an excluded directory.
    ///
    /// Only components below the scan root are considered, so scanning from
    /// inside an excluded directory still works.
    fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let parent = match relative.parent() {
            Some(parent) => parent,
            None => return false,
        };

        parent.components().any(|component| match component {
            Component::Normal(name) => self
                .config
                .excluded_dirs
                .iter()
                .any(|excluded| name == excluded.as_str()),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    fn relative(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_sorted_and_recursive() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "pkg_b/talker.ikosbin");
        touch(dir.path(), "pkg_a/sub/listener.ikosbin");
        touch(dir.path(), "pkg_a/alpha.ikosbin");
        touch(dir.path(), "pkg_a/alpha.bc");

        let scanner = MarkerScanner::new(dir.path().to_path_buf(), ScanConfig::default());
        let markers = scanner.scan();

        assert_eq!(
            relative(dir.path(), &markers),
            vec![
                "pkg_a/alpha.ikosbin",
                "pkg_a/sub/listener.ikosbin",
                "pkg_b/talker.ikosbin"
            ]
        );
    }

    #[test]
    fn test_scan_is_deterministic() {
        let dir = TempDir::new().unwrap();
        for name in ["z", "m", "a", "q"] {
            touch(dir.path(), &format!("{}/{}.ikosbin", name, name));
        }

        let scanner = MarkerScanner::new(dir.path().to_path_buf(), ScanConfig::default());
        assert_eq!(scanner.scan(), scanner.scan());
    }

    #[test]
    fn test_scan_skips_cmake_intermediates() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            "CMakeFiles/3.22.1/CompilerIdC/a.out.ikosbin",
        );
        touch(dir.path(), "pkg/CMakeFiles/cmTC_1a2b.dir/cmTC_1a2b.ikosbin");
        touch(dir.path(), "pkg/node.ikosbin");

        let scanner = MarkerScanner::new(dir.path().to_path_buf(), ScanConfig::default());
        assert_eq!(relative(dir.path(), &scanner.scan()), vec!["pkg/node.ikosbin"]);
    }

    #[test]
    fn test_scan_root_inside_excluded_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("CMakeFiles");
        touch(&root, "x.ikosbin");

        let scanner = MarkerScanner::new(root.clone(), ScanConfig::default());
        assert_eq!(relative(&root, &scanner.scan()), vec!["x.ikosbin"]);
    }

    #[test]
    fn test_scan_custom_config() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "_deps/lib.marker");
        touch(dir.path(), "src/app.marker");
        touch(dir.path(), "src/app.ikosbin");

        let config = ScanConfig {
            marker_extension: ".marker".to_string(),
            excluded_dirs: vec!["_deps".to_string()],
        };
        let scanner = MarkerScanner::new(dir.path().to_path_buf(), config);
        assert_eq!(relative(dir.path(), &scanner.scan()), vec!["src/app.marker"]);
    }

    #[test]
    fn test_scan_empty_and_missing() {
        let dir = TempDir::new().unwrap();
        let scanner = MarkerScanner::new(dir.path().to_path_buf(), ScanConfig::default());
        assert!(scanner.scan().is_empty());

        let scanner = MarkerScanner::new(dir.path().join("missing"), ScanConfig::default());
        assert!(scanner.scan().is_empty());
    }

    #[test]
    fn test_directory_with_marker_name_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("weird.ikosbin")).unwrap();

        let scanner = MarkerScanner::new(dir.path().to_path_buf(), ScanConfig::default());
        assert!(scanner.scan().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_marker_is_found() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "real/talker.json");
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("real/talker.json"),
            dir.path().join("pkg/talker.ikosbin"),
        )
        .unwrap();

        let scanner = MarkerScanner::new(dir.path().to_path_buf(), ScanConfig::default());
        assert_eq!(relative(dir.path(), &scanner.scan()), vec!["pkg/talker.ikosbin"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_marker_link_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("gone.json"),
            dir.path().join("gone.ikosbin"),
        )
        .unwrap();

        let scanner = MarkerScanner::new(dir.path().to_path_buf(), ScanConfig::default());
        assert!(scanner.scan().is_empty());
    }
}
