//! Discovery of test style sheets on disk.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::HarnessError;

/// Finds the test sheets a suite run should process.
#[derive(Debug)]
pub struct TestDiscovery;

impl TestDiscovery {
    /// Recursively scans a directory for `*.test.scss` files.
    ///
    /// The returned list is sorted to keep execution order deterministic.
    pub fn discover_test_files<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>, HarnessError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry
                .map_err(|e| HarnessError::internal(format!("failed to walk directory: {e}")))?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !Self::is_test_sheet(path) {
                continue;
            }

            files.push(path.to_path_buf());
        }
        files.sort();
        Ok(files)
    }

    fn is_test_sheet(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".test.scss"))
    }
}
