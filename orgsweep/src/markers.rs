use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Append-only list of organization names, one per line.
///
/// Each append is synced before returning so an interrupted run leaves a
/// valid list behind.
#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, org: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        writeln!(file, "{org}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.sync_data()
            .with_context(|| format!("failed to sync {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_line_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let marker = MarkerFile::new(dir.path().join("failed_orgs.txt"));

        marker.append("acme").unwrap();
        marker.append("beta").unwrap();

        let contents = std::fs::read_to_string(marker.path()).unwrap();
        assert_eq!(contents, "acme\nbeta\n");
    }

    #[test]
    fn keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skipped_empty_orgs.txt");
        std::fs::write(&path, "old\n").unwrap();

        MarkerFile::new(&path).append("new").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn missing_parent_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let marker = MarkerFile::new(dir.path().join("nope").join("failed.txt"));
        assert!(marker.append("acme").is_err());
    }
}
