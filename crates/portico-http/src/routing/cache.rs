//! Compiled route file snapshots.
//!
//! The routing table can keep a JSON snapshot of a parsed route file in a
//! cache directory. A snapshot is used only while it is at least as recent
//! as its source file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use portico_core::PorticoResult;

use super::definition::RouteFile;

/// A directory of route file snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCache {
    dir: PathBuf,
}

impl RouteCache {
    /// Creates a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns where the snapshot of `source` is stored.
    pub fn snapshot_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map_or_else(|| "routes".into(), |s| s.to_string_lossy());
        self.dir.join(format!("{stem}.routes.json"))
    }

    /// Returns the cached definitions of `source` if a fresh snapshot exists.
    ///
    /// Stale or unreadable snapshots count as a miss.
    ///
    /// # Errors
    ///
    /// Returns [`PorticoError::IoError`](portico_core::PorticoError::IoError)
    /// if the source file's metadata cannot be read.
    pub fn read(&self, source: &Path) -> PorticoResult<Option<RouteFile>> {
        let snapshot = self.snapshot_path(source);
        let Some(snapshot_time) = modified(&snapshot) else {
            return Ok(None);
        };
        let source_time = fs::metadata(source)?.modified()?;
        if snapshot_time < source_time {
            tracing::debug!(snapshot = %snapshot.display(), "route snapshot is stale");
            return Ok(None);
        }

        let cached = fs::read_to_string(&snapshot)
            .ok()
            .and_then(|content| serde_json::from_str::<RouteFile>(&content).ok());
        match cached {
            Some(file) => {
                tracing::debug!(snapshot = %snapshot.display(), "using route snapshot");
                Ok(Some(file))
            }
            None => {
                tracing::warn!(snapshot = %snapshot.display(), "ignoring unreadable route snapshot");
                Ok(None)
            }
        }
    }

    /// Stores the definitions parsed from `source`.
    ///
    /// The snapshot is written to a temporary file and renamed into place so
    /// readers never observe a partial file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the snapshot cannot be written.
    pub fn write(&self, source: &Path, file: &RouteFile) -> PorticoResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let snapshot = self.snapshot_path(source);
        let temp = self
            .dir
            .join(format!(".{}.{}.tmp", snapshot_name(&snapshot), std::process::id()));

        fs::write(&temp, serde_json::to_vec_pretty(file)?)?;
        if let Err(e) = fs::rename(&temp, &snapshot) {
            fs::remove_file(&temp).ok();
            return Err(e.into());
        }

        tracing::debug!(snapshot = %snapshot.display(), routes = file.routes.len(), "wrote route snapshot");
        Ok(snapshot)
    }

    /// Removes the snapshot of `source`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be removed.
    pub fn invalidate(&self, source: &Path) -> PorticoResult<()> {
        match fs::remove_file(self.snapshot_path(source)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn snapshot_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = r#"
        [[routes]]
        name = "home"
        url = "/"
        params = { _controller = "Homepage" }
    "#;

    #[test]
    fn test_miss_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("routing.toml");
        fs::write(&source, ROUTES).unwrap();
        let cache = RouteCache::new(dir.path().join("cache"));
        assert!(cache.read(&source).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("routing.toml");
        fs::write(&source, ROUTES).unwrap();
        let cache = RouteCache::new(dir.path().join("cache"));

        let file = RouteFile::from_path(&source).unwrap();
        let snapshot = cache.write(&source, &file).unwrap();
        assert!(snapshot.ends_with("routing.routes.json"));

        let cached = cache.read(&source).unwrap().unwrap();
        assert_eq!(cached, file);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("routing.toml");
        fs::write(&source, ROUTES).unwrap();
        let cache = RouteCache::new(dir.path().join("cache"));
        cache
            .write(&source, &RouteFile::from_path(&source).unwrap())
            .unwrap();
        let entries: Vec<_> = fs::read_dir(cache.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("routing.toml");
        fs::write(&source, ROUTES).unwrap();
        let cache = RouteCache::new(dir.path().join("cache"));
        cache
            .write(&source, &RouteFile::from_path(&source).unwrap())
            .unwrap();
        cache.invalidate(&source).unwrap();
        assert!(cache.read(&source).unwrap().is_none());
        cache.invalidate(&source).unwrap();
    }

    #[test]
    fn test_corrupt_snapshot_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("routing.toml");
        fs::write(&source, ROUTES).unwrap();
        let cache = RouteCache::new(dir.path().join("cache"));
        fs::create_dir_all(cache.dir()).unwrap();
        fs::write(cache.snapshot_path(&source), "{").unwrap();
        assert!(cache.read(&source).unwrap().is_none());
    }
}
