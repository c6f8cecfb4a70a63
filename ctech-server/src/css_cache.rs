// ctech-server/src/css_cache.rs
use ctech_common::{CacheError, CacheInvalidator};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

/// Rendered page-builder CSS stored as `post-<id>.css` files in one directory.
pub struct CssFileCache {
    dir: PathBuf,
}

impl CssFileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CssFileCache { dir: dir.into() }
    }

    fn remove(&self, path: PathBuf) -> Result<bool, CacheError> {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed cached CSS {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError(format!("cannot remove {}: {}", path.display(), e))),
        }
    }
}

impl CacheInvalidator for CssFileCache {
    fn flush_document(&self, document: u64) -> Result<(), CacheError> {
        self.remove(self.dir.join(format!("post-{}.css", document)))?;
        Ok(())
    }

    fn flush_all(&self) -> Result<(), CacheError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError(format!("cannot list {}: {}", self.dir.display(), e))),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry
                .map_err(|e| CacheError(format!("cannot list {}: {}", self.dir.display(), e)))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("css") && self.remove(path)? {
                removed += 1;
            }
        }
        debug!("Flushed {} cached CSS file(s) from {}", removed, self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flushes_one_document() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("post-7.css"), "a{}").unwrap();
        fs::write(temp.path().join("post-8.css"), "b{}").unwrap();

        let cache = CssFileCache::new(temp.path());
        cache.flush_document(7).unwrap();
        cache.flush_document(99).unwrap();

        assert!(!temp.path().join("post-7.css").exists());
        assert!(temp.path().join("post-8.css").exists());
    }

    #[test]
    fn flush_all_keeps_non_css_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("post-7.css"), "a{}").unwrap();
        fs::write(temp.path().join("global.css"), "b{}").unwrap();
        fs::write(temp.path().join("index.php"), "<?php").unwrap();

        CssFileCache::new(temp.path()).flush_all().unwrap();

        assert!(!temp.path().join("post-7.css").exists());
        assert!(!temp.path().join("global.css").exists());
        assert!(temp.path().join("index.php").exists());
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let cache = CssFileCache::new(temp.path().join("nope"));
        cache.flush_all().unwrap();
        cache.flush_document(1).unwrap();
    }
}
