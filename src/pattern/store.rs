//! Pattern storage contract and filesystem implementation.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::warn;

use crate::error::{NotFoundError, PermissionError, Result};

/// Directory (relative to the pattern root) holding user-provided patterns.
///
/// Only patterns under this directory may be deleted; everything else ships
/// with the device.
pub const CUSTOM_PATTERN_DIR: &str = "custom_patterns";

/// File extension for theta-rho pattern files.
pub const PATTERN_EXTENSION: &str = "thr";

/// Storage contract for theta-rho pattern files.
///
/// Names are `/`-separated paths relative to the store root, extension
/// included (for example `custom_patterns/spiral.thr`).
pub trait PatternStore: Send + Sync {
    /// Read raw pattern content.
    ///
    /// # Errors
    ///
    /// `NotFoundError::Pattern` when the name is unknown.
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// List all pattern names, sorted.
    fn list(&self) -> Result<Vec<String>>;

    /// Delete a pattern.
    ///
    /// # Errors
    ///
    /// `NotFoundError::Pattern` when the name is unknown;
    /// `PermissionError::BuiltinPattern` when the pattern is not
    /// user-provided.
    fn delete(&self, name: &str) -> Result<()>;
}

/// Filesystem-backed pattern store: a directory tree of `.thr` files.
#[derive(Debug)]
pub struct FilePatternStore {
    root: PathBuf,
}

impl FilePatternStore {
    /// Create a store rooted at the given directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The store's root directory.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        // Reject traversal outside the root
        if name.split('/').any(|part| part == ".." || part.is_empty()) {
            return None;
        }
        Some(self.root.join(name))
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("skipping unreadable pattern directory {:?}: {}", dir, e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let relative = if prefix.is_empty() {
                file_name.to_string()
            } else {
                format!("{}/{}", prefix, file_name)
            };
            if path.is_dir() {
                self.collect(&path, &relative, out);
            } else if path.extension().and_then(|e| e.to_str()) == Some(PATTERN_EXTENSION) {
                out.push(relative);
            }
        }
    }
}

impl PatternStore for FilePatternStore {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self
            .resolve(name)
            .ok_or_else(|| NotFoundError::Pattern(name.to_string()))?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(NotFoundError::Pattern(name.to_string()).into())
            }
            Err(e) => {
                warn!("failed to read pattern {:?}: {}", path, e);
                Err(NotFoundError::Pattern(name.to_string()).into())
            }
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.collect(&self.root, "", &mut names);
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self
            .resolve(name)
            .ok_or_else(|| NotFoundError::Pattern(name.to_string()))?;
        if !path.is_file() {
            return Err(NotFoundError::Pattern(name.to_string()).into());
        }
        if !name.starts_with(&format!("{}/", CUSTOM_PATTERN_DIR)) {
            return Err(PermissionError::BuiltinPattern(name.to_string()).into());
        }
        fs::remove_file(&path).map_err(|e| {
            warn!("failed to delete pattern {:?}: {}", path, e);
            NotFoundError::Pattern(name.to_string())
        })?;
        Ok(())
    }
}

/// In-memory pattern store for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryPatternStore {
    patterns: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryPatternStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a pattern.
    pub fn insert(&self, name: &str, content: &str) {
        self.patterns
            .lock()
            .expect("pattern store lock poisoned")
            .insert(name.to_string(), content.as_bytes().to_vec());
    }
}

impl PatternStore for MemoryPatternStore {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.patterns
            .lock()
            .expect("pattern store lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| NotFoundError::Pattern(name.to_string()).into())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .patterns
            .lock()
            .expect("pattern store lock poisoned")
            .keys()
            .cloned()
            .collect())
    }

    fn delete(&self, name: &str) -> Result<()> {
        if !name.starts_with(&format!("{}/", CUSTOM_PATTERN_DIR)) {
            return Err(PermissionError::BuiltinPattern(name.to_string()).into());
        }
        self.patterns
            .lock()
            .expect("pattern store lock poisoned")
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| NotFoundError::Pattern(name.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_memory_store_read_and_list() {
        let store = MemoryPatternStore::new();
        store.insert("spiral.thr", "0.0 0.0\n1.0 1.0\n");
        store.insert("custom_patterns/mine.thr", "0.0 0.5\n");

        assert_eq!(
            store.list().unwrap(),
            vec!["custom_patterns/mine.thr", "spiral.thr"]
        );
        assert!(!store.read("spiral.thr").unwrap().is_empty());
        assert!(matches!(
            store.read("missing.thr"),
            Err(Error::NotFound(NotFoundError::Pattern(_)))
        ));
    }

    #[test]
    fn test_memory_store_delete_permissions() {
        let store = MemoryPatternStore::new();
        store.insert("spiral.thr", "0.0 0.0\n");
        store.insert("custom_patterns/mine.thr", "0.0 0.5\n");

        assert!(matches!(
            store.delete("spiral.thr"),
            Err(Error::Permission(PermissionError::BuiltinPattern(_)))
        ));
        assert!(store.delete("custom_patterns/mine.thr").is_ok());
        assert!(matches!(
            store.delete("custom_patterns/mine.thr"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_file_store_rejects_traversal() {
        let store = FilePatternStore::new("/nonexistent");
        assert!(matches!(
            store.read("../etc/passwd"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_file_store_round_trip() {
        let root = std::env::temp_dir().join(format!(
            "sandtable-motion-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let custom = root.join(CUSTOM_PATTERN_DIR);
        fs::create_dir_all(&custom).unwrap();
        fs::write(root.join("builtin.thr"), "0.0 0.0\n1.0 1.0\n").unwrap();
        fs::write(custom.join("mine.thr"), "0.0 0.5\n").unwrap();
        fs::write(root.join("notes.txt"), "ignored").unwrap();

        let store = FilePatternStore::new(&root);
        assert_eq!(
            store.list().unwrap(),
            vec!["builtin.thr", "custom_patterns/mine.thr"]
        );
        assert_eq!(store.read("builtin.thr").unwrap(), b"0.0 0.0\n1.0 1.0\n");

        assert!(matches!(
            store.delete("builtin.thr"),
            Err(Error::Permission(_))
        ));
        assert!(store.delete("custom_patterns/mine.thr").is_ok());
        assert!(matches!(
            store.read("custom_patterns/mine.thr"),
            Err(Error::NotFound(_))
        ));

        fs::remove_dir_all(&root).unwrap();
    }
}
