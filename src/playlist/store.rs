//! Playlist storage contract and filesystem implementation.
//!
//! The filesystem store keeps every playlist in one JSON document mapping
//! playlist name to its ordered entry list.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{IoError, NotFoundError, Result};

/// A named, ordered, mutable list of pattern references.
///
/// Entries are pattern names; their existence is validated when the
/// playlist is scheduled, not when it is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Unique playlist name.
    pub name: String,
    /// Pattern names, in run order.
    pub entries: Vec<String>,
}

impl Playlist {
    /// Create a playlist.
    pub fn new(name: &str, entries: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            entries,
        }
    }
}

/// Storage contract for playlists.
pub trait PlaylistStore: Send + Sync {
    /// Fetch a playlist by name.
    ///
    /// # Errors
    ///
    /// `NotFoundError::Playlist` when the name is unknown.
    fn get(&self, name: &str) -> Result<Playlist>;

    /// Create or replace a playlist.
    fn save(&self, playlist: &Playlist) -> Result<()>;

    /// Delete a playlist.
    ///
    /// # Errors
    ///
    /// `NotFoundError::Playlist` when the name is unknown.
    fn delete(&self, name: &str) -> Result<()>;

    /// List all playlist names, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

type Document = BTreeMap<String, Vec<String>>;

/// Filesystem-backed playlist store over a single JSON document.
pub struct FilePlaylistStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the document.
    write_lock: Mutex<()>,
}

impl FilePlaylistStore {
    /// Create a store over the given JSON file. A missing file reads as an
    /// empty document and is created on first save.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Document> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => {
                return Err(IoError::Read {
                    detail: e.to_string(),
                }
                .into())
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            IoError::Read {
                detail: format!("malformed playlist document: {}", e),
            }
            .into()
        })
    }

    fn write(&self, document: &Document) -> Result<()> {
        let content = serde_json::to_string_pretty(document).map_err(|e| IoError::Write {
            detail: e.to_string(),
        })?;
        fs::write(&self.path, content).map_err(|e| {
            IoError::Write {
                detail: e.to_string(),
            }
            .into()
        })
    }
}

impl PlaylistStore for FilePlaylistStore {
    fn get(&self, name: &str) -> Result<Playlist> {
        self.load()?
            .remove(name)
            .map(|entries| Playlist {
                name: name.to_string(),
                entries,
            })
            .ok_or_else(|| NotFoundError::Playlist(name.to_string()).into())
    }

    fn save(&self, playlist: &Playlist) -> Result<()> {
        let _guard = self.write_lock.lock().expect("playlist store lock poisoned");
        let mut document = self.load()?;
        document.insert(playlist.name.clone(), playlist.entries.clone());
        self.write(&document)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.write_lock.lock().expect("playlist store lock poisoned");
        let mut document = self.load()?;
        if document.remove(name).is_none() {
            return Err(NotFoundError::Playlist(name.to_string()).into());
        }
        self.write(&document)
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}

/// In-memory playlist store for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryPlaylistStore {
    playlists: Mutex<Document>,
}

impl MemoryPlaylistStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaylistStore for MemoryPlaylistStore {
    fn get(&self, name: &str) -> Result<Playlist> {
        self.playlists
            .lock()
            .expect("playlist store lock poisoned")
            .get(name)
            .map(|entries| Playlist {
                name: name.to_string(),
                entries: entries.clone(),
            })
            .ok_or_else(|| NotFoundError::Playlist(name.to_string()).into())
    }

    fn save(&self, playlist: &Playlist) -> Result<()> {
        self.playlists
            .lock()
            .expect("playlist store lock poisoned")
            .insert(playlist.name.clone(), playlist.entries.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.playlists
            .lock()
            .expect("playlist store lock poisoned")
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| NotFoundError::Playlist(name.to_string()).into())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .playlists
            .lock()
            .expect("playlist store lock poisoned")
            .keys()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryPlaylistStore::new();
        let playlist = Playlist::new("evening", vec!["a.thr".into(), "b.thr".into()]);
        store.save(&playlist).unwrap();

        assert_eq!(store.get("evening").unwrap(), playlist);
        assert_eq!(store.list().unwrap(), vec!["evening"]);
        store.delete("evening").unwrap();
        assert!(matches!(
            store.get("evening"),
            Err(Error::NotFound(NotFoundError::Playlist(_)))
        ));
    }

    #[test]
    fn test_file_store_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "sandtable-playlists-{}-{:?}.json",
            std::process::id(),
            std::thread::current().id()
        ));
        let store = FilePlaylistStore::new(&path);

        // missing document reads as empty
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(store.get("evening"), Err(Error::NotFound(_))));

        store
            .save(&Playlist::new("evening", vec!["a.thr".into()]))
            .unwrap();
        store
            .save(&Playlist::new("morning", vec!["b.thr".into(), "c.thr".into()]))
            .unwrap();

        assert_eq!(store.list().unwrap(), vec!["evening", "morning"]);
        assert_eq!(store.get("morning").unwrap().entries.len(), 2);

        // replace keeps the same key
        store
            .save(&Playlist::new("evening", vec!["d.thr".into()]))
            .unwrap();
        assert_eq!(store.get("evening").unwrap().entries, vec!["d.thr"]);

        store.delete("evening").unwrap();
        assert!(matches!(store.delete("evening"), Err(Error::NotFound(_))));

        fs::remove_file(&path).unwrap();
    }
}
