use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::io::recovery::atomic_write;

/// Error type for document store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A hierarchical collection of markdown documents.
///
/// Paths are relative to the collection root and use `/` separators.
pub trait DocumentStore {
    /// Every markdown document, in enumeration order
    fn list(&self) -> Result<Vec<String>, StoreError>;
    fn read(&self, path: &str) -> Result<String, StoreError>;
    /// Replace (or create) a document's full text
    fn write(&mut self, path: &str, content: &str) -> Result<(), StoreError>;
    /// Create a new document; fails if one already exists at `path`
    fn create(&mut self, path: &str, content: &str) -> Result<(), StoreError>;
    fn exists(&self, path: &str) -> bool;
}

/// File name without folders or extension: `notes/Daily.md` → `Daily`.
pub fn base_name(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// Documents on disk under a vault root. Dot-directories are not listed.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Vault-relative form of an absolute path, if it lies inside the vault.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    fn walk(&self, dir: &Path, out: &mut Vec<String>) -> Result<(), StoreError> {
        let entries = fs::read_dir(dir).map_err(|e| StoreError::ReadError {
            path: dir.to_path_buf(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::ReadError {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            let hidden = entry.file_name().to_str().is_none_or(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                self.walk(&path, out)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some("md")
                && let Some(rel) = self.relative(&path)
            {
                out.push(rel);
            }
        }
        Ok(())
    }
}

impl DocumentStore for FsStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut paths = Vec::new();
        self.walk(&self.root, &mut paths)?;
        paths.sort();
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<String, StoreError> {
        let full = self.full_path(path);
        fs::read_to_string(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
            _ => StoreError::ReadError {
                path: full,
                source: e,
            },
        })
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), StoreError> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::WriteError {
                path: full.clone(),
                source: e,
            })?;
        }
        atomic_write(&full, content.as_bytes()).map_err(|e| StoreError::WriteError {
            path: full,
            source: e,
        })
    }

    fn create(&mut self, path: &str, content: &str) -> Result<(), StoreError> {
        if self.exists(path) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        self.write(path, content)
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Documents held in memory, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: IndexMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, content: &str) -> Self {
        self.docs.insert(path.to_string(), content.to_string());
        self
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.docs.get(path).map(|s| s.as_str())
    }
}

impl DocumentStore for MemoryStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.docs.keys().cloned().collect())
    }

    fn read(&self, path: &str) -> Result<String, StoreError> {
        self.get(path)
            .map(str::to_string)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn write(&mut self, path: &str, content: &str) -> Result<(), StoreError> {
        self.docs.insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn create(&mut self, path: &str, content: &str) -> Result<(), StoreError> {
        if self.docs.contains_key(path) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        self.write(path, content)
    }

    fn exists(&self, path: &str) -> bool {
        self.docs.contains_key(path)
    }
}
