//! In-memory file staging and directory listing
//!
//! `MemoryFS` holds bundle entries while a bundle is being assembled or
//! validated, so nothing touches the disk until every entry is known to be
//! good. `DirectoryListing` is the capability glob expansion uses to see a
//! directory tree; the host filesystem and `MemoryFS` both provide it.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Represents a file with content and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// File content as bytes
    pub content: Vec<u8>,
    /// Unix permission bits
    pub permissions: u32,
}

impl File {
    /// Create a new file with content
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: 0o644,
        }
    }

    /// Create an executable file, used for plugin binaries
    pub fn executable(content: Vec<u8>) -> Self {
        Self {
            content,
            permissions: 0o755,
        }
    }

    /// Create a new file from string content
    pub fn from_string(content: &str) -> Self {
        Self::new(content.as_bytes().to_vec())
    }

    /// Get file size in bytes
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// In-memory filesystem with deterministic (sorted) iteration order
#[derive(Debug, Clone, Default)]
pub struct MemoryFS {
    files: BTreeMap<PathBuf, File>,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a file
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, file: File) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        self.files.insert(path, file);
        Ok(())
    }

    /// Add a file, failing if a different file already claims the path.
    ///
    /// Adding identical content twice is accepted.
    pub fn add_file_unique<P: AsRef<Path>>(&mut self, path: P, file: File) -> Result<()> {
        let path = path.as_ref();
        if let Some(existing) = self.files.get(path) {
            if existing.content != file.content {
                return Err(Error::Filesystem {
                    message: format!("Conflicting content for {}", path.display()),
                });
            }
            return Ok(());
        }
        self.add_file(path, file)
    }

    /// Add a file with string content
    pub fn add_file_string<P: AsRef<Path>>(&mut self, path: P, content: &str) -> Result<()> {
        self.add_file(path, File::from_string(content))
    }

    /// Get a file by path
    pub fn get_file<P: AsRef<Path>>(&self, path: P) -> Option<&File> {
        self.files.get(path.as_ref())
    }

    /// Check if a file exists
    pub fn exists<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.contains_key(path.as_ref())
    }

    /// List all files
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all files as (path, file) pairs in path order
    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &File)> {
        self.files.iter()
    }

    /// Write every file below `output_path`, creating directories as needed.
    pub fn write_to_dir(&self, output_path: &Path) -> Result<()> {
        for (relative_path, file) in &self.files {
            let full_path = output_path.join(relative_path);

            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
                    message: format!("Failed to create directory '{}': {}", parent.display(), e),
                })?;
            }

            fs::write(&full_path, &file.content).map_err(|e| Error::Filesystem {
                message: format!("Failed to write file '{}': {}", full_path.display(), e),
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(file.permissions);
                fs::set_permissions(&full_path, perms).map_err(|e| Error::Filesystem {
                    message: format!(
                        "Failed to set permissions on '{}': {}",
                        full_path.display(),
                        e
                    ),
                })?;
            }
        }

        Ok(())
    }
}

/// A directory-tree view used to expand glob patterns.
pub trait DirectoryListing {
    /// Every file and directory below `root` (not `root` itself), at most
    /// `max_depth` levels deep when given. Paths are `root` joined with the
    /// entry's relative path. A missing `root` yields an empty list.
    fn list(&self, root: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>>;
}

/// Lists the host filesystem with `walkdir`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsDirectoryListing;

impl DirectoryListing for OsDirectoryListing {
    fn list(&self, root: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
        let walk_root = if root.as_os_str().is_empty() {
            Path::new(".")
        } else {
            root
        };
        if !walk_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut walker = walkdir::WalkDir::new(walk_root)
            .min_depth(1)
            .sort_by_file_name();
        if let Some(depth) = max_depth {
            walker = walker.max_depth(depth);
        }

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| Error::Filesystem {
                message: format!("Failed to list '{}': {}", root.display(), e),
            })?;
            let relative = entry.path().strip_prefix(walk_root).map_err(|e| Error::Path {
                message: e.to_string(),
            })?;
            entries.push(root.join(relative));
        }
        Ok(entries)
    }
}

impl DirectoryListing for MemoryFS {
    fn list(&self, root: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
        let mut entries = BTreeSet::new();
        for path in self.files.keys() {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let components: Vec<Component> = relative.components().collect();
            let limit = max_depth.unwrap_or(usize::MAX).min(components.len());
            let mut current = root.to_path_buf();
            for component in &components[..limit] {
                current.push(component);
                entries.insert(current.clone());
            }
        }
        Ok(entries.into_iter().collect())
    }
}
