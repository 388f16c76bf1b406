//! Filesystem capability
//!
//! Parsers and validators never touch `std::fs` directly; they go through
//! [`FileSystem`] so that tests can run against [`MemoryFs`].

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Minimal filesystem interface used by the ingest pipeline
pub trait FileSystem: Send + Sync {
    /// Whether `path` is an existing directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether `path` is an existing regular file
    fn is_file(&self, path: &Path) -> bool;

    /// Regular files directly inside `dir`, sorted by path
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Size of a file in bytes
    fn file_size(&self, path: &Path) -> io::Result<u64>;

    /// Open a file for buffered line reading
    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead + Send>>;

    /// Read the first line of a file, without the line terminator.
    /// Returns `None` for an empty file.
    fn read_first_line(&self, path: &Path) -> io::Result<Option<String>> {
        let mut reader = self.open(path)?;
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        Ok(Some(trimmed.to_string()))
    }

    /// Read a whole file into a string
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let mut reader = self.open(path)?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Ok(content)
    }
}

/// The local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

/// In-memory filesystem for tests and benchmarks
///
/// Directories are implied by the files stored beneath them.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<BTreeMap<PathBuf, String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.write().insert(path.into(), content.into());
    }

    /// Builder-style variant of [`add_file`](Self::add_file)
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.add_file(path, content);
        self
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )
    }
}

impl FileSystem for MemoryFs {
    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|p| p.starts_with(path) && p.as_path() != path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.is_dir(dir) {
            return Err(Self::not_found(dir));
        }
        // BTreeMap keys are already sorted
        Ok(self
            .files
            .read()
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn file_size(&self, path: &Path) -> io::Result<u64> {
        self.files
            .read()
            .get(path)
            .map(|c| c.len() as u64)
            .ok_or_else(|| Self::not_found(path))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
        let content = self
            .files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))?;
        Ok(Box::new(Cursor::new(content.into_bytes())))
    }
}
