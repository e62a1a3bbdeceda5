// Storage backends for the persistent cache.
// Synchronous string key-value stores with an optional byte quota.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage IO error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl StorageError {
    pub fn is_quota(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded)
    }
}

/// A flat string key-value store, shaped like browser local storage.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Every key currently held, in no particular order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// In-memory backend with an optional quota over key + value bytes.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> u64 {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.iter().map(|(k, v)| (k.len() + v.len()) as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(quota) = self.quota_bytes {
            let used: u64 = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| (k.len() + v.len()) as u64)
                .sum();
            if used + (key.len() + value.len()) as u64 > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.keys().cloned().collect())
    }
}

/// Filesystem backend: one `<key>.json` file per entry in a single directory.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>, quota_bytes: Option<u64>) -> Self {
        Self {
            dir: dir.into(),
            quota_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }

    fn entry_paths(&self) -> io::Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    fn used_bytes_excluding(&self, skip: &Path) -> io::Result<u64> {
        let mut total = 0;
        for path in self.entry_paths()? {
            if path != skip {
                total += fs::metadata(&path)?.len();
            }
        }
        Ok(total)
    }
}

impl StorageBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        if let Some(quota) = self.quota_bytes {
            let used = self.used_bytes_excluding(&path)?;
            if used + value.len() as u64 > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        // Write atomically via temp file
        let temp_path = path.with_extension("tmp");
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            match e.kind() {
                io::ErrorKind::StorageFull => StorageError::QuotaExceeded,
                _ => StorageError::Io(e),
            }
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entry_paths()?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(decode_key))
            .collect())
    }
}

/// Encode a key as a file stem. Characters that are unsafe in file names,
/// and `%` itself, become `%XX` so that [`decode_key`] recovers the key.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' => {
                encoded.push_str(&format!("%{:02X}", c as u32));
            }
            _ => encoded.push(c),
        }
    }
    encoded
}

/// Inverse of [`encode_key`]. Stems it could not have produced are returned
/// unchanged.
fn decode_key(stem: &str) -> String {
    let mut decoded = String::with_capacity(stem.len());
    let mut rest = stem;
    while let Some(pos) = rest.find('%') {
        decoded.push_str(&rest[..pos]);
        let escaped = rest
            .get(pos + 1..pos + 3)
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        match escaped {
            Some(byte) => {
                decoded.push(char::from(byte));
                rest = &rest[pos + 3..];
            }
            None => {
                decoded.push('%');
                rest = &rest[pos + 1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}
