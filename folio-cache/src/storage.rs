//! Backing storage implementations.
//!
//! Both stores are plain string maps. `MemoryStorage` can be given a byte
//! quota to reproduce "storage full" failures; `FileStorage` persists the
//! whole map as one JSON document.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use folio_core::error::{FolioError, Result};
use folio_core::traits::Storage;

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Creates an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes once keys plus values would
    /// exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Returns the number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn used_bytes(items: &HashMap<String, String>) -> usize {
        items.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.write();
        if let Some(quota) = self.quota_bytes {
            let replaced = items.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = Self::used_bytes(&items) - replaced + key.len() + value.len();
            if needed > quota {
                return Err(FolioError::StorageError(format!(
                    "quota exceeded: {} of {} bytes",
                    needed, quota
                )));
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

/// File-backed storage.
///
/// The whole map lives in memory and is rewritten to disk after every
/// mutation, atomically (write to a temp file, then rename).
///
/// # File Format
///
/// ```text
/// { "<key>": "<value>", ... }
/// ```
#[derive(Debug)]
pub struct FileStorage {
    /// Path to the storage file
    path: PathBuf,
    /// In-memory copy of the file
    items: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens the store at `path`.
    ///
    /// A missing file is an empty store and is created on first write. A file
    /// that cannot be parsed is treated as empty and overwritten on the next
    /// write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let items = if path.exists() {
            Self::load(&path)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument]
    fn load(path: &Path) -> Result<BTreeMap<String, String>> {
        let contents = fs::read(path)?;
        match serde_json::from_slice::<BTreeMap<String, String>>(&contents) {
            Ok(items) => {
                info!(count = items.len(), "Loaded storage file");
                Ok(items)
            }
            Err(e) => {
                warn!(error = %e, "Storage file is malformed, starting empty");
                Ok(BTreeMap::new())
            }
        }
    }

    /// Sibling file written before the rename, e.g. `storage.json.tmp`.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(items)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(storage_error)?;
            }
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).map_err(storage_error)?;
        file.write_all(&serialized).map_err(storage_error)?;
        file.sync_all().map_err(storage_error)?;
        fs::rename(&temp_path, &self.path).map_err(storage_error)?;

        debug!(count = items.len(), path = ?self.path, "Storage saved");
        Ok(())
    }

    /// Applies `change` and persists; memory is rolled back if the write fails.
    fn mutate(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut items = self.items.write();
        let mut next = items.clone();
        change(&mut next);
        self.save(&next)?;
        *items = next;
        Ok(())
    }
}

fn storage_error(e: std::io::Error) -> FolioError {
    FolioError::StorageError(e.to_string())
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        if !self.items.read().contains_key(key) {
            return Ok(());
        }
        self.mutate(|items| {
            items.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}
