//! Ledger storage backends

use crate::{data::tradable::write_pretty_json, ledger::PositionRecord, PairsTradingError, Result};
use indexmap::IndexMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Map of pair key to record, in insertion order
pub type Positions = IndexMap<String, PositionRecord>;

/// Where a ledger lives
pub trait LedgerStore: Send + Sync {
    /// Load all records; an absent ledger is empty
    fn load(&self) -> Result<Positions>;

    /// Replace the stored records
    fn save(&self, positions: &Positions) -> Result<()>;

    /// Human-readable location
    fn describe(&self) -> String;
}

/// JSON file ledger, written through a temporary file and renamed into place
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Ledger at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Positions> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No ledger at {:?}, starting fresh", self.path);
                return Ok(Positions::new());
            }
            Err(e) => {
                return Err(PairsTradingError::Ledger(format!("Failed to read {:?}: {}", self.path, e)).into())
            }
        };

        serde_json::from_str(&content)
            .map_err(|e| PairsTradingError::Ledger(format!("Corrupt ledger {:?}: {}", self.path, e)).into())
    }

    fn save(&self, positions: &Positions) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.tmp_path();
        write_pretty_json(&tmp, positions)?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| PairsTradingError::Ledger(format!("Failed to replace {:?}: {}", self.path, e)))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory ledger; clones share the same records
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    positions: Arc<Mutex<Positions>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with records
    pub fn with_positions(positions: Positions) -> Self {
        Self {
            positions: Arc::new(Mutex::new(positions)),
        }
    }

    /// Copy of the saved records
    pub fn snapshot(&self) -> Positions {
        self.positions.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Positions> {
        Ok(self.snapshot())
    }

    fn save(&self, positions: &Positions) -> Result<()> {
        let mut guard = self
            .positions
            .lock()
            .map_err(|_| PairsTradingError::Ledger("Memory store lock poisoned".to_string()))?;
        *guard = positions.clone();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl<T: LedgerStore + ?Sized> LedgerStore for Box<T> {
    fn load(&self) -> Result<Positions> {
        (**self).load()
    }

    fn save(&self, positions: &Positions) -> Result<()> {
        (**self).save(positions)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
