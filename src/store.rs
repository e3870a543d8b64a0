//! Persistence of artist records.
//!
//! The storefront persists artists through its own API. This crate only
//! needs three operations, captured by [`ArtistStore`]; saving always
//! replaces the whole section collection (there is no partial update).
//!
//! [`JsonDirStore`] is the on-disk implementation used by the CLI: one
//! pretty-printed `<id>.json` per artist in a data directory.
//!
//! ```text
//! data/
//! ├── config.toml         # optional, see config module
//! ├── kim-deal.json
//! └── j-mascis.json
//! ```

use crate::artist::ArtistRecord;
use crate::section::Section;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Artist not found: {0}")]
    NotFound(String),
    #[error("Invalid artist id: {0:?}")]
    InvalidId(String),
    #[error("Record {path} has id {found:?}, expected {expected:?}")]
    IdMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

/// Persistence API for artist records.
pub trait ArtistStore {
    /// Load one artist by id.
    fn load(&self, id: &str) -> Result<ArtistRecord, StoreError>;

    /// Load every artist, sorted by id.
    fn list(&self) -> Result<Vec<ArtistRecord>, StoreError>;

    /// Replace an artist's section collection and custom-template flag.
    fn save_sections(
        &mut self,
        id: &str,
        sections: &[Section],
        use_custom_template: bool,
    ) -> Result<(), StoreError>;
}

/// Whether `id` is safe to use as a single path component (record file name,
/// output directory).
pub fn is_valid_artist_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Directory of `<id>.json` artist records.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_artist_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{id}.json")))
    }

    fn read_record(path: &Path) -> Result<ArtistRecord, StoreError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write a full record. Goes through a temp file so a failed write never
    /// leaves a truncated record behind.
    pub fn write(&self, record: &ArtistRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.id)?;
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(record).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl ArtistStore for JsonDirStore {
    fn load(&self, id: &str) -> Result<ArtistRecord, StoreError> {
        let path = self.record_path(id)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let record = Self::read_record(&path)?;
        if record.id != id {
            return Err(StoreError::IdMismatch {
                path,
                expected: id.to_string(),
                found: record.id,
            });
        }
        Ok(record)
    }

    fn list(&self) -> Result<Vec<ArtistRecord>, StoreError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
                records.push(Self::read_record(path)?);
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn save_sections(
        &mut self,
        id: &str,
        sections: &[Section],
        use_custom_template: bool,
    ) -> Result<(), StoreError> {
        let mut record = self.load(id)?;
        record.custom_sections = sections.to_vec();
        record.use_custom_template = use_custom_template;
        self.write(&record)
    }
}
