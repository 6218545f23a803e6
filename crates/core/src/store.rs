//! Record store: the in-memory library and its backing file.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{
    config::APP_DIR,
    error::{RecordError, StoreError},
    models::{GameDraft, GameRecord, RecordId, RecordPatch},
};

/// File name of the library inside the data directory.
pub const LIBRARY_FILE_NAME: &str = "game_library.json";

/// Ordered in-memory collection of games.
#[derive(Debug, Clone, Default)]
pub struct Library {
    records: Vec<GameRecord>,
    held: Vec<GameRecord>,
    next_id: u64,
}

impl Library {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from raw records, assigning fresh ids in order.
    pub fn from_records(records: impl IntoIterator<Item = GameRecord>) -> Self {
        let mut library = Self::new();
        for mut record in records {
            let id = library.allocate_id();
            record.set_id(id);
            library.records.push(record);
        }
        library
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the library holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in storage order.
    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    /// Stored entries missing a required field.
    ///
    /// They are neither listed nor editable, but every save writes them back
    /// so that they survive until the file is fixed by hand.
    pub fn held(&self) -> &[GameRecord] {
        &self.held
    }

    pub(crate) fn hold(&mut self, records: Vec<GameRecord>) {
        self.held = records;
    }

    /// Look up a record by id.
    pub fn get(&self, id: RecordId) -> Option<&GameRecord> {
        self.records.iter().find(|record| record.id() == id)
    }

    fn position(&self, id: RecordId) -> Result<usize, RecordError> {
        self.records
            .iter()
            .position(|record| record.id() == id)
            .ok_or(RecordError::Unknown(id))
    }

    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        RecordId::new(self.next_id)
    }

    /// Append a new record stamped with the current time.
    pub fn add(&mut self, draft: GameDraft) -> RecordId {
        let id = self.allocate_id();
        self.records.push(GameRecord::from_draft(id, draft));
        id
    }

    /// Merge the provided fields into a record and refresh its timestamp.
    pub fn update(&mut self, id: RecordId, patch: RecordPatch) -> Result<(), RecordError> {
        patch.validate()?;
        let index = self.position(id)?;
        self.records[index].apply(patch);
        Ok(())
    }

    /// Remove a record, keeping the relative order of the others.
    pub fn delete(&mut self, id: RecordId) -> Result<GameRecord, RecordError> {
        let index = self.position(id)?;
        Ok(self.records.remove(index))
    }

    /// Records ordered by lowercase name. Equal names keep their storage order.
    pub fn sorted_view(&self) -> Vec<&GameRecord> {
        let mut view: Vec<&GameRecord> = self.records.iter().collect();
        view.sort_by_cached_key(|record| record.name.to_lowercase());
        view
    }

    /// Reorder storage to match [`Library::sorted_view`].
    pub fn sort_by_name(&mut self) {
        self.records
            .sort_by_cached_key(|record| record.name.to_lowercase());
    }
}

/// Outcome of reading the backing file.
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// Records kept.
    pub records: usize,
    /// Entries held back because a required field was missing.
    pub skipped: usize,
    /// Why the file could not be used, if it could not.
    pub notice: Option<StoreError>,
}

/// Library produced by [`LibraryStore::load`] together with what happened.
#[derive(Debug)]
pub struct LoadReport {
    /// Loaded library, empty when the file was absent or unusable.
    pub library: Library,
    /// Load statistics and notice.
    pub summary: LoadSummary,
}

/// Whole-file JSON persistence for a [`Library`].
#[derive(Debug, Clone)]
pub struct LibraryStore {
    path: PathBuf,
}

impl LibraryStore {
    /// Store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(LIBRARY_FILE_NAME)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backing file.
    ///
    /// Never fails: an absent file yields an empty library, an unreadable or
    /// corrupt one yields an empty library plus a notice.
    pub fn load(&self) -> LoadReport {
        match self.read_records() {
            Ok(None) => {
                debug!(path = %self.path.display(), "no library file yet");
                LoadReport {
                    library: Library::new(),
                    summary: LoadSummary::default(),
                }
            }
            Ok(Some(raw)) => {
                let (valid, held): (Vec<GameRecord>, Vec<GameRecord>) =
                    raw.into_iter().partition(|record| match record.validate() {
                        Ok(()) => true,
                        Err(err) => {
                            warn!(name = %record.name, "Holding back stored game: {err}");
                            false
                        }
                    });
                let skipped = held.len();
                let mut library = Library::from_records(valid);
                library.sort_by_name();
                library.hold(held);
                info!(
                    path = %self.path.display(),
                    records = library.len(),
                    skipped,
                    "Library loaded"
                );
                LoadReport {
                    summary: LoadSummary {
                        records: library.len(),
                        skipped,
                        notice: None,
                    },
                    library,
                }
            }
            Err(err) => {
                warn!("Starting with an empty library: {err}");
                LoadReport {
                    library: Library::new(),
                    summary: LoadSummary {
                        records: 0,
                        skipped: 0,
                        notice: Some(err),
                    },
                }
            }
        }
    }

    /// Overwrite the backing file with the whole library.
    ///
    /// The data is written to a sibling temporary file first and renamed into
    /// place, so a failure leaves the previous contents untouched.
    pub fn save(&self, library: &Library) -> Result<(), StoreError> {
        let entries: Vec<&GameRecord> = library
            .records()
            .iter()
            .chain(library.held())
            .collect();
        let serialized = serialize_records(&entries).map_err(|source| {
            StoreError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;

        let write_error = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        let mut temp = NamedTempFile::new_in(parent).map_err(write_error)?;
        temp.write_all(&serialized).map_err(write_error)?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            fs::set_permissions(temp.path(), metadata.permissions()).map_err(write_error)?;
        }
        temp.as_file().sync_all().map_err(write_error)?;
        temp.persist(&self.path)
            .map_err(|err| write_error(err.error))?;

        debug!(path = %self.path.display(), records = library.len(), "Library saved");
        Ok(())
    }

    fn read_records(&self) -> Result<Option<Vec<GameRecord>>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let records = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(records))
    }
}

fn serialize_records(records: &[&GameRecord]) -> serde_json::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    records.serialize(&mut serializer)?;
    Ok(buffer)
}
