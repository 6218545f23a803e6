//! Validate, mutate and persist in one step.

use tracing::{error, info};

use crate::{
    error::{RecordError, StoreError},
    models::{GameForm, GameRecord, RecordId, RecordPatch},
    store::{Library, LibraryStore, LoadSummary},
};

/// Which record a submitted form is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormTarget {
    /// Create a new record.
    New,
    /// Overwrite the editable fields of an existing record.
    Edit(RecordId),
}

/// A mutation that was applied in memory.
#[derive(Debug)]
pub struct Committed {
    /// Record that was created or updated.
    pub id: RecordId,
    /// Whether a new record was created.
    pub created: bool,
    /// Set when the change could not be written to disk. The change is kept in memory.
    pub persist_error: Option<StoreError>,
}

/// A record removed from the catalog.
#[derive(Debug)]
pub struct Removed {
    /// The removed record.
    pub record: GameRecord,
    /// Set when the removal could not be written to disk.
    pub persist_error: Option<StoreError>,
}

/// In-memory library bound to its backing file.
pub struct Catalog {
    store: LibraryStore,
    library: Library,
}

impl Catalog {
    /// Load the library from `store`.
    pub fn open(store: LibraryStore) -> (Self, LoadSummary) {
        let report = store.load();
        let catalog = Self {
            store,
            library: report.library,
        };
        (catalog, report.summary)
    }

    /// Backing store.
    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    /// Current library.
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Number of games.
    pub fn len(&self) -> usize {
        self.library.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.library.is_empty()
    }

    /// Look up a game.
    pub fn get(&self, id: RecordId) -> Option<&GameRecord> {
        self.library.get(id)
    }

    /// Games ordered by name.
    pub fn sorted(&self) -> Vec<&GameRecord> {
        self.library.sorted_view()
    }

    /// Replace the in-memory library with the file contents.
    pub fn reload(&mut self) -> LoadSummary {
        let report = self.store.load();
        self.library = report.library;
        report.summary
    }

    /// Save a form as a new game or over an existing one.
    ///
    /// A form missing a required field changes nothing and writes nothing.
    pub fn submit(&mut self, target: FormTarget, form: &GameForm) -> Result<Committed, RecordError> {
        let draft = form.validate()?;
        let (id, created) = match target {
            FormTarget::New => (self.library.add(draft), true),
            FormTarget::Edit(id) => {
                self.library.update(id, draft.into_patch())?;
                (id, false)
            }
        };
        info!(%id, created, "Game saved");
        Ok(Committed {
            id,
            created,
            persist_error: self.persist(),
        })
    }

    /// Apply a partial update to a game.
    pub fn patch(&mut self, id: RecordId, patch: RecordPatch) -> Result<Committed, RecordError> {
        self.library.update(id, patch)?;
        Ok(Committed {
            id,
            created: false,
            persist_error: self.persist(),
        })
    }

    /// Delete a game.
    pub fn remove(&mut self, id: RecordId) -> Result<Removed, RecordError> {
        let record = self.library.delete(id)?;
        info!(%id, name = %record.name, "Game deleted");
        Ok(Removed {
            record,
            persist_error: self.persist(),
        })
    }

    fn persist(&self) -> Option<StoreError> {
        let err = self.store.save(&self.library).err()?;
        error!("Failed to persist library: {err}");
        Some(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ValidationError, store::LIBRARY_FILE_NAME};
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    fn form(name: &str, platform: &str) -> GameForm {
        GameForm {
            name: name.to_string(),
            platform: platform.to_string(),
            ..GameForm::default()
        }
    }

    #[test]
    fn submit_new_persists_and_reloads() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LIBRARY_FILE_NAME);
        let (mut catalog, summary) = Catalog::open(LibraryStore::new(&path));
        assert!(summary.notice.is_none());
        assert!(catalog.is_empty());

        let committed = catalog.submit(FormTarget::New, &form("Hades", "Steam"))?;
        assert!(committed.created);
        assert!(committed.persist_error.is_none());
        assert_eq!(catalog.get(committed.id).map(|r| r.name.as_str()), Some("Hades"));

        let (reopened, summary) = Catalog::open(LibraryStore::new(&path));
        assert_eq!(summary.records, 1);
        assert_eq!(reopened.sorted()[0].platform, "Steam");
        Ok(())
    }

    #[test]
    fn invalid_form_is_rejected_without_writing() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LIBRARY_FILE_NAME);
        let (mut catalog, _) = Catalog::open(LibraryStore::new(&path));

        let result = catalog.submit(FormTarget::New, &form("", "Steam"));
        assert_eq!(
            result.err(),
            Some(RecordError::Invalid(ValidationError::MissingName))
        );
        let result = catalog.submit(FormTarget::New, &form("Hades", "  "));
        assert_eq!(
            result.err(),
            Some(RecordError::Invalid(ValidationError::MissingPlatform))
        );
        assert_eq!(catalog.len(), 0);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn edit_keeps_identity_and_unknown_keys() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LIBRARY_FILE_NAME);
        fs::write(
            &path,
            r#"[{"name": "Braid", "platform": "Steam", "playtime": 12}]"#,
        )?;
        let (mut catalog, _) = Catalog::open(LibraryStore::new(&path));
        let id = catalog.sorted()[0].id();

        let mut edited = GameForm::from_record(catalog.get(id).expect("record"));
        edited.platform = "GoG".to_string();
        let committed = catalog.submit(FormTarget::Edit(id), &edited)?;
        assert!(!committed.created);
        assert_eq!(committed.id, id);
        assert_eq!(catalog.len(), 1);

        let raw = fs::read_to_string(&path)?;
        assert!(raw.contains("\"playtime\": 12"));
        assert!(raw.contains("\"platform\": \"GoG\""));
        Ok(())
    }

    #[test]
    fn incomplete_stored_entries_are_not_lost_on_submit() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LIBRARY_FILE_NAME);
        fs::write(
            &path,
            r#"[{"name": "Portal 2", "platform": "Steam"}, {"name": "Half-Life", "launchPath": "C:\\hl.exe"}]"#,
        )?;
        let (mut catalog, summary) = Catalog::open(LibraryStore::new(&path));
        assert_eq!(summary.skipped, 1);
        assert_eq!(catalog.len(), 1);

        let committed = catalog.submit(FormTarget::New, &form("Hades", "Steam"))?;
        assert!(committed.persist_error.is_none());

        let raw = fs::read_to_string(&path)?;
        assert!(raw.contains("\"Half-Life\""));
        assert!(raw.contains("\"Hades\""));
        assert!(raw.contains("\"Portal 2\""));
        Ok(())
    }

    #[test]
    fn remove_and_unknown_ids() -> Result<()> {
        let dir = tempdir()?;
        let (mut catalog, _) = Catalog::open(LibraryStore::new(dir.path().join("lib.json")));
        let first = catalog.submit(FormTarget::New, &form("Limbo", "Steam"))?.id;
        catalog.submit(FormTarget::New, &form("Inside", "Steam"))?;

        let removed = catalog.remove(first)?;
        assert_eq!(removed.record.name, "Limbo");
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.remove(first).err(),
            Some(RecordError::Unknown(first))
        );
        assert_eq!(
            catalog.submit(FormTarget::Edit(first), &form("Limbo", "GoG")).err(),
            Some(RecordError::Unknown(first))
        );
        assert_eq!(catalog.reload().records, 1);
        Ok(())
    }

    #[test]
    fn persist_failure_keeps_change_in_memory() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(LIBRARY_FILE_NAME);
        fs::create_dir_all(&path)?;
        let (mut catalog, summary) = Catalog::open(LibraryStore::new(&path));
        assert!(matches!(summary.notice, Some(StoreError::Read { .. })));

        let committed = catalog.submit(FormTarget::New, &form("Celeste", "Local Install"))?;
        assert!(matches!(
            committed.persist_error,
            Some(StoreError::Write { .. })
        ));
        assert_eq!(catalog.len(), 1);
        Ok(())
    }
}
