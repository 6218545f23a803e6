//! Shared domain models.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Platforms offered by the add/edit form unless the configuration overrides them.
pub const DEFAULT_PLATFORMS: &[&str] = &[
    "Steam",
    "Epic Games",
    "GoG",
    "Origin/EA App",
    "Ubisoft Connect",
    "Battle.net",
    "Xbox App",
    "Local Install",
    "Other",
];

/// Identifier of a record within one running session.
///
/// Ids are handed out by [`crate::store::Library`] and never written to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One catalogued game as stored in the backing file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(skip)]
    id: RecordId,
    /// Display name, never empty for records held by a library.
    #[serde(default)]
    pub name: String,
    /// Storefront or install source, never empty for records held by a library.
    #[serde(default)]
    pub platform: String,
    /// Executable path or launcher URI (`steam://…`, `epicgames://…`).
    #[serde(rename = "launchPath", default)]
    pub launch_path: String,
    /// Cover image URL, kept for reference only.
    #[serde(default)]
    pub image: String,
    /// Free-form, possibly multi-line notes.
    #[serde(default)]
    pub description: String,
    /// ISO-8601 instant of the last save.
    #[serde(default)]
    pub timestamp: String,
    /// Keys this version does not know about, kept so that saving does not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameRecord {
    pub(crate) fn from_draft(id: RecordId, draft: GameDraft) -> Self {
        Self {
            id,
            name: draft.name,
            platform: draft.platform,
            launch_path: draft.launch_path,
            image: draft.image,
            description: draft.description,
            timestamp: now_timestamp(),
            extra: Map::new(),
        }
    }

    /// Session identifier of this record.
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    /// Check the required fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.name, &self.platform)
    }

    /// Parse the stored timestamp.
    ///
    /// Accepts RFC 3339 instants as well as the offset-less local timestamps
    /// written by older versions of the library file.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    pub(crate) fn apply(&mut self, patch: RecordPatch) {
        let RecordPatch {
            name,
            platform,
            launch_path,
            image,
            description,
        } = patch;
        if let Some(value) = name {
            self.name = value;
        }
        if let Some(value) = platform {
            self.platform = value;
        }
        if let Some(value) = launch_path {
            self.launch_path = value;
        }
        if let Some(value) = image {
            self.image = value;
        }
        if let Some(value) = description {
            self.description = value;
        }
        self.timestamp = now_timestamp();
    }
}

/// Raw form payload handed over by a frontend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameForm {
    /// Name input.
    pub name: String,
    /// Platform selection.
    pub platform: String,
    /// Launch path or URI input.
    pub launch_path: String,
    /// Image URL input.
    pub image: String,
    /// Description input.
    pub description: String,
}

impl GameForm {
    /// Prefill a form from an existing record.
    pub fn from_record(record: &GameRecord) -> Self {
        Self {
            name: record.name.clone(),
            platform: record.platform.clone(),
            launch_path: record.launch_path.clone(),
            image: record.image.clone(),
            description: record.description.clone(),
        }
    }

    /// Trim every field and check the required ones.
    pub fn validate(&self) -> Result<GameDraft, ValidationError> {
        let draft = GameDraft {
            name: self.name.trim().to_string(),
            platform: self.platform.trim().to_string(),
            launch_path: self.launch_path.trim().to_string(),
            image: self.image.trim().to_string(),
            description: self.description.trim().to_string(),
        };
        require(&draft.name, &draft.platform)?;
        Ok(draft)
    }
}

/// A validated, trimmed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDraft {
    name: String,
    platform: String,
    launch_path: String,
    image: String,
    description: String,
}

impl GameDraft {
    /// Name of the game the draft describes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Turn the draft into a patch overwriting every editable field.
    pub fn into_patch(self) -> RecordPatch {
        RecordPatch {
            name: Some(self.name),
            platform: Some(self.platform),
            launch_path: Some(self.launch_path),
            image: Some(self.image),
            description: Some(self.description),
        }
    }
}

/// Partial update of a record. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    /// New name.
    pub name: Option<String>,
    /// New platform.
    pub platform: Option<String>,
    /// New launch path.
    pub launch_path: Option<String>,
    /// New image URL.
    pub image: Option<String>,
    /// New description.
    pub description: Option<String>,
}

impl RecordPatch {
    /// Reject patches that would blank a required field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ValidationError::MissingName);
        }
        if matches!(&self.platform, Some(platform) if platform.trim().is_empty()) {
            return Err(ValidationError::MissingPlatform);
        }
        Ok(())
    }
}

fn require(name: &str, platform: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if platform.trim().is_empty() {
        return Err(ValidationError::MissingPlatform);
    }
    Ok(())
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_validation_trims_and_requires_fields() {
        let form = GameForm {
            name: "  Hades ".to_string(),
            platform: " Steam".to_string(),
            launch_path: " steam://rungameid/1145360 ".to_string(),
            ..GameForm::default()
        };
        let draft = form.validate().expect("valid form");
        assert_eq!(draft.name(), "Hades");
        let patch = draft.into_patch();
        assert_eq!(patch.launch_path.as_deref(), Some("steam://rungameid/1145360"));

        let missing_name = GameForm {
            name: "   ".to_string(),
            platform: "Steam".to_string(),
            ..GameForm::default()
        };
        assert_eq!(missing_name.validate(), Err(ValidationError::MissingName));

        let missing_platform = GameForm {
            name: "Hades".to_string(),
            ..GameForm::default()
        };
        assert_eq!(
            missing_platform.validate(),
            Err(ValidationError::MissingPlatform)
        );
    }

    #[test]
    fn patch_rejects_blank_required_fields() {
        let patch = RecordPatch {
            platform: Some(" ".to_string()),
            ..RecordPatch::default()
        };
        assert_eq!(patch.validate(), Err(ValidationError::MissingPlatform));
        assert!(RecordPatch::default().validate().is_ok());
    }

    #[test]
    fn record_uses_stored_key_names_and_keeps_unknown_keys() {
        let raw = json!({
            "name": "Celeste",
            "platform": "Local Install",
            "launchPath": "/games/celeste/Celeste",
            "timestamp": "2024-03-01T10:15:30.123456",
            "rating": 5
        });
        let record: GameRecord = serde_json::from_value(raw).expect("record");
        assert_eq!(record.launch_path, "/games/celeste/Celeste");
        assert_eq!(record.image, "");
        assert_eq!(record.extra.get("rating"), Some(&json!(5)));
        assert!(record.saved_at().is_some());

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["launchPath"], json!("/games/celeste/Celeste"));
        assert_eq!(value["rating"], json!(5));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn saved_at_reads_rfc3339() {
        let mut record = GameRecord::from_draft(
            RecordId::new(1),
            GameForm {
                name: "Outer Wilds".to_string(),
                platform: "Epic Games".to_string(),
                ..GameForm::default()
            }
            .validate()
            .expect("valid form"),
        );
        assert!(record.saved_at().is_some());
        record.timestamp = "2023-06-01T08:00:00Z".to_string();
        let parsed = record.saved_at().expect("timestamp");
        assert_eq!(parsed.to_rfc3339(), "2023-06-01T08:00:00+00:00");
        record.timestamp = "yesterday".to_string();
        assert!(record.saved_at().is_none());
    }
}
