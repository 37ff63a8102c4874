// Active selection record, kept in a JSON document next to the catalog
// Ids may point at rows that no longer exist; lookups treat those as absent
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use super::db::{DbConnection, DbError, DbResult};
use super::models::{Preset, SoundFont, Tag, Ubiquitous};
use super::queries::presets::get_preset;
use super::queries::sound_fonts::get_sound_font;
use super::queries::tags::get_tag;
use super::storage::StoragePaths;

/// Shown when no preset is active
pub const NO_PRESET_NAME: &str = "-";

// Serializes every read-modify-write of the document in this process
static DOCUMENT_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveState {
    pub active_sound_font_id: Option<Uuid>,
    selected_sound_font_id: Option<Uuid>,
    pub active_preset_id: Option<Uuid>,
    pub active_tag_id: Option<Uuid>,
}

impl ActiveState {
    /// The browsed sound font, which is the active one unless the user picked another
    pub fn selected_sound_font_id(&self) -> Option<Uuid> {
        self.selected_sound_font_id.or(self.active_sound_font_id)
    }

    pub fn has_explicit_selection(&self) -> bool {
        self.selected_sound_font_id.is_some()
    }

    pub fn select_sound_font(&mut self, id: Option<Uuid>) {
        self.selected_sound_font_id = id;
    }

    /// Make a sound font active; the selection follows it again
    pub fn activate_sound_font(&mut self, id: Option<Uuid>) {
        self.active_sound_font_id = id;
        self.selected_sound_font_id = None;
    }

    pub fn activate_preset(&mut self, sound_font_id: Uuid, preset_id: Uuid) {
        self.activate_sound_font(Some(sound_font_id));
        self.active_preset_id = Some(preset_id);
    }

    pub fn set_active_tag(&mut self, id: Option<Uuid>) {
        self.active_tag_id = id;
    }

    /// Sound font whose presets are on display
    pub fn preset_source(&self) -> Option<Uuid> {
        self.selected_sound_font_id()
    }
}

/// Active state with every id looked up in the catalog
#[derive(Debug, Clone)]
pub struct ResolvedActiveState {
    pub active_sound_font: Option<SoundFont>,
    pub selected_sound_font: Option<SoundFont>,
    pub active_preset: Option<Preset>,
    pub active_tag: Tag,
}

/// Look up the records an active state refers to
///
/// Dangling ids resolve to `None`; a missing or dangling tag resolves to "All".
pub fn resolve(state: &ActiveState, db: &DbConnection) -> DbResult<ResolvedActiveState> {
    let lookup = |id: Option<Uuid>| -> DbResult<Option<SoundFont>> {
        match id {
            Some(id) => get_sound_font(db, &id),
            None => Ok(None),
        }
    };

    let active_sound_font = lookup(state.active_sound_font_id)?;
    let selected_sound_font = lookup(state.selected_sound_font_id())?;
    let active_preset = match state.active_preset_id {
        Some(id) => get_preset(db, &id)?,
        None => None,
    };

    let active_tag = match state.active_tag_id {
        Some(id) => get_tag(db, &id)?,
        None => None,
    };
    let active_tag = match active_tag {
        Some(tag) => tag,
        None => {
            let all = Ubiquitous::All.id();
            get_tag(db, &all)?.ok_or_else(|| DbError::not_found("tag", all))?
        }
    };

    Ok(ResolvedActiveState {
        active_sound_font,
        selected_sound_font,
        active_preset,
        active_tag,
    })
}

/// Display name of the active preset, "-" when there is none
pub fn active_preset_name(db: &DbConnection, state: &ActiveState) -> DbResult<String> {
    let preset = match state.active_preset_id {
        Some(id) => get_preset(db, &id)?,
        None => None,
    };
    Ok(preset
        .map(|preset| preset.display_name)
        .unwrap_or_else(|| NO_PRESET_NAME.to_string()))
}

/// Reads and writes the active state document
#[derive(Debug, Clone)]
pub struct ActiveStateStore {
    path: PathBuf,
}

impl ActiveStateStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_paths(paths: &StoragePaths) -> Self {
        Self::open(paths.active_state_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current state; a document that does not exist yet reads as the default
    pub fn load(&self) -> DbResult<ActiveState> {
        let _guard = lock_document();
        self.read()
    }

    /// Read, change and write back the state as one step
    pub fn update(&self, change: impl FnOnce(&mut ActiveState)) -> DbResult<ActiveState> {
        let _guard = lock_document();
        let mut state = self.read()?;
        change(&mut state);
        self.write(&state)?;
        Ok(state)
    }

    fn read(&self) -> DbResult<ActiveState> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ActiveState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, state: &ActiveState) -> DbResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)?;
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        log::debug!("Saved active state to {}", self.path.display());
        Ok(())
    }
}

fn lock_document() -> std::sync::MutexGuard<'static, ()> {
    DOCUMENT_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
