// Data models for the sound font catalog
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::overrides::ZoneOverrides;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    /// Resource that ships with the application
    Builtin,
    /// File copied into the application's documents area
    Installed,
    /// File left where it was, referenced through bookmark data
    Bookmark,
}

impl LocationKind {
    pub fn to_string(&self) -> String {
        match self {
            LocationKind::Builtin => "builtin".to_string(),
            LocationKind::Installed => "installed".to_string(),
            LocationKind::Bookmark => "bookmark".to_string(),
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "builtin" => Some(LocationKind::Builtin),
            "installed" => Some(LocationKind::Installed),
            "bookmark" => Some(LocationKind::Bookmark),
            _ => None,
        }
    }
}

/// Where a sound font file lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub kind: LocationKind,
    pub path: String,
    pub bookmark: Option<Vec<u8>>,
}

impl Location {
    pub fn builtin(path: impl Into<String>) -> Self {
        Self {
            kind: LocationKind::Builtin,
            path: path.into(),
            bookmark: None,
        }
    }

    pub fn installed(path: impl Into<String>) -> Self {
        Self {
            kind: LocationKind::Installed,
            path: path.into(),
            bookmark: None,
        }
    }

    pub fn bookmark(path: impl Into<String>, bookmark: Vec<u8>) -> Self {
        Self {
            kind: LocationKind::Bookmark,
            path: path.into(),
            bookmark: Some(bookmark),
        }
    }

    /// System tags every sound font at this kind of location belongs to
    pub fn ubiquitous_tags(&self) -> Vec<Ubiquitous> {
        match self.kind {
            LocationKind::Builtin => vec![Ubiquitous::All, Ubiquitous::BuiltIn],
            LocationKind::Installed => vec![Ubiquitous::All, Ubiquitous::Added],
            LocationKind::Bookmark => {
                vec![Ubiquitous::All, Ubiquitous::Added, Ubiquitous::External]
            }
        }
    }

    /// Installed files are owned by the app and go away with their catalog entry
    pub fn delete_when_removed(&self) -> bool {
        self.kind == LocationKind::Installed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundFont {
    pub id: Uuid,
    pub location: Location,
    pub display_name: String,
    pub original_name: String,
    pub embedded_name: String,
    pub embedded_author: String,
    pub embedded_comment: String,
    pub embedded_copyright: String,
    pub notes: String,
    pub visible: bool,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub id: Uuid,
    pub sound_font_id: Uuid,
    pub index: i32,
    pub bank: i32,
    pub program: i32,
    pub original_name: String,
    pub display_name: String,
    pub visible: bool,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub preset_id: Uuid,
    pub display_name: String,
    pub notes: String,
}

/// The entity an audio config belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOwner {
    Preset(Uuid),
    Favorite(Uuid),
}

/// Per-preset or per-favorite tunable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub id: Uuid,
    pub owner: ConfigOwner,
    pub gain: f32,
    pub pan: f32,
    /// Override of the lowest keyboard note; only applied when enabled
    pub keyboard_lowest_note: Option<i32>,
    pub keyboard_lowest_note_enabled: bool,
    pub pitch_bend_range: Option<i32>,
    /// Tuning offset in cents
    pub preset_tuning: Option<f32>,
    pub preset_transpose: Option<i32>,
    pub overrides: ZoneOverrides,
}

impl AudioConfig {
    pub fn new(owner: ConfigOwner) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            gain: 1.0,
            pan: 0.0,
            keyboard_lowest_note: None,
            keyboard_lowest_note_enabled: false,
            pitch_bend_range: None,
            preset_tuning: None,
            preset_transpose: None,
            overrides: ZoneOverrides::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    pub time: f32,
    pub feedback: f32,
    pub cutoff: f32,
    pub wet_dry_mix: f32,
    pub enabled: bool,
}

impl Default for DelayConfig {
    fn default() -> Self {
        DelayConfig {
            time: 0.0,
            feedback: 0.0,
            cutoff: 0.0,
            wet_dry_mix: 0.5,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReverbConfig {
    /// Index of the room preset
    pub preset: i32,
    pub wet_dry_mix: f32,
    pub enabled: bool,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        ReverbConfig {
            preset: 0,
            wet_dry_mix: 0.5,
            enabled: true,
        }
    }
}

/// System tags that always exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ubiquitous {
    /// Every sound font
    All,
    /// Sound fonts shipped with the app
    BuiltIn,
    /// Sound fonts added by the user
    Added,
    /// Added sound fonts that live outside the app (subset of `Added`)
    External,
}

impl Ubiquitous {
    /// Canonical creation and display order
    pub const ALL: [Ubiquitous; 4] = [
        Ubiquitous::All,
        Ubiquitous::BuiltIn,
        Ubiquitous::Added,
        Ubiquitous::External,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Ubiquitous::All => "All",
            Ubiquitous::BuiltIn => "Built-in",
            Ubiquitous::Added => "Added",
            Ubiquitous::External => "External",
        }
    }

    /// Well-known id, identical in every catalog
    pub fn id(&self) -> Uuid {
        let ordinal = match self {
            Ubiquitous::All => 1,
            Ubiquitous::BuiltIn => 2,
            Ubiquitous::Added => 3,
            Ubiquitous::External => 4,
        };
        Uuid::from_u128(ordinal)
    }

    pub fn from_id(id: &Uuid) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.id() == *id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub ordering: i32,
}

impl Tag {
    pub fn is_ubiquitous(&self) -> bool {
        Ubiquitous::from_id(&self.id).is_some()
    }

    pub fn is_user_defined(&self) -> bool {
        !self.is_ubiquitous()
    }
}

/// Preset and favorite totals for one sound font
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCounts {
    pub visible_presets: i64,
    pub hidden_presets: i64,
    pub favorites: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetWithFavorites {
    pub preset: Preset,
    pub favorites: Vec<Favorite>,
}
