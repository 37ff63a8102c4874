// Audio engine and bundled resource collaborators
// The catalog only needs import-time metadata from the engine

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by a sound font loader
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not loadable: {0}")]
    NotLoadable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One preset descriptor as found in a sound font file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: String,
    pub bank: i32,
    pub program: i32,
}

/// Metadata embedded in a sound font file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundFontInfo {
    pub embedded_name: String,
    pub embedded_author: String,
    pub embedded_comment: String,
    pub embedded_copyright: String,
    /// Presets in file order; the position becomes the preset index
    pub presets: Vec<PresetInfo>,
}

/// Parses sound font files on behalf of the catalog
pub trait SoundFontLoader {
    fn load(&self, path: &Path) -> Result<SoundFontInfo, LoadError>;
}

/// Resolves canonical resource names to files
pub trait ResourceLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Looks for `<name>.sf2` inside a directory
#[derive(Debug, Clone)]
pub struct DirectoryLocator {
    root: PathBuf,
}

impl DirectoryLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceLocator for DirectoryLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        let path = self.root.join(format!("{}.sf2", name));
        path.is_file().then_some(path)
    }
}

/// Sound fonts that ship with the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinSoundFont {
    FreeFont,
    MuseScore,
    RolandNicePiano,
}

impl BuiltinSoundFont {
    pub const ALL: [BuiltinSoundFont; 3] = [
        BuiltinSoundFont::FreeFont,
        BuiltinSoundFont::MuseScore,
        BuiltinSoundFont::RolandNicePiano,
    ];

    /// Resource file name without the `.sf2` suffix
    pub fn resource_name(&self) -> &'static str {
        match self {
            BuiltinSoundFont::FreeFont => "FreeFont",
            BuiltinSoundFont::MuseScore => "GeneralUser GS MuseScore v1.442",
            BuiltinSoundFont::RolandNicePiano => "RolandNicePiano",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BuiltinSoundFont::FreeFont => "FreeFont",
            BuiltinSoundFont::MuseScore => "MuseScore",
            BuiltinSoundFont::RolandNicePiano => "Roland Piano",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|font| font.display_name() == name)
    }
}
