// File system layout for the catalog database, active state and installed files
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR_NAME: &str = "com.soundfonts.app";
const DATABASE_FILE_NAME: &str = "catalog.db";
const ACTIVE_STATE_FILE_NAME: &str = "active_state.json";
const INSTALLED_DIR_NAME: &str = "SoundFonts";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to get app data directory")]
    NoAppDataDir,
    #[error("Not a file name: {0}")]
    InvalidFileName(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Where the catalog keeps its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    /// Layout rooted at an explicit directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout inside the platform's application data directory
    pub fn from_app_data_dir() -> StorageResult<Self> {
        let data_dir = dirs::data_dir().ok_or(StorageError::NoAppDataDir)?;
        let root = data_dir.join(APP_DIR_NAME);
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE_NAME)
    }

    pub fn active_state_path(&self) -> PathBuf {
        self.root.join(ACTIVE_STATE_FILE_NAME)
    }

    /// Directory holding sound font files copied into the app
    pub fn installed_dir(&self) -> StorageResult<PathBuf> {
        let dir = self.root.join(INSTALLED_DIR_NAME);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Copy a sound font file into the installed directory and return its new path
///
/// A file already installed under the same name is kept as is.
pub fn install_file(paths: &StoragePaths, source: &Path) -> StorageResult<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| StorageError::InvalidFileName(source.display().to_string()))?;
    let destination = paths.installed_dir()?.join(file_name);

    if destination.exists() {
        log::info!("{} already installed", destination.display());
    } else {
        fs::copy(source, &destination)?;
        log::info!("Installed {}", destination.display());
    }

    Ok(destination)
}

/// Delete an installed file; a file that is already gone is not an error
pub fn remove_installed_file(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Installed file {} was already removed", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Display name for a file: its name without the extension
pub fn display_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}
