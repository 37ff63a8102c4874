// Sound font catalog - library, presets, favorites, tags and tuning
// Module declarations

pub mod engine;
pub mod state;
pub mod tuning;

pub use state::{init_db, ActiveStateStore, DbConnection, DbError, DbResult, StoragePaths};

use engine::{ResourceLocator, SoundFontLoader};

/// Everything the app needs once startup has finished
#[derive(Debug, Clone)]
pub struct Catalog {
    pub db: DbConnection,
    pub active: ActiveStateStore,
    pub paths: StoragePaths,
}

impl Catalog {
    /// Open the catalog: migrate the database, then make sure the bundled sound fonts
    /// are present. Nothing else may touch the store before this returns.
    pub fn open(
        paths: StoragePaths,
        loader: &dyn SoundFontLoader,
        locator: &dyn ResourceLocator,
    ) -> DbResult<Self> {
        let db = init_db(&paths).map_err(|e| {
            log::error!("Failed to initialize database: {}", e);
            e
        })?;

        let added = state::install_builtin_sound_fonts(&db, loader, locator)?;
        if !added.is_empty() {
            log::info!("Installed {} bundled sound fonts", added.len());
        }

        let active = ActiveStateStore::from_paths(&paths);
        log::info!("Catalog ready at {}", paths.root().display());
        Ok(Self { db, active, paths })
    }
}
