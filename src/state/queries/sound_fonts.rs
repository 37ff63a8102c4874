// Sound font queries - import, lookup, editing and removal
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use uuid::Uuid;

use super::configs::insert_audio_config_in;
use super::presets::insert_preset_in;
use super::tags::tag_with_ubiquitous_in;
use super::{timestamp_column, uuid_column};
use crate::engine::{BuiltinSoundFont, ResourceLocator, SoundFontInfo, SoundFontLoader};
use crate::state::db::{DbConnection, DbError, DbResult};
use crate::state::models::{
    AudioConfig, ConfigOwner, ElementCounts, Location, LocationKind, Preset, SoundFont,
};
use crate::state::storage::remove_installed_file;

pub(crate) const SOUND_FONT_COLUMNS: &str = "sf.id, sf.location_kind, sf.location_path,
    sf.location_bookmark, sf.display_name, sf.original_name, sf.embedded_name,
    sf.embedded_author, sf.embedded_comment, sf.embedded_copyright, sf.notes, sf.visible,
    sf.added_at";

pub(crate) fn sound_font_from_row(row: &Row<'_>) -> rusqlite::Result<SoundFont> {
    let kind: String = row.get(1)?;
    let kind = LocationKind::from_string(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("unknown location kind {}", kind).into(),
        )
    })?;

    Ok(SoundFont {
        id: uuid_column(row, 0)?,
        location: Location {
            kind,
            path: row.get(2)?,
            bookmark: row.get(3)?,
        },
        display_name: row.get(4)?,
        original_name: row.get(5)?,
        embedded_name: row.get(6)?,
        embedded_author: row.get(7)?,
        embedded_comment: row.get(8)?,
        embedded_copyright: row.get(9)?,
        notes: row.get(10)?,
        visible: row.get(11)?,
        added_at: timestamp_column(row, 12)?,
    })
}

fn sound_font_in(conn: &Connection, id: &Uuid) -> DbResult<Option<SoundFont>> {
    let sql = format!("SELECT {} FROM sound_fonts sf WHERE sf.id = ?1", SOUND_FONT_COLUMNS);
    let result = conn.query_row(&sql, [id.to_string()], sound_font_from_row);

    match result {
        Ok(sound_font) => Ok(Some(sound_font)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn sound_font_at_in(conn: &Connection, location: &Location) -> DbResult<Option<SoundFont>> {
    let sql = format!(
        "SELECT {} FROM sound_fonts sf WHERE sf.location_kind = ?1 AND sf.location_path = ?2",
        SOUND_FONT_COLUMNS
    );
    let sound_font = conn
        .query_row(
            &sql,
            params![location.kind.to_string(), location.path],
            sound_font_from_row,
        )
        .optional()?;
    Ok(sound_font)
}

// ==================== IMPORT ====================

/// Add a sound font with its presets, stock configs and system tags
///
/// Everything is written in one transaction. Presets are indexed in the order the
/// descriptors are given.
pub fn add_sound_font(
    db: &DbConnection,
    name: &str,
    location: Location,
    info: &SoundFontInfo,
) -> DbResult<SoundFont> {
    let sound_font = SoundFont {
        id: Uuid::new_v4(),
        location,
        display_name: name.to_string(),
        original_name: name.to_string(),
        embedded_name: info.embedded_name.clone(),
        embedded_author: info.embedded_author.clone(),
        embedded_comment: info.embedded_comment.clone(),
        embedded_copyright: info.embedded_copyright.clone(),
        notes: String::new(),
        visible: true,
        added_at: Utc::now(),
    };

    db.write(|tx| {
        tx.execute(
            "INSERT INTO sound_fonts (id, location_kind, location_path, location_bookmark,
                display_name, original_name, embedded_name, embedded_author, embedded_comment,
                embedded_copyright, notes, visible, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                sound_font.id.to_string(),
                sound_font.location.kind.to_string(),
                sound_font.location.path,
                sound_font.location.bookmark,
                sound_font.display_name,
                sound_font.original_name,
                sound_font.embedded_name,
                sound_font.embedded_author,
                sound_font.embedded_comment,
                sound_font.embedded_copyright,
                sound_font.notes,
                sound_font.visible,
                sound_font.added_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            DbError::from_constraint(e, || {
                format!("sound font at {}", sound_font.location.path)
            })
        })?;

        for (index, descriptor) in info.presets.iter().enumerate() {
            let preset = Preset {
                id: Uuid::new_v4(),
                sound_font_id: sound_font.id,
                index: index as i32,
                bank: descriptor.bank,
                program: descriptor.program,
                original_name: descriptor.name.clone(),
                display_name: descriptor.name.clone(),
                visible: true,
                notes: String::new(),
            };
            insert_preset_in(tx, &preset)?;
            insert_audio_config_in(tx, &AudioConfig::new(ConfigOwner::Preset(preset.id)))?;
        }

        tag_with_ubiquitous_in(tx, &sound_font.id, &sound_font.location.ubiquitous_tags())?;
        Ok(())
    })?;

    log::info!(
        "Added sound font {} with {} presets",
        sound_font.display_name,
        info.presets.len()
    );
    Ok(sound_font)
}

/// Read a sound font file through the engine and add it to the catalog
pub fn import_sound_font(
    db: &DbConnection,
    loader: &dyn SoundFontLoader,
    name: &str,
    location: Location,
) -> DbResult<SoundFont> {
    let info = loader
        .load(Path::new(&location.path))
        .map_err(|e| DbError::LoadFailure {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    add_sound_font(db, name, location, &info)
}

/// Add whichever bundled sound fonts are not catalogued yet
///
/// Returns the newly added entries. A bundled file the locator cannot find is
/// skipped with a warning.
pub fn install_builtin_sound_fonts(
    db: &DbConnection,
    loader: &dyn SoundFontLoader,
    locator: &dyn ResourceLocator,
) -> DbResult<Vec<SoundFont>> {
    let mut added = Vec::new();

    for builtin in BuiltinSoundFont::ALL {
        let location = Location::builtin(builtin.resource_name());
        if find_sound_font_by_location(db, &location)?.is_some() {
            continue;
        }

        let Some(path) = locator.locate(builtin.resource_name()) else {
            log::warn!("Bundled sound font {} not found", builtin.resource_name());
            continue;
        };

        let info = match loader.load(&path) {
            Ok(info) => info,
            Err(e) => {
                log::warn!(
                    "Bundled sound font {} could not be loaded: {}",
                    builtin.resource_name(),
                    e
                );
                continue;
            }
        };
        added.push(add_sound_font(db, builtin.display_name(), location, &info)?);
    }

    Ok(added)
}

// ==================== SOUND FONT QUERIES ====================

/// Get a sound font by ID
pub fn get_sound_font(db: &DbConnection, id: &Uuid) -> DbResult<Option<SoundFont>> {
    let conn = db.lock();
    sound_font_in(&conn, id)
}

pub fn find_sound_font_by_location(
    db: &DbConnection,
    location: &Location,
) -> DbResult<Option<SoundFont>> {
    let conn = db.lock();
    sound_font_at_in(&conn, location)
}

/// All sound fonts ordered by display name
pub fn list_sound_fonts(db: &DbConnection) -> DbResult<Vec<SoundFont>> {
    let conn = db.lock();
    let sql = format!(
        "SELECT {} FROM sound_fonts sf ORDER BY sf.display_name, sf.added_at",
        SOUND_FONT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let sound_fonts = stmt
        .query_map([], sound_font_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sound_fonts)
}

fn update_sound_font_column(
    db: &DbConnection,
    id: &Uuid,
    column: &str,
    value: &dyn rusqlite::ToSql,
) -> DbResult<()> {
    let sql = format!("UPDATE sound_fonts SET {} = ?1 WHERE id = ?2", column);
    db.write(|tx| {
        let updated = tx.execute(&sql, params![value, id.to_string()])?;
        if updated == 0 {
            return Err(DbError::not_found("sound font", id));
        }
        Ok(())
    })
}

pub fn rename_sound_font(db: &DbConnection, id: &Uuid, name: &str) -> DbResult<()> {
    update_sound_font_column(db, id, "display_name", &name)
}

pub fn set_sound_font_notes(db: &DbConnection, id: &Uuid, notes: &str) -> DbResult<()> {
    update_sound_font_column(db, id, "notes", &notes)
}

pub fn set_sound_font_visible(db: &DbConnection, id: &Uuid, visible: bool) -> DbResult<()> {
    update_sound_font_column(db, id, "visible", &visible)
}

/// Visible presets, hidden presets and favorites of a sound font
pub fn element_counts(db: &DbConnection, id: &Uuid) -> DbResult<ElementCounts> {
    let conn = db.lock();
    if sound_font_in(&conn, id)?.is_none() {
        return Err(DbError::not_found("sound font", id));
    }

    let (visible_presets, hidden_presets) = conn.query_row(
        "SELECT COALESCE(SUM(visible), 0), COALESCE(SUM(1 - visible), 0)
         FROM presets WHERE sound_font_id = ?1",
        [id.to_string()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    let favorites = conn.query_row(
        "SELECT COUNT(*) FROM favorites f
         JOIN presets p ON f.preset_id = p.id
         WHERE p.sound_font_id = ?1",
        [id.to_string()],
        |row| row.get(0),
    )?;

    Ok(ElementCounts {
        visible_presets,
        hidden_presets,
        favorites,
    })
}

// ==================== REMOVAL ====================

/// Delete a sound font with its presets, favorites, configs and tag memberships
///
/// Tags stay. The deleted row is returned so the caller can deal with the file.
pub fn delete_sound_font(db: &DbConnection, id: &Uuid) -> DbResult<SoundFont> {
    let sound_font = db.write(|tx| {
        let sound_font = sound_font_in(tx, id)?.ok_or_else(|| DbError::not_found("sound font", id))?;

        tx.execute(
            "DELETE FROM tagged_sound_fonts WHERE sound_font_id = ?1",
            [id.to_string()],
        )?;
        tx.execute("DELETE FROM sound_fonts WHERE id = ?1", [id.to_string()])?;
        Ok(sound_font)
    })?;

    log::info!("Deleted sound font {} ({})", sound_font.display_name, sound_font.id);
    Ok(sound_font)
}

/// Delete a sound font and, when the app owns its file, the file too
pub fn remove_sound_font(db: &DbConnection, id: &Uuid) -> DbResult<SoundFont> {
    let sound_font = delete_sound_font(db, id)?;
    if sound_font.location.delete_when_removed() {
        remove_installed_file(Path::new(&sound_font.location.path))?;
    }
    Ok(sound_font)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LoadError;
    use crate::state::models::Ubiquitous;
    use crate::state::queries::configs::audio_config_for;
    use crate::state::queries::presets::{
        create_favorite, favorites_for_preset, presets_for_sound_font, set_preset_visible,
    };
    use crate::state::queries::tags::{sound_fonts_tagged, tags_for_sound_font};
    use crate::state::queries::test_support::{db, info, installed};
    use std::path::PathBuf;

    struct FakeLoader;

    impl SoundFontLoader for FakeLoader {
        fn load(&self, path: &Path) -> Result<SoundFontInfo, LoadError> {
            if path.to_string_lossy().contains("broken") {
                return Err(LoadError::NotLoadable(path.display().to_string()));
            }
            Ok(info(&["Piano", "Strings"]))
        }
    }

    struct FakeLocator {
        missing: Option<&'static str>,
        broken: Option<&'static str>,
    }

    impl ResourceLocator for FakeLocator {
        fn locate(&self, name: &str) -> Option<PathBuf> {
            if self.missing == Some(name) {
                return None;
            }
            if self.broken == Some(name) {
                return Some(PathBuf::from(format!("/bundle/broken/{}.sf2", name)));
            }
            Some(PathBuf::from(format!("/bundle/{}.sf2", name)))
        }
    }

    #[test]
    fn test_add_sound_font() {
        let db = db();
        let sound_font = installed(&db, "Piano", &["Grand", "Upright", "Honky"]);

        let fetched = get_sound_font(&db, &sound_font.id).unwrap().unwrap();
        assert_eq!(fetched.display_name, "Piano");
        assert_eq!(fetched.original_name, "Piano");
        assert_eq!(fetched.embedded_author, "author");
        assert_eq!(fetched.location, sound_font.location);
        assert!(fetched.visible);

        let presets = presets_for_sound_font(&db, &sound_font.id, true).unwrap();
        let indices: Vec<i32> = presets.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(presets[1].original_name, "Upright");

        for preset in &presets {
            let config = audio_config_for(&db, ConfigOwner::Preset(preset.id))
                .unwrap()
                .unwrap();
            assert_eq!(config.gain, 1.0);
            assert!(config.overrides.is_empty());
        }
    }

    #[test]
    fn test_duplicate_location_rejected() {
        let db = db();
        installed(&db, "Piano", &["Grand"]);

        let result = add_sound_font(
            &db,
            "Piano again",
            Location::installed("/sf2/Piano.sf2"),
            &info(&["Grand"]),
        );
        assert!(matches!(result, Err(DbError::Duplicate(_))));
        assert_eq!(list_sound_fonts(&db).unwrap().len(), 1);
    }

    #[test]
    fn test_ubiquitous_tags_follow_location() {
        let db = db();
        let bookmarked = add_sound_font(
            &db,
            "Outside",
            Location::bookmark("/elsewhere/Outside.sf2", vec![1, 2, 3]),
            &info(&["One"]),
        )
        .unwrap();
        let builtin = add_sound_font(
            &db,
            "Bundled",
            Location::builtin("Bundled"),
            &info(&["One"]),
        )
        .unwrap();

        let names = |id: &Uuid| -> Vec<String> {
            tags_for_sound_font(&db, id)
                .unwrap()
                .into_iter()
                .map(|t| t.name)
                .collect()
        };
        assert_eq!(names(&bookmarked.id), vec!["All", "Added", "External"]);
        assert_eq!(names(&builtin.id), vec!["All", "Built-in"]);
        assert_eq!(
            get_sound_font(&db, &bookmarked.id)
                .unwrap()
                .unwrap()
                .location
                .bookmark,
            Some(vec![1, 2, 3])
        );
        assert_eq!(sound_fonts_tagged(&db, &Ubiquitous::All.id()).unwrap().len(), 2);
    }

    #[test]
    fn test_import_reports_load_failure() {
        let db = db();
        let result = import_sound_font(
            &db,
            &FakeLoader,
            "Broken",
            Location::installed("/sf2/broken.sf2"),
        );
        assert!(matches!(result, Err(DbError::LoadFailure { .. })));
        assert!(list_sound_fonts(&db).unwrap().is_empty());

        let imported = import_sound_font(
            &db,
            &FakeLoader,
            "Fine",
            Location::installed("/sf2/fine.sf2"),
        )
        .unwrap();
        assert_eq!(
            presets_for_sound_font(&db, &imported.id, true).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_install_builtins_is_idempotent() {
        let db = db();
        let locator = FakeLocator {
            missing: None,
            broken: None,
        };

        let added = install_builtin_sound_fonts(&db, &FakeLoader, &locator).unwrap();
        let names: Vec<&str> = added.iter().map(|sf| sf.display_name.as_str()).collect();
        assert_eq!(names, vec!["FreeFont", "MuseScore", "Roland Piano"]);

        let again = install_builtin_sound_fonts(&db, &FakeLoader, &locator).unwrap();
        assert!(again.is_empty());
        assert_eq!(list_sound_fonts(&db).unwrap().len(), 3);
        assert_eq!(
            sound_fonts_tagged(&db, &Ubiquitous::BuiltIn.id()).unwrap().len(),
            3
        );
    }

    #[test]
    fn test_install_builtins_skips_missing_resource() {
        let db = db();
        let locator = FakeLocator {
            missing: Some("FreeFont"),
            broken: None,
        };
        let added = install_builtin_sound_fonts(&db, &FakeLoader, &locator).unwrap();
        assert_eq!(added.len(), 2);
    }

    #[test]
    fn test_install_builtins_skips_unloadable_resource() {
        let db = db();
        let locator = FakeLocator {
            missing: None,
            broken: Some("RolandNicePiano"),
        };
        let added = install_builtin_sound_fonts(&db, &FakeLoader, &locator).unwrap();
        assert_eq!(added.len(), 2);
        assert!(added
            .iter()
            .all(|sound_font| sound_font.location.path != "RolandNicePiano"));

        // Once the file loads again, the next start picks it up
        let fixed = FakeLocator {
            missing: None,
            broken: None,
        };
        let added = install_builtin_sound_fonts(&db, &FakeLoader, &fixed).unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].location.path, "RolandNicePiano");
    }

    #[test]
    fn test_edit_sound_font() {
        let db = db();
        let sound_font = installed(&db, "Piano", &["Grand"]);

        rename_sound_font(&db, &sound_font.id, "My Piano").unwrap();
        set_sound_font_notes(&db, &sound_font.id, "bright").unwrap();
        set_sound_font_visible(&db, &sound_font.id, false).unwrap();

        let fetched = get_sound_font(&db, &sound_font.id).unwrap().unwrap();
        assert_eq!(fetched.display_name, "My Piano");
        assert_eq!(fetched.original_name, "Piano");
        assert_eq!(fetched.notes, "bright");
        assert!(!fetched.visible);

        assert!(rename_sound_font(&db, &Uuid::new_v4(), "Ghost")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_element_counts() {
        let db = db();
        let sound_font = installed(&db, "Piano", &["Grand", "Upright", "Honky"]);
        let presets = presets_for_sound_font(&db, &sound_font.id, true).unwrap();
        set_preset_visible(&db, &presets[2].id, false).unwrap();
        create_favorite(&db, &presets[0].id).unwrap();
        create_favorite(&db, &presets[0].id).unwrap();

        let counts = element_counts(&db, &sound_font.id).unwrap();
        assert_eq!(
            counts,
            ElementCounts {
                visible_presets: 2,
                hidden_presets: 1,
                favorites: 2,
            }
        );
    }

    #[test]
    fn test_delete_cascades() {
        let db = db();
        let sound_font = installed(&db, "Piano", &["Grand", "Upright"]);
        let other = installed(&db, "Organ", &["Church"]);
        let presets = presets_for_sound_font(&db, &sound_font.id, true).unwrap();
        let favorite = create_favorite(&db, &presets[0].id).unwrap();

        let deleted = delete_sound_font(&db, &sound_font.id).unwrap();
        assert_eq!(deleted.id, sound_font.id);

        assert!(get_sound_font(&db, &sound_font.id).unwrap().is_none());
        assert!(presets_for_sound_font(&db, &sound_font.id, true)
            .unwrap()
            .is_empty());
        assert!(favorites_for_preset(&db, &presets[0].id).unwrap().is_empty());
        assert!(audio_config_for(&db, ConfigOwner::Favorite(favorite.id))
            .unwrap()
            .is_none());
        assert!(audio_config_for(&db, ConfigOwner::Preset(presets[1].id))
            .unwrap()
            .is_none());

        let conn = db.lock();
        let configs: i64 = conn
            .query_row("SELECT COUNT(*) FROM audio_configs", [], |row| row.get(0))
            .unwrap();
        let tags: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        drop(conn);
        assert_eq!(configs, 1);
        assert_eq!(tags, 4);
        assert!(get_sound_font(&db, &other.id).unwrap().is_some());

        assert!(delete_sound_font(&db, &sound_font.id)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_remove_deletes_installed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("Piano.sf2");
        std::fs::write(&file, b"RIFF").unwrap();

        let db = db();
        let sound_font = add_sound_font(
            &db,
            "Piano",
            Location::installed(file.to_string_lossy().to_string()),
            &info(&["Grand"]),
        )
        .unwrap();
        remove_sound_font(&db, &sound_font.id).unwrap();
        assert!(!file.exists());

        let external = dir.path().join("Outside.sf2");
        std::fs::write(&external, b"RIFF").unwrap();
        let sound_font = add_sound_font(
            &db,
            "Outside",
            Location::bookmark(external.to_string_lossy().to_string(), Vec::new()),
            &info(&["Grand"]),
        )
        .unwrap();
        remove_sound_font(&db, &sound_font.id).unwrap();
        assert!(external.exists());
    }
}
