// Preset and favorite queries
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::configs::duplicate_config_in;
use super::uuid_column;
use crate::state::db::{DbConnection, DbError, DbResult};
use crate::state::models::{ConfigOwner, Favorite, Preset, PresetWithFavorites};

const PRESET_COLUMNS: &str =
    "id, sound_font_id, preset_index, bank, program, original_name, display_name, visible, notes";

fn preset_from_row(row: &Row<'_>) -> rusqlite::Result<Preset> {
    Ok(Preset {
        id: uuid_column(row, 0)?,
        sound_font_id: uuid_column(row, 1)?,
        index: row.get(2)?,
        bank: row.get(3)?,
        program: row.get(4)?,
        original_name: row.get(5)?,
        display_name: row.get(6)?,
        visible: row.get(7)?,
        notes: row.get(8)?,
    })
}

fn favorite_from_row(row: &Row<'_>) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        id: uuid_column(row, 0)?,
        preset_id: uuid_column(row, 1)?,
        display_name: row.get(2)?,
        notes: row.get(3)?,
    })
}

pub(crate) fn insert_preset_in(conn: &Connection, preset: &Preset) -> DbResult<()> {
    conn.execute(
        "INSERT INTO presets (id, sound_font_id, preset_index, bank, program, original_name,
            display_name, visible, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            preset.id.to_string(),
            preset.sound_font_id.to_string(),
            preset.index,
            preset.bank,
            preset.program,
            preset.original_name,
            preset.display_name,
            preset.visible,
            preset.notes,
        ],
    )
    .map_err(|e| DbError::from_constraint(e, || format!("preset index {}", preset.index)))?;
    Ok(())
}

fn preset_in(conn: &Connection, id: &Uuid) -> DbResult<Option<Preset>> {
    let sql = format!("SELECT {} FROM presets WHERE id = ?1", PRESET_COLUMNS);
    let preset = conn
        .query_row(&sql, [id.to_string()], preset_from_row)
        .optional()?;
    Ok(preset)
}

fn favorites_in(conn: &Connection, preset_id: &Uuid) -> DbResult<Vec<Favorite>> {
    let mut stmt = conn.prepare(
        "SELECT id, preset_id, display_name, notes
         FROM favorites WHERE preset_id = ?1
         ORDER BY rowid",
    )?;
    let favorites = stmt
        .query_map([preset_id.to_string()], favorite_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(favorites)
}

fn update_column(
    db: &DbConnection,
    table: &str,
    entity: &'static str,
    id: &Uuid,
    column: &str,
    value: &dyn rusqlite::ToSql,
) -> DbResult<()> {
    let sql = format!("UPDATE {} SET {} = ?1 WHERE id = ?2", table, column);
    db.write(|tx| {
        let updated = tx.execute(&sql, params![value, id.to_string()])?;
        if updated == 0 {
            return Err(DbError::not_found(entity, id));
        }
        Ok(())
    })
}

// ==================== PRESET QUERIES ====================

/// Presets of a sound font in index order
pub fn presets_for_sound_font(
    db: &DbConnection,
    sound_font_id: &Uuid,
    include_hidden: bool,
) -> DbResult<Vec<Preset>> {
    let conn = db.lock();
    let sql = format!(
        "SELECT {} FROM presets
         WHERE sound_font_id = ?1 AND (?2 OR visible)
         ORDER BY preset_index",
        PRESET_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let presets = stmt
        .query_map(params![sound_font_id.to_string(), include_hidden], preset_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(presets)
}

/// Get a preset by ID
pub fn get_preset(db: &DbConnection, id: &Uuid) -> DbResult<Option<Preset>> {
    let conn = db.lock();
    preset_in(&conn, id)
}

/// Get a preset together with its favorites
pub fn get_preset_with_favorites(
    db: &DbConnection,
    id: &Uuid,
) -> DbResult<Option<PresetWithFavorites>> {
    let conn = db.lock();
    let Some(preset) = preset_in(&conn, id)? else {
        return Ok(None);
    };
    let favorites = favorites_in(&conn, id)?;
    Ok(Some(PresetWithFavorites { preset, favorites }))
}

pub fn rename_preset(db: &DbConnection, id: &Uuid, name: &str) -> DbResult<()> {
    update_column(db, "presets", "preset", id, "display_name", &name)
}

pub fn set_preset_visible(db: &DbConnection, id: &Uuid, visible: bool) -> DbResult<()> {
    update_column(db, "presets", "preset", id, "visible", &visible)
}

pub fn set_preset_notes(db: &DbConnection, id: &Uuid, notes: &str) -> DbResult<()> {
    update_column(db, "presets", "preset", id, "notes", &notes)
}

// ==================== FAVORITE QUERIES ====================

/// Create a favorite of a preset, starting from a copy of the preset's config
///
/// Favorites are named "<preset name> - N", N counting from 1 per preset.
pub fn create_favorite(db: &DbConnection, preset_id: &Uuid) -> DbResult<Favorite> {
    let favorite = db.write(|tx| {
        let preset = preset_in(tx, preset_id)?.ok_or_else(|| DbError::not_found("preset", preset_id))?;
        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM favorites WHERE preset_id = ?1",
            [preset_id.to_string()],
            |row| row.get(0),
        )?;

        let favorite = Favorite {
            id: Uuid::new_v4(),
            preset_id: preset.id,
            display_name: format!("{} - {}", preset.display_name, existing + 1),
            notes: String::new(),
        };
        tx.execute(
            "INSERT INTO favorites (id, preset_id, display_name, notes) VALUES (?1, ?2, ?3, ?4)",
            params![
                favorite.id.to_string(),
                favorite.preset_id.to_string(),
                favorite.display_name,
                favorite.notes,
            ],
        )?;

        duplicate_config_in(
            tx,
            ConfigOwner::Preset(preset.id),
            ConfigOwner::Favorite(favorite.id),
        )?;
        Ok(favorite)
    })?;

    log::debug!("Created favorite {} ({})", favorite.display_name, favorite.id);
    Ok(favorite)
}

/// Favorites of a preset in creation order
pub fn favorites_for_preset(db: &DbConnection, preset_id: &Uuid) -> DbResult<Vec<Favorite>> {
    let conn = db.lock();
    favorites_in(&conn, preset_id)
}

/// Get a favorite by ID
pub fn get_favorite(db: &DbConnection, id: &Uuid) -> DbResult<Option<Favorite>> {
    let conn = db.lock();
    let result = conn.query_row(
        "SELECT id, preset_id, display_name, notes FROM favorites WHERE id = ?1",
        [id.to_string()],
        favorite_from_row,
    );

    match result {
        Ok(favorite) => Ok(Some(favorite)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn rename_favorite(db: &DbConnection, id: &Uuid, name: &str) -> DbResult<()> {
    update_column(db, "favorites", "favorite", id, "display_name", &name)
}

pub fn set_favorite_notes(db: &DbConnection, id: &Uuid, notes: &str) -> DbResult<()> {
    update_column(db, "favorites", "favorite", id, "notes", &notes)
}

/// Delete a favorite and its config
pub fn delete_favorite(db: &DbConnection, id: &Uuid) -> DbResult<()> {
    db.write(|tx| {
        tx.execute(
            "DELETE FROM audio_configs WHERE favorite_id = ?1",
            [id.to_string()],
        )?;
        let deleted = tx.execute("DELETE FROM favorites WHERE id = ?1", [id.to_string()])?;
        if deleted == 0 {
            return Err(DbError::not_found("favorite", id));
        }
        Ok(())
    })
}
