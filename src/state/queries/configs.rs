// Audio config and effect queries
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{optional_uuid_column, uuid_column};
use crate::state::db::{DbConnection, DbError, DbResult};
use crate::state::models::{AudioConfig, ConfigOwner, DelayConfig, ReverbConfig};
use crate::state::overrides::ZoneOverrides;

const AUDIO_CONFIG_COLUMNS: &str = "id, preset_id, favorite_id, gain, pan, keyboard_lowest_note,
    keyboard_lowest_note_enabled, pitch_bend_range, preset_tuning, preset_transpose,
    zone_overrides";

impl ConfigOwner {
    fn column(&self) -> &'static str {
        match self {
            ConfigOwner::Preset(_) => "preset_id",
            ConfigOwner::Favorite(_) => "favorite_id",
        }
    }

    fn id(&self) -> Uuid {
        match self {
            ConfigOwner::Preset(id) | ConfigOwner::Favorite(id) => *id,
        }
    }

    fn entity(&self) -> &'static str {
        match self {
            ConfigOwner::Preset(_) => "preset config",
            ConfigOwner::Favorite(_) => "favorite config",
        }
    }
}

fn audio_config_from_row(row: &Row<'_>) -> rusqlite::Result<AudioConfig> {
    let owner = match (optional_uuid_column(row, 1)?, optional_uuid_column(row, 2)?) {
        (Some(preset_id), None) => ConfigOwner::Preset(preset_id),
        (None, Some(favorite_id)) => ConfigOwner::Favorite(favorite_id),
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                "config must have exactly one owner".into(),
            ))
        }
    };

    let overrides = match row.get::<_, Option<String>>(10)? {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?,
        None => ZoneOverrides::new(),
    };

    Ok(AudioConfig {
        id: uuid_column(row, 0)?,
        owner,
        gain: row.get(3)?,
        pan: row.get(4)?,
        keyboard_lowest_note: row.get(5)?,
        keyboard_lowest_note_enabled: row.get(6)?,
        pitch_bend_range: row.get(7)?,
        preset_tuning: row.get(8)?,
        preset_transpose: row.get(9)?,
        overrides,
    })
}

/// Empty override maps are stored as NULL
///
/// JSON has no NaN or infinity, so such values are refused before anything is written.
fn overrides_json(overrides: &ZoneOverrides) -> DbResult<Option<String>> {
    if let Some((zone, generator, value)) = overrides.first_non_finite() {
        return Err(DbError::InvalidValue(format!(
            "override {} for generator {} in zone {}",
            value, generator, zone
        )));
    }
    if overrides.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(overrides)?))
}

pub(crate) fn insert_audio_config_in(conn: &Connection, config: &AudioConfig) -> DbResult<()> {
    let (preset_id, favorite_id) = match config.owner {
        ConfigOwner::Preset(id) => (Some(id.to_string()), None),
        ConfigOwner::Favorite(id) => (None, Some(id.to_string())),
    };

    conn.execute(
        "INSERT INTO audio_configs (id, preset_id, favorite_id, gain, pan, keyboard_lowest_note,
            keyboard_lowest_note_enabled, pitch_bend_range, preset_tuning, preset_transpose,
            zone_overrides)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            config.id.to_string(),
            preset_id,
            favorite_id,
            config.gain,
            config.pan,
            config.keyboard_lowest_note,
            config.keyboard_lowest_note_enabled,
            config.pitch_bend_range,
            config.preset_tuning,
            config.preset_transpose,
            overrides_json(&config.overrides)?,
        ],
    )
    .map_err(|e| DbError::from_constraint(e, || config.owner.entity().to_string()))?;
    Ok(())
}

fn audio_config_in(conn: &Connection, owner: ConfigOwner) -> DbResult<Option<AudioConfig>> {
    let sql = format!(
        "SELECT {} FROM audio_configs WHERE {} = ?1",
        AUDIO_CONFIG_COLUMNS,
        owner.column()
    );
    let config = conn
        .query_row(&sql, [owner.id().to_string()], audio_config_from_row)
        .optional()?;
    Ok(config)
}

fn required_config_in(conn: &Connection, owner: ConfigOwner) -> DbResult<AudioConfig> {
    audio_config_in(conn, owner)?.ok_or_else(|| DbError::not_found(owner.entity(), owner.id()))
}

fn delay_in(conn: &Connection, config_id: &Uuid) -> DbResult<Option<DelayConfig>> {
    let delay = conn
        .query_row(
            "SELECT time, feedback, cutoff, wet_dry_mix, enabled
             FROM delay_configs WHERE audio_config_id = ?1",
            [config_id.to_string()],
            |row| {
                Ok(DelayConfig {
                    time: row.get(0)?,
                    feedback: row.get(1)?,
                    cutoff: row.get(2)?,
                    wet_dry_mix: row.get(3)?,
                    enabled: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(delay)
}

fn reverb_in(conn: &Connection, config_id: &Uuid) -> DbResult<Option<ReverbConfig>> {
    let reverb = conn
        .query_row(
            "SELECT room_preset, wet_dry_mix, enabled
             FROM reverb_configs WHERE audio_config_id = ?1",
            [config_id.to_string()],
            |row| {
                Ok(ReverbConfig {
                    preset: row.get(0)?,
                    wet_dry_mix: row.get(1)?,
                    enabled: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(reverb)
}

fn write_delay_in(conn: &Connection, config_id: &Uuid, delay: &DelayConfig) -> DbResult<()> {
    conn.execute(
        "INSERT INTO delay_configs (audio_config_id, time, feedback, cutoff, wet_dry_mix, enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(audio_config_id) DO UPDATE SET
            time = excluded.time,
            feedback = excluded.feedback,
            cutoff = excluded.cutoff,
            wet_dry_mix = excluded.wet_dry_mix,
            enabled = excluded.enabled",
        params![
            config_id.to_string(),
            delay.time,
            delay.feedback,
            delay.cutoff,
            delay.wet_dry_mix,
            delay.enabled,
        ],
    )?;
    Ok(())
}

fn write_reverb_in(conn: &Connection, config_id: &Uuid, reverb: &ReverbConfig) -> DbResult<()> {
    conn.execute(
        "INSERT INTO reverb_configs (audio_config_id, room_preset, wet_dry_mix, enabled)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(audio_config_id) DO UPDATE SET
            room_preset = excluded.room_preset,
            wet_dry_mix = excluded.wet_dry_mix,
            enabled = excluded.enabled",
        params![
            config_id.to_string(),
            reverb.preset,
            reverb.wet_dry_mix,
            reverb.enabled,
        ],
    )?;
    Ok(())
}

/// Give `to` its own copy of the config owned by `from`, effects included
pub(crate) fn duplicate_config_in(
    conn: &Connection,
    from: ConfigOwner,
    to: ConfigOwner,
) -> DbResult<AudioConfig> {
    let source = required_config_in(conn, from)?;
    let copy = AudioConfig {
        id: Uuid::new_v4(),
        owner: to,
        ..source.clone()
    };
    insert_audio_config_in(conn, &copy)?;

    if let Some(delay) = delay_in(conn, &source.id)? {
        write_delay_in(conn, &copy.id, &delay)?;
    }
    if let Some(reverb) = reverb_in(conn, &source.id)? {
        write_reverb_in(conn, &copy.id, &reverb)?;
    }
    Ok(copy)
}

// ==================== AUDIO CONFIG QUERIES ====================

/// The config of a preset or favorite
pub fn audio_config_for(db: &DbConnection, owner: ConfigOwner) -> DbResult<Option<AudioConfig>> {
    let conn = db.lock();
    audio_config_in(&conn, owner)
}

/// Store every field of a config; the owner cannot change
pub fn update_audio_config(db: &DbConnection, config: &AudioConfig) -> DbResult<()> {
    let overrides = overrides_json(&config.overrides)?;
    let sql = format!(
        "UPDATE audio_configs SET gain = ?1, pan = ?2, keyboard_lowest_note = ?3,
            keyboard_lowest_note_enabled = ?4, pitch_bend_range = ?5, preset_tuning = ?6,
            preset_transpose = ?7, zone_overrides = ?8
         WHERE id = ?9 AND {} = ?10",
        config.owner.column()
    );

    db.write(|tx| {
        let updated = tx.execute(
            &sql,
            params![
                config.gain,
                config.pan,
                config.keyboard_lowest_note,
                config.keyboard_lowest_note_enabled,
                config.pitch_bend_range,
                config.preset_tuning,
                config.preset_transpose,
                overrides,
                config.id.to_string(),
                config.owner.id().to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(DbError::not_found("audio config", config.id));
        }
        Ok(())
    })
}

// ==================== ZONE OVERRIDES ====================

fn edit_overrides<T>(
    db: &DbConnection,
    owner: ConfigOwner,
    edit: impl FnOnce(&mut ZoneOverrides) -> T,
) -> DbResult<T> {
    db.write(|tx| {
        let mut config = required_config_in(tx, owner)?;
        let result = edit(&mut config.overrides);
        tx.execute(
            "UPDATE audio_configs SET zone_overrides = ?1 WHERE id = ?2",
            params![overrides_json(&config.overrides)?, config.id.to_string()],
        )?;
        Ok(result)
    })
}

/// Set one generator override in one zone of a stored config
pub fn set_zone_override(
    db: &DbConnection,
    owner: ConfigOwner,
    zone: i32,
    generator: i32,
    value: f32,
) -> DbResult<()> {
    edit_overrides(db, owner, |overrides| {
        overrides.set_override(zone, generator, value)
    })
}

/// Remove one generator override, returning the value it had
pub fn remove_zone_override(
    db: &DbConnection,
    owner: ConfigOwner,
    zone: i32,
    generator: i32,
) -> DbResult<Option<f32>> {
    edit_overrides(db, owner, |overrides| {
        overrides.remove_override(zone, generator)
    })
}

/// Clear the overrides of one zone, or of every zone when `zone` is `None`
pub fn remove_zone_overrides(
    db: &DbConnection,
    owner: ConfigOwner,
    zone: Option<i32>,
) -> DbResult<()> {
    edit_overrides(db, owner, |overrides| match zone {
        Some(zone) => overrides.remove_all_overrides_in(zone),
        None => overrides.remove_all_overrides(),
    })
}

// ==================== EFFECT QUERIES ====================

pub fn delay_config(db: &DbConnection, owner: ConfigOwner) -> DbResult<Option<DelayConfig>> {
    let conn = db.lock();
    let config = required_config_in(&conn, owner)?;
    delay_in(&conn, &config.id)
}

/// Create or replace the delay of a config
pub fn set_delay_config(db: &DbConnection, owner: ConfigOwner, delay: &DelayConfig) -> DbResult<()> {
    db.write(|tx| {
        let config = required_config_in(tx, owner)?;
        write_delay_in(tx, &config.id, delay)
    })
}

pub fn remove_delay_config(db: &DbConnection, owner: ConfigOwner) -> DbResult<()> {
    db.write(|tx| {
        let config = required_config_in(tx, owner)?;
        tx.execute(
            "DELETE FROM delay_configs WHERE audio_config_id = ?1",
            [config.id.to_string()],
        )?;
        Ok(())
    })
}

pub fn reverb_config(db: &DbConnection, owner: ConfigOwner) -> DbResult<Option<ReverbConfig>> {
    let conn = db.lock();
    let config = required_config_in(&conn, owner)?;
    reverb_in(&conn, &config.id)
}

/// Create or replace the reverb of a config
pub fn set_reverb_config(
    db: &DbConnection,
    owner: ConfigOwner,
    reverb: &ReverbConfig,
) -> DbResult<()> {
    db.write(|tx| {
        let config = required_config_in(tx, owner)?;
        write_reverb_in(tx, &config.id, reverb)
    })
}

pub fn remove_reverb_config(db: &DbConnection, owner: ConfigOwner) -> DbResult<()> {
    db.write(|tx| {
        let config = required_config_in(tx, owner)?;
        tx.execute(
            "DELETE FROM reverb_configs WHERE audio_config_id = ?1",
            [config.id.to_string()],
        )?;
        Ok(())
    })
}
