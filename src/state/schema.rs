// Catalog table definitions
// Tables referenced by a foreign key must exist before the tables that reference them

use rusqlite::Connection;

use super::db::{DbError, DbResult};

/// A table and the tables it `belongs to`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub depends_on: &'static [&'static str],
    /// CREATE TABLE followed by its indexes
    pub statements: &'static [&'static str],
}

pub const SOUND_FONTS: TableDef = TableDef {
    name: "sound_fonts",
    depends_on: &[],
    statements: &[
        "CREATE TABLE IF NOT EXISTS sound_fonts (
            id TEXT PRIMARY KEY,
            location_kind TEXT NOT NULL,
            location_path TEXT NOT NULL,
            location_bookmark BLOB,
            display_name TEXT NOT NULL,
            original_name TEXT NOT NULL,
            embedded_name TEXT NOT NULL,
            embedded_author TEXT NOT NULL,
            embedded_comment TEXT NOT NULL,
            embedded_copyright TEXT NOT NULL,
            notes TEXT NOT NULL,
            visible INTEGER NOT NULL,
            added_at TEXT NOT NULL,
            UNIQUE (location_kind, location_path)
        )",
        "CREATE INDEX IF NOT EXISTS idx_sound_fonts_display_name ON sound_fonts(display_name)",
    ],
};

pub const PRESETS: TableDef = TableDef {
    name: "presets",
    depends_on: &["sound_fonts"],
    statements: &[
        "CREATE TABLE IF NOT EXISTS presets (
            id TEXT PRIMARY KEY,
            sound_font_id TEXT NOT NULL,
            preset_index INTEGER NOT NULL,
            bank INTEGER NOT NULL,
            program INTEGER NOT NULL,
            original_name TEXT NOT NULL,
            display_name TEXT NOT NULL,
            visible INTEGER NOT NULL,
            notes TEXT NOT NULL,
            UNIQUE (sound_font_id, preset_index),
            FOREIGN KEY (sound_font_id) REFERENCES sound_fonts(id) ON DELETE CASCADE
        )",
    ],
};

pub const FAVORITES: TableDef = TableDef {
    name: "favorites",
    depends_on: &["presets"],
    statements: &[
        "CREATE TABLE IF NOT EXISTS favorites (
            id TEXT PRIMARY KEY,
            preset_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            notes TEXT NOT NULL,
            FOREIGN KEY (preset_id) REFERENCES presets(id) ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS idx_favorites_preset_id ON favorites(preset_id)",
    ],
};

// Exactly one of preset_id / favorite_id is set
pub const AUDIO_CONFIGS: TableDef = TableDef {
    name: "audio_configs",
    depends_on: &["presets", "favorites"],
    statements: &[
        "CREATE TABLE IF NOT EXISTS audio_configs (
            id TEXT PRIMARY KEY,
            preset_id TEXT UNIQUE,
            favorite_id TEXT UNIQUE,
            gain REAL NOT NULL,
            pan REAL NOT NULL,
            keyboard_lowest_note INTEGER,
            keyboard_lowest_note_enabled INTEGER NOT NULL,
            pitch_bend_range INTEGER,
            preset_tuning REAL,
            preset_transpose INTEGER,
            zone_overrides TEXT,
            CHECK ((preset_id IS NULL) <> (favorite_id IS NULL)),
            FOREIGN KEY (preset_id) REFERENCES presets(id) ON DELETE CASCADE,
            FOREIGN KEY (favorite_id) REFERENCES favorites(id) ON DELETE CASCADE
        )",
    ],
};

pub const DELAY_CONFIGS: TableDef = TableDef {
    name: "delay_configs",
    depends_on: &["audio_configs"],
    statements: &[
        "CREATE TABLE IF NOT EXISTS delay_configs (
            audio_config_id TEXT PRIMARY KEY,
            time REAL NOT NULL,
            feedback REAL NOT NULL,
            cutoff REAL NOT NULL,
            wet_dry_mix REAL NOT NULL,
            enabled INTEGER NOT NULL,
            FOREIGN KEY (audio_config_id) REFERENCES audio_configs(id) ON DELETE CASCADE
        )",
    ],
};

pub const REVERB_CONFIGS: TableDef = TableDef {
    name: "reverb_configs",
    depends_on: &["audio_configs"],
    statements: &[
        "CREATE TABLE IF NOT EXISTS reverb_configs (
            audio_config_id TEXT PRIMARY KEY,
            room_preset INTEGER NOT NULL,
            wet_dry_mix REAL NOT NULL,
            enabled INTEGER NOT NULL,
            FOREIGN KEY (audio_config_id) REFERENCES audio_configs(id) ON DELETE CASCADE
        )",
    ],
};

pub const TAGS: TableDef = TableDef {
    name: "tags",
    depends_on: &[],
    statements: &[
        "CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            ordering INTEGER NOT NULL
        )",
    ],
};

pub const TAGGED_SOUND_FONTS: TableDef = TableDef {
    name: "tagged_sound_fonts",
    depends_on: &["sound_fonts", "tags"],
    statements: &[
        "CREATE TABLE IF NOT EXISTS tagged_sound_fonts (
            sound_font_id TEXT NOT NULL,
            tag_id TEXT NOT NULL,
            PRIMARY KEY (sound_font_id, tag_id),
            FOREIGN KEY (sound_font_id) REFERENCES sound_fonts(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )",
        "CREATE INDEX IF NOT EXISTS idx_tagged_sound_fonts_tag_id ON tagged_sound_fonts(tag_id)",
    ],
};

/// Every catalog table
pub const TABLES: [TableDef; 8] = [
    SOUND_FONTS,
    PRESETS,
    FAVORITES,
    AUDIO_CONFIGS,
    DELAY_CONFIGS,
    REVERB_CONFIGS,
    TAGS,
    TAGGED_SOUND_FONTS,
];

/// Order tables so that every dependency is created first
///
/// Tables keep their relative input order wherever the dependencies allow it. Fails
/// on a dependency that is not in the list or on a cycle.
pub fn creation_order(tables: &[TableDef]) -> DbResult<Vec<TableDef>> {
    for table in tables {
        for dependency in table.depends_on {
            if !tables.iter().any(|t| t.name == *dependency) {
                return Err(DbError::InvalidSchema(format!(
                    "table {} depends on unknown table {}",
                    table.name, dependency
                )));
            }
        }
    }

    let mut ordered: Vec<TableDef> = Vec::with_capacity(tables.len());
    let mut remaining: Vec<TableDef> = tables.to_vec();

    while !remaining.is_empty() {
        let ready = remaining.iter().position(|table| {
            table
                .depends_on
                .iter()
                .all(|dependency| ordered.iter().any(|t| t.name == *dependency))
        });

        match ready {
            Some(position) => ordered.push(remaining.remove(position)),
            None => {
                let names: Vec<&str> = remaining.iter().map(|t| t.name).collect();
                return Err(DbError::InvalidSchema(format!(
                    "dependency cycle among tables: {}",
                    names.join(", ")
                )));
            }
        }
    }

    Ok(ordered)
}

/// Check that no table in `order` references a table created after it
pub fn verify_creation_order(order: &[TableDef]) -> DbResult<()> {
    for (position, table) in order.iter().enumerate() {
        for dependency in table.depends_on {
            if !order[..position].iter().any(|t| t.name == *dependency) {
                return Err(DbError::InvalidSchema(format!(
                    "table {} is created before {}",
                    table.name, dependency
                )));
            }
        }
    }
    Ok(())
}

/// Create all catalog tables in dependency order
pub fn create_tables(conn: &Connection) -> DbResult<()> {
    for table in creation_order(&TABLES)? {
        log::debug!("Creating table {}", table.name);
        for statement in table.statements {
            conn.execute(statement, [])?;
        }
    }
    Ok(())
}
