// Tag queries - system tags, user tags and sound font membership
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::sound_fonts::{sound_font_from_row, SOUND_FONT_COLUMNS};
use super::uuid_column;
use crate::state::db::{DbConnection, DbError, DbResult};
use crate::state::models::{SoundFont, Tag, Ubiquitous};

const NEW_TAG_NAME: &str = "New Tag";

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        ordering: row.get(2)?,
    })
}

fn tag_in(conn: &Connection, id: &Uuid) -> DbResult<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name, ordering FROM tags WHERE id = ?1",
            [id.to_string()],
            tag_from_row,
        )
        .optional()?;
    Ok(tag)
}

fn tag_named_in(conn: &Connection, name: &str) -> DbResult<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name, ordering FROM tags WHERE name = ?1",
            [name],
            tag_from_row,
        )
        .optional()?;
    Ok(tag)
}

fn sound_font_exists_in(conn: &Connection, id: &Uuid) -> DbResult<bool> {
    let found: Option<i32> = conn
        .query_row(
            "SELECT 1 FROM sound_fonts WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn trimmed_name(name: &str) -> DbResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DbError::EmptyTagName);
    }
    Ok(trimmed.to_string())
}

fn reject_ubiquitous(tag_id: &Uuid) -> DbResult<()> {
    match Ubiquitous::from_id(tag_id) {
        Some(tag) => Err(DbError::UbiquitousTag(tag.name().to_string())),
        None => Ok(()),
    }
}

// ==================== SYSTEM TAGS ====================

/// Move a tag and its memberships over to a new id
fn change_tag_id_in(conn: &Connection, from: &Uuid, to: &Uuid) -> DbResult<()> {
    let members = {
        let mut stmt =
            conn.prepare("SELECT sound_font_id FROM tagged_sound_fonts WHERE tag_id = ?1")?;
        let members = stmt
            .query_map([from.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        members
    };

    conn.execute(
        "DELETE FROM tagged_sound_fonts WHERE tag_id = ?1",
        [from.to_string()],
    )?;
    conn.execute(
        "UPDATE tags SET id = ?1 WHERE id = ?2",
        params![to.to_string(), from.to_string()],
    )?;
    for sound_font_id in members {
        conn.execute(
            "INSERT OR IGNORE INTO tagged_sound_fonts (sound_font_id, tag_id) VALUES (?1, ?2)",
            params![sound_font_id, to.to_string()],
        )?;
    }
    Ok(())
}

/// Create whichever system tags are missing
///
/// A system tag is found by its well-known id. A row that only carries the system
/// tag's name is moved over to that id, memberships included. Missing tags are
/// created in canonical order with their canonical ordering, so a second run finds
/// everything in place and changes nothing.
pub(crate) fn ensure_ubiquitous_tags_in(conn: &Connection) -> DbResult<Vec<Tag>> {
    let mut tags = Vec::with_capacity(Ubiquitous::ALL.len());

    for (ordering, kind) in Ubiquitous::ALL.iter().enumerate() {
        if let Some(existing) = tag_in(conn, &kind.id())? {
            tags.push(existing);
            continue;
        }

        if let Some(mut existing) = tag_named_in(conn, kind.name())? {
            log::warn!(
                "System tag {} had id {}, moving it to {}",
                existing.name,
                existing.id,
                kind.id()
            );
            change_tag_id_in(conn, &existing.id, &kind.id())?;
            existing.id = kind.id();
            tags.push(existing);
            continue;
        }

        let tag = Tag {
            id: kind.id(),
            name: kind.name().to_string(),
            ordering: ordering as i32,
        };
        conn.execute(
            "INSERT INTO tags (id, name, ordering) VALUES (?1, ?2, ?3)",
            params![tag.id.to_string(), tag.name, tag.ordering],
        )
        .map_err(|e| DbError::from_constraint(e, || format!("tag {}", tag.name)))?;

        log::info!("Created system tag {}", tag.name);
        tags.push(tag);
    }

    Ok(tags)
}

/// Make sure every system tag exists
pub fn ensure_ubiquitous_tags(db: &DbConnection) -> DbResult<Vec<Tag>> {
    db.write(|tx| ensure_ubiquitous_tags_in(tx))
}

// ==================== TAG QUERIES ====================

/// All tags in display order
pub fn list_tags(db: &DbConnection) -> DbResult<Vec<Tag>> {
    let conn = db.lock();
    let mut stmt = conn.prepare("SELECT id, name, ordering FROM tags ORDER BY ordering, name")?;
    let tags = stmt
        .query_map([], tag_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Get a tag by ID
pub fn get_tag(db: &DbConnection, id: &Uuid) -> DbResult<Option<Tag>> {
    let conn = db.lock();
    tag_in(&conn, id)
}

pub fn find_tag_by_name(db: &DbConnection, name: &str) -> DbResult<Option<Tag>> {
    let conn = db.lock();
    tag_named_in(&conn, name)
}

/// Create a user tag at the end of the display order
pub fn create_tag(db: &DbConnection, name: &str) -> DbResult<Tag> {
    let name = trimmed_name(name)?;

    db.write(|tx| {
        if tag_named_in(tx, &name)?.is_some() {
            return Err(DbError::Duplicate(format!("tag {}", name)));
        }

        let ordering: i32 = tx.query_row(
            "SELECT COALESCE(MAX(ordering) + 1, 0) FROM tags",
            [],
            |row| row.get(0),
        )?;

        let tag = Tag {
            id: Uuid::new_v4(),
            name,
            ordering,
        };
        tx.execute(
            "INSERT INTO tags (id, name, ordering) VALUES (?1, ?2, ?3)",
            params![tag.id.to_string(), tag.name, tag.ordering],
        )
        .map_err(|e| DbError::from_constraint(e, || format!("tag {}", tag.name)))?;

        log::debug!("Created tag {} ({})", tag.name, tag.id);
        Ok(tag)
    })
}

/// Rename a user tag
pub fn rename_tag(db: &DbConnection, id: &Uuid, name: &str) -> DbResult<Tag> {
    reject_ubiquitous(id)?;
    let name = trimmed_name(name)?;

    db.write(|tx| {
        let mut tag = tag_in(tx, id)?.ok_or_else(|| DbError::not_found("tag", id))?;
        if let Some(other) = tag_named_in(tx, &name)? {
            if other.id != tag.id {
                return Err(DbError::Duplicate(format!("tag {}", name)));
            }
        }

        tx.execute(
            "UPDATE tags SET name = ?1 WHERE id = ?2",
            params![name, id.to_string()],
        )?;
        tag.name = name;
        Ok(tag)
    })
}

/// Delete a user tag
///
/// Only the tag and its memberships go away; the sound fonts it was attached to and
/// their other tags are untouched. System tags are rejected.
pub fn delete_tag(db: &DbConnection, id: &Uuid) -> DbResult<()> {
    reject_ubiquitous(id)?;

    db.write(|tx| {
        tx.execute(
            "DELETE FROM tagged_sound_fonts WHERE tag_id = ?1",
            [id.to_string()],
        )?;
        let deleted = tx.execute("DELETE FROM tags WHERE id = ?1", [id.to_string()])?;
        if deleted == 0 {
            return Err(DbError::not_found("tag", id));
        }
        log::debug!("Deleted tag {}", id);
        Ok(())
    })
}

/// Store a new display order
///
/// The tags in `ids` come first, in that order; tags left out follow in their
/// current order. Every tag ends up with a distinct ordering.
pub fn reorder_tags(db: &DbConnection, ids: &[Uuid]) -> DbResult<()> {
    db.write(|tx| {
        let current: Vec<Uuid> = {
            let mut stmt = tx.prepare("SELECT id, name, ordering FROM tags ORDER BY ordering, name")?;
            let tags = stmt
                .query_map([], tag_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            tags.into_iter().map(|tag| tag.id).collect()
        };

        let mut order: Vec<Uuid> = Vec::with_capacity(current.len());
        for id in ids {
            if !current.contains(id) {
                return Err(DbError::not_found("tag", id));
            }
            if !order.contains(id) {
                order.push(*id);
            }
        }
        let rest: Vec<Uuid> = current
            .iter()
            .filter(|id| !order.contains(id))
            .copied()
            .collect();
        order.extend(rest);

        for (ordering, id) in order.iter().enumerate() {
            tx.execute(
                "UPDATE tags SET ordering = ?1 WHERE id = ?2",
                params![ordering as i32, id.to_string()],
            )?;
        }
        Ok(())
    })
}

// ==================== MEMBERSHIP QUERIES ====================

/// Attach a user tag to a sound font; attaching twice is a no-op
pub fn tag_sound_font(db: &DbConnection, tag_id: &Uuid, sound_font_id: &Uuid) -> DbResult<()> {
    reject_ubiquitous(tag_id)?;

    db.write(|tx| {
        if tag_in(tx, tag_id)?.is_none() {
            return Err(DbError::not_found("tag", tag_id));
        }
        if !sound_font_exists_in(tx, sound_font_id)? {
            return Err(DbError::not_found("sound font", sound_font_id));
        }
        tx.execute(
            "INSERT OR IGNORE INTO tagged_sound_fonts (sound_font_id, tag_id) VALUES (?1, ?2)",
            params![sound_font_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    })
}

/// Detach a user tag from a sound font
pub fn untag_sound_font(db: &DbConnection, tag_id: &Uuid, sound_font_id: &Uuid) -> DbResult<()> {
    reject_ubiquitous(tag_id)?;

    db.write(|tx| {
        tx.execute(
            "DELETE FROM tagged_sound_fonts WHERE sound_font_id = ?1 AND tag_id = ?2",
            params![sound_font_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    })
}

/// Attach the system tags for a new sound font
pub(crate) fn tag_with_ubiquitous_in(
    conn: &Connection,
    sound_font_id: &Uuid,
    tags: &[Ubiquitous],
) -> DbResult<()> {
    for tag in tags {
        conn.execute(
            "INSERT OR IGNORE INTO tagged_sound_fonts (sound_font_id, tag_id) VALUES (?1, ?2)",
            params![sound_font_id.to_string(), tag.id().to_string()],
        )?;
    }
    Ok(())
}

/// Tags of a sound font in display order
pub fn tags_for_sound_font(db: &DbConnection, sound_font_id: &Uuid) -> DbResult<Vec<Tag>> {
    let conn = db.lock();
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.ordering
         FROM tags t
         JOIN tagged_sound_fonts ts ON ts.tag_id = t.id
         WHERE ts.sound_font_id = ?1
         ORDER BY t.ordering, t.name",
    )?;
    let tags = stmt
        .query_map([sound_font_id.to_string()], tag_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Sound fonts carrying a tag, ordered by display name
pub fn sound_fonts_tagged(db: &DbConnection, tag_id: &Uuid) -> DbResult<Vec<SoundFont>> {
    let conn = db.lock();
    let sql = format!(
        "SELECT {} FROM sound_fonts sf
         JOIN tagged_sound_fonts ts ON ts.sound_font_id = sf.id
         WHERE ts.tag_id = ?1
         ORDER BY sf.display_name",
        SOUND_FONT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let sound_fonts = stmt
        .query_map([tag_id.to_string()], sound_font_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sound_fonts)
}

// ==================== FORMATTING ====================

/// Tag names joined with ", " in the order given
pub fn generate_tags_list(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First of "New Tag", "New Tag 1", "New Tag 2", ... not used by `existing`
pub fn next_tag_name(existing: &[Tag]) -> String {
    let taken = |candidate: &str| existing.iter().any(|tag| tag.name == candidate);
    if !taken(NEW_TAG_NAME) {
        return NEW_TAG_NAME.to_string();
    }
    (1..)
        .map(|index| format!("{} {}", NEW_TAG_NAME, index))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| NEW_TAG_NAME.to_string())
}
