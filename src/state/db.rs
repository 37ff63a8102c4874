// SQLite database setup and migrations
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::queries::tags::ensure_ubiquitous_tags_in;
use super::schema;
use super::storage::{StorageError, StoragePaths};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Tag name cannot be empty")]
    EmptyTagName,
    #[error("System tag cannot be changed: {0}")]
    UbiquitousTag(String),
    #[error("Failed to load sound font {name}: {reason}")]
    LoadFailure { name: String, reason: String },
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Migration {version} ({name}) failed: {source}")]
    MigrationFailed {
        version: i64,
        name: String,
        #[source]
        source: Box<DbError>,
    },
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }

    /// Turn a UNIQUE / PRIMARY KEY violation into `Duplicate`, leave anything else alone
    pub(crate) fn from_constraint(error: rusqlite::Error, what: impl FnOnce() -> String) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, _) = &error {
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return DbError::Duplicate(what());
            }
        }
        DbError::Sqlite(error)
    }
}

pub type DbResult<T> = Result<T, DbError>;

// Thread-safe database connection wrapper
#[derive(Debug)]
pub struct DbConnection {
    conn: Arc<Mutex<Connection>>,
}

impl DbConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied write behind:
        // open transactions roll back when dropped.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` inside a write transaction; nothing is kept unless it returns `Ok`
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> DbResult<T>) -> DbResult<T> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl Clone for DbConnection {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// A named schema upgrade stage
#[derive(Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub apply: fn(&Transaction<'_>) -> DbResult<()>,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish()
    }
}

fn create_tables(tx: &Transaction<'_>) -> DbResult<()> {
    schema::create_tables(tx)
}

fn add_ubiquitous_tags(tx: &Transaction<'_>) -> DbResult<()> {
    ensure_ubiquitous_tags_in(tx).map(|_| ())
}

/// Catalog migrations, in application order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create tables",
        apply: create_tables,
    },
    Migration {
        version: 2,
        name: "add ubiquitous tags",
        apply: add_ubiquitous_tags,
    },
];

/// Initialize the database in the given storage layout
pub fn init_db(paths: &StoragePaths) -> DbResult<DbConnection> {
    let db_path = paths.database_path();

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    log::info!("Opening catalog at {}", db_path.display());
    let conn = Connection::open(&db_path)?;
    prepare(conn)
}

/// Initialize a throwaway database, used by tests and previews
pub fn open_in_memory() -> DbResult<DbConnection> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(mut conn: Connection) -> DbResult<DbConnection> {
    // Enable foreign keys
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    run_migrations(&mut conn, MIGRATIONS)?;

    // System tags are checked on every start, not only when the migration runs
    let tx = conn.transaction()?;
    ensure_ubiquitous_tags_in(&tx)?;
    tx.commit()?;

    Ok(DbConnection::new(conn))
}

/// Apply every migration newer than the recorded schema version
///
/// Each stage runs in its own transaction together with its version record, so a
/// failure leaves the store at the previous version.
pub fn run_migrations(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    for pair in migrations.windows(2) {
        if pair[1].version <= pair[0].version {
            return Err(DbError::InvalidSchema(format!(
                "migration versions must increase: {} ({}) follows {} ({})",
                pair[1].version, pair[1].name, pair[0].version, pair[0].name
            )));
        }
    }

    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current_version = schema_version(conn)?;

    for migration in migrations.iter().filter(|m| m.version > current_version) {
        log::info!(
            "Applying migration {} ({})",
            migration.version,
            migration.name
        );

        let failed = |source: DbError| DbError::MigrationFailed {
            version: migration.version,
            name: migration.name.to_string(),
            source: Box::new(source),
        };

        let tx = conn.transaction().map_err(|e| failed(e.into()))?;
        (migration.apply)(&tx).map_err(failed)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, Utc::now().to_rfc3339()],
        )
        .map_err(|e| failed(e.into()))?;
        tx.commit().map_err(|e| failed(e.into()))?;
    }

    Ok(())
}

/// Highest applied migration version, 0 for a fresh store
pub fn schema_version(conn: &Connection) -> DbResult<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}
