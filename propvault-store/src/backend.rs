//! SQLite tables backing property maps.
//!
//! Two tables: `property_sets` holds one row per scope with the map's
//! algorithm tag, `properties` holds the `(name, value)` rows of each set.
//! `seq` preserves insertion order.

use crate::error::{StoreError, StoreResult};
use crate::map::PropertyScope;
use crate::store::PropertyRow;
use propvault_crypto::EncryptionAlgorithm;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// A persisted property set header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySetInfo {
    pub set_id: i64,
    pub scope: PropertyScope,
    pub encryption: EncryptionAlgorithm,
}

/// Persistent storage for property sets backed by SQLite.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Opens (or creates) a database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let backend = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS property_sets (
                set_id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                category TEXT NOT NULL,
                encryption TEXT NOT NULL,
                UNIQUE(owner, category)
            );

            CREATE TABLE IF NOT EXISTS properties (
                set_id INTEGER NOT NULL REFERENCES property_sets(set_id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                value TEXT,
                seq INTEGER NOT NULL,
                UNIQUE(set_id, name)
            );
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::InvalidData("connection mutex poisoned".to_string()))
    }

    /// Runs `f` inside one transaction, committing only if it succeeds.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Looks up the set header for `scope`.
    pub fn find_set(&self, scope: &PropertyScope) -> StoreResult<Option<PropertySetInfo>> {
        let conn = self.lock()?;
        find_set(&conn, scope)
    }

    /// Rows of a set in insertion order.
    pub fn load_rows(&self, set_id: i64) -> StoreResult<Vec<PropertyRow>> {
        let conn = self.lock()?;
        load_rows(&conn, set_id)
    }

    /// Every persisted set, optionally restricted to one category.
    pub fn list_sets(&self, category: Option<&str>) -> StoreResult<Vec<PropertySetInfo>> {
        let conn = self.lock()?;
        list_sets(&conn, category)
    }

    /// Deletes a set and its rows. Returns whether a set existed.
    pub fn delete_set(&self, scope: &PropertyScope) -> StoreResult<bool> {
        self.transaction(|tx| {
            let Some(info) = find_set(tx, scope)? else {
                return Ok(false);
            };
            tx.execute("DELETE FROM properties WHERE set_id = ?1", params![info.set_id])?;
            tx.execute(
                "DELETE FROM property_sets WHERE set_id = ?1",
                params![info.set_id],
            )?;
            Ok(true)
        })
    }

    /// Raw stored text of one property, as written to the `value` column.
    pub fn raw_value(&self, set_id: i64, name: &str) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        let value: Option<Option<String>> = conn
            .query_row(
                "SELECT value FROM properties WHERE set_id = ?1 AND name = ?2",
                params![set_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// Overwrites the raw stored text of one property. Bypasses every store.
    pub fn write_raw_value(&self, set_id: i64, name: &str, value: Option<&str>) -> StoreResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE properties SET value = ?3 WHERE set_id = ?1 AND name = ?2",
            params![set_id, name, value],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("{set_id}/{name}")));
        }
        Ok(())
    }
}

pub(crate) fn find_set(
    conn: &Connection,
    scope: &PropertyScope,
) -> StoreResult<Option<PropertySetInfo>> {
    let row: Option<(i64, String)> = conn
        .query_row(
            "SELECT set_id, encryption FROM property_sets WHERE owner = ?1 AND category = ?2",
            params![scope.owner, scope.category],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(set_id, tag)| {
        Ok(PropertySetInfo {
            set_id,
            scope: scope.clone(),
            encryption: parse_tag(&tag)?,
        })
    })
    .transpose()
}

pub(crate) fn load_rows(conn: &Connection, set_id: i64) -> StoreResult<Vec<PropertyRow>> {
    let mut stmt =
        conn.prepare("SELECT name, value FROM properties WHERE set_id = ?1 ORDER BY seq, rowid")?;
    let rows = stmt.query_map(params![set_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut result: Vec<PropertyRow> = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}

pub(crate) fn list_sets(
    conn: &Connection,
    category: Option<&str>,
) -> StoreResult<Vec<PropertySetInfo>> {
    let mut stmt = conn.prepare(
        "SELECT set_id, owner, category, encryption FROM property_sets
         WHERE ?1 IS NULL OR category = ?1
         ORDER BY owner, category",
    )?;
    let rows = stmt.query_map(params![category], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (set_id, owner, category, tag) = row?;
        result.push(PropertySetInfo {
            set_id,
            scope: PropertyScope::new(owner, category),
            encryption: parse_tag(&tag)?,
        });
    }
    Ok(result)
}

pub(crate) fn insert_set(
    conn: &Connection,
    scope: &PropertyScope,
    encryption: EncryptionAlgorithm,
) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO property_sets (owner, category, encryption) VALUES (?1, ?2, ?3)",
        params![scope.owner, scope.category, encryption.serialized_name()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn set_exists(conn: &Connection, set_id: i64) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT set_id FROM property_sets WHERE set_id = ?1",
            params![set_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn upsert_row(
    conn: &Connection,
    set_id: i64,
    name: &str,
    value: Option<&str>,
    seq: i64,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO properties (set_id, name, value, seq) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(set_id, name) DO UPDATE SET value = excluded.value, seq = excluded.seq",
        params![set_id, name, value, seq],
    )?;
    Ok(())
}

pub(crate) fn delete_row(conn: &Connection, set_id: i64, name: &str) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM properties WHERE set_id = ?1 AND name = ?2",
        params![set_id, name],
    )?;
    Ok(())
}

pub(crate) fn update_value(
    conn: &Connection,
    set_id: i64,
    name: &str,
    value: Option<&str>,
) -> StoreResult<()> {
    conn.execute(
        "UPDATE properties SET value = ?3 WHERE set_id = ?1 AND name = ?2",
        params![set_id, name, value],
    )?;
    Ok(())
}

fn parse_tag(tag: &str) -> StoreResult<EncryptionAlgorithm> {
    Ok(tag.parse::<EncryptionAlgorithm>()?)
}
