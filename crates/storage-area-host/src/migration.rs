//! Internal schema for SQLite database files.
//!
//! Each host database is one SQLite file. Its internal layout (metadata
//! tables) is versioned separately from the user-facing database version:
//! the file header's `user_version` records how many layout steps have been
//! applied.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{HostError, Result};

/// Layout steps; entry `i` takes a file from layout `i` to `i + 1`.
const LAYOUT_STEPS: &[fn(&Connection) -> Result<()>] = &[apply_v1];

/// Layout version a freshly migrated file ends up at.
pub const CURRENT_LAYOUT: u32 = LAYOUT_STEPS.len() as u32;

/// Bring the file's metadata tables up to [`CURRENT_LAYOUT`].
///
/// The layout version lives in SQLite's `user_version` header field, so an
/// up-to-date file costs one pragma read.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let layout = layout_version(conn)?;
    if layout > CURRENT_LAYOUT {
        return Err(HostError::InvalidState(format!(
            "file layout {} is newer than supported layout {}",
            layout, CURRENT_LAYOUT
        )));
    }
    if layout == CURRENT_LAYOUT {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in &LAYOUT_STEPS[layout as usize..] {
        step(&tx)?;
    }
    tx.pragma_update(None, "user_version", CURRENT_LAYOUT)?;
    tx.commit()?;
    Ok(())
}

/// Layout version recorded in the file header; 0 for a new file.
pub fn layout_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Layout v1: database version and the object store catalog.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Single row: the user-facing database version (0 = never upgraded)
        CREATE TABLE database_info (
            id INTEGER PRIMARY KEY CHECK (id = 0),
            version INTEGER NOT NULL
        );
        INSERT INTO database_info (id, version) VALUES (0, 0);

        -- One row per object store; records live in table_name
        CREATE TABLE object_stores (
            name TEXT PRIMARY KEY,
            table_name TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}

/// Read the user-facing database version.
pub fn read_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row("SELECT version FROM database_info WHERE id = 0", [], |row| {
        row.get(0)
    })?)
}

/// List object store names, sorted.
pub fn store_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM object_stores ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

/// Look up the record table backing `store`.
pub fn store_table(conn: &Connection, store: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT table_name FROM object_stores WHERE name = ?1",
            [store],
            |row| row.get(0),
        )
        .optional()?)
}

/// Set the version and create `new_stores` inside the caller's transaction.
pub fn apply_upgrade(conn: &Connection, version: u32, new_stores: &[String]) -> Result<()> {
    conn.execute(
        "UPDATE database_info SET version = ?1 WHERE id = 0",
        [version],
    )?;

    for store in new_stores {
        if store_table(conn, store)?.is_some() {
            return Err(HostError::Constraint(format!(
                "object store {} already exists",
                store
            )));
        }

        // Quoted hex keeps arbitrary store names out of the SQL grammar.
        let table = format!("\"store_{}\"", hex::encode(store));
        conn.execute(
            "INSERT INTO object_stores (name, table_name, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![store, table, now_millis()],
        )?;
        conn.execute_batch(&format!(
            "CREATE TABLE {} (key BLOB PRIMARY KEY, value BLOB NOT NULL)",
            table
        ))?;
    }

    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"database_info".to_string()));
        assert!(tables.contains(&"object_stores".to_string()));
        assert_eq!(read_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        assert_eq!(layout_version(&conn).unwrap(), CURRENT_LAYOUT);
    }

    #[test]
    fn test_newer_layout_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", CURRENT_LAYOUT + 1)
            .unwrap();
        assert!(matches!(migrate(&mut conn), Err(HostError::InvalidState(_))));
    }

    #[test]
    fn test_upgrade_rejects_existing_store() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        apply_upgrade(&conn, 1, &["store".to_string()]).unwrap();
        assert_eq!(read_version(&conn).unwrap(), 1);
        assert_eq!(store_names(&conn).unwrap(), vec!["store".to_string()]);
        assert!(store_table(&conn, "store").unwrap().is_some());

        let err = apply_upgrade(&conn, 2, &["store".to_string()]).unwrap_err();
        assert!(matches!(err, HostError::Constraint(_)));
    }
}
