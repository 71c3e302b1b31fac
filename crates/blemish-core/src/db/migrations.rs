//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: entities and the pending-operation queue
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY
         );
         CREATE TABLE IF NOT EXISTS sessions (
             id TEXT PRIMARY KEY,
             server_id INTEGER,
             product_id INTEGER NOT NULL,
             workstation_id INTEGER NOT NULL,
             inspector TEXT NOT NULL,
             status TEXT NOT NULL,
             active_seconds INTEGER NOT NULL DEFAULT 0,
             created_at INTEGER NOT NULL,
             updated_at INTEGER NOT NULL,
             sync_status TEXT NOT NULL DEFAULT 'pending'
         );
         CREATE INDEX IF NOT EXISTS idx_sessions_created ON sessions(created_at DESC);
         CREATE INDEX IF NOT EXISTS idx_sessions_sync ON sessions(sync_status);
         CREATE TABLE IF NOT EXISTS items (
             id TEXT PRIMARY KEY,
             server_id INTEGER,
             session_id TEXT NOT NULL REFERENCES sessions(id),
             session_server_id INTEGER,
             seq INTEGER NOT NULL,
             status TEXT NOT NULL,
             created_at INTEGER NOT NULL,
             sync_status TEXT NOT NULL DEFAULT 'pending'
         );
         CREATE INDEX IF NOT EXISTS idx_items_session ON items(session_id);
         CREATE INDEX IF NOT EXISTS idx_items_sync ON items(sync_status);
         CREATE TABLE IF NOT EXISTS defects (
             id TEXT PRIMARY KEY,
             server_id INTEGER,
             item_id TEXT NOT NULL REFERENCES items(id),
             item_server_id INTEGER,
             defect_type_id INTEGER NOT NULL,
             x REAL NOT NULL,
             y REAL NOT NULL,
             severity TEXT,
             note TEXT,
             created_at INTEGER NOT NULL,
             is_deleted INTEGER NOT NULL DEFAULT 0,
             sync_status TEXT NOT NULL DEFAULT 'pending'
         );
         CREATE INDEX IF NOT EXISTS idx_defects_item ON defects(item_id);
         CREATE INDEX IF NOT EXISTS idx_defects_sync ON defects(sync_status);
         CREATE TABLE IF NOT EXISTS sync_queue (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             kind TEXT NOT NULL,
             entity TEXT NOT NULL,
             local_id TEXT NOT NULL,
             server_id INTEGER,
             payload TEXT NOT NULL,
             created_at INTEGER NOT NULL,
             attempts INTEGER NOT NULL DEFAULT 0,
             last_error TEXT
         );
         CREATE INDEX IF NOT EXISTS idx_sync_queue_created ON sync_queue(created_at ASC);
         INSERT INTO schema_version (version) VALUES (1);
         COMMIT;",
    )?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: cached reference catalogs
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
         CREATE TABLE IF NOT EXISTS products (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             template_ref TEXT
         );
         CREATE TABLE IF NOT EXISTS workstations (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL
         );
         CREATE TABLE IF NOT EXISTS defect_types (
             id INTEGER PRIMARY KEY,
             label TEXT NOT NULL,
             color TEXT
         );
         INSERT INTO schema_version (version) VALUES (2);
         COMMIT;",
    )?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
