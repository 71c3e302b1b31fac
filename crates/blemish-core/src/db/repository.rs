//! Entity repository implementations
//!
//! Collections are keyed by local identifier; the server identifier is a
//! plain column because it may be absent until the creating operation
//! replays.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{
    Defect, DefectId, InspectionItem, ItemId, ServerId, Session, SessionId, SessionStatus,
    SyncStatus,
};

/// Map a stored string column back to its typed form inside a row closure
fn column_parse<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Trait for session storage operations
pub trait SessionRepository {
    /// Insert a freshly created session
    fn insert(&self, session: &Session) -> Result<()>;

    /// Get a session by local ID
    fn get(&self, id: &SessionId) -> Result<Option<Session>>;

    /// List sessions, newest first
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Session>>;

    /// Change lifecycle status
    fn set_status(&self, id: &SessionId, status: SessionStatus, updated_at: i64) -> Result<()>;

    /// Add to the accumulated active-time counter
    fn add_active_seconds(&self, id: &SessionId, seconds: i64, updated_at: i64) -> Result<()>;

    /// Record the server identifier and mark the session synced
    fn bind_server_id(&self, id: &SessionId, server_id: ServerId) -> Result<()>;

    /// Look up the server identifier, if already assigned
    fn server_id(&self, id: &SessionId) -> Result<Option<ServerId>>;

    /// Overwrite the sync status
    fn set_sync_status(&self, id: &SessionId, status: SyncStatus) -> Result<()>;

    /// Count sessions in the given sync status
    fn count_by_sync_status(&self, status: SyncStatus) -> Result<usize>;
}

/// `SQLite` implementation of `SessionRepository`
pub struct SqliteSessionRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSessionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
        let id: String = row.get(0)?;
        let status: String = row.get(5)?;
        let sync_status: String = row.get(9)?;
        Ok(Session {
            id: column_parse(0, &id)?,
            server_id: row.get(1)?,
            product_id: row.get(2)?,
            workstation_id: row.get(3)?,
            inspector: row.get(4)?,
            status: column_parse(5, &status)?,
            active_seconds: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            sync_status: column_parse(9, &sync_status)?,
        })
    }
}

const SESSION_COLUMNS: &str = "id, server_id, product_id, workstation_id, inspector, status, \
                               active_seconds, created_at, updated_at, sync_status";

impl SessionRepository for SqliteSessionRepository<'_> {
    fn insert(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, server_id, product_id, workstation_id, inspector, status,
                                   active_seconds, created_at, updated_at, sync_status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                session.id.as_str(),
                session.server_id,
                session.product_id,
                session.workstation_id,
                session.inspector,
                session.status.as_str(),
                session.active_seconds,
                session.created_at,
                session.updated_at,
                session.sync_status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &SessionId) -> Result<Option<Session>> {
        let result = self.conn.query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"),
            params![id.as_str()],
            Self::parse_session,
        );

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             ORDER BY created_at DESC
             LIMIT ? OFFSET ?"
        ))?;

        let sessions = stmt
            .query_map(params![limit as i64, offset as i64], Self::parse_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }

    fn set_status(&self, id: &SessionId, status: SessionStatus, updated_at: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE sessions SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), updated_at, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn add_active_seconds(&self, id: &SessionId, seconds: i64, updated_at: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE sessions SET active_seconds = active_seconds + ?, updated_at = ?
             WHERE id = ?",
            params![seconds, updated_at, id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn bind_server_id(&self, id: &SessionId, server_id: ServerId) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE sessions SET server_id = ?, sync_status = ? WHERE id = ?",
            params![server_id, SyncStatus::Synced.as_str(), id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn server_id(&self, id: &SessionId) -> Result<Option<ServerId>> {
        let result = self.conn.query_row(
            "SELECT server_id FROM sessions WHERE id = ?",
            params![id.as_str()],
            |row| row.get::<_, Option<ServerId>>(0),
        );

        match result {
            Ok(server_id) => Ok(server_id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_sync_status(&self, id: &SessionId, status: SyncStatus) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE sessions SET sync_status = ? WHERE id = ?",
            params![status.as_str(), id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn count_by_sync_status(&self, status: SyncStatus) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE sync_status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// Trait for inspected-item storage operations
pub trait ItemRepository {
    /// Insert a freshly created item
    fn insert(&self, item: &InspectionItem) -> Result<()>;

    /// Get an item by local ID
    fn get(&self, id: &ItemId) -> Result<Option<InspectionItem>>;

    /// List items of a session in sequence order
    fn list_for_session(&self, session_id: &SessionId) -> Result<Vec<InspectionItem>>;

    /// Next monotonic sequence number within a session
    fn next_seq(&self, session_id: &SessionId) -> Result<i64>;

    /// Record the server identifier (and the parent's, when resolved) and
    /// mark the item synced
    fn bind_server_id(
        &self,
        id: &ItemId,
        server_id: ServerId,
        session_server_id: Option<ServerId>,
    ) -> Result<()>;

    /// Look up the server identifier, if already assigned
    fn server_id(&self, id: &ItemId) -> Result<Option<ServerId>>;

    /// Overwrite the sync status
    fn set_sync_status(&self, id: &ItemId, status: SyncStatus) -> Result<()>;

    /// Count items in the given sync status
    fn count_by_sync_status(&self, status: SyncStatus) -> Result<usize>;
}

/// `SQLite` implementation of `ItemRepository`
pub struct SqliteItemRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteItemRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<InspectionItem> {
        let id: String = row.get(0)?;
        let session_id: String = row.get(2)?;
        let status: String = row.get(5)?;
        let sync_status: String = row.get(7)?;
        Ok(InspectionItem {
            id: column_parse(0, &id)?,
            server_id: row.get(1)?,
            session_id: column_parse(2, &session_id)?,
            session_server_id: row.get(3)?,
            seq: row.get(4)?,
            status: column_parse(5, &status)?,
            created_at: row.get(6)?,
            sync_status: column_parse(7, &sync_status)?,
        })
    }
}

const ITEM_COLUMNS: &str =
    "id, server_id, session_id, session_server_id, seq, status, created_at, sync_status";

impl ItemRepository for SqliteItemRepository<'_> {
    fn insert(&self, item: &InspectionItem) -> Result<()> {
        self.conn.execute(
            "INSERT INTO items (id, server_id, session_id, session_server_id, seq, status,
                                created_at, sync_status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                item.id.as_str(),
                item.server_id,
                item.session_id.as_str(),
                item.session_server_id,
                item.seq,
                item.status.as_str(),
                item.created_at,
                item.sync_status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &ItemId) -> Result<Option<InspectionItem>> {
        let result = self.conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"),
            params![id.as_str()],
            Self::parse_item,
        );

        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_for_session(&self, session_id: &SessionId) -> Result<Vec<InspectionItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE session_id = ? ORDER BY seq ASC"
        ))?;

        let items = stmt
            .query_map(params![session_id.as_str()], Self::parse_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn next_seq(&self, session_id: &SessionId) -> Result<i64> {
        let max: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM items WHERE session_id = ?",
            params![session_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(max + 1)
    }

    fn bind_server_id(
        &self,
        id: &ItemId,
        server_id: ServerId,
        session_server_id: Option<ServerId>,
    ) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE items SET server_id = ?,
                              session_server_id = COALESCE(?, session_server_id),
                              sync_status = ?
             WHERE id = ?",
            params![
                server_id,
                session_server_id,
                SyncStatus::Synced.as_str(),
                id.as_str()
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn server_id(&self, id: &ItemId) -> Result<Option<ServerId>> {
        let result = self.conn.query_row(
            "SELECT server_id FROM items WHERE id = ?",
            params![id.as_str()],
            |row| row.get::<_, Option<ServerId>>(0),
        );

        match result {
            Ok(server_id) => Ok(server_id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_sync_status(&self, id: &ItemId, status: SyncStatus) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE items SET sync_status = ? WHERE id = ?",
            params![status.as_str(), id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn count_by_sync_status(&self, status: SyncStatus) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE sync_status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// Trait for defect-mark storage operations
pub trait DefectRepository {
    /// Insert a freshly marked defect
    fn insert(&self, defect: &Defect) -> Result<()>;

    /// Get a defect by local ID (tombstoned defects included)
    fn get(&self, id: &DefectId) -> Result<Option<Defect>>;

    /// List live defects of an item, oldest first
    fn list_for_item(&self, item_id: &ItemId) -> Result<Vec<Defect>>;

    /// Record the server identifier (and the parent's, when resolved) and
    /// mark the defect synced
    fn bind_server_id(
        &self,
        id: &DefectId,
        server_id: ServerId,
        item_server_id: Option<ServerId>,
    ) -> Result<()>;

    /// Tombstone a defect locally; removal on the server is replayed
    /// through the queue
    fn soft_delete(&self, id: &DefectId) -> Result<()>;

    /// Look up the server identifier, if already assigned
    fn server_id(&self, id: &DefectId) -> Result<Option<ServerId>>;

    /// Overwrite the sync status
    fn set_sync_status(&self, id: &DefectId, status: SyncStatus) -> Result<()>;

    /// Count live defects in the given sync status
    fn count_by_sync_status(&self, status: SyncStatus) -> Result<usize>;
}

/// `SQLite` implementation of `DefectRepository`
pub struct SqliteDefectRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDefectRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_defect(row: &rusqlite::Row<'_>) -> rusqlite::Result<Defect> {
        let id: String = row.get(0)?;
        let item_id: String = row.get(2)?;
        let severity: Option<String> = row.get(7)?;
        let sync_status: String = row.get(10)?;
        Ok(Defect {
            id: column_parse(0, &id)?,
            server_id: row.get(1)?,
            item_id: column_parse(2, &item_id)?,
            item_server_id: row.get(3)?,
            defect_type_id: row.get(4)?,
            x: row.get(5)?,
            y: row.get(6)?,
            severity: severity.as_deref().map(|s| column_parse(7, s)).transpose()?,
            note: row.get(8)?,
            created_at: row.get(9)?,
            sync_status: column_parse(10, &sync_status)?,
        })
    }
}

const DEFECT_COLUMNS: &str = "id, server_id, item_id, item_server_id, defect_type_id, x, y, \
                              severity, note, created_at, sync_status";

impl DefectRepository for SqliteDefectRepository<'_> {
    fn insert(&self, defect: &Defect) -> Result<()> {
        self.conn.execute(
            "INSERT INTO defects (id, server_id, item_id, item_server_id, defect_type_id,
                                  x, y, severity, note, created_at, sync_status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                defect.id.as_str(),
                defect.server_id,
                defect.item_id.as_str(),
                defect.item_server_id,
                defect.defect_type_id,
                defect.x,
                defect.y,
                defect.severity.map(crate::models::Severity::as_str),
                defect.note,
                defect.created_at,
                defect.sync_status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &DefectId) -> Result<Option<Defect>> {
        let result = self.conn.query_row(
            &format!("SELECT {DEFECT_COLUMNS} FROM defects WHERE id = ?"),
            params![id.as_str()],
            Self::parse_defect,
        );

        match result {
            Ok(defect) => Ok(Some(defect)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_for_item(&self, item_id: &ItemId) -> Result<Vec<Defect>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DEFECT_COLUMNS} FROM defects
             WHERE item_id = ? AND is_deleted = 0
             ORDER BY created_at ASC"
        ))?;

        let defects = stmt
            .query_map(params![item_id.as_str()], Self::parse_defect)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(defects)
    }

    fn bind_server_id(
        &self,
        id: &DefectId,
        server_id: ServerId,
        item_server_id: Option<ServerId>,
    ) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE defects SET server_id = ?,
                                item_server_id = COALESCE(?, item_server_id),
                                sync_status = ?
             WHERE id = ?",
            params![
                server_id,
                item_server_id,
                SyncStatus::Synced.as_str(),
                id.as_str()
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn soft_delete(&self, id: &DefectId) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE defects SET is_deleted = 1 WHERE id = ?",
            params![id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn server_id(&self, id: &DefectId) -> Result<Option<ServerId>> {
        let result = self.conn.query_row(
            "SELECT server_id FROM defects WHERE id = ?",
            params![id.as_str()],
            |row| row.get::<_, Option<ServerId>>(0),
        );

        match result {
            Ok(server_id) => Ok(server_id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_sync_status(&self, id: &DefectId, status: SyncStatus) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE defects SET sync_status = ? WHERE id = ?",
            params![status.as_str(), id.as_str()],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn count_by_sync_status(&self, status: SyncStatus) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM defects WHERE sync_status = ? AND is_deleted = 0",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// Trait for cached reference-catalog operations
pub trait CatalogRepository {
    /// Replace the cached product catalog wholesale
    fn replace_products(&self, products: &[crate::models::Product]) -> Result<()>;

    /// Replace the cached workstation catalog wholesale
    fn replace_workstations(&self, workstations: &[crate::models::Workstation]) -> Result<()>;

    /// Replace the cached defect-type catalog wholesale
    fn replace_defect_types(&self, defect_types: &[crate::models::DefectType]) -> Result<()>;

    /// List cached products
    fn list_products(&self) -> Result<Vec<crate::models::Product>>;

    /// List cached workstations
    fn list_workstations(&self) -> Result<Vec<crate::models::Workstation>>;

    /// List cached defect types
    fn list_defect_types(&self) -> Result<Vec<crate::models::DefectType>>;
}

/// `SQLite` implementation of `CatalogRepository`
pub struct SqliteCatalogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatalogRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn replace_products(&self, products: &[crate::models::Product]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM products", [])?;
        for product in products {
            tx.execute(
                "INSERT INTO products (id, name, template_ref) VALUES (?, ?, ?)",
                params![product.id, product.name, product.template_ref],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn replace_workstations(&self, workstations: &[crate::models::Workstation]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM workstations", [])?;
        for workstation in workstations {
            tx.execute(
                "INSERT INTO workstations (id, name) VALUES (?, ?)",
                params![workstation.id, workstation.name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn replace_defect_types(&self, defect_types: &[crate::models::DefectType]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM defect_types", [])?;
        for defect_type in defect_types {
            tx.execute(
                "INSERT INTO defect_types (id, label, color) VALUES (?, ?, ?)",
                params![defect_type.id, defect_type.label, defect_type.color],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_products(&self) -> Result<Vec<crate::models::Product>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, template_ref FROM products ORDER BY name ASC")?;
        let products = stmt
            .query_map([], |row| {
                Ok(crate::models::Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    template_ref: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    fn list_workstations(&self) -> Result<Vec<crate::models::Workstation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM workstations ORDER BY name ASC")?;
        let workstations = stmt
            .query_map([], |row| {
                Ok(crate::models::Workstation {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(workstations)
    }

    fn list_defect_types(&self) -> Result<Vec<crate::models::DefectType>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, label, color FROM defect_types ORDER BY label ASC")?;
        let defect_types = stmt
            .query_map([], |row| {
                Ok(crate::models::DefectType {
                    id: row.get(0)?,
                    label: row.get(1)?,
                    color: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(defect_types)
    }
}
