//! Pending-operation queue
//!
//! An ordered, durable log of mutations awaiting replay against the server.
//! Replay order is ascending enqueue timestamp across all entity kinds, so
//! causal ordering between parents and children falls out of the ordering
//! alone.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{EntityKind, OpKind, ServerId, SyncOperation, MAX_ATTEMPTS};

/// Trait for queue storage operations
pub trait OperationQueue {
    /// Append an operation with attempt count 0. Never fails for domain
    /// reasons; this is a local write only.
    fn enqueue(
        &self,
        kind: OpKind,
        entity: EntityKind,
        local_id: &str,
        payload: &serde_json::Value,
        server_id: Option<ServerId>,
    ) -> Result<SyncOperation>;

    /// All pending operations, oldest first. Re-read every drain cycle
    /// rather than cached; operations may be appended mid-drain.
    fn peek_all_ordered(&self) -> Result<Vec<SyncOperation>>;

    /// Record a failed attempt. Once the attempt count reaches the ceiling
    /// the operation is permanently dropped; returns whether that happened.
    fn mark_attempt_failed(&self, op_id: i64, error: &str) -> Result<bool>;

    /// Remove an operation after a successful replay
    fn remove(&self, op_id: i64) -> Result<()>;

    /// Number of pending operations
    fn count(&self) -> Result<usize>;
}

/// `SQLite` implementation of `OperationQueue`
pub struct SqliteOperationQueue<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteOperationQueue<'a> {
    /// Create a new queue over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_operation(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncOperation> {
        let kind: String = row.get(1)?;
        let entity: String = row.get(2)?;
        Ok(SyncOperation {
            id: row.get(0)?,
            kind: kind.parse().map_err(|e: Error| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            entity: entity.parse().map_err(|e: Error| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            local_id: row.get(3)?,
            server_id: row.get(4)?,
            payload: row.get(5)?,
            created_at: row.get(6)?,
            attempts: row.get(7)?,
            last_error: row.get(8)?,
        })
    }
}

impl OperationQueue for SqliteOperationQueue<'_> {
    fn enqueue(
        &self,
        kind: OpKind,
        entity: EntityKind,
        local_id: &str,
        payload: &serde_json::Value,
        server_id: Option<ServerId>,
    ) -> Result<SyncOperation> {
        let created_at = chrono::Utc::now().timestamp_millis();
        self.conn.execute(
            "INSERT INTO sync_queue (kind, entity, local_id, server_id, payload, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                kind.as_str(),
                entity.as_str(),
                local_id,
                server_id,
                payload,
                created_at
            ],
        )?;

        Ok(SyncOperation {
            id: self.conn.last_insert_rowid(),
            kind,
            entity,
            local_id: local_id.to_string(),
            server_id,
            payload: payload.clone(),
            created_at,
            attempts: 0,
            last_error: None,
        })
    }

    fn peek_all_ordered(&self) -> Result<Vec<SyncOperation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, entity, local_id, server_id, payload, created_at, attempts, last_error
             FROM sync_queue
             ORDER BY created_at ASC, id ASC",
        )?;

        let operations = stmt
            .query_map([], Self::parse_operation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(operations)
    }

    fn mark_attempt_failed(&self, op_id: i64, error: &str) -> Result<bool> {
        let attempts: Option<u32> = self
            .conn
            .query_row(
                "UPDATE sync_queue SET attempts = attempts + 1, last_error = ?
                 WHERE id = ?
                 RETURNING attempts",
                params![error, op_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(attempts) = attempts else {
            return Err(Error::NotFound(format!("queue operation {op_id}")));
        };

        if attempts >= MAX_ATTEMPTS {
            self.remove(op_id)?;
            tracing::warn!(op_id, attempts, "operation dropped after retry ceiling");
            return Ok(true);
        }
        Ok(false)
    }

    fn remove(&self, op_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?", params![op_id])?;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
