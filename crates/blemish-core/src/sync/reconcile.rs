//! Local/server identity reconciliation
//!
//! Local records are created under client-generated identifiers; once a
//! CREATE replays, the server's identifier is written back onto the row and
//! the record flips to `synced`. Server identifiers live on the entity rows
//! themselves, so resolution survives restarts without a separate mapping
//! table.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{
    Database, DefectRepository, ItemRepository, SessionRepository, SqliteDefectRepository,
    SqliteItemRepository, SqliteSessionRepository,
};
use crate::error::{Error, Result};
use crate::models::{DefectId, EntityKind, ItemId, ServerId, SessionId, SyncStatus};

/// Binds and resolves local-to-server identifier mappings
#[derive(Clone)]
pub struct IdentityReconciler {
    db: Arc<Mutex<Database>>,
}

fn parse_local_id<T: std::str::FromStr<Err = uuid::Error>>(local_id: &str) -> Result<T> {
    local_id
        .parse()
        .map_err(|_| Error::InvalidInput(format!("malformed local id: {local_id}")))
}

impl IdentityReconciler {
    pub(crate) const fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Record a server identifier for a locally-created entity and mark it
    /// synced. For child entities the parent's resolved server identifier
    /// is persisted alongside.
    pub async fn bind(
        &self,
        entity: EntityKind,
        local_id: &str,
        server_id: ServerId,
        parent_server_id: Option<ServerId>,
    ) -> Result<()> {
        let db = self.db.lock().await;
        match entity {
            EntityKind::Session => {
                let id: SessionId = parse_local_id(local_id)?;
                SqliteSessionRepository::new(db.connection()).bind_server_id(&id, server_id)?;
            }
            EntityKind::Item => {
                let id: ItemId = parse_local_id(local_id)?;
                SqliteItemRepository::new(db.connection()).bind_server_id(
                    &id,
                    server_id,
                    parent_server_id,
                )?;
            }
            EntityKind::Defect => {
                let id: DefectId = parse_local_id(local_id)?;
                SqliteDefectRepository::new(db.connection()).bind_server_id(
                    &id,
                    server_id,
                    parent_server_id,
                )?;
            }
        }
        tracing::debug!(entity = entity.as_str(), local_id, server_id, "bound identity");
        Ok(())
    }

    /// Look up the server identifier for a local entity, if its CREATE has
    /// already replayed
    pub async fn resolve(&self, entity: EntityKind, local_id: &str) -> Result<Option<ServerId>> {
        let db = self.db.lock().await;
        match entity {
            EntityKind::Session => {
                let id: SessionId = parse_local_id(local_id)?;
                SqliteSessionRepository::new(db.connection()).server_id(&id)
            }
            EntityKind::Item => {
                let id: ItemId = parse_local_id(local_id)?;
                SqliteItemRepository::new(db.connection()).server_id(&id)
            }
            EntityKind::Defect => {
                let id: DefectId = parse_local_id(local_id)?;
                SqliteDefectRepository::new(db.connection()).server_id(&id)
            }
        }
    }

    /// Overwrite an entity's sync status after a replay outcome
    pub async fn set_sync_status(
        &self,
        entity: EntityKind,
        local_id: &str,
        status: SyncStatus,
    ) -> Result<()> {
        let db = self.db.lock().await;
        match entity {
            EntityKind::Session => {
                let id: SessionId = parse_local_id(local_id)?;
                SqliteSessionRepository::new(db.connection()).set_sync_status(&id, status)
            }
            EntityKind::Item => {
                let id: ItemId = parse_local_id(local_id)?;
                SqliteItemRepository::new(db.connection()).set_sync_status(&id, status)
            }
            EntityKind::Defect => {
                let id: DefectId = parse_local_id(local_id)?;
                SqliteDefectRepository::new(db.connection()).set_sync_status(&id, status)
            }
        }
    }
}
