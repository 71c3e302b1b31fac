//! Shared inspection service wrapper used across clients.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{watch, Mutex, Notify};

use crate::db::{
    CatalogRepository, Database, DefectRepository, ItemRepository, OperationQueue,
    SessionRepository, SqliteCatalogRepository, SqliteDefectRepository, SqliteItemRepository,
    SqliteOperationQueue, SqliteSessionRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    Defect, DefectId, DefectType, EntityKind, InspectionItem, ItemId, ItemStatus, OpKind, Product,
    ServerId, Session, SessionId, SessionStatus, Severity, SyncOperation, SyncStatus, Workstation,
};
use crate::sync::IdentityReconciler;

/// Aggregate sync-state tallies surfaced to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncCounts {
    /// Operations waiting in the queue
    pub queued_operations: usize,
    /// Entities not yet replayed
    pub pending: usize,
    /// Entities whose latest replay attempt failed
    pub error: usize,
    /// Entities reflected to the server
    pub synced: usize,
}

/// Thread-safe facade over the local store and the pending-operation queue.
///
/// Every mutating call follows the same path: write the entity locally with
/// a pending sync status, append the matching operation to the queue, then
/// nudge the sync engine. Each write commits independently.
#[derive(Clone)]
pub struct InspectionService {
    db: Arc<Mutex<Database>>,
    pending: Arc<watch::Sender<usize>>,
    wake: Arc<Notify>,
}

impl InspectionService {
    /// Open the service over a database file at the given path
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_database(Database::open(db_path)?)
    }

    /// Open an in-memory service (primarily for tests)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_database(Database::open_in_memory()?)
    }

    fn from_database(db: Database) -> Result<Self> {
        let initial = SqliteOperationQueue::new(db.connection()).count()?;
        let (pending, _) = watch::channel(initial);
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            pending: Arc::new(pending),
            wake: Arc::new(Notify::new()),
        })
    }

    /// Identity reconciler sharing this service's database
    #[must_use]
    pub fn reconciler(&self) -> IdentityReconciler {
        IdentityReconciler::new(self.db.clone())
    }

    /// Observable count of queued operations
    #[must_use]
    pub fn subscribe_pending(&self) -> watch::Receiver<usize> {
        self.pending.subscribe()
    }

    /// Signal fired on every enqueue; the sync engine's run loop waits on it
    #[must_use]
    pub fn drain_signal(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    async fn enqueue(
        &self,
        kind: OpKind,
        entity: EntityKind,
        local_id: &str,
        payload: Value,
        server_id: Option<ServerId>,
    ) -> Result<()> {
        {
            let db = self.db.lock().await;
            let queue = SqliteOperationQueue::new(db.connection());
            queue.enqueue(kind, entity, local_id, &payload, server_id)?;
            self.pending.send_replace(queue.count()?);
        }
        self.wake.notify_one();
        Ok(())
    }

    // --- sessions ---

    /// Start a new inspection session
    pub async fn start_session(
        &self,
        product_id: ServerId,
        workstation_id: ServerId,
        inspector: impl Into<String>,
    ) -> Result<Session> {
        let session = Session::new(product_id, workstation_id, inspector);
        {
            let db = self.db.lock().await;
            SqliteSessionRepository::new(db.connection()).insert(&session)?;
        }
        self.enqueue(
            OpKind::Create,
            EntityKind::Session,
            &session.id.as_str(),
            json!({
                "product_id": session.product_id,
                "workstation_id": session.workstation_id,
                "inspector": session.inspector,
                "status": session.status,
                "started_at": session.created_at,
            }),
            None,
        )
        .await?;
        Ok(session)
    }

    async fn transition_session(&self, id: &SessionId, status: SessionStatus) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let server_id = {
            let db = self.db.lock().await;
            let repo = SqliteSessionRepository::new(db.connection());
            repo.set_status(id, status, now)?;
            repo.set_sync_status(id, SyncStatus::Pending)?;
            repo.server_id(id)?
        };
        self.enqueue(
            OpKind::Update,
            EntityKind::Session,
            &id.as_str(),
            json!({ "status": status }),
            server_id,
        )
        .await
    }

    /// Pause an open session
    pub async fn pause_session(&self, id: &SessionId) -> Result<()> {
        self.transition_session(id, SessionStatus::Paused).await
    }

    /// Resume a paused session
    pub async fn resume_session(&self, id: &SessionId) -> Result<()> {
        self.transition_session(id, SessionStatus::Open).await
    }

    /// Close a session
    pub async fn close_session(&self, id: &SessionId) -> Result<()> {
        self.transition_session(id, SessionStatus::Closed).await
    }

    /// Add to a session's accumulated active time
    pub async fn record_active_time(&self, id: &SessionId, seconds: i64) -> Result<()> {
        if seconds <= 0 {
            return Err(Error::InvalidInput(
                "active time delta must be positive".to_string(),
            ));
        }
        let now = chrono::Utc::now().timestamp_millis();
        let (total, server_id) = {
            let db = self.db.lock().await;
            let repo = SqliteSessionRepository::new(db.connection());
            repo.add_active_seconds(id, seconds, now)?;
            repo.set_sync_status(id, SyncStatus::Pending)?;
            let session = repo
                .get(id)?
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            (session.active_seconds, session.server_id)
        };
        self.enqueue(
            OpKind::Update,
            EntityKind::Session,
            &id.as_str(),
            json!({ "active_seconds": total }),
            server_id,
        )
        .await
    }

    /// Fetch a session by local ID
    pub async fn get_session(&self, id: &SessionId) -> Result<Option<Session>> {
        let db = self.db.lock().await;
        SqliteSessionRepository::new(db.connection()).get(id)
    }

    /// List sessions, newest first
    pub async fn list_sessions(&self, limit: usize, offset: usize) -> Result<Vec<Session>> {
        let db = self.db.lock().await;
        SqliteSessionRepository::new(db.connection()).list(limit, offset)
    }

    // --- items ---

    /// Advance to the next inspected unit within a session
    pub async fn advance_item(
        &self,
        session_id: &SessionId,
        status: ItemStatus,
    ) -> Result<InspectionItem> {
        let item = {
            let db = self.db.lock().await;
            let sessions = SqliteSessionRepository::new(db.connection());
            sessions
                .get(session_id)?
                .ok_or_else(|| Error::NotFound(session_id.to_string()))?;
            let items = SqliteItemRepository::new(db.connection());
            let item = InspectionItem::new(*session_id, items.next_seq(session_id)?, status);
            items.insert(&item)?;
            item
        };
        self.enqueue(
            OpKind::Create,
            EntityKind::Item,
            &item.id.as_str(),
            json!({
                "session_ref": item.session_id.as_str(),
                "seq": item.seq,
                "status": item.status,
            }),
            None,
        )
        .await?;
        Ok(item)
    }

    /// Fetch an item by local ID
    pub async fn get_item(&self, id: &ItemId) -> Result<Option<InspectionItem>> {
        let db = self.db.lock().await;
        SqliteItemRepository::new(db.connection()).get(id)
    }

    /// List a session's items in sequence order
    pub async fn list_items(&self, session_id: &SessionId) -> Result<Vec<InspectionItem>> {
        let db = self.db.lock().await;
        SqliteItemRepository::new(db.connection()).list_for_session(session_id)
    }

    // --- defects ---

    /// Mark a defect on an item at a normalized template position
    pub async fn mark_defect(
        &self,
        item_id: &ItemId,
        defect_type_id: ServerId,
        x: f64,
        y: f64,
        severity: Option<Severity>,
        note: Option<String>,
    ) -> Result<Defect> {
        let mut defect = Defect::new(*item_id, defect_type_id, x, y)?;
        defect.severity = severity;
        defect.note = note;

        {
            let db = self.db.lock().await;
            let items = SqliteItemRepository::new(db.connection());
            items
                .get(item_id)?
                .ok_or_else(|| Error::NotFound(item_id.to_string()))?;
            SqliteDefectRepository::new(db.connection()).insert(&defect)?;
        }

        let mut payload = json!({
            "item_ref": defect.item_id.as_str(),
            "defect_type_id": defect.defect_type_id,
            "x": defect.x,
            "y": defect.y,
        });
        if let Some(severity) = defect.severity {
            payload["severity"] = json!(severity);
        }
        if let Some(note) = &defect.note {
            payload["note"] = json!(note);
        }

        self.enqueue(
            OpKind::Create,
            EntityKind::Defect,
            &defect.id.as_str(),
            payload,
            None,
        )
        .await?;
        Ok(defect)
    }

    /// Tombstone a defect locally and queue its deletion on the server
    pub async fn delete_defect(&self, id: &DefectId) -> Result<()> {
        let server_id = {
            let db = self.db.lock().await;
            let repo = SqliteDefectRepository::new(db.connection());
            repo.soft_delete(id)?;
            repo.server_id(id)?
        };
        self.enqueue(
            OpKind::Delete,
            EntityKind::Defect,
            &id.as_str(),
            json!({}),
            server_id,
        )
        .await
    }

    /// List an item's live defects
    pub async fn list_defects(&self, item_id: &ItemId) -> Result<Vec<Defect>> {
        let db = self.db.lock().await;
        SqliteDefectRepository::new(db.connection()).list_for_item(item_id)
    }

    /// Fetch a defect by local ID
    pub async fn get_defect(&self, id: &DefectId) -> Result<Option<Defect>> {
        let db = self.db.lock().await;
        SqliteDefectRepository::new(db.connection()).get(id)
    }

    // --- reference catalogs ---

    /// Replace all cached reference catalogs with fresh server copies
    pub async fn replace_catalogs(
        &self,
        products: &[Product],
        workstations: &[Workstation],
        defect_types: &[DefectType],
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = SqliteCatalogRepository::new(db.connection());
        repo.replace_products(products)?;
        repo.replace_workstations(workstations)?;
        repo.replace_defect_types(defect_types)?;
        Ok(())
    }

    /// List cached products
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let db = self.db.lock().await;
        SqliteCatalogRepository::new(db.connection()).list_products()
    }

    /// List cached workstations
    pub async fn list_workstations(&self) -> Result<Vec<Workstation>> {
        let db = self.db.lock().await;
        SqliteCatalogRepository::new(db.connection()).list_workstations()
    }

    /// List cached defect types
    pub async fn list_defect_types(&self) -> Result<Vec<DefectType>> {
        let db = self.db.lock().await;
        SqliteCatalogRepository::new(db.connection()).list_defect_types()
    }

    // --- queue access for the sync engine ---

    /// Current number of queued operations
    pub async fn pending_count(&self) -> Result<usize> {
        let db = self.db.lock().await;
        SqliteOperationQueue::new(db.connection()).count()
    }

    /// Snapshot of all queued operations, oldest first
    pub async fn peek_operations(&self) -> Result<Vec<SyncOperation>> {
        let db = self.db.lock().await;
        SqliteOperationQueue::new(db.connection()).peek_all_ordered()
    }

    /// Remove an operation after a successful replay
    pub async fn remove_operation(&self, op_id: i64) -> Result<()> {
        let db = self.db.lock().await;
        let queue = SqliteOperationQueue::new(db.connection());
        queue.remove(op_id)?;
        self.pending.send_replace(queue.count()?);
        Ok(())
    }

    /// Record a failed replay attempt; returns whether the operation hit
    /// the retry ceiling and was dropped
    pub async fn mark_operation_failed(&self, op_id: i64, error: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let queue = SqliteOperationQueue::new(db.connection());
        let dropped = queue.mark_attempt_failed(op_id, error)?;
        self.pending.send_replace(queue.count()?);
        Ok(dropped)
    }

    /// Re-read the pending count and publish it to subscribers
    pub async fn refresh_pending(&self) -> Result<usize> {
        let count = self.pending_count().await?;
        self.pending.send_replace(count);
        Ok(count)
    }

    /// Aggregate sync tallies across all entity kinds
    pub async fn sync_counts(&self) -> Result<SyncCounts> {
        let db = self.db.lock().await;
        let sessions = SqliteSessionRepository::new(db.connection());
        let items = SqliteItemRepository::new(db.connection());
        let defects = SqliteDefectRepository::new(db.connection());

        let mut counts = SyncCounts {
            queued_operations: SqliteOperationQueue::new(db.connection()).count()?,
            ..SyncCounts::default()
        };
        for status in [SyncStatus::Pending, SyncStatus::Error, SyncStatus::Synced] {
            let total = sessions.count_by_sync_status(status)?
                + items.count_by_sync_status(status)?
                + defects.count_by_sync_status(status)?;
            match status {
                SyncStatus::Pending => counts.pending = total,
                SyncStatus::Error => counts.error = total,
                SyncStatus::Synced => counts.synced = total,
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_start_session_writes_pending_and_enqueues() {
        let service = InspectionService::open_in_memory().unwrap();

        let session = service.start_session(7, 3, "inspector-1").await.unwrap();

        let stored = service.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Pending);

        let ops = service.peek_operations().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, OpKind::Create);
        assert_eq!(ops[0].entity, EntityKind::Session);
        assert_eq!(ops[0].local_id, session.id.as_str());
        assert_eq!(*service.subscribe_pending().borrow(), 1);
    }

    #[tokio::test]
    async fn test_full_flow_enqueues_in_causal_order() {
        let service = InspectionService::open_in_memory().unwrap();

        let session = service.start_session(7, 3, "inspector-1").await.unwrap();
        let item = service
            .advance_item(&session.id, ItemStatus::Defective)
            .await
            .unwrap();
        let defect = service
            .mark_defect(&item.id, 12, 0.4, 0.6, Some(Severity::Major), None)
            .await
            .unwrap();

        let ops = service.peek_operations().await.unwrap();
        let targets: Vec<(EntityKind, String)> = ops
            .iter()
            .map(|op| (op.entity, op.local_id.clone()))
            .collect();
        assert_eq!(
            targets,
            vec![
                (EntityKind::Session, session.id.as_str()),
                (EntityKind::Item, item.id.as_str()),
                (EntityKind::Defect, defect.id.as_str()),
            ]
        );

        // Child payloads carry the parent's local reference for replay-time
        // resolution
        assert_eq!(
            ops[1].payload["session_ref"],
            serde_json::json!(session.id.as_str())
        );
        assert_eq!(
            ops[2].payload["item_ref"],
            serde_json::json!(item.id.as_str())
        );
    }

    #[tokio::test]
    async fn test_record_active_time_enqueues_running_total() {
        let service = InspectionService::open_in_memory().unwrap();
        let session = service.start_session(7, 3, "inspector-1").await.unwrap();

        service.record_active_time(&session.id, 60).await.unwrap();
        service.record_active_time(&session.id, 30).await.unwrap();

        let ops = service.peek_operations().await.unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[2].payload, serde_json::json!({"active_seconds": 90}));

        assert!(service.record_active_time(&session.id, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_advance_item_unknown_session() {
        let service = InspectionService::open_in_memory().unwrap();
        let missing = SessionId::new();
        assert!(matches!(
            service.advance_item(&missing, ItemStatus::Ok).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_defect_tombstones_and_enqueues() {
        let service = InspectionService::open_in_memory().unwrap();
        let session = service.start_session(7, 3, "inspector-1").await.unwrap();
        let item = service
            .advance_item(&session.id, ItemStatus::Defective)
            .await
            .unwrap();
        let defect = service
            .mark_defect(&item.id, 12, 0.1, 0.9, None, None)
            .await
            .unwrap();

        service.delete_defect(&defect.id).await.unwrap();

        assert!(service.list_defects(&item.id).await.unwrap().is_empty());
        let ops = service.peek_operations().await.unwrap();
        let last = ops.last().unwrap();
        assert_eq!(last.kind, OpKind::Delete);
        assert_eq!(last.entity, EntityKind::Defect);
        // Server id unknown until the CREATE replays
        assert_eq!(last.server_id, None);
    }

    #[tokio::test]
    async fn test_sync_counts() {
        let service = InspectionService::open_in_memory().unwrap();
        let session = service.start_session(7, 3, "inspector-1").await.unwrap();
        service
            .advance_item(&session.id, ItemStatus::Ok)
            .await
            .unwrap();

        let counts = service.sync_counts().await.unwrap();
        assert_eq!(counts.queued_operations, 2);
        assert_eq!(counts.pending, 2);
        assert_eq!(counts.error, 0);
        assert_eq!(counts.synced, 0);
    }
}
