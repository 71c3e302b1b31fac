//! Queue replay engine
//!
//! Two states, Idle and Draining, guarded by an in-memory re-entrancy flag.
//! A drain cycle snapshots the queue and replays it strictly sequentially in
//! enqueue order; operations that arrive mid-cycle wait for the next
//! trigger. Triggers (new enqueue, connectivity regain, periodic poll) only
//! ever start a cycle, they never run replay logic themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;

use super::connectivity::ConnectivityMonitor;
use super::reconcile::IdentityReconciler;
use super::remote::RemoteApi;
use crate::error::Result;
use crate::models::{EntityKind, OpKind, ServerId, SyncOperation, SyncStatus};
use crate::service::InspectionService;
use crate::state::SyncState;

/// Fallback trigger period for the run loop
const PENDING_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of replaying a single operation
enum ReplayOutcome {
    /// Replayed successfully; remove from the queue
    Done,
    /// Precondition not met (parent identifier unresolved); leave the
    /// operation untouched and retry next cycle without penalty
    NotReady,
    /// The remote rejected or was unreachable; counts toward the ceiling
    Failed(String),
}

/// Drains the pending-operation queue against the remote collaborator
pub struct SyncEngine<R> {
    service: InspectionService,
    reconciler: IdentityReconciler,
    remote: R,
    connectivity: ConnectivityMonitor,
    draining: AtomicBool,
    state: watch::Sender<SyncState>,
}

impl<R: RemoteApi> SyncEngine<R> {
    /// Create an engine over the given service, remote, and connectivity
    /// signal
    pub fn new(service: InspectionService, remote: R, connectivity: ConnectivityMonitor) -> Self {
        let initial = if connectivity.is_online() {
            SyncState::Idle
        } else {
            SyncState::Offline
        };
        let (state, _) = watch::channel(initial);
        Self {
            reconciler: service.reconciler(),
            service,
            remote,
            connectivity,
            draining: AtomicBool::new(false),
            state,
        }
    }

    /// Observable engine state for status indicators
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Start a drain cycle if one is warranted: online, work pending, and
    /// not already draining. A concurrent call while draining is a no-op.
    pub async fn maybe_drain(&self) -> Result<()> {
        if !self.connectivity.is_online() {
            self.state.send_replace(SyncState::Offline);
            return Ok(());
        }
        if self.service.pending_count().await? == 0 {
            self.state.send_replace(SyncState::Idle);
            return Ok(());
        }
        if self.draining.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.state.send_replace(SyncState::Syncing);
        let result = self.drain_cycle().await;
        self.draining.store(false, Ordering::SeqCst);
        self.state.send_replace(SyncState::Idle);

        // Operations enqueued mid-cycle stay queued until the next trigger;
        // publish the fresh count so observers see them.
        self.service.refresh_pending().await?;
        result
    }

    /// Event loop: waits on enqueue signals, connectivity transitions, and a
    /// periodic fallback poll, starting a drain cycle on each wake-up.
    pub async fn run(&self) {
        let wake = self.service.drain_signal();
        let mut connectivity = self.connectivity.subscribe();
        let mut poll = tokio::time::interval(PENDING_POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = wake.notified() => {}
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        // Connectivity handle dropped; nothing will ever
                        // flip the signal again
                        break;
                    }
                    if !self.connectivity.is_online() {
                        self.state.send_replace(SyncState::Offline);
                        continue;
                    }
                }
                _ = poll.tick() => {}
            }
            if let Err(error) = self.maybe_drain().await {
                tracing::warn!(%error, "drain cycle failed");
            }
        }
    }

    /// One full pass over the queue as observed at cycle start. Replay is
    /// strictly sequential; an operation's outcome never short-circuits the
    /// rest of the cycle.
    async fn drain_cycle(&self) -> Result<()> {
        let operations = self.service.peek_operations().await?;
        tracing::debug!(operations = operations.len(), "drain cycle started");

        for op in &operations {
            match self.replay(op).await? {
                ReplayOutcome::Done => {
                    self.service.remove_operation(op.id).await?;
                    tracing::debug!(op_id = op.id, entity = op.entity.as_str(), "replayed");
                }
                ReplayOutcome::NotReady => {
                    tracing::debug!(
                        op_id = op.id,
                        entity = op.entity.as_str(),
                        "parent identifier unresolved, deferred"
                    );
                }
                ReplayOutcome::Failed(message) => {
                    tracing::warn!(
                        op_id = op.id,
                        entity = op.entity.as_str(),
                        attempts = op.attempts + 1,
                        %message,
                        "replay attempt failed"
                    );
                    self.reconciler
                        .set_sync_status(op.entity, &op.local_id, SyncStatus::Error)
                        .await?;
                    self.service.mark_operation_failed(op.id, &message).await?;
                }
            }
        }
        Ok(())
    }

    /// Dispatch to the handler for the operation's entity kind
    async fn replay(&self, op: &SyncOperation) -> Result<ReplayOutcome> {
        match op.entity {
            EntityKind::Session => self.replay_session(op).await,
            EntityKind::Item => {
                self.replay_child(op, EntityKind::Session, "session_ref", "session_id")
                    .await
            }
            EntityKind::Defect => {
                self.replay_child(op, EntityKind::Item, "item_ref", "item_id")
                    .await
            }
        }
    }

    async fn replay_session(&self, op: &SyncOperation) -> Result<ReplayOutcome> {
        match op.kind {
            OpKind::Create => self.submit_create(op, op.payload.clone(), None).await,
            OpKind::Update => self.submit_update(op).await,
            OpKind::Delete => self.submit_delete(op).await,
        }
    }

    /// Items and defects share one shape: their CREATE payload carries the
    /// parent's local reference, swapped for the server identifier at
    /// replay time. Resolution failing does not block the CREATE; the
    /// remote's rejection feeds the normal retry path.
    async fn replay_child(
        &self,
        op: &SyncOperation,
        parent_kind: EntityKind,
        ref_key: &str,
        wire_key: &str,
    ) -> Result<ReplayOutcome> {
        match op.kind {
            OpKind::Create => {
                let mut payload = op.payload.clone();
                let parent_server = self
                    .resolve_parent(&mut payload, parent_kind, ref_key, wire_key)
                    .await?;
                self.submit_create(op, payload, parent_server).await
            }
            OpKind::Update => self.submit_update(op).await,
            OpKind::Delete => self.submit_delete(op).await,
        }
    }

    async fn resolve_parent(
        &self,
        payload: &mut Value,
        parent_kind: EntityKind,
        ref_key: &str,
        wire_key: &str,
    ) -> Result<Option<ServerId>> {
        let Some(parent_ref) = payload
            .get(ref_key)
            .and_then(Value::as_str)
            .map(ToString::to_string)
        else {
            return Ok(None);
        };
        let resolved = self.reconciler.resolve(parent_kind, &parent_ref).await?;
        if let Some(server_id) = resolved {
            if let Some(object) = payload.as_object_mut() {
                object.remove(ref_key);
                object.insert(wire_key.to_string(), Value::from(server_id));
            }
        }
        Ok(resolved)
    }

    async fn submit_create(
        &self,
        op: &SyncOperation,
        payload: Value,
        parent_server: Option<ServerId>,
    ) -> Result<ReplayOutcome> {
        match self.remote.create(op.entity, &payload).await {
            Ok(server_id) => {
                self.reconciler
                    .bind(op.entity, &op.local_id, server_id, parent_server)
                    .await?;
                Ok(ReplayOutcome::Done)
            }
            Err(error) => Ok(ReplayOutcome::Failed(error.to_string())),
        }
    }

    async fn resolved_server_id(&self, op: &SyncOperation) -> Result<Option<ServerId>> {
        if let Some(server_id) = op.server_id {
            return Ok(Some(server_id));
        }
        self.reconciler.resolve(op.entity, &op.local_id).await
    }

    async fn submit_update(&self, op: &SyncOperation) -> Result<ReplayOutcome> {
        let Some(server_id) = self.resolved_server_id(op).await? else {
            return Ok(ReplayOutcome::NotReady);
        };
        match self.remote.update(op.entity, server_id, &op.payload).await {
            Ok(()) => {
                self.reconciler
                    .set_sync_status(op.entity, &op.local_id, SyncStatus::Synced)
                    .await?;
                Ok(ReplayOutcome::Done)
            }
            Err(error) => Ok(ReplayOutcome::Failed(error.to_string())),
        }
    }

    async fn submit_delete(&self, op: &SyncOperation) -> Result<ReplayOutcome> {
        let Some(server_id) = self.resolved_server_id(op).await? else {
            return Ok(ReplayOutcome::NotReady);
        };
        match self.remote.delete(op.entity, server_id).await {
            Ok(()) => Ok(ReplayOutcome::Done),
            Err(error) => Ok(ReplayOutcome::Failed(error.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemStatus, SessionStatus, MAX_ATTEMPTS};
    use crate::sync::connectivity::connectivity_channel;
    use crate::sync::remote::{RemoteError, RemoteResult};
    use std::sync::atomic::{AtomicI64, AtomicU32};
    use std::sync::{Arc, Mutex as StdMutex};

    /// Scripted stand-in for the inspection server.
    ///
    /// `failures` makes the next N calls fail; `fail_when_contains` makes
    /// every call whose payload mentions the marker fail.
    #[derive(Clone, Default)]
    struct MockRemote {
        next_id: Arc<AtomicI64>,
        failures: Arc<AtomicU32>,
        fail_when_contains: Option<String>,
        delay: Option<Duration>,
        calls: Arc<StdMutex<Vec<(String, Value)>>>,
    }

    impl MockRemote {
        fn new() -> Self {
            Self {
                next_id: Arc::new(AtomicI64::new(1000)),
                ..Self::default()
            }
        }

        fn call_log(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }

        async fn behave(&self, desc: String, payload: Value) -> RemoteResult<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push((desc, payload.clone()));
            if let Some(marker) = &self.fail_when_contains {
                if payload.to_string().contains(marker.as_str()) {
                    return Err(RemoteError::Api("rejected (500)".to_string()));
                }
            }
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(RemoteError::Api("HTTP 503".to_string()));
            }
            Ok(())
        }
    }

    impl RemoteApi for MockRemote {
        async fn create(&self, entity: EntityKind, payload: &Value) -> RemoteResult<ServerId> {
            self.behave(format!("create {}", entity.collection()), payload.clone())
                .await?;
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        async fn update(
            &self,
            entity: EntityKind,
            server_id: ServerId,
            payload: &Value,
        ) -> RemoteResult<()> {
            self.behave(
                format!("update {} {server_id}", entity.collection()),
                payload.clone(),
            )
            .await
        }

        async fn delete(&self, entity: EntityKind, server_id: ServerId) -> RemoteResult<()> {
            self.behave(
                format!("delete {} {server_id}", entity.collection()),
                Value::Null,
            )
            .await
        }
    }

    fn setup(online: bool) -> (InspectionService, MockRemote, SyncEngine<MockRemote>) {
        setup_with(online, MockRemote::new())
    }

    fn setup_with(
        online: bool,
        remote: MockRemote,
    ) -> (InspectionService, MockRemote, SyncEngine<MockRemote>) {
        let service = InspectionService::open_in_memory().unwrap();
        // The initial value is all these tests need; the watch keeps it
        // after the handle drops
        let (handle, monitor) = connectivity_channel(online);
        drop(handle);
        let engine = SyncEngine::new(service.clone(), remote.clone(), monitor);
        (service, remote, engine)
    }

    #[tokio::test]
    async fn test_drain_syncs_parent_chain_in_one_cycle() {
        let (service, remote, engine) = setup(true);

        let session = service.start_session(7, 3, "inspector-1").await.unwrap();
        let item = service
            .advance_item(&session.id, ItemStatus::Defective)
            .await
            .unwrap();
        let defect = service
            .mark_defect(&item.id, 12, 0.4, 0.6, None, None)
            .await
            .unwrap();

        engine.maybe_drain().await.unwrap();

        assert_eq!(service.pending_count().await.unwrap(), 0);

        let session = service.get_session(&session.id).await.unwrap().unwrap();
        let item = service.get_item(&item.id).await.unwrap().unwrap();
        let defect = service.get_defect(&defect.id).await.unwrap().unwrap();
        assert_eq!(session.sync_status, SyncStatus::Synced);
        assert_eq!(item.sync_status, SyncStatus::Synced);
        assert_eq!(defect.sync_status, SyncStatus::Synced);

        // The child's stored parent reference is the parent's server id
        assert!(session.server_id.is_some());
        assert_eq!(item.session_server_id, session.server_id);
        assert_eq!(defect.item_server_id, item.server_id);

        // Replay happened in enqueue order, and the item's wire payload
        // carried the resolved parent id rather than the local reference
        let calls = remote.call_log();
        assert_eq!(
            calls.iter().map(|(desc, _)| desc.as_str()).collect::<Vec<_>>(),
            vec!["create sessions", "create items", "create defects"]
        );
        let item_payload = &calls[1].1;
        assert_eq!(
            item_payload["session_id"],
            Value::from(session.server_id.unwrap())
        );
        assert!(item_payload.get("session_ref").is_none());
    }

    #[tokio::test]
    async fn test_update_is_never_submitted_before_create_resolves() {
        let (service, remote, engine) = setup(true);
        remote.failures.store(1, Ordering::SeqCst);

        let session = service.start_session(7, 3, "inspector-1").await.unwrap();
        service.close_session(&session.id).await.unwrap();

        // First cycle: CREATE fails, UPDATE is deferred without penalty
        engine.maybe_drain().await.unwrap();

        let calls = remote.call_log();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "create sessions");

        let ops = service.peek_operations().await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].attempts, 1);
        assert_eq!(ops[1].attempts, 0, "deferred update must not be penalized");

        // Second cycle: CREATE succeeds, then the UPDATE replays against
        // the freshly bound server id
        engine.maybe_drain().await.unwrap();

        assert_eq!(service.pending_count().await.unwrap(), 0);
        let session = service.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.sync_status, SyncStatus::Synced);

        let calls = remote.call_log();
        let update_call = calls.last().unwrap();
        assert_eq!(
            update_call.0,
            format!("update sessions {}", session.server_id.unwrap())
        );
    }

    #[tokio::test]
    async fn test_offline_update_waits_for_connectivity() {
        let service = InspectionService::open_in_memory().unwrap();
        let (handle, monitor) = connectivity_channel(true);
        let remote = MockRemote::new();
        let engine = SyncEngine::new(service.clone(), remote.clone(), monitor);

        let session = service.start_session(7, 3, "inspector-1").await.unwrap();
        engine.maybe_drain().await.unwrap();
        assert_eq!(service.pending_count().await.unwrap(), 0);

        // Offline: the update stays queued with attempt count 0
        handle.set_online(false);
        service.close_session(&session.id).await.unwrap();
        engine.maybe_drain().await.unwrap();
        assert_eq!(*engine.subscribe_state().borrow(), SyncState::Offline);

        let ops = service.peek_operations().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].attempts, 0);
        assert_eq!(remote.call_log().len(), 1, "only the initial create");

        // Back online with a failing remote: exactly one attempt is made
        handle.set_online(true);
        remote.failures.store(1, Ordering::SeqCst);
        engine.maybe_drain().await.unwrap();

        let ops = service.peek_operations().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].attempts, 1);
    }

    #[tokio::test]
    async fn test_ceiling_drops_exactly_the_failing_operation() {
        let remote = MockRemote {
            fail_when_contains: Some("flaky".to_string()),
            ..MockRemote::new()
        };
        let (service, remote, engine) = setup_with(true, remote);

        let doomed = service.start_session(7, 3, "flaky").await.unwrap();
        let steady = service.start_session(7, 3, "steady").await.unwrap();

        for _ in 0..(MAX_ATTEMPTS - 1) {
            engine.maybe_drain().await.unwrap();
        }
        let ops = service.peek_operations().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].attempts, MAX_ATTEMPTS - 1);
        assert_eq!(ops[0].last_error.as_deref(), Some("API error: rejected (500)"));

        engine.maybe_drain().await.unwrap();
        assert_eq!(service.pending_count().await.unwrap(), 0);

        // Dropping the operation does not roll back the local entity; it
        // stays flagged for a human to notice
        let doomed = service.get_session(&doomed.id).await.unwrap().unwrap();
        assert_eq!(doomed.sync_status, SyncStatus::Error);
        assert_eq!(doomed.server_id, None);

        let steady = service.get_session(&steady.id).await.unwrap().unwrap();
        assert_eq!(steady.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn test_draining_an_empty_queue_is_a_noop() {
        let (_service, remote, engine) = setup(true);
        engine.maybe_drain().await.unwrap();
        assert!(remote.call_log().is_empty());
        assert_eq!(*engine.subscribe_state().borrow(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_reentrant_drain_does_not_duplicate_submissions() {
        let remote = MockRemote {
            delay: Some(Duration::from_millis(10)),
            ..MockRemote::new()
        };
        let (service, remote, engine) = setup_with(true, remote);

        let session = service.start_session(7, 3, "inspector-1").await.unwrap();
        service
            .advance_item(&session.id, ItemStatus::Ok)
            .await
            .unwrap();

        let (a, b) = tokio::join!(engine.maybe_drain(), engine.maybe_drain());
        a.unwrap();
        b.unwrap();

        assert_eq!(remote.call_log().len(), 2, "each operation submitted once");
        assert_eq!(service.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_loop_drains_on_wake_and_connectivity_regain() {
        let service = InspectionService::open_in_memory().unwrap();
        let (handle, monitor) = connectivity_channel(false);
        let remote = MockRemote::new();
        let engine = Arc::new(SyncEngine::new(service.clone(), remote.clone(), monitor));

        let runner = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run().await })
        };

        // Enqueued while offline: nothing happens
        service.start_session(7, 3, "inspector-1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.pending_count().await.unwrap(), 1);

        // Connectivity regain triggers the drain
        handle.set_online(true);
        let mut pending = service.subscribe_pending();
        tokio::time::timeout(Duration::from_secs(5), pending.wait_for(|&count| count == 0))
            .await
            .expect("queue should drain after going online")
            .unwrap();

        // A fresh enqueue while online wakes the loop again
        service.start_session(7, 3, "inspector-2").await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), pending.wait_for(|&count| count == 0))
            .await
            .expect("queue should drain after enqueue")
            .unwrap();

        runner.abort();
    }
}
