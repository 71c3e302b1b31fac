//! Shared cross-platform state types.

/// Unified sync state surfaced to tablet, kiosk, and CLI clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Offline,
    Idle,
    Syncing,
}
