//! Offline-first sync subsystem
//!
//! Mutations are applied to the local store immediately and appended to a
//! durable queue; the [`SyncEngine`] replays the queue against the remote
//! API whenever the client is online, binding server identifiers back onto
//! locally-created records as creations are acknowledged.

mod connectivity;
mod engine;
mod http;
mod reconcile;
mod remote;

pub use connectivity::{connectivity_channel, ConnectivityHandle, ConnectivityMonitor};
pub use engine::SyncEngine;
pub use http::HttpRemote;
pub use reconcile::IdentityReconciler;
pub use remote::{RemoteApi, RemoteError, RemoteResult};
