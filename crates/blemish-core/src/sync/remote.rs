//! Remote collaborator interface

use serde_json::Value;
use thiserror::Error;

use crate::models::{EntityKind, ServerId};

/// Errors surfaced by the remote API.
///
/// The sync engine treats every variant uniformly as a retriable failure;
/// the HTTP status is preserved inside `Api` messages so callers can add a
/// permanent-failure classification later without reshaping the queue.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// The request surface the sync engine replays against, one set of
/// endpoints per entity kind.
///
/// Non-2xx responses and transport errors both come back as `RemoteError`;
/// timeout behavior belongs to the implementation.
pub trait RemoteApi {
    /// Create an entity; returns the server-assigned identifier
    fn create(
        &self,
        entity: EntityKind,
        payload: &Value,
    ) -> impl std::future::Future<Output = RemoteResult<ServerId>> + Send;

    /// Apply a partial update to an entity known to the server
    fn update(
        &self,
        entity: EntityKind,
        server_id: ServerId,
        payload: &Value,
    ) -> impl std::future::Future<Output = RemoteResult<()>> + Send;

    /// Delete an entity known to the server
    fn delete(
        &self,
        entity: EntityKind,
        server_id: ServerId,
    ) -> impl std::future::Future<Output = RemoteResult<()>> + Send;
}
