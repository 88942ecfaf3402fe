//! crates/vidnotes_core/src/ports.rs
//!
//! Defines the service contract (trait) for the remote data gateway.
//! This trait forms the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete hosted backend implementation.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewNote, Note, Video};

//=========================================================================================
// Gateway Error and Result Types
//=========================================================================================

/// The error taxonomy for all gateway operations.
///
/// Every variant maps to a distinct user-visible behavior: `NotFound` on the
/// initial video fetch is fatal to the session, everything else is surfaced
/// as a recoverable message.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The gateway is unreachable because its credentials were never supplied.
    #[error("Gateway configuration is missing")]
    ConfigurationMissing,
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A note-affecting action was attempted without an authenticated identity.
    #[error("Login is required to save notes")]
    Unauthenticated,
    /// Any other fetch/insert failure; the user may retry the same action.
    #[error("Gateway request failed: {0}")]
    Transient(String),
}

/// A convenience type alias for `Result<T, GatewayError>`.
pub type GatewayResult<T> = Result<T, GatewayError>;

//=========================================================================================
// Gateway Port (Trait)
//=========================================================================================

/// The four operations the core consumes from the hosted data/auth service.
///
/// Ownership rules (a user only ever sees their own notes) are enforced
/// server-side; the core passes identities through verbatim.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Resolves the identity behind the current session. `None` means anonymous.
    async fn current_user_id(&self) -> GatewayResult<Option<Uuid>>;

    async fn video_by_id(&self, video_id: Uuid) -> GatewayResult<Video>;

    /// Lists one user's notes for one video, ascending by `timestamp_seconds`.
    async fn notes_for_video(&self, video_id: Uuid, user_id: Uuid) -> GatewayResult<Vec<Note>>;

    /// Persists a note and returns the stored row with `id` and `created_at` assigned.
    async fn insert_note(&self, note: NewNote) -> GatewayResult<Note>;
}
