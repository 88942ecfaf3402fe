//! crates/vidnotes_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A catalog entry with a playable media locator.
///
/// Immutable from the core's perspective; a watch session reads it once at
/// startup and never writes it back.
#[derive(Debug, Clone)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: String,
    pub duration_seconds: u32,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A timestamped text note attached to one video by one user.
///
/// `id` and `created_at` are assigned by the remote gateway on insert.
/// Within a single user's view of a single video the note list is kept in
/// non-decreasing `timestamp_seconds` order.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: Uuid,
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub timestamp_seconds: u32,
    pub created_at: DateTime<Utc>,
}

/// The payload for creating a note; the gateway fills in `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub timestamp_seconds: u32,
}
