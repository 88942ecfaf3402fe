//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser shell and the
//! API server for the watch-session note-taking workflow.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vidnotes_core::domain::{Note, Video};
use vidnotes_core::timecode::format_timestamp;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// The browser shell owns the real media element; it forwards transport events
// (time updates, loaded metadata) and user intents unchanged.
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens a watch session. This must be the first message sent on the
    /// connection. An absent access token runs the session anonymously.
    Init {
        video_id: Uuid,
        access_token: Option<String>,
    },

    /// The user edited the note draft.
    DraftChanged { text: String },

    /// The user asked to save the current draft at the current position.
    AddNote,

    /// The user clicked a note to jump to its timestamp.
    SeekToNote { timestamp_seconds: u32 },

    /// The media element reported a new playback position.
    TimeUpdate { seconds: f64 },

    /// The media element's metadata loaded and its duration became known.
    DurationKnown { seconds: f64 },

    /// Relative skip, e.g. the ±10s transport buttons.
    Skip { delta_seconds: f64 },

    TogglePlay,

    SetPlaybackRate { rate: f64 },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The session loaded; the shell can render the player and notes panel.
    SessionReady {
        video: VideoView,
        user_id: Option<Uuid>,
        notes: Vec<NoteView>,
        /// A recoverable error present at load time (e.g. the notes list
        /// could not be fetched).
        banner: Option<String>,
    },

    /// The session failed fatally; the shell replaces the main content area
    /// with this message. No player or notes panel is rendered.
    SessionFailed { message: String },

    /// The note list or draft changed (after a save attempt).
    NotesChanged { notes: Vec<NoteView>, draft: String },

    /// A recoverable error banner appeared or cleared.
    BannerChanged { message: Option<String> },

    /// The shell must move the media element to this position.
    SeekTo { seconds: f64 },

    /// Transport state changed (play/pause toggle or rate selection).
    PlaybackChanged { playing: bool, rate: f64 },
}

//=========================================================================================
// View Structs
//=========================================================================================

/// The renderable projection of a video.
#[derive(Serialize, Debug, Clone)]
pub struct VideoView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_url: String,
    pub duration_seconds: u32,
    pub duration_label: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl From<&Video> for VideoView {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id,
            title: video.title.clone(),
            description: video.description.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
            video_url: video.video_url.clone(),
            duration_seconds: video.duration_seconds,
            duration_label: format_timestamp(f64::from(video.duration_seconds)),
            category: video.category.clone(),
            tags: video.tags.clone(),
        }
    }
}

/// The renderable projection of a note, with its timestamp pre-formatted.
#[derive(Serialize, Debug, Clone)]
pub struct NoteView {
    pub id: Uuid,
    pub content: String,
    pub timestamp_seconds: u32,
    pub timestamp_label: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Note> for NoteView {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            content: note.content.clone(),
            timestamp_seconds: note.timestamp_seconds,
            timestamp_label: format_timestamp(f64::from(note.timestamp_seconds)),
            created_at: note.created_at,
        }
    }
}
