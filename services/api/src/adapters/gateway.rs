//! services/api/src/adapters/gateway.rs
//!
//! This module contains the gateway adapter, which is the concrete
//! implementation of the `RemoteGateway` port from the `core` crate. It talks
//! to the hosted backend's row-level REST interface and auth endpoint over
//! HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

use vidnotes_core::domain::{NewNote, Note, Video};
use vidnotes_core::ports::{GatewayError, GatewayResult, RemoteGateway};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A gateway adapter that implements the `RemoteGateway` port against the
/// hosted backend's REST interface.
///
/// Every request carries the backend's public `apikey`; user-scoped requests
/// additionally carry the user's access token as a bearer header, which the
/// backend uses to enforce row ownership.
#[derive(Clone)]
pub struct RestGateway {
    http: Client,
    base_url: Url,
    anon_key: String,
    access_token: Option<String>,
}

impl fmt::Debug for RestGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestGateway {
    /// Creates a new `RestGateway` with no user bound to it.
    pub fn new(base_url: Url, anon_key: String) -> GatewayResult<Self> {
        if anon_key.trim().is_empty() {
            return Err(GatewayError::ConfigurationMissing);
        }
        let http = Client::builder()
            .user_agent("vidnotes-api/0.1")
            .build()
            .map_err(|e| GatewayError::Transient(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            anon_key,
            access_token: None,
        })
    }

    /// Derives a gateway bound to one user's access token, for the lifetime
    /// of a single watch session.
    pub fn for_access_token(&self, access_token: Option<String>) -> Self {
        Self {
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            ..self.clone()
        }
    }

    fn endpoint(&self, path: &str) -> GatewayResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Transient(format!("invalid gateway URL: {}", e)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("apikey", &self.anon_key);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn videos_url(&self, video_id: Uuid) -> GatewayResult<Url> {
        let mut url = self.endpoint("rest/v1/videos")?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", video_id))
            .append_pair("select", "*");
        Ok(url)
    }

    fn notes_url(&self, video_id: Uuid, user_id: Uuid) -> GatewayResult<Url> {
        let mut url = self.endpoint("rest/v1/notes")?;
        url.query_pairs_mut()
            .append_pair("video_id", &format!("eq.{}", video_id))
            .append_pair("user_id", &format!("eq.{}", user_id))
            .append_pair("select", "*")
            .append_pair("order", "video_timestamp.asc");
        Ok(url)
    }

    /// Builds the note insert request; `Prefer: return=representation` makes
    /// the backend echo the stored row back.
    fn build_insert_request(&self, record: &NewNoteRecord) -> GatewayResult<reqwest::Request> {
        let url = self.endpoint("rest/v1/notes")?;
        self.authorize(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(record)
            .build()
            .map_err(|e| GatewayError::Transient(e.to_string()))
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, url: Url) -> GatewayResult<Vec<T>> {
        let res = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!("Gateway select failed - Status: {}, Body: {}", status, body);
            return Err(map_failure(status, &body));
        }

        res.json::<Vec<T>>()
            .await
            .map_err(|e| GatewayError::Transient(format!("invalid gateway response: {}", e)))
    }
}

/// Maps an HTTP failure status onto the gateway error taxonomy.
fn map_failure(status: StatusCode, body: &str) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthenticated,
        StatusCode::NOT_FOUND => GatewayError::NotFound(body.to_string()),
        _ => GatewayError::Transient(format!("gateway error {}: {}", status, body)),
    }
}

//=========================================================================================
// "Impure" Gateway Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct AuthUserRecord {
    id: Uuid,
}

#[derive(Deserialize)]
struct VideoRecord {
    id: Uuid,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    video_url: String,
    duration: u32,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}
impl VideoRecord {
    fn to_domain(self) -> Video {
        Video {
            id: self.id,
            title: self.title,
            description: self.description,
            thumbnail_url: self.thumbnail_url,
            video_url: self.video_url,
            duration_seconds: self.duration,
            category: self.category,
            tags: self.tags,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
struct NoteRecord {
    id: Uuid,
    user_id: Uuid,
    video_id: Uuid,
    content: String,
    video_timestamp: u32,
    created_at: DateTime<Utc>,
}
impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            video_id: self.video_id,
            user_id: self.user_id,
            content: self.content,
            timestamp_seconds: self.video_timestamp,
            created_at: self.created_at,
        }
    }
}

#[derive(Serialize)]
struct NewNoteRecord {
    user_id: Uuid,
    video_id: Uuid,
    content: String,
    video_timestamp: u32,
}
impl From<NewNote> for NewNoteRecord {
    fn from(note: NewNote) -> Self {
        Self {
            user_id: note.user_id,
            video_id: note.video_id,
            content: note.content,
            video_timestamp: note.timestamp_seconds,
        }
    }
}

//=========================================================================================
// `RemoteGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl RemoteGateway for RestGateway {
    async fn current_user_id(&self) -> GatewayResult<Option<Uuid>> {
        let Some(token) = &self.access_token else {
            return Ok(None);
        };

        let url = self.endpoint("auth/v1/user")?;
        let res = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        let status = res.status();
        // An expired or invalid token degrades to an anonymous session.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!("Identity lookup failed - Status: {}, Body: {}", status, body);
            return Err(map_failure(status, &body));
        }

        let user: AuthUserRecord = res
            .json()
            .await
            .map_err(|e| GatewayError::Transient(format!("invalid auth response: {}", e)))?;
        Ok(Some(user.id))
    }

    async fn video_by_id(&self, video_id: Uuid) -> GatewayResult<Video> {
        let rows: Vec<VideoRecord> = self.fetch_rows(self.videos_url(video_id)?).await?;
        rows.into_iter()
            .next()
            .map(VideoRecord::to_domain)
            .ok_or_else(|| GatewayError::NotFound(format!("Video {} not found", video_id)))
    }

    async fn notes_for_video(&self, video_id: Uuid, user_id: Uuid) -> GatewayResult<Vec<Note>> {
        let rows: Vec<NoteRecord> = self.fetch_rows(self.notes_url(video_id, user_id)?).await?;
        Ok(rows.into_iter().map(NoteRecord::to_domain).collect())
    }

    async fn insert_note(&self, note: NewNote) -> GatewayResult<Note> {
        let record = NewNoteRecord::from(note);
        let request = self.build_insert_request(&record)?;
        let res = self
            .http
            .execute(request)
            .await
            .map_err(|e| GatewayError::Transient(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!("Note insert failed - Status: {}, Body: {}", status, body);
            return Err(map_failure(status, &body));
        }

        let rows: Vec<NoteRecord> = res
            .json()
            .await
            .map_err(|e| GatewayError::Transient(format!("invalid gateway response: {}", e)))?;
        rows.into_iter()
            .next()
            .map(NoteRecord::to_domain)
            .ok_or_else(|| {
                GatewayError::Transient("gateway returned no row for the inserted note".to_string())
            })
    }
}
