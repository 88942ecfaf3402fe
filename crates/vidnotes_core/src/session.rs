//! crates/vidnotes_core/src/session.rs
//!
//! The watch session controller: mediates between the playback clock and the
//! remote data gateway for the lifetime of viewing one video. All state for
//! one page visit lives in a single struct, and every UI intent is an
//! explicit transition on it, so the state machine is testable without any
//! rendering layer.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::{NewNote, Note, Video};
use crate::playback::{PlaybackClock, SeekOutcome};
use crate::ports::{GatewayError, RemoteGateway};

/// The lifecycle phase of a watch session.
///
/// `Ready` is the only phase in which note operations are permitted. `Failed`
/// is terminal for the session; there is no automatic retry and the user must
/// reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Ready,
    Failed(String),
}

/// The state of one watch session, owned by the controller.
pub struct WatchSession {
    gateway: Arc<dyn RemoteGateway>,
    /// Cancelled on teardown; every asynchronous completion checks it and
    /// discards its result rather than mutate a torn-down session.
    cancellation_token: CancellationToken,
    video_id: Uuid,
    phase: SessionPhase,
    /// `None` means the session runs anonymously: the note list stays empty
    /// and note creation is refused.
    user_id: Option<Uuid>,
    video: Option<Video>,
    /// Kept ascending by `timestamp_seconds` at all times.
    notes: Vec<Note>,
    draft: String,
    /// Recoverable error surfaced to the user; cleared by the next success.
    banner: Option<String>,
    /// Serializes note inserts: at most one in flight at a time.
    saving_in_flight: bool,
    /// A seek issued to the clock but not yet acknowledged.
    pending_seek_seconds: Option<f64>,
    clock: PlaybackClock,
}

impl WatchSession {
    /// Creates a session in the `Loading` phase. The gateway is injected so
    /// tests can supply a double.
    pub fn new(gateway: Arc<dyn RemoteGateway>, video_id: Uuid) -> Self {
        Self {
            gateway,
            cancellation_token: CancellationToken::new(),
            video_id,
            phase: SessionPhase::Loading,
            user_id: None,
            video: None,
            notes: Vec::new(),
            draft: String::new(),
            banner: None,
            saving_in_flight: false,
            pending_seek_seconds: None,
            clock: PlaybackClock::new(),
        }
    }

    //=====================================================================================
    // Transitions
    //=====================================================================================

    /// Resolves the user's identity, fetches the video, and (when an identity
    /// is present) the user's notes for it.
    ///
    /// A failed video fetch is fatal and moves the session to `Failed`. A
    /// failed identity lookup degrades the session to anonymous. A failed
    /// notes fetch is non-fatal: the session still becomes `Ready` with a
    /// recoverable banner, and playback is unaffected.
    pub async fn initialize(&mut self) {
        let (user_result, video_result) = futures::join!(
            self.gateway.current_user_id(),
            self.gateway.video_by_id(self.video_id)
        );
        if self.cancellation_token.is_cancelled() {
            return;
        }

        // A failed identity lookup is not fatal; the session runs anonymously.
        let user_id = user_result.unwrap_or(None);
        let video = match video_result {
            Ok(video) => video,
            Err(e) => {
                self.phase = SessionPhase::Failed(e.to_string());
                return;
            }
        };

        self.user_id = user_id;
        self.video = Some(video);

        if let Some(uid) = self.user_id {
            let result = self.gateway.notes_for_video(self.video_id, uid).await;
            if self.cancellation_token.is_cancelled() {
                return;
            }
            match result {
                // The gateway returns notes ascending by timestamp.
                Ok(notes) => self.notes = notes,
                Err(e) => self.banner = Some(e.to_string()),
            }
        }

        self.phase = SessionPhase::Ready;
    }

    /// Replaces the note draft. Stored as typed; validation happens on submit.
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Persists the current draft as a note bound to the current playback
    /// position.
    ///
    /// A no-op when a save is already in flight or the trimmed draft is
    /// empty. When no identity is present the attempt surfaces a
    /// login-required banner instead of silently dropping, without calling
    /// the gateway. `saving_in_flight` is cleared on every completion path.
    pub async fn submit_note(&mut self) {
        if self.phase != SessionPhase::Ready || self.saving_in_flight {
            return;
        }
        let content = self.draft.trim();
        if content.is_empty() {
            return;
        }
        let user_id = match self.user_id {
            Some(uid) => uid,
            None => {
                self.banner = Some(GatewayError::Unauthenticated.to_string());
                return;
            }
        };

        self.saving_in_flight = true;
        let payload = NewNote {
            video_id: self.video_id,
            user_id,
            content: content.to_string(),
            timestamp_seconds: self.clock.position_seconds().floor() as u32,
        };

        let result = self.gateway.insert_note(payload).await;
        if self.cancellation_token.is_cancelled() {
            // The row may have been stored remotely; the torn-down session
            // does not touch local state either way.
            self.saving_in_flight = false;
            return;
        }

        match result {
            Ok(note) => {
                self.insert_note_ordered(note);
                self.draft.clear();
                self.banner = None;
            }
            Err(e) => {
                // Draft and note list stay intact so the user can retry.
                self.banner = Some(e.to_string());
            }
        }
        self.saving_in_flight = false;
    }

    /// Translates a note click into a clock seek.
    ///
    /// The pending seek is cleared as soon as the clock acknowledges the
    /// jump, so a later identical time-advance notification is not mistaken
    /// for another pending seek.
    pub fn seek_to_note(&mut self, timestamp_seconds: u32) -> SeekOutcome {
        self.pending_seek_seconds = Some(f64::from(timestamp_seconds));
        let outcome = self.clock.request_seek(f64::from(timestamp_seconds));
        if let SeekOutcome::Applied(applied) = outcome {
            self.on_clock_time_advance(applied);
        }
        outcome
    }

    /// Mirrors a time-advance notification from the media element and
    /// consumes any pending seek.
    pub fn on_clock_time_advance(&mut self, seconds: f64) {
        self.clock.on_time_advance(seconds);
        if self.pending_seek_seconds.is_some() {
            self.pending_seek_seconds = None;
        }
    }

    /// Forwards a loaded-metadata notification to the clock. A seek that was
    /// deferred until the duration became known is applied now and returned.
    pub fn on_duration_known(&mut self, seconds: f64) -> Option<f64> {
        let applied = self.clock.on_duration_known(seconds)?;
        self.on_clock_time_advance(applied);
        Some(applied)
    }

    /// Tears the session down. In-flight gateway completions observe the
    /// cancelled token and discard their results.
    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }

    fn insert_note_ordered(&mut self, note: Note) {
        let idx = self
            .notes
            .partition_point(|n| n.timestamp_seconds <= note.timestamp_seconds);
        self.notes.insert(idx, note);
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn video_id(&self) -> Uuid {
        self.video_id
    }

    pub fn video(&self) -> Option<&Video> {
        self.video.as_ref()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving_in_flight
    }

    pub fn pending_seek_seconds(&self) -> Option<f64> {
        self.pending_seek_seconds
    }

    pub fn current_time_seconds(&self) -> f64 {
        self.clock.position_seconds()
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut PlaybackClock {
        &mut self.clock
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::GatewayResult;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// An in-memory gateway double with scripted responses and call counters.
    struct FakeGateway {
        user: Mutex<GatewayResult<Option<Uuid>>>,
        video: Mutex<GatewayResult<Video>>,
        notes: Mutex<GatewayResult<Vec<Note>>>,
        /// One entry per expected insert; `Ok(())` echoes the payload back as
        /// a stored row.
        insert_outcomes: Mutex<VecDeque<GatewayResult<()>>>,
        notes_calls: AtomicUsize,
        insert_calls: AtomicUsize,
    }

    impl FakeGateway {
        fn new(user: Option<Uuid>, video: GatewayResult<Video>) -> Self {
            Self {
                user: Mutex::new(Ok(user)),
                video: Mutex::new(video),
                notes: Mutex::new(Ok(Vec::new())),
                insert_outcomes: Mutex::new(VecDeque::new()),
                notes_calls: AtomicUsize::new(0),
                insert_calls: AtomicUsize::new(0),
            }
        }

        fn expect_insert(&self, outcome: GatewayResult<()>) {
            self.insert_outcomes.lock().unwrap().push_back(outcome);
        }

        fn set_notes(&self, notes: GatewayResult<Vec<Note>>) {
            *self.notes.lock().unwrap() = notes;
        }
    }

    #[async_trait]
    impl RemoteGateway for FakeGateway {
        async fn current_user_id(&self) -> GatewayResult<Option<Uuid>> {
            self.user.lock().unwrap().clone()
        }

        async fn video_by_id(&self, _video_id: Uuid) -> GatewayResult<Video> {
            self.video.lock().unwrap().clone()
        }

        async fn notes_for_video(
            &self,
            _video_id: Uuid,
            _user_id: Uuid,
        ) -> GatewayResult<Vec<Note>> {
            self.notes_calls.fetch_add(1, Ordering::SeqCst);
            self.notes.lock().unwrap().clone()
        }

        async fn insert_note(&self, note: NewNote) -> GatewayResult<Note> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            let outcome = self
                .insert_outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()));
            outcome.map(|_| Note {
                id: Uuid::new_v4(),
                video_id: note.video_id,
                user_id: note.user_id,
                content: note.content,
                timestamp_seconds: note.timestamp_seconds,
                created_at: Utc::now(),
            })
        }
    }

    fn sample_video(id: Uuid) -> Video {
        Video {
            id,
            title: "Intro to Ownership".to_string(),
            description: None,
            thumbnail_url: None,
            video_url: "https://media.example/ownership.mp4".to_string(),
            duration_seconds: 600,
            category: Some("rust".to_string()),
            tags: vec!["beginner".to_string()],
            created_at: Utc::now(),
        }
    }

    async fn ready_session(gateway: Arc<FakeGateway>, video_id: Uuid) -> WatchSession {
        let mut session = WatchSession::new(gateway, video_id);
        session.initialize().await;
        session.on_duration_known(600.0);
        assert_eq!(*session.phase(), SessionPhase::Ready);
        session
    }

    #[tokio::test]
    async fn note_is_bound_to_floored_playback_position() {
        let video_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(Some(user_id), Ok(sample_video(video_id))));
        let mut session = ready_session(gateway, video_id).await;

        session.on_clock_time_advance(125.7);
        session.update_draft("key insight");
        session.submit_note().await;

        assert_eq!(session.notes().len(), 1);
        assert_eq!(session.notes()[0].timestamp_seconds, 125);
        assert_eq!(session.notes()[0].content, "key insight");
        assert_eq!(session.draft(), "");
        assert!(!session.is_saving());
    }

    #[tokio::test]
    async fn notes_stay_sorted_regardless_of_insertion_order() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Ok(sample_video(video_id)),
        ));
        let mut session = ready_session(gateway, video_id).await;

        session.on_clock_time_advance(125.0);
        session.update_draft("later point");
        session.submit_note().await;

        session.on_clock_time_advance(40.0);
        session.update_draft("earlier point");
        session.submit_note().await;

        let timestamps: Vec<u32> = session.notes().iter().map(|n| n.timestamp_seconds).collect();
        assert_eq!(timestamps, vec![40, 125]);
    }

    #[tokio::test]
    async fn empty_or_whitespace_draft_is_a_noop() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Ok(sample_video(video_id)),
        ));
        let mut session = ready_session(gateway.clone(), video_id).await;

        session.submit_note().await;
        session.update_draft("   \n\t");
        session.submit_note().await;

        assert_eq!(gateway.insert_calls.load(Ordering::SeqCst), 0);
        assert!(session.notes().is_empty());
        assert!(session.banner().is_none());
    }

    #[tokio::test]
    async fn submit_is_a_noop_while_a_save_is_in_flight() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Ok(sample_video(video_id)),
        ));
        let mut session = ready_session(gateway.clone(), video_id).await;

        session.update_draft("queued thought");
        session.saving_in_flight = true;
        session.submit_note().await;

        assert_eq!(gateway.insert_calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.draft(), "queued thought");
    }

    #[tokio::test]
    async fn anonymous_submit_surfaces_login_required_without_gateway_call() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(None, Ok(sample_video(video_id))));
        let mut session = ready_session(gateway.clone(), video_id).await;

        assert!(session.notes().is_empty());
        assert_eq!(gateway.notes_calls.load(Ordering::SeqCst), 0);

        session.update_draft("anonymous thought");
        session.submit_note().await;

        assert_eq!(gateway.insert_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            session.banner(),
            Some(GatewayError::Unauthenticated.to_string().as_str())
        );
        assert_eq!(session.draft(), "anonymous thought");
    }

    #[tokio::test]
    async fn failed_insert_keeps_draft_and_notes_and_clears_saving() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Ok(sample_video(video_id)),
        ));
        gateway.expect_insert(Err(GatewayError::Transient("insert failed".to_string())));
        let mut session = ready_session(gateway.clone(), video_id).await;

        session.update_draft("fragile note");
        session.submit_note().await;

        assert!(session.notes().is_empty());
        assert_eq!(session.draft(), "fragile note");
        assert!(session.banner().is_some());
        assert!(!session.is_saving());

        // Retrying the same action succeeds and clears the banner.
        session.submit_note().await;
        assert_eq!(session.notes().len(), 1);
        assert_eq!(session.draft(), "");
        assert!(session.banner().is_none());
    }

    #[tokio::test]
    async fn missing_video_is_fatal_and_skips_the_notes_fetch() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Err(GatewayError::NotFound(format!("Video {} not found", video_id))),
        ));
        let mut session = WatchSession::new(gateway.clone(), video_id);
        session.initialize().await;

        assert!(matches!(session.phase(), SessionPhase::Failed(_)));
        assert!(session.video().is_none());
        assert_eq!(gateway.notes_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_notes_fetch_is_recoverable() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Ok(sample_video(video_id)),
        ));
        gateway.set_notes(Err(GatewayError::Transient("notes fetch failed".to_string())));
        let mut session = WatchSession::new(gateway.clone(), video_id);
        session.initialize().await;
        session.on_duration_known(600.0);

        // The session is watchable despite the failed list.
        assert_eq!(*session.phase(), SessionPhase::Ready);
        assert!(session.video().is_some());
        assert!(session.banner().is_some());

        session.update_draft("still works");
        session.submit_note().await;
        assert_eq!(session.notes().len(), 1);
        assert!(session.banner().is_none());
    }

    #[tokio::test]
    async fn initial_notes_are_loaded_for_authenticated_users() {
        let video_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(Some(user_id), Ok(sample_video(video_id))));
        let existing = Note {
            id: Uuid::new_v4(),
            video_id,
            user_id,
            content: "from last time".to_string(),
            timestamp_seconds: 90,
            created_at: Utc::now(),
        };
        gateway.set_notes(Ok(vec![existing]));

        let session = ready_session(gateway.clone(), video_id).await;
        assert_eq!(gateway.notes_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.notes().len(), 1);
        assert_eq!(session.notes()[0].timestamp_seconds, 90);
    }

    #[tokio::test]
    async fn seek_to_note_consumes_the_pending_seek_exactly_once() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Ok(sample_video(video_id)),
        ));
        let mut session = ready_session(gateway, video_id).await;

        let outcome = session.seek_to_note(90);
        assert_eq!(outcome, SeekOutcome::Applied(90.0));
        assert_eq!(session.pending_seek_seconds(), None);
        assert_eq!(session.current_time_seconds(), 90.0);

        // A later identical time-advance is not mistaken for another seek.
        session.on_clock_time_advance(90.0);
        assert_eq!(session.pending_seek_seconds(), None);
    }

    #[tokio::test]
    async fn seek_before_metadata_stays_pending_until_duration_is_known() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Ok(sample_video(video_id)),
        ));
        let mut session = WatchSession::new(gateway, video_id);
        session.initialize().await;

        assert_eq!(session.seek_to_note(42), SeekOutcome::Deferred);
        assert_eq!(session.pending_seek_seconds(), Some(42.0));

        assert_eq!(session.on_duration_known(600.0), Some(42.0));
        assert_eq!(session.pending_seek_seconds(), None);
        assert_eq!(session.current_time_seconds(), 42.0);
    }

    #[tokio::test]
    async fn torn_down_session_discards_late_completions() {
        let video_id = Uuid::new_v4();
        let gateway = Arc::new(FakeGateway::new(
            Some(Uuid::new_v4()),
            Ok(sample_video(video_id)),
        ));
        let mut session = WatchSession::new(gateway, video_id);
        session.shutdown();
        session.initialize().await;

        assert_eq!(*session.phase(), SessionPhase::Loading);
        assert!(session.video().is_none());
    }
}
