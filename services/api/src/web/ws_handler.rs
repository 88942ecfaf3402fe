//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! One connection drives one watch session: the browser shell forwards user
//! intents and media-element events, and receives the session state changes
//! to render.

use crate::web::{
    protocol::{ClientMessage, NoteView, ServerMessage, VideoView},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use vidnotes_core::playback::SeekOutcome;
use vidnotes_core::session::{SessionPhase, WatchSession};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(mut socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // --- 1. Initialization Phase ---
    let (video_id, access_token) = match socket.recv().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(&init_json) {
                Ok(ClientMessage::Init {
                    video_id,
                    access_token,
                }) => (video_id, access_token),
                _ => {
                    error!("First message was not a valid Init message.");
                    return;
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    info!("Opening watch session for video: {}", video_id);
    let gateway = Arc::new(app_state.gateway.for_access_token(access_token));
    let mut session = WatchSession::new(gateway, video_id);
    session.initialize().await;

    let reply = match (session.phase(), session.video()) {
        (SessionPhase::Ready, Some(video)) => ServerMessage::SessionReady {
            video: VideoView::from(video),
            user_id: session.user_id(),
            notes: session.notes().iter().map(NoteView::from).collect(),
            banner: session.banner().map(str::to_string),
        },
        (SessionPhase::Failed(message), _) => {
            error!("Watch session failed to initialize: {}", message);
            ServerMessage::SessionFailed {
                message: message.clone(),
            }
        }
        _ => ServerMessage::SessionFailed {
            message: "Failed to load session data.".to_string(),
        },
    };
    let fatal = matches!(reply, ServerMessage::SessionFailed { .. });
    if send_message(&mut socket, &reply).await.is_err() || fatal {
        return;
    }

    // --- 2. Main Message Loop ---
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                if handle_text_message(text.to_string(), &mut session, &mut socket)
                    .await
                    .is_err()
                {
                    error!("Failed to send message to client. Closing connection.");
                    break;
                }
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    // In-flight gateway completions observe the cancelled token and discard
    // their results instead of mutating a torn-down session.
    session.shutdown();
    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: String,
    session: &mut WatchSession,
    socket: &mut WebSocket,
) -> Result<(), axum::Error> {
    match serde_json::from_str::<ClientMessage>(&text) {
        Ok(client_msg) => match client_msg {
            ClientMessage::Init { .. } => {
                warn!("Received subsequent Init message, which is ignored.");
            }
            ClientMessage::DraftChanged { text } => {
                session.update_draft(text);
            }
            ClientMessage::AddNote => {
                session.submit_note().await;
                send_message(
                    socket,
                    &ServerMessage::NotesChanged {
                        notes: session.notes().iter().map(NoteView::from).collect(),
                        draft: session.draft().to_string(),
                    },
                )
                .await?;
                send_message(
                    socket,
                    &ServerMessage::BannerChanged {
                        message: session.banner().map(str::to_string),
                    },
                )
                .await?;
            }
            ClientMessage::SeekToNote { timestamp_seconds } => {
                if let SeekOutcome::Applied(seconds) = session.seek_to_note(timestamp_seconds) {
                    send_message(socket, &ServerMessage::SeekTo { seconds }).await?;
                }
                // A deferred seek is acknowledged once the duration is known.
            }
            ClientMessage::TimeUpdate { seconds } => {
                session.on_clock_time_advance(seconds);
            }
            ClientMessage::DurationKnown { seconds } => {
                if let Some(applied) = session.on_duration_known(seconds) {
                    send_message(socket, &ServerMessage::SeekTo { seconds: applied }).await?;
                }
            }
            ClientMessage::Skip { delta_seconds } => {
                if let SeekOutcome::Applied(seconds) = session.clock_mut().skip(delta_seconds) {
                    send_message(socket, &ServerMessage::SeekTo { seconds }).await?;
                }
            }
            ClientMessage::TogglePlay => {
                let playing = session.clock_mut().toggle_playing();
                send_message(
                    socket,
                    &ServerMessage::PlaybackChanged {
                        playing,
                        rate: session.clock().playback_rate(),
                    },
                )
                .await?;
            }
            ClientMessage::SetPlaybackRate { rate } => {
                if session.clock_mut().set_playback_rate(rate) {
                    send_message(
                        socket,
                        &ServerMessage::PlaybackChanged {
                            playing: session.clock().is_playing(),
                            rate,
                        },
                    )
                    .await?;
                } else {
                    warn!("Rejected unsupported playback rate: {}", rate);
                }
            }
        },
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
        }
    }
    Ok(())
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}
