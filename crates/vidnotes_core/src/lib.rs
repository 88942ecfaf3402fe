pub mod domain;
pub mod playback;
pub mod ports;
pub mod session;
pub mod timecode;

pub use domain::{NewNote, Note, Video};
pub use playback::{PlaybackClock, SeekOutcome, PLAYBACK_RATES, SKIP_SECONDS};
pub use ports::{GatewayError, GatewayResult, RemoteGateway};
pub use session::{SessionPhase, WatchSession};
pub use timecode::format_timestamp;
