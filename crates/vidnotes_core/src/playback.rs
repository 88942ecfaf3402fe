//! crates/vidnotes_core/src/playback.rs
//!
//! The playback clock: owns the transport state of the single media element
//! and exposes/consumes time as plain seconds. It has no network or
//! persistence side effects; the presentation shell mirrors its position
//! into the real media element.

/// Playback rates the transport accepts.
pub const PLAYBACK_RATES: [f64; 5] = [0.75, 1.0, 1.25, 1.5, 2.0];

/// How far the relative skip conveniences jump, in seconds.
pub const SKIP_SECONDS: f64 = 10.0;

/// The result of a seek request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// The seek was applied; the transport position is now the clamped value.
    Applied(f64),
    /// Media duration is not yet known; the request is stored and will be
    /// applied when `on_duration_known` fires.
    Deferred,
}

/// Transport state of one media element.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    position_seconds: f64,
    /// Unknown until the media's metadata has loaded.
    duration_seconds: Option<f64>,
    /// A seek that arrived before the duration was known.
    deferred_seek: Option<f64>,
    playing: bool,
    playback_rate: f64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            position_seconds: 0.0,
            duration_seconds: None,
            deferred_seek: None,
            playing: false,
            playback_rate: 1.0,
        }
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_seconds
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    /// Records the latest position reported by the media element as it plays.
    /// No upper bound is enforced beyond the media's own duration.
    pub fn on_time_advance(&mut self, seconds: f64) {
        self.position_seconds = sanitize(seconds);
    }

    /// Requests a jump of the transport position.
    ///
    /// The target is clamped to `[0, duration]`. When the duration is still
    /// unknown the request is stored rather than dropped, and replayed once
    /// `on_duration_known` fires.
    pub fn request_seek(&mut self, seconds: f64) -> SeekOutcome {
        let target = sanitize(seconds);
        match self.duration_seconds {
            Some(duration) => {
                let clamped = target.min(duration);
                self.position_seconds = clamped;
                SeekOutcome::Applied(clamped)
            }
            None => {
                self.deferred_seek = Some(target);
                SeekOutcome::Deferred
            }
        }
    }

    /// Records the media duration once metadata has loaded.
    ///
    /// If a seek is still pending from before the duration was known, it is
    /// applied now (clamped) and the resulting position returned. A seek that
    /// was already consumed is not replayed.
    pub fn on_duration_known(&mut self, seconds: f64) -> Option<f64> {
        let duration = sanitize(seconds);
        self.duration_seconds = Some(duration);

        let target = self.deferred_seek.take()?;
        let clamped = target.min(duration);
        self.position_seconds = clamped;
        Some(clamped)
    }

    /// Relative skip built on `request_seek`.
    pub fn skip(&mut self, delta_seconds: f64) -> SeekOutcome {
        self.request_seek(self.position_seconds + delta_seconds)
    }

    pub fn skip_forward(&mut self) -> SeekOutcome {
        self.skip(SKIP_SECONDS)
    }

    pub fn skip_back(&mut self) -> SeekOutcome {
        self.skip(-SKIP_SECONDS)
    }

    /// Toggles between playing and paused, returning the new playing state.
    pub fn toggle_playing(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    /// Sets the playback rate. Rates outside [`PLAYBACK_RATES`] are rejected.
    pub fn set_playback_rate(&mut self, rate: f64) -> bool {
        if PLAYBACK_RATES.contains(&rate) {
            self.playback_rate = rate;
            true
        } else {
            false
        }
    }
}

fn sanitize(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_clamps_to_duration_bounds() {
        let mut clock = PlaybackClock::new();
        clock.on_duration_known(100.0);

        assert_eq!(clock.request_seek(50.0), SeekOutcome::Applied(50.0));
        assert_eq!(clock.request_seek(150.0), SeekOutcome::Applied(100.0));
        assert_eq!(clock.request_seek(-10.0), SeekOutcome::Applied(0.0));
        assert_eq!(clock.request_seek(f64::NAN), SeekOutcome::Applied(0.0));
    }

    #[test]
    fn seek_before_metadata_is_deferred_not_dropped() {
        let mut clock = PlaybackClock::new();

        assert_eq!(clock.request_seek(42.0), SeekOutcome::Deferred);
        assert_eq!(clock.position_seconds(), 0.0);

        assert_eq!(clock.on_duration_known(100.0), Some(42.0));
        assert_eq!(clock.position_seconds(), 42.0);
    }

    #[test]
    fn deferred_seek_is_clamped_when_applied() {
        let mut clock = PlaybackClock::new();
        clock.request_seek(500.0);
        assert_eq!(clock.on_duration_known(100.0), Some(100.0));
    }

    #[test]
    fn duration_update_does_not_replay_consumed_seeks() {
        let mut clock = PlaybackClock::new();
        clock.on_duration_known(100.0);
        clock.request_seek(30.0);

        // A later metadata event must not move the transport again.
        assert_eq!(clock.on_duration_known(100.0), None);
        assert_eq!(clock.position_seconds(), 30.0);
    }

    #[test]
    fn skip_is_relative_and_clamped() {
        let mut clock = PlaybackClock::new();
        clock.on_duration_known(60.0);
        clock.on_time_advance(5.0);

        assert_eq!(clock.skip_back(), SeekOutcome::Applied(0.0));
        assert_eq!(clock.skip_forward(), SeekOutcome::Applied(10.0));
    }

    #[test]
    fn playback_rate_must_be_supported() {
        let mut clock = PlaybackClock::new();
        assert!(clock.set_playback_rate(1.5));
        assert_eq!(clock.playback_rate(), 1.5);
        assert!(!clock.set_playback_rate(3.0));
        assert_eq!(clock.playback_rate(), 1.5);
    }

    #[test]
    fn time_advance_sanitizes_input() {
        let mut clock = PlaybackClock::new();
        clock.on_time_advance(-3.0);
        assert_eq!(clock.position_seconds(), 0.0);
        clock.on_time_advance(12.5);
        assert_eq!(clock.position_seconds(), 12.5);
    }
}
