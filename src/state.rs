// state.rs: State shared between the playback loop and the views

use crate::lyrics::LyricLine;
use crate::player::{PlaybackState, TrackInfo};
use crate::tracker::LineTracker;
use std::sync::Arc;

/// Snapshot sent from the playback loop to a view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub lines: Arc<Vec<LyricLine>>,
    /// Line to highlight: a pending seek target, else the live line.
    pub index: Option<usize>,
    /// Line derived from the playback position alone.
    pub current: Option<usize>,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub playing: bool,
    pub track: Option<TrackInfo>,
    pub err: Option<String>,
    pub version: u64, // Incremented on any state change
}

impl Update {
    pub fn seek_pending(&self) -> bool {
        self.index != self.current
    }
}

/// Last observed player state.
#[derive(Debug, Default, PartialEq)]
pub struct PlayerState {
    pub playing: bool,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub track: Option<TrackInfo>,
    pub err: Option<String>,
}

impl PlayerState {
    /// Apply a poll result; returns true when anything visible changed.
    pub fn update_playback(&mut self, state: Option<&PlaybackState>) -> bool {
        let (playing, position_ms, duration_ms, track) = match state {
            Some(s) => (!s.paused, s.position_ms, s.duration_ms, s.track.clone()),
            None => (false, self.position_ms, self.duration_ms, self.track.clone()),
        };
        let changed = self.playing != playing
            || self.position_ms != position_ms
            || self.duration_ms != duration_ms
            || self.track != track;
        self.playing = playing;
        self.position_ms = position_ms;
        self.duration_ms = duration_ms;
        self.track = track;
        changed
    }
}

/// Bundles all state for the player and lyrics, plus versioning.
pub struct StateBundle {
    pub lines: Arc<Vec<LyricLine>>,
    pub tracker: LineTracker,
    pub player_state: PlayerState,
    pub version: u64, // Incremented on any state change
    /// Version of the last `Update` delivered.
    pub last_sent: Option<u64>,
}

impl StateBundle {
    pub fn new(lines: Vec<LyricLine>) -> Self {
        Self {
            lines: Arc::new(lines),
            tracker: LineTracker::new(),
            player_state: PlayerState::default(),
            version: 0,
            last_sent: None,
        }
    }

    /// Apply a successful poll and recompute the active line.
    pub fn update_playback(&mut self, state: Option<&PlaybackState>) -> bool {
        let mut changed = self.player_state.update_playback(state);
        changed |= self
            .tracker
            .update(self.player_state.position_ms, &self.lines);
        changed |= self.player_state.err.take().is_some();
        if changed {
            self.version += 1;
        }
        changed
    }

    pub fn set_error(&mut self, err: Option<String>) -> bool {
        if self.player_state.err == err {
            return false;
        }
        self.player_state.err = err;
        self.version += 1;
        true
    }

    /// Record the user's seek target; it stays highlighted until playback
    /// reaches it.
    pub fn request_seek(&mut self, line_index: usize) {
        self.tracker.request_seek(line_index);
        self.version += 1;
    }

    pub fn cancel_seek(&mut self) {
        if self.tracker.pending_seek().is_some() {
            self.tracker.clear_seek();
            self.version += 1;
        }
    }

    pub fn to_update(&self) -> Update {
        Update {
            lines: Arc::clone(&self.lines),
            index: self.tracker.highlighted(),
            current: self.tracker.current(),
            position_ms: self.player_state.position_ms,
            duration_ms: self.player_state.duration_ms,
            playing: self.player_state.playing,
            track: self.player_state.track.clone(),
            err: self.player_state.err.clone(),
            version: self.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::parse_lrc;

    fn playing_at(position_ms: i64) -> PlaybackState {
        PlaybackState {
            position_ms,
            duration_ms: 60_000,
            paused: false,
            track: None,
        }
    }

    #[test]
    fn version_moves_only_on_change() {
        let mut state = StateBundle::new(parse_lrc("[00:01.00]a\n[00:05.00]b").lines);
        assert!(state.update_playback(Some(&playing_at(1_500))));
        let v = state.version;
        assert!(!state.update_playback(Some(&playing_at(1_500))));
        assert_eq!(state.version, v);
        assert!(state.update_playback(Some(&playing_at(5_500))));
        assert_eq!(state.to_update().index, Some(1));
    }

    #[test]
    fn errors_clear_on_next_good_poll() {
        let mut state = StateBundle::new(Vec::new());
        assert!(state.set_error(Some("boom".into())));
        assert!(!state.set_error(Some("boom".into())));
        assert_eq!(state.to_update().err.as_deref(), Some("boom"));
        state.update_playback(Some(&playing_at(0)));
        assert!(state.to_update().err.is_none());
    }

    #[test]
    fn empty_poll_pauses_but_keeps_position() {
        let mut state = StateBundle::new(Vec::new());
        state.update_playback(Some(&playing_at(3_000)));
        state.update_playback(None);
        let update = state.to_update();
        assert!(!update.playing);
        assert_eq!(update.position_ms, 3_000);
    }

    #[test]
    fn seek_request_is_visible_in_update() {
        let mut state = StateBundle::new(parse_lrc("[00:01.00]a\n[00:05.00]b").lines);
        state.update_playback(Some(&playing_at(1_500)));
        state.request_seek(1);
        let update = state.to_update();
        assert_eq!(update.index, Some(1));
        assert_eq!(update.current, Some(0));
        assert!(update.seek_pending());
    }
}
