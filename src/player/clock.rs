//! Simulated player: a monotonic clock over a fixed track length.

use crate::player::{PlaybackState, Player, PlayerError, TrackInfo};
use crate::timer::PlaybackTimer;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct ClockState {
    connected: bool,
    timer: PlaybackTimer,
}

/// Plays nothing, but keeps time like a player would.
///
/// Useful without streaming credentials, and as the player in tests.
#[derive(Debug)]
pub struct ClockPlayer {
    duration_ms: i64,
    track: TrackInfo,
    state: Mutex<ClockState>,
}

impl ClockPlayer {
    pub fn new(track: TrackInfo, duration_ms: i64) -> Self {
        Self {
            duration_ms: duration_ms.max(0),
            track,
            state: Mutex::new(ClockState::default()),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }
}

impl Player for ClockPlayer {
    /// Connecting starts playback from the beginning.
    async fn connect(&self) -> Result<(), PlayerError> {
        let mut state = self.state.lock().await;
        state.connected = true;
        state.timer.set_position(0);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PlayerError> {
        let mut state = self.state.lock().await;
        state.connected = false;
        state.timer.mark_paused();
        Ok(())
    }

    async fn get_current_state(&self) -> Result<Option<PlaybackState>, PlayerError> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Err(PlayerError::NotConnected);
        }
        let mut position_ms = state.timer.estimate();
        if position_ms >= self.duration_ms {
            position_ms = self.duration_ms;
            state.timer.reset(position_ms);
        }
        Ok(Some(PlaybackState {
            position_ms,
            duration_ms: self.duration_ms,
            paused: !state.timer.is_running(),
            track: Some(self.track.clone()),
        }))
    }

    async fn seek(&self, position_ms: i64) -> Result<(), PlayerError> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Err(PlayerError::NotConnected);
        }
        let target = position_ms.clamp(0, self.duration_ms);
        if state.timer.is_running() {
            state.timer.set_position(target);
        } else {
            state.timer.reset(target);
        }
        Ok(())
    }

    async fn toggle_play(&self) -> Result<(), PlayerError> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Err(PlayerError::NotConnected);
        }
        if state.timer.is_running() {
            state.timer.mark_paused();
        } else if state.timer.estimate() < self.duration_ms {
            state.timer.mark_playing();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn player() -> ClockPlayer {
        ClockPlayer::new(TrackInfo::default(), 10_000)
    }

    async fn position(p: &ClockPlayer) -> i64 {
        p.get_current_state().await.unwrap().unwrap().position_ms
    }

    #[tokio::test(start_paused = true)]
    async fn requires_connect() {
        let p = player();
        assert!(matches!(p.get_current_state().await, Err(PlayerError::NotConnected)));
        assert!(matches!(p.seek(10).await, Err(PlayerError::NotConnected)));
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_time_and_pauses() {
        let p = player();
        p.connect().await.unwrap();
        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert_eq!(position(&p).await, 1_500);

        p.toggle_play().await.unwrap();
        tokio::time::advance(Duration::from_millis(1_000)).await;
        let state = p.get_current_state().await.unwrap().unwrap();
        assert!(state.paused);
        assert_eq!(state.position_ms, 1_500);

        p.seek(8_000).await.unwrap();
        assert_eq!(position(&p).await, 8_000);
        p.toggle_play().await.unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(position(&p).await, 8_500);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_track_end() {
        let p = player();
        p.connect().await.unwrap();
        p.seek(50_000).await.unwrap();
        tokio::time::advance(Duration::from_millis(100)).await;
        let state = p.get_current_state().await.unwrap().unwrap();
        assert_eq!(state.position_ms, 10_000);
        assert!(state.paused);
    }
}
