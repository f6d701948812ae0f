//! Playback control seam: the only place that knows how a player is driven.

pub mod clock;
pub mod spotify;

pub use clock::ClockPlayer;
pub use spotify::SpotifyPlayer;

use std::future::Future;
use thiserror::Error;

/// Errors that can occur while talking to a player
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Player rejected the access token")]
    Unauthorized,
    #[error("Player API error: {0}")]
    Api(String),
    #[error("No active playback device")]
    NoActiveDevice,
    #[error("Player is not connected")]
    NotConnected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub uri: Option<String>,
}

impl TrackInfo {
    /// Spotify track id from `spotify:track:<id>` or an `.../track/<id>` URL.
    pub fn spotify_id(&self) -> Option<&str> {
        let uri = self.uri.as_deref()?;
        let id = match uri.find("spotify:track:") {
            Some(idx) => &uri[idx + "spotify:track:".len()..],
            None => uri.rsplit('/').next()?.split('?').next()?,
        };
        (!id.is_empty()).then_some(id)
    }
}

/// One snapshot of the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub position_ms: i64,
    pub duration_ms: i64,
    pub paused: bool,
    pub track: Option<TrackInfo>,
}

/// Narrow interface over a playback backend.
///
/// `get_current_state` returning `Ok(None)` means the backend is reachable
/// but has nothing loaded.
pub trait Player: Send + Sync {
    fn connect(&self) -> impl Future<Output = Result<(), PlayerError>> + Send;
    fn disconnect(&self) -> impl Future<Output = Result<(), PlayerError>> + Send;
    fn get_current_state(
        &self,
    ) -> impl Future<Output = Result<Option<PlaybackState>, PlayerError>> + Send;
    fn seek(&self, position_ms: i64) -> impl Future<Output = Result<(), PlayerError>> + Send;
    fn toggle_play(&self) -> impl Future<Output = Result<(), PlayerError>> + Send;
}
