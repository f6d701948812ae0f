pub mod lrclib;

pub use lrclib::LrclibClient;

use crate::lyrics::types::{LyricsError, TrackQuery};
use std::future::Future;

/// Anything that can look up raw synced (LRC) lyrics for a track.
///
/// `Ok(None)` means the source has no synced lyrics for the track, which is a
/// normal outcome and not an error.
pub trait LyricsSource: Send + Sync {
    fn synced_lyrics(
        &self,
        query: &TrackQuery,
    ) -> impl Future<Output = Result<Option<String>, LyricsError>> + Send;
}
