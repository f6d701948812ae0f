//! Spotify Web API player control.

use crate::lyrics::types::http_client;
use crate::player::{PlaybackState, Player, PlayerError, TrackInfo};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1/me/player";

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    duration_ms: i64,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    #[serde(default)]
    album: Option<ApiAlbum>,
}

#[derive(Debug, Deserialize)]
struct ApiPlayerState {
    #[serde(default)]
    progress_ms: Option<i64>,
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    item: Option<ApiTrack>,
}

impl From<ApiPlayerState> for PlaybackState {
    fn from(api: ApiPlayerState) -> Self {
        let duration_ms = api.item.as_ref().map_or(0, |t| t.duration_ms);
        let track = api.item.map(|t| TrackInfo {
            title: t.name,
            artist: t
                .artists
                .into_iter()
                .map(|a| a.name)
                .collect::<Vec<_>>()
                .join(", "),
            album: t.album.map(|a| a.name).unwrap_or_default(),
            uri: t.uri,
        });
        PlaybackState {
            position_ms: api.progress_ms.unwrap_or(0).max(0),
            duration_ms,
            paused: !api.is_playing,
            track,
        }
    }
}

/// Parse a `GET /v1/me/player` body.
pub fn parse_player_state(body: &str) -> Result<PlaybackState, serde_json::Error> {
    Ok(serde_json::from_str::<ApiPlayerState>(body)?.into())
}

/// Drives the user's active Spotify device with an OAuth access token.
#[derive(Debug, Clone)]
pub struct SpotifyPlayer {
    token: String,
    base_url: String,
    track_uri: Option<String>,
}

impl SpotifyPlayer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: SPOTIFY_API_URL.to_string(),
            track_uri: None,
        }
    }

    /// Track to load (paused) on connect.
    pub fn with_track(mut self, uri: impl Into<String>) -> Self {
        self.track_uri = Some(uri.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = if endpoint.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };
        http_client().request(method, url).bearer_auth(&self.token)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, PlayerError> {
        let resp = req.send().await?;
        check_status(resp.status())?;
        Ok(resp)
    }

    async fn put(&self, endpoint: &str) -> Result<(), PlayerError> {
        // Spotify rejects body-less PUTs without a length header.
        self.send(self.request(Method::PUT, endpoint).header("Content-Length", "0"))
            .await?;
        Ok(())
    }
}

fn check_status(status: StatusCode) -> Result<(), PlayerError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED => Err(PlayerError::Unauthorized),
        StatusCode::NOT_FOUND => Err(PlayerError::NoActiveDevice),
        s => Err(PlayerError::Api(format!("HTTP {s}"))),
    }
}

impl Player for SpotifyPlayer {
    async fn connect(&self) -> Result<(), PlayerError> {
        let Some(uri) = &self.track_uri else {
            tracing::debug!("Spotify player connected without a track to load");
            return Ok(());
        };
        let body = serde_json::json!({ "uris": [uri] });
        self.send(self.request(Method::PUT, "play").json(&body)).await?;
        self.put("pause").await?;
        tracing::info!(uri = %uri, "Loaded track on Spotify device");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), PlayerError> {
        // The device belongs to the user; leave it playing.
        Ok(())
    }

    async fn get_current_state(&self) -> Result<Option<PlaybackState>, PlayerError> {
        let resp = self.send(self.request(Method::GET, "")).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        parse_player_state(&body)
            .map(Some)
            .map_err(|e| PlayerError::Api(format!("bad player state: {e}")))
    }

    async fn seek(&self, position_ms: i64) -> Result<(), PlayerError> {
        self.put(&format!("seek?position_ms={}", position_ms.max(0)))
            .await
    }

    async fn toggle_play(&self) -> Result<(), PlayerError> {
        let playing = self
            .get_current_state()
            .await?
            .is_some_and(|s| !s.paused);
        self.put(if playing { "pause" } else { "play" }).await
    }
}
