//! Lyrics cache in front of a [`LyricsSource`].
//!
//! Raw LRC text is kept per track for a limited time so repeated sessions on
//! the same song do not hit the network. Only hits are cached: a track without
//! synced lyrics is asked again next time.
//!
//! # Storage Format
//!
//! When a path is configured the cache is mirrored to a JSON file:
//!
//! ```text
//! { "entries": { "artist|title|album": { "artist", "title", "album",
//!                 "raw_lyrics", "fetched_at" } } }
//! ```

use crate::lyrics::providers::LyricsSource;
use crate::lyrics::types::{LyricsError, TrackQuery};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Cached entries stay fresh for an hour.
pub const DEFAULT_TTL_SECS: i64 = 60 * 60;

/// A single track's cached lyrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub artist: String,
    pub title: String,
    pub album: String,
    pub raw_lyrics: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    entries: HashMap<String, CacheEntry>,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Format: `artist|title|album` (all normalized)
fn cache_key(query: &TrackQuery) -> String {
    format!(
        "{}|{}|{}",
        normalize(&query.artist),
        normalize(&query.title),
        normalize(query.album.as_deref().unwrap_or(""))
    )
}

/// A [`LyricsSource`] wrapper that remembers successful lookups.
pub struct CachedLyrics<S> {
    inner: S,
    entries: Mutex<HashMap<String, CacheEntry>>,
    path: Option<PathBuf>,
    ttl: Duration,
}

impl<S: LyricsSource> CachedLyrics<S> {
    /// In-memory cache only.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
            path: None,
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
        }
    }

    /// Cache backed by a JSON file. A missing or unreadable file starts empty.
    pub async fn with_file(inner: S, path: PathBuf) -> Self {
        let entries = load_cache(&path).await;
        Self {
            inner,
            entries: Mutex::new(entries),
            path: Some(path),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn store(&self, key: String, query: &TrackQuery, raw: &str) {
        let mut guard = self.entries.lock().await;
        guard.insert(
            key,
            CacheEntry {
                artist: query.artist.clone(),
                title: query.title.clone(),
                album: query.album.clone().unwrap_or_default(),
                raw_lyrics: raw.to_string(),
                fetched_at: Utc::now(),
            },
        );
        let Some(path) = &self.path else {
            return;
        };
        let snapshot = CacheFile {
            entries: guard.clone(),
        };
        drop(guard);
        if let Err(e) = save_cache(&snapshot, path).await {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to save lyrics cache"
            );
        }
    }
}

impl<S: LyricsSource> LyricsSource for CachedLyrics<S> {
    async fn synced_lyrics(&self, query: &TrackQuery) -> Result<Option<String>, LyricsError> {
        let key = cache_key(query);
        {
            let guard = self.entries.lock().await;
            if let Some(entry) = guard.get(&key)
                && Utc::now() - entry.fetched_at < self.ttl
            {
                tracing::debug!(key = %key, "Lyrics cache hit");
                return Ok(Some(entry.raw_lyrics.clone()));
            }
        }

        let fetched = self.inner.synced_lyrics(query).await?;
        if let Some(raw) = &fetched {
            self.store(key, query, raw).await;
        }
        Ok(fetched)
    }
}

/// Loads cached entries from a JSON file, logging and starting empty on failure.
async fn load_cache(path: &Path) -> HashMap<String, CacheEntry> {
    match fs::read_to_string(path).await {
        Ok(contents) => match serde_json::from_str::<CacheFile>(&contents) {
            Ok(file) => {
                tracing::info!(
                    path = %path.display(),
                    entries = file.entries.len(),
                    "Loaded lyrics cache"
                );
                file.entries
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse lyrics cache, starting empty"
                );
                HashMap::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "Creating new lyrics cache");
            HashMap::new()
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read lyrics cache, starting empty"
            );
            HashMap::new()
        }
    }
}

/// Saves the cache to a JSON file, creating parent directories as needed.
async fn save_cache(file: &CacheFile, path: &Path) -> Result<(), LyricsError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(file)?;
    let mut out = fs::File::create(path).await?;
    out.write_all(json.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}
