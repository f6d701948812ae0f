//! Persistence seam for songs and their saved versions.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::arrangement::Arrangement;
use crate::lyrics::{LyricLine, TrackQuery};
use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stored JSON is invalid: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Version {0} not found")]
    NotFound(i64),
    #[error("Version {version_id} is not owned by {user_id}")]
    NotOwner { version_id: i64, user_id: String },
}

/// Songs are identified by artist and title.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SongKey {
    pub artist: String,
    pub title: String,
}

impl SongKey {
    pub fn new(artist: &str, title: &str) -> Self {
        Self {
            artist: artist.trim().to_string(),
            title: title.trim().to_string(),
        }
    }

    pub fn query(&self) -> TrackQuery {
        TrackQuery::new(self.artist.clone(), self.title.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub id: i64,
    pub artist: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

/// What a version holds: the arrangement and, for versions saved with them,
/// the lyric lines it was authored against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionSnapshot {
    pub arrangement: Arrangement,
    pub lyrics: Option<Vec<LyricLine>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionRecord {
    pub id: i64,
    pub song_id: i64,
    pub user_id: String,
    pub snapshot: VersionSnapshot,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

/// Listing row; leaves the JSON columns out.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionSummary {
    pub id: i64,
    pub user_id: String,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub placements: usize,
}

pub trait VersionStore: Send + Sync {
    fn find_song(
        &self,
        key: &SongKey,
    ) -> impl Future<Output = Result<Option<SongRecord>, StoreError>> + Send;

    /// Existing song for `key`, or a newly created one.
    fn upsert_song(&self, key: &SongKey)
    -> impl Future<Output = Result<SongRecord, StoreError>> + Send;

    fn get_version(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<VersionRecord>, StoreError>> + Send;

    /// Featured version if there is one, else the most recent.
    fn latest_version(
        &self,
        song_id: i64,
    ) -> impl Future<Output = Result<Option<VersionRecord>, StoreError>> + Send;

    fn list_versions(
        &self,
        song_id: i64,
    ) -> impl Future<Output = Result<Vec<VersionSummary>, StoreError>> + Send;

    fn insert_version(
        &self,
        song_id: i64,
        user_id: &str,
        snapshot: &VersionSnapshot,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Owner-scoped overwrite.
    fn update_version(
        &self,
        id: i64,
        user_id: &str,
        snapshot: &VersionSnapshot,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Owner-scoped delete.
    fn delete_version(
        &self,
        id: i64,
        user_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Featuring a version un-features the song's other versions.
    fn set_featured(
        &self,
        id: i64,
        featured: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
