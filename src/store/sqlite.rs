//! SQLite-backed [`VersionStore`].
//!
//! # Schema
//!
//! ```text
//! songs      (id, artist, title, updated_at, UNIQUE(artist, title))
//! song_edits (id, song_id -> songs, user_id, chord_data JSON, chords JSON,
//!             lyrics JSON NULL, is_featured, created_at)
//! ```
//!
//! `chord_data` holds the placements and `chords` the palette.

use crate::arrangement::{Arrangement, ChordPlacement, PaletteChord};
use crate::lyrics::LyricLine;
use crate::store::{
    SongKey, SongRecord, StoreError, VersionRecord, VersionSnapshot, VersionStore,
    VersionSummary,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

const CREATE_SONGS: &str = r#"
    CREATE TABLE IF NOT EXISTS songs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        artist TEXT NOT NULL,
        title TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(artist, title)
    )
"#;

const CREATE_SONG_EDITS: &str = r#"
    CREATE TABLE IF NOT EXISTS song_edits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        song_id INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        chord_data TEXT NOT NULL,
        chords TEXT NOT NULL,
        lyrics TEXT,
        is_featured INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
"#;

const VERSION_COLUMNS: &str =
    "id, song_id, user_id, chord_data, chords, lyrics, is_featured, created_at";

type VersionRow = (
    i64,
    i64,
    String,
    String,
    String,
    Option<String>,
    bool,
    DateTime<Utc>,
);

fn version_from_row(row: VersionRow) -> Result<VersionRecord, StoreError> {
    let (id, song_id, user_id, chord_data, chords, lyrics, is_featured, created_at) = row;
    let placements: Vec<ChordPlacement> = serde_json::from_str(&chord_data)?;
    let palette: Vec<PaletteChord> = serde_json::from_str(&chords)?;
    let lyrics: Option<Vec<LyricLine>> = lyrics.as_deref().map(serde_json::from_str).transpose()?;
    Ok(VersionRecord {
        id,
        song_id,
        user_id,
        snapshot: VersionSnapshot {
            arrangement: Arrangement::from_parts(placements, palette),
            lyrics,
        },
        is_featured,
        created_at,
    })
}

/// JSON for the `chord_data`, `chords` and `lyrics` columns.
fn snapshot_columns(
    snapshot: &VersionSnapshot,
) -> Result<(String, String, Option<String>), StoreError> {
    Ok((
        serde_json::to_string(snapshot.arrangement.placements())?,
        serde_json::to_string(snapshot.arrangement.chords())?,
        snapshot
            .lyrics
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?,
    ))
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://chordsync.db?mode=rwc`) and create the
    /// schema if needed.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        let store = Self::from_pool(pool).await?;
        tracing::info!(url = %url, "Opened version store");
        Ok(store)
    }

    /// Private in-memory database; one connection so every query sees it.
    pub async fn memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
        sqlx::query(CREATE_SONGS).execute(&pool).await?;
        sqlx::query(CREATE_SONG_EDITS).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Owner of a version, distinguishing a missing row from a foreign one.
    async fn check_owner(&self, id: i64, user_id: &str) -> Result<(), StoreError> {
        let owner: Option<(String,)> = sqlx::query_as("SELECT user_id FROM song_edits WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match owner {
            None => Err(StoreError::NotFound(id)),
            Some((owner,)) if owner != user_id => Err(StoreError::NotOwner {
                version_id: id,
                user_id: user_id.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    async fn touch_song(&self, song_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE songs SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(song_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl VersionStore for SqliteStore {
    async fn find_song(&self, key: &SongKey) -> Result<Option<SongRecord>, StoreError> {
        let row: Option<(i64, String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, artist, title, updated_at FROM songs WHERE artist = ? AND title = ?",
        )
        .bind(&key.artist)
        .bind(&key.title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, artist, title, updated_at)| SongRecord {
            id,
            artist,
            title,
            updated_at,
        }))
    }

    async fn upsert_song(&self, key: &SongKey) -> Result<SongRecord, StoreError> {
        if let Some(song) = self.find_song(key).await? {
            return Ok(song);
        }
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO songs (artist, title, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(artist, title) DO NOTHING
            "#,
        )
        .bind(&key.artist)
        .bind(&key.title)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let song = self
            .find_song(key)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        tracing::debug!(song_id = song.id, artist = %key.artist, title = %key.title, "Created song");
        Ok(song)
    }

    async fn get_version(&self, id: i64) -> Result<Option<VersionRecord>, StoreError> {
        let row: Option<VersionRow> =
            sqlx::query_as(&format!("SELECT {VERSION_COLUMNS} FROM song_edits WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(version_from_row).transpose()
    }

    async fn latest_version(&self, song_id: i64) -> Result<Option<VersionRecord>, StoreError> {
        let row: Option<VersionRow> = sqlx::query_as(&format!(
            "SELECT {VERSION_COLUMNS} FROM song_edits WHERE song_id = ? \
             ORDER BY is_featured DESC, id DESC LIMIT 1"
        ))
        .bind(song_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(version_from_row).transpose()
    }

    async fn list_versions(&self, song_id: i64) -> Result<Vec<VersionSummary>, StoreError> {
        let rows: Vec<(i64, String, bool, DateTime<Utc>, String)> = sqlx::query_as(
            r#"
            SELECT id, user_id, is_featured, created_at, chord_data
            FROM song_edits
            WHERE song_id = ?
            ORDER BY id DESC
            "#,
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, user_id, is_featured, created_at, chord_data)| {
                let placements: Vec<ChordPlacement> = serde_json::from_str(&chord_data)?;
                Ok(VersionSummary {
                    id,
                    user_id,
                    is_featured,
                    created_at,
                    placements: placements.len(),
                })
            })
            .collect()
    }

    async fn insert_version(
        &self,
        song_id: i64,
        user_id: &str,
        snapshot: &VersionSnapshot,
    ) -> Result<i64, StoreError> {
        let (chord_data, chords, lyrics) = snapshot_columns(snapshot)?;
        let result = sqlx::query(
            r#"
            INSERT INTO song_edits (song_id, user_id, chord_data, chords, lyrics, is_featured, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(song_id)
        .bind(user_id)
        .bind(&chord_data)
        .bind(&chords)
        .bind(&lyrics)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.touch_song(song_id).await?;
        tracing::debug!(version_id = id, song_id, user_id = %user_id, "Inserted version");
        Ok(id)
    }

    async fn update_version(
        &self,
        id: i64,
        user_id: &str,
        snapshot: &VersionSnapshot,
    ) -> Result<(), StoreError> {
        let (chord_data, chords, lyrics) = snapshot_columns(snapshot)?;
        let result = sqlx::query(
            r#"
            UPDATE song_edits SET chord_data = ?, chords = ?, lyrics = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&chord_data)
        .bind(&chords)
        .bind(&lyrics)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return self.check_owner(id, user_id).await;
        }
        let song: Option<(i64,)> = sqlx::query_as("SELECT song_id FROM song_edits WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some((song_id,)) = song {
            self.touch_song(song_id).await?;
        }
        Ok(())
    }

    async fn delete_version(&self, id: i64, user_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM song_edits WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return self.check_owner(id, user_id).await;
        }
        tracing::info!(version_id = id, "Deleted version");
        Ok(())
    }

    async fn set_featured(&self, id: i64, featured: bool) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let song: Option<(i64,)> = sqlx::query_as("SELECT song_id FROM song_edits WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some((song_id,)) = song else {
            return Err(StoreError::NotFound(id));
        };
        if featured {
            sqlx::query("UPDATE song_edits SET is_featured = 0 WHERE song_id = ?")
                .bind(song_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("UPDATE song_edits SET is_featured = ? WHERE id = ?")
            .bind(featured)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
