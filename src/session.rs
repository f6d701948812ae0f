//! Decide where a play-along session's lyrics and chords come from, and
//! write them back.

use crate::arrangement::Arrangement;
use crate::chords::ChordCatalog;
use crate::lyrics::{LyricLine, LyricsError, LyricsSource, parse_enhanced_lrc};
use crate::store::{SongKey, StoreError, VersionSnapshot, VersionStore};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Lyrics(#[from] LyricsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("No synced lyrics found for {artist} - {title}")]
    NoLyrics { artist: String, title: String },
}

/// Which version to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    /// A saved version by id; unknown ids and versions of other songs start
    /// fresh.
    Specific(i64),
    /// The song's featured or newest version, if any.
    Latest,
    /// Fresh lyrics and an empty arrangement.
    Fresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Saved,
    Fetched,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSession {
    pub key: SongKey,
    /// `None` until the first save.
    pub version_id: Option<i64>,
    pub lines: Vec<LyricLine>,
    pub arrangement: Arrangement,
    pub origin: Origin,
}

impl LoadedSession {
    pub fn snapshot(&self) -> VersionSnapshot {
        VersionSnapshot {
            arrangement: self.arrangement.clone(),
            lyrics: Some(self.lines.clone()),
        }
    }

    pub fn save_target(&self, user_id: &str) -> SaveTarget {
        SaveTarget {
            key: self.key.clone(),
            user_id: user_id.to_string(),
            version_id: self.version_id,
        }
    }
}

/// Where a save goes: the song, the owner, and the version once it exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    pub key: SongKey,
    pub user_id: String,
    pub version_id: Option<i64>,
}

/// Fetch and parse lyrics; text without timestamped lines counts as missing.
async fn fetch_lines<L: LyricsSource>(
    lyrics: &L,
    key: &SongKey,
) -> Result<Option<Vec<LyricLine>>, LyricsError> {
    let Some(raw) = lyrics.synced_lyrics(&key.query()).await? else {
        return Ok(None);
    };
    let parsed = parse_enhanced_lrc(&raw);
    if parsed.is_empty() {
        tracing::warn!(artist = %key.artist, title = %key.title, "Lyrics had no synced lines");
        return Ok(None);
    }
    Ok(Some(parsed.lines))
}

/// Load a session.
///
/// A saved version is authoritative: its stored lines and arrangement are used
/// as they are. Versions saved without lines get freshly fetched ones but keep
/// their arrangement. Without a saved version, lyrics are fetched and the
/// arrangement starts empty.
pub async fn reconcile<S, L>(
    store: &S,
    lyrics: &L,
    key: &SongKey,
    selector: VersionSelector,
) -> Result<LoadedSession, SessionError>
where
    S: VersionStore,
    L: LyricsSource,
{
    let saved = match selector {
        VersionSelector::Specific(id) => match store.get_version(id).await? {
            None => {
                tracing::warn!(version_id = id, "Saved version not found, starting fresh");
                None
            }
            Some(version) => {
                let song_id = store.find_song(key).await?.map(|s| s.id);
                if song_id == Some(version.song_id) {
                    Some(version)
                } else {
                    tracing::warn!(
                        version_id = id,
                        artist = %key.artist,
                        title = %key.title,
                        "Saved version belongs to another song, starting fresh"
                    );
                    None
                }
            }
        },
        VersionSelector::Latest => match store.find_song(key).await? {
            Some(song) => store.latest_version(song.id).await?,
            None => None,
        },
        VersionSelector::Fresh => None,
    };

    if let Some(version) = saved {
        let VersionSnapshot {
            mut arrangement,
            lyrics: stored,
        } = version.snapshot;
        let lines = match stored {
            Some(lines) if !lines.is_empty() => lines,
            _ => fetch_lines(lyrics, key).await?.unwrap_or_default(),
        };
        if arrangement.chords().is_empty() {
            let palette = Arrangement::palette_from_words(&lines);
            if !palette.is_empty() {
                arrangement = Arrangement::from_parts(arrangement.placements().to_vec(), palette);
            }
        }
        tracing::info!(
            version_id = version.id,
            lines = lines.len(),
            placements = arrangement.placements().len(),
            "Loaded saved version"
        );
        return Ok(LoadedSession {
            key: key.clone(),
            version_id: Some(version.id),
            lines,
            arrangement,
            origin: Origin::Saved,
        });
    }

    let lines = fetch_lines(lyrics, key)
        .await?
        .ok_or_else(|| SessionError::NoLyrics {
            artist: key.artist.clone(),
            title: key.title.clone(),
        })?;
    tracing::info!(lines = lines.len(), "Starting new version from fetched lyrics");
    Ok(LoadedSession {
        key: key.clone(),
        version_id: None,
        lines,
        arrangement: Arrangement::new(),
        origin: Origin::Fetched,
    })
}

/// Write the snapshot: reuse or create the song, then insert the version on
/// first save or update the known one. Returns the version id.
pub async fn save_version<S: VersionStore>(
    store: &S,
    target: &SaveTarget,
    snapshot: &VersionSnapshot,
) -> Result<i64, StoreError> {
    let song = store.upsert_song(&target.key).await?;
    match target.version_id {
        Some(id) => {
            store.update_version(id, &target.user_id, snapshot).await?;
            Ok(id)
        }
        None => store.insert_version(song.id, &target.user_id, snapshot).await,
    }
}

/// Add palette chords requested up front and save right away when any were
/// new, so they survive even if the session ends before an autosave fires.
///
/// Names already in the palette and names the catalog rejects are skipped.
/// Returns the saved version id, or `None` when nothing changed.
pub async fn extend_palette<S: VersionStore>(
    store: &S,
    session: &mut LoadedSession,
    user_id: &str,
    names: &[String],
    catalog: &ChordCatalog,
) -> Result<Option<i64>, StoreError> {
    let mut added = 0;
    for name in names {
        let name = name.trim();
        if session.arrangement.chords().iter().any(|c| c.chord_name == name) {
            continue;
        }
        match session.arrangement.add_chord(name, catalog) {
            Ok(_) => added += 1,
            Err(e) => tracing::warn!(error = %e, "Skipping palette chord"),
        }
    }
    if added == 0 {
        return Ok(None);
    }
    let id = save_version(store, &session.save_target(user_id), &session.snapshot()).await?;
    tracing::info!(version_id = id, added, "Saved palette additions");
    session.version_id = Some(id);
    Ok(Some(id))
}
