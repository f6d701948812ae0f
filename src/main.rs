mod arrangement;
mod autosave;
mod chords;
mod event;
mod lyrics;
mod player;
mod pool;
mod session;
mod state;
mod store;
mod text_utils;
mod timer;
mod tracker;
mod ui;

use crate::autosave::Autosave;
use crate::chords::{ChordCatalog, diagram};
use crate::lyrics::parse::to_lrc;
use crate::lyrics::{CachedLyrics, LrclibClient};
use crate::player::{ClockPlayer, Player, SpotifyPlayer, TrackInfo};
use crate::session::{LoadedSession, SessionError, VersionSelector};
use crate::store::{SongKey, SqliteStore, VersionStore};
use crate::text_utils::format_ms;
use crate::ui::pipe::pipe_line;
use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_DATABASE: &str = "sqlite://chordsync.db?mode=rwc";
const DEFAULT_USER: &str = "local";
/// Simulated playback runs this long past the last lyric line.
const CLOCK_TAIL_MS: i64 = 5_000;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug_log: bool,
    /// How often the player is polled
    #[arg(long, global = true, default_value_t = 500)]
    pub poll_interval_ms: u64,
    /// Quiet period before edits are saved
    #[arg(long, global = true, default_value_t = autosave::DEFAULT_DELAY_MS)]
    pub autosave_ms: u64,
    /// JSON file mirroring the lyrics cache (default: memory only)
    #[arg(long, global = true)]
    pub lyrics_cache: Option<PathBuf>,
    /// SQLite URL for saved versions. Falls back to CHORDSYNC_DATABASE.
    #[arg(long, global = true)]
    pub database: Option<String>,
    /// Owner of saved versions. Falls back to CHORDSYNC_USER.
    #[arg(long, global = true)]
    pub user: Option<String>,
    /// chords-db style guitar.json replacing the bundled catalog. Falls back
    /// to CHORDSYNC_CATALOG.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
    /// Spotify OAuth token. Falls back to SPOTIFY_ACCESS_TOKEN; without one a
    /// simulated player is used.
    #[arg(long, global = true)]
    pub spotify_token: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct SongArgs {
    #[arg(long)]
    pub artist: String,
    #[arg(long)]
    pub title: String,
}

impl SongArgs {
    fn key(&self) -> SongKey {
        SongKey::new(&self.artist, &self.title)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Play along with synced lyrics and place chords
    Play {
        #[command(flatten)]
        song: SongArgs,
        /// Open a saved version by id
        #[arg(long, conflicts_with = "fresh")]
        version: Option<i64>,
        /// Ignore saved versions and start from fetched lyrics
        #[arg(long)]
        fresh: bool,
        /// Spotify track to play (spotify:track:... or an open.spotify.com URL)
        #[arg(long)]
        uri: Option<String>,
        /// Add a chord to the palette (repeatable)
        #[arg(long = "chord", value_name = "NAME")]
        chords: Vec<String>,
        /// Print lines with their chords to stdout instead of the full-screen view
        #[arg(long)]
        pipe: bool,
    },
    /// Print a song's lyric lines with their timings and chords
    Lyrics {
        #[command(flatten)]
        song: SongArgs,
        /// Also print per-word timings
        #[arg(long)]
        words: bool,
        /// Print as LRC text instead
        #[arg(long, conflicts_with = "words")]
        lrc: bool,
    },
    /// Draw a chord's voicings
    Chord {
        name: String,
        /// Only this voicing (1-based)
        #[arg(long)]
        voicing: Option<usize>,
    },
    /// List saved versions of a song
    Versions {
        #[command(flatten)]
        song: SongArgs,
    },
    /// Delete one of your saved versions
    DeleteVersion { id: i64 },
    /// Mark a version as the song's featured version
    Feature {
        id: i64,
        /// Remove the featured mark instead
        #[arg(long)]
        off: bool,
    },
}

fn env_if_empty(value: &mut Option<String>, var: &str) {
    if value.is_none()
        && let Ok(s) = std::env::var(var)
    {
        let s = s.trim();
        if !s.is_empty() {
            *value = Some(s.to_string());
        }
    }
}

fn settings_from_env_if_empty(cli: &mut Config) {
    env_if_empty(&mut cli.database, "CHORDSYNC_DATABASE");
    env_if_empty(&mut cli.user, "CHORDSYNC_USER");
    env_if_empty(&mut cli.spotify_token, "SPOTIFY_ACCESS_TOKEN");
    if cli.catalog.is_none()
        && let Ok(p) = std::env::var("CHORDSYNC_CATALOG")
        && !p.trim().is_empty()
    {
        cli.catalog = Some(PathBuf::from(p.trim()));
    }
}

impl Config {
    fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }

    fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }

    async fn lyrics(&self) -> CachedLyrics<LrclibClient> {
        match &self.lyrics_cache {
            Some(path) => CachedLyrics::with_file(LrclibClient::default(), path.clone()).await,
            None => CachedLyrics::new(LrclibClient::default()),
        }
    }
}

fn init_tracing(debug_log: bool) {
    let filter = if debug_log {
        EnvFilter::new("chordsync=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut cfg = Config::parse();
    settings_from_env_if_empty(&mut cfg);
    init_tracing(cfg.debug_log);

    let loaded;
    let catalog: &ChordCatalog = match &cfg.catalog {
        Some(path) => {
            loaded = ChordCatalog::load(path)?;
            &loaded
        }
        None => ChordCatalog::bundled(),
    };

    let result = match cfg.command.clone() {
        Commands::Play {
            song,
            version,
            fresh,
            uri,
            chords,
            pipe,
        } => {
            let selector = match (version, fresh) {
                (Some(id), _) => VersionSelector::Specific(id),
                (None, true) => VersionSelector::Fresh,
                (None, false) => VersionSelector::Latest,
            };
            play(&cfg, catalog, song.key(), selector, uri, &chords, pipe).await
        }
        Commands::Lyrics { song, words, lrc } => print_lyrics(&cfg, song.key(), words, lrc).await,
        Commands::Chord { name, voicing } => print_chord(catalog, &name, voicing),
        Commands::Versions { song } => list_versions(&cfg, song.key()).await,
        Commands::DeleteVersion { id } => {
            let store = SqliteStore::open(cfg.database()).await?;
            store.delete_version(id, cfg.user()).await?;
            println!("Deleted version {id}");
            Ok(())
        }
        Commands::Feature { id, off } => {
            let store = SqliteStore::open(cfg.database()).await?;
            store.set_featured(id, !off).await?;
            println!("Version {id} {}", if off { "unfeatured" } else { "featured" });
            Ok(())
        }
    };

    // Print error if any, for better diagnostics
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e);
    }
    Ok(())
}

async fn play(
    cfg: &Config,
    catalog: &ChordCatalog,
    key: SongKey,
    selector: VersionSelector,
    uri: Option<String>,
    chords: &[String],
    pipe: bool,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = Arc::new(SqliteStore::open(cfg.database()).await?);
    let lyrics = cfg.lyrics().await;
    let mut session = session::reconcile(&*store, &lyrics, &key, selector).await?;
    if session.lines.is_empty() {
        return Err(SessionError::NoLyrics {
            artist: key.artist,
            title: key.title,
        }
        .into());
    }

    // Edits to someone else's version are saved as a new version of ours.
    if let Some(id) = session.version_id
        && let Some(record) = store.get_version(id).await?
        && record.user_id != cfg.user()
    {
        tracing::info!(version_id = id, owner = %record.user_id, "Editing a copy of another user's version");
        session.version_id = None;
    }

    session::extend_palette(&*store, &mut session, cfg.user(), chords, catalog).await?;

    let track = TrackInfo {
        title: key.title.clone(),
        artist: key.artist.clone(),
        album: String::new(),
        uri: uri.clone(),
    };
    match &cfg.spotify_token {
        Some(token) => {
            let mut player = SpotifyPlayer::new(token.clone());
            if let Some(uri) = uri {
                player = player.with_track(uri);
            }
            run_view(cfg, catalog, store, session, player, pipe).await
        }
        None => {
            let end = session.lines.last().map_or(0, |l| l.end_timestamp);
            let player = ClockPlayer::new(track, end + CLOCK_TAIL_MS);
            run_view(cfg, catalog, store, session, player, pipe).await
        }
    }
}

async fn run_view<P: Player + 'static>(
    cfg: &Config,
    catalog: &ChordCatalog,
    store: Arc<SqliteStore>,
    session: LoadedSession,
    player: P,
    pipe: bool,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if pipe {
        return ui::pipe::display_lyrics_pipe(session, player, cfg.poll_interval()).await;
    }
    let autosave = Autosave::spawn(
        store,
        session.save_target(cfg.user()),
        Duration::from_millis(cfg.autosave_ms),
    );
    ui::modern::display_lyrics_modern(session, catalog, player, autosave, cfg.poll_interval()).await
}

async fn print_lyrics(
    cfg: &Config,
    key: SongKey,
    words: bool,
    lrc: bool,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = SqliteStore::open(cfg.database()).await?;
    let lyrics = cfg.lyrics().await;
    let session = session::reconcile(&store, &lyrics, &key, VersionSelector::Latest).await?;
    if lrc {
        print!("{}", to_lrc(&session.lines, None));
        return Ok(());
    }
    for (i, line) in session.lines.iter().enumerate() {
        println!(
            "{} - {}  {:<12} {}",
            format_ms(line.timestamp),
            format_ms(line.end_timestamp),
            format!("{:?}", line.kind).to_lowercase(),
            pipe_line(&session.lines, &session.arrangement, i)
        );
        if words {
            let split = line.words.clone().unwrap_or_else(|| line.split_words());
            for w in split {
                let chord = w.chord.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default();
                println!("    {:>8.0} {:>8.0}  {}{}", w.start, w.end, w.word, chord);
            }
        }
    }
    Ok(())
}

fn print_chord(
    catalog: &ChordCatalog,
    name: &str,
    voicing: Option<usize>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let voicings = catalog
        .resolve(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("Unknown chord: {name}"))?;
    let picked: Vec<(usize, &chords::Voicing)> = match voicing {
        Some(n) => {
            let v = n
                .checked_sub(1)
                .and_then(|i| voicings.get(i))
                .ok_or_else(|| format!("{name} has {} voicings", voicings.len()))?;
            vec![(n - 1, v)]
        }
        None => voicings.iter().enumerate().collect(),
    };
    for (i, v) in picked {
        let label = format!("{name} ({}/{})", i + 1, voicings.len());
        for row in diagram::render(&label, v) {
            println!("{row}");
        }
        println!();
    }
    Ok(())
}

async fn list_versions(cfg: &Config, key: SongKey) -> Result<(), Box<dyn Error + Send + Sync>> {
    let store = SqliteStore::open(cfg.database()).await?;
    let Some(song) = store.find_song(&key).await? else {
        println!("No saved versions of {} - {}", key.artist, key.title);
        return Ok(());
    };
    for v in store.list_versions(song.id).await? {
        println!(
            "{:>5} {} {:<12} {} {:>3} chords",
            v.id,
            if v.is_featured { "*" } else { " " },
            v.user_id,
            v.created_at.format("%Y-%m-%d %H:%M"),
            v.placements
        );
    }
    Ok(())
}
