use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Shared HTTP client with reasonable defaults for timeouts
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("chordsync/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
});

/// Default duration given to the final line, which has no successor to end it.
pub const LAST_LINE_DURATION_MS: i64 = 3000;

/// Advisory section classification derived from the line text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LyricType {
    #[default]
    Verse,
    Chorus,
    Bridge,
    Intro,
    Outro,
    Instrumental,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Stable identifier assigned in emission order (`line_1`, `line_2`, ...).
    pub id: String,
    /// Milliseconds from track start, offset already applied.
    pub timestamp: i64,
    /// Next line's timestamp, or `timestamp + 3000` for the final line.
    #[serde(rename = "endTimestamp")]
    pub end_timestamp: i64,
    /// Empty text marks an instrumental gap.
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: LyricType,
    /// Word timings, filled in only once chords are annotated on this line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTiming>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
    /// Word-level chord annotation (older arrangements only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chord: Option<String>,
}

impl LyricLine {
    pub fn duration_ms(&self) -> i64 {
        self.end_timestamp - self.timestamp
    }

    pub fn is_instrumental(&self) -> bool {
        self.text.is_empty()
    }

    /// Split the text on whitespace and share the line duration equally.
    ///
    /// Word `i` of `n` covers `[timestamp + i*d/n, timestamp + (i+1)*d/n)`, so the
    /// words tile the line interval with no gap between neighbours.
    pub fn split_words(&self) -> Vec<WordTiming> {
        let words: Vec<&str> = self.text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }
        let n = words.len() as f64;
        let base = self.timestamp as f64;
        let duration = self.duration_ms() as f64;
        let boundary = |i: usize| base + (i as f64 * duration) / n;
        words
            .iter()
            .enumerate()
            .map(|(i, w)| WordTiming {
                word: (*w).to_string(),
                start: boundary(i),
                end: boundary(i + 1),
                chord: None,
            })
            .collect()
    }

    /// Populate `words` if they have not been computed yet and return them.
    pub fn ensure_words(&mut self) -> &mut Vec<WordTiming> {
        if self.words.is_none() {
            self.words = Some(self.split_words());
        }
        self.words.get_or_insert_with(Vec::new)
    }
}

/// Header tags found in an LRC file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LrcMetadata {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub author: Option<String>,
    pub length: Option<String>,
    pub by: Option<String>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLrc {
    pub metadata: LrcMetadata,
    pub lines: Vec<LyricLine>,
}

impl ParsedLrc {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Track identity used to look lyrics up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TrackQuery {
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    /// Track length in whole seconds.
    pub duration_secs: Option<u64>,
}

impl TrackQuery {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            album: None,
            duration_secs: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum LyricsError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn http_client() -> &'static Client {
    &HTTP_CLIENT
}
