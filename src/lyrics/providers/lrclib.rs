use serde::Deserialize;

use crate::lyrics::providers::LyricsSource;
use crate::lyrics::types::{LyricsError, TrackQuery, http_client};

const LRCLIB_BASE_URL: &str = "https://lrclib.net/api";

/// One record from the lrclib `get` or `search` endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LrclibTrack {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub track_name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
}

/// Client for the lrclib.net community lyrics API.
#[derive(Debug, Clone)]
pub struct LrclibClient {
    base_url: String,
}

impl Default for LrclibClient {
    fn default() -> Self {
        Self::new(LRCLIB_BASE_URL)
    }
}

impl LrclibClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Exact lookup. A 404 means lrclib has no record for the track.
    pub async fn get(&self, query: &TrackQuery) -> Result<Option<LrclibTrack>, LyricsError> {
        let url = build_url(&self.base_url, "get", query);
        let resp = http_client().get(&url).send().await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(LyricsError::Api(format!("lrclib get: HTTP {}", resp.status())));
        }
        Ok(Some(resp.json().await?))
    }

    pub async fn search(&self, query: &TrackQuery) -> Result<Vec<LrclibTrack>, LyricsError> {
        let url = build_url(&self.base_url, "search", query);
        let resp = http_client().get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(LyricsError::Api(format!(
                "lrclib search: HTTP {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }
}

impl LyricsSource for LrclibClient {
    /// Exact match first, then the first search hit whose names contain the
    /// query and which has synced lyrics.
    async fn synced_lyrics(&self, query: &TrackQuery) -> Result<Option<String>, LyricsError> {
        if let Some(track) = self.get(query).await?
            && let Some(synced) = track.synced_lyrics.filter(|s| !s.trim().is_empty())
        {
            tracing::debug!(artist = %query.artist, title = %query.title, "lrclib exact match");
            return Ok(Some(synced));
        }

        let results = self.search(query).await?;
        let found = pick_best_match(&results, query);
        tracing::debug!(
            artist = %query.artist,
            title = %query.title,
            candidates = results.len(),
            found = found.is_some(),
            "lrclib search fallback"
        );
        Ok(found)
    }
}

/// Choose the first candidate with synced lyrics whose artist and track name
/// contain the queried ones (case-insensitive).
pub fn pick_best_match(results: &[LrclibTrack], query: &TrackQuery) -> Option<String> {
    let artist = query.artist.to_lowercase();
    let title = query.title.to_lowercase();
    results
        .iter()
        .filter(|r| r.artist_name.to_lowercase().contains(&artist))
        .filter(|r| r.track_name.to_lowercase().contains(&title))
        .find_map(|r| r.synced_lyrics.clone().filter(|s| !s.trim().is_empty()))
}

/// Build an lrclib API URL with query parameters.
fn build_url(base: &str, endpoint: &str, query: &TrackQuery) -> String {
    let mut params = vec![
        format!("artist_name={}", urlencoding::encode(&query.artist)),
        format!("track_name={}", urlencoding::encode(&query.title)),
    ];

    if let Some(album) = query.album.as_deref().filter(|a| !a.is_empty()) {
        params.push(format!("album_name={}", urlencoding::encode(album)));
    }

    if let Some(d) = query.duration_secs {
        params.push(format!("duration={d}"));
    }

    format!("{base}/{endpoint}?{}", params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artist: &str, name: &str, synced: Option<&str>) -> LrclibTrack {
        LrclibTrack {
            id: 1,
            track_name: name.into(),
            artist_name: artist.into(),
            album_name: None,
            duration: None,
            instrumental: false,
            plain_lyrics: None,
            synced_lyrics: synced.map(str::to_string),
        }
    }

    #[test]
    fn url_escapes_and_includes_optional_fields() {
        let mut q = TrackQuery::new("AC/DC", "T.N.T.");
        q.album = Some("High Voltage".into());
        q.duration_secs = Some(215);
        let url = build_url("https://lrclib.net/api", "get", &q);
        assert_eq!(
            url,
            "https://lrclib.net/api/get?artist_name=AC%2FDC&track_name=T.N.T.&album_name=High%20Voltage&duration=215"
        );
    }

    #[test]
    fn url_skips_missing_fields() {
        let url = build_url("http://x", "search", &TrackQuery::new("a", "b"));
        assert_eq!(url, "http://x/search?artist_name=a&track_name=b");
    }

    #[test]
    fn best_match_requires_names_and_synced_text() {
        let results = vec![
            track("Someone Else", "Let It Be", Some("[00:01.00]no")),
            track("The Beatles", "Let It Be (Remastered)", None),
            track("The Beatles", "Let It Be (Remastered)", Some("[00:01.00]yes")),
        ];
        let q = TrackQuery::new("beatles", "let it be");
        assert_eq!(pick_best_match(&results, &q).as_deref(), Some("[00:01.00]yes"));
    }

    #[test]
    fn best_match_none_when_nothing_synced() {
        let results = vec![track("A", "B", Some("  "))];
        assert!(pick_best_match(&results, &TrackQuery::new("a", "b")).is_none());
    }

    #[test]
    fn deserializes_api_shape() {
        let json = r#"{"id":3396226,"trackName":"I Wonder","artistName":"Kanye West","albumName":"Graduation","duration":243,"instrumental":false,"plainLyrics":"x","syncedLyrics":"[00:01.00]x"}"#;
        let t: LrclibTrack = serde_json::from_str(json).unwrap();
        assert_eq!(t.track_name, "I Wonder");
        assert_eq!(t.synced_lyrics.as_deref(), Some("[00:01.00]x"));
    }
}
