use crate::lyrics::types::{
    LAST_LINE_DURATION_MS, LrcMetadata, LyricLine, LyricType, ParsedLrc, WordTiming,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static METADATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([A-Za-z]+):(.+)\]$").unwrap());

static LYRIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d{2}):(\d{2})\.(\d{2})\](.*)$").unwrap());

static MULTI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\[[\d:.]+\])+(.*)$").unwrap());

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{2}):(\d{2})\.(\d{2})\]").unwrap());

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[\d:.]+\]").unwrap());

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(\d{2}):(\d{2})\.(\d{2})>([^<]+)").unwrap());

/// Milliseconds from `mm`, `ss`, `cc` capture groups starting at `first`.
fn capture_ms(cap: &Captures, first: usize) -> i64 {
    let part = |i: usize| {
        cap.get(i)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };
    part(first) * 60_000 + part(first + 1) * 1000 + part(first + 2) * 10
}

/// Parse LRC text into metadata and a sorted, end-stamped line sequence.
///
/// Text without any timestamped line yields an empty sequence rather than an
/// error; many tracks simply have no synced lyrics.
pub fn parse_lrc(content: &str) -> ParsedLrc {
    let mut metadata = LrcMetadata::default();
    let mut lines = Vec::new();
    let mut next_id = 0usize;
    let mut emit = |lines: &mut Vec<LyricLine>, timestamp: i64, text: &str| {
        next_id += 1;
        lines.push(LyricLine {
            id: format!("line_{next_id}"),
            timestamp,
            end_timestamp: timestamp,
            text: text.to_string(),
            kind: classify_lyric_type(text),
            words: None,
        });
    };

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(cap) = METADATA_RE.captures(line) {
            apply_metadata(&cap[1].to_lowercase(), &cap[2], &mut metadata);
            continue;
        }

        // Offset applies to whatever follows the tag in file order.
        let offset = metadata.offset.unwrap_or(0);

        if let Some(cap) = LYRIC_RE.captures(line) {
            let rest = cap.get(4).map_or("", |m| m.as_str());
            // A second leading stamp means a repeated line; handled below.
            if !TAG_RE.find(rest).is_some_and(|m| m.start() == 0) {
                emit(&mut lines, capture_ms(&cap, 1) + offset, rest.trim());
                continue;
            }
        }

        if MULTI_RE.is_match(line) {
            let text = TAG_RE.replace_all(line, "");
            let text = text.trim();
            for cap in TIMESTAMP_RE.captures_iter(line) {
                emit(&mut lines, capture_ms(&cap, 1) + offset, text);
            }
        }
    }

    lines.sort_by_key(|l| l.timestamp);
    lines.dedup_by_key(|l| l.timestamp);
    add_end_timestamps(&mut lines);

    tracing::debug!(lines = lines.len(), offset = ?metadata.offset, "Parsed LRC");
    ParsedLrc { metadata, lines }
}

/// Parse LRC text honouring `<mm:ss.cc>word` timings inside lines.
///
/// Lines carrying word tags get measured word starts; each word ends where the
/// next begins and the last word ends with the line.
pub fn parse_enhanced_lrc(content: &str) -> ParsedLrc {
    let mut parsed = parse_lrc(content);
    let offset = parsed.metadata.offset.unwrap_or(0);
    for line in &mut parsed.lines {
        let mut words: Vec<WordTiming> = WORD_RE
            .captures_iter(&line.text)
            .map(|cap| {
                let start = (capture_ms(&cap, 1) + offset) as f64;
                WordTiming {
                    word: cap[4].trim().to_string(),
                    start,
                    end: start,
                    chord: None,
                }
            })
            .filter(|w| !w.word.is_empty())
            .collect();
        if words.is_empty() {
            continue;
        }
        let line_end = line.end_timestamp as f64;
        for i in 0..words.len() {
            words[i].end = words.get(i + 1).map_or(line_end, |next| next.start);
        }
        line.text = words
            .iter()
            .map(|w| w.word.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        line.kind = classify_lyric_type(&line.text);
        line.words = Some(words);
    }
    parsed
}

fn apply_metadata(key: &str, value: &str, metadata: &mut LrcMetadata) {
    let value = value.trim();
    match key {
        "ar" => metadata.artist = Some(value.to_string()),
        "ti" => metadata.title = Some(value.to_string()),
        "al" => metadata.album = Some(value.to_string()),
        "au" => metadata.author = Some(value.to_string()),
        "length" => metadata.length = Some(value.to_string()),
        "by" => metadata.by = Some(value.to_string()),
        "offset" => {
            if let Ok(ms) = value.parse::<i64>() {
                metadata.offset = Some(ms);
            }
        }
        _ => {}
    }
}

pub fn classify_lyric_type(text: &str) -> LyricType {
    if text.is_empty() {
        return LyricType::Instrumental;
    }
    let lower = text.to_lowercase();
    if lower.contains("instrumental") || lower.contains('\u{266a}') {
        LyricType::Instrumental
    } else if lower.contains("chorus") || lower.contains("refrain") {
        LyricType::Chorus
    } else if lower.contains("bridge") {
        LyricType::Bridge
    } else if lower.contains("outro") || lower.contains("fade") {
        LyricType::Outro
    } else if lower.contains("intro") {
        LyricType::Intro
    } else {
        LyricType::Verse
    }
}

fn add_end_timestamps(lines: &mut [LyricLine]) {
    for i in 0..lines.len() {
        lines[i].end_timestamp = match lines.get(i + 1) {
            Some(next) => next.timestamp,
            None => lines[i].timestamp + LAST_LINE_DURATION_MS,
        };
    }
}

fn format_stamp(ms: i64) -> String {
    let ms = ms.max(0);
    format!(
        "{:02}:{:02}.{:02}",
        ms / 60_000,
        (ms % 60_000) / 1000,
        (ms % 1000) / 10
    )
}

/// Serialise lines back to LRC, using word tags when words carry timings.
pub fn to_lrc(lines: &[LyricLine], metadata: Option<&LrcMetadata>) -> String {
    let mut out = String::new();
    if let Some(md) = metadata {
        let tags = [
            ("ti", md.title.clone()),
            ("ar", md.artist.clone()),
            ("al", md.album.clone()),
            ("au", md.author.clone()),
            ("length", md.length.clone()),
            ("offset", md.offset.map(|o| o.to_string())),
        ];
        for (key, value) in tags {
            if let Some(v) = value {
                out.push_str(&format!("[{key}:{v}]\n"));
            }
        }
        out.push('\n');
    }
    for line in lines {
        let stamp = format_stamp(line.timestamp);
        match &line.words {
            Some(words) if !words.is_empty() => {
                let body = words
                    .iter()
                    .map(|w| format!("<{}>{}", format_stamp(w.start as i64), w.word))
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&format!("[{stamp}]{body}\n"));
            }
            _ => out.push_str(&format!("[{stamp}]{}\n", line.text)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_line_example() {
        let parsed = parse_lrc("[00:12.50]Hello there\n[00:16.80]Friend of mine");
        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.lines[0].timestamp, 12500);
        assert_eq!(parsed.lines[0].end_timestamp, 16800);
        assert_eq!(parsed.lines[0].text, "Hello there");
        assert_eq!(parsed.lines[1].timestamp, 16800);
        assert_eq!(parsed.lines[1].end_timestamp, 19800);
        assert_eq!(parsed.lines[1].text, "Friend of mine");
    }

    #[test]
    fn sorts_and_chains_end_timestamps() {
        let lrc = "[00:20.00]third\n[00:05.00]first\n[00:10.00]second\n";
        let lines = parse_lrc(lrc).lines;
        let stamps: Vec<i64> = lines.iter().map(|l| l.timestamp).collect();
        assert_eq!(stamps, vec![5000, 10000, 20000]);
        for pair in lines.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
            assert_eq!(pair[0].end_timestamp, pair[1].timestamp);
        }
        let last = lines.last().unwrap();
        assert_eq!(last.end_timestamp, last.timestamp + 3000);
    }

    #[test]
    fn reads_metadata_tags() {
        let lrc = "[ar:Rick Astley]\n[ti:Never Gonna Give You Up]\n[al:Whenever]\n[length:03:33]\n[00:01.00]x";
        let parsed = parse_lrc(lrc);
        assert_eq!(parsed.metadata.artist.as_deref(), Some("Rick Astley"));
        assert_eq!(parsed.metadata.title.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(parsed.metadata.album.as_deref(), Some("Whenever"));
        assert_eq!(parsed.metadata.length.as_deref(), Some("03:33"));
        assert_eq!(parsed.lines.len(), 1);
    }

    #[test]
    fn offset_applies_only_to_following_lines() {
        let lrc = "[00:01.00]before\n[offset:500]\n[00:02.00]after";
        let lines = parse_lrc(lrc).lines;
        assert_eq!(lines[0].timestamp, 1000);
        assert_eq!(lines[1].timestamp, 2500);
    }

    #[test]
    fn negative_offset_shifts_earlier() {
        let lines = parse_lrc("[offset:-250]\n[00:01.00]a").lines;
        assert_eq!(lines[0].timestamp, 750);
    }

    #[test]
    fn repeated_line_emits_each_timestamp() {
        let lrc = "[00:12.50][01:15.20]This line repeats\n[00:20.00]Other";
        let lines = parse_lrc(lrc).lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].timestamp, 12500);
        assert_eq!(lines[0].text, "This line repeats");
        assert_eq!(lines[2].timestamp, 75200);
        assert_eq!(lines[2].text, "This line repeats");
    }

    #[test]
    fn no_timestamps_means_no_lyrics() {
        assert!(parse_lrc("").is_empty());
        assert!(parse_lrc("just some words\nno stamps here").is_empty());
        assert!(parse_lrc("[ar:Someone]\n[ti:Something]").is_empty());
    }

    #[test]
    fn ignores_malformed_stamps() {
        let lines = parse_lrc("[1:23.45]bad\n[01:23.45]good").lines;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "good");
    }

    #[test]
    fn empty_text_is_an_instrumental_gap() {
        let lines = parse_lrc("[00:01.00]\n[00:04.00]sing").lines;
        assert_eq!(lines[0].text, "");
        assert_eq!(lines[0].kind, LyricType::Instrumental);
        assert_eq!(lines[1].kind, LyricType::Verse);
    }

    #[test]
    fn duplicate_timestamps_keep_first_in_input_order() {
        let lines = parse_lrc("[00:05.00]first\n[00:05.00]second\n[00:06.00]next").lines;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "first");
        assert!(lines.iter().all(|l| l.end_timestamp > l.timestamp));
    }

    #[test]
    fn ids_follow_emission_order() {
        let lines = parse_lrc("[00:09.00]b\n[00:01.00]a").lines;
        assert_eq!(lines[0].id, "line_2");
        assert_eq!(lines[1].id, "line_1");
    }

    #[test]
    fn classifies_sections() {
        assert_eq!(classify_lyric_type("(Chorus)"), LyricType::Chorus);
        assert_eq!(classify_lyric_type("\u{266a}"), LyricType::Instrumental);
        assert_eq!(classify_lyric_type("Bridge time"), LyricType::Bridge);
        assert_eq!(classify_lyric_type("slow fade out"), LyricType::Outro);
        assert_eq!(classify_lyric_type("intro riff"), LyricType::Intro);
        assert_eq!(classify_lyric_type("hello"), LyricType::Verse);
    }

    #[test]
    fn enhanced_lines_use_measured_word_starts() {
        let lrc = "[00:12.50]<00:12.50>Never <00:12.80>gonna <00:13.10>give\n[00:15.00]next";
        let parsed = parse_enhanced_lrc(lrc);
        let line = &parsed.lines[0];
        assert_eq!(line.text, "Never gonna give");
        let words = line.words.as_ref().unwrap();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].start, 12500.0);
        assert_eq!(words[0].end, 12800.0);
        assert_eq!(words[2].end, 15000.0);
        assert!(parsed.lines[1].words.is_none());
    }

    #[test]
    fn to_lrc_reparses_to_same_timeline() {
        let original = parse_lrc("[ti:Song]\n[00:12.50]Hello there\n[00:16.80]Friend of mine");
        let text = to_lrc(&original.lines, Some(&original.metadata));
        assert!(text.starts_with("[ti:Song]\n"));
        let again = parse_lrc(&text);
        let stamps = |p: &ParsedLrc| p.lines.iter().map(|l| (l.timestamp, l.text.clone())).collect::<Vec<_>>();
        assert_eq!(stamps(&original), stamps(&again));
    }
}
