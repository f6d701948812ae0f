// lyrics/mod.rs - top-level lyrics module re-exporting submodules
pub mod cache;
pub mod parse;
pub mod providers;
pub mod types;

pub use cache::CachedLyrics;
pub use parse::{parse_enhanced_lrc, parse_lrc};
pub use providers::{LrclibClient, LyricsSource};
pub use types::{LyricLine, LyricsError, ParsedLrc, TrackQuery, WordTiming};
