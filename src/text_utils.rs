// src/text_utils.rs
// Text layout helpers shared by the views

use unicode_segmentation::UnicodeSegmentation;

/// Wrap text to a given width, breaking at word boundaries
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    textwrap::wrap(text, width.max(1))
        .into_iter()
        .map(|c| c.into_owned())
        .collect()
}

/// `m:ss` for a millisecond position.
pub fn format_ms(ms: i64) -> String {
    let total = ms.max(0) / 1000;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Lay chord labels over a lyric line and cut both into rows of `width`
/// graphemes.
///
/// Each label goes at `position` percent of the line's grapheme length. A
/// label that would touch the previous one is pushed right. Returned pairs are
/// `(chord_row, text_row)` of equal grapheme length so they stay aligned when
/// centred.
pub fn chord_rows(text: &str, labels: &[(f64, &str)], width: usize) -> Vec<(String, String)> {
    let mut text_cells: Vec<&str> = text.graphemes(true).collect();
    let len = text_cells.len().max(1);
    let mut chord_cells: Vec<String> = Vec::new();

    let mut next_free = 0usize;
    for (position, name) in labels {
        let pct = if position.is_nan() { 0.0 } else { position.clamp(0.0, 100.0) };
        let wanted = ((pct / 100.0) * len as f64).floor() as usize;
        let col = wanted.min(len - 1).max(next_free);
        if chord_cells.len() < col {
            chord_cells.resize(col, " ".to_string());
        }
        chord_cells.extend(name.graphemes(true).map(str::to_string));
        next_free = chord_cells.len() + 1;
    }

    let total = text_cells.len().max(chord_cells.len());
    text_cells.resize(total, " ");
    chord_cells.resize(total, " ".to_string());

    let width = width.max(1);
    if total == 0 {
        return vec![(String::new(), String::new())];
    }
    text_cells
        .chunks(width)
        .zip(chord_cells.chunks(width))
        .map(|(t, c)| (c.concat(), t.concat()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_sit_over_their_position() {
        let rows = chord_rows("Hello there", &[(0.0, "C"), (50.0, "G")], 80);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "C    G     ");
        assert_eq!(rows[0].1, "Hello there");
    }

    #[test]
    fn crowded_labels_are_pushed_apart() {
        let rows = chord_rows("abcd", &[(0.0, "Am"), (10.0, "G7")], 80);
        assert_eq!(rows[0].0, "Am G7");
        assert_eq!(rows[0].1, "abcd ");
    }

    #[test]
    fn long_lines_are_cut_in_step() {
        let rows = chord_rows("aaaa bbbb", &[(60.0, "D")], 5);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("     ".to_string(), "aaaa ".to_string()));
        assert_eq!(rows[1], ("D   ".to_string(), "bbbb".to_string()));
    }

    #[test]
    fn empty_line_keeps_labels() {
        let rows = chord_rows("", &[(50.0, "E")], 10);
        assert_eq!(rows[0], ("E".to_string(), " ".to_string()));
        assert_eq!(chord_rows("", &[], 10), vec![(String::new(), String::new())]);
    }

    #[test]
    fn formats_positions() {
        assert_eq!(format_ms(0), "0:00");
        assert_eq!(format_ms(65_400), "1:05");
        assert_eq!(format_ms(-10), "0:00");
    }

    #[test]
    fn wraps_on_words() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
    }
}
