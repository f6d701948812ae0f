use crate::arrangement::{Arrangement, ChordPlacement, VoicingSelection};
use crate::autosave::SaveStatus;
use crate::chords::{ChordCatalog, diagram};
use crate::lyrics::LyricLine;
use crate::text_utils::{chord_rows, format_ms, wrap_text};
use crate::tracker::position_percent;
use crate::ui::styles::LyricStyles;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use std::error::Error;

const INSTRUMENTAL_MARK: &str = "♪";

pub const HELP: &str = "space play/pause  ←/→ seek  ↑/↓ Enter jump  1-9 pick  v voicing  \
                        p place  x remove  D delete  a add  s save  q quit";

/// Everything one frame needs.
pub struct FrameData<'a> {
    pub title: &'a str,
    pub artist: &'a str,
    pub lines: &'a [LyricLine],
    pub arrangement: &'a Arrangement,
    pub catalog: &'a ChordCatalog,
    pub position_ms: i64,
    pub duration_ms: i64,
    pub playing: bool,
    /// Highlighted line.
    pub index: Option<usize>,
    pub cursor: Option<usize>,
    pub selected: Option<u32>,
    pub save_status: &'a SaveStatus,
    pub notice: Option<&'a str>,
    pub input: Option<&'a str>,
    pub err: Option<&'a str>,
}

impl FrameData<'_> {
    pub fn anchor_line(&self) -> Option<usize> {
        anchor_line(self.lines, self.index, self.position_ms)
    }

    pub fn active_placement(&self) -> Option<&ChordPlacement> {
        active_placement(self.arrangement, self.lines, self.index, self.position_ms)
    }
}

/// `index`, or the last line that has started when nothing is highlighted.
pub fn anchor_line(lines: &[LyricLine], index: Option<usize>, position_ms: i64) -> Option<usize> {
    index.or_else(|| {
        lines
            .partition_point(|l| l.timestamp <= position_ms)
            .checked_sub(1)
    })
}

pub fn active_placement<'a>(
    arrangement: &'a Arrangement,
    lines: &[LyricLine],
    index: Option<usize>,
    position_ms: i64,
) -> Option<&'a ChordPlacement> {
    let line = anchor_line(lines, index, position_ms)?;
    arrangement.active_chord(lines, line, position_ms)
}

pub fn draw_ui<B: Backend>(
    terminal: &mut Terminal<B>,
    frame: &FrameData<'_>,
    styles: &LyricStyles,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    terminal
        .draw(|f| {
            let [header, body, bottom, notice] = Layout::vertical([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(9),
                Constraint::Length(1),
            ])
            .areas(f.area());
            let [diagram_area, palette_area] =
                Layout::horizontal([Constraint::Length(18), Constraint::Min(10)]).areas(bottom);

            f.render_widget(
                Paragraph::new(Span::styled(header_text(frame), styles.header)),
                header,
            );

            let visible = gather_visible_lines(frame, body.width as usize, body.height as usize, styles);
            let top_padding = (body.height as usize).saturating_sub(visible.len()) / 2;
            let render_area = Rect {
                x: body.x,
                y: body.y + top_padding as u16,
                width: body.width,
                height: (visible.len() as u16).min(body.height),
            };
            f.render_widget(
                Paragraph::new(visible).alignment(Alignment::Center),
                render_area,
            );

            let (title, diagram_lines) = diagram_lines(frame);
            f.render_widget(
                Paragraph::new(diagram_lines).block(Block::bordered().title(title)),
                diagram_area,
            );

            f.render_widget(
                Paragraph::new(palette_lines(frame, styles))
                    .wrap(Wrap { trim: true })
                    .block(Block::bordered().title("Chords")),
                palette_area,
            );

            f.render_widget(
                Paragraph::new(Span::styled(notice_text(frame), styles.notice)),
                notice,
            );
        })
        .map_err(|e| Box::new(e) as Box<dyn Error + Send + Sync>)?;
    Ok(())
}

pub fn save_status_text(status: &SaveStatus) -> String {
    match status {
        SaveStatus::Idle => String::new(),
        SaveStatus::Saving => "saving...".to_string(),
        SaveStatus::Saved(id) => format!("saved #{id}"),
        SaveStatus::Error(e) => format!("save failed: {e}"),
    }
}

pub fn header_text(frame: &FrameData<'_>) -> String {
    let state = if frame.playing { "▶" } else { "⏸" };
    let mut text = format!(
        "{} - {}  {} / {}  {}",
        frame.title,
        frame.artist,
        format_ms(frame.position_ms),
        format_ms(frame.duration_ms),
        state
    );
    let status = save_status_text(frame.save_status);
    if !status.is_empty() {
        text.push_str("  [");
        text.push_str(&status);
        text.push(']');
    }
    text
}

fn notice_text(frame: &FrameData<'_>) -> String {
    if let Some(input) = frame.input {
        return format!("Add chord: {input}_");
    }
    frame
        .notice
        .or(frame.err)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Styled rows for one lyric line: its chord row (if it has placements) and
/// its text, cut to `width`.
fn line_block(
    frame: &FrameData<'_>,
    i: usize,
    width: usize,
    styles: &LyricStyles,
    active: Option<&ChordPlacement>,
) -> Vec<Line<'static>> {
    let line = &frame.lines[i];
    let mut labels: Vec<(f64, &str)> = frame
        .arrangement
        .placements_for_line(i)
        .into_iter()
        .map(|p| (p.position, p.chord.as_str()))
        .collect();
    // Word-level chords from older arrangements sit over their word.
    for word in line.words.iter().flatten() {
        if let Some(chord) = word.chord.as_deref() {
            labels.push((position_percent(line, word.start as i64), chord));
        }
    }
    labels.sort_by(|a, b| a.0.total_cmp(&b.0));
    let text = if line.is_instrumental() {
        INSTRUMENTAL_MARK
    } else {
        line.text.as_str()
    };

    let mut text_style = match frame.index {
        Some(idx) if i < idx => styles.before,
        Some(idx) if i == idx => styles.current,
        _ => styles.after,
    };
    if frame.cursor == Some(i) && frame.index != Some(i) {
        text_style = text_style.patch(styles.cursor);
    }
    let chord_style = if active.is_some_and(|a| a.line_index == i) {
        styles.active_chord
    } else {
        styles.chord
    };

    let mut out = Vec::new();
    for (chords, text) in chord_rows(text, &labels, width) {
        if !labels.is_empty() {
            out.push(Line::from(Span::styled(chords, chord_style)));
        }
        out.push(Line::from(Span::styled(text, text_style)));
    }
    out
}

/// Collects the blocks that should appear *before* the focused line.
fn collect_before(focus: usize, blocks: &[Vec<Line<'static>>], mut lines_needed: usize) -> Vec<Line<'static>> {
    let mut before = Vec::new();
    let mut i = focus;
    while i > 0 && lines_needed > 0 {
        i -= 1;
        let block = &blocks[i];
        let take = block.len().min(lines_needed);
        before.splice(0..0, block[block.len() - take..].iter().cloned());
        lines_needed -= take;
    }
    before
}

/// Collects the blocks that should appear *after* the focused line.
fn collect_after(focus: usize, blocks: &[Vec<Line<'static>>], mut lines_needed: usize) -> Vec<Line<'static>> {
    let mut after = Vec::new();
    let mut j = focus + 1;
    while j < blocks.len() && lines_needed > 0 {
        let block = &blocks[j];
        let take = block.len().min(lines_needed);
        after.extend(block[..take].iter().cloned());
        lines_needed -= take;
        j += 1;
    }
    after
}

/// Lyric window centred on the cursor or highlighted line.
pub fn gather_visible_lines(
    frame: &FrameData<'_>,
    width: usize,
    height: usize,
    styles: &LyricStyles,
) -> Vec<Line<'static>> {
    if frame.lines.is_empty() {
        let message = frame.err.unwrap_or("No synced lyrics");
        return wrap_text(message, width)
            .into_iter()
            .map(|l| Line::from(Span::styled(l, styles.current)))
            .collect();
    }

    let active = frame.active_placement();
    let blocks: Vec<Vec<Line<'static>>> = (0..frame.lines.len())
        .map(|i| line_block(frame, i, width, styles, active))
        .collect();

    let focus = frame
        .cursor
        .or_else(|| frame.anchor_line())
        .unwrap_or(0)
        .min(blocks.len() - 1);
    let current = blocks[focus].clone();
    if current.len() >= height {
        return current.into_iter().take(height).collect();
    }

    let context = height - current.len();
    let before_needed = context / 2;
    let after_needed = context - before_needed;
    let mut visible = collect_before(focus, &blocks, before_needed);
    visible.extend(current);
    visible.extend(collect_after(focus, &blocks, after_needed));
    visible
}

/// Diagram of the chord sounding now, else of the selected palette chord.
fn diagram_lines(frame: &FrameData<'_>) -> (String, Vec<Line<'static>>) {
    let shown = frame
        .active_placement()
        .map(|p| (p.chord.clone(), p.chord_position))
        .or_else(|| {
            let selected = frame.arrangement.chord(frame.selected?)?;
            Some((selected.chord_name.clone(), selected.chord_position))
        });
    let Some((name, selection)) = shown else {
        return ("-".to_string(), Vec::new());
    };
    let voicing = frame
        .catalog
        .resolve(&name)
        .and_then(|v| v.get(selection.display_index()));
    match voicing {
        Some(v) => (
            name.clone(),
            diagram::render(&name, v)
                .into_iter()
                .skip(1)
                .map(Line::from)
                .collect(),
        ),
        None => (name, vec![Line::from("no diagram")]),
    }
}

pub fn palette_label(n: usize, name: &str, selection: VoicingSelection) -> String {
    match selection {
        VoicingSelection::Unset => format!("{n}:{name}"),
        VoicingSelection::Selected(i) => format!("{n}:{name}#{}", i + 1),
    }
}

fn palette_lines(frame: &FrameData<'_>, styles: &LyricStyles) -> Vec<Line<'static>> {
    let mut spans = Vec::new();
    for (n, chord) in frame.arrangement.chords().iter().enumerate() {
        let label = palette_label(n + 1, &chord.chord_name, chord.chord_position);
        let style = if frame.selected == Some(chord.id) {
            styles.chord.add_modifier(Modifier::REVERSED)
        } else {
            styles.chord
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw("  "));
    }
    if spans.is_empty() {
        spans.push(Span::raw("(empty - press a to add a chord)"));
    }
    vec![
        Line::from(spans),
        Line::from(""),
        Line::from(Span::styled(HELP, Style::default().add_modifier(Modifier::DIM))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::parse_lrc;
    use ratatui::backend::TestBackend;

    fn text_of(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn frame<'a>(
        lines: &'a [LyricLine],
        arrangement: &'a Arrangement,
        status: &'a SaveStatus,
        position_ms: i64,
        index: Option<usize>,
    ) -> FrameData<'a> {
        FrameData {
            title: "Song",
            artist: "Artist",
            lines,
            arrangement,
            catalog: ChordCatalog::bundled(),
            position_ms,
            duration_ms: 60_000,
            playing: true,
            index,
            cursor: None,
            selected: None,
            save_status: status,
            notice: None,
            input: None,
            err: None,
        }
    }

    #[test]
    fn header_shows_time_and_save_state() {
        let lines = Vec::new();
        let arrangement = Arrangement::new();
        let status = SaveStatus::Saved(3);
        let f = frame(&lines, &arrangement, &status, 65_000, None);
        assert_eq!(header_text(&f), "Song - Artist  1:05 / 1:00  ▶  [saved #3]");
    }

    #[test]
    fn window_centres_on_current_line_with_chords() {
        let lines = parse_lrc("[00:01.00]one\n[00:02.00]two\n[00:03.00]three\n[00:04.00]four\n[00:05.00]five").lines;
        let mut arrangement = Arrangement::new();
        arrangement.add_or_replace(2, 0.0, "Am", VoicingSelection::Unset);
        let status = SaveStatus::Idle;
        let f = frame(&lines, &arrangement, &status, 3_100, Some(2));
        let styles = LyricStyles::default();

        let visible = gather_visible_lines(&f, 40, 4, &styles);
        let texts: Vec<String> = visible.iter().map(text_of).collect();
        assert_eq!(texts, vec!["two", "Am   ", "three", "four"]);
        assert_eq!(visible[1].spans[0].style, styles.active_chord);
        assert_eq!(visible[2].spans[0].style, styles.current);
        assert_eq!(visible[0].spans[0].style, styles.before);
    }

    #[test]
    fn gap_still_finds_previous_chord() {
        let lines = parse_lrc("[00:01.00]one\n[00:02.00]two").lines;
        let mut arrangement = Arrangement::new();
        arrangement.add_or_replace(1, 50.0, "G", VoicingSelection::Unset);
        let status = SaveStatus::Idle;
        // Past the end of the last line: nothing highlighted.
        let f = frame(&lines, &arrangement, &status, 9_000, None);
        assert_eq!(f.anchor_line(), Some(1));
        assert_eq!(f.active_placement().map(|p| p.chord.as_str()), Some("G"));
    }

    #[test]
    fn palette_labels_show_voicing() {
        assert_eq!(palette_label(1, "Am", VoicingSelection::Unset), "1:Am");
        assert_eq!(palette_label(2, "F", VoicingSelection::Selected(1)), "2:F#2");
    }

    #[test]
    fn draws_full_frame() {
        let lines = parse_lrc("[00:01.00]Hello there\n[00:05.00]Friend").lines;
        let mut arrangement = Arrangement::new();
        arrangement.add_chord("Am", ChordCatalog::bundled()).unwrap();
        arrangement.add_or_replace(0, 0.0, "Am", VoicingSelection::Unset);
        let status = SaveStatus::Idle;
        let f = frame(&lines, &arrangement, &status, 2_000, Some(0));

        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        draw_ui(&mut terminal, &f, &LyricStyles::default()).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let screen: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(screen.contains("Hello there"));
        assert!(screen.contains("1:Am"));
        assert!(screen.contains("==========="));
    }
}
