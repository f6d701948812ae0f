//! Full-screen play-along and chord editing view.
//!
//! The event loop uses `tokio::select!` to handle:
//! - Updates from the playback loop
//! - Keyboard input forwarded from a polling thread
//! - Redraw ticks while playing, so the position and active chord move
//!   between polls
//! - Autosave status changes

use crate::arrangement::{Arrangement, ArrangementError, VoicingSelection, set_word_chord};
use crate::autosave::{Autosave, SaveStatus};
use crate::chords::ChordCatalog;
use crate::event::Command;
use crate::lyrics::LyricLine;
use crate::player::Player;
use crate::pool;
use crate::session::LoadedSession;
use crate::state::Update;
use crate::store::VersionSnapshot;
use crate::timer::PlaybackTimer;
use crate::tracker::{current_line_index, position_percent};
use crate::ui::modern_helpers::{self, FrameData, active_placement, anchor_line};
use crate::ui::styles::LyricStyles;
use crossterm::{
    event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::error::Error;
use std::io;
use std::pin::Pin;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Sleep;

const SEEK_STEP_MS: i64 = 5_000;
/// Placement nudge in percent of the line.
const NUDGE_PCT: f64 = 1.0;
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// UI state for the modern view
pub struct ModernUIState {
    pub title: String,
    pub artist: String,
    pub last_update: Option<Update>,
    pub timer: PlaybackTimer,
    pub lines: Vec<LyricLine>,
    pub arrangement: Arrangement,
    /// Line picked with the arrow keys, if any.
    pub cursor: Option<usize>,
    /// Selected palette chord id.
    pub selected: Option<u32>,
    pub notice: Option<String>,
    /// Chord name being typed after `a`.
    pub input: Option<String>,
    pub save_status: SaveStatus,
    pub should_exit: bool,
}

/// What a key press asks of the outside world.
#[derive(Debug, Default, PartialEq)]
pub struct KeyOutcome {
    pub command: Option<Command>,
    /// The arrangement changed and should be scheduled for saving.
    pub edited: bool,
    pub save_now: bool,
}

impl ModernUIState {
    pub fn new(session: &LoadedSession) -> Self {
        Self {
            title: session.key.title.clone(),
            artist: session.key.artist.clone(),
            last_update: None,
            timer: PlaybackTimer::default(),
            lines: session.lines.clone(),
            arrangement: session.arrangement.clone(),
            cursor: None,
            selected: session.arrangement.chords().first().map(|c| c.id),
            notice: None,
            input: None,
            save_status: SaveStatus::Idle,
            should_exit: false,
        }
    }

    pub fn playing(&self) -> bool {
        self.last_update.as_ref().is_some_and(|u| u.playing)
    }

    /// Estimated position, never past the track end.
    pub fn position_ms(&self) -> i64 {
        let est = self.timer.estimate();
        match &self.last_update {
            Some(u) if u.duration_ms > 0 => est.min(u.duration_ms),
            _ => est,
        }
    }

    /// Pending seek target while one is in flight, else the line under the
    /// estimated position.
    pub fn highlighted(&self) -> Option<usize> {
        match &self.last_update {
            Some(u) if u.seek_pending() => u.index,
            _ => current_line_index(self.position_ms(), &self.lines),
        }
    }

    pub fn apply_update(&mut self, update: Update) {
        if update.playing {
            self.timer.set_position(update.position_ms);
        } else {
            self.timer.reset(update.position_ms);
        }
        self.last_update = Some(update);
    }

    pub fn snapshot(&self) -> VersionSnapshot {
        VersionSnapshot {
            arrangement: self.arrangement.clone(),
            lyrics: Some(self.lines.clone()),
        }
    }

    fn selected_name(&self) -> Option<String> {
        Some(self.arrangement.chord(self.selected?)?.chord_name.clone())
    }
}

/// Run the view until the user quits. The playback loop and the autosave
/// worker are stopped before returning.
pub async fn display_lyrics_modern<P: Player + 'static>(
    session: LoadedSession,
    catalog: &ChordCatalog,
    player: P,
    autosave: Autosave,
    poll_interval: Duration,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let (update_tx, mut update_rx) = mpsc::channel(32);
    let (command_tx, command_rx) = mpsc::channel(16);
    let listener = tokio::spawn(pool::listen(
        player,
        session.lines.clone(),
        update_tx,
        command_rx,
        poll_interval,
    ));

    enable_raw_mode().map_err(to_boxed_err)?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(to_boxed_err)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(to_boxed_err)?;

    let mut state = ModernUIState::new(&session);
    let result = run_loop(
        &mut terminal,
        &mut state,
        catalog,
        &autosave,
        &mut update_rx,
        &command_tx,
    )
    .await;

    // Restore the terminal even when the loop failed.
    let restored = disable_raw_mode()
        .and_then(|_| execute!(io::stdout(), LeaveAlternateScreen))
        .and_then(|_| terminal.show_cursor());

    autosave.cancel();
    let _ = command_tx.send(Command::Shutdown).await;
    if let Err(e) = listener.await {
        tracing::warn!(error = %e, "Playback loop ended abnormally");
    }

    result?;
    restored.map_err(to_boxed_err)
}

async fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &mut ModernUIState,
    catalog: &ChordCatalog,
    autosave: &Autosave,
    update_rx: &mut mpsc::Receiver<Update>,
    command_tx: &mpsc::Sender<Command>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let styles = LyricStyles::default();
    let mut status_rx = autosave.status();
    let mut redraw: Option<Pin<Box<Sleep>>> = None;
    let mut status_open = true;
    let mut event_rx = spawn_input_thread();

    redraw_and_reschedule(terminal, state, catalog, &styles, &mut redraw)?;

    while !state.should_exit {
        tokio::select! {
            biased;

            update = update_rx.recv() => {
                match update {
                    Some(update) => state.apply_update(update),
                    None => state.should_exit = true,
                }
            }

            maybe_event = event_rx.recv() => match maybe_event {
                Some(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    let outcome = apply_key(state, key, catalog);
                    handle_outcome(state, outcome, autosave, command_tx).await;
                }
                Some(_) => {}
                None => state.should_exit = true,
            },

            changed = status_rx.changed(), if status_open => {
                if changed.is_ok() {
                    state.save_status = status_rx.borrow_and_update().clone();
                } else {
                    status_open = false;
                    state.save_status = SaveStatus::Error("autosave stopped".to_string());
                }
            }

            _ = async {
                if let Some(s) = &mut redraw {
                    s.as_mut().await;
                } else {
                    futures_util::future::pending::<()>().await;
                }
            } => {}
        }
        if !state.should_exit {
            redraw_and_reschedule(terminal, state, catalog, &styles, &mut redraw)?;
        }
    }
    Ok(())
}

async fn handle_outcome(
    state: &mut ModernUIState,
    outcome: KeyOutcome,
    autosave: &Autosave,
    command_tx: &mpsc::Sender<Command>,
) {
    if let Some(cmd) = outcome.command
        && command_tx.send(cmd).await.is_err()
    {
        state.should_exit = true;
    }
    if outcome.edited || outcome.save_now {
        autosave.schedule(state.snapshot());
    }
    if outcome.save_now {
        state.notice = Some(match autosave.flush().await {
            Ok(id) => format!("Saved version {id}"),
            Err(e) => format!("Save failed: {e}"),
        });
    }
}

/// Single background thread polling crossterm and forwarding events.
fn spawn_input_thread() -> mpsc::Receiver<Event> {
    let (event_tx, event_rx) = mpsc::channel(32);
    thread::spawn(move || {
        loop {
            match crossterm::event::poll(Duration::from_millis(100)) {
                Ok(true) => {
                    if let Ok(ev) = crossterm::event::read()
                        && event_tx.blocking_send(ev).is_err()
                    {
                        break;
                    }
                }
                Ok(false) => {
                    if event_tx.is_closed() {
                        break;
                    }
                }
                Err(_) => thread::sleep(Duration::from_millis(100)),
            }
        }
    });
    event_rx
}

/// Draw, and keep ticking while playback moves.
fn redraw_and_reschedule<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    state: &ModernUIState,
    catalog: &ChordCatalog,
    styles: &LyricStyles,
    redraw: &mut Option<Pin<Box<Sleep>>>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let duration_ms = state.last_update.as_ref().map_or(0, |u| u.duration_ms);
    let frame = FrameData {
        title: &state.title,
        artist: &state.artist,
        lines: &state.lines,
        arrangement: &state.arrangement,
        catalog,
        position_ms: state.position_ms(),
        duration_ms,
        playing: state.playing(),
        index: state.highlighted(),
        cursor: state.cursor,
        selected: state.selected,
        save_status: &state.save_status,
        notice: state.notice.as_deref(),
        input: state.input.as_deref(),
        err: state.last_update.as_ref().and_then(|u| u.err.as_deref()),
    };
    modern_helpers::draw_ui(terminal, &frame, styles)?;

    *redraw = state
        .playing()
        .then(|| Box::pin(tokio::time::sleep(REDRAW_INTERVAL)));
    Ok(())
}

/// Apply one key press to the view state.
pub fn apply_key(state: &mut ModernUIState, key: KeyEvent, catalog: &ChordCatalog) -> KeyOutcome {
    let mut outcome = KeyOutcome::default();

    if let Some(input) = state.input.as_mut() {
        match key.code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Esc => state.input = None,
            KeyCode::Enter => {
                let name = input.trim().to_string();
                state.input = None;
                match state.arrangement.add_chord(&name, catalog) {
                    Ok(id) => {
                        state.selected = Some(id);
                        state.notice = Some(format!("Added {name}"));
                        outcome.edited = true;
                    }
                    Err(e) => state.notice = Some(e.to_string()),
                }
            }
            _ => {}
        }
        return outcome;
    }

    state.notice = None;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => state.should_exit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.should_exit = true;
        }
        KeyCode::Char(' ') => outcome.command = Some(Command::TogglePlay),
        KeyCode::Left => outcome.command = Some(Command::SeekBy(-SEEK_STEP_MS)),
        KeyCode::Right => outcome.command = Some(Command::SeekBy(SEEK_STEP_MS)),
        KeyCode::Up | KeyCode::Down if !state.lines.is_empty() => {
            let last = state.lines.len() - 1;
            let from = state
                .cursor
                .or_else(|| anchor_line(&state.lines, state.highlighted(), state.position_ms()))
                .unwrap_or(0);
            state.cursor = Some(if key.code == KeyCode::Up {
                from.saturating_sub(1)
            } else {
                (from + 1).min(last)
            });
        }
        KeyCode::Enter => {
            if let Some(line) = state.cursor.take() {
                outcome.command = Some(Command::SeekToLine(line));
            }
        }
        KeyCode::Char(c @ '1'..='9') => {
            let n = c as usize - '1' as usize;
            match state.arrangement.chords().get(n) {
                Some(chord) => state.selected = Some(chord.id),
                None => state.notice = Some(format!("No chord in slot {}", n + 1)),
            }
        }
        KeyCode::Char('v') => match cycle_voicing(state, catalog) {
            Ok(msg) => {
                state.notice = Some(msg);
                outcome.edited = true;
            }
            Err(msg) => state.notice = Some(msg),
        },
        KeyCode::Char('p') => outcome.edited = place_selected(state),
        KeyCode::Char('x') => {
            let position_ms = state.position_ms();
            let active = active_placement(
                &state.arrangement,
                &state.lines,
                state.highlighted(),
                position_ms,
            )
            .cloned();
            match active {
                Some(p) => {
                    state
                        .arrangement
                        .remove_placement(p.line_index, p.position, &p.chord);
                    state.notice = Some(format!("Removed {} from line {}", p.chord, p.line_index + 1));
                    outcome.edited = true;
                }
                None => state.notice = Some("No chord is sounding".to_string()),
            }
        }
        KeyCode::Char('[') => outcome.edited = nudge_active(state, -NUDGE_PCT),
        KeyCode::Char(']') => outcome.edited = nudge_active(state, NUDGE_PCT),
        KeyCode::Char('w') => outcome.edited = tag_word(state, catalog, true),
        KeyCode::Char('W') => outcome.edited = tag_word(state, catalog, false),
        KeyCode::Char('D') => {
            if let Some(id) = state.selected
                && let Some(name) = state.selected_name()
            {
                match state.arrangement.delete_chord(id) {
                    Ok(removed) => {
                        state.selected = state.arrangement.chords().first().map(|c| c.id);
                        state.notice = Some(format!("Deleted {name} and {removed} placements"));
                        outcome.edited = true;
                    }
                    Err(e) => state.notice = Some(e.to_string()),
                }
            }
        }
        KeyCode::Char('a') => state.input = Some(String::new()),
        KeyCode::Char('s') => outcome.save_now = true,
        _ => {}
    }
    outcome
}

/// Move the selected palette chord to its next free voicing.
fn cycle_voicing(state: &mut ModernUIState, catalog: &ChordCatalog) -> Result<String, String> {
    let id = state.selected.ok_or_else(|| "No chord selected".to_string())?;
    let chord = state
        .arrangement
        .chord(id)
        .ok_or_else(|| "No chord selected".to_string())?;
    let name = chord.chord_name.clone();
    let current = chord.chord_position;
    let count = catalog.resolve(&name).map_or(0, <[_]>::len);
    let start = match current {
        VoicingSelection::Unset => 0,
        VoicingSelection::Selected(i) => i + 1,
    };
    for step in 0..count {
        let index = (start + step) % count;
        if current == VoicingSelection::Selected(index) {
            continue;
        }
        match state.arrangement.set_voicing(id, index, catalog) {
            Ok(()) => return Ok(format!("{name} voicing {}/{count}", index + 1)),
            Err(ArrangementError::PositionConflict { .. }) => continue,
            Err(e) => return Err(e.to_string()),
        }
    }
    Err(format!("No other free voicing for {name}"))
}

/// Place the selected chord at the estimated position. Returns true on edit.
fn place_selected(state: &mut ModernUIState) -> bool {
    let Some(chord) = state.selected.and_then(|id| state.arrangement.chord(id)) else {
        state.notice = Some("No chord selected".to_string());
        return false;
    };
    let (name, voicing) = (chord.chord_name.clone(), chord.chord_position);
    let position_ms = state.position_ms();
    let Some(line_index) = anchor_line(&state.lines, state.highlighted(), position_ms) else {
        state.notice = Some("No lyric line has started yet".to_string());
        return false;
    };
    let pct = position_percent(&state.lines[line_index], position_ms);
    let replaced = state
        .arrangement
        .add_or_replace(line_index, pct, &name, voicing);
    state.notice = Some(if replaced > 0 {
        format!("Replaced chord with {name} on line {}", line_index + 1)
    } else {
        format!("Placed {name} on line {}", line_index + 1)
    });
    true
}

/// Shift the sounding placement along its line.
fn nudge_active(state: &mut ModernUIState, step: f64) -> bool {
    let position_ms = state.position_ms();
    let Some(p) = active_placement(
        &state.arrangement,
        &state.lines,
        state.highlighted(),
        position_ms,
    )
    .cloned() else {
        state.notice = Some("No chord is sounding".to_string());
        return false;
    };
    let target = (p.position + step).clamp(0.0, 100.0);
    if !state
        .arrangement
        .move_placement(p.line_index, &p.chord, p.position, target)
    {
        return false;
    }
    state.notice = Some(format!("Moved {} to {target:.0}%", p.chord));
    true
}

/// Attach the selected chord to (or clear the chord from) the word being
/// sung. Past the end of a line the last word is used.
fn tag_word(state: &mut ModernUIState, catalog: &ChordCatalog, set: bool) -> bool {
    let position_ms = state.position_ms();
    let Some(line_index) = anchor_line(&state.lines, state.highlighted(), position_ms) else {
        state.notice = Some("No lyric line has started yet".to_string());
        return false;
    };
    let chord = if set {
        let Some(name) = state.selected_name() else {
            state.notice = Some("No chord selected".to_string());
            return false;
        };
        Some(name)
    } else {
        None
    };

    let at = position_ms as f64;
    let words = state.lines[line_index].ensure_words();
    let Some(word_index) = words
        .iter()
        .position(|w| w.start <= at && at < w.end)
        .or_else(|| words.len().checked_sub(1))
    else {
        state.notice = Some("This line has no words".to_string());
        return false;
    };
    let word = words[word_index].word.clone();

    match set_word_chord(&mut state.lines, line_index, word_index, chord.as_deref(), catalog) {
        Ok(()) => {
            state.notice = Some(match chord {
                Some(name) => format!("{name} on \"{word}\""),
                None => format!("Cleared chord on \"{word}\""),
            });
            true
        }
        Err(e) => {
            state.notice = Some(e.to_string());
            false
        }
    }
}

fn to_boxed_err<E: std::error::Error + Send + Sync + 'static>(
    e: E,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::parse_lrc;
    use crate::session::Origin;
    use crate::store::SongKey;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn catalog() -> &'static ChordCatalog {
        ChordCatalog::bundled()
    }

    fn session() -> LoadedSession {
        let mut arrangement = Arrangement::new();
        arrangement.add_chord("C", catalog()).unwrap();
        arrangement.add_chord("G", catalog()).unwrap();
        LoadedSession {
            key: SongKey::new("Artist", "Song"),
            version_id: None,
            lines: parse_lrc("[00:01.00]first line\n[00:05.00]second line\n[00:09.00]third line").lines,
            arrangement,
            origin: Origin::Fetched,
        }
    }

    fn paused_at(state: &mut ModernUIState, position_ms: i64) {
        state.apply_update(Update {
            position_ms,
            duration_ms: 20_000,
            playing: false,
            ..Update::default()
        });
    }

    #[test]
    fn transport_keys_map_to_commands() {
        let mut state = ModernUIState::new(&session());
        assert_eq!(apply_key(&mut state, key(KeyCode::Char(' ')), catalog()).command, Some(Command::TogglePlay));
        assert_eq!(apply_key(&mut state, key(KeyCode::Left), catalog()).command, Some(Command::SeekBy(-5_000)));
        assert_eq!(apply_key(&mut state, key(KeyCode::Right), catalog()).command, Some(Command::SeekBy(5_000)));
        apply_key(&mut state, key(KeyCode::Char('q')), catalog());
        assert!(state.should_exit);
    }

    #[test]
    fn cursor_then_enter_seeks_to_line() {
        let mut state = ModernUIState::new(&session());
        paused_at(&mut state, 1_500);
        apply_key(&mut state, key(KeyCode::Down), catalog());
        apply_key(&mut state, key(KeyCode::Down), catalog());
        apply_key(&mut state, key(KeyCode::Down), catalog());
        assert_eq!(state.cursor, Some(2));
        let outcome = apply_key(&mut state, key(KeyCode::Enter), catalog());
        assert_eq!(outcome.command, Some(Command::SeekToLine(2)));
        assert_eq!(state.cursor, None);
    }

    #[test]
    fn place_uses_estimated_position() {
        let mut state = ModernUIState::new(&session());
        paused_at(&mut state, 3_000);
        apply_key(&mut state, key(KeyCode::Char('2')), catalog());
        let outcome = apply_key(&mut state, key(KeyCode::Char('p')), catalog());
        assert!(outcome.edited);
        let placed = &state.arrangement.placements()[0];
        assert_eq!(placed.line_index, 0);
        assert_eq!(placed.chord, "G");
        assert!((placed.position - 50.0).abs() < 1e-9);
    }

    #[test]
    fn remove_and_delete_edit_the_arrangement() {
        let mut state = ModernUIState::new(&session());
        paused_at(&mut state, 6_000);
        apply_key(&mut state, key(KeyCode::Char('p')), catalog());
        assert_eq!(state.arrangement.placements().len(), 1);

        let outcome = apply_key(&mut state, key(KeyCode::Char('x')), catalog());
        assert!(outcome.edited);
        assert!(state.arrangement.placements().is_empty());

        apply_key(&mut state, key(KeyCode::Char('p')), catalog());
        let outcome = apply_key(&mut state, key(KeyCode::Char('D')), catalog());
        assert!(outcome.edited);
        assert!(state.arrangement.placements().is_empty());
        assert_eq!(state.arrangement.chords().len(), 1);
        assert_eq!(state.selected_name().as_deref(), Some("G"));
    }

    #[test]
    fn voicing_cycle_skips_taken_voicings() {
        let mut s = session();
        // First C holds voicing 1.
        s.arrangement.set_voicing(0, 0, catalog()).unwrap();
        s.arrangement.add_chord("C", catalog()).unwrap();
        let mut state = ModernUIState::new(&s);
        // Second C cannot share it and lands on voicing 2.
        apply_key(&mut state, key(KeyCode::Char('3')), catalog());
        let outcome = apply_key(&mut state, key(KeyCode::Char('v')), catalog());
        assert!(outcome.edited);
        let positions: Vec<VoicingSelection> =
            state.arrangement.chords().iter().map(|c| c.chord_position).collect();
        assert_eq!(
            positions,
            vec![
                VoicingSelection::Selected(0),
                VoicingSelection::Unset,
                VoicingSelection::Selected(1)
            ]
        );
    }

    #[test]
    fn typed_chord_is_added_and_selected() {
        let mut state = ModernUIState::new(&session());
        apply_key(&mut state, key(KeyCode::Char('a')), catalog());
        for c in "Am7".chars() {
            apply_key(&mut state, key(KeyCode::Char(c)), catalog());
        }
        // Typing does not trigger other bindings.
        assert!(!state.should_exit);
        let outcome = apply_key(&mut state, key(KeyCode::Enter), catalog());
        assert!(outcome.edited);
        assert_eq!(state.selected_name().as_deref(), Some("Am7"));
        assert!(state.input.is_none());

        apply_key(&mut state, key(KeyCode::Char('a')), catalog());
        apply_key(&mut state, key(KeyCode::Char('H')), catalog());
        let outcome = apply_key(&mut state, key(KeyCode::Enter), catalog());
        assert!(!outcome.edited);
        assert!(state.notice.is_some());
    }

    #[test]
    fn nudge_moves_the_sounding_chord() {
        let mut state = ModernUIState::new(&session());
        paused_at(&mut state, 3_000);
        apply_key(&mut state, key(KeyCode::Char('p')), catalog());
        assert!(apply_key(&mut state, key(KeyCode::Char('[')), catalog()).edited);
        assert!((state.arrangement.placements()[0].position - 49.0).abs() < 1e-9);
    }

    #[test]
    fn word_tagging_uses_the_word_being_sung() {
        let mut state = ModernUIState::new(&session());
        // "second line" spans 5s..9s, so 8s falls in "line".
        paused_at(&mut state, 8_000);
        assert!(apply_key(&mut state, key(KeyCode::Char('w')), catalog()).edited);
        let words = state.lines[1].words.as_ref().unwrap();
        assert_eq!(words[0].chord, None);
        assert_eq!(words[1].chord.as_deref(), Some("C"));
        assert_eq!(state.snapshot().lyrics.unwrap()[1].words.as_ref().unwrap()[1].chord.as_deref(), Some("C"));

        assert!(apply_key(&mut state, key(KeyCode::Char('W')), catalog()).edited);
        assert_eq!(state.lines[1].words.as_ref().unwrap()[1].chord, None);
    }

    #[test]
    fn save_key_requests_flush() {
        let mut state = ModernUIState::new(&session());
        assert!(apply_key(&mut state, key(KeyCode::Char('s')), catalog()).save_now);
    }
}
