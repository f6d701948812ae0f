use crate::arrangement::Arrangement;
use crate::event::Command;
use crate::lyrics::LyricLine;
use crate::player::Player;
use crate::pool;
use crate::session::LoadedSession;
use std::time::Duration;
use tokio::sync::mpsc;

/// Print lyric lines with their chords as playback reaches them (stdout only,
/// for scripting). Runs until Ctrl-C or the playback loop stops.
pub async fn display_lyrics_pipe<P: Player + 'static>(
    session: LoadedSession,
    player: P,
    poll_interval: Duration,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (tx, mut rx) = mpsc::channel(32);
    let (command_tx, command_rx) = mpsc::channel(1);
    let listener = tokio::spawn(pool::listen(
        player,
        session.lines.clone(),
        tx,
        command_rx,
        poll_interval,
    ));

    let mut last_line_idx: Option<usize> = None;
    let mut last_err: Option<String> = None;
    loop {
        tokio::select! {
            upd = rx.recv() => {
                let Some(upd) = upd else { break };
                if upd.err != last_err {
                    if let Some(e) = &upd.err {
                        eprintln!("{e}");
                    }
                    last_err = upd.err.clone();
                }
                if upd.index != last_line_idx {
                    if let Some(idx) = upd.index {
                        println!("{}", pipe_line(&session.lines, &session.arrangement, idx));
                    }
                    last_line_idx = upd.index;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                let _ = command_tx.send(Command::Shutdown).await;
                break;
            }
        }
    }

    drop(rx);
    if let Err(e) = listener.await {
        tracing::warn!(error = %e, "Playback loop ended abnormally");
    }
    Ok(())
}

/// `[C G] text` for line `idx`; lines without chords print bare.
pub fn pipe_line(lines: &[LyricLine], arrangement: &Arrangement, idx: usize) -> String {
    let text = lines.get(idx).map_or("", |l| l.text.as_str());
    let chords: Vec<&str> = arrangement
        .placements_for_line(idx)
        .iter()
        .map(|p| p.chord.as_str())
        .collect();
    if chords.is_empty() {
        text.to_string()
    } else {
        format!("[{}] {}", chords.join(" "), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::VoicingSelection;
    use crate::lyrics::parse_lrc;

    #[test]
    fn chords_prefix_the_line_in_order() {
        let lines = parse_lrc("[00:01.00]first\n[00:02.00]second").lines;
        let mut arrangement = Arrangement::new();
        arrangement.add_or_replace(0, 60.0, "G", VoicingSelection::Unset);
        arrangement.add_or_replace(0, 10.0, "C", VoicingSelection::Unset);

        assert_eq!(pipe_line(&lines, &arrangement, 0), "[C G] first");
        assert_eq!(pipe_line(&lines, &arrangement, 1), "second");
        assert_eq!(pipe_line(&lines, &arrangement, 7), "");
    }
}
