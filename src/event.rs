use crate::player::Player;
use crate::state::{StateBundle, Update};
use tokio::sync::mpsc;

/// Requests from a view to the playback loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    TogglePlay,
    /// Relative seek in milliseconds.
    SeekBy(i64),
    /// Jump to the start of a lyric line.
    SeekToLine(usize),
    Shutdown,
}

/// Send the current state unless this version was already delivered.
pub async fn send_update(state: &mut StateBundle, update_tx: &mpsc::Sender<Update>, force: bool) {
    if !force && state.last_sent == Some(state.version) {
        return;
    }
    if update_tx.send(state.to_update()).await.is_ok() {
        state.last_sent = Some(state.version);
    }
}

/// Poll the player once and publish the result if anything changed.
pub async fn handle_poll<P: Player>(
    player: &P,
    state: &mut StateBundle,
    update_tx: &mpsc::Sender<Update>,
) {
    match player.get_current_state().await {
        Ok(snapshot) => {
            state.update_playback(snapshot.as_ref());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to poll player state");
            state.set_error(Some(e.to_string()));
        }
    }
    send_update(state, update_tx, false).await;
}

/// Apply one command. Returns false when the loop should stop.
pub async fn process_command<P: Player>(
    command: Command,
    player: &P,
    state: &mut StateBundle,
    update_tx: &mpsc::Sender<Update>,
) -> bool {
    let result = match command {
        Command::Shutdown => return false,
        Command::TogglePlay => player.toggle_play().await,
        Command::SeekBy(delta) => {
            // A relative seek supersedes any line the user jumped to.
            state.cancel_seek();
            let mut target = (state.player_state.position_ms + delta).max(0);
            if state.player_state.duration_ms > 0 {
                target = target.min(state.player_state.duration_ms);
            }
            player.seek(target).await
        }
        Command::SeekToLine(index) => {
            let Some(line) = state.lines.get(index) else {
                tracing::debug!(index, "Seek to a line that does not exist");
                return true;
            };
            let target = line.timestamp;
            state.request_seek(index);
            send_update(state, update_tx, false).await;
            let result = player.seek(target).await;
            if result.is_err() {
                state.cancel_seek();
            }
            result
        }
    };

    if let Err(e) = result {
        tracing::warn!(error = %e, "Player command failed");
        state.set_error(Some(e.to_string()));
        send_update(state, update_tx, false).await;
        return true;
    }
    // Reflect the command's effect without waiting for the next tick.
    handle_poll(player, state, update_tx).await;
    true
}
