// pool.rs: Playback loop polling the player and feeding the views

use crate::event::{self, Command};
use crate::lyrics::LyricLine;
use crate::player::Player;
use crate::state::{StateBundle, Update};
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Own the player for the lifetime of a view: connect, poll on a fixed
/// interval, run commands, and disconnect on shutdown.
///
/// Player errors are reported through `Update::err`; they never end the loop.
pub async fn listen<P: Player>(
    player: P,
    lines: Vec<LyricLine>,
    update_tx: mpsc::Sender<Update>,
    mut command_rx: mpsc::Receiver<Command>,
    poll_interval: Duration,
) {
    let mut state = StateBundle::new(lines);

    if let Err(e) = player.connect().await {
        tracing::warn!(error = %e, "Failed to connect to player");
        state.set_error(Some(e.to_string()));
    }
    event::send_update(&mut state, &update_tx, true).await;

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_cmd = command_rx.recv() => {
                let Some(cmd) = maybe_cmd else { break };
                if !event::process_command(cmd, &player, &mut state, &update_tx).await {
                    break;
                }
            }
            _ = ticker.tick() => {
                event::handle_poll(&player, &mut state, &update_tx).await;
            }
        }
        if update_tx.is_closed() {
            break;
        }
    }

    if let Err(e) = player.disconnect().await {
        tracing::warn!(error = %e, "Failed to disconnect player");
    }
    tracing::debug!("Playback loop stopped");
}
