// Pure state transitions driven by decoded push-channel messages.
//
// The transition table is deliberately small: `game_state` replaces the
// snapshot wholesale, the lobby messages patch individual fields, and every
// notification is a structural no-op (the server always follows one with a
// fresh `game_state`). Nothing in here invents state: money, ownership, and
// turn advancement only ever arrive via a full snapshot.

use tracing::debug;

use crate::game::state::{GameSnapshot, Player};
use crate::protocol::ServerMessage;

/// Apply one decoded message to the current snapshot, producing the next.
///
/// Before the first `game_state` arrives there is nothing to patch, so any
/// other message leaves the state at `None`.
pub fn apply(current: Option<GameSnapshot>, message: &ServerMessage) -> Option<GameSnapshot> {
    match message {
        ServerMessage::GameState(snapshot) => Some((**snapshot).clone()),
        _ => {
            let Some(mut snapshot) = current else {
                debug!("dropping pre-snapshot message: nothing to patch yet");
                return None;
            };
            patch(&mut snapshot, message);
            Some(snapshot)
        }
    }
}

fn patch(snapshot: &mut GameSnapshot, message: &ServerMessage) {
    match message {
        // Handled by the caller before reaching here.
        ServerMessage::GameState(_) => {}

        ServerMessage::PlayerJoined {
            player_id,
            player_name,
        } => {
            // The server broadcasts this once per join; a full game_state
            // corrects any drift if a duplicate ever slips through.
            let turn_order = snapshot.players.len() as u32;
            snapshot.players.push(Player {
                id: player_id.clone(),
                name: player_name.clone(),
                card_count: 0,
                painting_count: 0,
                turn_order,
                is_connected: true,
            });
        }

        ServerMessage::PlayersReordered { players } => {
            // Patch turn_order by id only. Ids we do not know are skipped;
            // nothing else about the player rows changes.
            for update in players {
                if let Some(player) =
                    snapshot.players.iter_mut().find(|p| p.id == update.id)
                {
                    player.turn_order = update.turn_order;
                } else {
                    debug!(player_id = %update.id, "reorder for unknown player, skipping");
                }
            }
        }

        ServerMessage::PlayerDisconnected { player_id } => {
            set_connected(snapshot, player_id, false);
        }

        ServerMessage::PlayerReconnected { player_id } => {
            set_connected(snapshot, player_id, true);
        }

        // Notifications carry UI context only; the authoritative result
        // arrives in the game_state that follows.
        ServerMessage::Notification(_) => {}
    }
}

fn set_connected(snapshot: &mut GameSnapshot, player_id: &str, connected: bool) {
    match snapshot.players.iter_mut().find(|p| p.id == player_id) {
        Some(player) => player.is_connected = connected,
        None => debug!(%player_id, "presence update for unknown player, skipping"),
    }
}
