// Wire protocol: the push-channel envelope and its typed message catalog.
//
// Every inbound frame is a JSON object `{"type": string, "data": object}`.
// The one exception is the keepalive: the client sends the bare text frame
// `ping` and the server may answer with bare `pong`; neither carries an
// envelope. Decoding classifies frames into three tiers: the authoritative
// full snapshot, incremental lobby patches, and notification-only gameplay
// events that never mutate the snapshot (the server always follows them
// with a fresh `game_state`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::game::state::{Artist, Card, GameSnapshot};

/// Keepalive token sent client->server on a fixed interval.
pub const KEEPALIVE_FRAME: &str = "ping";

/// Keepalive reply the server may send; swallowed at the transport layer.
pub const KEEPALIVE_REPLY: &str = "pong";

/// Why a frame could not be decoded into a [`ServerMessage`].
///
/// Both variants are tolerated by the dispatch loop: malformed frames are
/// line noise on a channel that must keep running, and unknown types are
/// expected from newer servers.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not a valid message envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unrecognized message type `{0}`")]
    UnknownType(String),
}

/// Raw envelope shared by every push-channel message.
#[derive(Debug, Deserialize, Serialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    data: Value,
}

/// A single player's updated position within a `players_reordered` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TurnOrderUpdate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub turn_order: u32,
}

/// A decoded inbound message, grouped by how it affects the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Full authoritative state. Replaces the snapshot wholesale.
    GameState(Box<GameSnapshot>),
    /// A player joined the lobby; appended at the end of the turn order.
    PlayerJoined { player_id: String, player_name: String },
    /// Turn orders changed; patches `turn_order` for the listed ids only.
    PlayersReordered { players: Vec<TurnOrderUpdate> },
    /// Presence flag updates for a single player.
    PlayerDisconnected { player_id: String },
    PlayerReconnected { player_id: String },
    /// Transient gameplay event. Carries context for UI feedback only and
    /// never feeds a state mutation; the authoritative `game_state` that
    /// follows it carries the real result.
    Notification(Notification),
}

/// Notification-only events, with their payloads as broadcast by the
/// server. Fields are default-tolerant: these exist for toasts and sounds,
/// not for state, so a missing field must not kill the frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    CardPlayed(CardPlayedNotice),
    WaitingForDouble(WaitingForDoubleNotice),
    DoubleAuctionReady(DoubleAuctionReadyNotice),
    DoubleAuctionNextOfferer(NextOffererNotice),
    DoubleAuctionDeclined(DeclinedNotice),
    AuctionRecorded(AuctionRecordedNotice),
    RoundEnded(RoundEndedNotice),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CardPlayedNotice {
    pub card: Card,
    pub played_by_id: String,
    pub played_by_name: String,
    #[serde(default)]
    pub artist_counts: HashMap<Artist, u32>,
    #[serde(default)]
    pub awaiting_auction_result: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WaitingForDoubleNotice {
    pub card: Card,
    pub played_by_id: String,
    pub played_by_name: String,
    #[serde(default)]
    pub current_offerer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DoubleAuctionReadyNotice {
    pub second_card: Card,
    pub added_by_id: String,
    pub added_by_name: String,
    #[serde(default)]
    pub artist_counts: HashMap<Artist, u32>,
    #[serde(default)]
    pub awaiting_auction_result: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NextOffererNotice {
    pub current_offerer_id: Option<String>,
    #[serde(default)]
    pub declined_by_id: String,
    #[serde(default)]
    pub declined_by_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeclinedNotice {
    #[serde(default)]
    pub all_declined: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AuctionRecordedNotice {
    pub winner_id: Option<String>,
    pub winner_name: Option<String>,
    #[serde(default)]
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoundEndedNotice {
    #[serde(default)]
    pub triggering_card: Option<Card>,
    #[serde(default)]
    pub played_by: String,
    #[serde(default)]
    pub rankings: Vec<Value>,
    #[serde(default)]
    pub payouts: Vec<Value>,
    #[serde(default)]
    pub new_values: HashMap<Artist, i64>,
}

impl ServerMessage {
    /// Decode a raw text frame into a typed message.
    ///
    /// Returns [`DecodeError::Malformed`] when the frame is not a valid
    /// envelope or its payload does not match the expected shape, and
    /// [`DecodeError::UnknownType`] for types this client does not know.
    pub fn decode(frame: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_str(frame)?;
        let data = envelope.data;

        let message = match envelope.kind.as_str() {
            "game_state" => {
                ServerMessage::GameState(Box::new(serde_json::from_value(data)?))
            }
            "player_joined" => {
                #[derive(Deserialize)]
                struct JoinData {
                    player_id: String,
                    player_name: String,
                }
                let join: JoinData = serde_json::from_value(data)?;
                ServerMessage::PlayerJoined {
                    player_id: join.player_id,
                    player_name: join.player_name,
                }
            }
            "players_reordered" => {
                #[derive(Deserialize)]
                struct ReorderData {
                    players: Vec<TurnOrderUpdate>,
                }
                let reorder: ReorderData = serde_json::from_value(data)?;
                ServerMessage::PlayersReordered {
                    players: reorder.players,
                }
            }
            "player_disconnected" => {
                #[derive(Deserialize)]
                struct PresenceData {
                    player_id: String,
                }
                let presence: PresenceData = serde_json::from_value(data)?;
                ServerMessage::PlayerDisconnected {
                    player_id: presence.player_id,
                }
            }
            "player_reconnected" => {
                #[derive(Deserialize)]
                struct PresenceData {
                    player_id: String,
                }
                let presence: PresenceData = serde_json::from_value(data)?;
                ServerMessage::PlayerReconnected {
                    player_id: presence.player_id,
                }
            }
            "card_played" => ServerMessage::Notification(Notification::CardPlayed(
                serde_json::from_value(data)?,
            )),
            "waiting_for_double" => ServerMessage::Notification(
                Notification::WaitingForDouble(serde_json::from_value(data)?),
            ),
            "double_auction_ready" => ServerMessage::Notification(
                Notification::DoubleAuctionReady(serde_json::from_value(data)?),
            ),
            "double_auction_next_offerer" => ServerMessage::Notification(
                Notification::DoubleAuctionNextOfferer(serde_json::from_value(data)?),
            ),
            "double_auction_declined" => ServerMessage::Notification(
                Notification::DoubleAuctionDeclined(serde_json::from_value(data)?),
            ),
            "auction_recorded" => ServerMessage::Notification(
                Notification::AuctionRecorded(serde_json::from_value(data)?),
            ),
            "round_ended" => ServerMessage::Notification(Notification::RoundEnded(
                serde_json::from_value(data)?,
            )),
            other => return Err(DecodeError::UnknownType(other.to_string())),
        };

        Ok(message)
    }
}
