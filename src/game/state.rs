// Shared game state: the authoritative snapshot pushed by the server.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Lobby,
    Active,
    Finished,
}

/// The five artists whose paintings circulate in the game. The wire format
/// uses the full display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Artist {
    #[serde(rename = "Viktor Novak")]
    ViktorNovak,
    #[serde(rename = "Marina Costa")]
    MarinaCosta,
    #[serde(rename = "Leon Bauer")]
    LeonBauer,
    #[serde(rename = "Flora Vance")]
    FloraVance,
    #[serde(rename = "Celeste Ruiz")]
    CelesteRuiz,
}

impl Artist {
    /// All artists in board order (used by the server for tie-breaking).
    pub const ALL: [Artist; 5] = [
        Artist::ViktorNovak,
        Artist::MarinaCosta,
        Artist::LeonBauer,
        Artist::FloraVance,
        Artist::CelesteRuiz,
    ];

    /// Display name as it appears on the wire and on the board.
    pub fn name(self) -> &'static str {
        match self {
            Artist::ViktorNovak => "Viktor Novak",
            Artist::MarinaCosta => "Marina Costa",
            Artist::LeonBauer => "Leon Bauer",
            Artist::FloraVance => "Flora Vance",
            Artist::CelesteRuiz => "Celeste Ruiz",
        }
    }
}

impl std::fmt::Display for Artist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The bidding procedure attached to a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionType {
    Open,
    OnceAround,
    Hidden,
    FixedPrice,
    Double,
}

/// A card as held in a hand. `artwork_id` is purely cosmetic (selects the
/// artwork image) and is tolerated when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub artist: Artist,
    pub auction_type: AuctionType,
    #[serde(default)]
    pub artwork_id: u32,
}

/// A card that has been played this turn: up for auction, or resolved with
/// an owner once the auction result is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInPlay {
    pub id: String,
    pub round: u32,
    pub artist: Artist,
    pub auction_type: AuctionType,
    pub owner_id: Option<String>,
    pub owner_name: Option<String>,
    pub price_paid: Option<i64>,
    #[serde(default)]
    pub played_by_id: Option<String>,
}

/// Public view of a player. Hand contents and money are only visible for
/// the local player (via `your_hand` / `your_money` on the snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub card_count: u32,
    pub painting_count: u32,
    /// Position in the turn sequence. Dense and unique across the game.
    pub turn_order: u32,
    pub is_connected: bool,
}

/// Per-artist value history across rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistValue {
    pub artist: Artist,
    pub values_by_round: HashMap<u32, i64>,
    pub cumulative_value: i64,
}

/// Server-side offer-cycle state for a pending double auction. Present on
/// the snapshot only while a played `double` card awaits a second card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubleAuctionState {
    pub first_card: Card,
    pub played_by_id: String,
    pub played_by_name: String,
    /// Whose turn it is to offer a second card, if anyone's.
    pub current_offerer_id: Option<String>,
    #[serde(default)]
    pub second_card: Option<Card>,
    #[serde(default)]
    pub second_card_player_id: Option<String>,
}

/// The complete game state as last confirmed by the server.
///
/// A snapshot is created from the first fetch or the first push after
/// connecting, replaced wholesale by every `game_state` message, and
/// patched in place only by the lobby messages (`player_joined`,
/// `players_reordered`, connect/disconnect flags). The client never
/// advances turn order, money, or ownership on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub code: String,
    pub status: GameStatus,
    pub current_round: u32,
    pub host_player_id: String,
    pub current_turn_player_id: Option<String>,
    pub awaiting_auction_result: bool,
    pub players: Vec<Player>,
    pub artist_counts: HashMap<Artist, u32>,
    pub artist_values: Vec<ArtistValue>,
    pub cards_in_play: Vec<CardInPlay>,
    pub double_auction_state: Option<DoubleAuctionState>,
    pub created_at: NaiveDateTime,
    /// The local player's hand. Indices are positionally meaningful: play
    /// commands reference cards by hand index.
    #[serde(default)]
    pub your_hand: Vec<Card>,
    #[serde(default)]
    pub your_money: i64,
    #[serde(default)]
    pub your_player_id: String,
}

impl GameSnapshot {
    /// Look up a player by id.
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Players sorted by ascending turn order.
    pub fn players_in_turn_order(&self) -> Vec<&Player> {
        let mut out: Vec<&Player> = self.players.iter().collect();
        out.sort_by_key(|p| p.turn_order);
        out
    }

    /// The player whose turn it currently is, when applicable.
    pub fn current_turn_player(&self) -> Option<&Player> {
        self.current_turn_player_id
            .as_deref()
            .and_then(|id| self.player(id))
    }

    /// Whether it is the local player's turn to play a card.
    pub fn is_your_turn(&self) -> bool {
        self.current_turn_player_id.as_deref() == Some(self.your_player_id.as_str())
            && !self.your_player_id.is_empty()
    }

    /// Cards in play that have not yet been sold. Length is 0, 1, or 2;
    /// 2 means a double auction is in progress or just resolved.
    pub fn unsold_cards_in_play(&self) -> Vec<&CardInPlay> {
        self.cards_in_play
            .iter()
            .filter(|c| c.owner_id.is_none())
            .collect()
    }

    /// Check that turn orders are dense and unique (0..n, each exactly
    /// once). The server guarantees this; the check is for tests and
    /// debug assertions.
    pub fn turn_order_is_dense(&self) -> bool {
        let mut orders: Vec<u32> = self.players.iter().map(|p| p.turn_order).collect();
        orders.sort_unstable();
        orders
            .iter()
            .enumerate()
            .all(|(i, &o)| o as usize == i)
    }
}
