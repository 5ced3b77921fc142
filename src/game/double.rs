// Double-auction offer cycle, reconstructed read-only from the snapshot.
//
// When a `double` card is played, the server walks the turn order asking
// each player in sequence to attach a second card of the same artist. The
// client never advances this cycle itself: it derives the current phase
// from `double_auction_state` on the latest snapshot and answers two
// questions for the caller: is the local player being asked right now, and
// which hand indices are legal to attach.

use crate::game::state::{AuctionType, Card, GameSnapshot};

/// Where the offer cycle stands, as of the latest snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum DoublePhase<'a> {
    /// No double auction pending.
    Idle,
    /// A `double` card is on the table, waiting for a second card.
    Offered {
        first_card: &'a Card,
        played_by_id: &'a str,
        /// Player currently asked to attach a card, if the cycle has one.
        current_offerer_id: Option<&'a str>,
    },
}

/// Derive the offer-cycle phase from a snapshot.
pub fn phase(snapshot: &GameSnapshot) -> DoublePhase<'_> {
    match &snapshot.double_auction_state {
        None => DoublePhase::Idle,
        Some(state) => DoublePhase::Offered {
            first_card: &state.first_card,
            played_by_id: &state.played_by_id,
            current_offerer_id: state.current_offerer_id.as_deref(),
        },
    }
}

/// Whether the local player is the one currently asked to offer a second
/// card.
pub fn is_your_offer(snapshot: &GameSnapshot) -> bool {
    match phase(snapshot) {
        DoublePhase::Offered {
            current_offerer_id: Some(id),
            ..
        } => !snapshot.your_player_id.is_empty() && id == snapshot.your_player_id,
        _ => false,
    }
}

/// Hand indices that may legally be attached to `first_card`: same artist,
/// any auction type except another `double`.
pub fn candidate_indices(hand: &[Card], first_card: &Card) -> Vec<usize> {
    hand.iter()
        .enumerate()
        .filter(|(_, card)| {
            card.artist == first_card.artist && card.auction_type != AuctionType::Double
        })
        .map(|(i, _)| i)
        .collect()
}
