// HTTP action client: everything the player does travels over REST.
//
// Actions are fire-and-forget with respect to state: a 2xx response means
// the server accepted the command, and the resulting state change arrives
// on the push channel as a fresh `game_state`. Responses here never patch
// the snapshot.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::state::GameSnapshot;

#[derive(Debug, Error)]
pub enum ActionError {
    /// The server understood the request and said no. Carries the
    /// human-readable `detail` from the response body.
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got a usable response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Response to creating a game.
#[derive(Debug, Clone, Deserialize)]
pub struct GameCreated {
    pub game_code: String,
    pub player_id: String,
}

/// Response to joining a game.
#[derive(Debug, Clone, Deserialize)]
pub struct Joined {
    pub player_id: String,
}

/// The subset of the action surface that session bootstrap depends on,
/// as a seam for tests.
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn fetch_state(
        &self,
        game_code: &str,
        player_id: &str,
    ) -> Result<GameSnapshot, ActionError>;

    async fn create_game(&self, host_name: &str) -> Result<GameCreated, ActionError>;

    async fn join_game(&self, game_code: &str, player_name: &str)
        -> Result<Joined, ActionError>;
}

/// Client for the game server's `/api` surface.
pub struct ActionClient {
    http: reqwest::Client,
    api_base: String,
}

#[derive(Serialize)]
struct HostName<'a> {
    host_name: &'a str,
}

#[derive(Serialize)]
struct PlayerName<'a> {
    player_name: &'a str,
}

#[derive(Serialize)]
struct CardChoice<'a> {
    player_id: &'a str,
    card_index: usize,
}

#[derive(Serialize)]
struct PlayerOnly<'a> {
    player_id: &'a str,
}

#[derive(Serialize)]
struct AuctionResult<'a> {
    winner_id: Option<&'a str>,
    price: i64,
}

impl ActionClient {
    /// `api_base` is the full REST prefix, e.g. `http://localhost:8000/api`.
    pub fn new(api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
        }
    }

    /// Start the game. Host only, lobby only.
    pub async fn start_game(&self, game_code: &str, player_id: &str) -> Result<(), ActionError> {
        let url = format!("{}/games/{game_code}/start", self.api_base);
        let response = self
            .http
            .post(url)
            .query(&[("player_id", player_id)])
            .send()
            .await?;
        expect_ok(response).await
    }

    /// Shuffle the turn order. Host only, lobby only; the new order arrives
    /// as a `players_reordered` push.
    pub async fn randomize_order(
        &self,
        game_code: &str,
        player_id: &str,
    ) -> Result<(), ActionError> {
        let url = format!("{}/games/{game_code}/randomize-order", self.api_base);
        let response = self
            .http
            .post(url)
            .query(&[("player_id", player_id)])
            .send()
            .await?;
        expect_ok(response).await
    }

    /// Play the card at `card_index` in the local hand.
    pub async fn play_card(
        &self,
        game_code: &str,
        player_id: &str,
        card_index: usize,
    ) -> Result<(), ActionError> {
        let url = format!("{}/games/{game_code}/play-card", self.api_base);
        let response = self
            .http
            .post(url)
            .json(&CardChoice {
                player_id,
                card_index,
            })
            .send()
            .await?;
        expect_ok(response).await
    }

    /// Attach a second card to a pending double auction.
    pub async fn add_double(
        &self,
        game_code: &str,
        player_id: &str,
        card_index: usize,
    ) -> Result<(), ActionError> {
        let url = format!("{}/games/{game_code}/add-double", self.api_base);
        let response = self
            .http
            .post(url)
            .json(&CardChoice {
                player_id,
                card_index,
            })
            .send()
            .await?;
        expect_ok(response).await
    }

    /// Decline to attach a second card when asked.
    pub async fn decline_double(
        &self,
        game_code: &str,
        player_id: &str,
    ) -> Result<(), ActionError> {
        let url = format!("{}/games/{game_code}/decline-double", self.api_base);
        let response = self
            .http
            .post(url)
            .json(&PlayerOnly { player_id })
            .send()
            .await?;
        expect_ok(response).await
    }

    /// Record the outcome of the auction being resolved. `winner` of `None`
    /// means the card went unsold.
    pub async fn record_auction(
        &self,
        game_code: &str,
        winner: Option<&str>,
        price: i64,
    ) -> Result<(), ActionError> {
        let url = format!("{}/games/{game_code}/record-auction", self.api_base);
        let response = self
            .http
            .post(url)
            .json(&AuctionResult {
                winner_id: winner,
                price,
            })
            .send()
            .await?;
        expect_ok(response).await
    }
}

#[async_trait]
impl GameApi for ActionClient {
    async fn fetch_state(
        &self,
        game_code: &str,
        player_id: &str,
    ) -> Result<GameSnapshot, ActionError> {
        let url = format!("{}/games/{game_code}", self.api_base);
        let response = self
            .http
            .get(url)
            .query(&[("player_id", player_id)])
            .send()
            .await?;
        expect_json(response).await
    }

    async fn create_game(&self, host_name: &str) -> Result<GameCreated, ActionError> {
        let url = format!("{}/games", self.api_base);
        let response = self
            .http
            .post(url)
            .json(&HostName { host_name })
            .send()
            .await?;
        expect_json(response).await
    }

    async fn join_game(
        &self,
        game_code: &str,
        player_name: &str,
    ) -> Result<Joined, ActionError> {
        let url = format!("{}/games/{game_code}/join", self.api_base);
        let response = self
            .http
            .post(url)
            .json(&PlayerName { player_name })
            .send()
            .await?;
        expect_json(response).await
    }
}

async fn expect_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ActionError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        Err(rejection(status, response).await)
    }
}

async fn expect_ok(response: reqwest::Response) -> Result<(), ActionError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(rejection(status, response).await)
    }
}

/// Non-2xx bodies carry `{"detail": string}`.
async fn rejection(status: reqwest::StatusCode, response: reqwest::Response) -> ActionError {
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            body.get("detail")
                .and_then(|d| d.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request rejected")
                .to_string()
        });
    ActionError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a fresh port, then exit.
    async fn one_shot_server(body: &str, status_line: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/api")
    }

    #[tokio::test]
    async fn create_game_parses_ids() {
        let base = one_shot_server(
            r#"{"game_code":"ABCD","player_id":"p-host"}"#,
            "HTTP/1.1 200 OK",
        )
        .await;
        let client = ActionClient::new(base);

        let created = client.create_game("Ari").await.unwrap();
        assert_eq!(created.game_code, "ABCD");
        assert_eq!(created.player_id, "p-host");
    }

    #[tokio::test]
    async fn join_game_parses_player_id() {
        let base = one_shot_server(r#"{"player_id":"p-2"}"#, "HTTP/1.1 200 OK").await;
        let client = ActionClient::new(base);

        let joined = client.join_game("ABCD", "Bea").await.unwrap();
        assert_eq!(joined.player_id, "p-2");
    }

    #[tokio::test]
    async fn rejection_surfaces_detail() {
        let base = one_shot_server(
            r#"{"detail":"Game not found"}"#,
            "HTTP/1.1 404 Not Found",
        )
        .await;
        let client = ActionClient::new(base);

        let err = client.fetch_state("ZZZZ", "p-1").await.unwrap_err();
        match err {
            ActionError::Rejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Game not found");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejection_without_detail_falls_back_to_reason() {
        let base = one_shot_server("oops", "HTTP/1.1 500 Internal Server Error").await;
        let client = ActionClient::new(base);

        let err = client.start_game("ABCD", "p-1").await.unwrap_err();
        match err {
            ActionError::Rejected { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_state_parses_a_snapshot() {
        let body = r#"{
            "id": "g1",
            "code": "ABCD",
            "status": "lobby",
            "current_round": 1,
            "host_player_id": "p-1",
            "current_turn_player_id": null,
            "awaiting_auction_result": false,
            "players": [
                {"id":"p-1","name":"Ari","card_count":0,"painting_count":0,
                 "turn_order":0,"is_connected":true}
            ],
            "artist_counts": {},
            "artist_values": [],
            "cards_in_play": [],
            "double_auction_state": null,
            "created_at": "2026-08-27T10:30:00",
            "your_hand": [],
            "your_money": 100,
            "your_player_id": "p-1"
        }"#;
        let base = one_shot_server(body, "HTTP/1.1 200 OK").await;
        let client = ActionClient::new(base);

        let snapshot = client.fetch_state("ABCD", "p-1").await.unwrap();
        assert_eq!(snapshot.code, "ABCD");
        assert_eq!(snapshot.your_money, 100);
        assert_eq!(snapshot.players.len(), 1);
    }

    #[tokio::test]
    async fn ok_without_body_fields_is_accepted() {
        let base = one_shot_server(r#"{"status":"started"}"#, "HTTP/1.1 200 OK").await;
        let client = ActionClient::new(base);
        client.start_game("ABCD", "p-1").await.unwrap();
    }
}
