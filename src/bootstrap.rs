// Session bootstrap: turn a persisted identity into a live snapshot, or
// decide that the user has to (re)join.
//
// The one subtle rule lives here: a stored player id is only discarded
// when the server actively rejects it. A network failure during the
// initial fetch proves nothing about the identity, so it propagates as an
// error and the stored id survives for the next attempt.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::actions::{ActionError, GameApi};
use crate::game::state::GameSnapshot;
use crate::session::SessionStore;

/// Outcome of resolving a game code against the session store.
#[derive(Debug)]
pub enum Bootstrap {
    /// We hold a valid identity and the server confirmed it.
    Ready {
        player_id: String,
        snapshot: Box<GameSnapshot>,
    },
    /// No identity, or the server rejected the one we had (in which case
    /// it has been cleared and `reason` carries the server's message).
    NeedsJoin { reason: Option<String> },
}

/// Resolve the local identity for `game_code` and fetch the initial
/// snapshot.
pub async fn resolve(
    store: &dyn SessionStore,
    api: &dyn GameApi,
    game_code: &str,
) -> Result<Bootstrap> {
    let Some(player_id) = store
        .player_for(game_code)
        .context("reading stored session")?
    else {
        return Ok(Bootstrap::NeedsJoin { reason: None });
    };

    match api.fetch_state(game_code, &player_id).await {
        Ok(snapshot) => {
            info!(%game_code, %player_id, "resumed session");
            Ok(Bootstrap::Ready {
                player_id,
                snapshot: Box::new(snapshot),
            })
        }
        Err(ActionError::Rejected { status, message }) => {
            warn!(%game_code, %player_id, status, %message, "stored identity rejected, clearing");
            store
                .forget(game_code)
                .context("clearing rejected session")?;
            Ok(Bootstrap::NeedsJoin {
                reason: Some(message),
            })
        }
        Err(e @ ActionError::Transport(_)) => {
            Err(e).context("initial state fetch failed")
        }
    }
}

/// Join `game_code` as `player_name` and persist the identity the server
/// hands back.
pub async fn join_and_remember(
    store: &dyn SessionStore,
    api: &dyn GameApi,
    game_code: &str,
    player_name: &str,
) -> Result<String> {
    let joined = api
        .join_game(game_code, player_name)
        .await
        .context("joining game")?;
    store
        .remember(game_code, &joined.player_id)
        .context("persisting joined identity")?;
    info!(%game_code, player_id = %joined.player_id, "joined game");
    Ok(joined.player_id)
}

/// Create a game hosted by `host_name` and persist the host identity.
pub async fn create_and_remember(
    store: &dyn SessionStore,
    api: &dyn GameApi,
    host_name: &str,
) -> Result<(String, String)> {
    let created = api.create_game(host_name).await.context("creating game")?;
    store
        .remember(&created.game_code, &created.player_id)
        .context("persisting host identity")?;
    info!(game_code = %created.game_code, player_id = %created.player_id, "created game");
    Ok((created.game_code, created.player_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{GameCreated, Joined};
    use crate::game::state::tests::{player, snapshot_with_players};
    use crate::session::SqliteSessionStore;
    use async_trait::async_trait;

    /// Canned API: fetch behaves as configured, join/create hand out
    /// fixed ids.
    struct FakeApi {
        fetch: FetchBehavior,
    }

    enum FetchBehavior {
        Respond(GameSnapshot),
        Reject { status: u16, message: String },
        FailTransport,
    }

    #[async_trait]
    impl GameApi for FakeApi {
        async fn fetch_state(
            &self,
            _game_code: &str,
            _player_id: &str,
        ) -> Result<GameSnapshot, ActionError> {
            match &self.fetch {
                FetchBehavior::Respond(snapshot) => Ok(snapshot.clone()),
                FetchBehavior::Reject { status, message } => Err(ActionError::Rejected {
                    status: *status,
                    message: message.clone(),
                }),
                FetchBehavior::FailTransport => Err(make_transport_err().await),
            }
        }

        async fn create_game(&self, _host_name: &str) -> Result<GameCreated, ActionError> {
            Ok(GameCreated {
                game_code: "ABCD".into(),
                player_id: "p-host".into(),
            })
        }

        async fn join_game(
            &self,
            _game_code: &str,
            _player_name: &str,
        ) -> Result<Joined, ActionError> {
            Ok(Joined {
                player_id: "p-joined".into(),
            })
        }
    }

    /// Produce a genuine reqwest transport error by hitting a closed port.
    async fn make_transport_err() -> ActionError {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/unreachable")
            .send()
            .await
            .unwrap_err();
        ActionError::Transport(err)
    }

    fn store() -> SqliteSessionStore {
        SqliteSessionStore::open(":memory:").unwrap()
    }

    #[tokio::test]
    async fn no_stored_identity_needs_join() {
        let store = store();
        let api = FakeApi {
            fetch: FetchBehavior::Respond(snapshot_with_players(vec![player("A", 0)])),
        };

        let outcome = resolve(&store, &api, "ABCD").await.unwrap();
        match outcome {
            Bootstrap::NeedsJoin { reason } => assert!(reason.is_none()),
            other => panic!("expected NeedsJoin, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stored_identity_resumes() {
        let store = store();
        store.remember("ABCD", "A").unwrap();
        let api = FakeApi {
            fetch: FetchBehavior::Respond(snapshot_with_players(vec![player("A", 0)])),
        };

        let outcome = resolve(&store, &api, "ABCD").await.unwrap();
        match outcome {
            Bootstrap::Ready {
                player_id,
                snapshot,
            } => {
                assert_eq!(player_id, "A");
                assert_eq!(snapshot.code, "ABCD");
            }
            other => panic!("expected Ready, got {other:?}"),
        }
        // Identity survives.
        assert_eq!(store.player_for("ABCD").unwrap(), Some("A".to_string()));
    }

    #[tokio::test]
    async fn rejected_identity_is_cleared() {
        let store = store();
        store.remember("ABCD", "stale").unwrap();
        let api = FakeApi {
            fetch: FetchBehavior::Reject {
                status: 404,
                message: "Player not in game".into(),
            },
        };

        let outcome = resolve(&store, &api, "ABCD").await.unwrap();
        match outcome {
            Bootstrap::NeedsJoin { reason } => {
                assert_eq!(reason.as_deref(), Some("Player not in game"));
            }
            other => panic!("expected NeedsJoin, got {other:?}"),
        }
        assert_eq!(store.player_for("ABCD").unwrap(), None);
    }

    #[tokio::test]
    async fn transport_failure_keeps_identity_and_errors() {
        let store = store();
        store.remember("ABCD", "A").unwrap();
        let api = FakeApi {
            fetch: FetchBehavior::FailTransport,
        };

        let err = resolve(&store, &api, "ABCD").await.unwrap_err();
        assert!(err.to_string().contains("initial state fetch failed"));
        assert_eq!(store.player_for("ABCD").unwrap(), Some("A".to_string()));
    }

    #[tokio::test]
    async fn join_persists_identity() {
        let store = store();
        let api = FakeApi {
            fetch: FetchBehavior::Respond(snapshot_with_players(vec![])),
        };

        let id = join_and_remember(&store, &api, "ABCD", "Bea").await.unwrap();
        assert_eq!(id, "p-joined");
        assert_eq!(store.player_for("ABCD").unwrap(), Some("p-joined".into()));
    }

    #[tokio::test]
    async fn create_persists_host_identity() {
        let store = store();
        let api = FakeApi {
            fetch: FetchBehavior::Respond(snapshot_with_players(vec![])),
        };

        let (code, id) = create_and_remember(&store, &api, "Ari").await.unwrap();
        assert_eq!(code, "ABCD");
        assert_eq!(id, "p-host");
        assert_eq!(store.player_for("ABCD").unwrap(), Some("p-host".into()));
    }
}
